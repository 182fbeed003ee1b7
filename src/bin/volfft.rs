//! Fourier transform a NIfTI volume and write spectral projections
//!
//! Usage: volfft [OPTIONS] <INPUT> [OUTPUT] [--magnitude <FILE>] [--phase <FILE>] ...

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use indicatif::ProgressBar;

use volfft::nifti_io::{OutputFormat, OutputType};
use volfft::pipeline::{run, OutputRequest, PipelineConfig};
use volfft::{Direction, LogClamp, ProjectionKind, ProjectionParams, TransformConfig};

/// Forward or inverse FFT of an image volume, with magnitude/phase/power outputs.
#[derive(Parser)]
#[command(name = "volfft", version)]
struct Args {
    /// Input volume (.nii or .nii.gz); 4D files with two volumes are read as complex
    input: PathBuf,

    /// Output file for the complex (real+imag) result
    output: Option<PathBuf>,

    /// Print out extra information
    #[arg(long)]
    verbose: bool,

    /// Clobber existing files
    #[arg(long)]
    clobber: bool,

    /// Write out byte data
    #[arg(long, group = "dtype")]
    byte: bool,

    /// Write out short integer data
    #[arg(long, group = "dtype")]
    short: bool,

    /// Write out 32-bit integer data
    #[arg(long, group = "dtype")]
    int: bool,

    /// Write out single-precision data (default)
    #[arg(long, group = "dtype")]
    float: bool,

    /// Write out double-precision data
    #[arg(long, group = "dtype")]
    double: bool,

    /// Write signed integer data
    #[arg(long, overrides_with = "unsigned")]
    signed: bool,

    /// Write unsigned integer data (default)
    #[arg(long, overrides_with = "signed")]
    unsigned: bool,

    /// Number of axes transformed together (1, 2 or 3)
    #[arg(long, default_value_t = 3)]
    rank: usize,

    /// Do a 2D (slice-wise) FFT, same as --rank 2
    #[arg(long = "2d", conflicts_with = "rank")]
    two_d: bool,

    /// Calculate the forward FFT (default)
    #[arg(long, overrides_with = "inverse")]
    forward: bool,

    /// Calculate the inverse FFT
    #[arg(long, overrides_with = "forward")]
    inverse: bool,

    /// Re-orient quadrants to force the zero frequency to the centre
    #[arg(long, visible_alias = "center")]
    centre: bool,

    /// Gate the log-magnitude clamp on the previous output value (legacy behaviour)
    #[arg(long)]
    literal_log_clamp: bool,

    /// Complex real and imaginary data
    #[arg(long, value_name = "FILE")]
    both: Option<PathBuf>,

    /// Real component of the data
    #[arg(long, value_name = "FILE")]
    real: Option<PathBuf>,

    /// Imaginary component of the data
    #[arg(long, value_name = "FILE")]
    imaginary: Option<PathBuf>,

    /// Magnitude of the real and imaginary data
    #[arg(long, value_name = "FILE")]
    magnitude: Option<PathBuf>,

    /// Natural log of the magnitude
    #[arg(long, value_name = "FILE")]
    magln: Option<PathBuf>,

    /// Base-10 log of the magnitude
    #[arg(long, value_name = "FILE")]
    mag10: Option<PathBuf>,

    /// Phase of the real and imaginary data
    #[arg(long, value_name = "FILE")]
    phase: Option<PathBuf>,

    /// Power spectrum
    #[arg(long, value_name = "FILE")]
    power: Option<PathBuf>,
}

impl Args {
    fn output_type(&self) -> OutputType {
        if self.byte {
            OutputType::Byte
        } else if self.short {
            OutputType::Short
        } else if self.int {
            OutputType::Int
        } else if self.double {
            OutputType::Double
        } else {
            OutputType::Float
        }
    }

    fn outputs(&self) -> Vec<OutputRequest> {
        let both = self.output.clone().or_else(|| self.both.clone());
        let paths = [
            (ProjectionKind::RealAndImag, both),
            (ProjectionKind::Real, self.real.clone()),
            (ProjectionKind::Imag, self.imaginary.clone()),
            (ProjectionKind::Magnitude, self.magnitude.clone()),
            (ProjectionKind::MagnitudeLn, self.magln.clone()),
            (ProjectionKind::MagnitudeLog10, self.mag10.clone()),
            (ProjectionKind::Phase, self.phase.clone()),
            (ProjectionKind::Power, self.power.clone()),
        ];
        paths
            .into_iter()
            .filter_map(|(kind, path)| path.map(|p| OutputRequest::new(kind, p)))
            .collect()
    }

    fn config(&self) -> PipelineConfig {
        let transform = TransformConfig {
            direction: if self.inverse { Direction::Inverse } else { Direction::Forward },
            rank: if self.two_d { 2 } else { self.rank },
            centered: self.centre,
        };
        let projection = ProjectionParams {
            log_clamp: if self.literal_log_clamp { LogClamp::Literal } else { LogClamp::Current },
        };
        PipelineConfig {
            transform,
            projection,
            format: OutputFormat::new(self.output_type(), self.signed),
            clobber: self.clobber,
            history: std::env::args().collect::<Vec<_>>().join(" "),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let outputs = args.outputs();
    let config = args.config();

    let bar = if args.verbose { ProgressBar::new(0) } else { ProgressBar::hidden() };
    run(&args.input, &outputs, &config, |done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    })?;
    bar.finish_and_clear();

    Ok(())
}
