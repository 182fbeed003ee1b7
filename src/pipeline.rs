//! Whole-file processing: read, embed, transform, then write each output
//!
//! One transform is shared by every requested output. `real+imag` writes
//! the complex volume itself (4D) after refreshing its range over both
//! channels; every other kind goes through a projection.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::embed::prep_volume;
use crate::error::{Result, SpectralError};
use crate::nifti_io::{read_volume_file, write_complex_volume, write_scalar_volume, LoadedVolume, OutputFormat};
use crate::project::{complex_range, proj_volume, ProjectionKind, ProjectionParams};
use crate::transform::{fft_volume_with_progress, TransformConfig};
use crate::volume::ValueRange;

/// One requested output file
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRequest {
    pub kind: ProjectionKind,
    pub path: PathBuf,
}

impl OutputRequest {
    pub fn new(kind: ProjectionKind, path: impl Into<PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }
}

/// Settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub transform: TransformConfig,
    pub projection: ProjectionParams,
    pub format: OutputFormat,
    /// Overwrite existing output files
    pub clobber: bool,
    /// Stored in the description field of every output
    pub history: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transform: TransformConfig::default(),
            projection: ProjectionParams::default(),
            format: OutputFormat::default(),
            clobber: false,
            history: String::from("volfft"),
        }
    }
}

/// What was written for one request
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSummary {
    pub kind: ProjectionKind,
    pub path: PathBuf,
    pub range: ValueRange,
}

/// Validate input and output paths before any work is done
pub fn check_files(input: &Path, outputs: &[OutputRequest], clobber: bool) -> Result<()> {
    if !input.exists() {
        return Err(SpectralError::MissingInput(input.to_path_buf()));
    }
    if outputs.is_empty() {
        return Err(SpectralError::NoOutputs);
    }
    for output in outputs {
        if output.path.exists() {
            if !clobber {
                return Err(SpectralError::OutputExists(output.path.clone()));
            }
            warn!("Overwriting {}", output.path.display());
        }
    }
    Ok(())
}

/// Run the whole tool on one input file
///
/// `progress_callback` receives (chunks done, chunks total) during the transform.
pub fn run<F>(
    input: &Path,
    outputs: &[OutputRequest],
    config: &PipelineConfig,
    progress_callback: F,
) -> Result<Vec<OutputSummary>>
where
    F: FnMut(usize, usize),
{
    check_files(input, outputs, config.clobber)?;

    let loaded = read_volume_file(input)?;
    let declared = loaded.range();
    info!(" | Input file:     {}", input.display());
    info!(" | Input ndims:    {}", loaded.ndims());
    info!(" | min/max:        [{:8.3}:{:8.3}]", declared.min, declared.max);
    info!(" | Output files:");
    for output in outputs {
        info!(" |   {:<9} => {}", output.kind.label(), output.path.display());
    }
    info!(
        " | FFT order:      {} ({}, centered={})",
        config.transform.rank, config.transform.direction, config.transform.centered
    );

    let mut data = match loaded {
        LoadedVolume::Spatial(volume) => prep_volume(&volume)?,
        LoadedVolume::Complex(volume) => volume,
    };

    fft_volume_with_progress(&mut data, &config.transform, progress_callback)?;

    let mut summaries = Vec::with_capacity(outputs.len());
    for output in outputs {
        let range = if output.kind.is_scalar() {
            let scalar = proj_volume(&data, output.kind, &config.projection)?;
            write_scalar_volume(&output.path, &scalar, config.format, &config.history)?;
            scalar.range()
        } else {
            let range = complex_range(&mut data);
            write_complex_volume(&output.path, &data, config.format, &config.history)?;
            range
        };

        info!(
            "Outputting {} ({}) | range: [{}:{}]",
            output.kind.label(), output.path.display(), range.min, range.max
        );
        summaries.push(OutputSummary {
            kind: output.kind,
            path: output.path.clone(),
            range,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_files_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.nii");
        let outputs = [OutputRequest::new(ProjectionKind::Magnitude, dir.path().join("out.nii"))];
        let err = check_files(&input, &outputs, false).unwrap_err();
        assert!(matches!(err, SpectralError::MissingInput(_)));
    }

    #[test]
    fn test_check_files_requires_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.nii");
        std::fs::write(&input, b"x").unwrap();
        let err = check_files(&input, &[], false).unwrap_err();
        assert!(matches!(err, SpectralError::NoOutputs));
    }

    #[test]
    fn test_check_files_respects_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.nii");
        let existing = dir.path().join("out.nii");
        std::fs::write(&input, b"x").unwrap();
        std::fs::write(&existing, b"y").unwrap();
        let outputs = [OutputRequest::new(ProjectionKind::Power, &existing)];

        let err = check_files(&input, &outputs, false).unwrap_err();
        assert!(matches!(err, SpectralError::OutputExists(ref p) if p == &existing));
        assert!(check_files(&input, &outputs, true).is_ok());
    }
}
