//! Projection of complex spectra onto real scalar volumes
//!
//! Each voxel's (real, imag) pair is reduced with one fixed formula:
//!
//! | Kind        | Value                          |
//! |-------------|--------------------------------|
//! | `Real`      | `re`                           |
//! | `Imag`      | `im`                           |
//! | `Magnitude` | `sqrt(re² + im²)`              |
//! | `Power`     | `re² + im²`                    |
//! | `Phase`     | `atan(im / re)`, 0 if `re == 0` |
//! | `MagnitudeLn`    | `ln(magnitude)`, clamped to -2.3   |
//! | `MagnitudeLog10` | `log10(magnitude)`, clamped to -1  |
//!
//! The running [min, max] of the written samples becomes the declared
//! range of the output volume.

use std::fmt;

use log::debug;
use num_complex::Complex64;

use crate::error::{Result, SpectralError};
use crate::volume::{ComplexVolume, ScalarVolume, ValueRange};

/// Magnitude at or below which the log projections are clamped
pub const LOG_CLAMP_THRESHOLD: f64 = 0.1;
/// Clamp value of the natural-log projection (≈ ln 0.1)
pub const LN_CLAMP_VALUE: f64 = -2.3;
/// Clamp value of the base-10 log projection (log10 0.1)
pub const LOG10_CLAMP_VALUE: f64 = -1.0;

/// Requested output of a transformed volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// Both channels; written from the complex volume itself
    RealAndImag,
    Real,
    Imag,
    Magnitude,
    MagnitudeLn,
    MagnitudeLog10,
    Phase,
    Power,
}

impl ProjectionKind {
    pub const ALL: [ProjectionKind; 8] = [
        ProjectionKind::RealAndImag,
        ProjectionKind::Real,
        ProjectionKind::Imag,
        ProjectionKind::Magnitude,
        ProjectionKind::MagnitudeLn,
        ProjectionKind::MagnitudeLog10,
        ProjectionKind::Phase,
        ProjectionKind::Power,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProjectionKind::RealAndImag => "real+imag",
            ProjectionKind::Real => "real",
            ProjectionKind::Imag => "imag",
            ProjectionKind::Magnitude => "magnitude",
            ProjectionKind::MagnitudeLn => "magln",
            ProjectionKind::MagnitudeLog10 => "mag10",
            ProjectionKind::Phase => "phase",
            ProjectionKind::Power => "power",
        }
    }

    /// Whether [`proj_volume`] can produce this kind
    pub fn is_scalar(self) -> bool {
        Formula::for_kind(self).is_some()
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gate used by the log-magnitude projections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogClamp {
    /// Clamp when the current voxel's magnitude is <= 0.1
    #[default]
    Current,
    /// Clamp when the previously written output value is <= 0.1.
    ///
    /// Reproduces the historical tool, whose gate read a variable left over
    /// from the previous voxel. The gate starts at 0.0, and since both clamp
    /// values are below the threshold the whole output ends up clamped.
    Literal,
}

/// Projection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionParams {
    pub log_clamp: LogClamp,
}

/// Reduce a complex volume to one scalar volume
///
/// Every voxel is visited once, in storage order (x fastest).
///
/// # Errors
/// `UnsupportedProjection` for [`ProjectionKind::RealAndImag`]; use
/// [`complex_range`] and the complex volume instead.
pub fn proj_volume(
    volume: &ComplexVolume,
    kind: ProjectionKind,
    params: &ProjectionParams,
) -> Result<ScalarVolume> {
    let formula = Formula::for_kind(kind).ok_or(SpectralError::UnsupportedProjection(kind))?;

    let mut output = ScalarVolume::zeros(volume.geometry().clone())?;
    let (nx, ny, nz) = volume.dims();

    let mut range = ValueRange::EMPTY;
    let mut value = 0.0;

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                value = formula.apply(volume.sample(i, j, k), value, params.log_clamp);
                range.include(value);
                output.set(i, j, k, value);
            }
        }
    }

    output.set_range(range);
    debug!("Projected {} over {:?}: range [{}, {}]", kind, volume.sizes(), range.min, range.max);
    Ok(output)
}

/// Recompute the declared range of a complex volume over both channels
pub fn complex_range(volume: &mut ComplexVolume) -> ValueRange {
    let range = ValueRange::from_values(volume.data().iter().flat_map(|c| [c.re, c.im]));
    volume.set_range(range);
    range
}

/// Per-voxel formula of a scalar projection
#[derive(Clone, Copy)]
enum Formula {
    Real,
    Imag,
    Magnitude,
    Power,
    Phase,
    LogMagnitude { log: fn(f64) -> f64, clamp_value: f64 },
}

impl Formula {
    /// `None` for kinds that are not a single scalar per voxel
    fn for_kind(kind: ProjectionKind) -> Option<Self> {
        match kind {
            ProjectionKind::RealAndImag => None,
            ProjectionKind::Real => Some(Formula::Real),
            ProjectionKind::Imag => Some(Formula::Imag),
            ProjectionKind::Magnitude => Some(Formula::Magnitude),
            ProjectionKind::Power => Some(Formula::Power),
            ProjectionKind::Phase => Some(Formula::Phase),
            ProjectionKind::MagnitudeLn => {
                Some(Formula::LogMagnitude { log: f64::ln, clamp_value: LN_CLAMP_VALUE })
            }
            ProjectionKind::MagnitudeLog10 => {
                Some(Formula::LogMagnitude { log: f64::log10, clamp_value: LOG10_CLAMP_VALUE })
            }
        }
    }

    fn apply(self, c: Complex64, previous: f64, log_clamp: LogClamp) -> f64 {
        let (re, im) = (c.re, c.im);
        match self {
            Formula::Real => re,
            Formula::Imag => im,
            Formula::Magnitude => (re * re + im * im).sqrt(),
            Formula::Power => re * re + im * im,
            Formula::Phase => {
                if re != 0.0 {
                    (im / re).atan()
                } else {
                    0.0
                }
            }
            Formula::LogMagnitude { log, clamp_value } => {
                log_magnitude(re, im, previous, log_clamp, log, clamp_value)
            }
        }
    }
}

#[inline]
fn log_magnitude(
    re: f64,
    im: f64,
    previous: f64,
    log_clamp: LogClamp,
    log: fn(f64) -> f64,
    clamp_value: f64,
) -> f64 {
    let magnitude = (re * re + im * im).sqrt();
    let gate = match log_clamp {
        LogClamp::Current => magnitude,
        LogClamp::Literal => previous,
    };
    if gate > LOG_CLAMP_THRESHOLD {
        log(magnitude)
    } else {
        clamp_value
    }
}
