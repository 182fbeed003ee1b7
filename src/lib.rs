//! volfft: Fourier transforms of image volumes and spectral projections
//!
//! This crate converts spatial volumes into frequency space and back, and
//! reduces complex spectra to scalar volumes for viewing.
//!
//! # Modules
//! - `volume`: Spatial, scalar and complex volume containers
//! - `fft`: FFT primitive for 1D/2D/3D buffers using rustfft, centering helpers
//! - `embed`: Real to complex embedding (`prep_volume`)
//! - `transform`: Rank dispatch, centering and normalization (`fft_volume`)
//! - `project`: Magnitude, phase, power, log-magnitude projections (`proj_volume`)
//! - `nifti_io`: NIfTI reading and writing
//! - `pipeline`: Whole-file processing used by the `volfft` binary
//! - `error`: Shared error type

pub mod error;
pub mod volume;

// Core modules
pub mod fft;
pub mod embed;
pub mod transform;
pub mod project;

// I/O modules
pub mod nifti_io;
pub mod pipeline;

pub use embed::prep_volume;
pub use error::{ErrorKind, Result, SpectralError};
pub use project::{complex_range, proj_volume, LogClamp, ProjectionKind, ProjectionParams};
pub use transform::{fft_volume, fft_volume_with_progress, Direction, TransformConfig, TransformShape};
pub use volume::{Channel, ComplexVolume, Geometry, RealVolume, ScalarVolume, SpatialVolume, ValueRange};
