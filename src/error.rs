//! Error type shared by every stage of the spectral pipeline
//!
//! Variants fall into three groups (see [`ErrorKind`]): configuration
//! problems detected before any sample is touched, resource failures that
//! abort a pass, and input problems surfaced while reading or embedding a
//! source volume.

use std::path::PathBuf;

use thiserror::Error;

use crate::project::ProjectionKind;

#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("unsupported transform rank {0} (expected 1, 2 or 3)")]
    UnsupportedRank(usize),

    #[error("cannot centre a rank-{rank} transform: axis {axis} has odd length {len}")]
    OddAxis { axis: usize, len: usize, rank: usize },

    #[error("projection '{0}' is not a scalar projection; use the complex volume directly")]
    UnsupportedProjection(ProjectionKind),

    #[error("failed to allocate scratch buffer of {len} complex samples")]
    Allocation { len: usize },

    #[error("transform primitive failed: {0}")]
    Primitive(String),

    #[error("invalid volume geometry: {0}")]
    InvalidGeometry(String),

    #[error("failed to read NIfTI data: {0}")]
    Nifti(String),

    #[error("couldn't find input file {0}")]
    MissingInput(PathBuf),

    #[error("file {0} exists, enable clobbering to overwrite")]
    OutputExists(PathBuf),

    #[error("at least one output file must be specified")]
    NoOutputs,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`SpectralError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any mutation; the caller may skip the output or abort
    Configuration,
    /// Allocation or primitive failure; any partially written target is invalid
    Resource,
    /// Malformed or unreadable source data
    Input,
}

impl SpectralError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpectralError::UnsupportedRank(_)
            | SpectralError::OddAxis { .. }
            | SpectralError::UnsupportedProjection(_)
            | SpectralError::OutputExists(_)
            | SpectralError::NoOutputs => ErrorKind::Configuration,
            SpectralError::Allocation { .. }
            | SpectralError::Primitive(_)
            | SpectralError::Io(_) => ErrorKind::Resource,
            SpectralError::InvalidGeometry(_)
            | SpectralError::Nifti(_)
            | SpectralError::MissingInput(_) => ErrorKind::Input,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

pub type Result<T> = std::result::Result<T, SpectralError>;
