//! Dataset loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// Why a dataset could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Nothing at the given path
    #[error("No dataset at {0}")]
    NotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory with neither TIFF slices nor a manifest
    #[error("No TIFF slices or manifest in {0}")]
    NoSlices(PathBuf),

    /// A slice header could not be decoded
    #[error("Invalid TIFF slice: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Manifest is not valid JSON or misses fields
    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// A dimension is zero
    #[error("Invalid extent {0:?}: every dimension must be at least 1")]
    InvalidExtent([usize; 3]),
}

/// Result type alias using LoadError.
pub type LoadResult<T> = Result<T, LoadError>;
