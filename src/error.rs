//! Error types
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sonargeo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that terminate the conversion of a file
#[derive(Error, Debug)]
pub enum Error {
    /// The input could not be read or has no sonar data
    #[error("input format error: {0}")]
    InputFormat(String),

    /// The input or the requested options are not supported
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The intensities could not be turned into a raster
    #[error("normalization error: {0}")]
    Normalization(String),

    /// The raster geometry is invalid
    #[error("geometry error: {0}")]
    Geometry(String),

    /// No unique affine transform fits the control points
    #[error("singular transform: {0}")]
    SingularTransform(String),

    /// An artifact could not be written
    #[error("output error: {0}")]
    Output(String),

    /// The conversion panicked
    #[error("conversion panicked: {0}")]
    Panicked(String),
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        Error::InputFormat(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Output(e.to_string())
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Output(e.to_string())
    }
}

/// The pipeline stage in which a conversion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading and validating the input file
    Read,
    /// Building the raster
    Normalize,
    /// Locating the swath edges
    Geodesy,
    /// Fitting the affine transform
    Transform,
    /// Writing artifacts
    Write,
    /// Running the conversion on a worker thread
    Worker,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Read => "read",
            Stage::Normalize => "normalize",
            Stage::Geodesy => "geodesy",
            Stage::Transform => "transform",
            Stage::Write => "write",
            Stage::Worker => "worker",
        };
        write!(f, "{}", s)
    }
}

/// A failed conversion of one file
#[derive(Error, Debug)]
#[error("{}: {stage} stage failed: {source}", .path.display())]
pub struct ConversionError {
    /// The input file
    pub path: PathBuf,
    /// The stage that failed
    pub stage: Stage,
    /// The underlying error
    #[source]
    pub source: Error,
}

/// Some files of a batch could not be converted
#[derive(Error, Debug, PartialEq, Eq)]
#[error("{failed} of {total} files failed")]
pub struct BatchFailed {
    /// Number of failed files
    pub failed: usize,
    /// Number of files in the batch
    pub total: usize,
}

/// Attach file and stage context to a result
pub(crate) trait StageContext<T> {
    fn stage(self, path: &std::path::Path, stage: Stage) -> std::result::Result<T, ConversionError>;
}

impl<T> StageContext<T> for Result<T> {
    fn stage(self, path: &std::path::Path, stage: Stage) -> std::result::Result<T, ConversionError> {
        self.map_err(|source| ConversionError {
            path: path.to_path_buf(),
            stage,
            source,
        })
    }
}
