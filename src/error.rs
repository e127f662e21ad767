//! Defines [`GeoArrowError`], representing all errors returned by this crate.

use arrow_schema::ArrowError;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeoArrowError {
    /// Malformed WKB, WKT or extension metadata.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A structural invariant of an array was breached.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown enum value, unknown kernel name, or an argument outside its
    /// domain.
    #[error("Invalid argument: {0}")]
    IllegalArgument(String),

    /// Operation incompatible with the edge type or descriptor it was given.
    #[error("Incompatible type: {0}")]
    IncompatibleType(String),

    /// Whenever pushing to a container fails because an offset does not fit
    /// in `i32`.
    ///
    /// The solution is usually to use a large-offset storage variant.
    #[error("Overflow")]
    Overflow,

    /// [ArrowError]
    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// [std::io::Error]
    ///
    /// Only surfaced at bridge boundaries; kernels never perform I/O.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, GeoArrowError>;

impl From<GeoArrowError> for ArrowError {
    /// APIs where we pass a callback into the arrow crate require the
    /// returned error type to be ArrowError, so implementing this `From`
    /// makes the conversion less verbose there.
    fn from(err: GeoArrowError) -> Self {
        match err {
            GeoArrowError::Arrow(err) => err,
            _ => ArrowError::ExternalError(Box::new(err)),
        }
    }
}
