use crate::scalar::ScalarType;
use std::{io, path::PathBuf};

/// Boxed error produced by a [`Codec`](crate::codec::Codec).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by dumping and loading.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Opening, writing, persisting or reading a file failed.
    #[error("io error on {path:?}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The codec failed to encode the value.
    #[error("encoding failed: {0}")]
    Encode(#[source] BoxError),
    /// The codec failed to decode the file contents.
    #[error("decoding failed: {0}")]
    Decode(#[source] BoxError),
    /// The element type can not be represented by the codec.
    #[error("unsupported scalar type {0:?}")]
    UnsupportedScalarType(String),
    /// A typed array was requested from a tensor of another element type.
    #[error("expected {expected}, found {found}")]
    ScalarTypeMismatch {
        /// The requested type.
        expected: ScalarType,
        /// The stored type.
        found: ScalarType,
    },
    /// The data length does not match the shape.
    #[error("shape {shape:?} does not match {len} bytes of data")]
    Shape {
        /// The shape.
        shape: Vec<usize>,
        /// The length of the data in bytes.
        len: usize,
    },
    /// A named component or attribute was not found.
    #[error("attribute {0:?} not found")]
    MissingAttribute(String),
    /// The file held a tensor where a bundle was expected, or vice versa.
    #[error("expected a {expected}")]
    UnexpectedValue {
        /// "tensor" or "bundle".
        expected: &'static str,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
    /// Whether the error is an [`Error::Io`].
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Result type of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
