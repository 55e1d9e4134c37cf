//! Error types for building and querying a layered configuration.

use std::fmt;
use std::io;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or querying a provider.
///
/// Construction errors (`SourceRead`, `Parse`, `MergeConflict`,
/// `UndefinedVariable`) abort the whole build; a provider is never returned
/// half-merged. A path that does not resolve is not an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying stream could not be read.
    #[error("failed to read the yaml config{}", Origin(.origin))]
    SourceRead {
        origin: Option<String>,
        #[source]
        source: io::Error,
    },

    /// The document is not valid YAML.
    #[error("failed to parse the yaml config{}", Origin(.origin))]
    Parse {
        origin: Option<String>,
        #[source]
        source: serde_yaml::Error,
    },

    /// A mapping collided with a non-mapping at the same path.
    #[error("can't merge {src} into {dst} at {}", display_path(.path))]
    MergeConflict {
        path: String,
        dst: String,
        src: String,
    },

    /// A `${KEY}` or `$KEY` token had no value and no usable default.
    #[error("default is empty for {key:?} (use \"\" for empty string)")]
    UndefinedVariable { key: String },

    /// A looked-up value could not be decoded into the requested type.
    #[error("can't decode value at {}", display_path(.path))]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Error {
    pub fn undefined_variable(key: impl Into<String>) -> Self {
        Self::UndefinedVariable { key: key.into() }
    }

    /// Attach a source identity to read and parse errors that lack one.
    pub fn with_origin(self, name: impl Into<String>) -> Self {
        match self {
            Error::SourceRead {
                origin: None,
                source,
            } => Error::SourceRead {
                origin: Some(name.into()),
                source,
            },
            Error::Parse {
                origin: None,
                source,
            } => Error::Parse {
                origin: Some(name.into()),
                source,
            },
            other => other,
        }
    }
}

/// Recovers errors raised inside an [`ExpandReader`](crate::expand::ExpandReader);
/// anything else is a read failure.
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::SourceRead {
                origin: None,
                source: err,
            };
        }

        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Error::SourceRead {
                origin: None,
                source: io::Error::new(kind, other),
            },
            None => Error::SourceRead {
                origin: None,
                source: kind.into(),
            },
        }
    }
}

struct Origin<'a>(&'a Option<String>);

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => write!(f, " in file: {:?}", name),
            None => Ok(()),
        }
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}
