use std::{fmt, io, num::TryFromIntError, str::Utf8Error};
use quick_xml::events::attributes::AttrError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The input is not a well-formed OSM XML document.
    MalformedDocument(String),
    MissingBounds,
    MalformedBounds {
        field: String,
        reason: String,
    },
    /// A bounds declaration with zero extent on one axis.
    DegenerateBounds {
        axis: &'static str,
    },
    InvalidConfig(String),
    Io(String),
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedDocument(message) => write!(f, "malformed document: {}", message),
            Error::MissingBounds => write!(f, "document has no bounds declaration"),
            Error::MalformedBounds { field, reason } => {
                write!(f, "malformed bounds field '{}': {}", field, reason)
            },
            Error::DegenerateBounds { axis } => {
                write!(f, "bounds have zero extent along {}", axis)
            },
            Error::InvalidConfig(message) => write!(f, "invalid config: {}", message),
            Error::Io(message) => write!(f, "io error: {}", message),
            Error::Serialization(message) => write!(f, "serialization error: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error::MalformedDocument(value.to_string())
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error::MalformedDocument(value.to_string())
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::MalformedDocument(value.to_string())
    }
}

impl From<TryFromIntError> for Error {
    fn from(value: TryFromIntError) -> Self {
        Error::InvalidConfig(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Serialization(value.to_string())
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Io(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
