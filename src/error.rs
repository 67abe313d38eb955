use std::{io, path::PathBuf};

use quick_xml::events::attributes::AttrError;
use thiserror::Error;

/// The byte stream is not a well-formed document of the expected shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed xml attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("document has no root element")]
    Empty,

    #[error("element <{0}> is not closed")]
    Unclosed(String),

    #[error("unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },

    #[error("invalid coordinates {0:?}")]
    InvalidCoordinates(String),

    #[error("placemark {0:?} has no geometry")]
    MissingGeometry(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("opening {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("unzipping {path:?}: {source}")]
    Unzip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("decoding {path:?}: {source}")]
    Decode { path: PathBuf, source: DecodeError },

    #[error("encoding {path:?}: {source}")]
    Encode { path: PathBuf, source: EncodeError },

    #[error("writing {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("finalizing archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
