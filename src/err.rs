use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpgDataError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;

/// Errors raised while decoding a Marshal object graph.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error(
        "unexpected end of data while reading {what} at offset {offset} (need {need} bytes, have {have})"
    )]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("unsupported marshal format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("offset {offset}: unknown type tag `{tag:#04x}`")]
    UnknownTag { tag: u8, offset: u64 },

    #[error("offset {offset}: expected a symbol, found tag `{tag:#04x}`")]
    ExpectedSymbol { tag: u8, offset: u64 },

    #[error("offset {offset}: symbol link {index} does not refer to a known symbol")]
    InvalidSymbolLink { index: i64, offset: u64 },

    #[error("offset {offset}: object link {index} does not refer to a known object")]
    InvalidObjectLink { index: i64, offset: u64 },

    #[error("offset {offset}: negative length {length} for {what}")]
    NegativeLength {
        what: &'static str,
        length: i64,
        offset: u64,
    },

    #[error("offset {offset}: `{text}` is not a valid float")]
    InvalidFloat { text: String, offset: u64 },

    #[error("offset {offset}: object nesting exceeds {limit} levels")]
    TooDeep { offset: u64, limit: usize },

    #[error("offset {offset}: stream expands to more than {limit} nodes")]
    TooLarge { offset: u64, limit: usize },
}

/// Why a container archive was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidArchive {
    #[error("bad magic {found:02X?}")]
    BadMagic { found: Vec<u8> },

    #[error("unsupported version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("truncated while reading {what} at offset {offset}")]
    Truncated { what: &'static str, offset: u64 },

    #[error("{what} at offset {offset} overruns the file (needs {need} bytes, file is {file_len})")]
    Overrun {
        what: &'static str,
        offset: u64,
        need: u64,
        file_len: u64,
    },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive `{}` does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read archive `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` is not a valid RGSS archive: {reason}", path.display())]
    Invalid {
        path: PathBuf,
        reason: InvalidArchive,
    },

    #[error("archive entry `{name}` not found")]
    EntryNotFound { name: String },
}

impl ArchiveError {
    /// Entry lookups that miss are recoverable; everything else means the archive is unusable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ArchiveError::EntryNotFound { .. })
    }

    pub fn is_game_data_invalid(&self) -> bool {
        !self.is_not_found()
    }
}

/// Errors raised while removing the XOR obscuring from a single asset.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("asset is too short ({len} bytes) to carry the {header_len}-byte header")]
    TooShort { len: usize, header_len: usize },

    #[error("asset header {found:02x?} does not match the expected signature")]
    HeaderMismatch { found: Vec<u8> },

    #[error("encryption key `{key}` is not an even-length hex string")]
    InvalidKey { key: String },

    #[error("i/o error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RpgDataError {
    #[error("game data is invalid: {reason}")]
    GameDataInvalid { reason: String },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to deserialize `{name}`")]
    Deserialization {
        name: String,
        #[source]
        source: DeserializationError,
    },

    #[error("failed to parse `{}` as JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read `{}`", path.display())]
    FailedToRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RpgDataError {
    pub fn game_data_invalid(reason: impl Into<String>) -> Self {
        RpgDataError::GameDataInvalid {
            reason: reason.into(),
        }
    }

    /// True for failures that make a project session impossible to build.
    pub fn is_game_data_invalid(&self) -> bool {
        match self {
            RpgDataError::GameDataInvalid { .. } => true,
            RpgDataError::Archive(e) => e.is_game_data_invalid(),
            _ => false,
        }
    }
}
