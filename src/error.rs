use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZipError {
    #[error("entry metadata is missing")]
    MissingEntryMetadata,
    #[error("password was not set")]
    MissingPassword,
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unexpected end of input stream")]
    UnexpectedEndOfStream,
    #[error("corrupt data: {0}")]
    CorruptData(String),
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("authentication code mismatch")]
    MacMismatch,
    #[error("invalid file CRC: expected {expected:08x}, got {got:08x}")]
    CrcMismatch { expected: u32, got: u32 },
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),
    #[error("{0}")]
    Io(io::Error),
}

impl ZipError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Copy of this error, for replaying a latched failure.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::MissingEntryMetadata => Self::MissingEntryMetadata,
            Self::MissingPassword => Self::MissingPassword,
            Self::InvalidPassword => Self::InvalidPassword,
            Self::InvalidInput(s) => Self::InvalidInput(s.clone()),
            Self::UnexpectedEndOfStream => Self::UnexpectedEndOfStream,
            Self::CorruptData(s) => Self::CorruptData(s.clone()),
            Self::DecryptionFailure(s) => Self::DecryptionFailure(s.clone()),
            Self::MacMismatch => Self::MacMismatch,
            Self::CrcMismatch { expected, got } => Self::CrcMismatch {
                expected: *expected,
                got: *got,
            },
            Self::UnsupportedCompression(n) => Self::UnsupportedCompression(*n),
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

impl From<io::Error> for ZipError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Self::UnexpectedEndOfStream,
            _ => Self::Io(e),
        }
    }
}

impl From<ZipError> for io::Error {
    fn from(e: ZipError) -> Self {
        match e {
            ZipError::Io(inner) => inner,
            ZipError::UnexpectedEndOfStream => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string())
            }
            ZipError::InvalidInput(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub type ZipResult<T> = Result<T, ZipError>;
