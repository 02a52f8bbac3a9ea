use thiserror::Error;

use crate::registry::CodecKey;

/// Everything that can go wrong while encoding or decoding OpenFlow structures.
///
/// `UnknownExtension` is the only variant a decoder treats as recoverable: the
/// enclosing sequence skips the structure and continues. Everything else aborts
/// the enclosing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("truncated input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("unknown message type {type_code} for version {version:#04x}")]
    UnknownMessageType { version: u8, type_code: u16 },
    #[error("unknown action type {type_code} for version {version:#04x}")]
    UnknownActionType { version: u8, type_code: u16 },
    #[error("unknown match field class {class:#06x} field {field}")]
    UnknownMatchField { class: u16, field: u8 },
    #[error("no codec registered for {key}")]
    UnknownExtension { key: CodecKey },
    #[error("{structure}: declared length {declared} but {actual} bytes")]
    LengthMismatch {
        structure: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error("codec already registered for {key}")]
    DuplicateKey { key: CodecKey },
    #[error("non-zero padding at offset {offset}")]
    InvalidPadding { offset: usize },
    #[error("{structure}: invalid value {value:#x}")]
    InvalidValue { structure: &'static str, value: u64 },
    #[error("{structure}: length {len} does not fit its length field")]
    LengthOverflow { structure: &'static str, len: usize },
    #[error("unsupported protocol version {version:#04x}")]
    UnsupportedVersion { version: u8 },
}

impl CodecError {
    /// Whether a surrounding sequence may skip the offending item and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CodecError::UnknownExtension { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
