use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::openflow0x04::OFP_VERSION;

/// Codec settings, typically loaded from the host application's config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Protocol version written on encode and required on decode.
    pub version: u8,
    /// Reject non-zero padding bytes on decode.
    pub strict_padding: bool,
    /// Upper bound on an encoded message, header included.
    pub max_message_len: usize,
    /// Skip vendor structures with no registered codec instead of failing.
    pub skip_unknown_extensions: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            version: OFP_VERSION,
            strict_padding: false,
            max_message_len: u16::MAX as usize,
            skip_unknown_extensions: true,
        }
    }
}

impl CodecConfig {
    /// Only OpenFlow 1.3 has a codec catalog.
    pub fn validate(&self) -> Result<()> {
        if self.version != OFP_VERSION {
            return Err(CodecError::UnsupportedVersion { version: self.version });
        }
        Ok(())
    }
}
