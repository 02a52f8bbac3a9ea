//! Whole-message entry points.
//!
//! `OfpCodec` pairs a frozen `CodecRegistry` with a `CodecConfig` and turns
//! complete OpenFlow messages into bytes and back. A stream transport reads
//! the fixed header first, asks `frame_len` how many bytes the message spans,
//! and hands exactly that slice to `decode`.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::buffer::OfpReader;
use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::ofp_header::OfpHeader;
use crate::ofp_message::OfpMessage;
use crate::openflow0x04::message::Message;
use crate::openflow0x04::Openflow13Codecs;
use crate::nicira::NiciraExtensions;
use crate::registry::{CodecRegistry, CodecRegistryBuilder};

/// Encoder and decoder of OpenFlow 1.3 messages.
#[derive(Clone)]
pub struct OfpCodec {
    registry: Arc<CodecRegistry>,
    config: CodecConfig,
}

impl OfpCodec {
    /// A codec over the core catalog plus the Nicira extensions.
    pub fn new(config: CodecConfig) -> Result<OfpCodec> {
        config.validate()?;
        let registry = CodecRegistryBuilder::new()
            .skip_unknown_extensions(config.skip_unknown_extensions)
            .with_provider(&Openflow13Codecs)?
            .with_provider(&NiciraExtensions)?
            .build();
        OfpCodec::with_registry(Arc::new(registry), config)
    }

    /// A codec over a caller-assembled registry, e.g. a `SharedRegistry` snapshot.
    pub fn with_registry(registry: Arc<CodecRegistry>, config: CodecConfig) -> Result<OfpCodec> {
        config.validate()?;
        Ok(OfpCodec { registry, config })
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `msg` with transaction id `xid` into a fresh buffer.
    pub fn encode(&self, xid: u32, msg: &Message) -> Result<Vec<u8>> {
        let bytes = Message::marshal(self.config.version, xid, msg, &self.registry)?;
        if bytes.len() > self.config.max_message_len {
            return Err(CodecError::LengthOverflow {
                structure: "message",
                len: bytes.len(),
            });
        }
        trace!(xid, len = bytes.len(), "encoded message");
        Ok(bytes)
    }

    /// Length of the message at the front of `buf`, or `None` until a whole
    /// header is available.
    pub fn frame_len(&self, buf: &[u8]) -> Result<Option<usize>> {
        if buf.len() < OfpHeader::size() {
            return Ok(None);
        }
        let header = OfpHeader::parse(&mut OfpReader::new(buf))?;
        Ok(Some(header.length()))
    }

    /// Decode one complete message. `buf` must hold exactly the bytes the
    /// header declares.
    ///
    /// Failures are logged and returned; the message is dropped.
    pub fn decode(&self, buf: &[u8]) -> Result<(u32, Message)> {
        let mut bytes = OfpReader::new(buf).strict_padding(self.config.strict_padding);
        let header = OfpHeader::parse(&mut bytes)?;
        self.decode_body(&header, &mut bytes).map_err(|err| {
            warn!(
                xid = header.xid(),
                msg_type = header.type_code(),
                len = buf.len(),
                %err,
                "dropping undecodable message"
            );
            err
        })
    }

    fn decode_body(&self, header: &OfpHeader, bytes: &mut OfpReader<'_>) -> Result<(u32, Message)> {
        if header.version() != self.config.version {
            return Err(CodecError::UnsupportedVersion {
                version: header.version(),
            });
        }
        if header.length() != bytes.remaining() + OfpHeader::size() {
            return Err(CodecError::LengthMismatch {
                structure: "message",
                declared: header.length(),
                actual: bytes.remaining() + OfpHeader::size(),
            });
        }
        let mut body = bytes.sub_reader(header.length() - OfpHeader::size())?;
        Message::parse(header, &mut body, &self.registry)
    }
}
