use std::mem::size_of;

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};

/// OpenFlow Header
///
/// The first fields of every OpenFlow message, no matter the protocol version.
/// This is parsed to determine version and length of the remaining message, so that
/// it can be properly handled.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfpHeader {
    version: u8,
    typ: u8,
    length: u16,
    xid: u32,
}

impl OfpHeader {
    /// Create an `OfpHeader` out of the arguments.
    pub fn new(version: u8, typ: u8, length: u16, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ,
            length,
            xid,
        }
    }

    /// Return the byte-size of an `OfpHeader`.
    pub fn size() -> usize {
        size_of::<OfpHeader>()
    }

    /// Fills a message buffer with the header fields of an `OfpHeader`.
    pub fn marshal(bytes: &mut OfpWriter, header: OfpHeader) {
        bytes.write_u8(header.version());
        bytes.write_u8(header.type_code());
        bytes.write_u16(header.length);
        bytes.write_u32(header.xid());
    }

    /// Reads an `OfpHeader` off the front of `bytes`.
    ///
    /// The declared length must cover at least the header itself.
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<OfpHeader> {
        let header = OfpHeader {
            version: bytes.read_u8()?,
            typ: bytes.read_u8()?,
            length: bytes.read_u16()?,
            xid: bytes.read_u32()?,
        };
        if header.length() < OfpHeader::size() {
            return Err(CodecError::LengthMismatch {
                structure: "ofp_header",
                declared: header.length(),
                actual: OfpHeader::size(),
            });
        }
        Ok(header)
    }

    /// Return the `version` field of a header.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Return the raw OpenFlow message type code of a header.
    pub fn type_code(&self) -> u8 {
        self.typ
    }

    /// Return the `length` field of a header. Includes the length of the header itself.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Return the `xid` field of a header, the transaction id associated with this packet.
    ///  Replies use the same id to facilitate pairing.
    pub fn xid(&self) -> u32 {
        self.xid
    }
}
