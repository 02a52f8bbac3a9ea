use crate::buffer::OfpReader;
use crate::error::Result;
use crate::ofp_header::OfpHeader;
use crate::registry::CodecRegistry;

/// OpenFlow Message
///
/// Version-agnostic API for handling OpenFlow messages at the byte-buffer level.
pub trait OfpMessage: Sized {
    /// Return the OpenFlow message type code of `msg`.
    fn type_code(msg: &Self) -> u8;
    /// Return a marshaled buffer containing an OpenFlow header and the message `msg`.
    ///
    /// Nothing is returned unless the whole message encoded.
    fn marshal(version: u8, xid: u32, msg: &Self, registry: &CodecRegistry) -> Result<Vec<u8>>;
    /// Returns a pair `(u32, OfpMessage)` of the transaction id and OpenFlow message parsed from
    /// the given OpenFlow header `header`, and the message body `body`.
    fn parse(header: &OfpHeader, body: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<(u32, Self)>;
}
