//! The experimenter (vendor) frame shared by vendor-scoped structures:
//! marker, total length, vendor id, vendor subtype.

use std::any::Any;
use std::fmt;

use crate::bits::ALIGNMENT;
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};

/// Type code marking a structure as experimenter-defined.
pub const EXPERIMENTER_MARKER: u16 = 0xffff;

/// marker(2) + length(2) + vendor id(4) + subtype(2)
pub const VENDOR_HEADER_LEN: usize = 10;

/// How a vendor frame treats alignment padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePadding {
    /// Pad to 8 bytes and count the padding in the declared length (actions).
    Counted,
    /// Pad to 8 bytes but leave the padding out of the declared length.
    Uncounted,
    /// No trailing padding.
    Unpadded,
}

/// A decoded vendor frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorFrame {
    pub vendor_id: u32,
    pub subtype: u16,
    pub declared_len: usize,
}

impl VendorFrame {
    /// Bytes that follow the header within the declared length.
    pub fn body_len(&self) -> usize {
        self.declared_len - VENDOR_HEADER_LEN
    }
}

/// A vendor structure decoded into the vendor's own type.
///
/// Implemented for every `Debug + Clone + PartialEq` type, so a provider only
/// has to define its body type; core code stores it without knowing it.
pub trait ExperimenterBody: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn clone_body(&self) -> Box<dyn ExperimenterBody>;
    fn eq_body(&self, other: &dyn ExperimenterBody) -> bool;
}

impl<T> ExperimenterBody for T
where
    T: fmt::Debug + Clone + PartialEq + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_body(&self) -> Box<dyn ExperimenterBody> {
        Box::new(self.clone())
    }

    fn eq_body(&self, other: &dyn ExperimenterBody) -> bool {
        other.as_any().downcast_ref::<T>().map_or(false, |o| o == self)
    }
}

/// Write a vendor frame whose body is produced by `payload`, backfilling the
/// length once the body is known.
pub fn encode_vendor_frame<F>(
    out: &mut OfpWriter,
    vendor_id: u32,
    subtype: u16,
    padding: FramePadding,
    payload: F,
) -> Result<usize>
where
    F: FnOnce(&mut OfpWriter) -> Result<()>,
{
    let start = out.len();
    out.write_u16(EXPERIMENTER_MARKER);
    let len_pos = out.reserve_u16();
    out.write_u32(vendor_id);
    out.write_u16(subtype);
    payload(out)?;
    match padding {
        FramePadding::Counted => {
            out.pad_to_alignment(start);
            out.backfill_len("vendor frame", len_pos, start)
        }
        FramePadding::Uncounted => {
            let len = out.backfill_len("vendor frame", len_pos, start)?;
            out.pad_to_alignment(start);
            Ok(len)
        }
        FramePadding::Unpadded => out.backfill_len("vendor frame", len_pos, start),
    }
}

/// Consume a vendor frame header and validate its declared length against
/// the bytes available to the caller.
pub fn decode_vendor_frame(input: &mut OfpReader<'_>) -> Result<VendorFrame> {
    let available = input.remaining();
    let marker = input.read_u16()?;
    if marker != EXPERIMENTER_MARKER {
        return Err(CodecError::InvalidValue {
            structure: "vendor frame marker",
            value: marker as u64,
        });
    }
    let declared_len = input.read_u16()? as usize;
    let vendor_id = input.read_u32()?;
    let subtype = input.read_u16()?;
    if declared_len < VENDOR_HEADER_LEN {
        return Err(CodecError::LengthMismatch {
            structure: "vendor frame",
            declared: declared_len,
            actual: VENDOR_HEADER_LEN,
        });
    }
    if declared_len > available {
        return Err(CodecError::TruncatedInput {
            offset: input.offset(),
            needed: declared_len - VENDOR_HEADER_LEN,
            remaining: input.remaining(),
        });
    }
    Ok(VendorFrame {
        vendor_id,
        subtype,
        declared_len,
    })
}

/// Consume the alignment padding left at the end of a vendor body.
///
/// More than one alignment unit of unread bytes means the body decoder and the
/// declared length disagree.
pub fn finish_body(body: &mut OfpReader<'_>, structure: &'static str) -> Result<()> {
    let left = body.remaining();
    if left >= ALIGNMENT {
        return Err(CodecError::LengthMismatch {
            structure,
            declared: body.position() + left,
            actual: body.position(),
        });
    }
    body.skip_padding(left)
}
