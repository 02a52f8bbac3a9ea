//! The Nicira `learn` action: a flow template the switch instantiates from
//! packets that execute it.

use tracing::trace;

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};

const SRC_MASK: u16 = 0x2000;
const DST_MASK: u16 = 0x1800;
const N_BITS_MASK: u16 = 0x07ff;
const SRC_SHIFT: u16 = 13;
const DST_SHIFT: u16 = 11;

/// One flow-mod spec of a learned flow.
///
/// `n_bits` is the width of the copied or matched bit range and must fit in
/// 11 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModSpec {
    /// Match the learned flow on `dst` equal to the packet's `src`.
    AddMatchFromField {
        n_bits: u16,
        src: u32,
        src_ofs: u16,
        dst: u32,
        dst_ofs: u16,
    },
    /// Match the learned flow on `field` equal to `value`.
    AddMatchFromValue {
        n_bits: u16,
        value: u16,
        field: u32,
        ofs: u16,
    },
    /// Load the packet's `src` into `dst` when the learned flow executes.
    CopyFieldIntoField {
        n_bits: u16,
        src: u32,
        src_ofs: u16,
        dst: u32,
        dst_ofs: u16,
    },
    /// Load `value` into `dst` when the learned flow executes.
    CopyValueIntoField {
        n_bits: u16,
        value: u16,
        dst: u32,
        dst_ofs: u16,
    },
    /// Output to the port held in `src`.
    OutputToPort { n_bits: u16, src: u32, src_ofs: u16 },
}

impl FlowModSpec {
    fn n_bits(&self) -> u16 {
        match *self {
            FlowModSpec::AddMatchFromField { n_bits, .. }
            | FlowModSpec::AddMatchFromValue { n_bits, .. }
            | FlowModSpec::CopyFieldIntoField { n_bits, .. }
            | FlowModSpec::CopyValueIntoField { n_bits, .. }
            | FlowModSpec::OutputToPort { n_bits, .. } => n_bits,
        }
    }

    /// (src, dst) selectors of the spec header.
    fn selectors(&self) -> (u16, u16) {
        match *self {
            FlowModSpec::AddMatchFromField { .. } => (0, 0),
            FlowModSpec::AddMatchFromValue { .. } => (1, 0),
            FlowModSpec::CopyFieldIntoField { .. } => (0, 1),
            FlowModSpec::CopyValueIntoField { .. } => (1, 1),
            FlowModSpec::OutputToPort { .. } => (0, 2),
        }
    }

    /// Encoded size, spec header included.
    pub fn size_of(&self) -> usize {
        match *self {
            FlowModSpec::AddMatchFromField { .. } | FlowModSpec::CopyFieldIntoField { .. } => 14,
            FlowModSpec::AddMatchFromValue { .. } | FlowModSpec::CopyValueIntoField { .. } => 10,
            FlowModSpec::OutputToPort { .. } => 8,
        }
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        let n_bits = self.n_bits();
        if n_bits > N_BITS_MASK {
            return Err(CodecError::InvalidValue {
                structure: "learn spec n_bits",
                value: n_bits as u64,
            });
        }
        let (src, dst) = self.selectors();
        bytes.write_u16(src << SRC_SHIFT | dst << DST_SHIFT | n_bits);
        match *self {
            FlowModSpec::AddMatchFromField {
                src, src_ofs, dst, dst_ofs, ..
            }
            | FlowModSpec::CopyFieldIntoField {
                src, src_ofs, dst, dst_ofs, ..
            } => {
                bytes.write_u32(src);
                bytes.write_u16(src_ofs);
                bytes.write_u32(dst);
                bytes.write_u16(dst_ofs);
            }
            FlowModSpec::AddMatchFromValue {
                value, field: dst, ofs: dst_ofs, ..
            }
            | FlowModSpec::CopyValueIntoField { value, dst, dst_ofs, .. } => {
                bytes.write_u16(value);
                bytes.write_u32(dst);
                bytes.write_u16(dst_ofs);
            }
            FlowModSpec::OutputToPort { src, src_ofs, .. } => {
                bytes.write_u32(src);
                bytes.write_u16(src_ofs);
            }
        }
        Ok(())
    }

    /// Read the spec whose header word `header` has already been consumed.
    fn parse(header: u16, bytes: &mut OfpReader<'_>) -> Result<FlowModSpec> {
        let n_bits = header & N_BITS_MASK;
        let src = (header & SRC_MASK) >> SRC_SHIFT;
        let dst = (header & DST_MASK) >> DST_SHIFT;
        let spec = match (src, dst) {
            (0, 0) => FlowModSpec::AddMatchFromField {
                n_bits,
                src: bytes.read_u32()?,
                src_ofs: bytes.read_u16()?,
                dst: bytes.read_u32()?,
                dst_ofs: bytes.read_u16()?,
            },
            (1, 0) => FlowModSpec::AddMatchFromValue {
                n_bits,
                value: bytes.read_u16()?,
                field: bytes.read_u32()?,
                ofs: bytes.read_u16()?,
            },
            (0, 1) => FlowModSpec::CopyFieldIntoField {
                n_bits,
                src: bytes.read_u32()?,
                src_ofs: bytes.read_u16()?,
                dst: bytes.read_u32()?,
                dst_ofs: bytes.read_u16()?,
            },
            (1, 1) => FlowModSpec::CopyValueIntoField {
                n_bits,
                value: bytes.read_u16()?,
                dst: bytes.read_u32()?,
                dst_ofs: bytes.read_u16()?,
            },
            (0, 2) => FlowModSpec::OutputToPort {
                n_bits,
                src: bytes.read_u32()?,
                src_ofs: bytes.read_u16()?,
            },
            _ => {
                return Err(CodecError::InvalidValue {
                    structure: "learn spec header",
                    value: header as u64,
                })
            }
        };
        Ok(spec)
    }
}

/// Body of a `learn` action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NxLearn {
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub priority: u16,
    pub cookie: u64,
    pub flags: u16,
    pub table_id: u8,
    pub fin_idle_timeout: u16,
    pub fin_hard_timeout: u16,
    pub flow_mods: Vec<FlowModSpec>,
}

impl NxLearn {
    /// Fixed part following the vendor header.
    pub const FIXED_LEN: usize = 22;

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        bytes.write_u16(self.idle_timeout);
        bytes.write_u16(self.hard_timeout);
        bytes.write_u16(self.priority);
        bytes.write_u64(self.cookie);
        bytes.write_u16(self.flags);
        bytes.write_u8(self.table_id);
        bytes.write_zero(1);
        bytes.write_u16(self.fin_idle_timeout);
        bytes.write_u16(self.fin_hard_timeout);
        for spec in &self.flow_mods {
            spec.marshal(bytes)?;
        }
        Ok(())
    }

    /// Parse a learn body. Zero spec header words are padding.
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<NxLearn> {
        let idle_timeout = bytes.read_u16()?;
        let hard_timeout = bytes.read_u16()?;
        let priority = bytes.read_u16()?;
        let cookie = bytes.read_u64()?;
        let flags = bytes.read_u16()?;
        let table_id = bytes.read_u8()?;
        bytes.skip_padding(1)?;
        let fin_idle_timeout = bytes.read_u16()?;
        let fin_hard_timeout = bytes.read_u16()?;
        let mut flow_mods = vec![];
        while bytes.remaining() >= 2 {
            let offset = bytes.offset();
            let header = bytes.read_u16()?;
            if header == 0 {
                trace!(offset, "learn padding");
                continue;
            }
            flow_mods.push(FlowModSpec::parse(header, bytes)?);
        }
        Ok(NxLearn {
            idle_timeout,
            hard_timeout,
            priority,
            cookie,
            flags,
            table_id,
            fin_idle_timeout,
            fin_hard_timeout,
            flow_mods,
        })
    }
}
