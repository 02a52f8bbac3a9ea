//! Nicira extension actions and the codec that frames them as experimenter
//! actions.

use tracing::trace;

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::experimenter::{decode_vendor_frame, encode_vendor_frame, finish_body, FramePadding};
use crate::openflow0x04::action::{Action, ExperimenterAction};
use crate::openflow0x04::oxm::{decode_required_entry, encode_match_entry, MatchEntry};
use crate::registry::{CodecRegistry, Deserializer, Serializer};

use super::conntrack::{NxConntrack, NxNat};
use super::learn::NxLearn;
use super::nxm::{read_field_header, write_field_header};
use super::*;

/// `in_port` value meaning "the packet's own input port".
const OFPP_IN_PORT: u16 = 0xfff8;
/// `table` value meaning "the current table".
const TABLE_CURRENT: u8 = 0xff;

/// Resubmit to a table, or to the current one.
///
/// `with_table` picks the wire form: `resubmit_table` (14) or plain
/// `resubmit` (1). Both carry the table byte; plain `resubmit` reserves it and
/// switches ignore it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NxResubmit {
    /// `None` resubmits with the packet's own input port.
    pub in_port: Option<u16>,
    /// `None` is the current table, 0xff on the wire.
    pub table: Option<u8>,
    pub with_table: bool,
}

impl NxResubmit {
    /// Plain `resubmit` through `in_port`, with the reserved byte zeroed.
    pub fn resubmit(in_port: Option<u16>) -> NxResubmit {
        NxResubmit {
            in_port,
            table: Some(0),
            with_table: false,
        }
    }

    /// `resubmit_table` to `table`.
    pub fn resubmit_table(in_port: Option<u16>, table: Option<u8>) -> NxResubmit {
        NxResubmit {
            in_port,
            table,
            with_table: true,
        }
    }
}

/// Copy `n_bits` bits between two fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NxRegMove {
    pub n_bits: u16,
    pub src_ofs: u16,
    pub dst_ofs: u16,
    /// Field headers; experimenter fields carry their experimenter id in the
    /// low 32 bits.
    pub src: u64,
    pub dst: u64,
}

/// Load an immediate into bits `ofs_nbits` of the NXM field `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NxRegLoad {
    pub ofs_nbits: u16,
    pub dst: u32,
    pub value: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NxMultipath {
    pub fields: u16,
    pub basis: u16,
    pub algorithm: u16,
    pub max_link: u16,
    pub arg: u32,
    pub ofs_nbits: u16,
    pub dst: u32,
}

/// Actions defined by the Nicira vendor extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NxAction {
    Resubmit(NxResubmit),
    RegMove(NxRegMove),
    RegLoad(NxRegLoad),
    RegLoad2(MatchEntry),
    OutputReg { ofs_nbits: u16, src: u32, max_len: u16 },
    OutputReg2 { ofs_nbits: u16, src: u64, max_len: u16 },
    Multipath(NxMultipath),
    Learn(NxLearn),
    FinTimeout { fin_idle_timeout: u16, fin_hard_timeout: u16 },
    Conntrack(NxConntrack),
    Nat(NxNat),
    CtClear,
    Encap { hdr_size: u16, packet_type: u32 },
    Decap { packet_type: u32 },
    DecNshTtl,
}

impl NxAction {
    /// The vendor subtype this action is encoded under.
    pub fn subtype(&self) -> u16 {
        match *self {
            NxAction::Resubmit(NxResubmit { with_table: false, .. }) => NXAST_RESUBMIT,
            NxAction::Resubmit(NxResubmit { with_table: true, .. }) => NXAST_RESUBMIT_TABLE,
            NxAction::RegMove(_) => NXAST_REG_MOVE,
            NxAction::RegLoad(_) => NXAST_REG_LOAD,
            NxAction::RegLoad2(_) => NXAST_REG_LOAD2,
            NxAction::OutputReg { .. } => NXAST_OUTPUT_REG,
            NxAction::OutputReg2 { .. } => NXAST_OUTPUT_REG2,
            NxAction::Multipath(_) => NXAST_MULTIPATH,
            NxAction::Learn(_) => NXAST_LEARN,
            NxAction::FinTimeout { .. } => NXAST_FIN_TIMEOUT,
            NxAction::Conntrack(_) => NXAST_CT,
            NxAction::Nat(_) => NXAST_NAT,
            NxAction::CtClear => NXAST_CT_CLEAR,
            NxAction::Encap { .. } => NXAST_RAW_ENCAP,
            NxAction::Decap { .. } => NXAST_RAW_DECAP,
            NxAction::DecNshTtl => NXAST_DEC_NSH_TTL,
        }
    }

    fn marshal_body(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        match *self {
            NxAction::Resubmit(NxResubmit { in_port, table, .. }) => {
                bytes.write_u16(in_port.unwrap_or(OFPP_IN_PORT));
                bytes.write_u8(table.unwrap_or(TABLE_CURRENT));
            }
            NxAction::RegMove(ref mv) => {
                bytes.write_u16(mv.n_bits);
                bytes.write_u16(mv.src_ofs);
                bytes.write_u16(mv.dst_ofs);
                write_field_header(bytes, mv.src);
                write_field_header(bytes, mv.dst);
            }
            NxAction::RegLoad(ref load) => {
                bytes.write_u16(load.ofs_nbits);
                bytes.write_u32(load.dst);
                bytes.write_u64(load.value);
            }
            NxAction::RegLoad2(ref entry) => encode_match_entry(entry, bytes, registry)?,
            NxAction::OutputReg { ofs_nbits, src, max_len } => {
                bytes.write_u16(ofs_nbits);
                bytes.write_u32(src);
                bytes.write_u16(max_len);
                bytes.write_zero(6);
            }
            NxAction::OutputReg2 { ofs_nbits, src, max_len } => {
                bytes.write_u16(ofs_nbits);
                bytes.write_u16(max_len);
                write_field_header(bytes, src);
            }
            NxAction::Multipath(ref mp) => {
                bytes.write_u16(mp.fields);
                bytes.write_u16(mp.basis);
                bytes.write_zero(2);
                bytes.write_u16(mp.algorithm);
                bytes.write_u16(mp.max_link);
                bytes.write_u32(mp.arg);
                bytes.write_zero(2);
                bytes.write_u16(mp.ofs_nbits);
                bytes.write_u32(mp.dst);
            }
            NxAction::Learn(ref learn) => learn.marshal(bytes)?,
            NxAction::FinTimeout {
                fin_idle_timeout,
                fin_hard_timeout,
            } => {
                bytes.write_u16(fin_idle_timeout);
                bytes.write_u16(fin_hard_timeout);
            }
            NxAction::Conntrack(ref ct) => ct.marshal(bytes, registry)?,
            NxAction::Nat(ref nat) => nat.marshal(bytes),
            NxAction::CtClear | NxAction::DecNshTtl => bytes.write_zero(6),
            NxAction::Encap { hdr_size, packet_type } => {
                bytes.write_u16(hdr_size);
                bytes.write_u32(packet_type);
            }
            NxAction::Decap { packet_type } => {
                bytes.write_zero(2);
                bytes.write_u32(packet_type);
            }
        }
        Ok(())
    }

    fn parse_body(subtype: u16, bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<NxAction> {
        let action = match subtype {
            NXAST_RESUBMIT | NXAST_RESUBMIT_TABLE => {
                let in_port = match bytes.read_u16()? {
                    OFPP_IN_PORT => None,
                    p => Some(p),
                };
                let table = match bytes.read_u8()? {
                    TABLE_CURRENT => None,
                    t => Some(t),
                };
                NxAction::Resubmit(NxResubmit {
                    in_port,
                    table,
                    with_table: subtype == NXAST_RESUBMIT_TABLE,
                })
            }
            NXAST_REG_MOVE => NxAction::RegMove(NxRegMove {
                n_bits: bytes.read_u16()?,
                src_ofs: bytes.read_u16()?,
                dst_ofs: bytes.read_u16()?,
                src: read_field_header(bytes)?,
                dst: read_field_header(bytes)?,
            }),
            NXAST_REG_LOAD => NxAction::RegLoad(NxRegLoad {
                ofs_nbits: bytes.read_u16()?,
                dst: bytes.read_u32()?,
                value: bytes.read_u64()?,
            }),
            NXAST_REG_LOAD2 => NxAction::RegLoad2(decode_required_entry(bytes, registry)?),
            NXAST_OUTPUT_REG => {
                let ofs_nbits = bytes.read_u16()?;
                let src = bytes.read_u32()?;
                let max_len = bytes.read_u16()?;
                bytes.skip_padding(6)?;
                NxAction::OutputReg { ofs_nbits, src, max_len }
            }
            NXAST_OUTPUT_REG2 => {
                let ofs_nbits = bytes.read_u16()?;
                let max_len = bytes.read_u16()?;
                let src = read_field_header(bytes)?;
                NxAction::OutputReg2 { ofs_nbits, src, max_len }
            }
            NXAST_MULTIPATH => {
                let fields = bytes.read_u16()?;
                let basis = bytes.read_u16()?;
                bytes.skip_padding(2)?;
                let algorithm = bytes.read_u16()?;
                let max_link = bytes.read_u16()?;
                let arg = bytes.read_u32()?;
                bytes.skip_padding(2)?;
                NxAction::Multipath(NxMultipath {
                    fields,
                    basis,
                    algorithm,
                    max_link,
                    arg,
                    ofs_nbits: bytes.read_u16()?,
                    dst: bytes.read_u32()?,
                })
            }
            NXAST_LEARN => NxAction::Learn(NxLearn::parse(bytes)?),
            NXAST_FIN_TIMEOUT => NxAction::FinTimeout {
                fin_idle_timeout: bytes.read_u16()?,
                fin_hard_timeout: bytes.read_u16()?,
            },
            NXAST_CT => NxAction::Conntrack(NxConntrack::parse(bytes, registry)?),
            NXAST_NAT => NxAction::Nat(NxNat::parse(bytes)?),
            NXAST_CT_CLEAR => NxAction::CtClear,
            NXAST_RAW_ENCAP => NxAction::Encap {
                hdr_size: bytes.read_u16()?,
                packet_type: bytes.read_u32()?,
            },
            NXAST_RAW_DECAP => {
                bytes.skip_padding(2)?;
                NxAction::Decap {
                    packet_type: bytes.read_u32()?,
                }
            }
            NXAST_DEC_NSH_TTL => NxAction::DecNshTtl,
            other => {
                return Err(CodecError::InvalidValue {
                    structure: "nicira action subtype",
                    value: other as u64,
                })
            }
        };
        Ok(action)
    }
}

/// Codec for one Nicira action subtype.
pub struct NiciraActionCodec {
    subtype: u16,
}

impl NiciraActionCodec {
    pub fn new(subtype: u16) -> NiciraActionCodec {
        NiciraActionCodec { subtype }
    }

    fn mismatch(&self) -> CodecError {
        CodecError::InvalidValue {
            structure: "action for nicira codec",
            value: self.subtype as u64,
        }
    }
}

impl Serializer<Action> for NiciraActionCodec {
    fn serialize(&self, action: &Action, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let nx = match *action {
            Action::Experimenter(ref exp) if exp.experimenter == NX_VENDOR_ID => exp.body::<NxAction>(),
            _ => None,
        };
        let nx = match nx {
            Some(nx) if nx.subtype() == self.subtype => nx,
            _ => return Err(self.mismatch()),
        };
        encode_vendor_frame(out, NX_VENDOR_ID, self.subtype, FramePadding::Counted, |body| {
            nx.marshal_body(body, registry)
        })?;
        Ok(())
    }
}

impl Deserializer<Action> for NiciraActionCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Action> {
        let frame = decode_vendor_frame(input)?;
        if frame.vendor_id != NX_VENDOR_ID || frame.subtype != self.subtype {
            return Err(self.mismatch());
        }
        trace!(subtype = frame.subtype, len = frame.declared_len, "nicira action");
        let mut body = input.sub_reader(frame.body_len())?;
        let nx = NxAction::parse_body(frame.subtype, &mut body, registry)?;
        finish_body(&mut body, "nicira action")?;
        Ok(Action::from(nx))
    }
}

impl From<NxAction> for Action {
    fn from(nx: NxAction) -> Action {
        Action::Experimenter(ExperimenterAction::typed(NX_VENDOR_ID, nx.subtype(), nx))
    }
}
