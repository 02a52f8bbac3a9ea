//! Connection tracking: the `ct` action and the `nat` action nested inside it.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::Result;
use crate::openflow0x04::action::{decode_actions, encode_actions, Action};
use crate::registry::CodecRegistry;

use super::nxm;

/// Recirculation table meaning "do not recirculate".
const NX_CT_RECIRC_NONE: u8 = 0xff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtFlags {
    pub commit: bool,
    pub force: bool,
}

impl CtFlags {
    pub fn of_int(d: u16) -> CtFlags {
        let d = d as u64;
        CtFlags {
            commit: test_bit(0, d),
            force: test_bit(1, d),
        }
    }

    pub fn to_int(&self) -> u16 {
        let mut d = 0;
        d = bit(0, d, self.commit);
        d = bit(1, d, self.force);
        d as u16
    }
}

/// Where the connection tracking zone comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtZone {
    Immediate(u16),
    /// Bits `ofs_nbits` of the field named by `src`.
    Field { src: u32, ofs_nbits: u16 },
}

impl Default for CtZone {
    fn default() -> CtZone {
        CtZone::Immediate(0)
    }
}

/// Body of a `ct` action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NxConntrack {
    pub flags: CtFlags,
    pub zone: CtZone,
    /// Table to recirculate the packet to after tracking.
    pub recirc_table: Option<u8>,
    pub alg: u16,
    /// Applied to the tracked connection, typically `nat` and `set_field` of
    /// `ct_mark` or `ct_label`.
    pub actions: Vec<Action>,
}

impl NxConntrack {
    /// Fixed part following the vendor header.
    pub const FIXED_LEN: usize = 14;

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        bytes.write_u16(self.flags.to_int());
        match self.zone {
            CtZone::Immediate(zone) => {
                bytes.write_u32(0);
                bytes.write_u16(zone);
            }
            CtZone::Field { src, ofs_nbits } => {
                bytes.write_u32(src);
                bytes.write_u16(ofs_nbits);
            }
        }
        bytes.write_u8(self.recirc_table.unwrap_or(NX_CT_RECIRC_NONE));
        bytes.write_zero(3);
        bytes.write_u16(self.alg);
        encode_actions(&self.actions, bytes, registry)
    }

    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<NxConntrack> {
        let flags = CtFlags::of_int(bytes.read_u16()?);
        let zone_src = bytes.read_u32()?;
        let zone_value = bytes.read_u16()?;
        let zone = if zone_src == 0 {
            CtZone::Immediate(zone_value)
        } else {
            CtZone::Field {
                src: zone_src,
                ofs_nbits: zone_value,
            }
        };
        let recirc_table = match bytes.read_u8()? {
            NX_CT_RECIRC_NONE => None,
            t => Some(t),
        };
        bytes.skip_padding(3)?;
        let alg = bytes.read_u16()?;
        let actions = decode_actions(bytes, registry)?;
        Ok(NxConntrack {
            flags,
            zone,
            recirc_table,
            alg,
            actions,
        })
    }

    /// A `ct(commit, zone=zone)` with no nested actions.
    pub fn commit(zone: u16) -> NxConntrack {
        NxConntrack {
            flags: CtFlags {
                commit: true,
                force: false,
            },
            zone: CtZone::Immediate(zone),
            ..NxConntrack::default()
        }
    }

    /// Zone read from the low 16 bits of register `reg`.
    pub fn zone_from_reg(reg: u8) -> CtZone {
        CtZone::Field {
            src: nxm::nxm_nx_reg(reg),
            ofs_nbits: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NatFlags {
    pub src: bool,
    pub dst: bool,
    pub persistent: bool,
    pub proto_hash: bool,
    pub proto_random: bool,
}

impl NatFlags {
    pub fn of_int(d: u16) -> NatFlags {
        let d = d as u64;
        NatFlags {
            src: test_bit(0, d),
            dst: test_bit(1, d),
            persistent: test_bit(2, d),
            proto_hash: test_bit(3, d),
            proto_random: test_bit(4, d),
        }
    }

    pub fn to_int(&self) -> u16 {
        let mut d = 0;
        d = bit(0, d, self.src);
        d = bit(1, d, self.dst);
        d = bit(2, d, self.persistent);
        d = bit(3, d, self.proto_hash);
        d = bit(4, d, self.proto_random);
        d as u16
    }
}

/// Body of a `nat` action. Range members are present on the wire iff `Some`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NxNat {
    pub flags: NatFlags,
    pub ipv4_min: Option<Ipv4Addr>,
    pub ipv4_max: Option<Ipv4Addr>,
    pub ipv6_min: Option<Ipv6Addr>,
    pub ipv6_max: Option<Ipv6Addr>,
    pub proto_min: Option<u16>,
    pub proto_max: Option<u16>,
}

impl NxNat {
    /// Fixed part following the vendor header.
    pub const FIXED_LEN: usize = 6;

    /// Presence bitmap of the range members, in wire order.
    pub fn range_present(&self) -> u16 {
        let mut d = 0;
        d = bit(0, d, self.ipv4_min.is_some());
        d = bit(1, d, self.ipv4_max.is_some());
        d = bit(2, d, self.ipv6_min.is_some());
        d = bit(3, d, self.ipv6_max.is_some());
        d = bit(4, d, self.proto_min.is_some());
        d = bit(5, d, self.proto_max.is_some());
        d as u16
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_zero(2);
        bytes.write_u16(self.flags.to_int());
        bytes.write_u16(self.range_present());
        for addr in self.ipv4_min.iter().chain(self.ipv4_max.iter()) {
            bytes.write_bytes(&addr.octets());
        }
        for addr in self.ipv6_min.iter().chain(self.ipv6_max.iter()) {
            bytes.write_bytes(&addr.octets());
        }
        for &port in self.proto_min.iter().chain(self.proto_max.iter()) {
            bytes.write_u16(port);
        }
    }

    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<NxNat> {
        bytes.skip_padding(2)?;
        let flags = NatFlags::of_int(bytes.read_u16()?);
        let present = bytes.read_u16()? as u64;
        let mut nat = NxNat {
            flags,
            ..NxNat::default()
        };
        if test_bit(0, present) {
            nat.ipv4_min = Some(Ipv4Addr::from(bytes.read_array::<4>()?));
        }
        if test_bit(1, present) {
            nat.ipv4_max = Some(Ipv4Addr::from(bytes.read_array::<4>()?));
        }
        if test_bit(2, present) {
            nat.ipv6_min = Some(Ipv6Addr::from(bytes.read_array::<16>()?));
        }
        if test_bit(3, present) {
            nat.ipv6_max = Some(Ipv6Addr::from(bytes.read_array::<16>()?));
        }
        if test_bit(4, present) {
            nat.proto_min = Some(bytes.read_u16()?);
        }
        if test_bit(5, present) {
            nat.proto_max = Some(bytes.read_u16()?);
        }
        Ok(nat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_bits() {
        assert_eq!(CtFlags::of_int(3), CtFlags { commit: true, force: true });
        let flags = NatFlags {
            dst: true,
            proto_random: true,
            ..NatFlags::default()
        };
        assert_eq!(flags.to_int(), 0x12);
        assert_eq!(NatFlags::of_int(0x12), flags);
    }

    #[test]
    fn range_present_follows_options() {
        let nat = NxNat {
            ipv6_max: Some(Ipv6Addr::LOCALHOST),
            proto_min: Some(1024),
            ..NxNat::default()
        };
        assert_eq!(nat.range_present(), 0b01_1000);
        let mut out = OfpWriter::new();
        nat.marshal(&mut out);
        assert_eq!(out.len(), NxNat::FIXED_LEN + 16 + 2);
        let bytes = out.into_bytes();
        assert_eq!(NxNat::parse(&mut OfpReader::new(&bytes)).unwrap(), nat);
    }

    #[test]
    fn zone_from_field_is_kept_apart_from_immediate() {
        let registry = CodecRegistry::openflow13().unwrap();
        let ct = NxConntrack {
            zone: NxConntrack::zone_from_reg(6),
            recirc_table: Some(2),
            ..NxConntrack::default()
        };
        let mut out = OfpWriter::new();
        ct.marshal(&mut out, &registry).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), NxConntrack::FIXED_LEN);
        assert_eq!(&bytes[2..8], &[0x00, 0x01, 0x0c, 0x04, 0, 15]);
        assert_eq!(bytes[8], 2);
        assert_eq!(NxConntrack::parse(&mut OfpReader::new(&bytes), &registry).unwrap(), ct);
    }
}
