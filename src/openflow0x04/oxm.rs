//! OXM (OpenFlow Extensible Match) entries and the `ofp_match` structure that
//! carries them.

use tracing::trace;

use crate::bits::test_bit;
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::registry::{CodecKey, CodecRegistry, CodecTable, Deserializer, Scope, Serializer};

use super::OFP_VERSION;

pub const OFPXMC_NXM_0: u16 = 0x0000;
pub const OFPXMC_NXM_1: u16 = 0x0001;
pub const OFPXMC_OPENFLOW_BASIC: u16 = 0x8000;
pub const OFPXMC_EXPERIMENTER: u16 = 0xffff;

/// `ofp_match` type for OXM-encoded matches.
const OFPMT_OXM: u16 = 1;

/// The 32-bit header in front of every OXM entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OxmHeader {
    pub class: u16,
    pub field: u8,
    pub has_mask: bool,
    /// Payload length, experimenter id included.
    pub length: u8,
}

impl OxmHeader {
    pub fn of_int(h: u32) -> OxmHeader {
        OxmHeader {
            class: (h >> 16) as u16,
            field: ((h >> 9) & 0x7f) as u8,
            has_mask: test_bit(8, h as u64),
            length: (h & 0xff) as u8,
        }
    }

    pub fn to_int(&self) -> u32 {
        (self.class as u32) << 16
            | ((self.field as u32) & 0x7f) << 9
            | (self.has_mask as u32) << 8
            | self.length as u32
    }
}

/// One match field: class, field, value and optional mask of the field's width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchEntry {
    pub class: u16,
    pub field: u8,
    /// Present iff `class` is `OFPXMC_EXPERIMENTER`.
    pub experimenter: Option<u32>,
    pub value: Vec<u8>,
    pub mask: Option<Vec<u8>>,
}

impl MatchEntry {
    pub fn new(class: u16, field: u8, value: Vec<u8>) -> MatchEntry {
        MatchEntry {
            class,
            field,
            experimenter: None,
            value,
            mask: None,
        }
    }

    pub fn masked(class: u16, field: u8, value: Vec<u8>, mask: Vec<u8>) -> MatchEntry {
        MatchEntry {
            mask: Some(mask),
            ..MatchEntry::new(class, field, value)
        }
    }

    /// An OpenFlow basic class entry.
    pub fn basic(field: u8, value: Vec<u8>) -> MatchEntry {
        MatchEntry::new(OFPXMC_OPENFLOW_BASIC, field, value)
    }

    /// An experimenter class entry owned by `experimenter`.
    pub fn experimenter(experimenter: u32, field: u8, value: Vec<u8>, mask: Option<Vec<u8>>) -> MatchEntry {
        MatchEntry {
            class: OFPXMC_EXPERIMENTER,
            field,
            experimenter: Some(experimenter),
            value,
            mask,
        }
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    pub fn header(&self) -> OxmHeader {
        let mut length = self.value.len() + self.mask.as_ref().map_or(0, |m| m.len());
        if self.experimenter.is_some() {
            length += 4;
        }
        OxmHeader {
            class: self.class,
            field: self.field,
            has_mask: self.has_mask(),
            length: length as u8,
        }
    }

    /// Value bytes as a big-endian integer. Only meaningful for fields up to 8 bytes.
    pub fn value_u64(&self) -> u64 {
        self.value.iter().fold(0, |acc, &b| (acc << 8) | b as u64)
    }

    pub fn codec_key(&self) -> CodecKey {
        field_key(self.class, self.field, self.experimenter)
    }
}

fn field_key(class: u16, field: u8, experimenter: Option<u32>) -> CodecKey {
    let scope = Scope::MatchField { class, field };
    match experimenter {
        Some(id) if class == OFPXMC_EXPERIMENTER => CodecKey::vendor(OFP_VERSION, scope, id, None),
        _ => CodecKey::core(OFP_VERSION, scope),
    }
}

/// Codec for a fixed-width OXM field.
pub struct OxmFieldCodec {
    pub name: &'static str,
    pub width: usize,
}

impl OxmFieldCodec {
    fn check_width(&self, len: usize) -> Result<()> {
        if len != self.width {
            return Err(CodecError::LengthMismatch {
                structure: self.name,
                declared: len,
                actual: self.width,
            });
        }
        Ok(())
    }
}

impl Serializer<MatchEntry> for OxmFieldCodec {
    fn serialize(&self, entry: &MatchEntry, out: &mut OfpWriter, _: &CodecRegistry) -> Result<()> {
        self.check_width(entry.value.len())?;
        if let Some(ref mask) = entry.mask {
            self.check_width(mask.len())?;
        }
        out.write_u32(entry.header().to_int());
        if let Some(experimenter) = entry.experimenter {
            out.write_u32(experimenter);
        }
        out.write_bytes(&entry.value);
        if let Some(ref mask) = entry.mask {
            out.write_bytes(mask);
        }
        Ok(())
    }
}

impl Deserializer<MatchEntry> for OxmFieldCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, _: &CodecRegistry) -> Result<MatchEntry> {
        let header = OxmHeader::of_int(input.read_u32()?);
        let mut payload_len = header.length as usize;
        let experimenter = if header.class == OFPXMC_EXPERIMENTER {
            if payload_len < 4 {
                return Err(CodecError::LengthMismatch {
                    structure: self.name,
                    declared: payload_len,
                    actual: 4,
                });
            }
            payload_len -= 4;
            Some(input.read_u32()?)
        } else {
            None
        };
        let expected = if header.has_mask { 2 * self.width } else { self.width };
        if payload_len != expected {
            return Err(CodecError::LengthMismatch {
                structure: self.name,
                declared: payload_len,
                actual: expected,
            });
        }
        let value = input.read_bytes(self.width)?.to_vec();
        let mask = if header.has_mask {
            Some(input.read_bytes(self.width)?.to_vec())
        } else {
            None
        };
        Ok(MatchEntry {
            class: header.class,
            field: header.field,
            experimenter,
            value,
            mask,
        })
    }
}

/// Register fixed-width codecs for `fields` (id, name, width) under `class`.
pub fn register_fields(
    table: &mut CodecTable<MatchEntry>,
    class: u16,
    experimenter: Option<u32>,
    fields: &[(u8, &'static str, usize)],
) -> Result<()> {
    for &(field, name, width) in fields {
        table.register(field_key(class, field, experimenter), OxmFieldCodec { name, width })?;
    }
    Ok(())
}

/// OpenFlow basic class field ids.
pub mod basic {
    pub const IN_PORT: u8 = 0;
    pub const IN_PHY_PORT: u8 = 1;
    pub const METADATA: u8 = 2;
    pub const ETH_DST: u8 = 3;
    pub const ETH_SRC: u8 = 4;
    pub const ETH_TYPE: u8 = 5;
    pub const VLAN_VID: u8 = 6;
    pub const VLAN_PCP: u8 = 7;
    pub const IP_DSCP: u8 = 8;
    pub const IP_ECN: u8 = 9;
    pub const IP_PROTO: u8 = 10;
    pub const IPV4_SRC: u8 = 11;
    pub const IPV4_DST: u8 = 12;
    pub const TCP_SRC: u8 = 13;
    pub const TCP_DST: u8 = 14;
    pub const UDP_SRC: u8 = 15;
    pub const UDP_DST: u8 = 16;
    pub const SCTP_SRC: u8 = 17;
    pub const SCTP_DST: u8 = 18;
    pub const ICMPV4_TYPE: u8 = 19;
    pub const ICMPV4_CODE: u8 = 20;
    pub const ARP_OP: u8 = 21;
    pub const ARP_SPA: u8 = 22;
    pub const ARP_TPA: u8 = 23;
    pub const ARP_SHA: u8 = 24;
    pub const ARP_THA: u8 = 25;
    pub const IPV6_SRC: u8 = 26;
    pub const IPV6_DST: u8 = 27;
    pub const IPV6_FLABEL: u8 = 28;
    pub const ICMPV6_TYPE: u8 = 29;
    pub const ICMPV6_CODE: u8 = 30;
    pub const IPV6_ND_TARGET: u8 = 31;
    pub const IPV6_ND_SLL: u8 = 32;
    pub const IPV6_ND_TLL: u8 = 33;
    pub const MPLS_LABEL: u8 = 34;
    pub const MPLS_TC: u8 = 35;
    pub const MPLS_BOS: u8 = 36;
    pub const PBB_ISID: u8 = 37;
    pub const TUNNEL_ID: u8 = 38;
    pub const IPV6_EXTHDR: u8 = 39;

    /// (field, name, width in bytes)
    pub const FIELDS: &[(u8, &str, usize)] = &[
        (IN_PORT, "in_port", 4),
        (IN_PHY_PORT, "in_phy_port", 4),
        (METADATA, "metadata", 8),
        (ETH_DST, "eth_dst", 6),
        (ETH_SRC, "eth_src", 6),
        (ETH_TYPE, "eth_type", 2),
        (VLAN_VID, "vlan_vid", 2),
        (VLAN_PCP, "vlan_pcp", 1),
        (IP_DSCP, "ip_dscp", 1),
        (IP_ECN, "ip_ecn", 1),
        (IP_PROTO, "ip_proto", 1),
        (IPV4_SRC, "ipv4_src", 4),
        (IPV4_DST, "ipv4_dst", 4),
        (TCP_SRC, "tcp_src", 2),
        (TCP_DST, "tcp_dst", 2),
        (UDP_SRC, "udp_src", 2),
        (UDP_DST, "udp_dst", 2),
        (SCTP_SRC, "sctp_src", 2),
        (SCTP_DST, "sctp_dst", 2),
        (ICMPV4_TYPE, "icmpv4_type", 1),
        (ICMPV4_CODE, "icmpv4_code", 1),
        (ARP_OP, "arp_op", 2),
        (ARP_SPA, "arp_spa", 4),
        (ARP_TPA, "arp_tpa", 4),
        (ARP_SHA, "arp_sha", 6),
        (ARP_THA, "arp_tha", 6),
        (IPV6_SRC, "ipv6_src", 16),
        (IPV6_DST, "ipv6_dst", 16),
        (IPV6_FLABEL, "ipv6_flabel", 4),
        (ICMPV6_TYPE, "icmpv6_type", 1),
        (ICMPV6_CODE, "icmpv6_code", 1),
        (IPV6_ND_TARGET, "ipv6_nd_target", 16),
        (IPV6_ND_SLL, "ipv6_nd_sll", 6),
        (IPV6_ND_TLL, "ipv6_nd_tll", 6),
        (MPLS_LABEL, "mpls_label", 4),
        (MPLS_TC, "mpls_tc", 1),
        (MPLS_BOS, "mpls_bos", 1),
        (PBB_ISID, "pbb_isid", 3),
        (TUNNEL_ID, "tunnel_id", 8),
        (IPV6_EXTHDR, "ipv6_exthdr", 2),
    ];
}

pub fn encode_match_entry(entry: &MatchEntry, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    registry
        .match_entries()
        .serializer_or_fail(&entry.codec_key())?
        .serialize(entry, out, registry)
}

/// Decode the entry at the front of `input`.
///
/// Returns `Ok(None)` when the entry belongs to an experimenter with no
/// registered codec and was skipped.
pub fn decode_match_entry(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Option<MatchEntry>> {
    let header = OxmHeader::of_int(input.peek_u32_at(0)?);
    let offset = input.offset();
    let total = 4 + header.length as usize;
    let mut item = input.sub_reader(total)?;
    let experimenter = if header.class == OFPXMC_EXPERIMENTER {
        Some(item.peek_u32_at(4)?)
    } else {
        None
    };
    let key = field_key(header.class, header.field, experimenter);
    trace!(%key, offset, "oxm entry");
    match registry.match_entries().deserializer(&key) {
        Some(codec) => {
            let entry = codec.deserialize(&mut item, registry)?;
            item.finish("oxm entry")?;
            Ok(Some(entry))
        }
        None if key.is_vendor() => {
            registry.unknown_extension(&key, total, offset)?;
            Ok(None)
        }
        None => Err(key.miss_error()),
    }
}

/// Decode exactly one entry, failing if it cannot be represented.
pub fn decode_required_entry(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<MatchEntry> {
    let header = OxmHeader::of_int(input.peek_u32_at(0)?);
    let experimenter = if header.class == OFPXMC_EXPERIMENTER {
        Some(input.peek_u32_at(4)?)
    } else {
        None
    };
    let key = field_key(header.class, header.field, experimenter);
    let mut item = input.sub_reader(4 + header.length as usize)?;
    let entry = registry
        .match_entries()
        .deserializer_or_fail(&key)?
        .deserialize(&mut item, registry)?;
    item.finish("oxm entry")?;
    Ok(entry)
}

/// Fields to match against flows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub fields: Vec<MatchEntry>,
}

impl Pattern {
    pub fn new() -> Pattern {
        Pattern::default()
    }

    pub fn with(mut self, entry: MatchEntry) -> Pattern {
        self.fields.push(entry);
        self
    }

    /// Write an OXM `ofp_match`. The declared length leaves out the trailing padding.
    pub fn marshal(&self, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let start = out.len();
        out.write_u16(OFPMT_OXM);
        let len_pos = out.reserve_u16();
        for entry in &self.fields {
            encode_match_entry(entry, out, registry)?;
        }
        out.backfill_len("ofp_match", len_pos, start)?;
        out.pad_to_alignment(start);
        Ok(())
    }

    pub fn parse(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Pattern> {
        let typ = input.read_u16()?;
        if typ != OFPMT_OXM {
            return Err(CodecError::InvalidValue {
                structure: "ofp_match type",
                value: typ as u64,
            });
        }
        let len = input.read_u16()? as usize;
        if len < 4 {
            return Err(CodecError::LengthMismatch {
                structure: "ofp_match",
                declared: len,
                actual: 4,
            });
        }
        let mut entries = input.sub_reader(len - 4)?;
        let mut fields = vec![];
        while !entries.is_empty() {
            if let Some(entry) = decode_match_entry(&mut entries, registry)? {
                fields.push(entry);
            }
        }
        input.skip_alignment(len)?;
        Ok(Pattern { fields })
    }
}
