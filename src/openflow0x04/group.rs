//! Group statistics, descriptions and features.

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;

use super::action::{decode_actions, encode_actions, Action};
use super::stats::{parse_fixed, parse_records};

/// Group id meaning "all groups".
pub const OFPG_ALL: u32 = 0xffff_fffc;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    All = 0,
    Select = 1,
    Indirect = 2,
    FastFailover = 3,
}

impl GroupType {
    pub fn of_int(t: u8) -> Result<GroupType> {
        match t {
            0 => Ok(GroupType::All),
            1 => Ok(GroupType::Select),
            2 => Ok(GroupType::Indirect),
            3 => Ok(GroupType::FastFailover),
            t => Err(CodecError::InvalidValue {
                structure: "group type",
                value: t as u64,
            }),
        }
    }
}

/// Packet and byte counters of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounter {
    pub packet_count: u64,
    pub byte_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub group_id: u32,
    pub ref_count: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub bucket_stats: Vec<BucketCounter>,
}

impl GroupStats {
    pub const FIXED_LEN: usize = 40;

    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<GroupStats> {
        bytes.skip(2)?;
        bytes.skip_padding(2)?;
        let group_id = bytes.read_u32()?;
        let ref_count = bytes.read_u32()?;
        bytes.skip_padding(4)?;
        let packet_count = bytes.read_u64()?;
        let byte_count = bytes.read_u64()?;
        let duration_sec = bytes.read_u32()?;
        let duration_nsec = bytes.read_u32()?;
        let bucket_stats = parse_fixed(bytes, |b| {
            Ok(BucketCounter {
                packet_count: b.read_u64()?,
                byte_count: b.read_u64()?,
            })
        })?;
        Ok(GroupStats {
            group_id,
            ref_count,
            packet_count,
            byte_count,
            duration_sec,
            duration_nsec,
            bucket_stats,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        let start = bytes.len();
        let len_pos = bytes.reserve_u16();
        bytes.write_zero(2);
        bytes.write_u32(self.group_id);
        bytes.write_u32(self.ref_count);
        bytes.write_zero(4);
        bytes.write_u64(self.packet_count);
        bytes.write_u64(self.byte_count);
        bytes.write_u32(self.duration_sec);
        bytes.write_u32(self.duration_nsec);
        for counter in &self.bucket_stats {
            bytes.write_u64(counter.packet_count);
            bytes.write_u64(counter.byte_count);
        }
        bytes.backfill_len("group stats", len_pos, start)?;
        Ok(())
    }
}

/// An action set a group may apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub weight: u16,
    pub watch_port: u32,
    pub watch_group: u32,
    pub actions: Vec<Action>,
}

impl Bucket {
    pub const FIXED_LEN: usize = 16;

    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Bucket> {
        bytes.skip(2)?;
        let weight = bytes.read_u16()?;
        let watch_port = bytes.read_u32()?;
        let watch_group = bytes.read_u32()?;
        bytes.skip_padding(4)?;
        let actions = decode_actions(bytes, registry)?;
        Ok(Bucket {
            weight,
            watch_port,
            watch_group,
            actions,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let start = bytes.len();
        let len_pos = bytes.reserve_u16();
        bytes.write_u16(self.weight);
        bytes.write_u32(self.watch_port);
        bytes.write_u32(self.watch_group);
        bytes.write_zero(4);
        encode_actions(&self.actions, bytes, registry)?;
        bytes.backfill_len("bucket", len_pos, start)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDesc {
    pub group_type: GroupType,
    pub group_id: u32,
    pub buckets: Vec<Bucket>,
}

impl GroupDesc {
    pub const FIXED_LEN: usize = 8;

    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<GroupDesc> {
        bytes.skip(2)?;
        let group_type = GroupType::of_int(bytes.read_u8()?)?;
        bytes.skip_padding(1)?;
        let group_id = bytes.read_u32()?;
        let buckets = parse_records(bytes, "bucket", 0, Bucket::FIXED_LEN, |b| Bucket::parse(b, registry))?;
        Ok(GroupDesc {
            group_type,
            group_id,
            buckets,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let start = bytes.len();
        let len_pos = bytes.reserve_u16();
        bytes.write_u8(self.group_type as u8);
        bytes.write_zero(1);
        bytes.write_u32(self.group_id);
        for bucket in &self.buckets {
            bucket.marshal(bytes, registry)?;
        }
        bytes.backfill_len("group desc", len_pos, start)?;
        Ok(())
    }
}

/// Group types supported by the datapath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTypes {
    pub all: bool,
    pub select: bool,
    pub indirect: bool,
    pub fast_failover: bool,
}

impl GroupTypes {
    pub fn of_int(d: u32) -> GroupTypes {
        let d = d as u64;
        GroupTypes {
            all: test_bit(0, d),
            select: test_bit(1, d),
            indirect: test_bit(2, d),
            fast_failover: test_bit(3, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.all);
        d = bit(1, d, self.select);
        d = bit(2, d, self.indirect);
        d = bit(3, d, self.fast_failover);
        d as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCapabilities {
    pub select_weight: bool,
    pub select_liveness: bool,
    pub chaining: bool,
    pub chaining_checks: bool,
}

impl GroupCapabilities {
    pub fn of_int(d: u32) -> GroupCapabilities {
        let d = d as u64;
        GroupCapabilities {
            select_weight: test_bit(0, d),
            select_liveness: test_bit(1, d),
            chaining: test_bit(2, d),
            chaining_checks: test_bit(3, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.select_weight);
        d = bit(1, d, self.select_liveness);
        d = bit(2, d, self.chaining);
        d = bit(3, d, self.chaining_checks);
        d as u32
    }
}

/// Group limits and supported actions, indexed by group type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupFeatures {
    pub types: GroupTypes,
    pub capabilities: GroupCapabilities,
    pub max_groups: [u32; 4],
    /// Bitmaps of supported action types.
    pub actions: [u32; 4],
}

impl GroupFeatures {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<GroupFeatures> {
        let types = GroupTypes::of_int(bytes.read_u32()?);
        let capabilities = GroupCapabilities::of_int(bytes.read_u32()?);
        let mut max_groups = [0; 4];
        for slot in max_groups.iter_mut() {
            *slot = bytes.read_u32()?;
        }
        let mut actions = [0; 4];
        for slot in actions.iter_mut() {
            *slot = bytes.read_u32()?;
        }
        Ok(GroupFeatures {
            types,
            capabilities,
            max_groups,
            actions,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u32(self.types.to_int());
        bytes.write_u32(self.capabilities.to_int());
        for &n in self.max_groups.iter().chain(self.actions.iter()) {
            bytes.write_u32(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nicira::{NxAction, NxResubmit};
    use crate::openflow0x04::PseudoPort;

    #[test]
    fn group_desc_with_nested_buckets() {
        let registry = CodecRegistry::openflow13().unwrap();
        let desc = GroupDesc {
            group_type: GroupType::Select,
            group_id: 7,
            buckets: vec![
                Bucket {
                    weight: 50,
                    watch_port: 0xffff_ffff,
                    watch_group: 0xffff_ffff,
                    actions: vec![Action::Output {
                        port: PseudoPort::PhysicalPort(1),
                        max_len: 0,
                    }],
                },
                Bucket {
                    weight: 50,
                    watch_port: 0xffff_ffff,
                    watch_group: 0xffff_ffff,
                    actions: vec![Action::from(NxAction::Resubmit(NxResubmit::resubmit_table(None, Some(3))))],
                },
            ],
        };
        let mut out = OfpWriter::new();
        desc.marshal(&mut out, &registry).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 8 + 32 + 32);
        assert_eq!(&bytes[..8], &[0, 72, 1, 0, 0, 0, 0, 7]);
        assert_eq!(&bytes[8..12], &[0, 32, 0, 50]);
        let parsed = parse_records(&mut OfpReader::new(&bytes), "group desc", 0, GroupDesc::FIXED_LEN, |r| {
            GroupDesc::parse(r, &registry)
        })
        .unwrap();
        assert_eq!(parsed, vec![desc]);
    }

    #[test]
    fn group_stats_with_bucket_counters() {
        let stats = GroupStats {
            group_id: 1,
            ref_count: 2,
            packet_count: 3,
            byte_count: 4,
            duration_sec: 5,
            duration_nsec: 6,
            bucket_stats: vec![
                BucketCounter {
                    packet_count: 1,
                    byte_count: 64,
                },
                BucketCounter {
                    packet_count: 2,
                    byte_count: 128,
                },
            ],
        };
        let mut out = OfpWriter::new();
        stats.marshal(&mut out).unwrap();
        assert_eq!(out.len(), 72);
        let bytes = out.into_bytes();
        let parsed = parse_records(&mut OfpReader::new(&bytes), "group stats", 0, GroupStats::FIXED_LEN, |r| {
            GroupStats::parse(r)
        })
        .unwrap();
        assert_eq!(parsed, vec![stats]);
    }

    #[test]
    fn group_features_bitmaps() {
        let mut bytes = vec![0, 0, 0, 0x0f, 0, 0, 0, 0x05];
        bytes.extend_from_slice(&[0; 32]);
        let features = GroupFeatures::parse(&mut OfpReader::new(&bytes)).unwrap();
        assert!(features.types.all && features.types.fast_failover);
        assert!(features.capabilities.select_weight && features.capabilities.chaining);
        assert!(!features.capabilities.select_liveness);
        let mut out = OfpWriter::new();
        features.marshal(&mut out);
        assert_eq!(out.as_slice(), &bytes[..]);
    }

    #[test]
    fn unknown_group_type() {
        let bytes = [0, 8, 9, 0, 0, 0, 0, 1];
        let registry = CodecRegistry::openflow13().unwrap();
        assert!(matches!(
            GroupDesc::parse(&mut OfpReader::new(&bytes), &registry),
            Err(CodecError::InvalidValue { value: 9, .. })
        ));
    }
}
