//! Multipart (statistics) requests and replies.
//!
//! Reply bodies dispatch through the registry on their multipart type, and
//! experimenter replies additionally on vendor id and experimenter type.

use tracing::trace;

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::experimenter::EXPERIMENTER_MARKER;
use crate::registry::{CodecKey, CodecRegistry, CodecTable, Deserializer, Scope, Serializer};

use super::group::{GroupDesc, GroupFeatures, GroupStats};
use super::meter::{MeterConfig, MeterFeatures, MeterStats};
use super::port::PortDesc;
use super::stats::{
    parse_fixed, parse_records, AggregateStats, FlowStats, FlowStatsRequest, PortStats, QueueStats, SwitchDesc,
    TableStats,
};
use super::table_features::TableFeatures;
use super::{PseudoPort, OFP_VERSION};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultipartType {
    Desc = 0,
    Flow = 1,
    Aggregate = 2,
    Table = 3,
    PortStats = 4,
    Queue = 5,
    Group = 6,
    GroupDesc = 7,
    GroupFeatures = 8,
    Meter = 9,
    MeterConfig = 10,
    MeterFeatures = 11,
    TableFeatures = 12,
    PortDesc = 13,
    Experimenter = 0xffff,
}

impl MultipartType {
    const CORE: [MultipartType; 14] = [
        MultipartType::Desc,
        MultipartType::Flow,
        MultipartType::Aggregate,
        MultipartType::Table,
        MultipartType::PortStats,
        MultipartType::Queue,
        MultipartType::Group,
        MultipartType::GroupDesc,
        MultipartType::GroupFeatures,
        MultipartType::Meter,
        MultipartType::MeterConfig,
        MultipartType::MeterFeatures,
        MultipartType::TableFeatures,
        MultipartType::PortDesc,
    ];

    pub fn of_int(t: u16) -> Option<MultipartType> {
        match t {
            0xffff => Some(MultipartType::Experimenter),
            t => MultipartType::CORE.get(t as usize).copied(),
        }
    }
}

/// Flags of a multipart message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultipartFlags {
    /// More parts of this request or reply follow.
    pub more: bool,
}

impl MultipartFlags {
    pub fn of_int(d: u16) -> MultipartFlags {
        MultipartFlags {
            more: test_bit(0, d as u64),
        }
    }

    pub fn to_int(&self) -> u16 {
        bit(0, 0, self.more) as u16
    }
}

/// Body of a multipart reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartReplyBody {
    Desc(SwitchDesc),
    Flow(Vec<FlowStats>),
    Aggregate(AggregateStats),
    Table(Vec<TableStats>),
    PortStats(Vec<PortStats>),
    Queue(Vec<QueueStats>),
    Group(Vec<GroupStats>),
    GroupDesc(Vec<GroupDesc>),
    GroupFeatures(GroupFeatures),
    Meter(Vec<MeterStats>),
    MeterConfig(Vec<MeterConfig>),
    MeterFeatures(MeterFeatures),
    TableFeatures(Vec<TableFeatures>),
    PortDesc(Vec<PortDesc>),
    Experimenter {
        experimenter: u32,
        exp_type: u32,
        data: Vec<u8>,
    },
}

impl MultipartReplyBody {
    pub fn multipart_type(&self) -> MultipartType {
        match *self {
            MultipartReplyBody::Desc(_) => MultipartType::Desc,
            MultipartReplyBody::Flow(_) => MultipartType::Flow,
            MultipartReplyBody::Aggregate(_) => MultipartType::Aggregate,
            MultipartReplyBody::Table(_) => MultipartType::Table,
            MultipartReplyBody::PortStats(_) => MultipartType::PortStats,
            MultipartReplyBody::Queue(_) => MultipartType::Queue,
            MultipartReplyBody::Group(_) => MultipartType::Group,
            MultipartReplyBody::GroupDesc(_) => MultipartType::GroupDesc,
            MultipartReplyBody::GroupFeatures(_) => MultipartType::GroupFeatures,
            MultipartReplyBody::Meter(_) => MultipartType::Meter,
            MultipartReplyBody::MeterConfig(_) => MultipartType::MeterConfig,
            MultipartReplyBody::MeterFeatures(_) => MultipartType::MeterFeatures,
            MultipartReplyBody::TableFeatures(_) => MultipartType::TableFeatures,
            MultipartReplyBody::PortDesc(_) => MultipartType::PortDesc,
            MultipartReplyBody::Experimenter { .. } => MultipartType::Experimenter,
        }
    }

    pub fn codec_key(&self) -> CodecKey {
        let scope = Scope::Multipart(self.multipart_type() as u16);
        match *self {
            MultipartReplyBody::Experimenter {
                experimenter, exp_type, ..
            } => CodecKey::vendor(OFP_VERSION, scope, experimenter, Some(exp_type)),
            _ => CodecKey::core(OFP_VERSION, scope),
        }
    }
}

/// Codec for the reply body of one core multipart type.
pub struct MultipartReplyCodec {
    kind: MultipartType,
}

impl Serializer<MultipartReplyBody> for MultipartReplyCodec {
    fn serialize(&self, body: &MultipartReplyBody, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        match *body {
            MultipartReplyBody::Desc(ref desc) => desc.marshal(out)?,
            MultipartReplyBody::Flow(ref flows) => {
                for flow in flows {
                    flow.marshal(out, registry)?;
                }
            }
            MultipartReplyBody::Aggregate(ref aggregate) => aggregate.marshal(out),
            MultipartReplyBody::Table(ref tables) => tables.iter().for_each(|t| t.marshal(out)),
            MultipartReplyBody::PortStats(ref ports) => ports.iter().for_each(|p| p.marshal(out)),
            MultipartReplyBody::Queue(ref queues) => queues.iter().for_each(|q| q.marshal(out)),
            MultipartReplyBody::Group(ref groups) => {
                for group in groups {
                    group.marshal(out)?;
                }
            }
            MultipartReplyBody::GroupDesc(ref groups) => {
                for group in groups {
                    group.marshal(out, registry)?;
                }
            }
            MultipartReplyBody::GroupFeatures(ref features) => features.marshal(out),
            MultipartReplyBody::Meter(ref meters) => {
                for meter in meters {
                    meter.marshal(out)?;
                }
            }
            MultipartReplyBody::MeterConfig(ref meters) => {
                for meter in meters {
                    meter.marshal(out)?;
                }
            }
            MultipartReplyBody::MeterFeatures(ref features) => features.marshal(out),
            MultipartReplyBody::TableFeatures(ref tables) => {
                for table in tables {
                    table.marshal(out, registry)?;
                }
            }
            MultipartReplyBody::PortDesc(ref ports) => {
                for port in ports {
                    port.marshal(out)?;
                }
            }
            MultipartReplyBody::Experimenter {
                experimenter,
                exp_type,
                ref data,
            } => {
                out.write_u32(experimenter);
                out.write_u32(exp_type);
                out.write_bytes(data);
            }
        }
        Ok(())
    }
}

impl Deserializer<MultipartReplyBody> for MultipartReplyCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<MultipartReplyBody> {
        use self::MultipartType as T;
        let body = match self.kind {
            T::Desc => MultipartReplyBody::Desc(SwitchDesc::parse(input)?),
            T::Flow => MultipartReplyBody::Flow(parse_records(input, "flow stats", 0, FlowStats::FIXED_LEN, |r| {
                FlowStats::parse(r, registry)
            })?),
            T::Aggregate => MultipartReplyBody::Aggregate(AggregateStats::parse(input)?),
            T::Table => MultipartReplyBody::Table(parse_fixed(input, |r| TableStats::parse(r))?),
            T::PortStats => MultipartReplyBody::PortStats(parse_fixed(input, |r| PortStats::parse(r))?),
            T::Queue => MultipartReplyBody::Queue(parse_fixed(input, |r| QueueStats::parse(r))?),
            T::Group => MultipartReplyBody::Group(parse_records(
                input,
                "group stats",
                0,
                GroupStats::FIXED_LEN,
                |r| GroupStats::parse(r),
            )?),
            T::GroupDesc => MultipartReplyBody::GroupDesc(parse_records(
                input,
                "group desc",
                0,
                GroupDesc::FIXED_LEN,
                |r| GroupDesc::parse(r, registry),
            )?),
            T::GroupFeatures => MultipartReplyBody::GroupFeatures(GroupFeatures::parse(input)?),
            T::Meter => MultipartReplyBody::Meter(parse_records(
                input,
                "meter stats",
                4,
                MeterStats::FIXED_LEN,
                |r| MeterStats::parse(r),
            )?),
            T::MeterConfig => MultipartReplyBody::MeterConfig(parse_records(
                input,
                "meter config",
                0,
                MeterConfig::FIXED_LEN,
                |r| MeterConfig::parse(r),
            )?),
            T::MeterFeatures => MultipartReplyBody::MeterFeatures(MeterFeatures::parse(input)?),
            T::TableFeatures => {
                MultipartReplyBody::TableFeatures(parse_fixed(input, |r| TableFeatures::parse(r, registry))?)
            }
            T::PortDesc => MultipartReplyBody::PortDesc(parse_fixed(input, |r| PortDesc::parse(r))?),
            T::Experimenter => parse_experimenter_body(input)?,
        };
        Ok(body)
    }
}

fn parse_experimenter_body(input: &mut OfpReader<'_>) -> Result<MultipartReplyBody> {
    let experimenter = input.read_u32()?;
    let exp_type = input.read_u32()?;
    let left = input.remaining();
    Ok(MultipartReplyBody::Experimenter {
        experimenter,
        exp_type,
        data: input.read_bytes(left)?.to_vec(),
    })
}

pub(crate) fn register_core_replies(table: &mut CodecTable<MultipartReplyBody>) -> Result<()> {
    for &kind in MultipartType::CORE.iter() {
        table.register(
            CodecKey::core(OFP_VERSION, Scope::Multipart(kind as u16)),
            MultipartReplyCodec { kind },
        )?;
    }
    Ok(())
}

/// Register a codec for experimenter replies of one vendor and experimenter type.
pub fn register_experimenter_reply<C>(
    table: &mut CodecTable<MultipartReplyBody>,
    experimenter: u32,
    exp_type: u32,
    codec: C,
) -> Result<()>
where
    C: Serializer<MultipartReplyBody> + Deserializer<MultipartReplyBody> + 'static,
{
    table.register(
        CodecKey::vendor(
            OFP_VERSION,
            Scope::Multipart(EXPERIMENTER_MARKER),
            experimenter,
            Some(exp_type),
        ),
        codec,
    )
}

/// Pass-through codec for experimenter reply bodies.
pub struct OpaqueReplyCodec;

impl Serializer<MultipartReplyBody> for OpaqueReplyCodec {
    fn serialize(&self, body: &MultipartReplyBody, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        MultipartReplyCodec {
            kind: MultipartType::Experimenter,
        }
        .serialize(body, out, registry)
    }
}

impl Deserializer<MultipartReplyBody> for OpaqueReplyCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, _: &CodecRegistry) -> Result<MultipartReplyBody> {
        parse_experimenter_body(input)
    }
}

/// A multipart reply: one part of a possibly multi-message answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartReply {
    pub flags: MultipartFlags,
    pub body: MultipartReplyBody,
}

impl MultipartReply {
    pub fn new(body: MultipartReplyBody) -> MultipartReply {
        MultipartReply {
            flags: MultipartFlags::default(),
            body,
        }
    }

    /// Parse a reply from the bytes after the OpenFlow header.
    ///
    /// Experimenter bodies with no registered codec decode to the raw
    /// `Experimenter` variant when the registry skips unknown extensions.
    pub fn parse(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<MultipartReply> {
        let offset = input.offset();
        let typ = input.read_u16()?;
        let flags = MultipartFlags::of_int(input.read_u16()?);
        input.skip_padding(4)?;
        let key = if typ == EXPERIMENTER_MARKER {
            let experimenter = input.peek_u32_at(0)?;
            let exp_type = input.peek_u32_at(4)?;
            CodecKey::vendor(OFP_VERSION, Scope::Multipart(typ), experimenter, Some(exp_type))
        } else {
            CodecKey::core(OFP_VERSION, Scope::Multipart(typ))
        };
        trace!(%key, offset, more = flags.more, "multipart reply");
        let body = match registry.multipart_replies().deserializer(&key) {
            Some(codec) => codec.deserialize(input, registry)?,
            None if key.is_vendor() => {
                registry.unknown_extension(&key, input.remaining(), offset)?;
                parse_experimenter_body(input)?
            }
            None => return Err(key.miss_error()),
        };
        input.finish("multipart reply")?;
        Ok(MultipartReply { flags, body })
    }

    /// Write the reply after the OpenFlow header.
    ///
    /// Every body needs a registered codec, experimenter bodies included;
    /// nothing is written when the lookup fails.
    pub fn marshal(&self, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let codec = registry.multipart_replies().serializer_or_fail(&self.body.codec_key())?;
        out.write_u16(self.body.multipart_type() as u16);
        out.write_u16(self.flags.to_int());
        out.write_zero(4);
        codec.serialize(&self.body, out, registry)
    }
}

/// Body of a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartRequestBody {
    Desc,
    Flow(FlowStatsRequest),
    Aggregate(FlowStatsRequest),
    Table,
    PortStats { port_no: PseudoPort },
    Queue { port_no: PseudoPort, queue_id: u32 },
    Group { group_id: u32 },
    GroupDesc,
    GroupFeatures,
    Meter { meter_id: u32 },
    MeterConfig { meter_id: u32 },
    MeterFeatures,
    /// Empty to query, non-empty to configure the tables.
    TableFeatures(Vec<TableFeatures>),
    PortDesc,
    Experimenter {
        experimenter: u32,
        exp_type: u32,
        data: Vec<u8>,
    },
}

impl MultipartRequestBody {
    pub fn multipart_type(&self) -> MultipartType {
        match *self {
            MultipartRequestBody::Desc => MultipartType::Desc,
            MultipartRequestBody::Flow(_) => MultipartType::Flow,
            MultipartRequestBody::Aggregate(_) => MultipartType::Aggregate,
            MultipartRequestBody::Table => MultipartType::Table,
            MultipartRequestBody::PortStats { .. } => MultipartType::PortStats,
            MultipartRequestBody::Queue { .. } => MultipartType::Queue,
            MultipartRequestBody::Group { .. } => MultipartType::Group,
            MultipartRequestBody::GroupDesc => MultipartType::GroupDesc,
            MultipartRequestBody::GroupFeatures => MultipartType::GroupFeatures,
            MultipartRequestBody::Meter { .. } => MultipartType::Meter,
            MultipartRequestBody::MeterConfig { .. } => MultipartType::MeterConfig,
            MultipartRequestBody::MeterFeatures => MultipartType::MeterFeatures,
            MultipartRequestBody::TableFeatures(_) => MultipartType::TableFeatures,
            MultipartRequestBody::PortDesc => MultipartType::PortDesc,
            MultipartRequestBody::Experimenter { .. } => MultipartType::Experimenter,
        }
    }
}

/// A multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartRequest {
    pub flags: MultipartFlags,
    pub body: MultipartRequestBody,
}

impl MultipartRequest {
    pub fn new(body: MultipartRequestBody) -> MultipartRequest {
        MultipartRequest {
            flags: MultipartFlags::default(),
            body,
        }
    }

    pub fn parse(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<MultipartRequest> {
        use self::MultipartType as T;
        let typ = input.read_u16()?;
        let flags = MultipartFlags::of_int(input.read_u16()?);
        input.skip_padding(4)?;
        let kind = MultipartType::of_int(typ).ok_or(CodecError::UnknownMessageType {
            version: OFP_VERSION,
            type_code: typ,
        })?;
        let body = match kind {
            T::Desc => MultipartRequestBody::Desc,
            T::Flow => MultipartRequestBody::Flow(FlowStatsRequest::parse(input, registry)?),
            T::Aggregate => MultipartRequestBody::Aggregate(FlowStatsRequest::parse(input, registry)?),
            T::Table => MultipartRequestBody::Table,
            T::PortStats => {
                let port_no = PseudoPort::of_int(input.read_u32()?)?;
                input.skip_padding(4)?;
                MultipartRequestBody::PortStats { port_no }
            }
            T::Queue => MultipartRequestBody::Queue {
                port_no: PseudoPort::of_int(input.read_u32()?)?,
                queue_id: input.read_u32()?,
            },
            T::Group => {
                let group_id = input.read_u32()?;
                input.skip_padding(4)?;
                MultipartRequestBody::Group { group_id }
            }
            T::GroupDesc => MultipartRequestBody::GroupDesc,
            T::GroupFeatures => MultipartRequestBody::GroupFeatures,
            T::Meter => {
                let meter_id = input.read_u32()?;
                input.skip_padding(4)?;
                MultipartRequestBody::Meter { meter_id }
            }
            T::MeterConfig => {
                let meter_id = input.read_u32()?;
                input.skip_padding(4)?;
                MultipartRequestBody::MeterConfig { meter_id }
            }
            T::MeterFeatures => MultipartRequestBody::MeterFeatures,
            T::TableFeatures => {
                MultipartRequestBody::TableFeatures(parse_fixed(input, |r| TableFeatures::parse(r, registry))?)
            }
            T::PortDesc => MultipartRequestBody::PortDesc,
            T::Experimenter => {
                let experimenter = input.read_u32()?;
                let exp_type = input.read_u32()?;
                let left = input.remaining();
                MultipartRequestBody::Experimenter {
                    experimenter,
                    exp_type,
                    data: input.read_bytes(left)?.to_vec(),
                }
            }
        };
        input.finish("multipart request")?;
        Ok(MultipartRequest { flags, body })
    }

    pub fn marshal(&self, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        out.write_u16(self.body.multipart_type() as u16);
        out.write_u16(self.flags.to_int());
        out.write_zero(4);
        match self.body {
            MultipartRequestBody::Desc
            | MultipartRequestBody::Table
            | MultipartRequestBody::GroupDesc
            | MultipartRequestBody::GroupFeatures
            | MultipartRequestBody::MeterFeatures
            | MultipartRequestBody::PortDesc => (),
            MultipartRequestBody::Flow(ref req) | MultipartRequestBody::Aggregate(ref req) => {
                req.marshal(out, registry)?
            }
            MultipartRequestBody::PortStats { port_no } => {
                out.write_u32(port_no.to_int());
                out.write_zero(4);
            }
            MultipartRequestBody::Queue { port_no, queue_id } => {
                out.write_u32(port_no.to_int());
                out.write_u32(queue_id);
            }
            MultipartRequestBody::Group { group_id: id }
            | MultipartRequestBody::Meter { meter_id: id }
            | MultipartRequestBody::MeterConfig { meter_id: id } => {
                out.write_u32(id);
                out.write_zero(4);
            }
            MultipartRequestBody::TableFeatures(ref tables) => {
                for table in tables {
                    table.marshal(out, registry)?;
                }
            }
            MultipartRequestBody::Experimenter {
                experimenter,
                exp_type,
                ref data,
            } => {
                out.write_u32(experimenter);
                out.write_u32(exp_type);
                out.write_bytes(data);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::group::OFPG_ALL;
    use crate::openflow0x04::meter::OFPM_ALL;
    use crate::registry::CodecRegistryBuilder;

    fn registry() -> CodecRegistry {
        CodecRegistry::openflow13().unwrap()
    }

    fn round_trip(reply: &MultipartReply, registry: &CodecRegistry) -> MultipartReply {
        let mut out = OfpWriter::new();
        reply.marshal(&mut out, registry).unwrap();
        let bytes = out.into_bytes();
        MultipartReply::parse(&mut OfpReader::new(&bytes), registry).unwrap()
    }

    #[test]
    fn aggregate_reply_bytes() {
        let bytes = [
            0, 2, 0, 0, 0, 0, 0, 0, //
            0, 0, 0, 0, 0, 0, 0, 10, //
            0, 0, 0, 0, 0, 0, 0x02, 0x80, //
            0, 0, 0, 3, 0, 0, 0, 0,
        ];
        let reply = MultipartReply::parse(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            reply.body,
            MultipartReplyBody::Aggregate(AggregateStats {
                packet_count: 10,
                byte_count: 640,
                flow_count: 3,
            })
        );
        assert!(!reply.flags.more);
    }

    #[test]
    fn more_flag_and_table_stats() {
        let reply = MultipartReply {
            flags: MultipartFlags { more: true },
            body: MultipartReplyBody::Table(vec![
                TableStats {
                    table_id: 0,
                    active_count: 4,
                    lookup_count: 100,
                    matched_count: 90,
                },
                TableStats {
                    table_id: 1,
                    ..TableStats::default()
                },
            ]),
        };
        assert_eq!(round_trip(&reply, &registry()), reply);
    }

    #[test]
    fn port_desc_reply_with_two_ports() {
        let mut bytes = vec![0, 13, 0, 0, 0, 0, 0, 0];
        for port in 1u8..3 {
            let mut desc = vec![0u8; 64];
            desc[3] = port;
            desc[16..20].copy_from_slice(b"eth0");
            desc[19] = b'0' + port;
            bytes.extend_from_slice(&desc);
        }
        let reply = MultipartReply::parse(&mut OfpReader::new(&bytes), &registry()).unwrap();
        match reply.body {
            MultipartReplyBody::PortDesc(ref ports) => {
                assert_eq!(ports.len(), 2);
                assert_eq!(ports[0].port_no, PseudoPort::PhysicalPort(1));
                assert_eq!(ports[1].name, "eth2");
            }
            ref other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn trailing_partial_record_is_truncated() {
        let mut bytes = vec![0, 3, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0; 24 + 10]);
        assert!(matches!(
            MultipartReply::parse(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn unknown_core_type_is_fatal() {
        let bytes = [0, 0x20, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            MultipartReply::parse(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::UnknownMessageType {
                version: OFP_VERSION,
                type_code: 0x20,
            })
        );
    }

    #[test]
    fn experimenter_reply_without_codec() {
        let bytes = [0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0x23, 0x20, 0, 0, 0, 7, 1, 2, 3];
        let reply = MultipartReply::parse(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            reply.body,
            MultipartReplyBody::Experimenter {
                experimenter: 0x2320,
                exp_type: 7,
                data: vec![1, 2, 3],
            }
        );
        let mut out = OfpWriter::new();
        assert_eq!(
            reply.marshal(&mut out, &registry()),
            Err(CodecError::UnknownExtension {
                key: reply.body.codec_key(),
            })
        );
        assert!(out.into_bytes().is_empty());

        let strict = CodecRegistryBuilder::from_registry(&registry())
            .skip_unknown_extensions(false)
            .build();
        assert!(matches!(
            MultipartReply::parse(&mut OfpReader::new(&bytes), &strict),
            Err(CodecError::UnknownExtension { .. })
        ));

        let mut builder = CodecRegistryBuilder::from_registry(&strict);
        register_experimenter_reply(builder.multipart_replies(), 0x2320, 7, OpaqueReplyCodec).unwrap();
        let registered = builder.build();
        assert_eq!(round_trip(&reply, &registered), reply);
    }

    #[test]
    fn request_bodies() {
        let registry = registry();
        let requests = vec![
            MultipartRequest::new(MultipartRequestBody::Desc),
            MultipartRequest::new(MultipartRequestBody::Flow(FlowStatsRequest::all())),
            MultipartRequest::new(MultipartRequestBody::PortStats {
                port_no: PseudoPort::Any,
            }),
            MultipartRequest::new(MultipartRequestBody::Queue {
                port_no: PseudoPort::PhysicalPort(1),
                queue_id: 0xffff_ffff,
            }),
            MultipartRequest::new(MultipartRequestBody::Group { group_id: OFPG_ALL }),
            MultipartRequest::new(MultipartRequestBody::MeterConfig { meter_id: OFPM_ALL }),
            MultipartRequest::new(MultipartRequestBody::TableFeatures(vec![])),
        ];
        let sizes = [8, 48, 16, 16, 16, 16, 8];
        for (req, &size) in requests.iter().zip(sizes.iter()) {
            let mut out = OfpWriter::new();
            req.marshal(&mut out, &registry).unwrap();
            assert_eq!(out.len(), size, "{:?}", req.body);
            let bytes = out.into_bytes();
            assert_eq!(&MultipartRequest::parse(&mut OfpReader::new(&bytes), &registry).unwrap(), req);
        }
    }
}
