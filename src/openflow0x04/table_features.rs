//! Table features: a 64-byte fixed prefix followed by a bag of typed,
//! individually padded properties.

use tracing::debug;

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::experimenter::EXPERIMENTER_MARKER;
use crate::registry::{CodecKey, CodecRegistry, CodecTable, Deserializer, Scope, Serializer};

use super::action::ActionType;
use super::instruction::InstructionType;
use super::oxm::{OxmHeader, OFPXMC_EXPERIMENTER};
use super::OFP_VERSION;

const TABLE_NAME_LEN: usize = 32;
const OFPTC_DEPRECATED_MASK: u32 = 3;

pub const OFPTFPT_EXPERIMENTER: u16 = 0xfffe;
pub const OFPTFPT_EXPERIMENTER_MISS: u16 = 0xffff;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFeaturePropType {
    Instructions = 0,
    InstructionsMiss = 1,
    NextTables = 2,
    NextTablesMiss = 3,
    WriteActions = 4,
    WriteActionsMiss = 5,
    ApplyActions = 6,
    ApplyActionsMiss = 7,
    Match = 8,
    Wildcards = 10,
    WriteSetfield = 12,
    WriteSetfieldMiss = 13,
    ApplySetfield = 14,
    ApplySetfieldMiss = 15,
}

impl TableFeaturePropType {
    const ALL: [TableFeaturePropType; 14] = [
        TableFeaturePropType::Instructions,
        TableFeaturePropType::InstructionsMiss,
        TableFeaturePropType::NextTables,
        TableFeaturePropType::NextTablesMiss,
        TableFeaturePropType::WriteActions,
        TableFeaturePropType::WriteActionsMiss,
        TableFeaturePropType::ApplyActions,
        TableFeaturePropType::ApplyActionsMiss,
        TableFeaturePropType::Match,
        TableFeaturePropType::Wildcards,
        TableFeaturePropType::WriteSetfield,
        TableFeaturePropType::WriteSetfieldMiss,
        TableFeaturePropType::ApplySetfield,
        TableFeaturePropType::ApplySetfieldMiss,
    ];

    fn is_miss(self) -> bool {
        (self as u16) & 1 == 1
    }
}

/// An action a table supports, as listed in a table-features property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    Core(ActionType),
    Experimenter { experimenter: u32, subtype: u16 },
}

/// An instruction a table supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionId {
    Core(InstructionType),
    Experimenter { experimenter: u32 },
}

/// A match field a table supports: an OXM header without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OxmId {
    pub header: OxmHeader,
    pub experimenter: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFeatureProperty {
    Instructions { miss: bool, ids: Vec<InstructionId> },
    NextTables { miss: bool, tables: Vec<u8> },
    WriteActions { miss: bool, ids: Vec<ActionId> },
    ApplyActions { miss: bool, ids: Vec<ActionId> },
    Match(Vec<OxmId>),
    Wildcards(Vec<OxmId>),
    WriteSetfield { miss: bool, ids: Vec<OxmId> },
    ApplySetfield { miss: bool, ids: Vec<OxmId> },
    Experimenter {
        miss: bool,
        experimenter: u32,
        exp_type: u32,
        data: Vec<u8>,
    },
}

impl TableFeatureProperty {
    pub fn type_code(&self) -> u16 {
        use self::TableFeaturePropType as T;
        let (hit, miss_type, miss) = match *self {
            TableFeatureProperty::Instructions { miss, .. } => (T::Instructions, T::InstructionsMiss, miss),
            TableFeatureProperty::NextTables { miss, .. } => (T::NextTables, T::NextTablesMiss, miss),
            TableFeatureProperty::WriteActions { miss, .. } => (T::WriteActions, T::WriteActionsMiss, miss),
            TableFeatureProperty::ApplyActions { miss, .. } => (T::ApplyActions, T::ApplyActionsMiss, miss),
            TableFeatureProperty::Match(_) => (T::Match, T::Match, false),
            TableFeatureProperty::Wildcards(_) => (T::Wildcards, T::Wildcards, false),
            TableFeatureProperty::WriteSetfield { miss, .. } => (T::WriteSetfield, T::WriteSetfieldMiss, miss),
            TableFeatureProperty::ApplySetfield { miss, .. } => (T::ApplySetfield, T::ApplySetfieldMiss, miss),
            TableFeatureProperty::Experimenter { miss, .. } => {
                return if miss {
                    OFPTFPT_EXPERIMENTER_MISS
                } else {
                    OFPTFPT_EXPERIMENTER
                };
            }
        };
        if miss {
            miss_type as u16
        } else {
            hit as u16
        }
    }

    pub fn codec_key(&self) -> CodecKey {
        let scope = Scope::TableFeatureProp(self.type_code());
        match *self {
            TableFeatureProperty::Experimenter {
                experimenter, exp_type, ..
            } => CodecKey::vendor(OFP_VERSION, scope, experimenter, Some(exp_type)),
            _ => CodecKey::core(OFP_VERSION, scope),
        }
    }
}

/// Capabilities of one flow table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFeatures {
    pub table_id: u8,
    pub name: String,
    pub metadata_match: u64,
    pub metadata_write: u64,
    pub config: u32,
    pub max_entries: u32,
    pub properties: Vec<TableFeatureProperty>,
}

impl TableFeatures {
    /// Whether the deprecated table-miss config bits are set.
    pub fn is_deprecated(&self) -> bool {
        self.config & OFPTC_DEPRECATED_MASK != 0
    }

    pub fn marshal(&self, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let start = out.len();
        let len_pos = out.reserve_u16();
        out.write_u8(self.table_id);
        out.write_zero(5);
        out.write_fixed_string("table name", &self.name, TABLE_NAME_LEN)?;
        out.write_u64(self.metadata_match);
        out.write_u64(self.metadata_write);
        out.write_u32(self.config);
        out.write_u32(self.max_entries);
        for prop in &self.properties {
            encode_property(prop, out, registry)?;
        }
        out.backfill_len("table features", len_pos, start)?;
        Ok(())
    }

    pub fn parse(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<TableFeatures> {
        let len = input.peek_u16_at(0)? as usize;
        if len < 64 {
            return Err(CodecError::LengthMismatch {
                structure: "table features",
                declared: len,
                actual: 64,
            });
        }
        let mut record = input.sub_reader(len)?;
        record.skip(2)?;
        let table_id = record.read_u8()?;
        record.skip_padding(5)?;
        let name = record.read_fixed_string("table name", TABLE_NAME_LEN)?;
        let metadata_match = record.read_u64()?;
        let metadata_write = record.read_u64()?;
        let config = record.read_u32()?;
        let max_entries = record.read_u32()?;
        let properties = decode_properties(&mut record, registry)?;
        Ok(TableFeatures {
            table_id,
            name,
            metadata_match,
            metadata_write,
            config,
            max_entries,
            properties,
        })
    }
}

/// Write one property, padding it to 8 bytes outside its declared length.
pub fn encode_property(prop: &TableFeatureProperty, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    let start = out.len();
    registry
        .table_properties()
        .serializer_or_fail(&prop.codec_key())?
        .serialize(prop, out, registry)?;
    out.pad_to_alignment(start);
    Ok(())
}

/// Decode properties until `input` is exhausted.
pub fn decode_properties(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Vec<TableFeatureProperty>> {
    let mut props = vec![];
    while !input.is_empty() {
        let offset = input.offset();
        let typ = input.peek_u16_at(0)?;
        let len = input.peek_u16_at(2)? as usize;
        if len < 4 {
            return Err(CodecError::LengthMismatch {
                structure: "table feature property",
                declared: len,
                actual: 4,
            });
        }
        let mut prop = input.sub_reader(len)?;
        let key = if typ == OFPTFPT_EXPERIMENTER || typ == OFPTFPT_EXPERIMENTER_MISS {
            let experimenter = prop.peek_u32_at(4)?;
            let exp_type = prop.peek_u32_at(8)?;
            CodecKey::vendor(OFP_VERSION, Scope::TableFeatureProp(typ), experimenter, Some(exp_type))
        } else {
            CodecKey::core(OFP_VERSION, Scope::TableFeatureProp(typ))
        };
        match registry.table_properties().deserializer(&key) {
            Some(codec) => {
                props.push(codec.deserialize(&mut prop, registry)?);
                prop.finish("table feature property")?;
            }
            None if key.is_vendor() => registry.unknown_extension(&key, len, offset)?,
            None => return Err(key.miss_error()),
        }
        input.skip_alignment(len)?;
    }
    Ok(props)
}

/// Read the 4-byte header of one action or instruction id.
///
/// Every id kind follows the same rule: an id is malformed when its declared
/// length is below its minimum (8 for experimenter ids, 4 otherwise) or runs
/// past the end of the property. A malformed id is logged and skipped by its
/// header alone, and decoding carries on with the next 4 bytes.
fn read_id_header(input: &mut OfpReader<'_>, kind: &'static str) -> Result<Option<(u16, usize)>> {
    let offset = input.offset();
    let typ = input.read_u16()?;
    let len = input.read_u16()? as usize;
    let min = if typ == EXPERIMENTER_MARKER { 8 } else { 4 };
    if len < min || len - 4 > input.remaining() {
        debug!(offset, typ, len, kind, "malformed table feature id");
        return Ok(None);
    }
    Ok(Some((typ, len)))
}

/// Action ids, each a 4-byte header, or a vendor frame header for experimenter
/// actions. Ids are skipped by their declared length when their type is
/// unknown or their vendor has no registered codec.
fn decode_action_ids(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Vec<ActionId>> {
    let mut ids = vec![];
    while !input.is_empty() {
        let offset = input.offset();
        let (typ, len) = match read_id_header(input, "action")? {
            Some(header) => header,
            None => continue,
        };
        if typ == EXPERIMENTER_MARKER {
            let experimenter = input.read_u32()?;
            let subtype = if len >= 10 { input.read_u16()? } else { 0 };
            let consumed = if len >= 10 { 10 } else { 8 };
            input.skip(len - consumed)?;
            let key = CodecKey::vendor(
                OFP_VERSION,
                Scope::Action(EXPERIMENTER_MARKER),
                experimenter,
                Some(subtype as u32),
            );
            if registry.actions().deserializer(&key).is_some() {
                ids.push(ActionId::Experimenter { experimenter, subtype });
            } else {
                registry.unknown_extension(&key, len, offset)?;
            }
        } else {
            input.skip(len - 4)?;
            match ActionType::of_int(typ) {
                Some(kind) => ids.push(ActionId::Core(kind)),
                None => debug!(offset, typ, "skipping unknown action id"),
            }
        }
    }
    Ok(ids)
}

fn encode_action_ids(ids: &[ActionId], out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    for id in ids {
        match *id {
            ActionId::Core(kind) => {
                out.write_u16(kind as u16);
                out.write_u16(4);
            }
            ActionId::Experimenter { experimenter, subtype } => {
                let key = CodecKey::vendor(
                    OFP_VERSION,
                    Scope::Action(EXPERIMENTER_MARKER),
                    experimenter,
                    Some(subtype as u32),
                );
                registry.actions().serializer_or_fail(&key)?;
                out.write_u16(EXPERIMENTER_MARKER);
                out.write_u16(10);
                out.write_u32(experimenter);
                out.write_u16(subtype);
            }
        }
    }
    Ok(())
}

fn decode_instruction_ids(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Vec<InstructionId>> {
    let mut ids = vec![];
    while !input.is_empty() {
        let offset = input.offset();
        let (typ, len) = match read_id_header(input, "instruction")? {
            Some(header) => header,
            None => continue,
        };
        if typ == EXPERIMENTER_MARKER {
            let experimenter = input.read_u32()?;
            input.skip(len - 8)?;
            let key = CodecKey::vendor(OFP_VERSION, Scope::Instruction(typ), experimenter, None);
            if registry.instructions().deserializer(&key).is_some() {
                ids.push(InstructionId::Experimenter { experimenter });
            } else {
                registry.unknown_extension(&key, len, offset)?;
            }
        } else {
            input.skip(len - 4)?;
            match InstructionType::of_int(typ) {
                Some(kind) => ids.push(InstructionId::Core(kind)),
                None => debug!(offset, typ, "skipping unknown instruction id"),
            }
        }
    }
    Ok(ids)
}

fn encode_instruction_ids(ids: &[InstructionId], out: &mut OfpWriter) {
    for id in ids {
        match *id {
            InstructionId::Core(kind) => {
                out.write_u16(kind as u16);
                out.write_u16(4);
            }
            InstructionId::Experimenter { experimenter } => {
                out.write_u16(EXPERIMENTER_MARKER);
                out.write_u16(8);
                out.write_u32(experimenter);
            }
        }
    }
}

fn decode_oxm_ids(input: &mut OfpReader<'_>) -> Result<Vec<OxmId>> {
    let mut ids = vec![];
    while !input.is_empty() {
        let header = OxmHeader::of_int(input.read_u32()?);
        let experimenter = if header.class == OFPXMC_EXPERIMENTER {
            Some(input.read_u32()?)
        } else {
            None
        };
        ids.push(OxmId { header, experimenter });
    }
    Ok(ids)
}

fn encode_oxm_ids(ids: &[OxmId], out: &mut OfpWriter) {
    for id in ids {
        out.write_u32(id.header.to_int());
        if let Some(experimenter) = id.experimenter {
            out.write_u32(experimenter);
        }
    }
}

fn write_property(prop: &TableFeatureProperty, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    let start = out.len();
    out.write_u16(prop.type_code());
    let len_pos = out.reserve_u16();
    match *prop {
        TableFeatureProperty::Instructions { ref ids, .. } => encode_instruction_ids(ids, out),
        TableFeatureProperty::NextTables { ref tables, .. } => out.write_bytes(tables),
        TableFeatureProperty::WriteActions { ref ids, .. } | TableFeatureProperty::ApplyActions { ref ids, .. } => {
            encode_action_ids(ids, out, registry)?
        }
        TableFeatureProperty::Match(ref ids)
        | TableFeatureProperty::Wildcards(ref ids)
        | TableFeatureProperty::WriteSetfield { ref ids, .. }
        | TableFeatureProperty::ApplySetfield { ref ids, .. } => encode_oxm_ids(ids, out),
        TableFeatureProperty::Experimenter {
            experimenter,
            exp_type,
            ref data,
            ..
        } => {
            out.write_u32(experimenter);
            out.write_u32(exp_type);
            out.write_bytes(data);
        }
    }
    out.backfill_len("table feature property", len_pos, start)?;
    Ok(())
}

/// Codec for one core property type.
pub struct TablePropertyCodec {
    kind: TableFeaturePropType,
}

impl Serializer<TableFeatureProperty> for TablePropertyCodec {
    fn serialize(&self, prop: &TableFeatureProperty, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        write_property(prop, out, registry)
    }
}

impl Deserializer<TableFeatureProperty> for TablePropertyCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<TableFeatureProperty> {
        use self::TableFeaturePropType as T;
        input.skip(4)?;
        let miss = self.kind.is_miss();
        let prop = match self.kind {
            T::Instructions | T::InstructionsMiss => TableFeatureProperty::Instructions {
                miss,
                ids: decode_instruction_ids(input, registry)?,
            },
            T::NextTables | T::NextTablesMiss => {
                let left = input.remaining();
                TableFeatureProperty::NextTables {
                    miss,
                    tables: input.read_bytes(left)?.to_vec(),
                }
            }
            T::WriteActions | T::WriteActionsMiss => TableFeatureProperty::WriteActions {
                miss,
                ids: decode_action_ids(input, registry)?,
            },
            T::ApplyActions | T::ApplyActionsMiss => TableFeatureProperty::ApplyActions {
                miss,
                ids: decode_action_ids(input, registry)?,
            },
            T::Match => TableFeatureProperty::Match(decode_oxm_ids(input)?),
            T::Wildcards => TableFeatureProperty::Wildcards(decode_oxm_ids(input)?),
            T::WriteSetfield | T::WriteSetfieldMiss => TableFeatureProperty::WriteSetfield {
                miss,
                ids: decode_oxm_ids(input)?,
            },
            T::ApplySetfield | T::ApplySetfieldMiss => TableFeatureProperty::ApplySetfield {
                miss,
                ids: decode_oxm_ids(input)?,
            },
        };
        Ok(prop)
    }
}

/// Pass-through codec for a vendor's experimenter properties.
pub struct ExperimenterPropertyCodec;

impl Serializer<TableFeatureProperty> for ExperimenterPropertyCodec {
    fn serialize(&self, prop: &TableFeatureProperty, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        write_property(prop, out, registry)
    }
}

impl Deserializer<TableFeatureProperty> for ExperimenterPropertyCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, _: &CodecRegistry) -> Result<TableFeatureProperty> {
        let typ = input.read_u16()?;
        input.skip(2)?;
        let experimenter = input.read_u32()?;
        let exp_type = input.read_u32()?;
        let left = input.remaining();
        Ok(TableFeatureProperty::Experimenter {
            miss: typ == OFPTFPT_EXPERIMENTER_MISS,
            experimenter,
            exp_type,
            data: input.read_bytes(left)?.to_vec(),
        })
    }
}

pub(crate) fn register_core_properties(table: &mut CodecTable<TableFeatureProperty>) -> Result<()> {
    for &kind in TableFeaturePropType::ALL.iter() {
        table.register(
            CodecKey::core(OFP_VERSION, Scope::TableFeatureProp(kind as u16)),
            TablePropertyCodec { kind },
        )?;
    }
    Ok(())
}

/// Keep experimenter properties of one vendor and type instead of skipping them.
pub fn register_experimenter_property(
    table: &mut CodecTable<TableFeatureProperty>,
    experimenter: u32,
    exp_type: u32,
) -> Result<()> {
    for &typ in [OFPTFPT_EXPERIMENTER, OFPTFPT_EXPERIMENTER_MISS].iter() {
        table.register(
            CodecKey::vendor(OFP_VERSION, Scope::TableFeatureProp(typ), experimenter, Some(exp_type)),
            ExperimenterPropertyCodec,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nicira::NX_VENDOR_ID;
    use crate::openflow0x04::oxm::{basic, OFPXMC_OPENFLOW_BASIC};
    use tracing_test::traced_test;

    fn registry() -> CodecRegistry {
        CodecRegistry::openflow13().unwrap()
    }

    #[test]
    fn unknown_experimenter_action_id_is_skipped() {
        let bytes = [
            0, 6, 0, 22, // apply actions, 22 bytes before padding
            0, 0, 0, 4, // output
            0xff, 0xff, 0, 10, 0x00, 0x00, 0x23, 0x20, 0, 99, // nx subtype 99
            0, 22, 0, 4, // group
            0, 0, // padding
        ];
        let mut r = OfpReader::new(&bytes);
        let props = decode_properties(&mut r, &registry()).unwrap();
        assert_eq!(
            props,
            vec![TableFeatureProperty::ApplyActions {
                miss: false,
                ids: vec![ActionId::Core(ActionType::Output), ActionId::Core(ActionType::Group)],
            }]
        );
        assert!(r.is_empty());
    }

    #[test]
    fn malformed_action_id_skips_its_header() {
        let bytes = [
            0, 4, 0, 16, //
            0, 0x63, 0, 4, // no such action
            0xff, 0xff, 0, 2, // experimenter id with a bogus length
            0, 17, 0, 4, // push vlan
        ];
        let props = decode_properties(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            props,
            vec![TableFeatureProperty::WriteActions {
                miss: false,
                ids: vec![ActionId::Core(ActionType::PushVlan)],
            }]
        );
    }

    #[test]
    #[traced_test]
    fn over_long_ids_follow_the_malformed_rule() {
        let bytes = [
            0, 6, 0, 16, // apply actions
            0, 0, 0, 4, // output
            0, 22, 0, 40, // group claiming more than is left
            0, 17, 0, 4, // push vlan
            //
            0, 0, 0, 24, // instructions
            0, 4, 0, 4, // apply actions
            0, 1, 0, 2, // goto table shorter than its header
            0xff, 0xff, 0, 64, 0, 0, 0x23, 0x20, // experimenter past the end
            0, 1, 0, 4, // goto table
        ];
        let props = decode_properties(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            props,
            vec![
                TableFeatureProperty::ApplyActions {
                    miss: false,
                    ids: vec![ActionId::Core(ActionType::Output), ActionId::Core(ActionType::PushVlan)],
                },
                TableFeatureProperty::Instructions {
                    miss: false,
                    ids: vec![
                        InstructionId::Core(InstructionType::ApplyActions),
                        InstructionId::Core(InstructionType::GotoTable),
                    ],
                },
            ]
        );
        assert!(logs_contain("malformed table feature id"));
    }

    #[test]
    fn registered_experimenter_action_id_is_kept() {
        let ids = vec![
            ActionId::Core(ActionType::Output),
            ActionId::Experimenter {
                experimenter: NX_VENDOR_ID,
                subtype: 1,
            },
        ];
        let prop = TableFeatureProperty::ApplyActions { miss: true, ids };
        let registry = registry();
        let mut out = OfpWriter::new();
        encode_property(&prop, &mut out, &registry).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(&bytes[..4], &[0, 7, 0, 18]);
        assert_eq!(bytes.len(), 24);
        assert_eq!(decode_properties(&mut OfpReader::new(&bytes), &registry).unwrap(), vec![prop]);
    }

    #[test]
    fn next_tables_padding_is_outside_the_length() {
        let bytes = [0, 3, 0, 7, 5, 6, 7, 0];
        let props = decode_properties(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            props,
            vec![TableFeatureProperty::NextTables {
                miss: true,
                tables: vec![5, 6, 7],
            }]
        );
    }

    #[test]
    fn unknown_experimenter_property_is_skipped() {
        let bytes = [
            0xff, 0xfe, 0, 12, 0, 0, 0, 0x42, 0, 0, 0, 1, 0, 0, 0, 0, //
            0, 2, 0, 5, 1, 0, 0, 0,
        ];
        let props = decode_properties(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(
            props,
            vec![TableFeatureProperty::NextTables {
                miss: false,
                tables: vec![1],
            }]
        );
    }

    #[test]
    fn registered_experimenter_property_is_kept() {
        let bytes = [0xff, 0xff, 0, 14, 0, 0, 0, 0x42, 0, 0, 0, 1, 0xab, 0xcd, 0, 0];
        let mut builder = crate::registry::CodecRegistryBuilder::from_registry(&registry());
        register_experimenter_property(builder.table_properties(), 0x42, 1).unwrap();
        let registry = builder.build();
        let props = decode_properties(&mut OfpReader::new(&bytes), &registry).unwrap();
        assert_eq!(
            props,
            vec![TableFeatureProperty::Experimenter {
                miss: true,
                experimenter: 0x42,
                exp_type: 1,
                data: vec![0xab, 0xcd],
            }]
        );
        let mut out = OfpWriter::new();
        encode_property(&props[0], &mut out, &registry).unwrap();
        assert_eq!(out.as_slice(), &bytes[..]);
    }

    #[test]
    fn unknown_core_property_is_fatal() {
        let bytes = [0, 9, 0, 4, 0, 0, 0, 0];
        assert!(matches!(
            decode_properties(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::UnknownMessageType { type_code: 9, .. })
        ));
    }

    #[test]
    fn table_features_record() {
        let features = TableFeatures {
            table_id: 1,
            name: "Table 1".to_string(),
            metadata_match: 0x0102_0304_0506_0708,
            metadata_write: 0x0807_0605_0403_0201,
            config: 3,
            max_entries: 42,
            properties: vec![
                TableFeatureProperty::Instructions {
                    miss: false,
                    ids: vec![
                        InstructionId::Core(InstructionType::GotoTable),
                        InstructionId::Core(InstructionType::ApplyActions),
                    ],
                },
                TableFeatureProperty::Match(vec![OxmId {
                    header: OxmHeader {
                        class: OFPXMC_OPENFLOW_BASIC,
                        field: basic::IN_PORT,
                        has_mask: false,
                        length: 4,
                    },
                    experimenter: None,
                }]),
            ],
        };
        assert!(features.is_deprecated());
        let registry = registry();
        let mut out = OfpWriter::new();
        features.marshal(&mut out, &registry).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 64 + 16 + 8);
        assert_eq!(&bytes[..2], &[0, 88]);
        let mut r = OfpReader::new(&bytes);
        assert_eq!(TableFeatures::parse(&mut r, &registry).unwrap(), features);
        assert!(r.is_empty());
    }

    #[test]
    fn short_record_is_a_length_mismatch() {
        let bytes = [0, 32, 0, 0];
        assert!(matches!(
            TableFeatures::parse(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::LengthMismatch { declared: 32, .. })
        ));
    }
}
