//! Flow instructions.

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::experimenter::EXPERIMENTER_MARKER;
use crate::registry::{CodecKey, CodecRegistry, CodecTable, Deserializer, Scope, Serializer};

use super::action::{decode_actions, encode_actions, Action};
use super::OFP_VERSION;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionType {
    GotoTable = 1,
    WriteMetadata = 2,
    WriteActions = 3,
    ApplyActions = 4,
    ClearActions = 5,
    Meter = 6,
    Experimenter = 0xffff,
}

impl InstructionType {
    pub fn of_int(t: u16) -> Option<InstructionType> {
        let typ = match t {
            1 => InstructionType::GotoTable,
            2 => InstructionType::WriteMetadata,
            3 => InstructionType::WriteActions,
            4 => InstructionType::ApplyActions,
            5 => InstructionType::ClearActions,
            6 => InstructionType::Meter,
            0xffff => InstructionType::Experimenter,
            _ => return None,
        };
        Some(typ)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    GotoTable(u8),
    WriteMetadata { metadata: u64, mask: u64 },
    WriteActions(Vec<Action>),
    ApplyActions(Vec<Action>),
    ClearActions,
    Meter(u32),
    /// Instruction body after the experimenter id, trailing padding included.
    Experimenter { experimenter: u32, data: Vec<u8> },
}

impl Instruction {
    pub fn type_code(&self) -> InstructionType {
        match *self {
            Instruction::GotoTable(_) => InstructionType::GotoTable,
            Instruction::WriteMetadata { .. } => InstructionType::WriteMetadata,
            Instruction::WriteActions(_) => InstructionType::WriteActions,
            Instruction::ApplyActions(_) => InstructionType::ApplyActions,
            Instruction::ClearActions => InstructionType::ClearActions,
            Instruction::Meter(_) => InstructionType::Meter,
            Instruction::Experimenter { .. } => InstructionType::Experimenter,
        }
    }

    pub fn codec_key(&self) -> CodecKey {
        match *self {
            Instruction::Experimenter { experimenter, .. } => CodecKey::vendor(
                OFP_VERSION,
                Scope::Instruction(EXPERIMENTER_MARKER),
                experimenter,
                None,
            ),
            ref i => CodecKey::core(OFP_VERSION, Scope::Instruction(i.type_code() as u16)),
        }
    }
}

pub struct CoreInstructionCodec {
    kind: InstructionType,
}

impl Serializer<Instruction> for CoreInstructionCodec {
    fn serialize(&self, inst: &Instruction, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        if inst.type_code() != self.kind {
            return Err(CodecError::InvalidValue {
                structure: "instruction for registered codec",
                value: self.kind as u64,
            });
        }
        let start = out.len();
        out.write_u16(self.kind as u16);
        let len_pos = out.reserve_u16();
        match *inst {
            Instruction::GotoTable(table_id) => {
                out.write_u8(table_id);
                out.write_zero(3);
            }
            Instruction::WriteMetadata { metadata, mask } => {
                out.write_zero(4);
                out.write_u64(metadata);
                out.write_u64(mask);
            }
            Instruction::WriteActions(ref actions) | Instruction::ApplyActions(ref actions) => {
                out.write_zero(4);
                encode_actions(actions, out, registry)?;
            }
            Instruction::ClearActions => out.write_zero(4),
            Instruction::Meter(meter_id) => out.write_u32(meter_id),
            Instruction::Experimenter { experimenter, ref data } => {
                out.write_u32(experimenter);
                out.write_bytes(data);
                out.pad_to_alignment(start);
            }
        }
        out.backfill_len("instruction", len_pos, start)?;
        Ok(())
    }
}

impl Deserializer<Instruction> for CoreInstructionCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Instruction> {
        input.skip(4)?;
        let inst = match self.kind {
            InstructionType::GotoTable => {
                let table_id = input.read_u8()?;
                input.skip_padding(3)?;
                Instruction::GotoTable(table_id)
            }
            InstructionType::WriteMetadata => {
                input.skip_padding(4)?;
                Instruction::WriteMetadata {
                    metadata: input.read_u64()?,
                    mask: input.read_u64()?,
                }
            }
            InstructionType::WriteActions => {
                input.skip_padding(4)?;
                Instruction::WriteActions(decode_actions(input, registry)?)
            }
            InstructionType::ApplyActions => {
                input.skip_padding(4)?;
                Instruction::ApplyActions(decode_actions(input, registry)?)
            }
            InstructionType::ClearActions => {
                input.skip_padding(4)?;
                Instruction::ClearActions
            }
            InstructionType::Meter => Instruction::Meter(input.read_u32()?),
            InstructionType::Experimenter => {
                let experimenter = input.read_u32()?;
                let left = input.remaining();
                Instruction::Experimenter {
                    experimenter,
                    data: input.read_bytes(left)?.to_vec(),
                }
            }
        };
        Ok(inst)
    }
}

pub(crate) fn register_core_instructions(table: &mut CodecTable<Instruction>) -> Result<()> {
    let kinds = [
        InstructionType::GotoTable,
        InstructionType::WriteMetadata,
        InstructionType::WriteActions,
        InstructionType::ApplyActions,
        InstructionType::ClearActions,
        InstructionType::Meter,
    ];
    for &kind in kinds.iter() {
        table.register(
            CodecKey::core(OFP_VERSION, Scope::Instruction(kind as u16)),
            CoreInstructionCodec { kind },
        )?;
    }
    Ok(())
}

/// Register pass-through handling for experimenter instructions of `experimenter`.
pub fn register_experimenter_instructions(table: &mut CodecTable<Instruction>, experimenter: u32) -> Result<()> {
    table.register(
        CodecKey::vendor(OFP_VERSION, Scope::Instruction(EXPERIMENTER_MARKER), experimenter, None),
        CoreInstructionCodec {
            kind: InstructionType::Experimenter,
        },
    )
}

pub fn encode_instructions(insts: &[Instruction], out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    for inst in insts {
        registry
            .instructions()
            .serializer_or_fail(&inst.codec_key())?
            .serialize(inst, out, registry)?;
    }
    Ok(())
}

/// Decode instructions until `input` is exhausted. Experimenter instructions
/// with no registered codec are skipped.
pub fn decode_instructions(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Vec<Instruction>> {
    let mut insts = vec![];
    while !input.is_empty() {
        let offset = input.offset();
        let typ = input.peek_u16_at(0)?;
        let len = input.peek_u16_at(2)? as usize;
        if len < 8 {
            return Err(CodecError::LengthMismatch {
                structure: "instruction",
                declared: len,
                actual: 8,
            });
        }
        let mut item = input.sub_reader(len)?;
        let key = if typ == EXPERIMENTER_MARKER {
            CodecKey::vendor(OFP_VERSION, Scope::Instruction(typ), item.peek_u32_at(4)?, None)
        } else {
            CodecKey::core(OFP_VERSION, Scope::Instruction(typ))
        };
        match registry.instructions().deserializer(&key) {
            Some(codec) => {
                insts.push(codec.deserialize(&mut item, registry)?);
                item.finish("instruction")?;
            }
            None if key.is_vendor() => registry.unknown_extension(&key, len, offset)?,
            None => return Err(key.miss_error()),
        }
    }
    Ok(insts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::PseudoPort;

    #[test]
    fn apply_actions_wraps_the_action_list() {
        let registry = CodecRegistry::openflow13().unwrap();
        let insts = vec![
            Instruction::ApplyActions(vec![Action::Output {
                port: PseudoPort::PhysicalPort(2),
                max_len: 0,
            }]),
            Instruction::GotoTable(3),
        ];
        let mut out = OfpWriter::new();
        encode_instructions(&insts, &mut out, &registry).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..8], &[0, 4, 0, 24, 0, 0, 0, 0]);
        assert_eq!(&bytes[24..], &[0, 1, 0, 8, 3, 0, 0, 0]);
        assert_eq!(decode_instructions(&mut OfpReader::new(&bytes), &registry).unwrap(), insts);
    }

    #[test]
    fn codec_refuses_other_instruction_kinds() {
        let registry = CodecRegistry::openflow13().unwrap();
        let goto = CoreInstructionCodec {
            kind: InstructionType::GotoTable,
        };
        let mut out = OfpWriter::new();
        assert_eq!(
            goto.serialize(&Instruction::Meter(7), &mut out, &registry),
            Err(CodecError::InvalidValue {
                structure: "instruction for registered codec",
                value: 1,
            })
        );
        assert!(out.is_empty());
        goto.serialize(&Instruction::GotoTable(7), &mut out, &registry).unwrap();
        assert_eq!(out.as_slice(), &[0, 1, 0, 8, 7, 0, 0, 0]);
    }

    #[test]
    fn write_metadata_is_24_bytes() {
        let registry = CodecRegistry::openflow13().unwrap();
        let inst = Instruction::WriteMetadata {
            metadata: 0x10,
            mask: 0xff,
        };
        let mut out = OfpWriter::new();
        encode_instructions(&[inst.clone()], &mut out, &registry).unwrap();
        assert_eq!(out.len(), 24);
        let bytes = out.into_bytes();
        assert_eq!(decode_instructions(&mut OfpReader::new(&bytes), &registry).unwrap(), vec![inst]);
    }

    #[test]
    fn experimenter_instructions_need_registration() {
        let bytes = [0xff, 0xff, 0, 16, 0, 0, 0, 0x42, 1, 2, 3, 4, 0, 0, 0, 0, 0, 5, 0, 8, 0, 0, 0, 0];
        let registry = CodecRegistry::openflow13().unwrap();
        assert_eq!(
            decode_instructions(&mut OfpReader::new(&bytes), &registry).unwrap(),
            vec![Instruction::ClearActions]
        );

        let mut builder = crate::registry::CodecRegistryBuilder::from_registry(&registry);
        register_experimenter_instructions(builder.instructions(), 0x42).unwrap();
        let registry = builder.build();
        let insts = decode_instructions(&mut OfpReader::new(&bytes), &registry).unwrap();
        assert_eq!(
            insts[0],
            Instruction::Experimenter {
                experimenter: 0x42,
                data: vec![1, 2, 3, 4, 0, 0, 0, 0],
            }
        );
        let mut out = OfpWriter::new();
        encode_instructions(&insts, &mut out, &registry).unwrap();
        assert_eq!(out.as_slice(), &bytes[..]);
    }
}
