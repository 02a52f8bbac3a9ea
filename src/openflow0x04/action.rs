//! Actions: the closed OpenFlow 1.3 catalog plus experimenter actions resolved
//! through the codec registry.

use tracing::trace;

use crate::bits::{pad_len, padded};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::experimenter::{decode_vendor_frame, encode_vendor_frame, ExperimenterBody, FramePadding, EXPERIMENTER_MARKER};
use crate::registry::{CodecKey, CodecRegistry, CodecTable, Deserializer, Scope, Serializer};

use super::oxm::{decode_required_entry, encode_match_entry, MatchEntry};
use super::{PseudoPort, OFP_VERSION};

/// OpenFlow 1.3 action type codes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Output = 0,
    CopyTtlOut = 11,
    CopyTtlIn = 12,
    SetMplsTtl = 15,
    DecMplsTtl = 16,
    PushVlan = 17,
    PopVlan = 18,
    PushMpls = 19,
    PopMpls = 20,
    SetQueue = 21,
    Group = 22,
    SetNwTtl = 23,
    DecNwTtl = 24,
    SetField = 25,
    PushPbb = 26,
    PopPbb = 27,
    Experimenter = 0xffff,
}

impl ActionType {
    pub fn of_int(t: u16) -> Option<ActionType> {
        let typ = match t {
            0 => ActionType::Output,
            11 => ActionType::CopyTtlOut,
            12 => ActionType::CopyTtlIn,
            15 => ActionType::SetMplsTtl,
            16 => ActionType::DecMplsTtl,
            17 => ActionType::PushVlan,
            18 => ActionType::PopVlan,
            19 => ActionType::PushMpls,
            20 => ActionType::PopMpls,
            21 => ActionType::SetQueue,
            22 => ActionType::Group,
            23 => ActionType::SetNwTtl,
            24 => ActionType::DecNwTtl,
            25 => ActionType::SetField,
            26 => ActionType::PushPbb,
            27 => ActionType::PopPbb,
            0xffff => ActionType::Experimenter,
            _ => return None,
        };
        Some(typ)
    }

    const CORE: [ActionType; 16] = [
        ActionType::Output,
        ActionType::CopyTtlOut,
        ActionType::CopyTtlIn,
        ActionType::SetMplsTtl,
        ActionType::DecMplsTtl,
        ActionType::PushVlan,
        ActionType::PopVlan,
        ActionType::PushMpls,
        ActionType::PopMpls,
        ActionType::SetQueue,
        ActionType::Group,
        ActionType::SetNwTtl,
        ActionType::DecNwTtl,
        ActionType::SetField,
        ActionType::PushPbb,
        ActionType::PopPbb,
    ];
}

/// Actions associated with flows and packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Output { port: PseudoPort, max_len: u16 },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl(u8),
    DecMplsTtl,
    PushVlan(u16),
    PopVlan,
    PushMpls(u16),
    PopMpls(u16),
    SetQueue(u32),
    Group(u32),
    SetNwTtl(u8),
    DecNwTtl,
    SetField(MatchEntry),
    PushPbb(u16),
    PopPbb,
    Experimenter(ExperimenterAction),
}

/// An action whose identity is a vendor id plus vendor subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimenterAction {
    pub experimenter: u32,
    pub subtype: u16,
    pub payload: ExperimenterPayload,
}

impl ExperimenterAction {
    /// An action whose body is decoded by its vendor's codec.
    pub fn typed<T: ExperimenterBody>(experimenter: u32, subtype: u16, body: T) -> ExperimenterAction {
        ExperimenterAction {
            experimenter,
            subtype,
            payload: ExperimenterPayload::Typed(Box::new(body)),
        }
    }

    /// The vendor body, if it was decoded as a `T`.
    pub fn body<T: 'static>(&self) -> Option<&T> {
        match self.payload {
            ExperimenterPayload::Typed(ref body) => (**body).as_any().downcast_ref::<T>(),
            ExperimenterPayload::Opaque(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum ExperimenterPayload {
    /// A body type owned by the vendor's provider.
    Typed(Box<dyn ExperimenterBody>),
    /// Body bytes after the vendor frame header, trailing padding included.
    Opaque(Vec<u8>),
}

impl Clone for ExperimenterPayload {
    fn clone(&self) -> Self {
        match *self {
            ExperimenterPayload::Typed(ref body) => ExperimenterPayload::Typed((**body).clone_body()),
            ExperimenterPayload::Opaque(ref bytes) => ExperimenterPayload::Opaque(bytes.clone()),
        }
    }
}

impl PartialEq for ExperimenterPayload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ExperimenterPayload::Typed(a), ExperimenterPayload::Typed(b)) => (**a).eq_body(&**b),
            (ExperimenterPayload::Opaque(a), ExperimenterPayload::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ExperimenterPayload {}

impl Action {
    pub fn type_code(&self) -> ActionType {
        match *self {
            Action::Output { .. } => ActionType::Output,
            Action::CopyTtlOut => ActionType::CopyTtlOut,
            Action::CopyTtlIn => ActionType::CopyTtlIn,
            Action::SetMplsTtl(_) => ActionType::SetMplsTtl,
            Action::DecMplsTtl => ActionType::DecMplsTtl,
            Action::PushVlan(_) => ActionType::PushVlan,
            Action::PopVlan => ActionType::PopVlan,
            Action::PushMpls(_) => ActionType::PushMpls,
            Action::PopMpls(_) => ActionType::PopMpls,
            Action::SetQueue(_) => ActionType::SetQueue,
            Action::Group(_) => ActionType::Group,
            Action::SetNwTtl(_) => ActionType::SetNwTtl,
            Action::DecNwTtl => ActionType::DecNwTtl,
            Action::SetField(_) => ActionType::SetField,
            Action::PushPbb(_) => ActionType::PushPbb,
            Action::PopPbb => ActionType::PopPbb,
            Action::Experimenter(_) => ActionType::Experimenter,
        }
    }

    pub fn codec_key(&self) -> CodecKey {
        match *self {
            Action::Experimenter(ref e) => CodecKey::vendor(
                OFP_VERSION,
                Scope::Action(EXPERIMENTER_MARKER),
                e.experimenter,
                Some(e.subtype as u32),
            ),
            ref a => CodecKey::core(OFP_VERSION, Scope::Action(a.type_code() as u16)),
        }
    }
}

/// Codec for the core action kind it was registered for.
pub struct CoreActionCodec {
    kind: ActionType,
}

fn unexpected_action(kind: ActionType) -> CodecError {
    CodecError::InvalidValue {
        structure: "action for registered codec",
        value: kind as u64,
    }
}

impl Serializer<Action> for CoreActionCodec {
    fn serialize(&self, action: &Action, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        if action.type_code() != self.kind {
            return Err(unexpected_action(self.kind));
        }
        let start = out.len();
        out.write_u16(self.kind as u16);
        let len_pos = out.reserve_u16();
        match *action {
            Action::Output { port, max_len } => {
                out.write_u32(port.to_int());
                out.write_u16(max_len);
                out.write_zero(6);
            }
            Action::CopyTtlOut
            | Action::CopyTtlIn
            | Action::DecMplsTtl
            | Action::PopVlan
            | Action::DecNwTtl
            | Action::PopPbb => out.write_zero(4),
            Action::SetMplsTtl(ttl) | Action::SetNwTtl(ttl) => {
                out.write_u8(ttl);
                out.write_zero(3);
            }
            Action::PushVlan(ethertype)
            | Action::PushMpls(ethertype)
            | Action::PopMpls(ethertype)
            | Action::PushPbb(ethertype) => {
                out.write_u16(ethertype);
                out.write_zero(2);
            }
            Action::SetQueue(id) | Action::Group(id) => out.write_u32(id),
            Action::SetField(ref entry) => encode_match_entry(entry, out, registry)?,
            Action::Experimenter(_) => return Err(unexpected_action(self.kind)),
        }
        out.pad_to_alignment(start);
        out.backfill_len("action", len_pos, start)?;
        Ok(())
    }
}

impl Deserializer<Action> for CoreActionCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Action> {
        let declared = input.remaining();
        input.skip(4)?;
        let action = match self.kind {
            ActionType::Output => {
                let port = PseudoPort::of_int(input.read_u32()?)?;
                let max_len = input.read_u16()?;
                input.skip_padding(6)?;
                Action::Output { port, max_len }
            }
            ActionType::CopyTtlOut => Action::CopyTtlOut,
            ActionType::CopyTtlIn => Action::CopyTtlIn,
            ActionType::DecMplsTtl => Action::DecMplsTtl,
            ActionType::PopVlan => Action::PopVlan,
            ActionType::DecNwTtl => Action::DecNwTtl,
            ActionType::PopPbb => Action::PopPbb,
            ActionType::SetMplsTtl => Action::SetMplsTtl(input.read_u8()?),
            ActionType::SetNwTtl => Action::SetNwTtl(input.read_u8()?),
            ActionType::PushVlan => Action::PushVlan(input.read_u16()?),
            ActionType::PushMpls => Action::PushMpls(input.read_u16()?),
            ActionType::PopMpls => Action::PopMpls(input.read_u16()?),
            ActionType::PushPbb => Action::PushPbb(input.read_u16()?),
            ActionType::SetQueue => Action::SetQueue(input.read_u32()?),
            ActionType::Group => Action::Group(input.read_u32()?),
            ActionType::SetField => Action::SetField(decode_required_entry(input, registry)?),
            ActionType::Experimenter => return Err(unexpected_action(self.kind)),
        };
        // only the alignment padding of the fields may follow them
        let consumed = declared - input.remaining();
        let left = input.remaining();
        if left != pad_len(consumed) {
            return Err(CodecError::LengthMismatch {
                structure: "action",
                declared,
                actual: padded(consumed),
            });
        }
        input.skip_padding(left)?;
        Ok(action)
    }
}

/// Codec that carries an experimenter body as raw bytes, for vendors whose
/// actions only need to be passed through.
pub struct OpaqueActionCodec;

impl Serializer<Action> for OpaqueActionCodec {
    fn serialize(&self, action: &Action, out: &mut OfpWriter, _: &CodecRegistry) -> Result<()> {
        match *action {
            Action::Experimenter(ExperimenterAction {
                experimenter,
                subtype,
                payload: ExperimenterPayload::Opaque(ref body),
            }) => {
                encode_vendor_frame(out, experimenter, subtype, FramePadding::Counted, |out| {
                    out.write_bytes(body);
                    Ok(())
                })?;
                Ok(())
            }
            ref other => Err(unexpected_action(other.type_code())),
        }
    }
}

impl Deserializer<Action> for OpaqueActionCodec {
    fn deserialize(&self, input: &mut OfpReader<'_>, _: &CodecRegistry) -> Result<Action> {
        let frame = decode_vendor_frame(input)?;
        let body = input.read_bytes(frame.body_len())?.to_vec();
        Ok(Action::Experimenter(ExperimenterAction {
            experimenter: frame.vendor_id,
            subtype: frame.subtype,
            payload: ExperimenterPayload::Opaque(body),
        }))
    }
}

pub(crate) fn register_core_actions(table: &mut CodecTable<Action>) -> Result<()> {
    for &kind in ActionType::CORE.iter() {
        table.register(
            CodecKey::core(OFP_VERSION, Scope::Action(kind as u16)),
            CoreActionCodec { kind },
        )?;
    }
    Ok(())
}

/// Write `action` with the codec registered for it. Experimenter actions with
/// no registered codec fail with `UnknownExtension`.
pub fn encode_action(action: &Action, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    registry
        .actions()
        .serializer_or_fail(&action.codec_key())?
        .serialize(action, out, registry)
}

pub fn encode_actions(actions: &[Action], out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
    for action in actions {
        encode_action(action, out, registry)?;
    }
    Ok(())
}

/// Decode the action at the front of `input`.
///
/// Returns `Ok(None)` when it was an experimenter action with no registered
/// codec; its declared length has been skipped.
pub fn decode_action(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Option<Action>> {
    let offset = input.offset();
    let typ = input.peek_u16_at(0)?;
    let len = input.peek_u16_at(2)? as usize;
    if len < 8 || len % 8 != 0 {
        return Err(CodecError::LengthMismatch {
            structure: "action",
            declared: len,
            actual: padded(len.max(8)),
        });
    }
    let mut item = input.sub_reader(len)?;
    let key = if typ == EXPERIMENTER_MARKER {
        let vendor = item.peek_u32_at(4)?;
        let subtype = if len >= 10 {
            Some(item.peek_u16_at(8)? as u32)
        } else {
            None
        };
        CodecKey::vendor(OFP_VERSION, Scope::Action(typ), vendor, subtype)
    } else {
        CodecKey::core(OFP_VERSION, Scope::Action(typ))
    };
    trace!(%key, offset, len, "action");
    match registry.actions().deserializer(&key) {
        Some(codec) => {
            let action = codec.deserialize(&mut item, registry)?;
            item.finish("action")?;
            Ok(Some(action))
        }
        None if key.is_vendor() => {
            registry.unknown_extension(&key, len, offset)?;
            Ok(None)
        }
        None => Err(key.miss_error()),
    }
}

/// Decode actions until `input` is exhausted, dropping skipped experimenter actions.
pub fn decode_actions(input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<Vec<Action>> {
    let mut actions = vec![];
    while !input.is_empty() {
        if let Some(action) = decode_action(input, registry)? {
            actions.push(action);
        }
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::oxm::basic;

    fn registry() -> CodecRegistry {
        CodecRegistry::openflow13().unwrap()
    }

    fn encode(action: &Action) -> Vec<u8> {
        let mut out = OfpWriter::new();
        encode_action(action, &mut out, &registry()).unwrap();
        out.into_bytes()
    }

    #[test]
    fn output_to_controller() {
        let action = Action::Output {
            port: PseudoPort::Controller,
            max_len: 0xffff,
        };
        let bytes = encode(&action);
        assert_eq!(
            bytes,
            vec![0, 0, 0, 16, 0xff, 0xff, 0xff, 0xfd, 0xff, 0xff, 0, 0, 0, 0, 0, 0]
        );
        let decoded = decode_actions(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(decoded, vec![action]);
    }

    #[test]
    fn fixed_actions_are_eight_bytes() {
        let actions = vec![
            Action::PushVlan(0x8100),
            Action::SetQueue(7),
            Action::Group(3),
            Action::SetNwTtl(64),
            Action::PopPbb,
            Action::PopMpls(0x0800),
        ];
        let registry = registry();
        let mut out = OfpWriter::new();
        encode_actions(&actions, &mut out, &registry).unwrap();
        assert_eq!(out.len(), 48);
        assert_eq!(&out.as_slice()[..8], &[0, 17, 0, 8, 0x81, 0x00, 0, 0]);
        let bytes = out.into_bytes();
        assert_eq!(decode_actions(&mut OfpReader::new(&bytes), &registry).unwrap(), actions);
    }

    #[test]
    fn set_field_pads_the_oxm() {
        let action = Action::SetField(MatchEntry::basic(basic::VLAN_VID, vec![0x10, 0x05]));
        let bytes = encode(&action);
        assert_eq!(bytes, vec![0, 25, 0, 16, 0x80, 0, 0x0c, 2, 0x10, 0x05, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            decode_actions(&mut OfpReader::new(&bytes), &registry()).unwrap(),
            vec![action]
        );
    }

    #[test]
    fn unknown_core_type_is_fatal() {
        let bytes = [0, 0x42, 0, 8, 0, 0, 0, 0];
        assert_eq!(
            decode_actions(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::UnknownActionType {
                version: OFP_VERSION,
                type_code: 0x42,
            })
        );
    }

    #[test]
    fn unregistered_experimenter_is_skipped() {
        let bytes = [
            0, 22, 0, 8, 0, 0, 0, 9, // group 9
            0xff, 0xff, 0, 16, 0x00, 0x00, 0x23, 0x20, 0, 99, 0, 0, 0, 0, 0, 0, // nx subtype 99
            0, 18, 0, 8, 0, 0, 0, 0, // pop vlan
        ];
        let decoded = decode_actions(&mut OfpReader::new(&bytes), &registry()).unwrap();
        assert_eq!(decoded, vec![Action::Group(9), Action::PopVlan]);
    }

    #[test]
    fn unregistered_experimenter_fails_when_skipping_is_off() {
        let registry = crate::registry::CodecRegistryBuilder::new()
            .skip_unknown_extensions(false)
            .with_provider(&crate::openflow0x04::Openflow13Codecs)
            .unwrap()
            .build();
        let bytes = [0xff, 0xff, 0, 16, 0x00, 0x00, 0x23, 0x20, 0, 99, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_actions(&mut OfpReader::new(&bytes), &registry),
            Err(CodecError::UnknownExtension { .. })
        ));
    }

    #[test]
    fn encoding_unregistered_experimenter_fails() {
        let action = Action::Experimenter(ExperimenterAction {
            experimenter: 0x00ab_cdef,
            subtype: 1,
            payload: ExperimenterPayload::Opaque(vec![]),
        });
        let mut out = OfpWriter::new();
        assert!(matches!(
            encode_action(&action, &mut out, &registry()),
            Err(CodecError::UnknownExtension { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn declared_length_past_the_list_is_truncated() {
        let bytes = [0, 22, 0, 16, 0, 0, 0, 9];
        assert!(matches!(
            decode_actions(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn fields_followed_by_more_than_padding_are_rejected() {
        // push_vlan declaring 16 bytes: 2 of ethertype, 2 of padding, 8 extra
        let bytes = [0, 17, 0, 16, 0x81, 0, 0, 0, 0xde, 0xad, 0xbe, 0xef, 1, 2, 3, 4];
        assert_eq!(
            decode_actions(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::LengthMismatch {
                structure: "action",
                declared: 16,
                actual: 8,
            })
        );
        let output = [0, 0, 0, 24, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_actions(&mut OfpReader::new(&output), &registry()),
            Err(CodecError::LengthMismatch { declared: 24, actual: 16, .. })
        ));
    }

    #[test]
    fn typed_payloads_compare_by_vendor_type() {
        let a = ExperimenterAction::typed(0x00ab_cdef, 1, 7u32);
        assert_eq!(a.clone(), a);
        assert_eq!(a.body::<u32>(), Some(&7));
        assert_eq!(a.body::<u16>(), None);
        assert_ne!(a, ExperimenterAction::typed(0x00ab_cdef, 1, 7u16));
        assert_ne!(a, ExperimenterAction::typed(0x00ab_cdef, 1, 8u32));
    }

    #[test]
    fn unaligned_length_is_rejected() {
        let bytes = [0, 22, 0, 6, 0, 0, 0, 9];
        assert!(matches!(
            decode_actions(&mut OfpReader::new(&bytes), &registry()),
            Err(CodecError::LengthMismatch { declared: 6, .. })
        ));
    }
}
