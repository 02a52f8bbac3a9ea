//! Encapsulates handling of whole OpenFlow 1.3 messages.

use tracing::trace;

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::ofp_header::OfpHeader;
use crate::ofp_message::OfpMessage;
use crate::registry::CodecRegistry;

use super::instruction::Instruction;
use super::multipart::{MultipartReply, MultipartRequest};
use super::oxm::Pattern;
use super::port::PortStatus;
use super::{FlowMod, FlowModCmd, FlowModFlags, MsgCode, PseudoPort, SwitchFeatures, Timeout, OFPG_ANY};

/// An error reported by the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMsg {
    pub typ: u16,
    pub code: u16,
    /// Usually the leading bytes of the offending request.
    pub data: Vec<u8>,
}

/// A vendor-defined message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimenterMsg {
    pub experimenter: u32,
    pub exp_type: u32,
    pub data: Vec<u8>,
}

/// Abstractions of OpenFlow messages mapping to message codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello,
    Error(ErrorMsg),
    EchoRequest(Vec<u8>),
    EchoReply(Vec<u8>),
    Experimenter(ExperimenterMsg),
    FeaturesReq,
    FeaturesReply(SwitchFeatures),
    PortStatus(PortStatus),
    FlowMod(FlowMod),
    MultipartRequest(MultipartRequest),
    MultipartReply(MultipartReply),
    BarrierRequest,
    BarrierReply,
}

impl Message {
    /// Map `Message` to associated OpenFlow message type code `MsgCode`.
    fn msg_code_of_message(msg: &Message) -> MsgCode {
        match *msg {
            Message::Hello => MsgCode::Hello,
            Message::Error(_) => MsgCode::Error,
            Message::EchoRequest(_) => MsgCode::EchoReq,
            Message::EchoReply(_) => MsgCode::EchoResp,
            Message::Experimenter(_) => MsgCode::Experimenter,
            Message::FeaturesReq => MsgCode::FeaturesReq,
            Message::FeaturesReply(_) => MsgCode::FeaturesResp,
            Message::PortStatus(_) => MsgCode::PortStatus,
            Message::FlowMod(_) => MsgCode::FlowMod,
            Message::MultipartRequest(_) => MsgCode::MultipartReq,
            Message::MultipartReply(_) => MsgCode::MultipartResp,
            Message::BarrierRequest => MsgCode::BarrierReq,
            Message::BarrierReply => MsgCode::BarrierResp,
        }
    }

    /// Marshal the body of the OpenFlow message `msg`.
    fn marshal_body(msg: &Message, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        match *msg {
            Message::Hello | Message::FeaturesReq | Message::BarrierRequest | Message::BarrierReply => (),
            Message::Error(ref err) => {
                bytes.write_u16(err.typ);
                bytes.write_u16(err.code);
                bytes.write_bytes(&err.data);
            }
            Message::EchoRequest(ref buf) | Message::EchoReply(ref buf) => bytes.write_bytes(buf),
            Message::Experimenter(ref exp) => {
                bytes.write_u32(exp.experimenter);
                bytes.write_u32(exp.exp_type);
                bytes.write_bytes(&exp.data);
            }
            Message::FeaturesReply(ref features) => features.marshal(bytes),
            Message::PortStatus(ref status) => status.marshal(bytes)?,
            Message::FlowMod(ref flow_mod) => flow_mod.marshal(bytes, registry)?,
            Message::MultipartRequest(ref req) => req.marshal(bytes, registry)?,
            Message::MultipartReply(ref reply) => reply.marshal(bytes, registry)?,
        }
        Ok(())
    }
}

fn read_rest(body: &mut OfpReader<'_>) -> Result<Vec<u8>> {
    let left = body.remaining();
    Ok(body.read_bytes(left)?.to_vec())
}

impl OfpMessage for Message {
    fn type_code(msg: &Message) -> u8 {
        Message::msg_code_of_message(msg) as u8
    }

    fn marshal(version: u8, xid: u32, msg: &Message, registry: &CodecRegistry) -> Result<Vec<u8>> {
        let mut bytes = OfpWriter::new();
        OfpHeader::marshal(&mut bytes, OfpHeader::new(version, Message::type_code(msg), 0, xid));
        Message::marshal_body(msg, &mut bytes, registry)?;
        // the header's length field sits at offset 2
        bytes.backfill_len("message", 2, 0)?;
        Ok(bytes.into_bytes())
    }

    fn parse(header: &OfpHeader, body: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<(u32, Message)> {
        let code = MsgCode::of_int(header.type_code()).ok_or(CodecError::UnknownMessageType {
            version: header.version(),
            type_code: header.type_code() as u16,
        })?;
        trace!(?code, xid = header.xid(), len = header.length(), "message");
        let msg = match code {
            MsgCode::Hello => {
                // hello elements are not interpreted
                read_rest(body)?;
                Message::Hello
            }
            MsgCode::Error => Message::Error(ErrorMsg {
                typ: body.read_u16()?,
                code: body.read_u16()?,
                data: read_rest(body)?,
            }),
            MsgCode::EchoReq => Message::EchoRequest(read_rest(body)?),
            MsgCode::EchoResp => Message::EchoReply(read_rest(body)?),
            MsgCode::Experimenter => Message::Experimenter(ExperimenterMsg {
                experimenter: body.read_u32()?,
                exp_type: body.read_u32()?,
                data: read_rest(body)?,
            }),
            MsgCode::FeaturesReq => Message::FeaturesReq,
            MsgCode::FeaturesResp => Message::FeaturesReply(SwitchFeatures::parse(body)?),
            MsgCode::PortStatus => Message::PortStatus(PortStatus::parse(body)?),
            MsgCode::FlowMod => Message::FlowMod(FlowMod::parse(body, registry)?),
            MsgCode::MultipartReq => Message::MultipartRequest(MultipartRequest::parse(body, registry)?),
            MsgCode::MultipartResp => Message::MultipartReply(MultipartReply::parse(body, registry)?),
            MsgCode::BarrierReq => Message::BarrierRequest,
            MsgCode::BarrierResp => Message::BarrierReply,
            code => {
                return Err(CodecError::UnknownMessageType {
                    version: header.version(),
                    type_code: code as u16,
                })
            }
        };
        body.finish("message")?;
        Ok((header.xid(), msg))
    }
}

/// Return a `FlowMod` adding a flow parameterized by the given `priority`, `pattern`,
/// and `instructions`.
pub fn add_flow(prio: u16, pattern: Pattern, instructions: Vec<Instruction>) -> FlowMod {
    FlowMod {
        cookie: 0,
        cookie_mask: 0,
        table_id: 0,
        command: FlowModCmd::AddFlow,
        idle_timeout: Timeout::Permanent,
        hard_timeout: Timeout::Permanent,
        priority: prio,
        buffer_id: None,
        out_port: PseudoPort::Any,
        out_group: OFPG_ANY,
        flags: FlowModFlags::default(),
        pattern,
        instructions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::action::Action;
    use crate::openflow0x04::oxm::{basic, MatchEntry};
    use crate::openflow0x04::OFP_VERSION;

    fn round_trip(msg: &Message) -> (Vec<u8>, Message) {
        let registry = CodecRegistry::openflow13().unwrap();
        let bytes = Message::marshal(OFP_VERSION, 0x1234, msg, &registry).unwrap();
        let mut r = OfpReader::new(&bytes);
        let header = OfpHeader::parse(&mut r).unwrap();
        assert_eq!(header.length(), bytes.len());
        let mut body = r.sub_reader(header.length() - OfpHeader::size()).unwrap();
        let (xid, parsed) = Message::parse(&header, &mut body, &registry).unwrap();
        assert_eq!(xid, 0x1234);
        (bytes, parsed)
    }

    #[test]
    fn hello_is_a_bare_header() {
        let (bytes, msg) = round_trip(&Message::Hello);
        assert_eq!(bytes, vec![4, 0, 0, 8, 0, 0, 0x12, 0x34]);
        assert_eq!(msg, Message::Hello);
    }

    #[test]
    fn echo_carries_its_payload() {
        let echo = Message::EchoRequest(vec![1, 2, 3]);
        let (bytes, msg) = round_trip(&echo);
        assert_eq!(bytes.len(), 11);
        assert_eq!(msg, echo);
    }

    #[test]
    fn flow_mod_add_flow() {
        let pattern = Pattern::new()
            .with(MatchEntry::basic(basic::ETH_TYPE, vec![0x08, 0x00]))
            .with(MatchEntry::basic(basic::IPV4_DST, vec![10, 0, 0, 1]));
        let flow = add_flow(
            10,
            pattern,
            vec![Instruction::ApplyActions(vec![Action::Output {
                port: PseudoPort::PhysicalPort(1),
                max_len: 0,
            }])],
        );
        let (bytes, msg) = round_trip(&Message::FlowMod(flow.clone()));
        // header 8, fixed 40, match 4 + 6 + 8 padded to 24, instruction 24
        assert_eq!(bytes.len(), 96);
        assert_eq!(bytes[1], MsgCode::FlowMod as u8);
        assert_eq!(msg, Message::FlowMod(flow));
    }

    #[test]
    fn error_message() {
        let err = Message::Error(ErrorMsg {
            typ: 1,
            code: 2,
            data: vec![4, 14, 0, 8],
        });
        assert_eq!(round_trip(&err).1, err);
    }

    #[test]
    fn unsupported_message_type() {
        let registry = CodecRegistry::openflow13().unwrap();
        let header = OfpHeader::new(OFP_VERSION, MsgCode::PacketIn as u8, 8, 1);
        let empty: [u8; 0] = [];
        assert_eq!(
            Message::parse(&header, &mut OfpReader::new(&empty), &registry),
            Err(CodecError::UnknownMessageType {
                version: OFP_VERSION,
                type_code: 10,
            })
        );
    }

    #[test]
    fn trailing_bytes_after_barrier_are_rejected() {
        let registry = CodecRegistry::openflow13().unwrap();
        let header = OfpHeader::new(OFP_VERSION, MsgCode::BarrierReq as u8, 10, 1);
        let body = [0, 0];
        assert!(matches!(
            Message::parse(&header, &mut OfpReader::new(&body), &registry),
            Err(CodecError::LengthMismatch { .. })
        ));
    }
}
