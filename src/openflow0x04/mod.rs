//! OpenFlow 1.3 structures and the core codec catalog.

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::registry::{CodecRegistry, CodecRegistryBuilder, ExtensionProvider};

pub mod action;
pub mod group;
pub mod instruction;
pub mod message;
pub mod meter;
pub mod multipart;
pub mod oxm;
pub mod port;
pub mod stats;
pub mod table_features;

use self::instruction::{decode_instructions, encode_instructions, Instruction};
use self::oxm::Pattern;

/// Wire version byte of OpenFlow 1.3.
pub const OFP_VERSION: u8 = 0x04;

/// Wildcard group id.
pub const OFPG_ANY: u32 = 0xffff_ffff;
/// Buffer id meaning "no buffered packet".
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/// OpenFlow 1.3 message type codes, used by headers to identify meaning of the rest of a message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgCode {
    Hello = 0,
    Error = 1,
    EchoReq = 2,
    EchoResp = 3,
    Experimenter = 4,
    FeaturesReq = 5,
    FeaturesResp = 6,
    GetConfigReq = 7,
    GetConfigResp = 8,
    SetConfig = 9,
    PacketIn = 10,
    FlowRemoved = 11,
    PortStatus = 12,
    PacketOut = 13,
    FlowMod = 14,
    GroupMod = 15,
    PortMod = 16,
    TableMod = 17,
    MultipartReq = 18,
    MultipartResp = 19,
    BarrierReq = 20,
    BarrierResp = 21,
    QueueGetConfigReq = 22,
    QueueGetConfigResp = 23,
    RoleReq = 24,
    RoleResp = 25,
    GetAsyncReq = 26,
    GetAsyncResp = 27,
    SetAsync = 28,
    MeterMod = 29,
}

impl MsgCode {
    pub fn of_int(code: u8) -> Option<MsgCode> {
        use self::MsgCode::*;
        const ALL: [MsgCode; 30] = [
            Hello,
            Error,
            EchoReq,
            EchoResp,
            Experimenter,
            FeaturesReq,
            FeaturesResp,
            GetConfigReq,
            GetConfigResp,
            SetConfig,
            PacketIn,
            FlowRemoved,
            PortStatus,
            PacketOut,
            FlowMod,
            GroupMod,
            PortMod,
            TableMod,
            MultipartReq,
            MultipartResp,
            BarrierReq,
            BarrierResp,
            QueueGetConfigReq,
            QueueGetConfigResp,
            RoleReq,
            RoleResp,
            GetAsyncReq,
            GetAsyncResp,
            SetAsync,
            MeterMod,
        ];
        ALL.get(code as usize).copied()
    }
}

/// Reserved port numbers.
#[repr(u32)]
enum OfpPort {
    OFPPMax = 0xffff_ff00,
    OFPPInPort = 0xffff_fff8,
    OFPPTable = 0xffff_fff9,
    OFPPNormal = 0xffff_fffa,
    OFPPFlood = 0xffff_fffb,
    OFPPAll = 0xffff_fffc,
    OFPPController = 0xffff_fffd,
    OFPPLocal = 0xffff_fffe,
    OFPPAny = 0xffff_ffff,
}

/// Port behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoPort {
    PhysicalPort(u32),
    InPort,
    Table,
    Normal,
    Flood,
    AllPorts,
    Controller,
    Local,
    Any,
}

impl PseudoPort {
    pub fn of_int(p: u32) -> Result<PseudoPort> {
        let port = match p {
            p if p <= (OfpPort::OFPPMax as u32) => PseudoPort::PhysicalPort(p),
            p if p == (OfpPort::OFPPInPort as u32) => PseudoPort::InPort,
            p if p == (OfpPort::OFPPTable as u32) => PseudoPort::Table,
            p if p == (OfpPort::OFPPNormal as u32) => PseudoPort::Normal,
            p if p == (OfpPort::OFPPFlood as u32) => PseudoPort::Flood,
            p if p == (OfpPort::OFPPAll as u32) => PseudoPort::AllPorts,
            p if p == (OfpPort::OFPPController as u32) => PseudoPort::Controller,
            p if p == (OfpPort::OFPPLocal as u32) => PseudoPort::Local,
            p if p == (OfpPort::OFPPAny as u32) => PseudoPort::Any,
            p => {
                return Err(CodecError::InvalidValue {
                    structure: "port number",
                    value: p as u64,
                })
            }
        };
        Ok(port)
    }

    pub fn to_int(self) -> u32 {
        match self {
            PseudoPort::PhysicalPort(p) => p,
            PseudoPort::InPort => OfpPort::OFPPInPort as u32,
            PseudoPort::Table => OfpPort::OFPPTable as u32,
            PseudoPort::Normal => OfpPort::OFPPNormal as u32,
            PseudoPort::Flood => OfpPort::OFPPFlood as u32,
            PseudoPort::AllPorts => OfpPort::OFPPAll as u32,
            PseudoPort::Controller => OfpPort::OFPPController as u32,
            PseudoPort::Local => OfpPort::OFPPLocal as u32,
            PseudoPort::Any => OfpPort::OFPPAny as u32,
        }
    }
}

/// How long before a flow entry expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Permanent,
    ExpiresAfter(u16),
}

impl Timeout {
    pub fn of_int(tm: u16) -> Timeout {
        match tm {
            0 => Timeout::Permanent,
            d => Timeout::ExpiresAfter(d),
        }
    }

    pub fn to_int(self) -> u16 {
        match self {
            Timeout::Permanent => 0,
            Timeout::ExpiresAfter(d) => d,
        }
    }
}

/// Flags of a flow entry, shared by flow mods and flow statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowModFlags {
    pub send_flow_rem: bool,
    pub check_overlap: bool,
    pub reset_counts: bool,
    pub no_pkt_counts: bool,
    pub no_byt_counts: bool,
}

impl FlowModFlags {
    pub fn of_int(d: u16) -> FlowModFlags {
        let d = d as u64;
        FlowModFlags {
            send_flow_rem: test_bit(0, d),
            check_overlap: test_bit(1, d),
            reset_counts: test_bit(2, d),
            no_pkt_counts: test_bit(3, d),
            no_byt_counts: test_bit(4, d),
        }
    }

    pub fn to_int(&self) -> u16 {
        let mut d = 0;
        d = bit(0, d, self.send_flow_rem);
        d = bit(1, d, self.check_overlap);
        d = bit(2, d, self.reset_counts);
        d = bit(3, d, self.no_pkt_counts);
        d = bit(4, d, self.no_byt_counts);
        d as u16
    }
}

/// Capabilities supported by the datapath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub flow_stats: bool,
    pub table_stats: bool,
    pub port_stats: bool,
    pub group_stats: bool,
    pub ip_reasm: bool,
    pub queue_stats: bool,
    pub port_blocked: bool,
}

impl Capabilities {
    pub fn of_int(d: u32) -> Capabilities {
        let d = d as u64;
        Capabilities {
            flow_stats: test_bit(0, d),
            table_stats: test_bit(1, d),
            port_stats: test_bit(2, d),
            group_stats: test_bit(3, d),
            ip_reasm: test_bit(5, d),
            queue_stats: test_bit(6, d),
            port_blocked: test_bit(8, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.flow_stats);
        d = bit(1, d, self.table_stats);
        d = bit(2, d, self.port_stats);
        d = bit(3, d, self.group_stats);
        d = bit(5, d, self.ip_reasm);
        d = bit(6, d, self.queue_stats);
        d = bit(8, d, self.port_blocked);
        d as u32
    }
}

/// Switch features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub datapath_id: u64,
    pub num_buffers: u32,
    pub num_tables: u8,
    pub auxiliary_id: u8,
    pub supported_capabilities: Capabilities,
}

impl SwitchFeatures {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<SwitchFeatures> {
        let datapath_id = bytes.read_u64()?;
        let num_buffers = bytes.read_u32()?;
        let num_tables = bytes.read_u8()?;
        let auxiliary_id = bytes.read_u8()?;
        bytes.skip_padding(2)?;
        let supported_capabilities = Capabilities::of_int(bytes.read_u32()?);
        // reserved
        bytes.skip(4)?;
        Ok(SwitchFeatures {
            datapath_id,
            num_buffers,
            num_tables,
            auxiliary_id,
            supported_capabilities,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u64(self.datapath_id);
        bytes.write_u32(self.num_buffers);
        bytes.write_u8(self.num_tables);
        bytes.write_u8(self.auxiliary_id);
        bytes.write_zero(2);
        bytes.write_u32(self.supported_capabilities.to_int());
        bytes.write_u32(0);
    }
}

/// Type of modification to perform on a flow table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModCmd {
    AddFlow = 0,
    ModFlow = 1,
    ModStrictFlow = 2,
    DeleteFlow = 3,
    DeleteStrictFlow = 4,
}

impl FlowModCmd {
    fn of_int(c: u8) -> Result<FlowModCmd> {
        let cmd = match c {
            0 => FlowModCmd::AddFlow,
            1 => FlowModCmd::ModFlow,
            2 => FlowModCmd::ModStrictFlow,
            3 => FlowModCmd::DeleteFlow,
            4 => FlowModCmd::DeleteStrictFlow,
            c => {
                return Err(CodecError::InvalidValue {
                    structure: "flow mod command",
                    value: c as u64,
                })
            }
        };
        Ok(cmd)
    }
}

/// Represents modifications to a flow table from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    pub cookie: u64,
    pub cookie_mask: u64,
    pub table_id: u8,
    pub command: FlowModCmd,
    pub idle_timeout: Timeout,
    pub hard_timeout: Timeout,
    pub priority: u16,
    pub buffer_id: Option<u32>,
    pub out_port: PseudoPort,
    pub out_group: u32,
    pub flags: FlowModFlags,
    pub pattern: Pattern,
    pub instructions: Vec<Instruction>,
}

impl FlowMod {
    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<FlowMod> {
        let cookie = bytes.read_u64()?;
        let cookie_mask = bytes.read_u64()?;
        let table_id = bytes.read_u8()?;
        let command = FlowModCmd::of_int(bytes.read_u8()?)?;
        let idle_timeout = Timeout::of_int(bytes.read_u16()?);
        let hard_timeout = Timeout::of_int(bytes.read_u16()?);
        let priority = bytes.read_u16()?;
        let buffer_id = match bytes.read_u32()? {
            OFP_NO_BUFFER => None,
            id => Some(id),
        };
        let out_port = PseudoPort::of_int(bytes.read_u32()?)?;
        let out_group = bytes.read_u32()?;
        let flags = FlowModFlags::of_int(bytes.read_u16()?);
        bytes.skip_padding(2)?;
        let pattern = Pattern::parse(bytes, registry)?;
        let instructions = decode_instructions(bytes, registry)?;
        Ok(FlowMod {
            cookie,
            cookie_mask,
            table_id,
            command,
            idle_timeout,
            hard_timeout,
            priority,
            buffer_id,
            out_port,
            out_group,
            flags,
            pattern,
            instructions,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        bytes.write_u64(self.cookie);
        bytes.write_u64(self.cookie_mask);
        bytes.write_u8(self.table_id);
        bytes.write_u8(self.command as u8);
        bytes.write_u16(self.idle_timeout.to_int());
        bytes.write_u16(self.hard_timeout.to_int());
        bytes.write_u16(self.priority);
        bytes.write_u32(self.buffer_id.unwrap_or(OFP_NO_BUFFER));
        bytes.write_u32(self.out_port.to_int());
        bytes.write_u32(self.out_group);
        bytes.write_u16(self.flags.to_int());
        bytes.write_zero(2);
        self.pattern.marshal(bytes, registry)?;
        encode_instructions(&self.instructions, bytes, registry)
    }
}

/// The OpenFlow 1.3 core catalog: actions, instructions, basic match fields,
/// multipart reply bodies and table feature properties.
pub struct Openflow13Codecs;

impl ExtensionProvider for Openflow13Codecs {
    fn name(&self) -> &'static str {
        "openflow13"
    }

    fn register(&self, builder: &mut CodecRegistryBuilder) -> Result<()> {
        action::register_core_actions(builder.actions())?;
        instruction::register_core_instructions(builder.instructions())?;
        oxm::register_fields(
            builder.match_entries(),
            oxm::OFPXMC_OPENFLOW_BASIC,
            None,
            oxm::basic::FIELDS,
        )?;
        multipart::register_core_replies(builder.multipart_replies())?;
        table_features::register_core_properties(builder.table_properties())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_ports() {
        assert_eq!(PseudoPort::of_int(0xffff_fffd), Ok(PseudoPort::Controller));
        assert_eq!(PseudoPort::of_int(7), Ok(PseudoPort::PhysicalPort(7)));
        assert_eq!(PseudoPort::Any.to_int(), 0xffff_ffff);
        assert!(matches!(
            PseudoPort::of_int(0xffff_ff10),
            Err(CodecError::InvalidValue { .. })
        ));
    }

    #[test]
    fn message_codes() {
        assert_eq!(MsgCode::of_int(19), Some(MsgCode::MultipartResp));
        assert_eq!(MsgCode::of_int(29), Some(MsgCode::MeterMod));
        assert_eq!(MsgCode::of_int(30), None);
    }

    #[test]
    fn flow_mod_flags_are_lsb_first() {
        let flags = FlowModFlags {
            send_flow_rem: true,
            no_byt_counts: true,
            ..FlowModFlags::default()
        };
        assert_eq!(flags.to_int(), 0x11);
        assert_eq!(FlowModFlags::of_int(0x11), flags);
    }

    #[test]
    fn capabilities_skip_reserved_bit() {
        let caps = Capabilities::of_int(0x0000_016f);
        assert!(caps.flow_stats && caps.group_stats && caps.ip_reasm && caps.port_blocked);
        assert_eq!(caps.to_int(), 0x0000_016f);
    }

    #[test]
    fn switch_features() {
        let features = SwitchFeatures {
            datapath_id: 0x0000_0000_0000_0001,
            num_buffers: 256,
            num_tables: 254,
            auxiliary_id: 0,
            supported_capabilities: Capabilities::of_int(0x4f),
        };
        let mut out = OfpWriter::new();
        features.marshal(&mut out);
        assert_eq!(out.len(), 24);
        let bytes = out.into_bytes();
        assert_eq!(SwitchFeatures::parse(&mut OfpReader::new(&bytes)).unwrap(), features);
    }
}
