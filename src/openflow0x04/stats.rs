//! Switch description and the flow, table, port and queue statistics records.

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::registry::CodecRegistry;

use super::instruction::{decode_instructions, encode_instructions, Instruction};
use super::oxm::Pattern;
use super::{FlowModFlags, PseudoPort, Timeout, OFPG_ANY};

const DESC_STR_LEN: usize = 256;
const SERIAL_NUM_LEN: usize = 32;

/// Read records of a length-prefixed kind until `input` is exhausted. The
/// 16-bit length sits `len_at` bytes into each record.
pub(crate) fn parse_records<T, F>(
    input: &mut OfpReader<'_>,
    structure: &'static str,
    len_at: usize,
    min_len: usize,
    mut parse: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut OfpReader<'_>) -> Result<T>,
{
    let mut records = vec![];
    while !input.is_empty() {
        let len = input.peek_u16_at(len_at)? as usize;
        if len < min_len {
            return Err(CodecError::LengthMismatch {
                structure,
                declared: len,
                actual: min_len,
            });
        }
        let mut record = input.sub_reader(len)?;
        records.push(parse(&mut record)?);
        record.finish(structure)?;
    }
    Ok(records)
}

/// Read fixed-size records until `input` is exhausted.
pub(crate) fn parse_fixed<T, F>(input: &mut OfpReader<'_>, mut parse: F) -> Result<Vec<T>>
where
    F: FnMut(&mut OfpReader<'_>) -> Result<T>,
{
    let mut records = vec![];
    while !input.is_empty() {
        records.push(parse(input)?);
    }
    Ok(records)
}

/// Description of the switch: manufacturer, hardware, software, serial number
/// and datapath.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchDesc {
    pub mfr_desc: String,
    pub hw_desc: String,
    pub sw_desc: String,
    pub serial_num: String,
    pub dp_desc: String,
}

impl SwitchDesc {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<SwitchDesc> {
        Ok(SwitchDesc {
            mfr_desc: bytes.read_fixed_string("mfr_desc", DESC_STR_LEN)?,
            hw_desc: bytes.read_fixed_string("hw_desc", DESC_STR_LEN)?,
            sw_desc: bytes.read_fixed_string("sw_desc", DESC_STR_LEN)?,
            serial_num: bytes.read_fixed_string("serial_num", SERIAL_NUM_LEN)?,
            dp_desc: bytes.read_fixed_string("dp_desc", DESC_STR_LEN)?,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        bytes.write_fixed_string("mfr_desc", &self.mfr_desc, DESC_STR_LEN)?;
        bytes.write_fixed_string("hw_desc", &self.hw_desc, DESC_STR_LEN)?;
        bytes.write_fixed_string("sw_desc", &self.sw_desc, DESC_STR_LEN)?;
        bytes.write_fixed_string("serial_num", &self.serial_num, SERIAL_NUM_LEN)?;
        bytes.write_fixed_string("dp_desc", &self.dp_desc, DESC_STR_LEN)
    }
}

/// Statistics of one flow entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStats {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: Timeout,
    pub hard_timeout: Timeout,
    pub flags: FlowModFlags,
    pub cookie: u64,
    pub packet_count: u64,
    pub byte_count: u64,
    pub pattern: Pattern,
    pub instructions: Vec<Instruction>,
}

impl FlowStats {
    pub const FIXED_LEN: usize = 48;

    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<FlowStats> {
        bytes.skip(2)?;
        let table_id = bytes.read_u8()?;
        bytes.skip_padding(1)?;
        let duration_sec = bytes.read_u32()?;
        let duration_nsec = bytes.read_u32()?;
        let priority = bytes.read_u16()?;
        let idle_timeout = Timeout::of_int(bytes.read_u16()?);
        let hard_timeout = Timeout::of_int(bytes.read_u16()?);
        let flags = FlowModFlags::of_int(bytes.read_u16()?);
        bytes.skip_padding(4)?;
        let cookie = bytes.read_u64()?;
        let packet_count = bytes.read_u64()?;
        let byte_count = bytes.read_u64()?;
        let pattern = Pattern::parse(bytes, registry)?;
        let instructions = decode_instructions(bytes, registry)?;
        Ok(FlowStats {
            table_id,
            duration_sec,
            duration_nsec,
            priority,
            idle_timeout,
            hard_timeout,
            flags,
            cookie,
            packet_count,
            byte_count,
            pattern,
            instructions,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        let start = bytes.len();
        let len_pos = bytes.reserve_u16();
        bytes.write_u8(self.table_id);
        bytes.write_zero(1);
        bytes.write_u32(self.duration_sec);
        bytes.write_u32(self.duration_nsec);
        bytes.write_u16(self.priority);
        bytes.write_u16(self.idle_timeout.to_int());
        bytes.write_u16(self.hard_timeout.to_int());
        bytes.write_u16(self.flags.to_int());
        bytes.write_zero(4);
        bytes.write_u64(self.cookie);
        bytes.write_u64(self.packet_count);
        bytes.write_u64(self.byte_count);
        self.pattern.marshal(bytes, registry)?;
        encode_instructions(&self.instructions, bytes, registry)?;
        bytes.backfill_len("flow stats", len_pos, start)?;
        Ok(())
    }
}

/// Totals over the flows selected by an aggregate request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub packet_count: u64,
    pub byte_count: u64,
    pub flow_count: u32,
}

impl AggregateStats {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<AggregateStats> {
        let packet_count = bytes.read_u64()?;
        let byte_count = bytes.read_u64()?;
        let flow_count = bytes.read_u32()?;
        bytes.skip_padding(4)?;
        Ok(AggregateStats {
            packet_count,
            byte_count,
            flow_count,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u64(self.packet_count);
        bytes.write_u64(self.byte_count);
        bytes.write_u32(self.flow_count);
        bytes.write_zero(4);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub table_id: u8,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

impl TableStats {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<TableStats> {
        let table_id = bytes.read_u8()?;
        bytes.skip_padding(3)?;
        Ok(TableStats {
            table_id,
            active_count: bytes.read_u32()?,
            lookup_count: bytes.read_u64()?,
            matched_count: bytes.read_u64()?,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u8(self.table_id);
        bytes.write_zero(3);
        bytes.write_u32(self.active_count);
        bytes.write_u64(self.lookup_count);
        bytes.write_u64(self.matched_count);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStats {
    pub port_no: PseudoPort,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_frame_err: u64,
    pub rx_over_err: u64,
    pub rx_crc_err: u64,
    pub collisions: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl PortStats {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<PortStats> {
        let port_no = PseudoPort::of_int(bytes.read_u32()?)?;
        bytes.skip_padding(4)?;
        Ok(PortStats {
            port_no,
            rx_packets: bytes.read_u64()?,
            tx_packets: bytes.read_u64()?,
            rx_bytes: bytes.read_u64()?,
            tx_bytes: bytes.read_u64()?,
            rx_dropped: bytes.read_u64()?,
            tx_dropped: bytes.read_u64()?,
            rx_errors: bytes.read_u64()?,
            tx_errors: bytes.read_u64()?,
            rx_frame_err: bytes.read_u64()?,
            rx_over_err: bytes.read_u64()?,
            rx_crc_err: bytes.read_u64()?,
            collisions: bytes.read_u64()?,
            duration_sec: bytes.read_u32()?,
            duration_nsec: bytes.read_u32()?,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u32(self.port_no.to_int());
        bytes.write_zero(4);
        for &counter in [
            self.rx_packets,
            self.tx_packets,
            self.rx_bytes,
            self.tx_bytes,
            self.rx_dropped,
            self.tx_dropped,
            self.rx_errors,
            self.tx_errors,
            self.rx_frame_err,
            self.rx_over_err,
            self.rx_crc_err,
            self.collisions,
        ]
        .iter()
        {
            bytes.write_u64(counter);
        }
        bytes.write_u32(self.duration_sec);
        bytes.write_u32(self.duration_nsec);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    pub port_no: PseudoPort,
    pub queue_id: u32,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl QueueStats {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<QueueStats> {
        Ok(QueueStats {
            port_no: PseudoPort::of_int(bytes.read_u32()?)?,
            queue_id: bytes.read_u32()?,
            tx_bytes: bytes.read_u64()?,
            tx_packets: bytes.read_u64()?,
            tx_errors: bytes.read_u64()?,
            duration_sec: bytes.read_u32()?,
            duration_nsec: bytes.read_u32()?,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u32(self.port_no.to_int());
        bytes.write_u32(self.queue_id);
        bytes.write_u64(self.tx_bytes);
        bytes.write_u64(self.tx_packets);
        bytes.write_u64(self.tx_errors);
        bytes.write_u32(self.duration_sec);
        bytes.write_u32(self.duration_nsec);
    }
}

/// Selection of flows for flow and aggregate statistics requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsRequest {
    pub table_id: u8,
    pub out_port: PseudoPort,
    pub out_group: u32,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub pattern: Pattern,
}

impl FlowStatsRequest {
    /// Every flow in every table.
    pub fn all() -> FlowStatsRequest {
        FlowStatsRequest {
            table_id: 0xff,
            out_port: PseudoPort::Any,
            out_group: OFPG_ANY,
            cookie: 0,
            cookie_mask: 0,
            pattern: Pattern::new(),
        }
    }

    pub fn parse(bytes: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<FlowStatsRequest> {
        let table_id = bytes.read_u8()?;
        bytes.skip_padding(3)?;
        let out_port = PseudoPort::of_int(bytes.read_u32()?)?;
        let out_group = bytes.read_u32()?;
        bytes.skip_padding(4)?;
        let cookie = bytes.read_u64()?;
        let cookie_mask = bytes.read_u64()?;
        let pattern = Pattern::parse(bytes, registry)?;
        Ok(FlowStatsRequest {
            table_id,
            out_port,
            out_group,
            cookie,
            cookie_mask,
            pattern,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter, registry: &CodecRegistry) -> Result<()> {
        bytes.write_u8(self.table_id);
        bytes.write_zero(3);
        bytes.write_u32(self.out_port.to_int());
        bytes.write_u32(self.out_group);
        bytes.write_zero(4);
        bytes.write_u64(self.cookie);
        bytes.write_u64(self.cookie_mask);
        self.pattern.marshal(bytes, registry)
    }
}
