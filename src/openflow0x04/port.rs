//! Physical port descriptions and status.

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};

use super::PseudoPort;

const PORT_NAME_LEN: usize = 16;

/// Current state of a physical port. Not configurable by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortState {
    pub link_down: bool,
    pub blocked: bool,
    pub live: bool,
}

impl PortState {
    pub fn of_int(d: u32) -> PortState {
        let d = d as u64;
        PortState {
            link_down: test_bit(0, d),
            blocked: test_bit(1, d),
            live: test_bit(2, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.link_down);
        d = bit(1, d, self.blocked);
        d = bit(2, d, self.live);
        d as u32
    }
}

/// Features of physical ports available in a datapath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortFeatures {
    pub f_10mbhd: bool,
    pub f_10mbfd: bool,
    pub f_100mbhd: bool,
    pub f_100mbfd: bool,
    pub f_1gbhd: bool,
    pub f_1gbfd: bool,
    pub f_10gbfd: bool,
    pub f_40gbfd: bool,
    pub f_100gbfd: bool,
    pub f_1tbfd: bool,
    pub other: bool,
    pub copper: bool,
    pub fiber: bool,
    pub autoneg: bool,
    pub pause: bool,
    pub pause_asym: bool,
}

impl PortFeatures {
    pub fn of_int(d: u32) -> PortFeatures {
        let d = d as u64;
        PortFeatures {
            f_10mbhd: test_bit(0, d),
            f_10mbfd: test_bit(1, d),
            f_100mbhd: test_bit(2, d),
            f_100mbfd: test_bit(3, d),
            f_1gbhd: test_bit(4, d),
            f_1gbfd: test_bit(5, d),
            f_10gbfd: test_bit(6, d),
            f_40gbfd: test_bit(7, d),
            f_100gbfd: test_bit(8, d),
            f_1tbfd: test_bit(9, d),
            other: test_bit(10, d),
            copper: test_bit(11, d),
            fiber: test_bit(12, d),
            autoneg: test_bit(13, d),
            pause: test_bit(14, d),
            pause_asym: test_bit(15, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let flags = [
            self.f_10mbhd,
            self.f_10mbfd,
            self.f_100mbhd,
            self.f_100mbfd,
            self.f_1gbhd,
            self.f_1gbfd,
            self.f_10gbfd,
            self.f_40gbfd,
            self.f_100gbfd,
            self.f_1tbfd,
            self.other,
            self.copper,
            self.fiber,
            self.autoneg,
            self.pause,
            self.pause_asym,
        ];
        flags
            .iter()
            .enumerate()
            .fold(0, |d, (i, &set)| bit(i as u64, d, set)) as u32
    }
}

/// Flags to indicate behavior of the physical port.
///
/// These flags are used both to describe the current configuration of a physical port,
/// and to configure a port's behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortConfig {
    pub port_down: bool,
    pub no_recv: bool,
    pub no_fwd: bool,
    pub no_packet_in: bool,
}

impl PortConfig {
    pub fn of_int(d: u32) -> PortConfig {
        let d = d as u64;
        PortConfig {
            port_down: test_bit(0, d),
            no_recv: test_bit(2, d),
            no_fwd: test_bit(5, d),
            no_packet_in: test_bit(6, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.port_down);
        d = bit(2, d, self.no_recv);
        d = bit(5, d, self.no_fwd);
        d = bit(6, d, self.no_packet_in);
        d as u32
    }
}

/// Description of a physical port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDesc {
    pub port_no: PseudoPort,
    pub hw_addr: [u8; 6],
    pub name: String,
    pub config: PortConfig,
    pub state: PortState,
    pub curr: PortFeatures,
    pub advertised: PortFeatures,
    pub supported: PortFeatures,
    pub peer: PortFeatures,
    /// Current bit rate in kbps.
    pub curr_speed: u32,
    /// Max bit rate in kbps.
    pub max_speed: u32,
}

impl PortDesc {
    pub const SIZE: usize = 64;

    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<PortDesc> {
        let port_no = PseudoPort::of_int(bytes.read_u32()?)?;
        bytes.skip_padding(4)?;
        let hw_addr = bytes.read_array::<6>()?;
        bytes.skip_padding(2)?;
        let name = bytes.read_fixed_string("port name", PORT_NAME_LEN)?;
        let config = PortConfig::of_int(bytes.read_u32()?);
        let state = PortState::of_int(bytes.read_u32()?);
        let curr = PortFeatures::of_int(bytes.read_u32()?);
        let advertised = PortFeatures::of_int(bytes.read_u32()?);
        let supported = PortFeatures::of_int(bytes.read_u32()?);
        let peer = PortFeatures::of_int(bytes.read_u32()?);
        let curr_speed = bytes.read_u32()?;
        let max_speed = bytes.read_u32()?;
        Ok(PortDesc {
            port_no,
            hw_addr,
            name,
            config,
            state,
            curr,
            advertised,
            supported,
            peer,
            curr_speed,
            max_speed,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        bytes.write_u32(self.port_no.to_int());
        bytes.write_zero(4);
        bytes.write_bytes(&self.hw_addr);
        bytes.write_zero(2);
        bytes.write_fixed_string("port name", &self.name, PORT_NAME_LEN)?;
        bytes.write_u32(self.config.to_int());
        bytes.write_u32(self.state.to_int());
        bytes.write_u32(self.curr.to_int());
        bytes.write_u32(self.advertised.to_int());
        bytes.write_u32(self.supported.to_int());
        bytes.write_u32(self.peer.to_int());
        bytes.write_u32(self.curr_speed);
        bytes.write_u32(self.max_speed);
        Ok(())
    }
}

/// What changed about a physical port.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortReason {
    PortAdd = 0,
    PortDelete = 1,
    PortModify = 2,
}

impl PortReason {
    fn of_int(r: u8) -> Result<PortReason> {
        match r {
            0 => Ok(PortReason::PortAdd),
            1 => Ok(PortReason::PortDelete),
            2 => Ok(PortReason::PortModify),
            r => Err(CodecError::InvalidValue {
                structure: "port status reason",
                value: r as u64,
            }),
        }
    }
}

/// A physical port has changed in the datapath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub reason: PortReason,
    pub desc: PortDesc,
}

impl PortStatus {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<PortStatus> {
        let reason = PortReason::of_int(bytes.read_u8()?)?;
        bytes.skip_padding(7)?;
        let desc = PortDesc::parse(bytes)?;
        Ok(PortStatus { reason, desc })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        bytes.write_u8(self.reason as u8);
        bytes.write_zero(7);
        self.desc.marshal(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_port() -> PortDesc {
        PortDesc {
            port_no: PseudoPort::PhysicalPort(1),
            hw_addr: [0x08, 0x00, 0x27, 0xaa, 0xbb, 0xcc],
            name: "eth1".to_string(),
            config: PortConfig {
                no_packet_in: true,
                ..PortConfig::default()
            },
            state: PortState {
                live: true,
                ..PortState::default()
            },
            curr: PortFeatures::of_int(0x2820),
            advertised: PortFeatures::default(),
            supported: PortFeatures::of_int(0xffff),
            peer: PortFeatures::default(),
            curr_speed: 1_000_000,
            max_speed: 10_000_000,
        }
    }

    #[test]
    fn port_desc_is_64_bytes() {
        let port = sample_port();
        let mut out = OfpWriter::new();
        port.marshal(&mut out).unwrap();
        assert_eq!(out.len(), PortDesc::SIZE);
        let bytes = out.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[32..36], &[0, 0, 0, 0x40]);
        assert_eq!(PortDesc::parse(&mut OfpReader::new(&bytes)).unwrap(), port);
    }

    #[test]
    fn port_features_bits() {
        let f = PortFeatures::of_int(0x2820);
        assert!(f.f_1gbfd && f.copper && f.autoneg);
        assert!(!f.fiber);
        assert_eq!(f.to_int(), 0x2820);
        assert_eq!(PortFeatures::of_int(0xffff).to_int(), 0xffff);
    }

    #[test]
    fn port_status() {
        let status = PortStatus {
            reason: PortReason::PortModify,
            desc: sample_port(),
        };
        let mut out = OfpWriter::new();
        status.marshal(&mut out).unwrap();
        assert_eq!(out.len(), 72);
        let bytes = out.into_bytes();
        assert_eq!(PortStatus::parse(&mut OfpReader::new(&bytes)).unwrap(), status);
        let mut bad = bytes.clone();
        bad[0] = 9;
        assert!(PortStatus::parse(&mut OfpReader::new(&bad)).is_err());
    }
}
