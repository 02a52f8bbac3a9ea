//! NXM match fields and the field headers Nicira actions use to name them.
//!
//! A field header is the 32-bit OXM/NXM header of a field. Headers of the
//! experimenter class carry the experimenter id as well and are 64 bits on the
//! wire; a header whose top 16 bits are `0xffff` is read as 64 bits.

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::Result;
use crate::openflow0x04::oxm::OFPXMC_EXPERIMENTER;

/// Pack an NXM/OXM header.
pub const fn nxm_header(class: u16, field: u8, has_mask: bool, len: u8) -> u32 {
    (class as u32) << 16 | ((field as u32) & 0x7f) << 9 | (has_mask as u32) << 8 | len as u32
}

/// A 64-bit experimenter field header: header word then experimenter id.
pub const fn experimenter_header(field: u8, len: u8, experimenter: u32) -> u64 {
    (nxm_header(OFPXMC_EXPERIMENTER, field, false, len + 4) as u64) << 32 | experimenter as u64
}

fn is_wide(header: u64) -> bool {
    header >> 48 == 0xffff
}

/// Bytes `header` occupies on the wire.
pub fn field_header_len(header: u64) -> usize {
    if is_wide(header) {
        8
    } else {
        4
    }
}

pub fn write_field_header(out: &mut OfpWriter, header: u64) {
    if is_wide(header) {
        out.write_u64(header);
    } else {
        out.write_u32(header as u32);
    }
}

pub fn read_field_header(input: &mut OfpReader<'_>) -> Result<u64> {
    if input.peek_u16_at(0)? == 0xffff {
        input.read_u64()
    } else {
        Ok(input.read_u32()? as u64)
    }
}

/// NXM_0 field ids (OpenFlow 1.0 compatible fields).
pub mod nxm0 {
    pub const IN_PORT: u8 = 0;
    pub const ETH_DST: u8 = 1;
    pub const ETH_SRC: u8 = 2;
    pub const ETH_TYPE: u8 = 3;
    pub const IP_SRC: u8 = 7;
    pub const IP_DST: u8 = 8;
    pub const TCP_SRC: u8 = 9;
    pub const TCP_DST: u8 = 10;
    pub const UDP_SRC: u8 = 11;
    pub const UDP_DST: u8 = 12;
    pub const ARP_OP: u8 = 15;
    pub const ARP_SPA: u8 = 16;
    pub const ARP_TPA: u8 = 17;

    pub const FIELDS: &[(u8, &str, usize)] = &[
        (IN_PORT, "nxm_of_in_port", 2),
        (ETH_DST, "nxm_of_eth_dst", 6),
        (ETH_SRC, "nxm_of_eth_src", 6),
        (ETH_TYPE, "nxm_of_eth_type", 2),
        (IP_SRC, "nxm_of_ip_src", 4),
        (IP_DST, "nxm_of_ip_dst", 4),
        (TCP_SRC, "nxm_of_tcp_src", 2),
        (TCP_DST, "nxm_of_tcp_dst", 2),
        (UDP_SRC, "nxm_of_udp_src", 2),
        (UDP_DST, "nxm_of_udp_dst", 2),
        (ARP_OP, "nxm_of_arp_op", 2),
        (ARP_SPA, "nxm_of_arp_spa", 4),
        (ARP_TPA, "nxm_of_arp_tpa", 4),
    ];
}

/// NXM_1 field ids (Nicira extension fields).
pub mod nxm1 {
    pub const REG0: u8 = 0;
    pub const REG1: u8 = 1;
    pub const REG2: u8 = 2;
    pub const REG3: u8 = 3;
    pub const REG4: u8 = 4;
    pub const REG5: u8 = 5;
    pub const REG6: u8 = 6;
    pub const REG7: u8 = 7;
    pub const TUN_ID: u8 = 16;
    pub const ARP_SHA: u8 = 17;
    pub const ARP_THA: u8 = 18;
    pub const IPV6_SRC: u8 = 19;
    pub const IPV6_DST: u8 = 20;
    pub const TUN_IPV4_SRC: u8 = 31;
    pub const TUN_IPV4_DST: u8 = 32;
    pub const PKT_MARK: u8 = 33;
    pub const CT_STATE: u8 = 105;
    pub const CT_ZONE: u8 = 106;
    pub const CT_MARK: u8 = 107;
    pub const CT_TP_SRC: u8 = 124;
    pub const CT_TP_DST: u8 = 125;

    /// Field id of register `n`, for `n` in 0..8.
    pub const fn reg(n: u8) -> u8 {
        REG0 + n
    }

    pub const FIELDS: &[(u8, &str, usize)] = &[
        (REG0, "nxm_nx_reg0", 4),
        (REG1, "nxm_nx_reg1", 4),
        (REG2, "nxm_nx_reg2", 4),
        (REG3, "nxm_nx_reg3", 4),
        (REG4, "nxm_nx_reg4", 4),
        (REG5, "nxm_nx_reg5", 4),
        (REG6, "nxm_nx_reg6", 4),
        (REG7, "nxm_nx_reg7", 4),
        (TUN_ID, "nxm_nx_tun_id", 8),
        (ARP_SHA, "nxm_nx_arp_sha", 6),
        (ARP_THA, "nxm_nx_arp_tha", 6),
        (IPV6_SRC, "nxm_nx_ipv6_src", 16),
        (IPV6_DST, "nxm_nx_ipv6_dst", 16),
        (TUN_IPV4_SRC, "nxm_nx_tun_ipv4_src", 4),
        (TUN_IPV4_DST, "nxm_nx_tun_ipv4_dst", 4),
        (PKT_MARK, "nxm_nx_pkt_mark", 4),
        (CT_STATE, "nxm_nx_ct_state", 4),
        (CT_ZONE, "nxm_nx_ct_zone", 2),
        (CT_MARK, "nxm_nx_ct_mark", 4),
        (CT_TP_SRC, "nxm_nx_ct_tp_src", 2),
        (CT_TP_DST, "nxm_nx_ct_tp_dst", 2),
    ];
}

/// NSH fields, carried in the experimenter OXM class under the NSH experimenter id.
pub mod nsh {
    pub const FLAGS: u8 = 1;
    pub const MDTYPE: u8 = 2;
    pub const NP: u8 = 3;
    pub const SPI: u8 = 4;
    pub const SI: u8 = 5;
    pub const C1: u8 = 6;
    pub const C2: u8 = 7;
    pub const C3: u8 = 8;
    pub const C4: u8 = 9;
    pub const TTL: u8 = 10;

    pub const FIELDS: &[(u8, &str, usize)] = &[
        (FLAGS, "nsh_flags", 1),
        (MDTYPE, "nsh_mdtype", 1),
        (NP, "nsh_np", 1),
        (SPI, "nsh_spi", 4),
        (SI, "nsh_si", 1),
        (C1, "nsh_c1", 4),
        (C2, "nsh_c2", 4),
        (C3, "nsh_c3", 4),
        (C4, "nsh_c4", 4),
        (TTL, "nsh_ttl", 1),
    ];
}

pub const NXM_OF_IN_PORT: u32 = nxm_header(0x0000, nxm0::IN_PORT, false, 2);
pub const NXM_OF_ETH_DST: u32 = nxm_header(0x0000, nxm0::ETH_DST, false, 6);
pub const NXM_OF_ETH_SRC: u32 = nxm_header(0x0000, nxm0::ETH_SRC, false, 6);
pub const NXM_OF_IP_SRC: u32 = nxm_header(0x0000, nxm0::IP_SRC, false, 4);
pub const NXM_OF_IP_DST: u32 = nxm_header(0x0000, nxm0::IP_DST, false, 4);
pub const NXM_NX_REG0: u32 = nxm_header(0x0001, nxm1::REG0, false, 4);
pub const NXM_NX_TUN_ID: u32 = nxm_header(0x0001, nxm1::TUN_ID, false, 8);
pub const NXM_NX_CT_ZONE: u32 = nxm_header(0x0001, nxm1::CT_ZONE, false, 2);
pub const NXM_NX_CT_MARK: u32 = nxm_header(0x0001, nxm1::CT_MARK, false, 4);

/// Header of register `n` in the NXM_1 class.
pub const fn nxm_nx_reg(n: u8) -> u32 {
    nxm_header(0x0001, nxm1::reg(n), false, 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nicira::NSH_VENDOR_ID;

    #[test]
    fn well_known_headers() {
        assert_eq!(NXM_NX_REG0, 0x0001_0004);
        assert_eq!(nxm_nx_reg(3), 0x0001_0604);
        assert_eq!(NXM_OF_ETH_DST, 0x0000_0206);
        assert_eq!(NXM_OF_IN_PORT, 0x0000_0002);
        assert_eq!(NXM_NX_TUN_ID, 0x0001_2008);
    }

    #[test]
    fn narrow_header_round_trip() {
        let mut out = OfpWriter::new();
        write_field_header(&mut out, NXM_NX_REG0 as u64);
        assert_eq!(out.as_slice(), &[0, 1, 0, 4]);
        let bytes = out.into_bytes();
        let mut r = OfpReader::new(&bytes);
        assert_eq!(read_field_header(&mut r).unwrap(), 0x0001_0004);
        assert!(r.is_empty());
    }

    #[test]
    fn experimenter_header_is_wide() {
        let spi = experimenter_header(nsh::SPI, 4, NSH_VENDOR_ID);
        assert_eq!(spi, 0xffff_0808_005a_d650);
        assert_eq!(field_header_len(spi), 8);
        let mut out = OfpWriter::new();
        write_field_header(&mut out, spi);
        assert_eq!(out.as_slice(), &[0xff, 0xff, 0x08, 0x08, 0x00, 0x5a, 0xd6, 0x50]);
        let bytes = out.into_bytes();
        assert_eq!(read_field_header(&mut OfpReader::new(&bytes)).unwrap(), spi);
    }
}
