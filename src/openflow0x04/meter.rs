//! Meter statistics, configuration and features.

use crate::bits::{bit, test_bit};
use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};

use super::stats::parse_fixed;

/// Meter id meaning "all meters".
pub const OFPM_ALL: u32 = 0xffff_ffff;

const OFPMBT_DROP: u16 = 1;
const OFPMBT_DSCP_REMARK: u16 = 2;
const OFPMBT_EXPERIMENTER: u16 = 0xffff;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterFlags {
    pub kbps: bool,
    pub pktps: bool,
    pub burst: bool,
    pub stats: bool,
}

impl MeterFlags {
    pub fn of_int(d: u32) -> MeterFlags {
        let d = d as u64;
        MeterFlags {
            kbps: test_bit(0, d),
            pktps: test_bit(1, d),
            burst: test_bit(2, d),
            stats: test_bit(3, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(0, d, self.kbps);
        d = bit(1, d, self.pktps);
        d = bit(2, d, self.burst);
        d = bit(3, d, self.stats);
        d as u32
    }
}

/// Counters of one meter band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterBandStats {
    pub packet_band_count: u64,
    pub byte_band_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterStats {
    pub meter_id: u32,
    pub flow_count: u32,
    pub packet_in_count: u64,
    pub byte_in_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub band_stats: Vec<MeterBandStats>,
}

impl MeterStats {
    pub const FIXED_LEN: usize = 40;

    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<MeterStats> {
        let meter_id = bytes.read_u32()?;
        bytes.skip(2)?;
        bytes.skip_padding(6)?;
        let flow_count = bytes.read_u32()?;
        let packet_in_count = bytes.read_u64()?;
        let byte_in_count = bytes.read_u64()?;
        let duration_sec = bytes.read_u32()?;
        let duration_nsec = bytes.read_u32()?;
        let band_stats = parse_fixed(bytes, |b| {
            Ok(MeterBandStats {
                packet_band_count: b.read_u64()?,
                byte_band_count: b.read_u64()?,
            })
        })?;
        Ok(MeterStats {
            meter_id,
            flow_count,
            packet_in_count,
            byte_in_count,
            duration_sec,
            duration_nsec,
            band_stats,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        let start = bytes.len();
        bytes.write_u32(self.meter_id);
        let len_pos = bytes.reserve_u16();
        bytes.write_zero(6);
        bytes.write_u32(self.flow_count);
        bytes.write_u64(self.packet_in_count);
        bytes.write_u64(self.byte_in_count);
        bytes.write_u32(self.duration_sec);
        bytes.write_u32(self.duration_nsec);
        for band in &self.band_stats {
            bytes.write_u64(band.packet_band_count);
            bytes.write_u64(band.byte_band_count);
        }
        bytes.backfill_len("meter stats", len_pos, start)?;
        Ok(())
    }
}

/// One band of a meter. Rates are in kb/s or packets/s depending on the meter flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterBand {
    Drop {
        rate: u32,
        burst_size: u32,
    },
    DscpRemark {
        rate: u32,
        burst_size: u32,
        prec_level: u8,
    },
    /// Carried as raw bytes; experimenter bands are not dispatched through the registry.
    Experimenter {
        rate: u32,
        burst_size: u32,
        experimenter: u32,
        data: Vec<u8>,
    },
}

impl MeterBand {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<MeterBand> {
        let typ = bytes.read_u16()?;
        let len = bytes.read_u16()? as usize;
        if len < 16 {
            return Err(CodecError::LengthMismatch {
                structure: "meter band",
                declared: len,
                actual: 16,
            });
        }
        let mut band = bytes.sub_reader(len - 4)?;
        let rate = band.read_u32()?;
        let burst_size = band.read_u32()?;
        let parsed = match typ {
            OFPMBT_DROP => {
                band.skip_padding(4)?;
                MeterBand::Drop { rate, burst_size }
            }
            OFPMBT_DSCP_REMARK => {
                let prec_level = band.read_u8()?;
                band.skip_padding(3)?;
                MeterBand::DscpRemark {
                    rate,
                    burst_size,
                    prec_level,
                }
            }
            OFPMBT_EXPERIMENTER => {
                let experimenter = band.read_u32()?;
                let left = band.remaining();
                MeterBand::Experimenter {
                    rate,
                    burst_size,
                    experimenter,
                    data: band.read_bytes(left)?.to_vec(),
                }
            }
            t => {
                return Err(CodecError::InvalidValue {
                    structure: "meter band type",
                    value: t as u64,
                })
            }
        };
        band.finish("meter band")?;
        Ok(parsed)
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        let start = bytes.len();
        match *self {
            MeterBand::Drop { rate, burst_size } => {
                bytes.write_u16(OFPMBT_DROP);
                bytes.write_u16(16);
                bytes.write_u32(rate);
                bytes.write_u32(burst_size);
                bytes.write_zero(4);
            }
            MeterBand::DscpRemark {
                rate,
                burst_size,
                prec_level,
            } => {
                bytes.write_u16(OFPMBT_DSCP_REMARK);
                bytes.write_u16(16);
                bytes.write_u32(rate);
                bytes.write_u32(burst_size);
                bytes.write_u8(prec_level);
                bytes.write_zero(3);
            }
            MeterBand::Experimenter {
                rate,
                burst_size,
                experimenter,
                ref data,
            } => {
                bytes.write_u16(OFPMBT_EXPERIMENTER);
                let len_pos = bytes.reserve_u16();
                bytes.write_u32(rate);
                bytes.write_u32(burst_size);
                bytes.write_u32(experimenter);
                bytes.write_bytes(data);
                bytes.backfill_len("meter band", len_pos, start)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterConfig {
    pub flags: MeterFlags,
    pub meter_id: u32,
    pub bands: Vec<MeterBand>,
}

impl MeterConfig {
    pub const FIXED_LEN: usize = 8;

    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<MeterConfig> {
        bytes.skip(2)?;
        let flags = MeterFlags::of_int(bytes.read_u16()? as u32);
        let meter_id = bytes.read_u32()?;
        let bands = parse_fixed(bytes, |b| MeterBand::parse(b))?;
        Ok(MeterConfig { flags, meter_id, bands })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) -> Result<()> {
        let start = bytes.len();
        let len_pos = bytes.reserve_u16();
        bytes.write_u16(self.flags.to_int() as u16);
        bytes.write_u32(self.meter_id);
        for band in &self.bands {
            band.marshal(bytes)?;
        }
        bytes.backfill_len("meter config", len_pos, start)?;
        Ok(())
    }
}

/// Band types supported by the datapath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterBandTypes {
    pub drop: bool,
    pub dscp_remark: bool,
}

impl MeterBandTypes {
    pub fn of_int(d: u32) -> MeterBandTypes {
        let d = d as u64;
        MeterBandTypes {
            drop: test_bit(OFPMBT_DROP as u64, d),
            dscp_remark: test_bit(OFPMBT_DSCP_REMARK as u64, d),
        }
    }

    pub fn to_int(&self) -> u32 {
        let mut d = 0;
        d = bit(OFPMBT_DROP as u64, d, self.drop);
        d = bit(OFPMBT_DSCP_REMARK as u64, d, self.dscp_remark);
        d as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterFeatures {
    pub max_meter: u32,
    pub band_types: MeterBandTypes,
    pub capabilities: MeterFlags,
    pub max_bands: u8,
    pub max_color: u8,
}

impl MeterFeatures {
    pub fn parse(bytes: &mut OfpReader<'_>) -> Result<MeterFeatures> {
        let max_meter = bytes.read_u32()?;
        let band_types = MeterBandTypes::of_int(bytes.read_u32()?);
        let capabilities = MeterFlags::of_int(bytes.read_u32()?);
        let max_bands = bytes.read_u8()?;
        let max_color = bytes.read_u8()?;
        bytes.skip_padding(2)?;
        Ok(MeterFeatures {
            max_meter,
            band_types,
            capabilities,
            max_bands,
            max_color,
        })
    }

    pub fn marshal(&self, bytes: &mut OfpWriter) {
        bytes.write_u32(self.max_meter);
        bytes.write_u32(self.band_types.to_int());
        bytes.write_u32(self.capabilities.to_int());
        bytes.write_u8(self.max_bands);
        bytes.write_u8(self.max_color);
        bytes.write_zero(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::stats::parse_records;

    #[test]
    fn meter_config_bands() {
        let config = MeterConfig {
            flags: MeterFlags {
                kbps: true,
                stats: true,
                ..MeterFlags::default()
            },
            meter_id: 1,
            bands: vec![
                MeterBand::Drop {
                    rate: 1000,
                    burst_size: 0,
                },
                MeterBand::DscpRemark {
                    rate: 500,
                    burst_size: 10,
                    prec_level: 1,
                },
                MeterBand::Experimenter {
                    rate: 1,
                    burst_size: 2,
                    experimenter: 0x2320,
                    data: vec![0xde, 0xad, 0xbe, 0xef],
                },
            ],
        };
        let mut out = OfpWriter::new();
        config.marshal(&mut out).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 8 + 16 + 16 + 20);
        assert_eq!(&bytes[..4], &[0, 60, 0, 0x09]);
        let parsed = parse_records(&mut OfpReader::new(&bytes), "meter config", 0, MeterConfig::FIXED_LEN, |r| {
            MeterConfig::parse(r)
        })
        .unwrap();
        assert_eq!(parsed, vec![config]);
    }

    #[test]
    fn meter_stats_length_sits_after_the_id() {
        let stats = MeterStats {
            meter_id: 0x10,
            flow_count: 1,
            packet_in_count: 2,
            byte_in_count: 3,
            duration_sec: 4,
            duration_nsec: 5,
            band_stats: vec![MeterBandStats {
                packet_band_count: 6,
                byte_band_count: 7,
            }],
        };
        let mut out = OfpWriter::new();
        stats.marshal(&mut out).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(&bytes[4..6], &[0, 56]);
        let parsed = parse_records(&mut OfpReader::new(&bytes), "meter stats", 4, MeterStats::FIXED_LEN, |r| {
            MeterStats::parse(r)
        })
        .unwrap();
        assert_eq!(parsed, vec![stats]);
    }

    #[test]
    fn meter_features_band_type_bits() {
        let bytes = [0, 0, 0, 0x40, 0, 0, 0, 0x06, 0, 0, 0, 0x0f, 2, 8, 0, 0];
        let features = MeterFeatures::parse(&mut OfpReader::new(&bytes)).unwrap();
        assert_eq!(features.max_meter, 64);
        assert!(features.band_types.drop && features.band_types.dscp_remark);
        assert!(features.capabilities.burst);
        let mut out = OfpWriter::new();
        features.marshal(&mut out);
        assert_eq!(out.as_slice(), &bytes[..]);
    }

    #[test]
    fn unknown_band_type() {
        let bytes = [0, 3, 0, 16, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0];
        assert!(matches!(
            MeterBand::parse(&mut OfpReader::new(&bytes)),
            Err(CodecError::InvalidValue { value: 3, .. })
        ));
    }
}
