//! The Nicira vendor extension set: `NXAST_*` actions, NXM_0/NXM_1 match
//! fields and the NSH experimenter fields.
//!
//! Everything here is installed through `NiciraExtensions`, the same way any
//! other vendor would plug into the codec registry.

pub mod action;
pub mod conntrack;
pub mod learn;
pub mod nxm;

pub use self::action::{NiciraActionCodec, NxAction, NxMultipath, NxRegLoad, NxRegMove, NxResubmit};
pub use self::conntrack::{CtFlags, CtZone, NatFlags, NxConntrack, NxNat};
pub use self::learn::{FlowModSpec, NxLearn};

use tracing::debug;

use crate::error::Result;
use crate::experimenter::EXPERIMENTER_MARKER;
use crate::openflow0x04::oxm::{register_fields, OFPXMC_EXPERIMENTER, OFPXMC_NXM_0, OFPXMC_NXM_1};
use crate::openflow0x04::OFP_VERSION;
use crate::registry::{CodecKey, CodecRegistryBuilder, ExtensionProvider, Scope};

/// Nicira's experimenter id.
pub const NX_VENDOR_ID: u32 = 0x0000_2320;
/// Experimenter id of the NSH match fields.
pub const NSH_VENDOR_ID: u32 = 0x005a_d650;

pub const NXAST_RESUBMIT: u16 = 1;
pub const NXAST_REG_MOVE: u16 = 6;
pub const NXAST_REG_LOAD: u16 = 7;
pub const NXAST_MULTIPATH: u16 = 10;
pub const NXAST_RESUBMIT_TABLE: u16 = 14;
pub const NXAST_OUTPUT_REG: u16 = 15;
pub const NXAST_LEARN: u16 = 16;
pub const NXAST_FIN_TIMEOUT: u16 = 19;
pub const NXAST_OUTPUT_REG2: u16 = 32;
pub const NXAST_REG_LOAD2: u16 = 33;
pub const NXAST_CT: u16 = 35;
pub const NXAST_NAT: u16 = 36;
pub const NXAST_CT_CLEAR: u16 = 43;
pub const NXAST_RAW_ENCAP: u16 = 46;
pub const NXAST_RAW_DECAP: u16 = 47;
pub const NXAST_DEC_NSH_TTL: u16 = 48;

/// Every action subtype with a codec.
pub const SUBTYPES: [u16; 16] = [
    NXAST_RESUBMIT,
    NXAST_REG_MOVE,
    NXAST_REG_LOAD,
    NXAST_MULTIPATH,
    NXAST_RESUBMIT_TABLE,
    NXAST_OUTPUT_REG,
    NXAST_LEARN,
    NXAST_FIN_TIMEOUT,
    NXAST_OUTPUT_REG2,
    NXAST_REG_LOAD2,
    NXAST_CT,
    NXAST_NAT,
    NXAST_CT_CLEAR,
    NXAST_RAW_ENCAP,
    NXAST_RAW_DECAP,
    NXAST_DEC_NSH_TTL,
];

/// Key of the action codec for `subtype`.
pub fn action_key(subtype: u16) -> CodecKey {
    CodecKey::vendor(
        OFP_VERSION,
        Scope::Action(EXPERIMENTER_MARKER),
        NX_VENDOR_ID,
        Some(subtype as u32),
    )
}

/// Installs the Nicira actions and match fields.
pub struct NiciraExtensions;

impl ExtensionProvider for NiciraExtensions {
    fn name(&self) -> &'static str {
        "nicira"
    }

    fn register(&self, builder: &mut CodecRegistryBuilder) -> Result<()> {
        for &subtype in SUBTYPES.iter() {
            builder.actions().register(action_key(subtype), NiciraActionCodec::new(subtype))?;
        }
        let fields = builder.match_entries();
        register_fields(fields, OFPXMC_NXM_0, None, nxm::nxm0::FIELDS)?;
        register_fields(fields, OFPXMC_NXM_1, None, nxm::nxm1::FIELDS)?;
        register_fields(fields, OFPXMC_EXPERIMENTER, Some(NSH_VENDOR_ID), nxm::nsh::FIELDS)?;
        debug!(
            actions = SUBTYPES.len(),
            fields = nxm::nxm0::FIELDS.len() + nxm::nxm1::FIELDS.len() + nxm::nsh::FIELDS.len(),
            "nicira codecs registered"
        );
        Ok(())
    }
}
