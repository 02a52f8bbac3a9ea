use std::sync::Arc;

use ofp_codec::nicira::nxm::nxm1;
use ofp_codec::nicira::{NiciraExtensions, NxAction, NxRegLoad, NX_VENDOR_ID};
use ofp_codec::openflow0x04::action::{Action, ExperimenterAction, ExperimenterPayload, OpaqueActionCodec};
use ofp_codec::openflow0x04::instruction::{register_experimenter_instructions, Instruction};
use ofp_codec::openflow0x04::message::add_flow;
use ofp_codec::openflow0x04::multipart::{
    register_experimenter_reply, MultipartReply, MultipartReplyBody, OpaqueReplyCodec,
};
use ofp_codec::openflow0x04::oxm::{basic, MatchEntry, Pattern, OFPXMC_NXM_1};
use ofp_codec::openflow0x04::{Openflow13Codecs, OFP_VERSION};
use ofp_codec::{
    CodecConfig, CodecError, CodecKey, CodecRegistry, CodecRegistryBuilder, ExtensionProvider, Message, OfpCodec,
    Result, Scope, SharedRegistry,
};
use tracing_test::traced_test;

const ACME_ID: u32 = 0x00ac_0e00;
const ACME_TAG: u16 = 3;
const ACME_COUNTERS: u32 = 1;

/// A vendor with one opaque action, pass-through instructions and a counters
/// reply.
struct AcmeExtensions;

impl ExtensionProvider for AcmeExtensions {
    fn name(&self) -> &'static str {
        "acme"
    }

    fn register(&self, builder: &mut CodecRegistryBuilder) -> Result<()> {
        let tag = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), ACME_ID, Some(ACME_TAG as u32));
        builder.actions().register(tag, OpaqueActionCodec)?;
        register_experimenter_instructions(builder.instructions(), ACME_ID)?;
        register_experimenter_reply(builder.multipart_replies(), ACME_ID, ACME_COUNTERS, OpaqueReplyCodec)
    }
}

fn acme_tag(value: u8) -> Action {
    Action::Experimenter(ExperimenterAction {
        experimenter: ACME_ID,
        subtype: ACME_TAG,
        payload: ExperimenterPayload::Opaque(vec![value, 0, 0, 0, 0, 0]),
    })
}

fn tagging_flow() -> Message {
    Message::FlowMod(add_flow(
        50,
        Pattern::new().with(MatchEntry::basic(basic::ETH_TYPE, vec![0x86, 0xdd])),
        vec![
            Instruction::ApplyActions(vec![acme_tag(9), Action::Group(4)]),
            Instruction::Experimenter {
                experimenter: ACME_ID,
                data: vec![0xa1; 8],
            },
        ],
    ))
}

fn base_registry() -> CodecRegistry {
    CodecRegistryBuilder::new()
        .with_provider(&Openflow13Codecs)
        .and_then(|b| b.with_provider(&NiciraExtensions))
        .map(|b| b.build())
        .unwrap()
}

#[test]
fn vendor_installed_at_runtime_reaches_new_snapshots() {
    let shared = SharedRegistry::new(base_registry());
    let before = OfpCodec::with_registry(shared.snapshot(), CodecConfig::default()).unwrap();
    match before.encode(1, &tagging_flow()) {
        Err(CodecError::UnknownExtension { key }) => assert_eq!(key.vendor_id, Some(ACME_ID)),
        other => panic!("expected an unknown extension, got {:?}", other),
    }

    shared.extend(&AcmeExtensions).unwrap();
    let after = OfpCodec::with_registry(shared.snapshot(), CodecConfig::default()).unwrap();
    let bytes = after.encode(2, &tagging_flow()).unwrap();
    assert_eq!(after.decode(&bytes).unwrap(), (2, tagging_flow()));

    let counters = Message::MultipartReply(MultipartReply::new(MultipartReplyBody::Experimenter {
        experimenter: ACME_ID,
        exp_type: ACME_COUNTERS,
        data: vec![0, 0, 0, 0, 0, 0, 0x10, 0],
    }));
    let bytes = after.encode(3, &counters).unwrap();
    assert_eq!(after.decode(&bytes).unwrap(), (3, counters));
}

#[test]
#[traced_test]
fn peer_without_the_vendor_skips_its_structures() {
    let shared = SharedRegistry::new(base_registry());
    shared.extend(&AcmeExtensions).unwrap();
    let sender = OfpCodec::with_registry(shared.snapshot(), CodecConfig::default()).unwrap();
    let receiver = OfpCodec::with_registry(Arc::new(base_registry()), CodecConfig::default()).unwrap();

    let bytes = sender.encode(4, &tagging_flow()).unwrap();
    let (xid, msg) = receiver.decode(&bytes).unwrap();
    assert_eq!(xid, 4);
    match msg {
        Message::FlowMod(flow_mod) => {
            assert_eq!(flow_mod.priority, 50);
            assert_eq!(flow_mod.instructions, vec![Instruction::ApplyActions(vec![Action::Group(4)])]);
        }
        other => panic!("expected a flow mod, got {:?}", other),
    }
    assert!(logs_contain("skipping unhandled extension"));
}

#[test]
fn installing_nicira_twice_is_a_duplicate() {
    let shared = SharedRegistry::new(base_registry());
    match shared.extend(&NiciraExtensions) {
        Err(CodecError::DuplicateKey { key }) => assert_eq!(key.vendor_id, Some(NX_VENDOR_ID)),
        other => panic!("expected a duplicate key, got {:?}", other),
    }
    // the snapshot in place still serves Nicira
    let codec = OfpCodec::with_registry(shared.snapshot(), CodecConfig::default()).unwrap();
    let load = Action::from(NxAction::RegLoad(NxRegLoad {
        ofs_nbits: 31,
        dst: ofp_codec::nicira::nxm::NXM_NX_REG0,
        value: 0xbeef,
    }));
    let msg = Message::FlowMod(add_flow(1, Pattern::new(), vec![Instruction::ApplyActions(vec![load])]));
    let bytes = codec.encode(5, &msg).unwrap();
    assert_eq!(codec.decode(&bytes).unwrap(), (5, msg));
}

#[test]
fn flow_mod_mixes_nxm_and_oxm_fields() {
    let codec = OfpCodec::new(CodecConfig::default()).unwrap();
    let pattern = Pattern::new()
        .with(MatchEntry::basic(basic::ETH_TYPE, vec![0x08, 0x00]))
        .with(MatchEntry::masked(
            OFPXMC_NXM_1,
            nxm1::REG3,
            vec![0, 0, 0, 0x10],
            vec![0, 0, 0, 0xf0],
        ))
        .with(MatchEntry::new(OFPXMC_NXM_1, nxm1::TUN_ID, vec![0, 0, 0, 0, 0, 0, 0x01, 0x2c]));
    let msg = Message::FlowMod(add_flow(
        1000,
        pattern,
        vec![Instruction::ApplyActions(vec![Action::from(NxAction::RegLoad2(
            MatchEntry::new(OFPXMC_NXM_1, nxm1::REG0, vec![0, 0, 0, 1]),
        ))])],
    ));
    let bytes = codec.encode(6, &msg).unwrap();
    // ETH_TYPE 6, masked REG3 12, TUN_ID 12 behind the 4-byte match header
    let match_len = u16::from_be_bytes([bytes[50], bytes[51]]);
    assert_eq!(match_len, 4 + 6 + 12 + 12);
    assert_eq!(codec.decode(&bytes).unwrap(), (6, msg));
}
