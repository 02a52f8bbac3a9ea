//! Codec registry.
//!
//! Every action, instruction, match field, multipart reply body and table
//! feature property is encoded and decoded by a codec looked up under a
//! `CodecKey`. Core codecs and vendor extensions are installed the same way,
//! through an `ExtensionProvider`, into a `CodecRegistryBuilder` that is then
//! frozen into an immutable `CodecRegistry`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::buffer::{OfpReader, OfpWriter};
use crate::error::{CodecError, Result};
use crate::openflow0x04::action::Action;
use crate::openflow0x04::instruction::Instruction;
use crate::openflow0x04::multipart::MultipartReplyBody;
use crate::openflow0x04::oxm::MatchEntry;
use crate::openflow0x04::table_features::TableFeatureProperty;

/// The dispatch space a codec lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Message(u8),
    Action(u16),
    Instruction(u16),
    MatchField { class: u16, field: u8 },
    Multipart(u16),
    TableFeatureProp(u16),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Scope::Message(t) => write!(f, "message {}", t),
            Scope::Action(t) => write!(f, "action {:#06x}", t),
            Scope::Instruction(t) => write!(f, "instruction {:#06x}", t),
            Scope::MatchField { class, field } => write!(f, "oxm {:#06x}:{}", class, field),
            Scope::Multipart(t) => write!(f, "multipart {:#06x}", t),
            Scope::TableFeatureProp(t) => write!(f, "table feature property {:#06x}", t),
        }
    }
}

/// Identity of one codec: protocol version, dispatch scope, and for
/// experimenter-scoped structures the vendor id and vendor subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodecKey {
    pub version: u8,
    pub scope: Scope,
    pub vendor_id: Option<u32>,
    pub subtype: Option<u32>,
}

impl CodecKey {
    /// Key of a codec from the closed core catalog.
    pub fn core(version: u8, scope: Scope) -> CodecKey {
        CodecKey {
            version,
            scope,
            vendor_id: None,
            subtype: None,
        }
    }

    /// Key of a vendor codec. `subtype` is `None` for structures that carry
    /// only a vendor id.
    pub fn vendor(version: u8, scope: Scope, vendor_id: u32, subtype: Option<u32>) -> CodecKey {
        CodecKey {
            version,
            scope,
            vendor_id: Some(vendor_id),
            subtype,
        }
    }

    pub fn is_vendor(&self) -> bool {
        self.vendor_id.is_some()
    }

    /// The error reported when a mandatory lookup for this key misses.
    pub fn miss_error(&self) -> CodecError {
        if self.is_vendor() {
            return CodecError::UnknownExtension { key: *self };
        }
        match self.scope {
            Scope::Action(type_code) => CodecError::UnknownActionType {
                version: self.version,
                type_code,
            },
            Scope::MatchField { class, field } => CodecError::UnknownMatchField { class, field },
            Scope::Message(t) => CodecError::UnknownMessageType {
                version: self.version,
                type_code: t as u16,
            },
            Scope::Instruction(t) | Scope::Multipart(t) | Scope::TableFeatureProp(t) => {
                CodecError::UnknownMessageType {
                    version: self.version,
                    type_code: t,
                }
            }
        }
    }
}

impl fmt::Display for CodecKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:#04x} {}", self.version, self.scope)?;
        if let Some(vendor) = self.vendor_id {
            write!(f, " vendor {:#010x}", vendor)?;
        }
        if let Some(subtype) = self.subtype {
            write!(f, " subtype {}", subtype)?;
        }
        Ok(())
    }
}

/// Writes one `T`, header included, to the end of `out`.
pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, item: &T, out: &mut OfpWriter, registry: &CodecRegistry) -> Result<()>;
}

/// Reads one `T` from `input`. The reader is already bounded to the structure
/// when its length is self-described.
pub trait Deserializer<T>: Send + Sync {
    fn deserialize(&self, input: &mut OfpReader<'_>, registry: &CodecRegistry) -> Result<T>;
}

/// Serializer and deserializer tables for one object kind.
pub struct CodecTable<T> {
    serializers: HashMap<CodecKey, Arc<dyn Serializer<T>>>,
    deserializers: HashMap<CodecKey, Arc<dyn Deserializer<T>>>,
}

impl<T> Default for CodecTable<T> {
    fn default() -> Self {
        CodecTable {
            serializers: HashMap::new(),
            deserializers: HashMap::new(),
        }
    }
}

impl<T> Clone for CodecTable<T> {
    fn clone(&self) -> Self {
        CodecTable {
            serializers: self.serializers.clone(),
            deserializers: self.deserializers.clone(),
        }
    }
}

impl<T: 'static> CodecTable<T> {
    pub fn register_serializer(&mut self, key: CodecKey, codec: Arc<dyn Serializer<T>>) -> Result<()> {
        if self.serializers.contains_key(&key) {
            return Err(CodecError::DuplicateKey { key });
        }
        trace!(%key, "registered serializer");
        self.serializers.insert(key, codec);
        Ok(())
    }

    pub fn register_deserializer(&mut self, key: CodecKey, codec: Arc<dyn Deserializer<T>>) -> Result<()> {
        if self.deserializers.contains_key(&key) {
            return Err(CodecError::DuplicateKey { key });
        }
        trace!(%key, "registered deserializer");
        self.deserializers.insert(key, codec);
        Ok(())
    }

    /// Register `codec` for both directions. Nothing is inserted unless both
    /// slots are free.
    pub fn register<C>(&mut self, key: CodecKey, codec: C) -> Result<()>
    where
        C: Serializer<T> + Deserializer<T> + 'static,
    {
        if self.serializers.contains_key(&key) || self.deserializers.contains_key(&key) {
            return Err(CodecError::DuplicateKey { key });
        }
        let codec = Arc::new(codec);
        self.register_serializer(key, codec.clone())?;
        self.register_deserializer(key, codec)
    }

    /// Optional lookup; absence means "no codec installed for this key".
    pub fn serializer(&self, key: &CodecKey) -> Option<&dyn Serializer<T>> {
        self.serializers.get(key).map(|c| c.as_ref())
    }

    /// Optional lookup; absence means "no codec installed for this key".
    pub fn deserializer(&self, key: &CodecKey) -> Option<&dyn Deserializer<T>> {
        self.deserializers.get(key).map(|c| c.as_ref())
    }

    /// Mandatory lookup for dispatch that must succeed.
    pub fn serializer_or_fail(&self, key: &CodecKey) -> Result<&dyn Serializer<T>> {
        self.serializer(key).ok_or_else(|| key.miss_error())
    }

    /// Mandatory lookup for dispatch that must succeed.
    pub fn deserializer_or_fail(&self, key: &CodecKey) -> Result<&dyn Deserializer<T>> {
        self.deserializer(key).ok_or_else(|| key.miss_error())
    }

    pub fn contains(&self, key: &CodecKey) -> bool {
        self.serializers.contains_key(key) || self.deserializers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.serializers.len().max(self.deserializers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty() && self.deserializers.is_empty()
    }
}

/// Something that installs codecs: the core catalog, or a vendor extension set.
pub trait ExtensionProvider {
    fn name(&self) -> &'static str;
    fn register(&self, builder: &mut CodecRegistryBuilder) -> Result<()>;
}

/// Mutable registration phase of a `CodecRegistry`.
#[derive(Clone)]
pub struct CodecRegistryBuilder {
    actions: CodecTable<Action>,
    instructions: CodecTable<Instruction>,
    match_entries: CodecTable<MatchEntry>,
    multipart_replies: CodecTable<MultipartReplyBody>,
    table_properties: CodecTable<TableFeatureProperty>,
    skip_unknown_extensions: bool,
}

impl Default for CodecRegistryBuilder {
    fn default() -> Self {
        CodecRegistryBuilder {
            actions: CodecTable::default(),
            instructions: CodecTable::default(),
            match_entries: CodecTable::default(),
            multipart_replies: CodecTable::default(),
            table_properties: CodecTable::default(),
            skip_unknown_extensions: true,
        }
    }
}

impl CodecRegistryBuilder {
    pub fn new() -> CodecRegistryBuilder {
        CodecRegistryBuilder::default()
    }

    /// Start from the tables of an existing registry.
    pub fn from_registry(registry: &CodecRegistry) -> CodecRegistryBuilder {
        CodecRegistryBuilder {
            actions: registry.actions.clone(),
            instructions: registry.instructions.clone(),
            match_entries: registry.match_entries.clone(),
            multipart_replies: registry.multipart_replies.clone(),
            table_properties: registry.table_properties.clone(),
            skip_unknown_extensions: registry.skip_unknown_extensions,
        }
    }

    /// When false, a vendor structure with no registered codec fails the decode
    /// instead of being skipped.
    pub fn skip_unknown_extensions(mut self, skip: bool) -> CodecRegistryBuilder {
        self.skip_unknown_extensions = skip;
        self
    }

    pub fn install(&mut self, provider: &dyn ExtensionProvider) -> Result<()> {
        debug!(provider = provider.name(), "installing codecs");
        provider.register(self)
    }

    pub fn with_provider(mut self, provider: &dyn ExtensionProvider) -> Result<CodecRegistryBuilder> {
        self.install(provider)?;
        Ok(self)
    }

    pub fn actions(&mut self) -> &mut CodecTable<Action> {
        &mut self.actions
    }

    pub fn instructions(&mut self) -> &mut CodecTable<Instruction> {
        &mut self.instructions
    }

    pub fn match_entries(&mut self) -> &mut CodecTable<MatchEntry> {
        &mut self.match_entries
    }

    pub fn multipart_replies(&mut self) -> &mut CodecTable<MultipartReplyBody> {
        &mut self.multipart_replies
    }

    pub fn table_properties(&mut self) -> &mut CodecTable<TableFeatureProperty> {
        &mut self.table_properties
    }

    pub fn build(self) -> CodecRegistry {
        CodecRegistry {
            actions: self.actions,
            instructions: self.instructions,
            match_entries: self.match_entries,
            multipart_replies: self.multipart_replies,
            table_properties: self.table_properties,
            skip_unknown_extensions: self.skip_unknown_extensions,
        }
    }
}

/// Frozen codec tables, shared read-only by every encode and decode call.
pub struct CodecRegistry {
    actions: CodecTable<Action>,
    instructions: CodecTable<Instruction>,
    match_entries: CodecTable<MatchEntry>,
    multipart_replies: CodecTable<MultipartReplyBody>,
    table_properties: CodecTable<TableFeatureProperty>,
    skip_unknown_extensions: bool,
}

impl CodecRegistry {
    /// The OpenFlow 1.3 core catalog plus the Nicira extension set.
    pub fn openflow13() -> Result<CodecRegistry> {
        Ok(CodecRegistryBuilder::new()
            .with_provider(&crate::openflow0x04::Openflow13Codecs)?
            .with_provider(&crate::nicira::NiciraExtensions)?
            .build())
    }

    pub fn actions(&self) -> &CodecTable<Action> {
        &self.actions
    }

    pub fn instructions(&self) -> &CodecTable<Instruction> {
        &self.instructions
    }

    pub fn match_entries(&self) -> &CodecTable<MatchEntry> {
        &self.match_entries
    }

    pub fn multipart_replies(&self) -> &CodecTable<MultipartReplyBody> {
        &self.multipart_replies
    }

    pub fn table_properties(&self) -> &CodecTable<TableFeatureProperty> {
        &self.table_properties
    }

    /// Apply the unknown-extension policy to a vendor structure of `len` bytes
    /// at `offset` that has no codec. `Ok` means the caller skips it.
    pub fn unknown_extension(&self, key: &CodecKey, len: usize, offset: usize) -> Result<()> {
        if self.skip_unknown_extensions {
            debug!(%key, len, offset, "skipping unhandled extension");
            Ok(())
        } else {
            Err(CodecError::UnknownExtension { key: *key })
        }
    }
}

/// A registry that can gain extensions after startup.
///
/// Readers take a snapshot `Arc`; `extend` builds a complete new registry and
/// swaps it in, so a snapshot never observes a partial update.
pub struct SharedRegistry {
    current: RwLock<Arc<CodecRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: CodecRegistry) -> SharedRegistry {
        SharedRegistry {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn snapshot(&self) -> Arc<CodecRegistry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `provider` on top of the current registry. On error the current
    /// registry is left untouched.
    pub fn extend(&self, provider: &dyn ExtensionProvider) -> Result<()> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut builder = CodecRegistryBuilder::from_registry(&guard);
        builder.install(provider)?;
        *guard = Arc::new(builder.build());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow0x04::action::{Action, ExperimenterAction, ExperimenterPayload, OpaqueActionCodec};
    use crate::openflow0x04::{Openflow13Codecs, OFP_VERSION};
    use crate::nicira::{NiciraExtensions, NX_VENDOR_ID};

    struct Acme;

    const ACME_ID: u32 = 0x00ac_0e00;

    impl ExtensionProvider for Acme {
        fn name(&self) -> &'static str {
            "acme"
        }

        fn register(&self, builder: &mut CodecRegistryBuilder) -> Result<()> {
            let key = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), ACME_ID, Some(1));
            builder.actions().register(key, OpaqueActionCodec)
        }
    }

    #[test]
    fn core_and_vendor_keys_are_distinct() {
        let core = CodecKey::core(OFP_VERSION, Scope::Action(0xffff));
        let vendor = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), NX_VENDOR_ID, Some(1));
        assert_ne!(core, vendor);
        let mut table: CodecTable<Action> = CodecTable::default();
        table.register(core, OpaqueActionCodec).unwrap();
        table.register(vendor, OpaqueActionCodec).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let key = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), ACME_ID, Some(7));
        let mut table: CodecTable<Action> = CodecTable::default();
        table.register(key, OpaqueActionCodec).unwrap();
        assert_eq!(
            table.register(key, OpaqueActionCodec),
            Err(CodecError::DuplicateKey { key })
        );
    }

    #[test]
    fn disjoint_providers_register_cleanly() {
        let registry = CodecRegistryBuilder::new()
            .with_provider(&Openflow13Codecs)
            .and_then(|b| b.with_provider(&NiciraExtensions))
            .and_then(|b| b.with_provider(&Acme))
            .map(|b| b.build());
        assert!(registry.is_ok());
    }

    #[test]
    fn installing_a_provider_twice_fails() {
        let builder = CodecRegistryBuilder::new().with_provider(&NiciraExtensions).unwrap();
        match builder.with_provider(&NiciraExtensions) {
            Err(CodecError::DuplicateKey { key }) => assert_eq!(key.vendor_id, Some(NX_VENDOR_ID)),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("second install must fail"),
        }
    }

    #[test]
    fn lookup_distinguishes_absence_from_failure() {
        let registry = CodecRegistry::openflow13().unwrap();
        let unknown = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), ACME_ID, Some(1));
        assert!(registry.actions().deserializer(&unknown).is_none());
        assert!(matches!(
            registry.actions().deserializer_or_fail(&unknown),
            Err(CodecError::UnknownExtension { .. })
        ));
        let bad_core = CodecKey::core(OFP_VERSION, Scope::Action(0x0042));
        assert!(matches!(
            registry.actions().deserializer_or_fail(&bad_core),
            Err(CodecError::UnknownActionType { type_code: 0x42, .. })
        ));
        let bad_multipart = CodecKey::core(OFP_VERSION, Scope::Multipart(99));
        assert!(matches!(
            registry.multipart_replies().deserializer_or_fail(&bad_multipart),
            Err(CodecError::UnknownMessageType { type_code: 99, .. })
        ));
    }

    #[test]
    fn shared_registry_swaps_whole_snapshots() {
        let shared = SharedRegistry::new(CodecRegistry::openflow13().unwrap());
        let before = shared.snapshot();
        shared.extend(&Acme).unwrap();
        let after = shared.snapshot();
        let key = CodecKey::vendor(OFP_VERSION, Scope::Action(0xffff), ACME_ID, Some(1));
        assert!(before.actions().deserializer(&key).is_none());
        assert!(after.actions().deserializer(&key).is_some());
        // a failed extension leaves the current registry in place
        assert!(shared.extend(&Acme).is_err());
        assert!(shared.snapshot().actions().deserializer(&key).is_some());
    }

    #[test]
    fn opaque_codec_round_trips_vendor_payload() {
        let mut builder = CodecRegistryBuilder::new();
        builder.install(&Acme).unwrap();
        let registry = builder.build();
        let action = Action::Experimenter(ExperimenterAction {
            experimenter: ACME_ID,
            subtype: 1,
            payload: ExperimenterPayload::Opaque(vec![1, 2, 3, 4, 5, 6]),
        });
        let mut out = OfpWriter::new();
        crate::openflow0x04::action::encode_action(&action, &mut out, &registry).unwrap();
        assert_eq!(out.len(), 16);
        let bytes = out.into_bytes();
        let decoded = crate::openflow0x04::action::decode_actions(&mut OfpReader::new(&bytes), &registry).unwrap();
        assert_eq!(decoded, vec![action]);
    }
}
