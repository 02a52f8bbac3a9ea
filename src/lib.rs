#![crate_name = "ofp_codec"]
#![crate_type = "lib"]

//! OpenFlow 1.3 wire codec.
//!
//! Messages are encoded and decoded through a `CodecRegistry` that maps each
//! action, instruction, match field, multipart body and table feature property
//! to its codec. The core protocol and the Nicira extensions are both plugged
//! in as `ExtensionProvider`s; other vendors are added the same way.

mod bits;
pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod experimenter;
pub mod nicira;
pub mod ofp_header;
pub mod ofp_message;
pub mod openflow0x04;
pub mod registry;

pub use crate::codec::OfpCodec;
pub use crate::config::CodecConfig;
pub use crate::error::{CodecError, Result};
pub use crate::openflow0x04::message::Message;
pub use crate::registry::{CodecKey, CodecRegistry, CodecRegistryBuilder, ExtensionProvider, Scope, SharedRegistry};
