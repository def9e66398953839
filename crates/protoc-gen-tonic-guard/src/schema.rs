//! The embedded descriptor schema.
//!
//! `build.rs` compiles the guard annotations together with the protoc
//! plugin protocol (and their imports) into a descriptor set; decoding it
//! with prost-reflect yields a pool that can both parse incoming
//! `CodeGeneratorRequest` bytes and resolve the rule extensions attached to
//! service and method options. Going through `prost-types` instead would
//! silently drop the extension payloads.

use once_cell::sync::OnceCell;
use prost_reflect::{DescriptorPool, ExtensionDescriptor, MessageDescriptor};

use crate::errors::PluginError;

const DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/guard_descriptor.bin"));

pub const REQUEST_MESSAGE: &str = "google.protobuf.compiler.CodeGeneratorRequest";
pub const FILE_SET_MESSAGE: &str = "google.protobuf.FileDescriptorSet";
pub const RULE_MESSAGE: &str = "guard.v1.Rule";
pub const AUTHENTICATED_ACCESS_MESSAGE: &str = "guard.v1.AuthenticatedAccess";
pub const ROLE_BASED_MESSAGE: &str = "guard.v1.RoleBased";
pub const POLICY_BASED_MESSAGE: &str = "guard.v1.PolicyBased";
pub const SERVICE_RULES_EXTENSION: &str = "guard.v1.service_rules";
pub const METHOD_RULES_EXTENSION: &str = "guard.v1.method_rules";

static POOL: OnceCell<DescriptorPool> = OnceCell::new();

pub fn pool() -> Result<&'static DescriptorPool, PluginError> {
    POOL.get_or_try_init(|| {
        DescriptorPool::decode(DESCRIPTOR_SET).map_err(|err| PluginError::Schema(err.to_string()))
    })
}

pub fn message(name: &str) -> Result<MessageDescriptor, PluginError> {
    pool()?
        .get_message_by_name(name)
        .ok_or_else(|| PluginError::Schema(format!("message {name} missing from embedded schema")))
}

pub fn extension(name: &str) -> Result<ExtensionDescriptor, PluginError> {
    pool()?.get_extension_by_name(name).ok_or_else(|| {
        PluginError::Schema(format!("extension {name} missing from embedded schema"))
    })
}
