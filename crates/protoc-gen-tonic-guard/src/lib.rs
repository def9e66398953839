//! protoc plugin that generates tonic-guard companion source.
//!
//! For each `.proto` file containing gRPC services annotated with guard
//! rules, the plugin produces a `<package>.guard.rs` file that declares the
//! rule tree as a static [`tonic_guard::rules::Service`] and implements
//! [`tonic_guard::GuardedService`] on the generated tonic server type, so
//! the interceptor can discover the rules at call time.

pub mod errors;
pub mod generator;
pub mod naming;
pub mod render;
pub mod schema;
pub mod translate;

pub use errors::PluginError;
pub use generator::Generator;
