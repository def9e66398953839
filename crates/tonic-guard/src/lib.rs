//! Declarative access control for tonic servers.
//!
//! Rules are declared on gRPC services and methods in `.proto` files and
//! compiled into companion source by `protoc-gen-tonic-guard`. At runtime a
//! [`Guard`] wraps each generated server, resolves the caller's [`Subject`],
//! evaluates the effective ruleset, and either admits the call or rejects it
//! with `PermissionDenied`. The default behavior is zero trust: if no rule
//! explicitly allows access, the request is denied.

pub mod errors;
mod evaluate;
pub mod events;
pub mod interceptor;
pub mod policy;
pub mod prelude;
mod resolve;
pub mod rules;
pub mod service;
pub mod subject;

pub use errors::{GuardError, GuardResult};
pub use interceptor::Guard;
pub use policy::{Policies, Policy, PolicyFn};
pub use service::{Guarded, GuardedService};
pub use subject::{CallContext, Input, ResolverFn, Subject, SubjectResolver};
