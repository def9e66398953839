//! The authenticated principal and the per-call evaluation input.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use tonic::metadata::MetadataMap;

/// The principal attributed to a request. Carries identity attributes such
/// as roles and arbitrary custom data; everything except `roles` is opaque
/// to the evaluator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subject {
    pub roles: Vec<String>,
    pub attrs: HashMap<String, Value>,
}

/// Read-only snapshot of the intercepted call, visible to subject resolvers
/// and policy functions. The adapter sits beneath tonic's message framing,
/// so the decoded request message is not available here; the method path and
/// request metadata are.
#[derive(Clone, Debug)]
pub struct CallContext {
    /// Full gRPC method path, e.g. `/demo.v1.UserService/GetUser`.
    pub full_method: String,
    pub metadata: MetadataMap,
}

/// Data available during rule evaluation for a single call.
#[derive(Clone, Debug)]
pub struct Input {
    pub request: CallContext,
    /// The resolved subject; `None` for anonymous callers.
    pub subject: Option<Subject>,
}

impl Input {
    /// True if the request is associated with an authenticated subject.
    pub fn authenticated(&self) -> bool {
        self.subject.is_some()
    }
}

/// Extracts a [`Subject`] from the incoming call.
///
/// Returning `Ok(None)` means the caller is anonymous; that is not an error.
/// Any `Err` causes the interceptor to reject the request with an internal
/// status.
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn resolve(&self, request: &CallContext) -> anyhow::Result<Option<Subject>>;
}

/// Adapter for using a plain async function as a [`SubjectResolver`].
pub struct ResolverFn<F>(F);

impl<F> ResolverFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> SubjectResolver for ResolverFn<F>
where
    F: Fn(CallContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Subject>>> + Send,
{
    async fn resolve(&self, request: &CallContext) -> anyhow::Result<Option<Subject>> {
        (self.0)(request.clone()).await
    }
}
