//! Named policy functions referenced by policy-based rules.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::subject::Input;

/// A custom authorization predicate.
///
/// Policies receive the evaluation input and decide whether access is
/// allowed. Any error causes the interceptor to reject the request with an
/// internal status.
#[async_trait]
pub trait Policy: Send + Sync {
    async fn evaluate(&self, input: &Input) -> anyhow::Result<bool>;
}

/// Adapter for using a plain async function as a [`Policy`].
pub struct PolicyFn<F>(F);

impl<F> PolicyFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> Policy for PolicyFn<F>
where
    F: Fn(Input) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send,
{
    async fn evaluate(&self, input: &Input) -> anyhow::Result<bool> {
        (self.0)(input.clone()).await
    }
}

/// Registry of named policies referenced in `.proto` guard rules.
///
/// A name may be declared without an implementation (see
/// [`Policies::declare`]); rules referencing such a name fail evaluation
/// with [`GuardError::InvalidPolicy`](crate::GuardError::InvalidPolicy)
/// instead of silently denying.
#[derive(Clone, Default)]
pub struct Policies {
    entries: HashMap<String, Option<Arc<dyn Policy>>>,
}

impl Policies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a policy under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, policy: impl Policy + 'static) {
        self.entries.insert(name.into(), Some(Arc::new(policy)));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, policy: impl Policy + 'static) -> Self {
        self.insert(name, policy);
        self
    }

    /// Declares `name` without an implementation, e.g. for a policy that is
    /// referenced by rules but not yet wired in this binary.
    pub fn declare(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), None);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Registry slot for `name`: `None` if undefined, `Some(None)` if
    /// declared without an implementation.
    pub(crate) fn slot(&self, name: &str) -> Option<Option<&Arc<dyn Policy>>> {
        self.entries.get(name).map(Option::as_ref)
    }
}

impl fmt::Debug for Policies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Policies").field("names", &names).finish()
    }
}
