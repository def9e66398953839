//! The tower-level adapter that enforces guard rules ahead of a tonic
//! service, plus the capability trait generated companion code implements.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::{Request, Response};
use tonic::body::BoxBody;
use tonic::metadata::MetadataMap;
use tonic::server::NamedService;

use crate::interceptor::Guard;
use crate::rules;

/// Capability exposed by generated companion code: hands the interceptor
/// the guard metadata of a service. The accessor is trivial; it never
/// clones the rule tree.
pub trait GuardedService {
    fn guard_service(&self) -> &'static rules::Service;
}

impl Guard {
    /// Wraps a generated tonic server whose companion source exposes guard
    /// rules. The wrapped service can be passed to
    /// `Server::builder().add_service(..)` directly.
    pub fn service<S: GuardedService>(&self, inner: S) -> Guarded<S> {
        let rules = Some(inner.guard_service());
        Guarded {
            inner,
            guard: Arc::new(self.clone()),
            rules,
        }
    }

    /// Wraps a service without the guard capability. The resolver then sees
    /// no ruleset at all and every call is denied; configured default rules
    /// do not apply to such servers.
    pub fn opaque_service<S>(&self, inner: S) -> Guarded<S> {
        Guarded {
            inner,
            guard: Arc::new(self.clone()),
            rules: None,
        }
    }
}

/// A tonic service wrapped with guard enforcement. Unary and streaming
/// calls take the same path: authorization happens on the request head,
/// before any message is pulled from the body.
#[derive(Clone)]
pub struct Guarded<S> {
    inner: S,
    guard: Arc<Guard>,
    rules: Option<&'static rules::Service>,
}

impl<S, B> tower::Service<Request<B>> for Guarded<S>
where
    S: tower::Service<Request<B>, Response = Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        // Hand the ready inner service to the future and keep a fresh clone
        // for the next call (the tower readiness contract).
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let guard = Arc::clone(&self.guard);
        let rules = self.rules;

        Box::pin(async move {
            let full_method = request.uri().path().to_owned();
            let metadata = MetadataMap::from_headers(request.headers().clone());

            match guard.authorize(rules, &full_method, metadata).await {
                Ok(()) => inner.call(request).await,
                // A trailers-only rejection: the call never reaches the
                // handler.
                Err(status) => Ok(status.into_http()),
            }
        })
    }
}

impl<S: NamedService> NamedService for Guarded<S> {
    const NAME: &'static str = S::NAME;
}
