//! The guard interceptor: configuration plus the per-call authorization
//! pipeline.

use std::sync::Arc;

use tonic::metadata::MetadataMap;
use tonic::Status;

use crate::errors::GuardError;
use crate::events::EventHandlers;
use crate::policy::Policies;
use crate::rules::{Rules, Service};
use crate::subject::{CallContext, Input, SubjectResolver};

/// Evaluates guard rules for every call on a wrapped service.
///
/// A `Guard` holds only configuration captured at construction; concurrent
/// calls share it read-only. Wrap generated servers with
/// [`Guard::service`](crate::Guard::service) (or
/// [`Guard::opaque_service`](crate::Guard::opaque_service) for servers
/// without generated rules) and add the result to the tonic router.
#[derive(Clone)]
pub struct Guard {
    pub(crate) debug: bool,
    pub(crate) policies: Policies,
    pub(crate) default_rules: Option<Rules>,
    pub(crate) handlers: EventHandlers,
    pub(crate) resolver: Arc<dyn SubjectResolver>,
}

impl Guard {
    /// Creates a guard with the given subject resolver and zero-trust
    /// defaults: no policies, no default rules, no hooks.
    pub fn new(resolver: impl SubjectResolver + 'static) -> Self {
        Self {
            debug: false,
            policies: Policies::default(),
            default_rules: None,
            handlers: EventHandlers::default(),
            resolver: Arc::new(resolver),
        }
    }

    /// Enables per-call `tracing` output for granted/denied/error outcomes.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Installs the named policy functions referenced by policy-based rules.
    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Sets global fallback rules applied when a service exposes guard
    /// metadata but neither the method nor the service defines a ruleset.
    pub fn with_default_rules(mut self, rules: Rules) -> Self {
        self.default_rules = Some(rules);
        self
    }

    /// Registers a handler invoked when subject resolution or rule
    /// evaluation fails.
    pub fn with_on_error(
        mut self,
        handler: impl Fn(&Input, &GuardError) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.on_error = Some(Arc::new(handler));
        self
    }

    /// Registers a handler invoked when a request is denied by guard rules.
    pub fn with_on_access_denied(
        mut self,
        handler: impl Fn(&Input) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.on_access_denied = Some(Arc::new(handler));
        self
    }

    /// Decides whether the current call may proceed.
    ///
    /// `service` is the guard metadata obtained from the server's capability
    /// (`None` when the server exposes none). Returns `Ok(())` on admission
    /// or the gRPC status to reply with.
    pub async fn authorize(
        &self,
        service: Option<&Service>,
        full_method: &str,
        metadata: MetadataMap,
    ) -> Result<(), Status> {
        let mut input = Input {
            request: CallContext {
                full_method: full_method.to_owned(),
                metadata,
            },
            subject: None,
        };

        input.subject = match self.resolver.resolve(&input.request).await {
            Ok(subject) => subject,
            Err(source) => {
                let err = GuardError::SubjectResolution(source);
                if self.debug {
                    tracing::debug!(method = %full_method, error = %err, "failed to resolve subject");
                }
                self.handlers.error(&input, &err);
                return Err(Status::internal("failed to resolve subject"));
            }
        };

        let rules = self.effective_rules(service, full_method);

        match self.evaluate_rules(rules, &input).await {
            Err(err) => {
                if self.debug {
                    tracing::debug!(method = %full_method, error = %err, "evaluation error");
                }
                self.handlers.error(&input, &err);
                Err(Status::internal("evaluation error"))
            }
            Ok(false) => {
                if self.debug {
                    tracing::debug!(method = %full_method, "access denied");
                }
                self.handlers.access_denied(&input);
                Err(Status::permission_denied("permission denied"))
            }
            Ok(true) => {
                if self.debug {
                    tracing::debug!(method = %full_method, "access granted");
                }
                Ok(())
            }
        }
    }
}
