//! Optional observability hooks invoked on the call path.

use std::sync::Arc;

use crate::errors::GuardError;
use crate::subject::Input;

/// Called when subject resolution or rule evaluation fails.
pub type OnErrorHandler = Arc<dyn Fn(&Input, &GuardError) + Send + Sync>;

/// Called when a request is denied by guard rules.
pub type OnAccessDeniedHandler = Arc<dyn Fn(&Input) + Send + Sync>;

/// Hook set captured at interceptor construction. Handlers run
/// synchronously on the call path and see the [`Input`] as it stood at the
/// decision point; they must treat it as immutable and must not block.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_error: Option<OnErrorHandler>,
    pub(crate) on_access_denied: Option<OnAccessDeniedHandler>,
}

impl EventHandlers {
    pub(crate) fn error(&self, input: &Input, err: &GuardError) {
        if let Some(handler) = &self.on_error {
            handler(input, err);
        }
    }

    pub(crate) fn access_denied(&self, input: &Input) {
        if let Some(handler) = &self.on_access_denied {
            handler(input);
        }
    }
}
