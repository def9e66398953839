//! Binding a method invocation to its effective ruleset.

use crate::interceptor::Guard;
use crate::rules::{Rules, Service};

/// The method's simple name: the substring after the last `/` of the full
/// method path (`/pkg.Service/Method` → `Method`).
pub(crate) fn method_simple_name(full_method: &str) -> &str {
    full_method.rsplit('/').next().unwrap_or(full_method)
}

impl Guard {
    /// Returns the effective access rules for a method, applying the
    /// precedence order: method rules → service rules → default rules.
    ///
    /// A server without the guard capability (`service` is `None`) yields
    /// `None` regardless of configured defaults, so such calls fall through
    /// to the zero-trust deny.
    pub(crate) fn effective_rules<'a>(
        &'a self,
        service: Option<&'a Service>,
        full_method: &str,
    ) -> Option<&'a Rules> {
        let service = service?;

        if let Some(method) = service.methods.get(method_simple_name(full_method)) {
            if let Some(rules) = method.rules.as_ref() {
                return Some(rules);
            }
        }

        if let Some(rules) = service.rules.as_ref() {
            return Some(rules);
        }

        self.default_rules.as_ref()
    }
}
