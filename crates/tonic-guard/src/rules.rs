//! Data structures that represent access control rules for gRPC services
//! and methods.
//!
//! Rule trees are produced once (either by the codegen plugin as `'static`
//! literals or by hand for defaults and tests) and never mutated afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Quantifier over a set of required roles or policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Match {
    /// At least one required entry must hold.
    #[default]
    AtLeastOne,
    /// Every required entry must hold.
    All,
}

/// A single access control condition. At most one of the three modes is set:
///
/// - `allow_public` — allows unauthenticated access;
/// - `require_authentication` — requires authentication but no further checks;
/// - `authenticated_access` — fine-grained role- and/or policy-based access.
///
/// A rule with no mode set contributes a deny: it never admits a call, but
/// evaluating it is not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_authentication: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated_access: Option<AuthenticatedAccess>,
}

impl Rule {
    pub fn allow_public(value: bool) -> Self {
        Self {
            allow_public: Some(value),
            ..Self::default()
        }
    }

    pub fn require_authentication(value: bool) -> Self {
        Self {
            require_authentication: Some(value),
            ..Self::default()
        }
    }

    pub fn authenticated_access(access: AuthenticatedAccess) -> Self {
        Self {
            authenticated_access: Some(access),
            ..Self::default()
        }
    }
}

/// An ordered ruleset. Order is significant: the evaluator admits a call on
/// the first rule that allows it.
pub type Rules = Vec<Rule>;

/// Access conditions for authenticated callers, supporting role-based and/or
/// policy-based checks. When both are present, both must allow access.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedAccess {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_based: Option<RoleBased>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_based: Option<PolicyBased>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBased {
    pub roles: Vec<String>,
    #[serde(default)]
    pub match_mode: Match,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBased {
    pub policies: Vec<String>,
    #[serde(default)]
    pub match_mode: Match,
}

/// Guard metadata for one gRPC service: optional service-level rules plus
/// per-method rules keyed by the method's simple name.
///
/// `None` and `Some(vec![])` are distinct on purpose: an empty method ruleset
/// still overrides the service-level rules, while an absent one falls
/// through (see the resolver precedence chain).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Rules>,
    #[serde(default)]
    pub methods: HashMap<String, Method>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Rules>,
}
