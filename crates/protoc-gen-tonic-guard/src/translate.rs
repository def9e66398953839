//! Translation from `guard.v1` annotation messages into the runtime rule
//! tree.

use prost_reflect::{DynamicMessage, ExtensionDescriptor};
use tonic_guard::rules::{AuthenticatedAccess, Match, PolicyBased, RoleBased, Rule, Rules};

use crate::errors::PluginError;

/// Translates the repeated `Rule` extension attached to a service or method
/// options message. `context` names the annotated element for diagnostics.
pub fn rules_from_extension(
    options: &DynamicMessage,
    extension: &ExtensionDescriptor,
    context: &str,
) -> Result<Rules, PluginError> {
    let value = options.get_extension(extension);
    let items = value
        .as_list()
        .ok_or_else(|| PluginError::Descriptor(format!("{context}: expected repeated Rule")))?;

    items
        .iter()
        .map(|item| {
            let message = item.as_message().ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: rule entry is not a message"))
            })?;
            rule_from_proto(message, context)
        })
        .collect()
}

/// Translates a single `guard.v1.Rule` message. Only a rule with no mode
/// set at all becomes an inert rule; a present `authenticated_access`
/// payload is kept even when both sub-checks are absent (such a node denies
/// at evaluation time).
pub fn rule_from_proto(rule: &DynamicMessage, context: &str) -> Result<Rule, PluginError> {
    if rule.has_field_by_name("allow_public") {
        return Ok(Rule::allow_public(bool_field(rule, "allow_public")));
    }

    if rule.has_field_by_name("require_authentication") {
        return Ok(Rule::require_authentication(bool_field(
            rule,
            "require_authentication",
        )));
    }

    if rule.has_field_by_name("authenticated_access") {
        let value = rule
            .get_field_by_name("authenticated_access")
            .ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: authenticated_access unreadable"))
            })?;
        let access = value.as_message().ok_or_else(|| {
            PluginError::Descriptor(format!("{context}: authenticated_access is not a message"))
        })?;

        let mut translated = AuthenticatedAccess::default();

        if access.has_field_by_name("role_based") {
            let value = access.get_field_by_name("role_based").ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: role_based unreadable"))
            })?;
            let role_based = value.as_message().ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: role_based is not a message"))
            })?;
            translated.role_based = Some(RoleBased {
                roles: string_list(role_based, "roles"),
                match_mode: match_mode(role_based, context)?,
            });
        }

        if access.has_field_by_name("policy_based") {
            let value = access.get_field_by_name("policy_based").ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: policy_based unreadable"))
            })?;
            let policy_based = value.as_message().ok_or_else(|| {
                PluginError::Descriptor(format!("{context}: policy_based is not a message"))
            })?;
            translated.policy_based = Some(PolicyBased {
                policies: string_list(policy_based, "policies"),
                match_mode: match_mode(policy_based, context)?,
            });
        }

        return Ok(Rule::authenticated_access(translated));
    }

    Ok(Rule::default())
}

/// Reads the optional `match` field, defaulting to `AT_LEAST_ONE`. Values
/// outside the declared enumeration abort the batch.
fn match_mode(message: &DynamicMessage, context: &str) -> Result<Match, PluginError> {
    if !message.has_field_by_name("match") {
        return Ok(Match::AtLeastOne);
    }

    let number = message
        .get_field_by_name("match")
        .and_then(|value| value.as_enum_number())
        .ok_or_else(|| PluginError::Descriptor(format!("{context}: match is not an enum")))?;

    match number {
        0 => Ok(Match::AtLeastOne),
        1 => Ok(Match::All),
        value => Err(PluginError::UnknownMatch {
            value,
            context: context.to_owned(),
        }),
    }
}

fn bool_field(message: &DynamicMessage, name: &str) -> bool {
    message
        .get_field_by_name(name)
        .and_then(|value| value.as_bool())
        .unwrap_or_default()
}

fn string_list(message: &DynamicMessage, name: &str) -> Vec<String> {
    message
        .get_field_by_name(name)
        .and_then(|value| {
            value.as_list().map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_owned))
                    .collect()
            })
        })
        .unwrap_or_default()
}
