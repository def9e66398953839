//! Rule evaluation.
//!
//! Access is granted if any rule in the ruleset allows it; rules are checked
//! in declared order and the first allow wins. Any evaluation error aborts
//! the ruleset: later rules are not consulted.

use std::collections::HashSet;

use crate::errors::{GuardError, GuardResult};
use crate::interceptor::Guard;
use crate::rules::{Match, PolicyBased, RoleBased, Rule, Rules};
use crate::subject::{Input, Subject};

impl Guard {
    /// Evaluates a ruleset against the call input. `None` or an empty
    /// ruleset denies.
    pub async fn evaluate_rules(&self, rules: Option<&Rules>, input: &Input) -> GuardResult<bool> {
        let Some(rules) = rules else {
            return Ok(false);
        };

        for rule in rules {
            if self.evaluate_rule(rule, input).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn evaluate_rule(&self, rule: &Rule, input: &Input) -> GuardResult<bool> {
        if rule.allow_public == Some(true) {
            return Ok(true);
        }

        if rule.require_authentication == Some(true) {
            return Ok(input.authenticated());
        }

        if let Some(access) = &rule.authenticated_access {
            let Some(subject) = input.subject.as_ref() else {
                return Ok(false);
            };

            let mut role_allowed = false;
            let mut policy_allowed = false;

            if let Some(role_based) = &access.role_based {
                role_allowed = evaluate_role_based(role_based, subject);
                if !role_allowed {
                    return Ok(false);
                }
            }

            if let Some(policy_based) = &access.policy_based {
                policy_allowed = self.evaluate_policy_based(policy_based, input).await?;
                if !policy_allowed {
                    return Ok(false);
                }
            }

            return Ok(role_allowed || policy_allowed);
        }

        // No mode set: an inert rule contributes a deny.
        Ok(false)
    }

    /// Runs every named policy in declared order and applies the quantifier
    /// afterwards. Deliberately eager: `AtLeastOne` does not short-circuit
    /// on the first success, so undefined or unimplemented policies surface
    /// as errors no matter where they appear in the list.
    async fn evaluate_policy_based(
        &self,
        policy_based: &PolicyBased,
        input: &Input,
    ) -> GuardResult<bool> {
        if policy_based.policies.is_empty() {
            return Ok(false);
        }

        let mut matched = 0usize;
        for name in &policy_based.policies {
            let Some(slot) = self.policies.slot(name) else {
                return Err(GuardError::UndefinedPolicy(name.clone()));
            };
            let Some(policy) = slot else {
                return Err(GuardError::InvalidPolicy(name.clone()));
            };

            let allowed =
                policy
                    .evaluate(input)
                    .await
                    .map_err(|source| GuardError::PolicyFailure {
                        name: name.clone(),
                        source,
                    })?;
            if allowed {
                matched += 1;
            }
        }

        Ok(match policy_based.match_mode {
            Match::All => matched == policy_based.policies.len(),
            Match::AtLeastOne => matched > 0,
        })
    }
}

fn evaluate_role_based(role_based: &RoleBased, subject: &Subject) -> bool {
    if role_based.roles.is_empty() {
        return false;
    }

    let subject_roles: HashSet<&str> = subject.roles.iter().map(String::as_str).collect();
    let matched = role_based
        .roles
        .iter()
        .filter(|role| subject_roles.contains(role.as_str()))
        .count();

    match role_based.match_mode {
        Match::All => matched == role_based.roles.len(),
        Match::AtLeastOne => matched > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Policies, PolicyFn};
    use crate::rules::AuthenticatedAccess;
    use crate::subject::{CallContext, ResolverFn};
    use tonic::metadata::MetadataMap;

    fn guard() -> Guard {
        Guard::new(ResolverFn::new(|_request: CallContext| async {
            Ok::<Option<Subject>, anyhow::Error>(None)
        }))
    }

    fn guard_with(policies: Policies) -> Guard {
        guard().with_policies(policies)
    }

    fn input(subject: Option<Subject>) -> Input {
        Input {
            request: CallContext {
                full_method: "/pkg.Service/Method".into(),
                metadata: MetadataMap::new(),
            },
            subject,
        }
    }

    fn subject_with_roles(roles: &[&str]) -> Subject {
        Subject {
            roles: roles.iter().map(|role| role.to_string()).collect(),
            attrs: Default::default(),
        }
    }

    fn role_rule(roles: &[&str], match_mode: Match) -> Rule {
        Rule::authenticated_access(AuthenticatedAccess {
            role_based: Some(RoleBased {
                roles: roles.iter().map(|role| role.to_string()).collect(),
                match_mode,
            }),
            policy_based: None,
        })
    }

    fn policy_rule(policies: &[&str], match_mode: Match) -> Rule {
        Rule::authenticated_access(AuthenticatedAccess {
            role_based: None,
            policy_based: Some(PolicyBased {
                policies: policies.iter().map(|name| name.to_string()).collect(),
                match_mode,
            }),
        })
    }

    fn fixed(value: bool) -> PolicyFn<impl Fn(Input) -> futures::future::Ready<anyhow::Result<bool>> + Send + Sync>
    {
        PolicyFn::new(move |_input: Input| futures::future::ready(Ok(value)))
    }

    #[tokio::test]
    async fn absent_and_empty_rulesets_deny() {
        let guard = guard();
        assert!(!guard.evaluate_rules(None, &input(None)).await.unwrap());
        assert!(!guard
            .evaluate_rules(Some(&vec![]), &input(None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn allow_public_admits_anonymous() {
        let guard = guard();
        let rules = vec![Rule::allow_public(true)];
        assert!(guard
            .evaluate_rules(Some(&rules), &input(None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn allow_public_false_is_inert() {
        let guard = guard();
        let rules = vec![Rule::allow_public(false)];
        assert!(!guard
            .evaluate_rules(Some(&rules), &input(None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn require_authentication_tracks_subject() {
        let guard = guard();
        let rules = vec![Rule::require_authentication(true)];

        assert!(!guard
            .evaluate_rules(Some(&rules), &input(None))
            .await
            .unwrap());
        assert!(guard
            .evaluate_rules(Some(&rules), &input(Some(Subject::default())))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn first_allowing_rule_wins() {
        let guard = guard();
        let rules = vec![
            Rule::require_authentication(true),
            Rule::allow_public(false),
            Rule::allow_public(true),
        ];

        assert!(guard
            .evaluate_rules(Some(&rules), &input(None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn inert_rules_deny() {
        let guard = guard();
        let rules = vec![Rule::default(), Rule::default()];
        assert!(!guard
            .evaluate_rules(Some(&rules), &input(Some(Subject::default())))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn authenticated_access_denies_anonymous() {
        let guard = guard();
        let rules = vec![role_rule(&["admin"], Match::AtLeastOne)];
        assert!(!guard
            .evaluate_rules(Some(&rules), &input(None))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn empty_access_node_denies() {
        let guard = guard();
        let rules = vec![Rule::authenticated_access(AuthenticatedAccess::default())];
        assert!(!guard
            .evaluate_rules(Some(&rules), &input(Some(Subject::default())))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn role_match_all() {
        let guard = guard();
        let rules = vec![role_rule(&["admin", "manager"], Match::All)];

        let full = input(Some(subject_with_roles(&["admin", "manager", "qa"])));
        assert!(guard.evaluate_rules(Some(&rules), &full).await.unwrap());

        let partial = input(Some(subject_with_roles(&["admin"])));
        assert!(!guard.evaluate_rules(Some(&rules), &partial).await.unwrap());
    }

    #[tokio::test]
    async fn role_match_at_least_one() {
        let guard = guard();
        let rules = vec![role_rule(&["admin", "manager"], Match::AtLeastOne)];

        let overlap = input(Some(subject_with_roles(&["qa", "manager"])));
        assert!(guard.evaluate_rules(Some(&rules), &overlap).await.unwrap());

        let disjoint = input(Some(subject_with_roles(&["qa"])));
        assert!(!guard
            .evaluate_rules(Some(&rules), &disjoint)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn empty_roles_deny_under_any_match() {
        let guard = guard();
        let subject = subject_with_roles(&["admin"]);

        for match_mode in [Match::AtLeastOne, Match::All] {
            let rules = vec![role_rule(&[], match_mode)];
            assert!(!guard
                .evaluate_rules(Some(&rules), &input(Some(subject.clone())))
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn duplicate_subject_roles_count_once() {
        let guard = guard();
        let rules = vec![role_rule(&["admin", "manager"], Match::All)];
        let duplicated = input(Some(subject_with_roles(&["admin", "admin"])));
        assert!(!guard
            .evaluate_rules(Some(&rules), &duplicated)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn policy_match_all() {
        let policies = Policies::new()
            .with("positive-1", fixed(true))
            .with("positive-2", fixed(true))
            .with("negative-1", fixed(false));

        let guard = guard_with(policies);
        let authenticated = input(Some(Subject::default()));

        let rules = vec![policy_rule(&["positive-1", "positive-2"], Match::All)];
        assert!(guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap());

        let rules = vec![policy_rule(&["positive-1", "negative-1"], Match::All)];
        assert!(!guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn policy_match_at_least_one() {
        let policies = Policies::new()
            .with("positive-1", fixed(true))
            .with("negative-1", fixed(false))
            .with("negative-2", fixed(false));

        let guard = guard_with(policies);
        let authenticated = input(Some(Subject::default()));

        let rules = vec![policy_rule(&["negative-1", "positive-1"], Match::AtLeastOne)];
        assert!(guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap());

        let rules = vec![policy_rule(&["negative-1", "negative-2"], Match::AtLeastOne)];
        assert!(!guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn empty_policies_deny_under_any_match() {
        let guard = guard();
        let authenticated = input(Some(Subject::default()));

        for match_mode in [Match::AtLeastOne, Match::All] {
            let rules = vec![policy_rule(&[], match_mode)];
            assert!(!guard
                .evaluate_rules(Some(&rules), &authenticated)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn undefined_policy_errors_even_after_success() {
        // Eager evaluation: the earlier success must not hide the lookup
        // failure under AtLeastOne.
        let policies = Policies::new().with("positive-1", fixed(true));
        let guard = guard_with(policies);
        let authenticated = input(Some(Subject::default()));

        let rules = vec![policy_rule(&["positive-1", "missing"], Match::AtLeastOne)];
        let err = guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::UndefinedPolicy(name) if name == "missing"));
    }

    #[tokio::test]
    async fn declared_policy_without_implementation_errors() {
        let mut policies = Policies::new();
        policies.declare("premium");
        let guard = guard_with(policies);
        let authenticated = input(Some(Subject::default()));

        let rules = vec![policy_rule(&["premium"], Match::All)];
        let err = guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::InvalidPolicy(name) if name == "premium"));
    }

    #[tokio::test]
    async fn policy_error_aborts_ruleset() {
        let policies = Policies::new()
            .with(
                "failing",
                PolicyFn::new(|_input: Input| async {
                    Err::<bool, anyhow::Error>(anyhow::anyhow!("backend down"))
                }),
            )
            .with("positive-1", fixed(true));
        let guard = guard_with(policies);
        let authenticated = input(Some(Subject::default()));

        // The failing rule comes first; the allowing rule after it must not
        // be consulted.
        let rules = vec![
            policy_rule(&["failing"], Match::All),
            Rule::allow_public(true),
        ];
        let err = guard
            .evaluate_rules(Some(&rules), &authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::PolicyFailure { name, .. } if name == "failing"));
    }

    #[tokio::test]
    async fn role_and_policy_must_both_hold() {
        let policies = Policies::new()
            .with("positive-1", fixed(true))
            .with("negative-1", fixed(false));
        let guard = guard_with(policies);

        let both = Rule::authenticated_access(AuthenticatedAccess {
            role_based: Some(RoleBased {
                roles: vec!["admin".into()],
                match_mode: Match::AtLeastOne,
            }),
            policy_based: Some(PolicyBased {
                policies: vec!["positive-1".into()],
                match_mode: Match::All,
            }),
        });
        let admin = input(Some(subject_with_roles(&["admin"])));
        assert!(guard
            .evaluate_rules(Some(&vec![both]), &admin)
            .await
            .unwrap());

        let failing_policy = Rule::authenticated_access(AuthenticatedAccess {
            role_based: Some(RoleBased {
                roles: vec!["admin".into()],
                match_mode: Match::AtLeastOne,
            }),
            policy_based: Some(PolicyBased {
                policies: vec!["negative-1".into()],
                match_mode: Match::All,
            }),
        });
        assert!(!guard
            .evaluate_rules(Some(&vec![failing_policy]), &admin)
            .await
            .unwrap());
    }
}
