//! Companion-source rendering.
//!
//! One fixed template, registered in strict mode when the renderer is
//! constructed; a failure while rendering any file aborts the whole batch
//! so partial output is never emitted. Rule trees are pre-rendered as Rust
//! literals, with methods in sorted order so output is deterministic.

use std::fmt::Write;

use handlebars::Handlebars;
use serde::Serialize;
use tonic_guard::rules::{Match, Rule, Rules, Service};

use crate::errors::PluginError;
use crate::naming;

const TEMPLATE_NAME: &str = "guard";
const TEMPLATE: &str = include_str!("../templates/guard.rs.hbs");

const INDENT: &str = "    ";

#[derive(Serialize)]
struct TemplateData<'a> {
    meta: Meta<'a>,
    file: FileData<'a>,
    services: Vec<ServiceData>,
}

#[derive(Serialize)]
struct Meta<'a> {
    plugin_version: &'a str,
    protoc_version: &'a str,
}

#[derive(Serialize)]
struct FileData<'a> {
    source: &'a str,
}

#[derive(Serialize)]
struct ServiceData {
    proto_name: String,
    guard_module: String,
    server_module: String,
    server_type: String,
    handler_trait: String,
    literal: String,
}

pub struct Renderer {
    handlebars: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, PluginError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .register_template_string(TEMPLATE_NAME, TEMPLATE)
            .map_err(|err| PluginError::Template(Box::new(err)))?;
        Ok(Self { handlebars })
    }

    /// Renders the companion source for one proto file.
    pub fn render_file(
        &self,
        source: &str,
        protoc_version: &str,
        services: &[Service],
    ) -> Result<String, PluginError> {
        let data = TemplateData {
            meta: Meta {
                plugin_version: env!("CARGO_PKG_VERSION"),
                protoc_version,
            },
            file: FileData { source },
            services: services
                .iter()
                .map(|service| ServiceData {
                    proto_name: service.name.clone(),
                    guard_module: naming::guard_module(&service.name),
                    server_module: naming::server_module(&service.name),
                    server_type: naming::server_type(&service.name),
                    handler_trait: naming::handler_trait(&service.name),
                    literal: service_literal(service, 1),
                })
                .collect(),
        };

        Ok(self.handlebars.render(TEMPLATE_NAME, &data)?)
    }
}

/// Renders a [`Service`] as a Rust struct literal, indented to nest inside
/// the template's `Lazy::new` closure.
fn service_literal(service: &Service, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);

    let mut out = String::new();
    out.push_str("Service {\n");
    let _ = writeln!(out, "{inner}name: {:?}.to_owned(),", service.name);
    let _ = writeln!(
        out,
        "{inner}rules: {},",
        option_rules_literal(service.rules.as_ref(), depth + 1)
    );

    if service.methods.is_empty() {
        let _ = writeln!(out, "{inner}methods: HashMap::new(),");
    } else {
        let mut methods: Vec<_> = service.methods.iter().collect();
        methods.sort_by(|left, right| left.0.cmp(right.0));

        let _ = writeln!(out, "{inner}methods: HashMap::from([");
        for (name, method) in methods {
            let entry = INDENT.repeat(depth + 2);
            let field = INDENT.repeat(depth + 3);
            let _ = writeln!(out, "{entry}(");
            let _ = writeln!(out, "{field}{name:?}.to_owned(),");
            let _ = writeln!(out, "{field}Method {{");
            let _ = writeln!(
                out,
                "{field}{INDENT}rules: {},",
                option_rules_literal(method.rules.as_ref(), depth + 4)
            );
            let _ = writeln!(out, "{field}}},");
            let _ = writeln!(out, "{entry}),");
        }
        let _ = writeln!(out, "{inner}]),");
    }

    let _ = write!(out, "{pad}}}");
    out
}

fn option_rules_literal(rules: Option<&Rules>, depth: usize) -> String {
    match rules {
        None => "None".to_owned(),
        Some(rules) if rules.is_empty() => "Some(Vec::new())".to_owned(),
        Some(rules) => {
            let pad = INDENT.repeat(depth);
            let inner = INDENT.repeat(depth + 1);
            let mut out = String::new();
            out.push_str("Some(vec![\n");
            for rule in rules {
                let _ = writeln!(out, "{inner}{},", rule_literal(rule, depth + 1));
            }
            let _ = write!(out, "{pad}])");
            out
        }
    }
}

fn rule_literal(rule: &Rule, depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);

    let mut out = String::new();
    out.push_str("Rule {\n");
    let _ = writeln!(
        out,
        "{inner}allow_public: {},",
        option_bool_literal(rule.allow_public)
    );
    let _ = writeln!(
        out,
        "{inner}require_authentication: {},",
        option_bool_literal(rule.require_authentication)
    );
    match &rule.authenticated_access {
        None => {
            let _ = writeln!(out, "{inner}authenticated_access: None,");
        }
        Some(access) => {
            let field = INDENT.repeat(depth + 2);
            let _ = writeln!(
                out,
                "{inner}authenticated_access: Some(AuthenticatedAccess {{"
            );
            match &access.role_based {
                None => {
                    let _ = writeln!(out, "{field}role_based: None,");
                }
                Some(role_based) => {
                    let _ = writeln!(out, "{field}role_based: Some(RoleBased {{");
                    let _ = writeln!(
                        out,
                        "{field}{INDENT}roles: {},",
                        string_vec_literal(&role_based.roles)
                    );
                    let _ = writeln!(
                        out,
                        "{field}{INDENT}match_mode: {},",
                        match_literal(role_based.match_mode)
                    );
                    let _ = writeln!(out, "{field}}}),");
                }
            }
            match &access.policy_based {
                None => {
                    let _ = writeln!(out, "{field}policy_based: None,");
                }
                Some(policy_based) => {
                    let _ = writeln!(out, "{field}policy_based: Some(PolicyBased {{");
                    let _ = writeln!(
                        out,
                        "{field}{INDENT}policies: {},",
                        string_vec_literal(&policy_based.policies)
                    );
                    let _ = writeln!(
                        out,
                        "{field}{INDENT}match_mode: {},",
                        match_literal(policy_based.match_mode)
                    );
                    let _ = writeln!(out, "{field}}}),");
                }
            }
            let _ = writeln!(out, "{inner}}}),");
        }
    }
    let _ = write!(out, "{pad}}}");
    out
}

fn option_bool_literal(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Some(true)",
        Some(false) => "Some(false)",
        None => "None",
    }
}

fn string_vec_literal(values: &[String]) -> String {
    if values.is_empty() {
        return "Vec::new()".to_owned();
    }
    let items: Vec<String> = values
        .iter()
        .map(|value| format!("{value:?}.to_owned()"))
        .collect();
    format!("vec![{}]", items.join(", "))
}

fn match_literal(match_mode: Match) -> &'static str {
    match match_mode {
        Match::AtLeastOne => "Match::AtLeastOne",
        Match::All => "Match::All",
    }
}
