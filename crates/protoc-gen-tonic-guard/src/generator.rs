//! The batch driver: decodes a `CodeGeneratorRequest`, walks the annotated
//! services of every file scheduled for generation, and assembles the
//! response.

use std::collections::{HashMap, HashSet};

use prost_reflect::{DynamicMessage, ExtensionDescriptor};
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::CodeGeneratorResponse;
use tonic_guard::rules::{Method, Service};

use crate::errors::PluginError;
use crate::render::Renderer;
use crate::{schema, translate};

/// Terminal state of one scanned file.
enum FileOutcome {
    /// No service contributed rules; nothing is emitted.
    Skipped,
    Emitted(File),
}

pub struct Generator {
    renderer: Renderer,
}

impl Generator {
    /// Creates a generator, registering the companion-source template. A
    /// broken template fails here, before any file is touched.
    pub fn new() -> Result<Self, PluginError> {
        Ok(Self {
            renderer: Renderer::new()?,
        })
    }

    /// Processes raw `CodeGeneratorRequest` bytes into a response.
    ///
    /// The request is decoded dynamically against the embedded schema so the
    /// guard extensions on service and method options stay readable. Any
    /// translation or rendering error aborts the whole batch.
    pub fn generate(&self, request_bytes: &[u8]) -> Result<CodeGeneratorResponse, PluginError> {
        let request = DynamicMessage::decode(schema::message(schema::REQUEST_MESSAGE)?, request_bytes)?;

        let service_ext = schema::extension(schema::SERVICE_RULES_EXTENSION)?;
        let method_ext = schema::extension(schema::METHOD_RULES_EXTENSION)?;

        let targets: HashSet<String> = string_list(&request, "file_to_generate")
            .into_iter()
            .collect();
        let protoc_version = protoc_version(&request);

        let mut files = Vec::new();
        for file in message_list(&request, "proto_file") {
            let source = string_field(&file, "name");
            if !targets.contains(&source) {
                continue;
            }

            match self.scan_file(&file, &source, &protoc_version, &service_ext, &method_ext)? {
                FileOutcome::Skipped => {
                    tracing::debug!(file = %source, "no guard rules, skipping");
                }
                FileOutcome::Emitted(generated) => {
                    tracing::debug!(file = %source, "emitting guard companion");
                    files.push(generated);
                }
            }
        }

        Ok(CodeGeneratorResponse {
            supported_features: Some(Feature::Proto3Optional as u64),
            file: files,
            ..Default::default()
        })
    }

    fn scan_file(
        &self,
        file: &DynamicMessage,
        source: &str,
        protoc_version: &str,
        service_ext: &ExtensionDescriptor,
        method_ext: &ExtensionDescriptor,
    ) -> Result<FileOutcome, PluginError> {
        let package = string_field(file, "package");

        let mut services = Vec::new();
        for descriptor in message_list(file, "service") {
            let name = string_field(&descriptor, "name");
            if let Some(service) =
                collect_service(&descriptor, &name, service_ext, method_ext)?
            {
                services.push(service);
            }
        }

        if services.is_empty() {
            return Ok(FileOutcome::Skipped);
        }

        let content = self.renderer.render_file(source, protoc_version, &services)?;

        Ok(FileOutcome::Emitted(File {
            name: Some(format!("{}.guard.rs", output_prefix(&package))),
            content: Some(content),
            ..Default::default()
        }))
    }
}

/// Collects one service's guard metadata: explicit service-level rules plus
/// per-method rules. Returns `None` when neither exists, so the service is
/// left out of the companion source entirely.
fn collect_service(
    descriptor: &DynamicMessage,
    name: &str,
    service_ext: &ExtensionDescriptor,
    method_ext: &ExtensionDescriptor,
) -> Result<Option<Service>, PluginError> {
    let rules = match options_with_extension(descriptor, service_ext) {
        Some(options) => Some(translate::rules_from_extension(
            &options,
            service_ext,
            name,
        )?),
        None => None,
    };

    let mut methods = HashMap::new();
    for method in message_list(descriptor, "method") {
        let method_name = string_field(&method, "name");
        if let Some(options) = options_with_extension(&method, method_ext) {
            let context = format!("{name}.{method_name}");
            let rules = translate::rules_from_extension(&options, method_ext, &context)?;
            methods.insert(method_name, Method { rules: Some(rules) });
        }
    }

    if rules.is_none() && methods.is_empty() {
        return Ok(None);
    }

    Ok(Some(Service {
        name: name.to_owned(),
        rules,
        methods,
    }))
}

/// The descriptor's options message, only when it actually carries the
/// given guard extension.
fn options_with_extension(
    descriptor: &DynamicMessage,
    extension: &ExtensionDescriptor,
) -> Option<DynamicMessage> {
    if !descriptor.has_field_by_name("options") {
        return None;
    }
    let options = descriptor
        .get_field_by_name("options")?
        .as_message()?
        .clone();
    options.has_extension(extension).then_some(options)
}

fn output_prefix(package: &str) -> &str {
    if package.is_empty() {
        "_"
    } else {
        package
    }
}

fn protoc_version(request: &DynamicMessage) -> String {
    if !request.has_field_by_name("compiler_version") {
        return "(unknown)".to_owned();
    }
    let Some(value) = request.get_field_by_name("compiler_version") else {
        return "(unknown)".to_owned();
    };
    let Some(version) = value.as_message() else {
        return "(unknown)".to_owned();
    };

    let major = int_field(version, "major");
    let minor = int_field(version, "minor");
    let patch = int_field(version, "patch");
    let suffix = string_field(version, "suffix");
    format!("v{major}.{minor}.{patch}{suffix}")
}

fn int_field(message: &DynamicMessage, name: &str) -> i32 {
    message
        .get_field_by_name(name)
        .and_then(|value| value.as_i32())
        .unwrap_or_default()
}

fn string_field(message: &DynamicMessage, name: &str) -> String {
    message
        .get_field_by_name(name)
        .and_then(|value| value.as_str().map(str::to_owned))
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

fn message_list(message: &DynamicMessage, name: &str) -> Vec<DynamicMessage> {
    message
        .get_field_by_name(name)
        .and_then(|value| {
            value.as_list().map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_message().cloned())
                    .collect()
            })
        })
        .unwrap_or_default()
}
