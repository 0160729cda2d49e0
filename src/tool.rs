//! Tool definitions for RPC methods and the call-time argument pipeline.
//!
//! Each unary method becomes one tool whose input schema is the generated
//! schema of its request message. At call time [`decode_arguments`] takes
//! the caller's JSON back to a request message.

use crate::compat::restore_canonical;
use crate::config::Dialect;
use crate::error::{Error, Result};
use crate::extra_properties::{augment_schema, extract_extra_properties, ExtraProperty};
use crate::generator::SchemaGenerator;
use crate::proto_parser::leading_comment;
use prost_reflect::{DynamicMessage, MessageDescriptor, MethodDescriptor, ServiceDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A tool as published to a tool-calling client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// The first text block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|content| match content {
            Content::Text { text } => Some(text.as_str()),
        })
    }
}

/// Request arguments after decoding.
#[derive(Debug, Clone)]
pub struct DecodedArguments {
    pub request: DynamicMessage,
    /// Values of the declared extra properties that the caller supplied.
    pub extras: BTreeMap<String, Value>,
}

/// `<package with underscores>_<Service>_<Method>`, e.g.
/// `acme_items_v1_ItemService_CreateItem`.
pub fn tool_name(method: &MethodDescriptor) -> String {
    let service = method.parent_service();
    let package = service.package_name().replace('.', "_");
    if package.is_empty() {
        format!("{}_{}", service.name(), method.name())
    } else {
        format!("{package}_{}_{}", service.name(), method.name())
    }
}

/// The tool for one method, with `extras` merged into its input schema.
pub fn tool_for_method(
    generator: &SchemaGenerator,
    method: &MethodDescriptor,
    extras: &[ExtraProperty],
) -> ToolDefinition {
    let mut input_schema = generator.message_schema_value(&method.input());
    augment_schema(&mut input_schema, extras);

    let description = generator
        .options()
        .include_comments
        .then(|| leading_comment(&method.parent_file(), method.path()))
        .flatten();

    ToolDefinition {
        name: tool_name(method),
        description,
        input_schema,
    }
}

/// Tools for every unary method of a service, in declaration order.
/// Streaming methods have no single request to fill and are skipped.
pub fn tools_for_service(
    generator: &SchemaGenerator,
    service: &ServiceDescriptor,
    extras: &[ExtraProperty],
) -> Vec<ToolDefinition> {
    service
        .methods()
        .filter(|method| {
            let unary = !method.is_client_streaming() && !method.is_server_streaming();
            if !unary {
                tracing::debug!(method = method.full_name(), "skipping streaming method");
            }
            unary
        })
        .map(|method| tool_for_method(generator, &method, extras))
        .collect()
}

/// Decode tool-call arguments into a `message`.
///
/// Declared extras are removed first. Under [`Dialect::RestrictedCompat`]
/// the remaining arguments are rewritten to canonical protobuf JSON before
/// the canonical decoder sees them.
pub fn decode_arguments(
    message: &MessageDescriptor,
    dialect: Dialect,
    args: Value,
    extras: &[ExtraProperty],
) -> Result<DecodedArguments> {
    let Value::Object(mut args) = args else {
        return Err(Error::ArgumentsNotObject);
    };

    let extras = extract_extra_properties(&mut args, extras);
    if dialect.is_restricted() {
        restore_canonical(message, &mut args);
    }

    let request = DynamicMessage::deserialize(message.clone(), Value::Object(args)).map_err(
        |source| Error::Decode {
            message: message.full_name().to_owned(),
            source,
        },
    )?;
    Ok(DecodedArguments { request, extras })
}
