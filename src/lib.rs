//! Protobuf descriptors as LLM tools.
//!
//! This crate provides:
//! - Runtime compilation of `.proto` sources into descriptor pools (`proto_parser`)
//! - JSON Schema generation for messages in two dialects (`generator`, `schema`)
//! - Repair of restricted-dialect arguments before canonical decoding (`compat`)
//! - Caller-supplied extra parameters merged into schemas (`extra_properties`)
//! - A single canonical shape for gRPC and Connect failures (`status`)
//! - Tool definitions and the argument pipeline tying these together (`tool`)
//!
//! # Usage
//!
//! ```no_run
//! use proto_mcp::{compile_file, decode_arguments, tools_for_service, Dialect, SchemaGenerator};
//! use std::path::Path;
//!
//! # fn main() -> proto_mcp::Result<()> {
//! let pool = compile_file(Path::new("proto/items.proto"))?;
//! let service = proto_mcp::find_service(&pool, "acme.items.v1.ItemService")?;
//!
//! let generator = SchemaGenerator::new(Dialect::RestrictedCompat);
//! let tools = tools_for_service(&generator, &service, &[]);
//!
//! let Some(method) = service.methods().next() else { return Ok(()) };
//! let args = serde_json::json!({ "name": "widget", "labels": [{"key": "env", "value": "prod"}] });
//! let decoded = decode_arguments(&method.input(), Dialect::RestrictedCompat, args, &[])?;
//! # let _ = (tools, decoded);
//! # Ok(())
//! # }
//! ```

pub mod compat;
pub mod config;
pub mod error;
pub mod extra_properties;
pub mod generator;
pub mod proto_parser;
pub mod registry;
pub mod schema;
pub mod status;
pub mod tool;
pub mod well_known;

pub use compat::{restore_canonical, restore_canonical_value};
pub use config::{Dialect, FormatPolicy, GeneratorOptions};
pub use error::{Error, Result};
pub use extra_properties::{
    add_base_url_property, add_extra_properties, extract_extra_properties, ExtraProperty,
};
pub use generator::SchemaGenerator;
pub use proto_parser::{compile_content, compile_file, compile_sources, find_message, find_service};
pub use registry::SchemaRegistry;
pub use schema::{JsonType, SchemaNode};
pub use status::{handle_error, CanonicalStatus, ConnectError, ErrorNormalizer};
pub use tool::{
    decode_arguments, tool_for_method, tools_for_service, CallToolResult, DecodedArguments,
    ToolDefinition,
};

// Descriptor and status types appear in the public API.
pub use prost_reflect;
pub use tonic;
