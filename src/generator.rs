//! Descriptor-driven JSON Schema generation.
//!
//! A [`SchemaGenerator`] walks a message descriptor and produces one
//! [`SchemaNode`] per field, in declaration order. The [`Dialect`] it was
//! built with decides how maps, dynamic JSON values, presence and closed
//! objects are expressed. Generation never fails: a field the walker cannot
//! describe degrades to the unconstrained schema `{}`.
//!
//! Self-referencing messages are emitted once in `$defs` and referenced with
//! `$ref` wherever a message re-enters itself.

use crate::config::{Dialect, FormatPolicy, GeneratorOptions};
use crate::proto_parser::leading_comment;
use crate::schema::{scalar_schema, JsonType, Properties, SchemaNode, SchemaType};
use crate::well_known::WellKnownType;
use prost_reflect::{Cardinality, FieldDescriptor, Kind, MessageDescriptor, Value as ProtoValue};
use std::collections::{BTreeMap, BTreeSet};

const MAP_DESCRIPTION: &str = "List of key value pairs";
const DATE_TIME_FORMAT: &str = "date-time";

const FIELD_BEHAVIOR_EXTENSION: &str = "google.api.field_behavior";
// google.api.FieldBehavior.REQUIRED
const FIELD_BEHAVIOR_REQUIRED: i32 = 2;

/// Where a schema is placed: a field of its own, or an element of a list or
/// map. Only singular positions can express absence with `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Singular,
    Element,
}

/// Per-call bookkeeping for cycle detection.
#[derive(Debug, Default)]
struct Walk {
    ancestors: Vec<String>,
    recursive: BTreeSet<String>,
    definitions: BTreeMap<String, SchemaNode>,
}

impl Walk {
    fn is_ancestor(&self, full_name: &str) -> bool {
        self.ancestors.iter().any(|name| name == full_name)
    }

    fn take_definitions(&mut self) -> Option<BTreeMap<String, SchemaNode>> {
        (!self.definitions.is_empty()).then(|| std::mem::take(&mut self.definitions))
    }
}

/// Builds JSON Schemas for protobuf messages in one dialect.
///
/// The generator holds only configuration, so one instance can serve any
/// number of descriptors and threads. Output is a pure function of the
/// descriptor and the configuration.
#[derive(Debug, Clone, Default)]
pub struct SchemaGenerator {
    dialect: Dialect,
    options: GeneratorOptions,
}

impl SchemaGenerator {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_options(dialect, GeneratorOptions::default())
    }

    pub fn with_options(dialect: Dialect, options: GeneratorOptions) -> Self {
        Self { dialect, options }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// The root object schema for a message.
    ///
    /// The root `type` is always exactly `"object"`. Under
    /// [`Dialect::RestrictedCompat`] it is closed and lists every property as
    /// required.
    pub fn message_schema(&self, message: &MessageDescriptor) -> SchemaNode {
        let mut walk = Walk::default();
        let mut schema = self.object_schema(message, &mut walk);
        if self.options.include_comments {
            schema.description = leading_comment(&message.parent_file(), message.path());
        }
        schema.definitions = walk.take_definitions();
        schema
    }

    /// The schema document for a message as a JSON value.
    pub fn message_schema_value(&self, message: &MessageDescriptor) -> serde_json::Value {
        self.message_schema(message).to_value()
    }

    /// The schema of a single field, as it appears under its parent's
    /// `properties`.
    pub fn field_schema(&self, field: &FieldDescriptor) -> SchemaNode {
        let mut walk = Walk::default();
        let mut schema = self.field_node(field, &mut walk);
        schema.definitions = walk.take_definitions();
        schema
    }

    /// Whether the field must be present in the standard dialect.
    pub fn has_mandatory_presence(&self, field: &FieldDescriptor) -> bool {
        if field.cardinality() == Cardinality::Required || has_required_behavior(field) {
            return true;
        }
        self.options.require_implicit_scalars
            && !field.is_list()
            && !field.is_map()
            && !field.supports_presence()
            && !matches!(field.kind(), Kind::Message(_))
    }

    fn object_schema(&self, message: &MessageDescriptor, walk: &mut Walk) -> SchemaNode {
        let full_name = message.full_name().to_owned();
        walk.ancestors.push(full_name.clone());

        let mut properties = Properties::new();
        let mut required = Vec::new();
        for field in message.fields() {
            let mut schema = self.field_node(&field, walk);
            if self.options.include_comments
                && (schema.description.is_none() || is_plain_message(&field))
            {
                if let Some(comment) = leading_comment(&message.parent_file(), field.path()) {
                    schema.description = Some(comment);
                }
            }
            if self.dialect.is_restricted() || self.has_mandatory_presence(&field) {
                required.push(field.name().to_owned());
            }
            properties.insert(field.name(), schema);
        }

        walk.ancestors.pop();

        let mut schema = SchemaNode {
            properties: Some(properties),
            required: Some(required),
            ..SchemaNode::of_type(JsonType::Object)
        };
        if self.dialect.is_restricted() {
            schema.additional_properties = Some(false.into());
        }
        if walk.recursive.contains(&full_name) {
            walk.definitions.insert(full_name, schema.clone());
        }
        schema
    }

    fn field_node(&self, field: &FieldDescriptor, walk: &mut Walk) -> SchemaNode {
        if field.is_map() {
            return self.map_schema(field, walk);
        }
        let kind = field.kind();
        if field.is_list() {
            return SchemaNode::array_of(self.kind_schema(&kind, Position::Element, walk));
        }

        let schema = self.kind_schema(&kind, Position::Singular, walk);
        // Every property is required in the restricted dialect; absence is null.
        if self.dialect.is_restricted() && !self.has_mandatory_presence(field) && is_widenable(&kind)
        {
            schema.into_nullable()
        } else {
            schema
        }
    }

    fn map_schema(&self, field: &FieldDescriptor, walk: &mut Walk) -> SchemaNode {
        let Kind::Message(entry) = field.kind() else {
            tracing::warn!(field = field.full_name(), "map field without an entry message");
            return SchemaNode::any();
        };
        let value = self.kind_schema(
            &entry.map_entry_value_field().kind(),
            Position::Element,
            walk,
        );
        let key = SchemaNode::of_type(JsonType::String);

        match self.dialect {
            Dialect::Standard => SchemaNode {
                additional_properties: Some(value.into()),
                property_names: Some(Box::new(key)),
                ..SchemaNode::of_type(JsonType::Object)
            },
            Dialect::RestrictedCompat => {
                let mut pair = Properties::new();
                pair.insert("key", key);
                pair.insert("value", value);
                let item = SchemaNode {
                    properties: Some(pair),
                    required: Some(vec!["key".to_owned(), "value".to_owned()]),
                    additional_properties: Some(false.into()),
                    ..SchemaNode::of_type(JsonType::Object)
                };
                SchemaNode::array_of(item).with_description(MAP_DESCRIPTION)
            }
        }
    }

    fn kind_schema(&self, kind: &Kind, position: Position, walk: &mut Walk) -> SchemaNode {
        match kind {
            Kind::Message(message) => match WellKnownType::of(message) {
                Some(known) => self.well_known_schema(known, position),
                None => self.nested_message_schema(message, position, walk),
            },
            scalar => scalar_schema(scalar),
        }
    }

    fn nested_message_schema(
        &self,
        message: &MessageDescriptor,
        position: Position,
        walk: &mut Walk,
    ) -> SchemaNode {
        let full_name = message.full_name();
        if walk.is_ancestor(full_name) {
            walk.recursive.insert(full_name.to_owned());
            let reference = SchemaNode::ref_to(format!("#/$defs/{full_name}"));
            return match position {
                Position::Singular => SchemaNode {
                    any_of: Some(vec![reference, SchemaNode::of_type(JsonType::Null)]),
                    ..SchemaNode::default()
                },
                Position::Element => reference,
            };
        }
        if walk.ancestors.len() >= self.options.max_depth {
            tracing::warn!(
                message = full_name,
                max_depth = self.options.max_depth,
                "message nesting too deep, emitting an unconstrained schema"
            );
            return SchemaNode::any();
        }

        let mut schema = self.object_schema(message, walk);
        if self.options.include_comments {
            schema.description = leading_comment(&message.parent_file(), message.path());
        }
        if position == Position::Singular {
            schema.schema_type = Some(SchemaType::nullable(JsonType::Object));
        }
        schema
    }

    fn well_known_schema(&self, known: WellKnownType, position: Position) -> SchemaNode {
        let restricted = self.dialect.is_restricted();
        let nullable = |schema: SchemaNode| match position {
            Position::Singular => schema.into_nullable(),
            Position::Element => schema,
        };

        match known {
            WellKnownType::Struct if restricted => SchemaNode::of_type(JsonType::String)
                .with_description("A string representation of any JSON object. Must be valid JSON."),
            WellKnownType::Struct => SchemaNode {
                additional_properties: Some(true.into()),
                ..SchemaNode::of_type(JsonType::Object)
            }
            .with_description("A dynamic JSON object with arbitrary properties"),
            WellKnownType::Value if restricted => SchemaNode::of_type(JsonType::String)
                .with_description("A string representation of any JSON value. Must be valid JSON."),
            WellKnownType::Value => SchemaNode::any().with_description(
                "A dynamic JSON value: null, number, string, boolean, object or array",
            ),
            WellKnownType::ListValue if restricted => SchemaNode::of_type(JsonType::String)
                .with_description("A string representation of a JSON array. Must be valid JSON."),
            WellKnownType::ListValue => SchemaNode::array_of(SchemaNode::any())
                .with_description("A JSON array of dynamic values"),
            WellKnownType::Timestamp => {
                let mut schema = SchemaNode::of_type(JsonType::String)
                    .with_description("RFC 3339 timestamp, e.g. 2023-01-01T12:00:00Z");
                if !(restricted && self.options.restricted_formats == FormatPolicy::Strip) {
                    schema = schema.with_format(DATE_TIME_FORMAT);
                }
                nullable(schema)
            }
            WellKnownType::Duration => nullable(SchemaNode::of_type(JsonType::String).with_description(
                "Duration in seconds with up to nine fractional digits, suffixed with 's', e.g. 3.5s",
            )),
            WellKnownType::FieldMask => nullable(
                SchemaNode::of_type(JsonType::String)
                    .with_description("Comma-separated list of field paths"),
            ),
            WellKnownType::Any => {
                let mut properties = Properties::new();
                properties.insert(
                    "@type",
                    SchemaNode::of_type(JsonType::String)
                        .with_description("Type URL of the embedded message"),
                );
                SchemaNode {
                    properties: Some(properties),
                    required: Some(vec!["@type".to_owned()]),
                    ..SchemaNode::of_type(JsonType::Object)
                }
                .with_description("An arbitrary message identified by its @type URL")
            }
            WellKnownType::Wrapper(scalar) => nullable(scalar_schema(&scalar.kind())),
        }
    }
}

/// Kinds whose schema may be widened with `null`. Dynamic values travel as
/// exact strings in the restricted dialect and `Any` is always an object.
fn is_widenable(kind: &Kind) -> bool {
    match kind {
        Kind::Message(message) => !matches!(
            WellKnownType::of(message),
            Some(known) if known.is_dynamic() || known == WellKnownType::Any
        ),
        _ => true,
    }
}

/// A singular field of an ordinary message type. Its own comment is more
/// specific than the one on the message it refers to.
fn is_plain_message(field: &FieldDescriptor) -> bool {
    match field.kind() {
        Kind::Message(message) => {
            !field.is_map() && !field.is_list() && WellKnownType::of(&message).is_none()
        }
        _ => false,
    }
}

fn has_required_behavior(field: &FieldDescriptor) -> bool {
    let is_required =
        |value: &ProtoValue| matches!(value, ProtoValue::EnumNumber(n) if *n == FIELD_BEHAVIOR_REQUIRED);
    field.options().extensions().any(|(extension, value)| {
        extension.full_name() == FIELD_BEHAVIOR_EXTENSION
            && match value {
                ProtoValue::List(items) => items.iter().any(is_required),
                single => is_required(single),
            }
    })
}
