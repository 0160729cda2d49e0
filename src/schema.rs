//! JSON Schema data model and the scalar type mapper.
//!
//! [`SchemaNode`] covers the subset of JSON Schema the generator emits.
//! Serialization skips unset keywords, and properties keep insertion order
//! so generated documents follow field declaration order.

use prost_reflect::Kind;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A JSON Schema primitive type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

/// The `type` keyword: one name, or a union such as `["string", "null"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(JsonType),
    Union(Vec<JsonType>),
}

impl SchemaType {
    pub fn nullable(ty: JsonType) -> Self {
        SchemaType::Union(vec![ty, JsonType::Null])
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            SchemaType::Single(ty) => *ty == JsonType::Null,
            SchemaType::Union(types) => types.contains(&JsonType::Null),
        }
    }

    /// The single concrete type, when this is not a union.
    pub fn single(&self) -> Option<JsonType> {
        match self {
            SchemaType::Single(ty) => Some(*ty),
            SchemaType::Union(_) => None,
        }
    }
}

impl From<JsonType> for SchemaType {
    fn from(ty: JsonType) -> Self {
        SchemaType::Single(ty)
    }
}

/// `additionalProperties`: a flag or a schema for the extra values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

impl From<bool> for AdditionalProperties {
    fn from(allowed: bool) -> Self {
        AdditionalProperties::Allowed(allowed)
    }
}

impl From<SchemaNode> for AdditionalProperties {
    fn from(schema: SchemaNode) -> Self {
        AdditionalProperties::Schema(Box::new(schema))
    }
}

/// Object properties in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, SchemaNode)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the first position of a repeated name.
    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaNode) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = schema,
            None => self.0.push((name, schema)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, schema)| schema)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.0.iter().map(|(name, schema)| (name.as_str(), schema))
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

/// One JSON Schema fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub definitions: Option<BTreeMap<String, SchemaNode>>,
}

impl SchemaNode {
    /// The unconstrained schema `{}`.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn of_type(ty: impl Into<SchemaType>) -> Self {
        Self {
            schema_type: Some(ty.into()),
            ..Self::default()
        }
    }

    pub fn array_of(items: SchemaNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type(JsonType::Array)
        }
    }

    pub fn ref_to(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn is_nullable(&self) -> bool {
        self.schema_type
            .as_ref()
            .is_some_and(SchemaType::is_nullable)
    }

    /// Widen a single concrete `type` to `[type, "null"]`.
    ///
    /// Unions and untyped schemas are returned as they are. An `enum` list
    /// gains `null` so the widened type stays satisfiable.
    pub fn into_nullable(mut self) -> Self {
        let Some(ty) = self.schema_type.as_ref().and_then(SchemaType::single) else {
            return self;
        };
        if ty == JsonType::Null {
            return self;
        }
        self.schema_type = Some(SchemaType::nullable(ty));
        if let Some(values) = self.enum_values.as_mut() {
            if !values.contains(&Value::Null) {
                values.push(Value::Null);
            }
        }
        self
    }

    pub fn to_value(&self) -> Value {
        // Every key is a string and every leaf is JSON-native.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Map a field kind to its JSON Schema primitive type.
///
/// 64-bit integers are strings, since JSON numbers lose precision past 2^53.
/// Bytes are base64 strings and enums are their symbolic names.
pub fn kind_to_json_type(kind: &Kind) -> JsonType {
    match kind {
        Kind::Bool => JsonType::Boolean,
        Kind::String | Kind::Bytes | Kind::Enum(_) => JsonType::String,
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Uint32 | Kind::Fixed32 => {
            JsonType::Integer
        }
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 | Kind::Uint64 | Kind::Fixed64 => {
            JsonType::String
        }
        Kind::Float | Kind::Double => JsonType::Number,
        Kind::Message(_) => JsonType::Object,
    }
}

/// Schema for a scalar or enum kind, including its encoding annotations.
pub fn scalar_schema(kind: &Kind) -> SchemaNode {
    let mut schema = SchemaNode::of_type(kind_to_json_type(kind));
    match kind {
        Kind::Bytes => schema.content_encoding = Some("base64".to_owned()),
        Kind::Enum(descriptor) => {
            schema.enum_values = Some(
                descriptor
                    .values()
                    .map(|value| Value::String(value.name().to_owned()))
                    .collect(),
            );
        }
        _ => {}
    }
    schema
}
