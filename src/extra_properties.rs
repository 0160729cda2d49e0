//! Caller-supplied parameters that live beside the request message.
//!
//! A tool may accept values that are not part of the protobuf request, such
//! as credentials or a base URL. They are merged into the published schema as
//! plain string properties and pulled back out of the arguments before the
//! request is decoded.
//!
//! Schema edits work on serialized documents and never fail. A document that
//! does not parse is handed back byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Default name of the property added by [`add_base_url_property`].
pub const BASE_URL_PROPERTY: &str = "base_url";

/// A string parameter merged into a tool's input schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraProperty {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ExtraProperty {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn schema(&self) -> Value {
        json!({ "type": "string", "description": self.description })
    }
}

/// Merge `extras` into the schema document `schema`.
///
/// Each extra becomes a `{"type": "string"}` property; required ones are
/// appended to `required` after the existing names, once each. An unparsable document,
/// or an empty `extras`, yields the input unchanged.
pub fn add_extra_properties(schema: &str, extras: &[ExtraProperty]) -> String {
    if extras.is_empty() {
        return schema.to_owned();
    }
    edit_document(schema, |document| augment_schema(document, extras))
}

/// Add a required `format: "uri"` string property named `name`.
pub fn add_base_url_property(schema: &str, name: &str, description: &str) -> String {
    edit_document(schema, |document| {
        insert_property(
            document,
            name,
            json!({ "type": "string", "format": "uri", "description": description }),
            true,
        );
    })
}

/// [`add_extra_properties`] on an already parsed document. A document that is
/// not an object is left as is.
pub fn augment_schema(schema: &mut Value, extras: &[ExtraProperty]) {
    for extra in extras {
        insert_property(schema, &extra.name, extra.schema(), extra.required);
    }
}

/// Remove every declared extra from `args`, returning the removed values by
/// name. Extras absent from `args` are simply missing from the result.
pub fn extract_extra_properties(
    args: &mut Map<String, Value>,
    extras: &[ExtraProperty],
) -> BTreeMap<String, Value> {
    extras
        .iter()
        .filter_map(|extra| {
            args.remove(&extra.name)
                .map(|value| (extra.name.clone(), value))
        })
        .collect()
}

fn edit_document(schema: &str, edit: impl FnOnce(&mut Value)) -> String {
    let mut document = match serde_json::from_str::<Value>(schema) {
        Ok(document @ Value::Object(_)) => document,
        Ok(_) => {
            tracing::debug!("schema document is not an object, leaving it unchanged");
            return schema.to_owned();
        }
        Err(err) => {
            tracing::debug!(%err, "schema document does not parse, leaving it unchanged");
            return schema.to_owned();
        }
    };
    edit(&mut document);
    serde_json::to_string(&document).unwrap_or_else(|_| schema.to_owned())
}

fn insert_property(schema: &mut Value, name: &str, property: Value, required: bool) {
    let Value::Object(document) = schema else {
        return;
    };

    let properties = document
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if !properties.is_object() {
        *properties = Value::Object(Map::new());
    }
    if let Value::Object(properties) = properties {
        properties.insert(name.to_owned(), property);
    }

    if required {
        match document.get_mut("required") {
            Some(Value::Array(names)) => {
                if !names.iter().any(|existing| existing.as_str() == Some(name)) {
                    names.push(Value::String(name.to_owned()));
                }
            }
            _ => {
                document.insert("required".to_owned(), json!([name]));
            }
        }
    }
}
