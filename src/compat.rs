//! Repairs arguments produced against a restricted-dialect schema.
//!
//! The restricted dialect flattens two shapes the canonical protobuf-JSON
//! decoder expects: maps arrive as `[{"key": k, "value": v}, ...]` and
//! `Struct` / `Value` / `ListValue` arrive as JSON text. This module undoes
//! both, walking the descriptor rather than the object so unknown keys are
//! left alone.
//!
//! The restricted dialect also requires every oneof member, so callers send
//! `null` for the members they do not pick. Those keys are removed, since
//! the canonical decoder counts a present member as set even when it is
//! `null`.
//!
//! The rewrite never fails. Anything it cannot interpret is kept as is and
//! left for the canonical decoder to reject. Apart from dropping `null`
//! oneof members, running it on an argument object that is already
//! canonical changes nothing.

use crate::well_known::WellKnownType;
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use serde_json::{Map, Value};

/// Rewrite `args`, an encoded `message`, into canonical form in place.
pub fn restore_canonical(message: &MessageDescriptor, args: &mut Map<String, Value>) {
    for field in message.fields() {
        if is_nullable_oneof_member(&field) {
            for key in [field.name(), field.json_name()] {
                if args.get(key).is_some_and(Value::is_null) {
                    args.remove(key);
                }
            }
        }
        if let Some(value) = field_value_mut(args, &field) {
            rewrite_field(&field, value);
        }
    }
}

// `null` is a real value for `google.protobuf.Value`, so those members stay.
fn is_nullable_oneof_member(field: &FieldDescriptor) -> bool {
    if field.containing_oneof().is_none() {
        return false;
    }
    match field.kind() {
        Kind::Message(message) => WellKnownType::of(&message) != Some(WellKnownType::Value),
        _ => true,
    }
}

/// Like [`restore_canonical`], for a value that should hold an object.
/// Anything other than an object is left untouched.
pub fn restore_canonical_value(message: &MessageDescriptor, value: &mut Value) {
    if let Value::Object(args) = value {
        restore_canonical(message, args);
    }
}

// Schemas are keyed by proto field name, but callers may hand over
// camelCase JSON names as well.
fn field_value_mut<'a>(
    args: &'a mut Map<String, Value>,
    field: &FieldDescriptor,
) -> Option<&'a mut Value> {
    let key = if args.contains_key(field.name()) {
        field.name()
    } else {
        field.json_name()
    };
    args.get_mut(key)
}

fn rewrite_field(field: &FieldDescriptor, value: &mut Value) {
    let Kind::Message(message) = field.kind() else {
        return;
    };
    if field.is_map() {
        restore_map(&message.map_entry_value_field().kind(), value);
    } else if field.is_list() {
        if let Value::Array(items) = value {
            for item in items {
                rewrite_message_value(&message, item);
            }
        }
    } else {
        rewrite_message_value(&message, value);
    }
}

fn rewrite_message_value(message: &MessageDescriptor, value: &mut Value) {
    match WellKnownType::of(message) {
        Some(known) if known.is_dynamic() => parse_dynamic(known, value),
        Some(_) => {}
        None => restore_canonical_value(message, value),
    }
}

/// Turn a key/value pair list into an object. Entries without a string
/// `key` or without a `value` are dropped; a repeated key keeps the last
/// value. An object is already canonical and stays as it is.
fn restore_map(value_kind: &Kind, value: &mut Value) {
    let Value::Array(pairs) = value else {
        return;
    };

    let mut map = Map::new();
    for pair in std::mem::take(pairs) {
        let Value::Object(mut pair) = pair else {
            tracing::debug!("dropping map entry that is not an object");
            continue;
        };
        let (Some(Value::String(key)), Some(entry_value)) = (pair.remove("key"), pair.remove("value"))
        else {
            tracing::debug!("dropping map entry without a string key and a value");
            continue;
        };
        map.insert(key, entry_value);
    }

    if let Kind::Message(message) = value_kind {
        for entry_value in map.values_mut() {
            rewrite_message_value(message, entry_value);
        }
    }
    *value = Value::Object(map);
}

/// Parse JSON text carried in place of a dynamic well-known value. The
/// parsed value must fit the type: an object for `Struct`, an array for
/// `ListValue`, anything for `Value`.
fn parse_dynamic(known: WellKnownType, value: &mut Value) {
    let Value::String(text) = value else {
        return;
    };
    if text.is_empty() {
        return;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) if fits(known, &parsed) => *value = parsed,
        Ok(_) => tracing::debug!(?known, "JSON payload does not match the field type, leaving it"),
        Err(err) => tracing::debug!(?known, %err, "payload is not valid JSON, leaving it"),
    }
}

fn fits(known: WellKnownType, parsed: &Value) -> bool {
    match known {
        WellKnownType::Struct => parsed.is_object(),
        WellKnownType::ListValue => parsed.is_array(),
        _ => true,
    }
}
