#![allow(dead_code)]

use jsonschema::{Draft, Validator};
use prost_reflect::{DescriptorPool, MessageDescriptor};
use proto_mcp::{compile_sources, Dialect, GeneratorOptions, SchemaGenerator};
use serde_json::Value;
use std::sync::OnceLock;

pub const PACKAGE: &str = "acme.items.v1";

pub const FIELD_BEHAVIOR_PROTO: &str = r#"
syntax = "proto3";
package google.api;
import "google/protobuf/descriptor.proto";

extend google.protobuf.FieldOptions {
  repeated google.api.FieldBehavior field_behavior = 1052 [packed = false];
}

enum FieldBehavior {
  FIELD_BEHAVIOR_UNSPECIFIED = 0;
  OPTIONAL = 1;
  REQUIRED = 2;
  OUTPUT_ONLY = 3;
  INPUT_ONLY = 4;
  IMMUTABLE = 5;
  UNORDERED_LIST = 6;
  NON_EMPTY_DEFAULT = 7;
  IDENTIFIER = 8;
}
"#;

pub const ITEMS_PROTO: &str = r#"
syntax = "proto3";
package acme.items.v1;

import "google/api/field_behavior.proto";
import "google/protobuf/any.proto";
import "google/protobuf/duration.proto";
import "google/protobuf/field_mask.proto";
import "google/protobuf/struct.proto";
import "google/protobuf/timestamp.proto";
import "google/protobuf/wrappers.proto";

enum Status {
  STATUS_UNSPECIFIED = 0;
  STATUS_ACTIVE = 1;
  STATUS_ARCHIVED = 2;
}

message ScalarMessage {
  int32 i32 = 1;
  sint32 s32 = 2;
  sfixed32 sf32 = 3;
  uint32 u32 = 4;
  fixed32 f32 = 5;
  int64 i64 = 6;
  sint64 s64 = 7;
  sfixed64 sf64 = 8;
  uint64 u64 = 9;
  fixed64 f64 = 10;
  float flt = 11;
  double dbl = 12;
  bool flag = 13;
  string text = 14;
  bytes blob = 15;
  Status status = 16;
  optional string nickname = 17;
  oneof choice {
    string by_name = 18;
    int32 by_id = 19;
  }
  repeated string tags = 20;
}

message WktTestMessage {
  google.protobuf.Struct struct_field = 1;
  google.protobuf.Value value_field = 2;
  google.protobuf.ListValue list_value_field = 3;
  google.protobuf.Timestamp timestamp_field = 4;
  google.protobuf.Duration duration_field = 5;
  google.protobuf.FieldMask field_mask_field = 6;
  google.protobuf.Any any_field = 7;
  google.protobuf.StringValue string_wrapper = 8;
  google.protobuf.Int64Value int64_wrapper = 9;
  repeated google.protobuf.Timestamp timestamps = 10;
  repeated google.protobuf.Struct structs = 11;
}

message Nested {
  string id = 1;
  map<string, string> attributes = 2;
  google.protobuf.Struct meta = 3;
}

message MapTestMessage {
  map<string, string> labels = 1;
  map<string, Nested> nested_by_key = 2;
  map<string, google.protobuf.Struct> struct_by_key = 3;
  map<int32, string> by_number = 4;
  repeated Nested nested_list = 5;
  Nested single_nested = 6;
}

// A node in a tree of arbitrary depth.
message TreeNode {
  string name = 1;
  TreeNode parent = 2;
  repeated TreeNode children = 3;
}

// Request to create an item.
message CreateItemRequest {
  // Human readable name.
  string name = 1 [(google.api.field_behavior) = REQUIRED];
  map<string, string> labels = 2;
  optional string note = 3 [(google.api.field_behavior) = REQUIRED];
  google.protobuf.Timestamp due = 4;
}

message Item {
  string name = 1;
}

message LabelRequest {
  string name = 1;
  map<string, string> labels = 2;
}

// Manages items.
service ItemService {
  // Creates an item.
  rpc CreateItem(CreateItemRequest) returns (Item);
  rpc WatchItems(CreateItemRequest) returns (stream Item);
}
"#;

pub const LEGACY_PROTO: &str = r#"
syntax = "proto2";
package acme.legacy;

message Legacy {
  required string id = 1;
  optional string label = 2;
  optional int32 rank = 3;
}
"#;

pub fn pool() -> &'static DescriptorPool {
    static POOL: OnceLock<DescriptorPool> = OnceLock::new();
    POOL.get_or_init(|| {
        compile_sources(
            [
                ("google/api/field_behavior.proto", FIELD_BEHAVIOR_PROTO),
                ("acme/items/v1/items.proto", ITEMS_PROTO),
                ("acme/legacy/legacy.proto", LEGACY_PROTO),
            ],
            &["acme/items/v1/items.proto", "acme/legacy/legacy.proto"],
        )
        .expect("fixture protos should compile")
    })
}

/// A message from the fixture package by its short name.
pub fn message(name: &str) -> MessageDescriptor {
    let full_name = if name.contains('.') {
        name.to_owned()
    } else {
        format!("{PACKAGE}.{name}")
    };
    pool()
        .get_message_by_name(&full_name)
        .unwrap_or_else(|| panic!("fixture message {full_name} should exist"))
}

pub fn generator(dialect: Dialect) -> SchemaGenerator {
    SchemaGenerator::with_options(
        dialect,
        GeneratorOptions {
            include_comments: false,
            ..GeneratorOptions::default()
        },
    )
}

pub fn schema(dialect: Dialect, name: &str) -> Value {
    generator(dialect).message_schema_value(&message(name))
}

pub fn validator(schema: &Value) -> Validator {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .expect("generated schema should compile")
}

pub fn property<'a>(schema: &'a Value, name: &str) -> &'a Value {
    schema
        .get("properties")
        .and_then(|properties| properties.get(name))
        .unwrap_or_else(|| panic!("property {name} should exist"))
}

pub fn required_names(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub fn property_names(schema: &Value) -> Vec<&str> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
