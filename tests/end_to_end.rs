mod common;

use common::{message, pool, required_names, schema, validator};
use proto_mcp::tool::tool_name;
use proto_mcp::{
    decode_arguments, find_service, restore_canonical_value, tool_for_method, tools_for_service,
    Dialect, Error, ExtraProperty, SchemaGenerator, SchemaRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn canonical_json(decoded: &proto_mcp::DecodedArguments) -> Value {
    serde_json::to_value(&decoded.request).expect("decoded request should serialize")
}

#[test]
fn restricted_map_arguments_round_trip_to_canonical_form() {
    let restricted = schema(Dialect::RestrictedCompat, "LabelRequest");
    let standard = schema(Dialect::Standard, "LabelRequest");
    assert_eq!(required_names(&restricted), vec!["name", "labels"]);

    let input = json!({"name": "n", "labels": [{"key": "k", "value": "v"}]});
    assert!(validator(&restricted).is_valid(&input));
    assert!(!validator(&standard).is_valid(&input));

    let mut rewritten = input.clone();
    restore_canonical_value(&message("LabelRequest"), &mut rewritten);
    assert_eq!(rewritten, json!({"name": "n", "labels": {"k": "v"}}));
    assert!(validator(&standard).is_valid(&rewritten));

    let decoded = decode_arguments(&message("LabelRequest"), Dialect::RestrictedCompat, input, &[])
        .expect("restricted arguments should decode");
    assert_eq!(
        canonical_json(&decoded),
        json!({"name": "n", "labels": {"k": "v"}})
    );
}

#[test]
fn minimal_instances_validate_and_decode_in_both_dialects() {
    let cases = [
        (
            "ScalarMessage",
            json!({
                "i32": 0, "s32": 0, "sf32": 0, "u32": 0, "f32": 0,
                "i64": "0", "s64": "0", "sf64": "0", "u64": "0", "f64": "0",
                "flt": 0, "dbl": 0, "flag": false, "text": "", "blob": "",
                "status": "STATUS_UNSPECIFIED"
            }),
            json!({
                "i32": 0, "s32": 0, "sf32": 0, "u32": 0, "f32": 0,
                "i64": "0", "s64": "0", "sf64": "0", "u64": "0", "f64": "0",
                "flt": 0, "dbl": 0, "flag": false, "text": "", "blob": "",
                "status": "STATUS_UNSPECIFIED",
                "nickname": null, "by_name": null, "by_id": null, "tags": []
            }),
        ),
        (
            "WktTestMessage",
            json!({}),
            json!({
                "struct_field": "{}",
                "value_field": "null",
                "list_value_field": "[]",
                "timestamp_field": null,
                "duration_field": null,
                "field_mask_field": null,
                "any_field": {"@type": "type.googleapis.com/google.protobuf.Duration", "value": "1s"},
                "string_wrapper": null,
                "int64_wrapper": null,
                "timestamps": [],
                "structs": []
            }),
        ),
        (
            "MapTestMessage",
            json!({}),
            json!({
                "labels": [],
                "nested_by_key": [],
                "struct_by_key": [],
                "by_number": [],
                "nested_list": [],
                "single_nested": null
            }),
        ),
        (
            "TreeNode",
            json!({"name": ""}),
            json!({"name": "", "parent": null, "children": []}),
        ),
        (
            "CreateItemRequest",
            json!({"name": "widget", "note": ""}),
            json!({"name": "widget", "labels": [], "note": "", "due": null}),
        ),
        (
            "acme.legacy.Legacy",
            json!({"id": "1"}),
            json!({"id": "1", "label": null, "rank": null}),
        ),
    ];

    for (name, standard_instance, restricted_instance) in cases {
        for (dialect, instance) in [
            (Dialect::Standard, standard_instance),
            (Dialect::RestrictedCompat, restricted_instance),
        ] {
            let schema = schema(dialect, name);
            assert!(
                validator(&schema).is_valid(&instance),
                "{name} {dialect:?}: {instance}"
            );
            if let Err(err) = decode_arguments(&message(name), dialect, instance, &[]) {
                panic!("{name} {dialect:?} should decode: {err}");
            }
        }
    }
}

#[test]
fn restricted_arguments_decode_with_nested_maps_and_dynamic_values() {
    let args = json!({
        "labels": [{"key": "env", "value": "prod"}],
        "nested_by_key": [
            {"key": "a", "value": {"id": "1", "attributes": [{"key": "k", "value": "v"}], "meta": "{\"x\": 1}"}}
        ],
        "struct_by_key": [{"key": "s", "value": "{\"on\": true}"}],
        "by_number": [{"key": "7", "value": "seven"}],
        "nested_list": [],
        "single_nested": null
    });

    let decoded = decode_arguments(&message("MapTestMessage"), Dialect::RestrictedCompat, args, &[])
        .expect("restricted arguments should decode");
    assert_eq!(
        canonical_json(&decoded),
        json!({
            "labels": {"env": "prod"},
            "nestedByKey": {"a": {"id": "1", "attributes": {"k": "v"}, "meta": {"x": 1.0}}},
            "structByKey": {"s": {"on": true}},
            "byNumber": {"7": "seven"}
        })
    );
}

#[test]
fn restricted_oneof_arguments_decode_with_one_member_picked() {
    let args = json!({
        "i32": 1, "s32": 0, "sf32": 0, "u32": 0, "f32": 0,
        "i64": "0", "s64": "0", "sf64": "0", "u64": "0", "f64": "0",
        "flt": 0, "dbl": 0, "flag": false, "text": "", "blob": "",
        "status": "STATUS_ACTIVE",
        "nickname": null, "by_name": null, "by_id": 7, "tags": []
    });
    assert!(validator(&schema(Dialect::RestrictedCompat, "ScalarMessage")).is_valid(&args));

    let decoded = decode_arguments(&message("ScalarMessage"), Dialect::RestrictedCompat, args, &[])
        .expect("a single picked oneof member should decode");
    assert_eq!(
        canonical_json(&decoded),
        json!({"i32": 1, "status": "STATUS_ACTIVE", "byId": 7})
    );
}

#[test]
fn extras_are_removed_before_decoding() {
    let extras = [
        ExtraProperty::new("base_url", "Base URL for the API").required(),
        ExtraProperty::new("api_key", "API key"),
    ];
    let args = json!({
        "name": "n",
        "labels": {"k": "v"},
        "base_url": "https://api.example.com"
    });

    let decoded = decode_arguments(&message("LabelRequest"), Dialect::Standard, args, &extras)
        .expect("arguments should decode once extras are removed");
    assert_eq!(decoded.extras.len(), 1);
    assert_eq!(decoded.extras["base_url"], "https://api.example.com");
    assert_eq!(
        canonical_json(&decoded),
        json!({"name": "n", "labels": {"k": "v"}})
    );
}

#[test]
fn decode_errors_are_reported() {
    let not_object = decode_arguments(&message("LabelRequest"), Dialect::Standard, json!([1]), &[]);
    assert!(matches!(not_object, Err(Error::ArgumentsNotObject)));

    let unknown_field = decode_arguments(
        &message("LabelRequest"),
        Dialect::Standard,
        json!({"name": "n", "colour": "red"}),
        &[],
    );
    match unknown_field {
        Err(Error::Decode { message, .. }) => assert_eq!(message, "acme.items.v1.LabelRequest"),
        other => panic!("expected a decode error, got {other:?}"),
    }

    // A restricted pair list is not canonical JSON.
    let pair_list = decode_arguments(
        &message("LabelRequest"),
        Dialect::Standard,
        json!({"labels": [{"key": "k", "value": "v"}]}),
        &[],
    );
    assert!(pair_list.is_err());
}

#[test]
fn services_become_tools_named_after_their_methods() {
    let service = find_service(pool(), "acme.items.v1.ItemService").expect("service should exist");
    let generator = SchemaGenerator::new(Dialect::RestrictedCompat);
    let extras = [ExtraProperty::new("base_url", "Base URL for the API").required()];

    let tools = tools_for_service(&generator, &service, &extras);
    assert_eq!(tools.len(), 1, "streaming methods are skipped");

    let tool = &tools[0];
    assert_eq!(tool.name, "acme_items_v1_ItemService_CreateItem");
    assert_eq!(tool.description.as_deref(), Some("Creates an item."));
    assert_eq!(tool.input_schema["type"], "object");
    assert_eq!(tool.input_schema["description"], "Request to create an item.");
    assert_eq!(
        required_names(&tool.input_schema),
        vec!["name", "labels", "note", "due", "base_url"]
    );

    let serialized = serde_json::to_value(tool).expect("tool should serialize");
    assert!(serialized.get("inputSchema").is_some());
}

#[test]
fn tool_descriptions_follow_comment_settings() {
    let service = find_service(pool(), "acme.items.v1.ItemService").expect("service should exist");
    let method = service
        .methods()
        .find(|method| method.name() == "WatchItems")
        .expect("method should exist");
    assert_eq!(tool_name(&method), "acme_items_v1_ItemService_WatchItems");

    let tool = tool_for_method(&common::generator(Dialect::Standard), &method, &[]);
    assert!(tool.description.is_none());
    assert!(tool.input_schema.get("description").is_none());
}

#[test]
fn registry_memoizes_per_message_and_dialect() {
    let registry = SchemaRegistry::new();
    let descriptor = message("TreeNode");

    let first = registry.schema(&descriptor, Dialect::Standard);
    let again = registry.schema(&descriptor, Dialect::Standard);
    assert!(Arc::ptr_eq(&first, &again));

    let restricted = registry.schema(&descriptor, Dialect::RestrictedCompat);
    assert!(!Arc::ptr_eq(&first, &restricted));
    assert_eq!(registry.len(), 2);

    let fresh = SchemaGenerator::new(Dialect::RestrictedCompat).message_schema(&descriptor);
    assert_eq!(*restricted, fresh);

    registry.clear();
    assert!(registry.is_empty());
}

#[test]
fn registry_is_shareable_across_threads() {
    let registry = Arc::new(SchemaRegistry::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry
                    .schema(&message("MapTestMessage"), Dialect::RestrictedCompat)
                    .to_value()
            })
        })
        .collect();

    let schemas: Vec<Value> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread should finish"))
        .collect();
    assert!(schemas.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(registry.len(), 1);
}
