use proto_mcp::{
    compile_content, compile_file, compile_sources, find_message, find_service, Dialect, Error,
    SchemaGenerator,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const COMMON_PROTO: &str = r#"
syntax = "proto3";
package acme.common.v1;

message Money {
  string currency_code = 1;
  int64 units = 2;
}
"#;

const ORDERS_PROTO: &str = r#"
syntax = "proto3";
package acme.orders.v1;

import "common.proto";
import "google/protobuf/timestamp.proto";

// An order line.
message Line {
  string sku = 1;
  acme.common.v1.Money price = 2;
}

message PlaceOrderRequest {
  repeated Line lines = 1;
  google.protobuf.Timestamp deliver_by = 2;
}

message PlaceOrderResponse {
  string order_id = 1;
}

service OrderService {
  rpc PlaceOrder(PlaceOrderRequest) returns (PlaceOrderResponse);
}
"#;

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should move forward")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("proto_mcp_test_{prefix}_{nanos}"));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

fn write_proto_file(path: &Path, content: &str) {
    fs::write(path, content).expect("proto file should be written");
}

#[test]
fn compile_file_resolves_sibling_imports() {
    let dir = temp_dir("imports");
    write_proto_file(&dir.join("common.proto"), COMMON_PROTO);
    write_proto_file(&dir.join("orders.proto"), ORDERS_PROTO);

    let pool = compile_file(&dir.join("orders.proto")).expect("orders.proto should compile");
    let request = find_message(&pool, "acme.orders.v1.PlaceOrderRequest")
        .expect("request message should exist");
    let money = find_message(&pool, "acme.common.v1.Money").expect("imported message should exist");
    assert_eq!(money.fields().count(), 2);

    let schema = SchemaGenerator::new(Dialect::Standard).message_schema_value(&request);
    let line = &schema["properties"]["lines"]["items"];
    assert_eq!(line["description"], "An order line.");
    assert_eq!(line["properties"]["price"]["properties"]["units"]["type"], "string");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn compile_sources_serves_imports_from_memory() {
    let pool = compile_sources(
        [("common.proto", COMMON_PROTO), ("orders.proto", ORDERS_PROTO)],
        &["orders.proto"],
    )
    .expect("in-memory sources should compile");

    let service = find_service(&pool, "acme.orders.v1.OrderService").expect("service should exist");
    assert_eq!(service.methods().count(), 1);
    assert!(pool.get_message_by_name("google.protobuf.Timestamp").is_some());
}

#[test]
fn compile_content_accepts_a_standalone_file() {
    let pool = compile_content(COMMON_PROTO).expect("standalone content should compile");
    assert!(find_message(&pool, "acme.common.v1.Money").is_ok());
}

#[test]
fn public_api_returns_clear_errors_for_invalid_inputs() {
    let missing = compile_file(Path::new("/definitely/not/here.proto"));
    assert!(matches!(missing, Err(Error::Io { .. })));

    let syntax = compile_content("syntax = \"proto3\"; message Broken { string = 1; }");
    assert!(matches!(syntax, Err(Error::Compile(_))));

    let unresolved = compile_content(ORDERS_PROTO);
    assert!(matches!(unresolved, Err(Error::Compile(_))));

    let pool = compile_content(COMMON_PROTO).expect("standalone content should compile");
    let unknown = find_message(&pool, "acme.common.v1.Nope").expect_err("lookup should fail");
    assert!(unknown.to_string().contains("unknown message type"));
    assert!(matches!(
        find_service(&pool, "acme.common.v1.Missing"),
        Err(Error::UnknownService(_))
    ));
}
