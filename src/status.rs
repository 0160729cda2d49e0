//! Canonical rendering of RPC failures.
//!
//! Every failure that reaches a tool call is reported in one shape,
//! whatever transport produced it:
//!
//! ```json
//! {"code": "INVALID_ARGUMENT", "message": "...", "details": [{"@type": "...", ...}]}
//! ```
//!
//! A [`tonic::Status`] anywhere in the error's source chain wins. Failing
//! that, a [`ConnectError`] is converted to the same shape. Any other error
//! becomes `UNKNOWN` carrying its display text.

use crate::proto_parser::compile_sources;
use crate::tool::CallToolResult;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use prost::Message as _;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::Any;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::error::Error as StdError;
use std::sync::OnceLock;
use tonic::Code;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

const STATUS_PROTO: &str = include_str!("../proto/google/rpc/status.proto");
const ERROR_DETAILS_PROTO: &str = include_str!("../proto/google/rpc/error_details.proto");

const BUILTIN_ROOTS: &[&str] = &[
    "google/rpc/status.proto",
    "google/rpc/error_details.proto",
    "google/protobuf/wrappers.proto",
    "google/protobuf/struct.proto",
    "google/protobuf/timestamp.proto",
    "google/protobuf/field_mask.proto",
    "google/protobuf/empty.proto",
];

// Connect encodes detail payloads without padding but accepts either.
const CONNECT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Wire form of `google.rpc.Status`, as carried in gRPC status details.
#[derive(Clone, PartialEq, prost::Message)]
struct RpcStatus {
    #[prost(int32, tag = "1")]
    code: i32,
    #[prost(string, tag = "2")]
    message: String,
    #[prost(message, repeated, tag = "3")]
    details: Vec<Any>,
}

/// The transport-neutral failure shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStatus {
    /// Upper-snake gRPC code name, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
    /// Detail messages in protobuf-JSON `Any` form, in their original order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,
}

/// A Connect protocol error, as found in a Connect JSON error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ConnectError {
    /// Lower-snake code name, e.g. `invalid_argument`.
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ConnectErrorDetail>,
}

/// One detail of a [`ConnectError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectErrorDetail {
    /// Fully-qualified message name, without a type URL prefix.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Base64 of the encoded message.
    pub value: String,
}

impl ConnectError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code: connect_code_name(code).to_owned(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Attach an encoded message as a detail.
    pub fn with_detail(mut self, type_name: impl Into<String>, encoded: &[u8]) -> Self {
        self.details.push(ConnectErrorDetail {
            type_name: type_name.into(),
            value: STANDARD_NO_PAD.encode(encoded),
        });
        self
    }

    /// Parse a Connect JSON error body.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// The gRPC code for this error's code string. Unrecognized strings map
    /// to [`Code::Unknown`].
    pub fn grpc_code(&self) -> Code {
        match self.code.as_str() {
            "ok" => Code::Ok,
            "canceled" | "cancelled" => Code::Cancelled,
            "invalid_argument" => Code::InvalidArgument,
            "deadline_exceeded" => Code::DeadlineExceeded,
            "not_found" => Code::NotFound,
            "already_exists" => Code::AlreadyExists,
            "permission_denied" => Code::PermissionDenied,
            "resource_exhausted" => Code::ResourceExhausted,
            "failed_precondition" => Code::FailedPrecondition,
            "aborted" => Code::Aborted,
            "out_of_range" => Code::OutOfRange,
            "unimplemented" => Code::Unimplemented,
            "internal" => Code::Internal,
            "unavailable" => Code::Unavailable,
            "data_loss" => Code::DataLoss,
            "unauthenticated" => Code::Unauthenticated,
            _ => Code::Unknown,
        }
    }

    /// Details as `Any` messages. A payload that is not base64 keeps its
    /// original text as `Err`.
    fn details_as_any(&self) -> Vec<Result<Any, (String, &str)>> {
        self.details
            .iter()
            .map(|detail| {
                let type_url = format!("{TYPE_URL_PREFIX}{}", detail.type_name);
                match CONNECT_BASE64.decode(&detail.value) {
                    Ok(value) => Ok(Any { type_url, value }),
                    Err(err) => {
                        tracing::debug!(detail_type = %detail.type_name, %err, "connect detail is not base64");
                        Err((type_url, detail.value.as_str()))
                    }
                }
            })
            .collect()
    }
}

/// Canonical upper-snake name of a gRPC code.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}

fn connect_code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "ok",
        Code::Cancelled => "canceled",
        Code::Unknown => "unknown",
        Code::InvalidArgument => "invalid_argument",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::NotFound => "not_found",
        Code::AlreadyExists => "already_exists",
        Code::PermissionDenied => "permission_denied",
        Code::ResourceExhausted => "resource_exhausted",
        Code::FailedPrecondition => "failed_precondition",
        Code::Aborted => "aborted",
        Code::OutOfRange => "out_of_range",
        Code::Unimplemented => "unimplemented",
        Code::Internal => "internal",
        Code::Unavailable => "unavailable",
        Code::DataLoss => "data_loss",
        Code::Unauthenticated => "unauthenticated",
    }
}

/// Build a [`tonic::Status`] whose details carry a `google.rpc.Status` with
/// the given detail messages, the way gRPC servers attach rich errors.
pub fn status_with_details(code: Code, message: impl Into<String>, details: Vec<Any>) -> tonic::Status {
    let message = message.into();
    let encoded = RpcStatus {
        code: code as i32,
        message: message.clone(),
        details,
    }
    .encode_to_vec();
    tonic::Status::with_details(code, message, encoded.into())
}

/// The descriptors every normalizer can render: google.rpc status and error
/// details plus the protobuf well-known types.
pub fn builtin_pool() -> Option<&'static DescriptorPool> {
    static POOL: OnceLock<Option<DescriptorPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        let sources = [
            ("google/rpc/status.proto", STATUS_PROTO),
            ("google/rpc/error_details.proto", ERROR_DETAILS_PROTO),
        ];
        match compile_sources(sources, BUILTIN_ROOTS) {
            Ok(pool) => Some(pool),
            Err(err) => {
                tracing::warn!(%err, "failed to build the error detail registry");
                None
            }
        }
    })
    .as_ref()
}

/// Turns call failures into [`CanonicalStatus`] values and tool results.
///
/// Detail messages are rendered through a descriptor registry: a caller pool
/// first (for application-defined detail types), then [`builtin_pool`].
#[derive(Debug, Clone, Default)]
pub struct ErrorNormalizer {
    pool: Option<DescriptorPool>,
}

impl ErrorNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also resolve detail types from `pool`.
    pub fn with_pool(pool: DescriptorPool) -> Self {
        Self { pool: Some(pool) }
    }

    /// Convert a failure into a tool result, or `None` when there is none.
    ///
    /// The result text is the JSON of the canonical status. If that cannot
    /// be produced the text falls back to `Error: <message>`.
    pub fn handle_error(&self, err: Option<&(dyn StdError + 'static)>) -> Option<CallToolResult> {
        let err = err?;
        let status = self.normalize(err);
        let text = serde_json::to_string(&status).unwrap_or_else(|render_err| {
            tracing::debug!(%render_err, "failed to render canonical status");
            format!("Error: {err}")
        });
        Some(CallToolResult::error(text))
    }

    /// The canonical status for a failure.
    pub fn normalize(&self, err: &(dyn StdError + 'static)) -> CanonicalStatus {
        if let Some(status) = find_in_chain::<tonic::Status>(err) {
            tracing::debug!(code = ?status.code(), "normalizing gRPC status");
            return self.normalize_tonic(status);
        }
        if let Some(connect) = find_in_chain::<ConnectError>(err) {
            tracing::debug!(code = %connect.code, "normalizing connect error");
            return self.normalize_connect(connect);
        }
        tracing::debug!("normalizing unstructured error as UNKNOWN");
        CanonicalStatus {
            code: code_name(Code::Unknown).to_owned(),
            message: err.to_string(),
            details: Vec::new(),
        }
    }

    pub fn normalize_tonic(&self, status: &tonic::Status) -> CanonicalStatus {
        let details = if status.details().is_empty() {
            Vec::new()
        } else {
            match RpcStatus::decode(status.details()) {
                Ok(rpc) => rpc.details,
                Err(err) => {
                    tracing::debug!(%err, "status details are not a google.rpc.Status");
                    Vec::new()
                }
            }
        };
        CanonicalStatus {
            code: code_name(status.code()).to_owned(),
            message: status.message().to_owned(),
            details: self.render_details(&details),
        }
    }

    pub fn normalize_connect(&self, err: &ConnectError) -> CanonicalStatus {
        CanonicalStatus {
            code: code_name(err.grpc_code()).to_owned(),
            message: err.message.clone(),
            details: err
                .details_as_any()
                .into_iter()
                .map(|detail| match detail {
                    Ok(any) => self.render_detail(&any),
                    Err((type_url, text)) => json!({ "@type": type_url, "value": text }),
                })
                .collect(),
        }
    }

    fn render_details(&self, details: &[Any]) -> Vec<Value> {
        details.iter().map(|any| self.render_detail(any)).collect()
    }

    /// Render one detail like protobuf-JSON renders an `Any`. Types the
    /// registry does not know keep their payload as base64 under `value`.
    fn render_detail(&self, any: &Any) -> Value {
        let type_name = any.type_url.rsplit('/').next().unwrap_or_default();
        let decoded = self.find_message(type_name).and_then(|descriptor| {
            DynamicMessage::decode(descriptor, any.value.as_slice())
                .map_err(|err| tracing::debug!(%type_name, %err, "undecodable status detail"))
                .ok()
        });
        let json = decoded.and_then(|message| serde_json::to_value(&message).ok());

        let mut rendered = Map::new();
        rendered.insert("@type".to_owned(), Value::String(any.type_url.clone()));
        match json {
            Some(Value::Object(fields)) => rendered.extend(fields),
            Some(other) => {
                rendered.insert("value".to_owned(), other);
            }
            None => {
                rendered.insert("value".to_owned(), Value::String(STANDARD.encode(&any.value)));
            }
        }
        Value::Object(rendered)
    }

    fn find_message(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.pool
            .as_ref()
            .and_then(|pool| pool.get_message_by_name(full_name))
            .or_else(|| builtin_pool()?.get_message_by_name(full_name))
    }
}

/// [`ErrorNormalizer::handle_error`] with the built-in registry.
pub fn handle_error(err: Option<&(dyn StdError + 'static)>) -> Option<CallToolResult> {
    ErrorNormalizer::new().handle_error(err)
}

fn find_in_chain<'a, T: StdError + 'static>(err: &'a (dyn StdError + 'static)) -> Option<&'a T> {
    std::iter::successors(Some(err), |&current| current.source())
        .find_map(|current| current.downcast_ref::<T>())
}
