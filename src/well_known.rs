//! Classification of `google.protobuf` well-known types.
//!
//! These messages have dedicated protobuf-JSON encodings, so both the schema
//! generator and the compatibility rewriter special-case them by full name.

use prost_reflect::{Kind, MessageDescriptor};

/// A message type with a special JSON mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownType {
    /// `google.protobuf.Struct`: an open JSON object.
    Struct,
    /// `google.protobuf.Value`: any JSON value.
    Value,
    /// `google.protobuf.ListValue`: a JSON array.
    ListValue,
    Timestamp,
    Duration,
    FieldMask,
    /// `google.protobuf.Any`: an object whose shape depends on `@type`.
    Any,
    /// One of the nullable scalar wrappers; carries the wrapped kind.
    Wrapper(WrappedScalar),
}

/// The scalar carried by a `google.protobuf.*Value` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrappedScalar {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Uint32,
    Bool,
    String,
    Bytes,
}

impl WrappedScalar {
    /// The equivalent field kind, for feeding the type mapper.
    pub fn kind(self) -> Kind {
        match self {
            WrappedScalar::Double => Kind::Double,
            WrappedScalar::Float => Kind::Float,
            WrappedScalar::Int64 => Kind::Int64,
            WrappedScalar::Uint64 => Kind::Uint64,
            WrappedScalar::Int32 => Kind::Int32,
            WrappedScalar::Uint32 => Kind::Uint32,
            WrappedScalar::Bool => Kind::Bool,
            WrappedScalar::String => Kind::String,
            WrappedScalar::Bytes => Kind::Bytes,
        }
    }
}

impl WellKnownType {
    pub fn from_full_name(full_name: &str) -> Option<Self> {
        let known = match full_name {
            "google.protobuf.Struct" => WellKnownType::Struct,
            "google.protobuf.Value" => WellKnownType::Value,
            "google.protobuf.ListValue" => WellKnownType::ListValue,
            "google.protobuf.Timestamp" => WellKnownType::Timestamp,
            "google.protobuf.Duration" => WellKnownType::Duration,
            "google.protobuf.FieldMask" => WellKnownType::FieldMask,
            "google.protobuf.Any" => WellKnownType::Any,
            "google.protobuf.DoubleValue" => WellKnownType::Wrapper(WrappedScalar::Double),
            "google.protobuf.FloatValue" => WellKnownType::Wrapper(WrappedScalar::Float),
            "google.protobuf.Int64Value" => WellKnownType::Wrapper(WrappedScalar::Int64),
            "google.protobuf.UInt64Value" => WellKnownType::Wrapper(WrappedScalar::Uint64),
            "google.protobuf.Int32Value" => WellKnownType::Wrapper(WrappedScalar::Int32),
            "google.protobuf.UInt32Value" => WellKnownType::Wrapper(WrappedScalar::Uint32),
            "google.protobuf.BoolValue" => WellKnownType::Wrapper(WrappedScalar::Bool),
            "google.protobuf.StringValue" => WellKnownType::Wrapper(WrappedScalar::String),
            "google.protobuf.BytesValue" => WellKnownType::Wrapper(WrappedScalar::Bytes),
            _ => return None,
        };
        Some(known)
    }

    pub fn of(message: &MessageDescriptor) -> Option<Self> {
        Self::from_full_name(message.full_name())
    }

    /// Struct, Value and ListValue: the types whose canonical form is
    /// arbitrary JSON and which the restricted dialect carries as strings.
    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            WellKnownType::Struct | WellKnownType::Value | WellKnownType::ListValue
        )
    }
}
