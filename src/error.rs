//! Error type for the fallible parts of the crate.
//!
//! Schema generation, the compatibility rewrite, the extra-property
//! augmenter and the error normalizer never fail; they degrade instead.
//! Only descriptor loading and canonical argument decoding return errors.

use std::path::PathBuf;

/// Errors raised while loading descriptors or decoding tool arguments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read proto file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile proto sources: {0}")]
    Compile(#[from] protox::Error),

    #[error("failed to build descriptor pool: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    #[error("unknown message type: {0}")]
    UnknownMessage(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("tool arguments must be a JSON object")]
    ArgumentsNotObject,

    #[error("failed to decode arguments for {message}: {source}")]
    Decode {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
