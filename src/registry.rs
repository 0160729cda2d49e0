//! Memoized schema generation.
//!
//! Generation is a pure function of (descriptor, dialect, options), so the
//! result for a message can be computed once and shared. A registry is
//! meant to serve a single descriptor pool: entries are keyed by the
//! message's full name.

use crate::config::{Dialect, GeneratorOptions};
use crate::generator::SchemaGenerator;
use crate::schema::SchemaNode;
use prost_reflect::MessageDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type CacheKey = (String, Dialect);

/// Thread-safe cache of generated root schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    options: GeneratorOptions,
    entries: RwLock<HashMap<CacheKey, Arc<SchemaNode>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeneratorOptions) -> Self {
        Self {
            options,
            entries: RwLock::default(),
        }
    }

    /// The root schema for `message` in `dialect`, generated on first use.
    pub fn schema(&self, message: &MessageDescriptor, dialect: Dialect) -> Arc<SchemaNode> {
        let key = (message.full_name().to_owned(), dialect);
        if let Some(cached) = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).cloned())
        {
            return cached;
        }

        let generated = Arc::new(
            SchemaGenerator::with_options(dialect, self.options.clone()).message_schema(message),
        );
        match self.entries.write() {
            Ok(mut entries) => Arc::clone(entries.entry(key).or_insert(generated)),
            // A poisoned cache still yields a correct schema, just uncached.
            Err(_) => generated,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}
