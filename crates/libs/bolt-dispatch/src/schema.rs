//! Catalogue of message schemas.
//!
//! Structures are stored as opaque JSON values. Nothing here interprets or
//! validates them.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::error::DispatchError;

#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, JsonValue>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `structure` under `name`.
    ///
    /// Fails with [`DispatchError::DuplicateSchema`] when the name is taken;
    /// the registry is left untouched in that case.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        structure: JsonValue,
    ) -> Result<(), DispatchError> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            log::warn!("schema: rejecting duplicate registration of {}", name);
            return Err(DispatchError::DuplicateSchema { name });
        }

        log::debug!("schema: registered {}", name);
        self.schemas.insert(name, structure);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&JsonValue, DispatchError> {
        self.schemas
            .get(name)
            .ok_or_else(|| DispatchError::SchemaNotFound { name: name.to_owned() })
    }

    /// Names of all registered schemas, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &str> + '_ {
        self.schemas.keys().map(String::as_str)
    }

    /// Remove `name` if registered. Missing names are not an error.
    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        let removed = self.schemas.remove(name);
        if removed.is_some() {
            log::debug!("schema: removed {}", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
