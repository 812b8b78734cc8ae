//! Per-user session storage
//!
//! The web layer owns the real session backend. Guard code only needs to read
//! a value and to initialize one atomically, so that two concurrent requests
//! on the same session never race to store two different values.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::error::Result;

/// Mapping-like store scoped to one user session
pub trait SessionStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Return the value under `key`, or store and return the output of `init`
    ///
    /// Implementations must make the check-then-store step atomic for the session.
    fn get_or_try_insert_with(
        &self,
        key: &str,
        init: &mut dyn FnMut() -> Result<String>,
    ) -> Result<String>;
}

/// In-process session backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    /// Empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value unconditionally (used by the web layer, e.g. on login)
    pub fn set(&self, key: &str, value: String) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn get_or_try_insert_with(
        &self,
        key: &str,
        init: &mut dyn FnMut() -> Result<String>,
    ) -> Result<String> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = values.get(key) {
            return Ok(existing.clone());
        }

        let value = init()?;
        values.insert(key.to_string(), value.clone());
        debug!("Initialized session value {}", key);
        Ok(value)
    }
}
