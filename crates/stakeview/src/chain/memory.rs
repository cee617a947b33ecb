//! In-memory [`Upstream`] serving canned responses. Used by tests and offline replays.

use crate::chain::fetch::{FetchError, Upstream};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct MemoryUpstream {
    routes: Mutex<HashMap<String, Result<Value, u16>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MemoryUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with `body`.
    pub fn insert(&self, path: &str, body: Value) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Ok(body));
    }

    /// Answer `path` with a non-success `status`.
    pub fn fail(&self, path: &str, status: u16) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), Err(status));
    }

    /// Requests seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner).values().sum()
    }
}

#[async_trait]
impl Upstream for MemoryUpstream {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        *self
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_insert(0) += 1;
        let route = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        match route {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(FetchError::Api(status, String::new())),
            None => Err(FetchError::Api(404, format!("no route for {path}"))),
        }
    }
}
