//! In-memory request parameters, user storage and request context.
//!
//! Enough to drive a mapping without a web framework: tests, command line
//! tools, or re-binding what a filled mapping shows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;

use crate::core::collaborators::{RequestContext, RequestParams, UserStorage};
use crate::core::mapping::MappingNode;
use crate::core::validation::RequestProcessingError;
use crate::core::value::UploadedFile;

/// Request parameters held in ordered maps.
#[derive(Clone, Debug, Default)]
pub struct MapParams {
    values: IndexMap<String, Vec<String>>,
    files: IndexMap<String, Vec<UploadedFile>>,
    error: Option<RequestProcessingError>,
}

impl MapParams {
    pub fn new() -> Self {
        Self::default()
    }

    // repeated names accumulate
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (name, value) in pairs {
            params.insert(name, value);
        }
        params
    }

    /// Parameters a filled mapping would submit as is.
    pub fn from_filled(node: &MappingNode) -> Self {
        Self {
            values: node.filled_params(),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.files.entry(name.into()).or_default().push(file);
        self
    }

    pub fn with_error(mut self, error: RequestProcessingError) -> Self {
        self.error = Some(error);
        self
    }
}

impl RequestParams for MapParams {
    fn param_names(&self) -> Vec<String> {
        self.values.keys().chain(self.files.keys()).cloned().collect()
    }

    fn param_values(&self, name: &str) -> Option<Vec<String>> {
        self.values.get(name).cloned()
    }

    fn uploaded_files(&self, name: &str) -> Option<Vec<UploadedFile>> {
        self.files.get(name).cloned()
    }

    fn request_error(&self) -> Option<RequestProcessingError> {
        self.error.clone()
    }
}

/// User storage backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStorage for InMemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Request context of one user session. The request secret binds the
/// generated secret to the session id.
#[derive(Clone, Debug)]
pub struct SessionContext {
    session_id: String,
    storage: Arc<InMemoryStorage>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_storage(session_id, Arc::new(InMemoryStorage::new()))
    }

    pub fn with_storage(session_id: impl Into<String>, storage: Arc<InMemoryStorage>) -> Self {
        Self {
            session_id: session_id.into(),
            storage,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn storage(&self) -> Arc<InMemoryStorage> {
        Arc::clone(&self.storage)
    }
}

impl RequestContext for SessionContext {
    fn user_storage(&self) -> &dyn UserStorage {
        self.storage.as_ref()
    }

    fn request_secret(&self, generated: &str) -> String {
        format!("{generated}{}", self.session_id)
    }
}
