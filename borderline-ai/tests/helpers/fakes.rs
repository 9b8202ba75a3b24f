//! In-process stand-ins for the inference endpoint and the object store

use async_trait::async_trait;
use borderline_ai::services::{
    ChatRequest, InferenceClient, InferenceError, ObjectStore, StorageError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Replays scripted replies in order and records every request
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedInference {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::new(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: InferenceError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::Network("no scripted reply left".to_string())))
    }
}

/// HashMap-backed object store; can be told to fail uploads
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_uploads: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_uploads: true,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&format!("{}/{}", bucket, path))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.fail_uploads {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "bucket unavailable",
            )));
        }
        let key = format!("{}/{}", bucket, path);
        self.objects.lock().unwrap().insert(key.clone(), bytes.to_vec());
        Ok(format!("http://test.local/storage/{}", key))
    }

    async fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let key = format!("{}/{}", bucket, path);
        match self.objects.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key)),
        }
    }
}
