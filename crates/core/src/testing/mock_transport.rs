//! Mock transport for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::transport::{Transport, TransportError};

/// Mock implementation of the [`Transport`] trait.
///
/// Serves canned bodies by URL and records every fetch; unknown URLs
/// fail the way an unreachable host would.
#[derive(Default)]
pub struct MockTransport {
    responses: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the body served for `url`.
    pub async fn insert(&self, url: impl Into<String>, body: Vec<u8>) {
        self.responses.write().await.insert(url.into(), body);
    }

    /// URLs fetched so far, in order.
    pub async fn requested(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.requests.write().await.push(url.to_string());
        self.responses.read().await.get(url).cloned().ok_or_else(|| {
            TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "no canned response".to_string(),
            }
        })
    }
}
