//! In-memory storage for uploaded mic check samples.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::token::UploadToken;

/// Samples older than this are dropped on the next insert.
pub const SAMPLE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct StoredSample {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SampleStore {
    inner: Arc<RwLock<HashMap<UploadToken, StoredSample>>>,
}

impl SampleStore {
    pub async fn insert(&self, token: UploadToken, bytes: Vec<u8>, content_type: &'static str) {
        self.insert_at(token, bytes, content_type, Utc::now()).await;
    }

    async fn insert_at(
        &self,
        token: UploadToken,
        bytes: Vec<u8>,
        content_type: &'static str,
        now: DateTime<Utc>,
    ) {
        let cutoff = now - Duration::minutes(SAMPLE_TTL_MINUTES);
        let mut samples = self.inner.write().await;
        let before = samples.len();
        samples.retain(|_, sample| sample.created_at >= cutoff);
        if samples.len() < before {
            debug!("Evicted {} expired samples", before - samples.len());
        }

        samples.insert(
            token,
            StoredSample {
                bytes,
                content_type,
                created_at: now,
            },
        );
    }

    pub async fn get(&self, token: &UploadToken) -> Option<StoredSample> {
        self.inner.read().await.get(token).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
