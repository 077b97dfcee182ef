//! Filesystem document storage
//!
//! Persists fetched policy documents under a configured directory and hands
//! back the path. Object storage sits behind the same port in deployments
//! that need it.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use core_kernel::PolicyId;

use crate::ports::{DocumentError, DocumentStore};

/// Document store writing to the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn store_policy_document(
        &self,
        policy_id: PolicyId,
        bytes: &[u8],
    ) -> Result<String, DocumentError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DocumentError(e.to_string()))?;

        let path = self.root.join(format!("{policy_id}.pdf"));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DocumentError(e.to_string()))?;

        let path = path.to_string_lossy().into_owned();
        info!(%path, bytes = bytes.len(), "policy document stored");
        Ok(path)
    }
}
