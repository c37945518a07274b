use crate::domain::model::{ServiceRecord, TreeFile};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Upstream list of incident-management services.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    async fn fetch_services(&self) -> Result<Vec<ServiceRecord>>;
}

/// Reads files and whole trees addressed by repository URLs.
#[async_trait]
pub trait UrlReader: Send + Sync {
    async fn read(&self, url: &str) -> Result<Vec<u8>>;
    async fn read_tree(&self, url: &str) -> Result<Box<dyn ReadTreeResponse>>;
}

#[async_trait]
pub trait ReadTreeResponse: Send + Sync {
    fn files(&self) -> Result<Vec<TreeFile>>;
    async fn archive(&self) -> Result<Vec<u8>>;
    /// Materializes the tree on disk and returns the directory holding the repository root.
    async fn dir(&self) -> Result<PathBuf>;
}
