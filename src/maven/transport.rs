//! Moving files between this process and remote repositories.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::TransportError;
use crate::maven::repository::ArtifactRepository;

pub mod http;
pub mod memory;

/// A file as fetched from a remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub data: Bytes,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(data: impl Into<Bytes>) -> Resource {
        Resource {
            data: data.into(),
            last_modified: None,
        }
    }
}

/// `path` is relative to the repository's root, e.g. `org/example/app/maven-metadata.xml`.
///  Timeouts and retries are the implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, repository: &ArtifactRepository, path: &str) -> Result<Resource, TransportError>;

    async fn put(&self, data: Bytes, repository: &ArtifactRepository, path: &str) -> Result<(), TransportError>;
}
