use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::TransportError;
use crate::maven::repository::ArtifactRepository;
use crate::maven::transport::{Resource, Transport};

/// A set of remote repositories held in memory, keyed by repository id. Every request is
///  recorded so that callers can check what was (not) transferred.
#[derive(Default)]
pub struct InMemoryTransport {
    resources: Mutex<HashMap<(String, String), Resource>>,
    failing_repositories: Mutex<HashSet<String>>,
    fetches: Mutex<Vec<(String, String)>>,
    puts: Mutex<Vec<(String, String)>>,
}

impl InMemoryTransport {
    pub fn new() -> InMemoryTransport {
        Default::default()
    }

    pub fn add(&self, repository_id: &str, path: &str, data: impl Into<Bytes>) {
        self.add_resource(repository_id, path, Resource::new(data));
    }

    pub fn add_with_last_modified(&self, repository_id: &str, path: &str, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.add_resource(repository_id, path, Resource { data: data.into(), last_modified: Some(last_modified) });
    }

    fn add_resource(&self, repository_id: &str, path: &str, resource: Resource) {
        self.resources.lock().unwrap()
            .insert((repository_id.to_string(), path.to_string()), resource);
    }

    pub fn get(&self, repository_id: &str, path: &str) -> Option<Bytes> {
        self.resources.lock().unwrap()
            .get(&(repository_id.to_string(), path.to_string()))
            .map(|r| r.data.clone())
    }

    /// Every later request to the repository fails with a transfer error.
    pub fn fail_repository(&self, repository_id: &str) {
        self.failing_repositories.lock().unwrap()
            .insert(repository_id.to_string());
    }

    /// `(repository id, path)` of every fetch so far, in order
    pub fn fetches(&self) -> Vec<(String, String)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, repository_id: &str, path: &str) -> usize {
        self.fetches.lock().unwrap()
            .iter()
            .filter(|(r, p)| r == repository_id && p == path)
            .count()
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    fn check_available(&self, repository: &ArtifactRepository, path: &str) -> Result<(), TransportError> {
        if self.failing_repositories.lock().unwrap().contains(&repository.id) {
            return Err(TransportError::TransferFailed {
                path: path.to_string(),
                message: format!("repository {} is unreachable", repository.id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn fetch(&self, repository: &ArtifactRepository, path: &str) -> Result<Resource, TransportError> {
        self.fetches.lock().unwrap()
            .push((repository.id.clone(), path.to_string()));
        self.check_available(repository, path)?;

        self.resources.lock().unwrap()
            .get(&(repository.id.clone(), path.to_string()))
            .cloned()
            .ok_or_else(|| TransportError::NotFound(path.to_string()))
    }

    async fn put(&self, data: Bytes, repository: &ArtifactRepository, path: &str) -> Result<(), TransportError> {
        self.check_available(repository, path)?;
        self.puts.lock().unwrap()
            .push((repository.id.clone(), path.to_string()));
        self.add(&repository.id, path, data);
        Ok(())
    }
}
