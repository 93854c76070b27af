use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Utc;

/// State shared by all resolutions of one build session. Nothing in here is ever evicted; a new
///  session starts with a clean slate.
pub struct ResolutionSession {
    online: bool,
    /// local metadata paths that were brought up to date during this session
    resolved: Mutex<HashSet<String>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// ids of remote repositories that failed with a transfer error
    blacklist: Mutex<HashSet<String>>,
    deployment_timestamp: OnceLock<String>,
    // TODO keyed by groupId:artifactId:baseVersion and never invalidated, which may go stale in
    //  long-lived processes. Decide on an invalidation policy.
    legacy_resolved: Mutex<HashSet<String>>,
}

impl ResolutionSession {
    pub fn new(online: bool) -> ResolutionSession {
        ResolutionSession {
            online,
            resolved: Default::default(),
            locks: Default::default(),
            blacklist: Default::default(),
            deployment_timestamp: OnceLock::new(),
            legacy_resolved: Default::default(),
        }
    }

    pub fn online() -> ResolutionSession {
        ResolutionSession::new(true)
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_resolved(&self, key: &str) -> bool {
        self.resolved.lock().unwrap().contains(key)
    }

    pub fn mark_resolved(&self, key: &str) {
        self.resolved.lock().unwrap().insert(key.to_string());
    }

    /// A lock per key. Holding it serializes all work on that key, while work on other keys is not
    ///  affected.
    pub fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().unwrap()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    pub fn blacklist(&self, repository_id: &str) {
        self.blacklist.lock().unwrap().insert(repository_id.to_string());
    }

    pub fn is_blacklisted(&self, repository_id: &str) -> bool {
        self.blacklist.lock().unwrap().contains(repository_id)
    }

    /// `yyyyMMdd.HHmmss` in UTC, fixed on first use so that all artifacts deployed by one session
    ///  share it
    pub fn deployment_timestamp(&self) -> &str {
        self.deployment_timestamp.get_or_init(|| Utc::now().format("%Y%m%d.%H%M%S").to_string())
    }

    pub fn is_legacy_resolved(&self, key: &str) -> bool {
        self.legacy_resolved.lock().unwrap().contains(key)
    }

    pub fn mark_legacy_resolved(&self, key: &str) {
        self.legacy_resolved.lock().unwrap().insert(key.to_string());
    }
}

impl Default for ResolutionSession {
    fn default() -> Self {
        ResolutionSession::online()
    }
}
