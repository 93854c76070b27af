//! Version resolution for artifacts deployed before repository metadata existed. Such
//!  artifacts carry a `<artifactId>-<baseVersion>.version.txt` file next to them, holding either
//!  `<timestamp>-<buildNumber>` (snapshots) or a plain version (`LATEST`).

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::error::TransportError;
use crate::maven::artifact::Artifact;
use crate::maven::metadata_manager::{modification_time, write_atomically};
use crate::maven::paths::legacy_version_file_path;
use crate::maven::repository::{ArtifactRepository, LocalRepository};
use crate::maven::session::ResolutionSession;
use crate::maven::transform::replace_snapshot_token;
use crate::maven::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LegacyVersion {
    value: String,
    last_modified: Option<DateTime<Utc>>,
}

impl LegacyVersion {
    fn parse(content: &str, last_modified: Option<DateTime<Utc>>) -> Option<LegacyVersion> {
        let value = content.trim();
        if value.is_empty() {
            return None;
        }
        Some(LegacyVersion { value: value.to_string(), last_modified })
    }

    /// `(timestamp, buildNumber)` of a snapshot record
    fn snapshot_parts(&self) -> Option<(&str, u32)> {
        let (timestamp, build_number) = self.value.rsplit_once('-')?;
        Some((timestamp, build_number.parse().ok()?))
    }

    /// Snapshot records are ordered by timestamp and build number, everything else by
    ///  modification time.
    fn compare(&self, other: &LegacyVersion, snapshot: bool) -> Ordering {
        if snapshot {
            if let (Some(a), Some(b)) = (self.snapshot_parts(), other.snapshot_parts()) {
                return a.cmp(&b);
            }
        }
        self.last_modified.cmp(&other.last_modified)
    }
}

pub struct LegacyVersionResolver {
    transport: Arc<dyn Transport>,
    session: Arc<ResolutionSession>,
}

impl LegacyVersionResolver {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<ResolutionSession>) -> LegacyVersionResolver {
        LegacyVersionResolver {
            transport,
            session,
        }
    }

    /// The version recorded in the newest legacy version file, or `None` if there is none.
    ///  Remotes are queried at most once per artifact and session, and not at all if the local
    ///  artifact file is newer than the local version file.
    pub async fn resolve(&self, artifact: &Artifact, local: &LocalRepository, remotes: &[ArtifactRepository]) -> Option<String> {
        let local_file = local.legacy_version_file(artifact);
        let mut current = read_local(&local_file).await;

        let key = artifact.version_independent_key();
        if !self.session.is_legacy_resolved(&key) {
            if self.is_local_artifact_newer(artifact, local, current.as_ref()).await {
                debug!("{}: local copy is newer than the recorded version, not checking remotes", artifact);
            }
            else if self.session.is_online() {
                for repository in remotes {
                    if !repository.policy(artifact.is_snapshot()).enabled || self.session.is_blacklisted(&repository.id) {
                        continue;
                    }

                    let Some(remote) = self.fetch(artifact, repository).await else { continue };
                    let is_newer = match &current {
                        Some(c) => remote.compare(c, artifact.is_snapshot()) == Ordering::Greater,
                        None => true,
                    };
                    if is_newer {
                        trace!("{}: {} has a newer version file", artifact, repository.id);
                        store_local(&local_file, &remote.value).await;
                        current = Some(remote);
                    }
                }
            }
            self.session.mark_legacy_resolved(&key);
        }

        current.map(|v| {
            if artifact.is_snapshot() {
                replace_snapshot_token(artifact.base_version(), &v.value)
            }
            else {
                v.value
            }
        })
    }

    async fn is_local_artifact_newer(&self, artifact: &Artifact, local: &LocalRepository, current: Option<&LegacyVersion>) -> bool {
        let artifact_file = artifact.file.clone().unwrap_or_else(|| local.artifact_file(artifact));
        match modification_time(&artifact_file).await {
            None => false,
            Some(artifact_modified) => match current.and_then(|c| c.last_modified) {
                None => true,
                Some(version_modified) => artifact_modified > version_modified,
            }
        }
    }

    async fn fetch(&self, artifact: &Artifact, repository: &ArtifactRepository) -> Option<LegacyVersion> {
        let path = legacy_version_file_path(artifact);
        match self.transport.fetch(repository, &path).await {
            Ok(resource) => LegacyVersion::parse(&String::from_utf8_lossy(&resource.data), resource.last_modified.or_else(|| Some(Utc::now()))),
            Err(TransportError::NotFound(_)) => None,
            Err(e) => {
                warn!("unable to read version file of {} from {}, ignoring it: {}", artifact, repository.id, e);
                None
            }
        }
    }
}

/// an unreadable local file counts as absent
async fn read_local(file: &Path) -> Option<LegacyVersion> {
    match tokio::fs::read_to_string(file).await {
        Ok(content) => LegacyVersion::parse(&content, modification_time(file).await),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("unable to read {:?}, ignoring it: {}", file, e);
            None
        }
    }
}

async fn store_local(file: &Path, value: &str) {
    if let Err(e) = write_atomically(file, value.as_bytes()).await {
        warn!("unable to store {:?}: {}", file, e);
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use rstest::*;
    use crate::maven::repository::MetadataLayout;
    use crate::maven::transport::memory::InMemoryTransport;
    use super::*;

    const PATH: &str = "org/example/app/1.0-SNAPSHOT/app-1.0-SNAPSHOT.version.txt";

    #[rstest]
    #[case::build_number("20240101.120000-10", "20240101.120000-9", Ordering::Greater)]
    #[case::timestamp("20240102.000000-1", "20240101.235959-5", Ordering::Greater)]
    #[case::same("20240101.120000-3", "20240101.120000-3", Ordering::Equal)]
    fn test_snapshot_ordering(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        let a = LegacyVersion::parse(a, None).unwrap();
        let b = LegacyVersion::parse(b, None).unwrap();
        assert_eq!(a.compare(&b, true), expected);
    }

    fn resolver(transport: &Arc<InMemoryTransport>) -> LegacyVersionResolver {
        LegacyVersionResolver::new(transport.clone(), Arc::new(ResolutionSession::online()))
    }

    #[tokio::test]
    async fn test_newest_remote_wins() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
        let transport = Arc::new(InMemoryTransport::new());
        transport.add("a", PATH, "20240101.120000-2");
        transport.add("b", PATH, "20240101.120000-4\n");

        let remotes = vec![ArtifactRepository::new("a", "mem://a"), ArtifactRepository::new("b", "mem://b")];
        let artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
        let resolver = resolver(&transport);

        assert_eq!(resolver.resolve(&artifact, &local, &remotes).await.as_deref(), Some("1.0-20240101.120000-4"));
        assert_eq!(std::fs::read_to_string(dir.path().join(PATH)).unwrap(), "20240101.120000-4");

        // resolved once per session
        resolver.resolve(&artifact, &local, &remotes).await;
        assert_eq!(transport.fetch_count("a", PATH), 1);
    }

    #[tokio::test]
    async fn test_newer_local_artifact_wins() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
        let artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
        let artifact_file = local.artifact_file(&artifact);
        std::fs::create_dir_all(artifact_file.parent().unwrap()).unwrap();
        std::fs::write(&artifact_file, "locally built").unwrap();

        let transport = Arc::new(InMemoryTransport::new());
        transport.add("a", PATH, "20240101.120000-2");

        let result = resolver(&transport).resolve(&artifact, &local, &[ArtifactRepository::new("a", "mem://a")]).await;
        assert_eq!(result, None);
        assert!(transport.fetches().is_empty());
    }

    #[tokio::test]
    async fn test_latest_by_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
        let transport = Arc::new(InMemoryTransport::new());
        let path = "org/example/app/LATEST/app-LATEST.version.txt";
        transport.add_with_last_modified("a", path, "1.0", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        transport.add_with_last_modified("b", path, "0.9", Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());

        let remotes = vec![ArtifactRepository::new("a", "mem://a"), ArtifactRepository::new("b", "mem://b")];
        let artifact = Artifact::new("org.example", "app", "LATEST", "jar");
        assert_eq!(resolver(&transport).resolve(&artifact, &local, &remotes).await.as_deref(), Some("1.0"));
        assert_eq!(transport.fetch_count("b", path), 1);
        assert_eq!(std::fs::read_to_string(dir.path().join(path)).unwrap(), "1.0");
    }

    #[tokio::test]
    async fn test_remote_failure_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_repository("a");
        transport.add("b", PATH, "20240101.120000-1");

        let remotes = vec![ArtifactRepository::new("a", "mem://a"), ArtifactRepository::new("b", "mem://b")];
        let artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
        assert_eq!(resolver(&transport).resolve(&artifact, &local, &remotes).await.as_deref(), Some("1.0-20240101.120000-1"));
    }
}
