use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::maven::artifact::Artifact;
use crate::maven::metadata_xml::{Metadata, Snapshot, Versioning};

/// The three scopes a metadata document can describe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// plugin prefix mappings of a group
    Group { group_id: String },
    /// all versions of an artifact, plus `latest` and `release`
    Artifact { group_id: String, artifact_id: String },
    /// the latest timestamp and build number of one snapshot version
    Snapshot { group_id: String, artifact_id: String, base_version: String },
}

/// A metadata document together with where it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryMetadata {
    pub kind: MetadataKind,
    pub content: Metadata,
    /// id of the repository the merged content was selected from, if any
    pub repository: Option<String>,
    /// local file the content was last read from or written to
    pub file: Option<PathBuf>,
}

impl RepositoryMetadata {
    pub fn new(kind: MetadataKind) -> RepositoryMetadata {
        RepositoryMetadata {
            kind,
            content: Metadata::default(),
            repository: None,
            file: None,
        }
    }

    pub fn group(group_id: &str) -> RepositoryMetadata {
        RepositoryMetadata::new(MetadataKind::Group { group_id: group_id.to_string() })
    }

    pub fn artifact(artifact: &Artifact) -> RepositoryMetadata {
        RepositoryMetadata::new(MetadataKind::Artifact {
            group_id: artifact.group_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
        })
    }

    pub fn snapshot(artifact: &Artifact) -> RepositoryMetadata {
        RepositoryMetadata::new(MetadataKind::Snapshot {
            group_id: artifact.group_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
            base_version: artifact.base_version().to_string(),
        })
    }

    /// Snapshot metadata carrying `snapshot` as its only content, the way install and deploy
    ///  attach it to an artifact.
    pub fn snapshot_with(artifact: &Artifact, snapshot: Snapshot) -> RepositoryMetadata {
        let mut metadata = RepositoryMetadata::snapshot(artifact);
        metadata.content = Metadata {
            group_id: Some(artifact.group_id.clone()),
            artifact_id: Some(artifact.artifact_id.clone()),
            version: Some(artifact.base_version().to_string()),
            versioning: Some(Versioning {
                snapshot: Some(snapshot),
                last_updated: Some(last_updated_now()),
                ..Default::default()
            }),
            ..Default::default()
        };
        metadata
    }

    pub fn key(&self) -> String {
        match &self.kind {
            MetadataKind::Group { group_id } => group_id.clone(),
            MetadataKind::Artifact { group_id, artifact_id } => format!("{}:{}", group_id, artifact_id),
            MetadataKind::Snapshot { group_id, artifact_id, base_version } => format!("{}:{}:{}", group_id, artifact_id, base_version),
        }
    }

    /// true if the document is governed by a repository's snapshot policy
    pub fn is_snapshot(&self) -> bool {
        matches!(self.kind, MetadataKind::Snapshot { .. })
    }

    pub fn versioning(&self) -> Option<&Versioning> {
        self.content.versioning.as_ref()
    }

    pub fn snapshot_record(&self) -> Option<&Snapshot> {
        self.versioning().and_then(|v| v.snapshot.as_ref())
    }
}

impl Display for RepositoryMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MetadataKind::Group { .. } => write!(f, "group metadata {}", self.key()),
            MetadataKind::Artifact { .. } => write!(f, "artifact metadata {}", self.key()),
            MetadataKind::Snapshot { .. } => write!(f, "snapshot metadata {}", self.key()),
        }
    }
}

/// `yyyyMMddHHmmss` in UTC
pub fn last_updated_now() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()
}

impl Metadata {
    /// Merges `source` into this document and returns whether anything changed.
    ///
    /// Plugin mappings and versions are unioned. The rest of the versioning section is taken
    ///  from `source` if it is at least as recent as this document, judged by `lastUpdated`.
    ///  Per-file snapshot entries only survive if both sides have them.
    pub fn merge(&mut self, source: &Metadata) -> bool {
        let mut changed = false;

        for plugin in &source.plugins.entries {
            if !self.plugins.entries.iter().any(|p| p.prefix == plugin.prefix) {
                self.plugins.entries.push(plugin.clone());
                changed = true;
            }
        }

        let Some(source_versioning) = &source.versioning else { return changed };

        if self.versioning.is_none() {
            changed = true;
        }
        let versioning = self.versioning.get_or_insert_with(Versioning::default);

        for version in &source_versioning.versions.versions {
            if !versioning.versions.versions.contains(version) {
                versioning.versions.versions.push(version.clone());
                changed = true;
            }
        }

        let target_last_updated = non_empty(versioning.last_updated.as_deref()).map(|s| s.to_string());
        // a source without a timestamp is assumed to be as old as the target
        let source_last_updated = non_empty(source_versioning.last_updated.as_deref())
            .map(|s| s.to_string())
            .or_else(|| target_last_updated.clone());

        let source_is_newer = match (&target_last_updated, &source_last_updated) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(target), Some(source)) => source >= target,
        };
        if !source_is_newer {
            return changed;
        }

        changed = true;
        versioning.last_updated = source_last_updated;
        if source_versioning.release.is_some() {
            versioning.release = source_versioning.release.clone();
        }
        if source_versioning.latest.is_some() {
            versioning.latest = source_versioning.latest.clone();
        }
        if let Some(snapshot) = &source_versioning.snapshot {
            versioning.snapshot = Some(snapshot.clone());
        }

        versioning.snapshot_versions = match (&versioning.snapshot_versions, &source_versioning.snapshot_versions) {
            (Some(target), Some(source)) => {
                let mut merged = source.clone();
                for entry in &target.entries {
                    if !merged.entries.iter().any(|e| e.key() == entry.key()) {
                        merged.entries.push(entry.clone());
                    }
                }
                Some(merged)
            }
            _ => None,
        };

        changed
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty() && *s != "null")
}
