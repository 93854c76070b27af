use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::maven::coordinates::{is_snapshot_version, MavenVersion};
use crate::maven::metadata::RepositoryMetadata;
use crate::maven::repository::ArtifactRepository;

/// A concrete file in a repository, addressed by coordinates.
///
/// `base_version` is fixed at construction. `version` starts out equal to it and may be rewritten
///  by the version transformations, e.g. from `1.0-SNAPSHOT` to `1.0-20240101.120000-3`.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    version: String,
    base_version: String,
    pub classifier: Option<String>,
    pub type_: String,
    pub file: Option<PathBuf>,
    pub repository: Option<ArtifactRepository>,
    metadata: Vec<RepositoryMetadata>,
}

impl Artifact {
    pub fn new(group_id: &str, artifact_id: &str, version: &str, type_: &str) -> Artifact {
        Artifact {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            base_version: MavenVersion::parse(version).base_version().to_string(),
            classifier: None,
            type_: type_.to_string(),
            file: None,
            repository: None,
            metadata: Vec::new(),
        }
    }

    pub fn pom(group_id: &str, artifact_id: &str, version: &str) -> Artifact {
        Artifact::new(group_id, artifact_id, version, "pom")
    }

    pub fn with_classifier(mut self, classifier: &str) -> Artifact {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn base_version(&self) -> &str {
        &self.base_version
    }

    /// Rewrites the resolved version. The base version is not affected.
    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }

    pub fn is_snapshot(&self) -> bool {
        is_snapshot_version(&self.base_version)
    }

    /// file extension for the artifact's type
    pub fn extension(&self) -> &str {
        match self.type_.as_str() {
            "maven-plugin" | "ejb" | "ejb-client" | "test-jar" | "java-source" | "javadoc" => "jar",
            other => other,
        }
    }

    /// `groupId:artifactId:baseVersion`, which is what per-session caches are keyed by
    pub fn version_independent_key(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.base_version)
    }

    pub fn attach_metadata(&mut self, metadata: RepositoryMetadata) {
        self.metadata.retain(|m| m.key() != metadata.key());
        self.metadata.push(metadata);
    }

    pub fn metadata(&self) -> &[RepositoryMetadata] {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Vec<RepositoryMetadata> {
        &mut self.metadata
    }
}

impl Display for Artifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.type_)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}
