use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Duration, Local, Utc};
use serde::Deserialize;

use crate::maven::artifact::Artifact;
use crate::maven::metadata::MetadataKind;
use crate::maven::paths::{artifact_path, legacy_version_file_path, local_metadata_path, LOCAL_REPOSITORY_ID};

/// How often a remote is asked for a fresher copy of something already cached locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum UpdatePolicy {
    Always,
    Daily,
    Never,
    /// minutes
    Interval(u32),
}

impl UpdatePolicy {
    /// `last_checked` is the modification time of the local copy, `None` if there is none.
    pub fn is_out_of_date(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last_checked) = last_checked else { return true };
        match self {
            UpdatePolicy::Always => true,
            UpdatePolicy::Never => false,
            UpdatePolicy::Daily => {
                // anything checked before today's local midnight
                let midnight = now.with_timezone(&Local)
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .and_then(|m| m.and_local_timezone(Local).earliest())
                    .map(|m| m.with_timezone(&Utc))
                    .unwrap_or(now - Duration::days(1));
                last_checked < midnight
            }
            UpdatePolicy::Interval(minutes) => last_checked + Duration::minutes(*minutes as i64) < now,
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(UpdatePolicy::Always),
            "daily" => Ok(UpdatePolicy::Daily),
            "never" => Ok(UpdatePolicy::Never),
            other => {
                let minutes = other.strip_prefix("interval:")
                    .ok_or_else(|| anyhow!("unknown update policy {:?}", other))?;
                Ok(UpdatePolicy::Interval(minutes.parse()?))
            }
        }
    }
}

impl TryFrom<String> for UpdatePolicy {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What to do when a downloaded file does not match its published checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    Fail,
    Warn,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactRepositoryPolicy {
    pub enabled: bool,
    pub update_policy: UpdatePolicy,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for ArtifactRepositoryPolicy {
    fn default() -> Self {
        ArtifactRepositoryPolicy {
            enabled: true,
            update_policy: UpdatePolicy::Daily,
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

/// A remote repository as the resolution code sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRepository {
    pub id: String,
    pub url: String,
    /// deployments use timestamped snapshot file names
    pub unique_version: bool,
    pub releases: ArtifactRepositoryPolicy,
    pub snapshots: ArtifactRepositoryPolicy,
}

impl ArtifactRepository {
    pub fn new(id: &str, url: &str) -> ArtifactRepository {
        ArtifactRepository {
            id: id.to_string(),
            url: url.to_string(),
            unique_version: true,
            releases: Default::default(),
            snapshots: Default::default(),
        }
    }

    pub fn policy(&self, snapshot: bool) -> &ArtifactRepositoryPolicy {
        if snapshot { &self.snapshots } else { &self.releases }
    }
}

impl Display for ArtifactRepository {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// Where cached copies of remote metadata are kept inside the local repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataLayout {
    /// `maven-metadata-<repositoryId>.xml` next to the artifact
    #[default]
    PerRepositorySuffix,
    /// `REPOSITORY-INF/<repositoryId>/<path>/maven-metadata.xml`
    RepositoryInf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    pub basedir: PathBuf,
    pub layout: MetadataLayout,
}

impl LocalRepository {
    pub fn new(basedir: impl AsRef<Path>, layout: MetadataLayout) -> LocalRepository {
        LocalRepository {
            basedir: basedir.as_ref().to_path_buf(),
            layout,
        }
    }

    pub fn id(&self) -> &str {
        LOCAL_REPOSITORY_ID
    }

    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.basedir.join(relative)
    }

    pub fn artifact_file(&self, artifact: &Artifact) -> PathBuf {
        self.path_of(&artifact_path(artifact))
    }

    /// local cache of `repository_id`'s copy of a metadata document
    pub fn metadata_file(&self, kind: &MetadataKind, repository_id: &str) -> PathBuf {
        self.path_of(&local_metadata_path(kind, repository_id, self.layout))
    }

    /// the local repository's own metadata document, written by installs
    pub fn own_metadata_file(&self, kind: &MetadataKind) -> PathBuf {
        self.path_of(&local_metadata_path(kind, LOCAL_REPOSITORY_ID, MetadataLayout::PerRepositorySuffix))
    }

    pub fn legacy_version_file(&self, artifact: &Artifact) -> PathBuf {
        self.path_of(&legacy_version_file_path(artifact))
    }
}
