use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::maven::repository::{ArtifactRepository, ArtifactRepositoryPolicy, LocalRepository, MetadataLayout};

/// Resolver settings, read from a JSON document like
///
/// ```json
/// {
///   "local_repository": "/home/me/.m2/repository",
///   "offline": false,
///   "metadata_layout": "per-repository-suffix",
///   "remote_repositories": [
///     { "id": "central", "url": "https://repo1.maven.org/maven2",
///       "snapshots": { "enabled": false } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    pub local_repository: PathBuf,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub metadata_layout: MetadataLayout,
    #[serde(default)]
    pub remote_repositories: Vec<RemoteRepositoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteRepositoryConfig {
    pub id: String,
    pub url: String,
    #[serde(default = "default_unique_version")]
    pub unique_version: bool,
    #[serde(default)]
    pub releases: ArtifactRepositoryPolicy,
    #[serde(default)]
    pub snapshots: ArtifactRepositoryPolicy,
}

fn default_unique_version() -> bool {
    true
}

impl ResolverConfig {
    pub fn parse(json: &str) -> anyhow::Result<ResolverConfig> {
        let config: ResolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> anyhow::Result<ResolverConfig> {
        let json = tokio::fs::read_to_string(path).await
            .with_context(|| format!("unable to read configuration {:?}", path))?;
        ResolverConfig::parse(&json)
            .with_context(|| format!("invalid configuration {:?}", path))
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (i, repository) in self.remote_repositories.iter().enumerate() {
            if repository.id.is_empty() {
                anyhow::bail!("remote repository #{} has an empty id", i);
            }
            if self.remote_repositories[..i].iter().any(|r| r.id == repository.id) {
                anyhow::bail!("duplicate remote repository id {}", repository.id);
            }
        }
        Ok(())
    }

    pub fn local_repository(&self) -> LocalRepository {
        LocalRepository::new(&self.local_repository, self.metadata_layout)
    }

    pub fn remote_repositories(&self) -> Vec<ArtifactRepository> {
        self.remote_repositories.iter()
            .map(|r| ArtifactRepository {
                id: r.id.clone(),
                url: r.url.clone(),
                unique_version: r.unique_version,
                releases: r.releases.clone(),
                snapshots: r.snapshots.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use crate::maven::repository::{ChecksumPolicy, UpdatePolicy};
    use super::*;

    #[test]
    fn test_parse() {
        let config = ResolverConfig::parse(r#"{
            "local_repository": "/tmp/repo",
            "metadata_layout": "repository-inf",
            "remote_repositories": [
                { "id": "central", "url": "https://repo.example.org/maven2",
                  "releases": { "update_policy": "interval:30", "checksum_policy": "fail" },
                  "snapshots": { "enabled": false } }
            ]
        }"#).unwrap();

        assert!(!config.offline);
        assert_eq!(config.local_repository().layout, MetadataLayout::RepositoryInf);

        let remotes = config.remote_repositories();
        assert_eq!(remotes.len(), 1);
        assert!(remotes[0].unique_version);
        assert_eq!(remotes[0].releases.update_policy, UpdatePolicy::Interval(30));
        assert_eq!(remotes[0].releases.checksum_policy, ChecksumPolicy::Fail);
        assert!(!remotes[0].snapshots.enabled);
        assert_eq!(remotes[0].snapshots.update_policy, UpdatePolicy::Daily);
    }

    #[test]
    fn test_invalid() {
        assert!(ResolverConfig::parse(r#"{ "offline": true }"#).is_err());
        assert!(ResolverConfig::parse(r#"{ "local_repository": "/r", "remote_repositories": [
            { "id": "a", "url": "u" }, { "id": "a", "url": "v" } ] }"#).is_err());
        assert!(ResolverConfig::parse(r#"{ "local_repository": "/r", "remote_repositories": [
            { "id": "a", "url": "u", "releases": { "update_policy": "weekly" } } ] }"#).is_err());
    }
}
