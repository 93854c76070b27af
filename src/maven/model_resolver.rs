use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{ModelResolutionError, TransportError, VersionResolutionError};
use crate::maven::artifact::Artifact;
use crate::maven::metadata::RepositoryMetadata;
use crate::maven::metadata_manager::{write_atomically, RepositoryMetadataManager};
use crate::maven::paths::artifact_path;
use crate::maven::repository::{ArtifactRepository, LocalRepository};
use crate::maven::transform::VersionResolver;
use crate::maven::transport::Transport;
use crate::model::{Dependency, Parent};
use crate::version::range::VersionRange;

type Result<T> = std::result::Result<T, ModelResolutionError>;

/// What a model is requested for. Error messages name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Parent,
    Dependency,
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Parent => f.write_str("parent"),
            RequestKind::Dependency => f.write_str("dependency"),
        }
    }
}

/// Coordinates of a model to resolve. `version` is either a plain version or a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub kind: RequestKind,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ModelRequest {
    pub fn parent(parent: &Parent) -> ModelRequest {
        ModelRequest {
            kind: RequestKind::Parent,
            group_id: parent.group_id.clone(),
            artifact_id: parent.artifact_id.clone(),
            version: parent.version.clone(),
        }
    }

    /// `None` for dependencies without a version
    pub fn dependency(dependency: &Dependency) -> Option<ModelRequest> {
        Some(ModelRequest {
            kind: RequestKind::Dependency,
            group_id: dependency.group_id.clone(),
            artifact_id: dependency.artifact_id.clone(),
            version: dependency.version.clone()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    /// the model's file in the local repository
    pub source: PathBuf,
    pub version: String,
    /// the concrete version, if it differs from the requested one
    pub rewritten_version: Option<String>,
}

/// Maps parent and dependency coordinates to model files, resolving version ranges to the
///  highest available version.
pub struct ModelResolver {
    metadata_manager: Arc<RepositoryMetadataManager>,
    transport: Arc<dyn Transport>,
    version_resolver: VersionResolver,
    local: LocalRepository,
}

impl ModelResolver {
    pub fn new(metadata_manager: Arc<RepositoryMetadataManager>, transport: Arc<dyn Transport>, local: LocalRepository) -> ModelResolver {
        ModelResolver {
            version_resolver: VersionResolver::new(metadata_manager.clone(), transport.clone()),
            metadata_manager,
            transport,
            local,
        }
    }

    pub async fn resolve_model(&self, request: &ModelRequest, repositories: &[ArtifactRepository]) -> Result<ResolvedModel> {
        let range = VersionRange::parse(&request.version)
            .map_err(|source| ModelResolutionError::InvalidRange {
                kind: request.kind,
                group_id: request.group_id.clone(),
                artifact_id: request.artifact_id.clone(),
                version: request.version.clone(),
                source,
            })?;

        // checked before looking at any repository: no set of available versions makes an
        //  open-ended range deterministic
        if range.is_range() && !range.has_upper_bound() {
            return Err(ModelResolutionError::OpenEndedRange {
                kind: request.kind,
                group_id: request.group_id.clone(),
                artifact_id: request.artifact_id.clone(),
                version: request.version.clone(),
            });
        }

        let version = if range.is_range() {
            self.highest_matching_version(request, &range, repositories).await?
        }
        else {
            request.version.clone()
        };

        let source = self.fetch_model(request, &version, repositories).await?;
        let rewritten_version = (version != request.version).then(|| version.clone());
        if let Some(rewritten) = &rewritten_version {
            debug!("{}:{}: {} version {} resolved to {}", request.group_id, request.artifact_id, request.kind, request.version, rewritten);
        }

        Ok(ResolvedModel {
            source,
            version,
            rewritten_version,
        })
    }

    async fn highest_matching_version(&self, request: &ModelRequest, range: &VersionRange, repositories: &[ArtifactRepository]) -> Result<String> {
        let artifact = Artifact::pom(&request.group_id, &request.artifact_id, &request.version);
        let mut metadata = RepositoryMetadata::artifact(&artifact);
        self.metadata_manager.resolve(&mut metadata, repositories, &self.local).await?;

        let versions = metadata.versioning()
            .map(|v| v.versions.versions.as_slice())
            .unwrap_or_default();
        trace!("available versions of {}:{}: {:?}", request.group_id, request.artifact_id, versions);

        range.match_highest(versions.iter().map(String::as_str))
            .ok_or_else(|| ModelResolutionError::NoMatchingVersion {
                kind: request.kind,
                group_id: request.group_id.clone(),
                artifact_id: request.artifact_id.clone(),
                version: request.version.clone(),
                repositories: repository_ids(repositories),
            })
    }

    /// The local copy of the model, downloaded from the first repository that has it if needed.
    ///  Snapshots are looked up under the file name of their latest build.
    async fn fetch_model(&self, request: &ModelRequest, version: &str, repositories: &[ArtifactRepository]) -> Result<PathBuf> {
        let artifact = Artifact::pom(&request.group_id, &request.artifact_id, version);
        let file = self.local.artifact_file(&artifact);
        if tokio::fs::try_exists(&file).await.unwrap_or(false) {
            trace!("using local copy {:?}", file);
            return Ok(file);
        }

        let mut remote_artifact = artifact.clone();
        if artifact.is_snapshot() {
            let remote_version = self.version_resolver.resolve_version(&artifact, &self.local, repositories).await
                .map_err(|e| match e {
                    VersionResolutionError::Metadata { source, .. } => ModelResolutionError::Metadata(source),
                    VersionResolutionError::Offline { .. } => unresolvable(request, version, repositories),
                })?;
            remote_artifact.set_version(&remote_version);
        }
        let path = artifact_path(&remote_artifact);

        let session = self.metadata_manager.session();
        if session.is_online() {
            for repository in repositories {
                if !repository.policy(artifact.is_snapshot()).enabled || session.is_blacklisted(&repository.id) {
                    continue;
                }

                match self.transport.fetch(repository, &path).await {
                    Ok(resource) => {
                        match write_atomically(&file, &resource.data).await {
                            Ok(()) => return Ok(file),
                            Err(e) => warn!("unable to store {:?}: {}", file, e),
                        }
                    }
                    Err(TransportError::NotFound(_)) => debug!("{} not found in {}", path, repository.id),
                    Err(e) => warn!("unable to retrieve {} from {}: {}", path, repository.id, e),
                }
            }
        }

        Err(unresolvable(request, version, repositories))
    }
}

fn unresolvable(request: &ModelRequest, version: &str, repositories: &[ArtifactRepository]) -> ModelResolutionError {
    ModelResolutionError::Unresolvable {
        group_id: request.group_id.clone(),
        artifact_id: request.artifact_id.clone(),
        version: version.to_string(),
        repositories: repository_ids(repositories),
    }
}

fn repository_ids(repositories: &[ArtifactRepository]) -> Vec<String> {
    repositories.iter().map(|r| r.id.clone()).collect()
}

#[cfg(test)]
mod test {
    use rstest::*;
    use crate::maven::repository::{ChecksumPolicy, MetadataLayout};
    use crate::maven::session::ResolutionSession;
    use crate::maven::transport::memory::InMemoryTransport;
    use super::*;

    const METADATA: &str = "<metadata><versioning><versions><version>1.0</version><version>1.5</version><version>2.0</version></versions></versioning></metadata>";

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<InMemoryTransport>,
        resolver: ModelResolver,
        repositories: Vec<ArtifactRepository>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(InMemoryTransport::new());
        transport.add("b", "org/example/parent/maven-metadata.xml", METADATA);
        for version in ["1.0", "1.5", "2.0"] {
            transport.add("b", &format!("org/example/parent/{v}/parent-{v}.pom", v = version), format!("<project>{}</project>", version));
        }

        let manager = Arc::new(RepositoryMetadataManager::new(transport.clone(), Arc::new(ResolutionSession::online())));
        let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
        let repositories = ["a", "b"].iter()
            .map(|id| {
                let mut repository = ArtifactRepository::new(id, &format!("mem://{}", id));
                repository.releases.checksum_policy = ChecksumPolicy::Ignore;
                repository
            })
            .collect();

        Fixture {
            resolver: ModelResolver::new(manager, transport.clone(), local),
            _dir: dir,
            transport,
            repositories,
        }
    }

    fn request(kind: RequestKind, version: &str) -> ModelRequest {
        ModelRequest {
            kind,
            group_id: "org.example".to_string(),
            artifact_id: "parent".to_string(),
            version: version.to_string(),
        }
    }

    #[rstest]
    #[case::parent(RequestKind::Parent, "[1.0,)", "The requested parent version range '[1.0,)' does not specify an upper bound")]
    #[case::dependency(RequestKind::Dependency, "[1.0,1.2),(1.2,)", "The requested dependency version range '[1.0,1.2),(1.2,)' does not specify an upper bound")]
    #[case::union_with_open_member(RequestKind::Parent, "[1.0,),[2.0,3.0]", "The requested parent version range '[1.0,),[2.0,3.0]' does not specify an upper bound")]
    #[tokio::test]
    async fn test_open_ended_range(#[case] kind: RequestKind, #[case] version: &str, #[case] message: &str) {
        let fixture = fixture();
        let result = fixture.resolver.resolve_model(&request(kind, version), &fixture.repositories).await;

        let err = result.unwrap_err();
        assert!(matches!(err, ModelResolutionError::OpenEndedRange { .. }));
        assert_eq!(err.to_string(), message);
        assert!(fixture.transport.fetches().is_empty());
    }

    #[tokio::test]
    async fn test_highest_match() {
        let fixture = fixture();
        let resolved = fixture.resolver.resolve_model(&request(RequestKind::Parent, "[1.0,2.0)"), &fixture.repositories).await.unwrap();

        assert_eq!(resolved.version, "1.5");
        assert_eq!(resolved.rewritten_version.as_deref(), Some("1.5"));
        assert_eq!(std::fs::read_to_string(&resolved.source).unwrap(), "<project>1.5</project>");

        let stored: Vec<String> = std::fs::read_dir(resolved.source.parent().unwrap()).unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(stored, vec!["parent-1.5.pom"]);
    }

    #[tokio::test]
    async fn test_no_match() {
        let fixture = fixture();
        let err = fixture.resolver.resolve_model(&request(RequestKind::Dependency, "[3.0,4.0]"), &fixture.repositories).await.unwrap_err();

        assert!(matches!(err, ModelResolutionError::NoMatchingVersion { .. }));
        assert!(err.to_string().starts_with("No versions matched the requested dependency version range '[3.0,4.0]'"));
        assert!(err.to_string().contains("a, b"));
    }

    #[tokio::test]
    async fn test_plain_version() {
        let fixture = fixture();
        let resolved = fixture.resolver.resolve_model(&request(RequestKind::Parent, "2.0"), &fixture.repositories).await.unwrap();

        assert_eq!(resolved.version, "2.0");
        assert!(resolved.rewritten_version.is_none());
        assert_eq!(fixture.transport.fetch_count("a", "org/example/parent/2.0/parent-2.0.pom"), 1);

        // now served from the local repository
        fixture.resolver.resolve_model(&request(RequestKind::Parent, "2.0"), &fixture.repositories).await.unwrap();
        assert_eq!(fixture.transport.fetch_count("b", "org/example/parent/2.0/parent-2.0.pom"), 1);
    }

    #[tokio::test]
    async fn test_unresolvable() {
        let fixture = fixture();
        let err = fixture.resolver.resolve_model(&request(RequestKind::Parent, "9.9"), &fixture.repositories).await.unwrap_err();
        assert!(matches!(err, ModelResolutionError::Unresolvable { .. }));
    }

    #[test]
    fn test_dependency_request_requires_version() {
        assert!(ModelRequest::dependency(&Dependency::new("g", "a")).is_none());
    }
}
