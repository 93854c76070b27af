//! Pinning symbolic versions (`LATEST`, `RELEASE`, `-SNAPSHOT`) to concrete ones.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{RepositoryMetadataError, VersionResolutionError};
use crate::maven::artifact::Artifact;
use crate::maven::coordinates::SNAPSHOT_VERSION;
use crate::maven::metadata::RepositoryMetadata;
use crate::maven::metadata_manager::RepositoryMetadataManager;
use crate::maven::metadata_xml::Versioning;
use crate::maven::repository::{ArtifactRepository, LocalRepository};
use crate::maven::transform::latest::LatestArtifactTransformation;
use crate::maven::transform::legacy::LegacyVersionResolver;
use crate::maven::transform::snapshot::SnapshotTransformation;
use crate::maven::transport::Transport;

pub mod latest;
pub mod legacy;
pub mod snapshot;

type Result<T> = std::result::Result<T, VersionResolutionError>;

/// Rewrites an artifact's version at one of the points of its lifecycle. Transformations that do
///  not apply to an artifact leave it untouched.
#[async_trait]
pub trait ArtifactTransformation: Send + Sync {
    async fn transform_for_resolve(&self, artifact: &mut Artifact, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<()>;

    async fn transform_for_install(&self, artifact: &mut Artifact, local: &LocalRepository) -> Result<()>;

    async fn transform_for_deployment(&self, artifact: &mut Artifact, remote: &ArtifactRepository, local: &LocalRepository) -> Result<()>;
}

/// Applies all transformations in order: `LATEST` / `RELEASE` first, then snapshots.
pub struct ArtifactTransformationManager {
    transformations: Vec<Box<dyn ArtifactTransformation>>,
}

impl ArtifactTransformationManager {
    pub fn new(metadata_manager: Arc<RepositoryMetadataManager>, transport: Arc<dyn Transport>) -> ArtifactTransformationManager {
        let session = metadata_manager.session_handle();
        let legacy = Arc::new(LegacyVersionResolver::new(transport, session));
        ArtifactTransformationManager {
            transformations: vec![
                Box::new(LatestArtifactTransformation::new(metadata_manager.clone(), legacy.clone())),
                Box::new(SnapshotTransformation::new(metadata_manager, legacy)),
            ],
        }
    }

    pub async fn transform_for_resolve(&self, artifact: &mut Artifact, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<()> {
        for transformation in &self.transformations {
            transformation.transform_for_resolve(artifact, remotes, local).await?;
        }
        Ok(())
    }

    pub async fn transform_for_install(&self, artifact: &mut Artifact, local: &LocalRepository) -> Result<()> {
        for transformation in &self.transformations {
            transformation.transform_for_install(artifact, local).await?;
        }
        Ok(())
    }

    pub async fn transform_for_deployment(&self, artifact: &mut Artifact, remote: &ArtifactRepository, local: &LocalRepository) -> Result<()> {
        for transformation in &self.transformations {
            transformation.transform_for_deployment(artifact, remote, local).await?;
        }
        Ok(())
    }
}

/// Resolves artifact versions for consumers that only care about the resulting version string.
pub struct VersionResolver {
    transformations: ArtifactTransformationManager,
}

impl VersionResolver {
    pub fn new(metadata_manager: Arc<RepositoryMetadataManager>, transport: Arc<dyn Transport>) -> VersionResolver {
        VersionResolver {
            transformations: ArtifactTransformationManager::new(metadata_manager, transport),
        }
    }

    pub async fn resolve_version(&self, artifact: &Artifact, local: &LocalRepository, remotes: &[ArtifactRepository]) -> Result<String> {
        let mut artifact = artifact.clone();
        self.transformations.transform_for_resolve(&mut artifact, remotes, local).await?;
        Ok(artifact.version().to_string())
    }
}

/// The concrete version `artifact` resolves to, e.g. `1.0-20240101.120000-3` for `1.0-SNAPSHOT`
pub async fn resolve_version(metadata_manager: Arc<RepositoryMetadataManager>, transport: Arc<dyn Transport>, artifact: &Artifact, local: &LocalRepository, remotes: &[ArtifactRepository]) -> Result<String> {
    VersionResolver::new(metadata_manager, transport)
        .resolve_version(artifact, local, remotes)
        .await
}

/// Resolves `metadata`, attaches it to the artifact and picks a version from its versioning
///  section. Falls back to legacy version files, and finally to the base version.
pub(crate) async fn resolve_with_metadata(
    metadata_manager: &RepositoryMetadataManager,
    legacy: &LegacyVersionResolver,
    artifact: &mut Artifact,
    mut metadata: RepositoryMetadata,
    remotes: &[ArtifactRepository],
    local: &LocalRepository,
    construct_version: impl Fn(&Versioning, &str) -> Option<String>,
) -> Result<String> {
    metadata_manager.resolve(&mut metadata, remotes, local).await
        .map_err(|source| metadata_error(artifact, source))?;

    let mut version = metadata.versioning()
        .and_then(|v| construct_version(v, artifact.base_version()));
    let repository = metadata.repository.clone();
    artifact.attach_metadata(metadata);

    if version.is_none() {
        version = legacy.resolve(artifact, local, remotes).await;
    }
    let version = version.unwrap_or_else(|| artifact.base_version().to_string());

    if version != artifact.base_version() {
        info!("{}: resolved to version {} from repository {}", artifact, version, repository.as_deref().unwrap_or("local"));
    }
    Ok(version)
}

pub(crate) fn metadata_error(artifact: &Artifact, source: RepositoryMetadataError) -> VersionResolutionError {
    VersionResolutionError::Metadata {
        artifact: artifact.to_string(),
        source,
    }
}

/// `1.0-SNAPSHOT` with `20240101.120000-3` becomes `1.0-20240101.120000-3`
pub fn replace_snapshot_token(base_version: &str, replacement: &str) -> String {
    let prefix_len = base_version.len().saturating_sub(SNAPSHOT_VERSION.len());
    format!("{}{}", &base_version[..prefix_len], replacement)
}
