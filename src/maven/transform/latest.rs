use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VersionResolutionError;
use crate::maven::artifact::Artifact;
use crate::maven::coordinates::{LATEST_VERSION, RELEASE_VERSION};
use crate::maven::metadata::RepositoryMetadata;
use crate::maven::metadata_manager::RepositoryMetadataManager;
use crate::maven::repository::{ArtifactRepository, LocalRepository};
use crate::maven::transform::{resolve_with_metadata, ArtifactTransformation};
use crate::maven::transform::legacy::LegacyVersionResolver;

/// Resolves `LATEST` and `RELEASE` through the artifact's metadata. The base version is kept, so
///  the artifact remains recognizable as having been requested symbolically.
pub struct LatestArtifactTransformation {
    metadata_manager: Arc<RepositoryMetadataManager>,
    legacy: Arc<LegacyVersionResolver>,
}

impl LatestArtifactTransformation {
    pub fn new(metadata_manager: Arc<RepositoryMetadataManager>, legacy: Arc<LegacyVersionResolver>) -> LatestArtifactTransformation {
        LatestArtifactTransformation {
            metadata_manager,
            legacy,
        }
    }
}

#[async_trait]
impl ArtifactTransformation for LatestArtifactTransformation {
    async fn transform_for_resolve(&self, artifact: &mut Artifact, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<(), VersionResolutionError> {
        let release = match artifact.version() {
            LATEST_VERSION => false,
            RELEASE_VERSION => true,
            _ => return Ok(()),
        };

        let metadata = RepositoryMetadata::artifact(artifact);
        let version = resolve_with_metadata(&self.metadata_manager, &self.legacy, artifact, metadata, remotes, local, |versioning, _| {
            if release { versioning.release.clone() } else { versioning.latest.clone() }
        }).await?;

        artifact.set_version(&version);
        Ok(())
    }

    async fn transform_for_install(&self, _artifact: &mut Artifact, _local: &LocalRepository) -> Result<(), VersionResolutionError> {
        Ok(())
    }

    async fn transform_for_deployment(&self, _artifact: &mut Artifact, _remote: &ArtifactRepository, _local: &LocalRepository) -> Result<(), VersionResolutionError> {
        Ok(())
    }
}
