use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::VersionResolutionError;
use crate::maven::artifact::Artifact;
use crate::maven::metadata::RepositoryMetadata;
use crate::maven::metadata_manager::RepositoryMetadataManager;
use crate::maven::metadata_xml::{Snapshot, Versioning};
use crate::maven::repository::{ArtifactRepository, LocalRepository};
use crate::maven::transform::{metadata_error, replace_snapshot_token, resolve_with_metadata, ArtifactTransformation};
use crate::maven::transform::legacy::LegacyVersionResolver;

/// Resolves `-SNAPSHOT` versions to the timestamped version of their latest build, and allocates
///  the next build number on deployment.
///
/// Build number allocation reads the deployment repository's current number and increments it.
///  There is no locking across deployers, so two sessions deploying the same snapshot at the same
///  time can end up with the same build number.
pub struct SnapshotTransformation {
    metadata_manager: Arc<RepositoryMetadataManager>,
    legacy: Arc<LegacyVersionResolver>,
}

impl SnapshotTransformation {
    pub fn new(metadata_manager: Arc<RepositoryMetadataManager>, legacy: Arc<LegacyVersionResolver>) -> SnapshotTransformation {
        SnapshotTransformation {
            metadata_manager,
            legacy,
        }
    }
}

/// `None` unless the snapshot record carries both a timestamp and a build number
pub fn construct_version(versioning: &Versioning, base_version: &str) -> Option<String> {
    let snapshot = versioning.snapshot.as_ref()?;
    match &snapshot.timestamp {
        Some(timestamp) if !timestamp.is_empty() && snapshot.build_number > 0 => {
            Some(replace_snapshot_token(base_version, &format!("{}-{}", timestamp, snapshot.build_number)))
        }
        _ => Some(base_version.to_string()),
    }
}

#[async_trait]
impl ArtifactTransformation for SnapshotTransformation {
    async fn transform_for_resolve(&self, artifact: &mut Artifact, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<(), VersionResolutionError> {
        // already timestamped versions are left alone
        if !artifact.is_snapshot() || artifact.version() != artifact.base_version() {
            return Ok(());
        }

        let metadata = RepositoryMetadata::snapshot(artifact);
        let version = resolve_with_metadata(&self.metadata_manager, &self.legacy, artifact, metadata, remotes, local, construct_version).await?;
        artifact.set_version(&version);
        Ok(())
    }

    async fn transform_for_install(&self, artifact: &mut Artifact, _local: &LocalRepository) -> Result<(), VersionResolutionError> {
        if !artifact.is_snapshot() {
            return Ok(());
        }

        let snapshot = Snapshot {
            local_copy: true,
            ..Default::default()
        };
        let metadata = RepositoryMetadata::snapshot_with(artifact, snapshot);
        artifact.attach_metadata(metadata);
        Ok(())
    }

    async fn transform_for_deployment(&self, artifact: &mut Artifact, remote: &ArtifactRepository, local: &LocalRepository) -> Result<(), VersionResolutionError> {
        if !artifact.is_snapshot() {
            return Ok(());
        }
        if !remote.unique_version {
            debug!("{} does not use unique snapshot versions, deploying {} as is", remote.id, artifact);
            return Ok(());
        }

        // build numbers are only consistent if the remote is asked
        let session = self.metadata_manager.session();
        if !session.is_online() {
            return Err(VersionResolutionError::Offline { artifact: artifact.to_string() });
        }

        info!("Retrieving previous build number from {}", remote.id);
        let mut metadata = RepositoryMetadata::snapshot(artifact);
        self.metadata_manager.resolve_always(&mut metadata, local, remote).await
            .map_err(|source| metadata_error(artifact, source))?;

        let build_number = metadata.snapshot_record()
            .map(|s| s.build_number)
            .unwrap_or(0) + 1;
        let timestamp = session.deployment_timestamp().to_string();

        artifact.set_version(&replace_snapshot_token(artifact.base_version(), &format!("{}-{}", timestamp, build_number)));

        let snapshot = Snapshot {
            timestamp: Some(timestamp),
            build_number,
            local_copy: false,
        };
        let metadata = RepositoryMetadata::snapshot_with(artifact, snapshot);
        artifact.attach_metadata(metadata);
        Ok(())
    }
}
