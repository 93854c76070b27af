use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::{RepositoryMetadataError, TransportError};
use crate::maven::checksum::{verify_file, ChecksumAlgorithm, ChecksumValidator, NopChecksumValidator};
use crate::maven::metadata::{MetadataKind, RepositoryMetadata};
use crate::maven::metadata_xml::{Metadata, Snapshot, Versioning};
use crate::maven::paths::remote_metadata_path;
use crate::maven::repository::{ArtifactRepository, ChecksumPolicy, LocalRepository};
use crate::maven::session::ResolutionSession;
use crate::maven::transport::Transport;

type Result<T> = std::result::Result<T, RepositoryMetadataError>;

/// Keeps local copies of remote metadata documents up to date and merges them into one view.
///
/// Every remote repository's copy is cached in its own file inside the local repository, so
///  documents from different remotes never overwrite each other. Which remote copies are
///  refreshed is governed by each repository's update policy; within a session each copy is
///  refreshed at most once.
pub struct RepositoryMetadataManager {
    transport: Arc<dyn Transport>,
    session: Arc<ResolutionSession>,
}

impl RepositoryMetadataManager {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<ResolutionSession>) -> RepositoryMetadataManager {
        RepositoryMetadataManager {
            transport,
            session,
        }
    }

    pub fn session(&self) -> &ResolutionSession {
        &self.session
    }

    pub fn session_handle(&self) -> Arc<ResolutionSession> {
        self.session.clone()
    }

    /// Refreshes the local copies of `metadata` from all applicable remotes, then merges the
    ///  remote copies and the local repository's own copy into `metadata.content`.
    ///  `metadata.repository` is set to the remote whose copy contributed last, `None` if that
    ///  was the local repository.
    pub async fn resolve(&self, metadata: &mut RepositoryMetadata, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<()> {
        if self.session.is_online() {
            self.refresh_local_copies(metadata, remotes, local).await?;
        }
        else {
            debug!("System is offline. Using local copies of {}", metadata);
        }

        self.merge_local_copies(metadata, remotes, local).await
    }

    async fn refresh_local_copies(&self, metadata: &RepositoryMetadata, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<()> {
        for repository in remotes {
            if !self.is_applicable(metadata, repository) {
                continue;
            }

            let file = local.metadata_file(&metadata.kind, &repository.id);
            let key = file.to_string_lossy().to_string();
            let lock = self.session.lock_for(&key);
            let _guard = lock.lock().await;

            if self.session.is_resolved(&key) {
                trace!("{} from {} was already resolved in this session", metadata.key(), repository.id);
                continue;
            }

            let policy = repository.policy(metadata.is_snapshot());
            if policy.update_policy.is_out_of_date(modification_time(&file).await, Utc::now()) {
                info!("{}: checking for updates from {}", metadata.key(), repository.id);
                self.fetch_into(metadata, repository, &file, policy.checksum_policy, true).await?;
            }

            // marks the copy as checked, so it is not checked again until the policy says so
            if file_exists(&file).await {
                touch(metadata, &file).await?;
            }
            else {
                // remembers that the remote has no copy
                write_document(metadata, &file, &skeleton(&metadata.kind)).await?;
            }

            self.session.mark_resolved(&key);
        }
        Ok(())
    }

    fn is_applicable(&self, metadata: &RepositoryMetadata, repository: &ArtifactRepository) -> bool {
        if !repository.policy(metadata.is_snapshot()).enabled {
            debug!("Skipping disabled repository {}", repository.id);
            false
        }
        else if self.session.is_blacklisted(&repository.id) {
            debug!("Skipping blacklisted repository {}", repository.id);
            false
        }
        else {
            true
        }
    }

    async fn merge_local_copies(&self, metadata: &mut RepositoryMetadata, remotes: &[ArtifactRepository], local: &LocalRepository) -> Result<()> {
        let mut copies: Vec<(Option<String>, PathBuf, Metadata)> = Vec::new();
        let mut selected: Option<Option<String>> = None;

        let mut candidates: Vec<(Option<String>, PathBuf)> = remotes.iter()
            .filter(|r| r.policy(metadata.is_snapshot()).enabled && !self.session.is_blacklisted(&r.id))
            .map(|r| (Some(r.id.clone()), local.metadata_file(&metadata.kind, &r.id)))
            .collect();
        candidates.push((None, local.own_metadata_file(&metadata.kind)));

        for (repository_id, file) in candidates {
            let Some(copy) = read_document(metadata, &file).await? else { continue };

            if metadata.content.merge(&copy) {
                metadata.repository = repository_id.clone();
                metadata.file = Some(file.clone());
                selected = Some(repository_id.clone());
            }
            if metadata.is_snapshot() {
                copies.push((repository_id, file, copy));
            }
        }

        // the copy the merged snapshot came from is flagged as the one present locally
        for (repository_id, file, mut copy) in copies {
            let is_selected = selected.as_ref() == Some(&repository_id);
            let versioning = copy.versioning.get_or_insert_with(Versioning::default);

            if is_selected {
                let snapshot = versioning.snapshot.get_or_insert_with(Snapshot::default);
                if !snapshot.local_copy {
                    snapshot.local_copy = true;
                    write_document(metadata, &file, &copy).await?;
                }
            }
            else if let Some(snapshot) = versioning.snapshot.as_mut().filter(|s| s.local_copy) {
                snapshot.local_copy = false;
                write_document(metadata, &file, &copy).await?;
            }
        }

        Ok(())
    }

    /// Fetches the deployment repository's copy unconditionally and loads it into `metadata`.
    ///  A missing remote copy is not an error: it will be created by the deployment.
    pub async fn resolve_always(&self, metadata: &mut RepositoryMetadata, local: &LocalRepository, remote: &ArtifactRepository) -> Result<()> {
        if !self.session.is_online() {
            return Err(RepositoryMetadataError::Offline { metadata: metadata.to_string() });
        }

        let file = local.metadata_file(&metadata.kind, &remote.id);
        self.fetch_into(metadata, remote, &file, ChecksumPolicy::Warn, false).await?;

        if let Some(content) = read_document(metadata, &file).await? {
            metadata.content = content;
            metadata.file = Some(file);
        }
        Ok(())
    }

    /// Writes `metadata` into the local repository's own copy, merging it with what is there.
    pub async fn install(&self, metadata: &mut RepositoryMetadata, local: &LocalRepository) -> Result<()> {
        let file = local.own_metadata_file(&metadata.kind);
        store_merged(metadata, &file).await?;
        Ok(())
    }

    /// Merges `metadata` into the deployment repository's current copy and uploads the result,
    ///  together with its checksums.
    pub async fn deploy(&self, metadata: &mut RepositoryMetadata, local: &LocalRepository, repository: &ArtifactRepository) -> Result<()> {
        if !self.session.is_online() {
            return Err(RepositoryMetadataError::Offline { metadata: metadata.to_string() });
        }

        info!("Retrieving previous metadata from {}", repository.id);
        let file = local.metadata_file(&metadata.kind, &repository.id);
        self.fetch_into(metadata, repository, &file, ChecksumPolicy::Warn, false).await?;

        let document = store_merged(metadata, &file).await?;
        let data = Bytes::from(serialize(metadata, &file, &document)?);
        let path = remote_metadata_path(&metadata.kind);

        let sha1 = hex::encode(Sha1::digest(&data));
        let md5 = format!("{:x}", md5::compute(&data));

        let uploads = [
            (data, path.clone()),
            (Bytes::from(sha1), format!("{}.sha1", path)),
            (Bytes::from(md5), format!("{}.md5", path)),
        ];
        for (data, path) in uploads {
            self.transport.put(data, repository, &path).await
                .map_err(|e| RepositoryMetadataError::TransferFailed {
                    metadata: metadata.to_string(),
                    repository: repository.id.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Downloads `repository`'s copy of `metadata` into `file`, checking it against the published
    ///  checksums. A copy that does not exist remotely is deleted locally, so that stale details
    ///  are not used.
    async fn fetch_into(&self, metadata: &RepositoryMetadata, repository: &ArtifactRepository, file: &Path, checksum_policy: ChecksumPolicy, allow_blacklisting: bool) -> Result<()> {
        if !self.session.is_online() {
            return Err(RepositoryMetadataError::Offline { metadata: metadata.to_string() });
        }

        let path = remote_metadata_path(&metadata.kind);
        let (document, checksums) = if checksum_policy == ChecksumPolicy::Ignore {
            (self.transport.fetch(repository, &path).await, Vec::new())
        }
        else {
            let sha1_path = format!("{}.{}", path, ChecksumAlgorithm::Sha1.extension());
            let md5_path = format!("{}.{}", path, ChecksumAlgorithm::Md5.extension());
            let (document, sha1, md5) = futures::join!(
                self.transport.fetch(repository, &path),
                self.transport.fetch(repository, &sha1_path),
                self.transport.fetch(repository, &md5_path),
            );
            (document, vec![(ChecksumAlgorithm::Sha1, sha1), (ChecksumAlgorithm::Md5, md5)])
        };

        let resource = match document {
            Ok(resource) => resource,
            Err(TransportError::NotFound(_)) => {
                debug!("{} could not be found on repository: {}", metadata, repository.id);
                remove_file(metadata, file).await?;
                return Ok(());
            }
            Err(e) => {
                warn!("{} could not be retrieved from repository: {} due to an error: {}", metadata, repository.id, e);
                if allow_blacklisting {
                    info!("Repository '{}' will be blacklisted", repository.id);
                    self.session.blacklist(&repository.id);
                }
                return Err(RepositoryMetadataError::TransferFailed {
                    metadata: metadata.to_string(),
                    repository: repository.id.clone(),
                    message: e.to_string(),
                });
            }
        };

        let corrupt = |reason: String| RepositoryMetadataError::Corrupt {
            metadata: metadata.to_string(),
            repository: repository.id.clone(),
            reason,
        };

        let text = std::str::from_utf8(&resource.data)
            .map_err(|e| corrupt(e.to_string()))?;
        Metadata::parse(text)
            .map_err(|e| corrupt(e.to_string()))?;

        store_file(metadata, file, &resource.data).await?;

        let validator = checksums.into_iter()
            .find_map(|(algorithm, checksum)| checksum.ok().map(|c| (algorithm, c)))
            .map(|(algorithm, checksum)| {
                let content = String::from_utf8_lossy(&checksum.data).to_string();
                algorithm.validator(&content)
                    .map_err(|e| format!("invalid {} checksum file: {}", algorithm.extension(), e))
            });

        let mut validator: Box<dyn ChecksumValidator> = match validator {
            Some(Ok(validator)) => validator,
            Some(Err(reason)) => return self.checksum_failure(metadata, repository, file, checksum_policy, reason).await,
            None if checksum_policy == ChecksumPolicy::Ignore => Box::new(NopChecksumValidator {}),
            None => return self.checksum_failure(metadata, repository, file, checksum_policy, "no checksum available".to_string()).await,
        };

        let valid = verify_file(file, validator.as_mut()).await
            .map_err(|e| RepositoryMetadataError::Unreadable {
                metadata: metadata.to_string(),
                path: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !valid {
            return self.checksum_failure(metadata, repository, file, checksum_policy, "checksum mismatch".to_string()).await;
        }
        Ok(())
    }

    async fn checksum_failure(&self, metadata: &RepositoryMetadata, repository: &ArtifactRepository, file: &Path, checksum_policy: ChecksumPolicy, reason: String) -> Result<()> {
        match checksum_policy {
            ChecksumPolicy::Fail => {
                remove_file(metadata, file).await?;
                Err(RepositoryMetadataError::Corrupt {
                    metadata: metadata.to_string(),
                    repository: repository.id.clone(),
                    reason,
                })
            }
            ChecksumPolicy::Warn => {
                warn!("*** CHECKSUM FAILED - {} for {} from {} - IGNORING", reason, metadata, repository.id);
                Ok(())
            }
            ChecksumPolicy::Ignore => Ok(()),
        }
    }
}

/// a document carrying nothing but the coordinates of `kind`
fn skeleton(kind: &MetadataKind) -> Metadata {
    let mut document = Metadata::default();
    fill_coordinates(&mut document, kind);
    document
}

fn fill_coordinates(document: &mut Metadata, kind: &MetadataKind) {
    match kind {
        MetadataKind::Group { group_id } => {
            document.group_id.get_or_insert_with(|| group_id.clone());
        }
        MetadataKind::Artifact { group_id, artifact_id } => {
            document.group_id.get_or_insert_with(|| group_id.clone());
            document.artifact_id.get_or_insert_with(|| artifact_id.clone());
        }
        MetadataKind::Snapshot { group_id, artifact_id, base_version } => {
            document.group_id.get_or_insert_with(|| group_id.clone());
            document.artifact_id.get_or_insert_with(|| artifact_id.clone());
            document.version.get_or_insert_with(|| base_version.clone());
        }
    }
}

/// Merges `metadata.content` into the document stored at `file` and writes the result back.
async fn store_merged(metadata: &mut RepositoryMetadata, file: &Path) -> Result<Metadata> {
    let mut document = match read_document(metadata, file).await? {
        Some(mut existing) => {
            existing.merge(&metadata.content);
            existing
        }
        None => metadata.content.clone(),
    };
    fill_coordinates(&mut document, &metadata.kind);

    write_document(metadata, file, &document).await?;
    metadata.file = Some(file.to_path_buf());
    Ok(document)
}

async fn read_document(metadata: &RepositoryMetadata, file: &Path) -> Result<Option<Metadata>> {
    let unreadable = |reason: String| RepositoryMetadataError::Unreadable {
        metadata: metadata.to_string(),
        path: file.to_path_buf(),
        reason,
    };

    let xml = match tokio::fs::read_to_string(file).await {
        Ok(xml) => xml,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unreadable(e.to_string())),
    };
    trace!("read {:?}", file);

    Metadata::parse(&xml)
        .map(Some)
        .map_err(|e| unreadable(e.to_string()))
}

async fn write_document(metadata: &RepositoryMetadata, file: &Path, document: &Metadata) -> Result<()> {
    let xml = serialize(metadata, file, document)?;
    store_file(metadata, file, xml.as_bytes()).await
}

fn serialize(metadata: &RepositoryMetadata, file: &Path, document: &Metadata) -> Result<String> {
    document.to_xml()
        .map_err(|e| RepositoryMetadataError::Store {
            metadata: metadata.to_string(),
            path: file.to_path_buf(),
            source: std::io::Error::other(e),
        })
}

async fn store_file(metadata: &RepositoryMetadata, file: &Path, data: &[u8]) -> Result<()> {
    write_atomically(file, data).await
        .map_err(|source| RepositoryMetadataError::Store {
            metadata: metadata.to_string(),
            path: file.to_path_buf(),
            source,
        })?;
    trace!("stored {:?}", file);
    Ok(())
}

/// Writes to a temporary file next to the target and renames it, so that readers never see a
///  partially written file.
pub(crate) async fn write_atomically(file: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = file.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = file.with_file_name(format!(".{}.tmp", Uuid::new_v4()));
    tokio::fs::write(&tmp, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp, file).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

async fn remove_file(metadata: &RepositoryMetadata, file: &Path) -> Result<()> {
    match tokio::fs::remove_file(file).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RepositoryMetadataError::Store {
            metadata: metadata.to_string(),
            path: file.to_path_buf(),
            source,
        }),
    }
}

async fn file_exists(file: &Path) -> bool {
    tokio::fs::try_exists(file).await.unwrap_or(false)
}

pub(crate) async fn modification_time(file: &Path) -> Option<DateTime<Utc>> {
    tokio::fs::metadata(file).await.ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
}

async fn touch(metadata: &RepositoryMetadata, file: &Path) -> Result<()> {
    let path = file.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(SystemTime::now())
    }).await;

    result
        .unwrap_or_else(|e| Err(std::io::Error::other(e)))
        .map_err(|source| RepositoryMetadataError::Store {
            metadata: metadata.to_string(),
            path: file.to_path_buf(),
            source,
        })
}
