//! The default repository layout: where artifacts, metadata and legacy version files live,
//!  relative to a repository root.

use crate::maven::artifact::Artifact;
use crate::maven::metadata::MetadataKind;
use crate::maven::repository::MetadataLayout;

pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";
pub const LOCAL_REPOSITORY_ID: &str = "local";
pub const REPOSITORY_INF_DIRECTORY: &str = "REPOSITORY-INF";

/// `org/example/app/1.0-SNAPSHOT/app-1.0-20240101.120000-3-sources.jar`
pub fn artifact_path(artifact: &Artifact) -> String {
    let classifier = match &artifact.classifier {
        Some(c) if !c.is_empty() => format!("-{}", c),
        _ => String::new(),
    };
    format!(
        "{}/{}/{}/{}-{}{}.{}",
        artifact.group_id.replace('.', "/"),
        artifact.artifact_id,
        artifact.base_version(),
        artifact.artifact_id,
        artifact.version(),
        classifier,
        artifact.extension(),
    )
}

/// the directory a metadata document belongs to, without trailing slash
pub fn metadata_directory(kind: &MetadataKind) -> String {
    match kind {
        MetadataKind::Group { group_id } => group_id.replace('.', "/"),
        MetadataKind::Artifact { group_id, artifact_id } => format!("{}/{}", group_id.replace('.', "/"), artifact_id),
        MetadataKind::Snapshot { group_id, artifact_id, base_version } => format!("{}/{}/{}", group_id.replace('.', "/"), artifact_id, base_version),
    }
}

/// path of a metadata document inside a remote repository
pub fn remote_metadata_path(kind: &MetadataKind) -> String {
    format!("{}/{}", metadata_directory(kind), METADATA_FILE_NAME)
}

/// Path of the local cache of a remote repository's metadata document. The repository id is
///  part of the path so that documents from different remotes never overwrite each other.
pub fn local_metadata_path(kind: &MetadataKind, repository_id: &str, layout: MetadataLayout) -> String {
    match layout {
        MetadataLayout::PerRepositorySuffix => format!("{}/maven-metadata-{}.xml", metadata_directory(kind), repository_id),
        MetadataLayout::RepositoryInf => format!("{}/{}/{}", REPOSITORY_INF_DIRECTORY, repository_id, remote_metadata_path(kind)),
    }
}

/// `<a>-<baseVersion>.version.txt` next to a snapshot artifact, written by tooling that predates
///  repository metadata
pub fn legacy_version_file_path(artifact: &Artifact) -> String {
    format!(
        "{}/{}/{}/{}-{}.version.txt",
        artifact.group_id.replace('.', "/"),
        artifact.artifact_id,
        artifact.base_version(),
        artifact.artifact_id,
        artifact.base_version(),
    )
}
