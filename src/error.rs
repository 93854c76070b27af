use std::path::PathBuf;

use thiserror::Error;

use crate::maven::model_resolver::RequestKind;
use crate::model::validation::ModelProblem;

/// Failure reported by a [`Transport`](crate::maven::transport::Transport) implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("resource does not exist: {0}")]
    NotFound(String),

    #[error("transfer of {path} failed: {message}")]
    TransferFailed { path: String, message: String },
}

/// Everything that can go wrong while resolving, installing or deploying repository metadata.
///  Each variant carries the descriptor of the metadata it was working on.
#[derive(Error, Debug)]
pub enum RepositoryMetadataError {
    #[error("{metadata} could not be retrieved from repository {repository}: {message}")]
    TransferFailed {
        metadata: String,
        repository: String,
        message: String,
    },

    #[error("{metadata} could not be found on repository {repository}")]
    NotFound { metadata: String, repository: String },

    #[error("{metadata} downloaded from repository {repository} is invalid: {reason}")]
    Corrupt {
        metadata: String,
        repository: String,
        reason: String,
    },

    #[error("unable to read local copy of {metadata} from {}: {reason}", .path.display())]
    Unreadable {
        metadata: String,
        path: PathBuf,
        reason: String,
    },

    #[error("unable to store local copy of {metadata} at {}", .path.display())]
    Store {
        metadata: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("System is offline. Cannot resolve required metadata: {metadata}")]
    Offline { metadata: String },
}

impl RepositoryMetadataError {
    pub fn metadata(&self) -> &str {
        match self {
            RepositoryMetadataError::TransferFailed { metadata, .. } => metadata,
            RepositoryMetadataError::NotFound { metadata, .. } => metadata,
            RepositoryMetadataError::Corrupt { metadata, .. } => metadata,
            RepositoryMetadataError::Unreadable { metadata, .. } => metadata,
            RepositoryMetadataError::Store { metadata, .. } => metadata,
            RepositoryMetadataError::Offline { metadata } => metadata,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionRangeError {
    #[error("unbounded range: {0}")]
    Unbounded(String),

    #[error("ranges overlap: {0}")]
    Overlap(String),

    #[error("only fully-qualified sets allowed in multiple set scenario: {0}")]
    MixedSet(String),

    #[error("single version must be surrounded by []: {0}")]
    SingleVersion(String),

    #[error("range cannot have identical boundaries: {0}")]
    IdenticalBoundaries(String),

    #[error("range defies version ordering: {0}")]
    DefiesOrdering(String),
}

#[derive(Error, Debug)]
pub enum ModelResolutionError {
    // NB: downstream integration tests match on this exact wording
    #[error("The requested {kind} version range '{version}' does not specify an upper bound")]
    OpenEndedRange {
        kind: RequestKind,
        group_id: String,
        artifact_id: String,
        version: String,
    },

    #[error("No versions matched the requested {kind} version range '{version}' of {group_id}:{artifact_id} (repositories: {})", .repositories.join(", "))]
    NoMatchingVersion {
        kind: RequestKind,
        group_id: String,
        artifact_id: String,
        version: String,
        repositories: Vec<String>,
    },

    #[error("invalid {kind} version range '{version}' of {group_id}:{artifact_id}")]
    InvalidRange {
        kind: RequestKind,
        group_id: String,
        artifact_id: String,
        version: String,
        #[source]
        source: VersionRangeError,
    },

    #[error("could not find {group_id}:{artifact_id}:pom:{version} (repositories: {})", .repositories.join(", "))]
    Unresolvable {
        group_id: String,
        artifact_id: String,
        version: String,
        repositories: Vec<String>,
    },

    #[error(transparent)]
    Metadata(#[from] RepositoryMetadataError),
}

#[derive(Error, Debug)]
pub enum VersionResolutionError {
    #[error("System is offline. Cannot resolve the latest snapshot build number of {artifact}")]
    Offline { artifact: String },

    #[error("failed to resolve the version of {artifact}")]
    Metadata {
        artifact: String,
        #[source]
        source: RepositoryMetadataError,
    },
}

#[derive(Error, Debug)]
#[error("failed to build the effective model of {model_id}:{}", format_problems(.problems))]
pub struct ModelBuildingError {
    pub model_id: String,
    pub problems: Vec<ModelProblem>,
}

fn format_problems(problems: &[ModelProblem]) -> String {
    problems
        .iter()
        .map(|p| format!("\n  {}", p))
        .collect()
}
