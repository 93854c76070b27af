use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use arti_model::config::ResolverConfig;
use arti_model::maven::artifact::Artifact;
use arti_model::maven::coordinates::MavenCoordinates;
use arti_model::maven::metadata_manager::RepositoryMetadataManager;
use arti_model::maven::model_resolver::{ModelRequest, ModelResolver, RequestKind};
use arti_model::maven::session::ResolutionSession;
use arti_model::maven::transform::VersionResolver;
use arti_model::maven::transport::http::HttpTransport;
use arti_model::maven::transport::Transport;

#[derive(Parser)]
#[command(version, about = "Resolves artifact versions and model files against Maven repositories")]
struct Cli {
    /// resolver configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// do not contact remote repositories
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints the concrete version of groupId:artifactId:version, resolving LATEST, RELEASE and snapshots
    ResolveVersion {
        coordinates: String,
        #[arg(long = "type", default_value = "jar")]
        type_: String,
        #[arg(long)]
        classifier: Option<String>,
    },
    /// Prints the local path of the model file for groupId:artifactId:version, where version may be a range
    ResolveModel {
        coordinates: String,
        #[arg(long, value_enum, default_value_t = Kind::Dependency)]
        kind: Kind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Parent,
    Dependency,
}

impl From<Kind> for RequestKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Parent => RequestKind::Parent,
            Kind::Dependency => RequestKind::Dependency,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ResolverConfig::load(&cli.config).await?;
    debug!("using local repository {:?}", config.local_repository);

    let local = config.local_repository();
    let remotes = config.remote_repositories();
    let session = Arc::new(ResolutionSession::new(!(config.offline || cli.offline)));
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
    let metadata_manager = Arc::new(RepositoryMetadataManager::new(transport.clone(), session));

    match cli.command {
        Command::ResolveVersion { coordinates, type_, classifier } => {
            let coordinates = MavenCoordinates::parse(&coordinates)?;
            let mut artifact = Artifact::new(&coordinates.group_id, &coordinates.artifact_id, &coordinates.version, &type_);
            artifact.classifier = classifier;

            let version = VersionResolver::new(metadata_manager, transport)
                .resolve_version(&artifact, &local, &remotes)
                .await
                .with_context(|| format!("unable to resolve {}", coordinates))?;
            println!("{}", version);
        }
        Command::ResolveModel { coordinates, kind } => {
            let coordinates = MavenCoordinates::parse(&coordinates)?;
            let request = ModelRequest {
                kind: kind.into(),
                group_id: coordinates.group_id,
                artifact_id: coordinates.artifact_id,
                version: coordinates.version,
            };

            let resolved = ModelResolver::new(metadata_manager, transport, local)
                .resolve_model(&request, &remotes)
                .await?;
            println!("{}", resolved.source.display());
            if let Some(version) = resolved.rewritten_version {
                println!("version: {}", version);
            }
        }
    }
    Ok(())
}
