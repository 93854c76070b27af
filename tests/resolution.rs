use std::sync::Arc;

use arti_model::maven::artifact::Artifact;
use arti_model::maven::metadata_manager::RepositoryMetadataManager;
use arti_model::maven::model_resolver::{ModelRequest, ModelResolver};
use arti_model::maven::repository::{ArtifactRepository, ChecksumPolicy, LocalRepository, MetadataLayout, UpdatePolicy};
use arti_model::maven::session::ResolutionSession;
use arti_model::maven::transform::ArtifactTransformationManager;
use arti_model::maven::transport::memory::InMemoryTransport;
use arti_model::model::profile_activation::ActivationContext;
use arti_model::model::{Dependency, DependencyManagement, Model, Parent};
use arti_model::{build_effective_model, resolve_version};

fn snapshots_repository() -> ArtifactRepository {
    let mut repository = ArtifactRepository::new("snapshots", "mem://snapshots");
    repository.snapshots.update_policy = UpdatePolicy::Always;
    repository.snapshots.checksum_policy = ChecksumPolicy::Fail;
    repository
}

fn manager(transport: &Arc<InMemoryTransport>) -> Arc<RepositoryMetadataManager> {
    Arc::new(RepositoryMetadataManager::new(transport.clone(), Arc::new(ResolutionSession::online())))
}

#[tokio::test]
async fn deployed_snapshot_is_resolved_by_next_session() {
    let deployer_dir = tempfile::tempdir().unwrap();
    let consumer_dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(InMemoryTransport::new());
    let remote = snapshots_repository();

    // two deployments in two sessions
    let mut deployed_versions = Vec::new();
    for _ in 0..2 {
        let deployer_local = LocalRepository::new(deployer_dir.path(), MetadataLayout::PerRepositorySuffix);
        let metadata_manager = manager(&transport);
        let transformations = ArtifactTransformationManager::new(metadata_manager.clone(), transport.clone());

        let mut artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
        transformations.transform_for_deployment(&mut artifact, &remote, &deployer_local).await.unwrap();
        for metadata in artifact.metadata_mut() {
            metadata_manager.deploy(metadata, &deployer_local, &remote).await.unwrap();
        }
        deployed_versions.push(artifact.version().to_string());
    }
    assert!(deployed_versions[0].ends_with("-1"), "{:?}", deployed_versions);
    assert!(deployed_versions[1].ends_with("-2"), "{:?}", deployed_versions);

    let consumer_local = LocalRepository::new(consumer_dir.path(), MetadataLayout::RepositoryInf);
    let artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
    let version = resolve_version(manager(&transport), transport.clone(), &artifact, &consumer_local, &[remote]).await.unwrap();
    assert_eq!(version, deployed_versions[1]);
}

#[tokio::test]
async fn installed_snapshot_shadows_remote_builds() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
    let transport = Arc::new(InMemoryTransport::new());
    transport.add("snapshots", "org/example/app/1.0-SNAPSHOT/maven-metadata.xml",
                  "<metadata><versioning><snapshot><timestamp>20200101.000000</timestamp><buildNumber>4</buildNumber></snapshot><lastUpdated>20200101000000</lastUpdated></versioning></metadata>");
    transport.add("snapshots", "org/example/app/1.0-SNAPSHOT/maven-metadata.xml.sha1", "0000000000000000000000000000000000000000");

    let metadata_manager = manager(&transport);
    let transformations = ArtifactTransformationManager::new(metadata_manager.clone(), transport.clone());

    let mut installed = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
    transformations.transform_for_install(&mut installed, &local).await.unwrap();
    for metadata in installed.metadata_mut() {
        metadata_manager.install(metadata, &local).await.unwrap();
    }

    // the bad checksum only warns, and the install is newer than the remote build
    let mut remote = snapshots_repository();
    remote.snapshots.checksum_policy = ChecksumPolicy::Warn;
    let artifact = Artifact::new("org.example", "app", "1.0-SNAPSHOT", "jar");
    let version = resolve_version(metadata_manager, transport.clone(), &artifact, &local, &[remote]).await.unwrap();
    assert_eq!(version, "1.0-SNAPSHOT");
}

#[tokio::test]
async fn parent_range_feeds_effective_model() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalRepository::new(dir.path(), MetadataLayout::PerRepositorySuffix);
    let transport = Arc::new(InMemoryTransport::new());
    transport.add("central", "org/example/parent/maven-metadata.xml",
                  "<metadata><versioning><versions><version>1.0</version><version>1.1</version><version>2.0</version></versions></versioning></metadata>");
    transport.add("central", "org/example/parent/1.1/parent-1.1.pom", "<project/>");

    let mut central = ArtifactRepository::new("central", "mem://central");
    central.releases.checksum_policy = ChecksumPolicy::Ignore;

    let mut child = Model::default();
    child.artifact_id = Some("child".to_string());
    child.parent = Some(Parent {
        group_id: "org.example".to_string(),
        artifact_id: "parent".to_string(),
        version: "[1.0,2.0)".to_string(),
        relative_path: None,
    });
    child.dependencies.push(Dependency::new("org.lib", "lib"));

    let resolver = ModelResolver::new(manager(&transport), transport.clone(), local);
    let resolved = resolver.resolve_model(&ModelRequest::parent(child.parent.as_ref().unwrap()), &[central]).await.unwrap();
    assert_eq!(resolved.rewritten_version.as_deref(), Some("1.1"));
    assert!(resolved.source.ends_with("org/example/parent/1.1/parent-1.1.pom"));

    if let (Some(parent), Some(version)) = (child.parent.as_mut(), resolved.rewritten_version) {
        parent.version = version;
    }

    let mut parent = Model::new("org.example", "parent", "1.1");
    parent.packaging = Some("pom".to_string());
    parent.dependency_management = Some(DependencyManagement {
        dependencies: vec![Dependency::new("org.lib", "lib").with_version("${project.version}")],
    });

    let result = build_effective_model(&child, &[parent], &ActivationContext::default()).unwrap();
    assert_eq!(result.effective_model.id(), "org.example:child:1.1");
    assert_eq!(result.effective_model.dependencies[0].version.as_deref(), Some("1.1"));
}
