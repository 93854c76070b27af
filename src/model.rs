//! The project model and the pipeline that turns a raw model into an effective one.
//!
//! Everything under this module is synchronous and performs no I/O apart from the file
//!  existence checks of profile activation.

pub mod builder;
pub mod dom;
pub mod inheritance;
pub mod interpolation;
pub mod management;
pub mod merger;
pub mod profile_activation;
pub mod profile_injector;
pub mod validation;

use std::collections::BTreeMap;

use crate::model::dom::XmlNode;

pub const DEFAULT_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";
pub const DEFAULT_EXECUTION_ID: &str = "default";
pub const DEFAULT_DEPENDENCY_TYPE: &str = "jar";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub model_version: Option<String>,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub parent: Option<Parent>,
    pub licenses: Vec<License>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Option<DependencyManagement>,
    pub repositories: Vec<Repository>,
    pub plugin_repositories: Vec<Repository>,
    pub build: Option<Build>,
    pub reporting: Option<Reporting>,
    pub distribution_management: Option<DistributionManagement>,
    pub profiles: Vec<Profile>,
}

impl Model {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Model {
        Model {
            group_id: Some(group_id.to_string()),
            artifact_id: Some(artifact_id.to_string()),
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    /// groupId, falling back to the parent reference's
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// version, falling back to the parent reference's
    pub fn effective_version(&self) -> Option<&str> {
        self.version.as_deref()
            .or_else(|| self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// `groupId:artifactId:version`, with `[unknown-...]` placeholders for missing parts
    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.effective_group_id().unwrap_or("[unknown-group-id]"),
            self.artifact_id.as_deref().unwrap_or("[unknown-artifact-id]"),
            self.effective_version().unwrap_or("[unknown-version]"),
        )
    }

    pub fn build_mut(&mut self) -> &mut Build {
        self.build.get_or_insert_with(Default::default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
    pub distribution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub type_: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub system_path: Option<String>,
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(group_id: &str, artifact_id: &str) -> Dependency {
        Dependency {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: &str) -> Dependency {
        self.version = Some(version.to_string());
        self
    }

    pub fn dependency_type(&self) -> &str {
        self.type_.as_deref().unwrap_or(DEFAULT_DEPENDENCY_TYPE)
    }

    /// `groupId:artifactId:type[:classifier]` - version and scope are deliberately not part of
    ///  the key, it matches a declared dependency to its managed defaults.
    pub fn management_key(&self) -> String {
        match self.classifier.as_deref() {
            Some(classifier) if !classifier.is_empty() => format!(
                "{}:{}:{}:{}", self.group_id, self.artifact_id, self.dependency_type(), classifier,
            ),
            _ => format!("{}:{}:{}", self.group_id, self.artifact_id, self.dependency_type()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginManagement {
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plugin {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub extensions: Option<bool>,
    pub inherited: Option<bool>,
    pub executions: Vec<PluginExecution>,
    pub dependencies: Vec<Dependency>,
    pub configuration: Option<XmlNode>,
}

impl Plugin {
    pub fn new(group_id: &str, artifact_id: &str) -> Plugin {
        Plugin {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            ..Default::default()
        }
    }

    pub fn key(&self) -> String {
        let group_id = if self.group_id.is_empty() { DEFAULT_PLUGIN_GROUP_ID } else { &self.group_id };
        format!("{}:{}", group_id, self.artifact_id)
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginExecution {
    pub id: String,
    pub phase: Option<String>,
    pub goals: Vec<String>,
    pub inherited: Option<bool>,
    pub configuration: Option<XmlNode>,
}

impl PluginExecution {
    pub fn new(id: &str) -> PluginExecution {
        PluginExecution {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_goals(mut self, goals: &[&str]) -> PluginExecution {
        self.goals = goals.iter().map(|g| g.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Build {
    pub source_directory: Option<String>,
    pub test_source_directory: Option<String>,
    pub output_directory: Option<String>,
    pub test_output_directory: Option<String>,
    pub directory: Option<String>,
    pub final_name: Option<String>,
    pub default_goal: Option<String>,
    pub filters: Vec<String>,
    pub resources: Vec<Resource>,
    pub test_resources: Vec<Resource>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Option<PluginManagement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    pub directory: Option<String>,
    pub target_path: Option<String>,
    pub filtering: Option<bool>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

/// A repository declaration as written in a model. See
///  [`ArtifactRepository`](crate::maven::repository::ArtifactRepository) for the runtime form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub layout: Option<String>,
    pub releases: Option<RepositoryPolicy>,
    pub snapshots: Option<RepositoryPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPolicy {
    pub enabled: Option<bool>,
    pub update_policy: Option<String>,
    pub checksum_policy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributionManagement {
    pub repository: Option<DeploymentRepository>,
    pub snapshot_repository: Option<DeploymentRepository>,
    pub site: Option<Site>,
    pub download_url: Option<String>,
    pub relocation: Option<Relocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentRepository {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub layout: Option<String>,
    pub unique_version: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Site {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

impl Site {
    fn is_empty(&self) -> bool {
        self.id.as_deref().unwrap_or("").is_empty()
            && self.name.as_deref().unwrap_or("").is_empty()
            && self.url.as_deref().unwrap_or("").is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocation {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reporting {
    pub exclude_defaults: Option<bool>,
    pub output_directory: Option<String>,
    pub plugins: Vec<ReportPlugin>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPlugin {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub inherited: Option<bool>,
    pub report_sets: Vec<ReportSet>,
    pub configuration: Option<XmlNode>,
}

impl ReportPlugin {
    pub fn key(&self) -> String {
        let group_id = if self.group_id.is_empty() { DEFAULT_PLUGIN_GROUP_ID } else { &self.group_id };
        format!("{}:{}", group_id, self.artifact_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSet {
    pub id: String,
    pub reports: Vec<String>,
    pub inherited: Option<bool>,
    pub configuration: Option<XmlNode>,
}

/// Where a profile was declared. External profiles (settings, command line tooling) are
///  activated independently of the model's own `activeByDefault` fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileSource {
    #[default]
    Pom,
    External(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub source: ProfileSource,
    pub activation: Option<Activation>,
    pub modules: Vec<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Option<DependencyManagement>,
    pub repositories: Vec<Repository>,
    pub plugin_repositories: Vec<Repository>,
    pub build: Option<Build>,
    pub reporting: Option<Reporting>,
    pub distribution_management: Option<DistributionManagement>,
}

impl Profile {
    pub fn new(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_active_by_default(&self) -> bool {
        self.activation.as_ref().map(|a| a.active_by_default).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    pub active_by_default: bool,
    pub jdk: Option<String>,
    pub os: Option<ActivationOs>,
    pub property: Option<ActivationProperty>,
    pub file: Option<ActivationFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationOs {
    pub name: Option<String>,
    pub family: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationProperty {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationFile {
    pub exists: Option<String>,
    pub missing: Option<String>,
}
