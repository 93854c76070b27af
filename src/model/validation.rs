use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use crate::model::{Dependency, Model, Plugin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("WARNING"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProblem {
    pub severity: Severity,
    pub message: String,
    /// id of the model the problem was found in
    pub source: String,
}

impl Display for ModelProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} @ {}", self.severity, self.message, self.source)
    }
}

#[derive(Debug, Default)]
pub struct ModelProblemCollector {
    problems: Vec<ModelProblem>,
}

impl ModelProblemCollector {
    pub fn add(&mut self, severity: Severity, message: String, model: &Model) {
        self.problems.push(ModelProblem {
            severity,
            message,
            source: model.id(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(|p| p.severity == Severity::Error)
    }

    pub fn problems(&self) -> &[ModelProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<ModelProblem> {
        self.problems
    }
}

/// Checks a model as written, before profiles, inheritance and management are applied.
pub fn validate_raw_model(model: &Model, problems: &mut ModelProblemCollector) {
    if is_blank(model.artifact_id.as_deref()) {
        problems.add(Severity::Error, "'artifactId' is missing.".to_string(), model);
    }
    if is_blank(model.effective_group_id()) {
        problems.add(Severity::Error, "'groupId' is missing.".to_string(), model);
    }
    if is_blank(model.effective_version()) {
        problems.add(Severity::Error, "'version' is missing.".to_string(), model);
    }
    if let Some(parent) = &model.parent {
        if parent.group_id == model.effective_group_id().unwrap_or_default()
            && Some(parent.artifact_id.as_str()) == model.artifact_id.as_deref()
        {
            problems.add(Severity::Error, format!("The parent element cannot have the same groupId:artifactId as the project: {}:{}", parent.group_id, parent.artifact_id), model);
        }
    }

    validate_unique_dependencies("dependencies.dependency", &model.dependencies, Severity::Warning, model, problems);
    if let Some(management) = &model.dependency_management {
        validate_unique_dependencies("dependencyManagement.dependencies.dependency", &management.dependencies, Severity::Warning, model, problems);
    }

    validate_unique_repositories("repositories.repository", model.repositories.iter().map(|r| r.id.as_str()), model, problems);
    validate_unique_repositories("pluginRepositories.pluginRepository", model.plugin_repositories.iter().map(|r| r.id.as_str()), model, problems);

    if let Some(build) = &model.build {
        validate_plugins("build.plugins.plugin", &build.plugins, model, problems);
        if let Some(management) = &build.plugin_management {
            validate_plugins("build.pluginManagement.plugins.plugin", &management.plugins, model, problems);
        }
    }

    let mut profile_ids = HashSet::new();
    for profile in &model.profiles {
        if !profile_ids.insert(profile.id.as_str()) {
            problems.add(Severity::Error, format!("profiles.profile.id must be unique but found duplicate profile with id {}", profile.id), model);
        }
        validate_unique_dependencies(&format!("profiles.profile[{}].dependencies.dependency", profile.id), &profile.dependencies, Severity::Warning, model, problems);
        if let Some(build) = &profile.build {
            validate_plugins(&format!("profiles.profile[{}].build.plugins.plugin", profile.id), &build.plugins, model, problems);
        }
    }
}

/// Checks the fully assembled model.
pub fn validate_effective_model(model: &Model, problems: &mut ModelProblemCollector) {
    if is_blank(model.group_id.as_deref()) {
        problems.add(Severity::Error, "'groupId' is missing.".to_string(), model);
    }
    if is_blank(model.version.as_deref()) {
        problems.add(Severity::Error, "'version' is missing.".to_string(), model);
    }

    for dependency in &model.dependencies {
        let key = dependency.management_key();
        if is_blank(dependency.version.as_deref()) {
            problems.add(Severity::Error, format!("'dependencies.dependency.version' for {} is missing.", key), model);
        }
        if dependency.scope.as_deref() == Some("system") && is_blank(dependency.system_path.as_deref()) {
            problems.add(Severity::Error, format!("'dependencies.dependency.systemPath' for {} is missing.", key), model);
        }
        if dependency.scope.as_deref() != Some("system") && dependency.system_path.is_some() {
            problems.add(Severity::Error, format!("'dependencies.dependency.systemPath' for {} must be omitted. This field may only be specified for a dependency with system scope.", key), model);
        }
    }

    if let Some(build) = &model.build {
        validate_plugins("build.plugins.plugin", &build.plugins, model, problems);
    }
}

fn validate_unique_dependencies(prefix: &str, dependencies: &[Dependency], severity: Severity, model: &Model, problems: &mut ModelProblemCollector) {
    let mut keys = HashSet::new();
    for dependency in dependencies {
        let key = dependency.management_key();
        if !keys.insert(key.clone()) {
            problems.add(severity, format!("'{}.(groupId:artifactId:type:classifier)' must be unique: {} -> duplicate declaration of version {}", prefix, key, dependency.version.as_deref().unwrap_or("(?)")), model);
        }
    }
}

fn validate_unique_repositories<'a>(prefix: &str, ids: impl Iterator<Item = &'a str>, model: &Model, problems: &mut ModelProblemCollector) {
    let mut seen = HashSet::new();
    for id in ids {
        if id.is_empty() {
            problems.add(Severity::Error, format!("'{}.id' is missing.", prefix), model);
        }
        else if !seen.insert(id) {
            problems.add(Severity::Error, format!("'{}.id' must be unique: {} -> duplicate declaration", prefix, id), model);
        }
    }
}

fn validate_plugins(prefix: &str, plugins: &[Plugin], model: &Model, problems: &mut ModelProblemCollector) {
    let mut keys = HashSet::new();
    for plugin in plugins {
        if plugin.artifact_id.is_empty() {
            problems.add(Severity::Error, format!("'{}.artifactId' is missing.", prefix), model);
            continue;
        }
        if !keys.insert(plugin.key()) {
            problems.add(Severity::Warning, format!("'{}.(groupId:artifactId)' must be unique but found duplicate declaration of plugin {}", prefix, plugin.key()), model);
        }

        let mut execution_ids = HashSet::new();
        for execution in &plugin.executions {
            if !execution_ids.insert(execution.id.as_str()) {
                problems.add(Severity::Error, format!("'{}[{}].executions.execution.id' must be unique but found duplicate execution with id {}", prefix, plugin.key(), execution.id), model);
            }
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

#[cfg(test)]
mod test {
    use crate::model::{PluginExecution, Profile, Repository};
    use super::*;

    fn validate(model: &Model) -> Vec<ModelProblem> {
        let mut problems = ModelProblemCollector::default();
        validate_raw_model(model, &mut problems);
        problems.into_problems()
    }

    #[test]
    fn test_valid_model() {
        let mut model = Model::new("g", "a", "1");
        model.dependencies.push(Dependency::new("g", "b").with_version("1"));
        assert!(validate(&model).is_empty());
    }

    #[test]
    fn test_missing_coordinates() {
        let problems = validate(&Model::default());
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().all(|p| p.severity == Severity::Error));
    }

    #[test]
    fn test_duplicate_dependency_is_a_warning() {
        let mut model = Model::new("g", "a", "1");
        model.dependencies.push(Dependency::new("g", "b").with_version("1"));
        model.dependencies.push(Dependency::new("g", "b").with_version("2"));

        let problems = validate(&model);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].severity, Severity::Warning);
        assert_eq!(problems[0].to_string(), "[WARNING] 'dependencies.dependency.(groupId:artifactId:type:classifier)' must be unique: g:b:jar -> duplicate declaration of version 2 @ g:a:1");
    }

    #[test]
    fn test_duplicate_ids_are_errors() {
        let mut model = Model::new("g", "a", "1");
        model.repositories.push(Repository { id: "central".to_string(), ..Default::default() });
        model.repositories.push(Repository { id: "central".to_string(), ..Default::default() });
        model.profiles.push(Profile::new("p"));
        model.profiles.push(Profile::new("p"));
        let mut plugin = Plugin::new("g", "p");
        plugin.executions.push(PluginExecution::new("default"));
        plugin.executions.push(PluginExecution::new("default"));
        model.build_mut().plugins.push(plugin);

        let problems = validate(&model);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().all(|p| p.severity == Severity::Error));
    }

    #[test]
    fn test_effective_model_requires_dependency_versions() {
        let mut model = Model::new("g", "a", "1");
        model.dependencies.push(Dependency::new("g", "b"));

        let mut problems = ModelProblemCollector::default();
        validate_effective_model(&model, &mut problems);
        assert!(problems.has_errors());
        assert_eq!(problems.problems()[0].message, "'dependencies.dependency.version' for g:b:jar is missing.");
    }
}
