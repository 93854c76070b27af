use std::collections::HashMap;

use tracing::trace;

use crate::model::merger::{merge_scalar, MergeContext, MergeFlavor, ModelMerger};
use crate::model::{Dependency, Model, Plugin};

/// How much of a managed plugin is applied to a declared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginManagementMode {
    /// version and extensions only, plus the managed dependencies if the declared plugin has none
    Basic,
    /// everything, including executions and configuration
    #[default]
    Full,
}

/// Applies `dependencyManagement` and `pluginManagement` defaults to the dependencies and plugins
///  a model actually declares. Declared values always win, and managed entries that are not
///  declared are never added.
#[derive(Debug, Clone)]
pub struct ManagementInjector {
    merger: ModelMerger,
}

impl Default for ManagementInjector {
    fn default() -> Self {
        ManagementInjector {
            merger: ModelMerger::new(MergeFlavor::Management),
        }
    }
}

impl ManagementInjector {
    pub fn inject_management(&self, model: &mut Model, mode: PluginManagementMode) {
        self.inject_plugin_management(model, mode);
        self.inject_dependency_management(model);
    }

    pub fn inject_dependency_management(&self, model: &mut Model) {
        let Some(management) = &model.dependency_management else { return };
        if management.dependencies.is_empty() {
            return;
        }

        let managed: HashMap<String, &Dependency> = management.dependencies.iter()
            .map(|d| (d.management_key(), d))
            .collect();

        for dependency in model.dependencies.iter_mut() {
            if let Some(managed) = managed.get(&dependency.management_key()) {
                trace!("applying managed defaults to dependency {}", dependency.management_key());
                self.merger.merge_dependency(dependency, managed, false);
            }
        }
    }

    pub fn inject_plugin_management(&self, model: &mut Model, mode: PluginManagementMode) {
        let Some(build) = &mut model.build else { return };
        let Some(management) = &build.plugin_management else { return };
        if management.plugins.is_empty() {
            return;
        }

        let managed: HashMap<String, &Plugin> = management.plugins.iter()
            .map(|p| (p.key(), p))
            .collect();

        let mut ctx = MergeContext::default();
        for plugin in build.plugins.iter_mut() {
            let Some(managed) = managed.get(&plugin.key()) else { continue };
            trace!("applying managed defaults to plugin {}", plugin.key());

            match mode {
                PluginManagementMode::Full => self.merger.merge_plugin(plugin, managed, false, &mut ctx),
                PluginManagementMode::Basic => {
                    merge_scalar(&mut plugin.version, &managed.version, false);
                    merge_scalar(&mut plugin.extensions, &managed.extensions, false);
                    if plugin.dependencies.is_empty() {
                        plugin.dependencies = managed.dependencies.clone();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use crate::model::{DependencyManagement, Exclusion, PluginExecution, PluginManagement};
    use crate::model::dom::XmlNode;
    use super::*;

    fn model_with_management() -> Model {
        let mut model = Model::new("org.example", "app", "1.0");

        let mut managed_dep = Dependency::new("org.slf4j", "slf4j-api").with_version("2.0.9");
        managed_dep.scope = Some("compile".to_string());
        managed_dep.exclusions.push(Exclusion { group_id: "x".to_string(), artifact_id: "y".to_string() });
        model.dependency_management = Some(DependencyManagement {
            dependencies: vec![managed_dep, Dependency::new("org.unused", "unused").with_version("1")],
        });
        model.dependencies.push(Dependency::new("org.slf4j", "slf4j-api"));

        let mut managed_plugin = Plugin::new("org.apache.maven.plugins", "maven-surefire-plugin");
        managed_plugin.version = Some("3.2.2".to_string());
        managed_plugin.dependencies.push(Dependency::new("org.junit", "provider").with_version("1"));
        managed_plugin.executions.push(PluginExecution::new("default-test").with_goals(&["test"]));
        managed_plugin.configuration = Some(XmlNode::new("configuration").with_child(XmlNode::new("forkCount").with_value("1")));

        let mut declared_plugin = Plugin::new("org.apache.maven.plugins", "maven-surefire-plugin");
        declared_plugin.executions.push(PluginExecution::new("default-test").with_goals(&["report"]));
        declared_plugin.executions.push(PluginExecution::new("it").with_goals(&["integration-test"]));

        let build = model.build_mut();
        build.plugin_management = Some(PluginManagement { plugins: vec![managed_plugin] });
        build.plugins.push(declared_plugin);
        model
    }

    #[test]
    fn test_dependency_management() {
        let mut model = model_with_management();
        ManagementInjector::default().inject_dependency_management(&mut model);

        assert_eq!(model.dependencies.len(), 1);
        let dep = &model.dependencies[0];
        assert_eq!(dep.version.as_deref(), Some("2.0.9"));
        assert_eq!(dep.scope.as_deref(), Some("compile"));
        assert_eq!(dep.exclusions.len(), 1);
    }

    #[test]
    fn test_declared_values_win() {
        let mut model = model_with_management();
        model.dependencies[0].version = Some("1.7.36".to_string());
        model.dependencies[0].exclusions.push(Exclusion { group_id: "a".to_string(), artifact_id: "b".to_string() });
        ManagementInjector::default().inject_dependency_management(&mut model);

        let dep = &model.dependencies[0];
        assert_eq!(dep.version.as_deref(), Some("1.7.36"));
        assert_eq!(dep.exclusions, vec![Exclusion { group_id: "a".to_string(), artifact_id: "b".to_string() }]);
    }

    #[test]
    fn test_full_plugin_management() {
        let mut model = model_with_management();
        ManagementInjector::default().inject_plugin_management(&mut model, PluginManagementMode::Full);

        let plugin = &model.build.as_ref().unwrap().plugins[0];
        assert_eq!(plugin.version.as_deref(), Some("3.2.2"));
        assert_eq!(plugin.dependencies.len(), 1);
        assert!(plugin.configuration.is_some());

        let ids: Vec<_> = plugin.executions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["default-test", "it"]);
        assert_eq!(plugin.executions[0].goals, vec!["test", "report"]);
    }

    #[test]
    fn test_basic_plugin_management() {
        let mut model = model_with_management();
        ManagementInjector::default().inject_plugin_management(&mut model, PluginManagementMode::Basic);

        let plugin = &model.build.as_ref().unwrap().plugins[0];
        assert_eq!(plugin.version.as_deref(), Some("3.2.2"));
        assert_eq!(plugin.dependencies.len(), 1);
        assert!(plugin.configuration.is_none());
        assert_eq!(plugin.executions[0].goals, vec!["report"]);
    }

    #[rstest]
    #[case::basic(PluginManagementMode::Basic)]
    #[case::full(PluginManagementMode::Full)]
    fn test_injection_is_idempotent(#[case] mode: PluginManagementMode) {
        let injector = ManagementInjector::default();
        let mut model = model_with_management();
        injector.inject_management(&mut model, mode);
        let once = model.clone();
        injector.inject_management(&mut model, mode);
        assert_eq!(model, once);
    }
}
