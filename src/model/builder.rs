use tracing::{debug, warn};

use crate::error::ModelBuildingError;
use crate::model::inheritance::InheritanceAssembler;
use crate::model::interpolation::interpolate_model;
use crate::model::management::{ManagementInjector, PluginManagementMode};
use crate::model::profile_activation::{ActivationContext, ProfileSelector};
use crate::model::profile_injector::ProfileInjector;
use crate::model::validation::{validate_effective_model, validate_raw_model, ModelProblem, ModelProblemCollector};
use crate::model::{Model, Profile};

#[derive(Debug, Clone)]
pub struct ModelBuildingResult {
    pub effective_model: Model,
    /// ids of the profiles that were injected, root ancestor first
    pub active_profiles: Vec<String>,
    /// problems that did not prevent the build
    pub problems: Vec<ModelProblem>,
}

/// Builds effective models. Each step is a separate component so that callers can swap them,
///  e.g. for a different plugin management mode.
#[derive(Default)]
pub struct ModelBuilder {
    pub profile_selector: ProfileSelector,
    pub profile_injector: ProfileInjector,
    pub inheritance_assembler: InheritanceAssembler,
    pub management_injector: ManagementInjector,
    pub plugin_management_mode: PluginManagementMode,
}

impl ModelBuilder {
    /// `parent_chain` is ordered from the root ancestor down to the direct parent of `raw`.
    pub fn build(&self, raw: &Model, parent_chain: &[Model], ctx: &ActivationContext) -> Result<ModelBuildingResult, ModelBuildingError> {
        let mut problems = ModelProblemCollector::default();
        for model in parent_chain.iter().chain(std::iter::once(raw)) {
            validate_raw_model(model, &mut problems);
        }
        if problems.has_errors() {
            return Err(ModelBuildingError {
                model_id: raw.id(),
                problems: problems.into_problems(),
            });
        }

        let mut active_profiles = Vec::new();
        let mut lineage = Vec::with_capacity(parent_chain.len() + 1);
        for model in parent_chain {
            let mut model = model.clone();
            self.inject_active_profiles(&mut model, &[], ctx, &mut active_profiles);
            lineage.push(model);
        }
        let mut leaf = raw.clone();
        self.inject_active_profiles(&mut leaf, &ctx.external_profiles, ctx, &mut active_profiles);
        lineage.push(leaf);

        let mut effective = match self.inheritance_assembler.assemble_lineage(lineage) {
            Some(model) => model,
            None => raw.clone(),
        };

        interpolate_model(&mut effective, ctx);
        self.management_injector.inject_management(&mut effective, self.plugin_management_mode);

        validate_effective_model(&effective, &mut problems);
        if problems.has_errors() {
            return Err(ModelBuildingError {
                model_id: effective.id(),
                problems: problems.into_problems(),
            });
        }

        for problem in problems.problems() {
            warn!("{}", problem);
        }
        debug!("built effective model {} with profiles {:?}", effective.id(), active_profiles);

        Ok(ModelBuildingResult {
            effective_model: effective,
            active_profiles,
            problems: problems.into_problems(),
        })
    }

    fn inject_active_profiles(&self, model: &mut Model, external: &[Profile], ctx: &ActivationContext, active_ids: &mut Vec<String>) {
        let candidates: Vec<_> = external.iter().chain(model.profiles.iter()).cloned().collect();
        let active = self.profile_selector.active_profiles(&candidates, ctx);
        active_ids.extend(active.iter().map(|p| p.id.clone()));
        self.profile_injector.inject_profiles(model, active);
    }
}

/// Builds the effective model of `raw` with the default components: activates profiles, injects
///  them, folds in the parents, interpolates, applies management and validates the result.
pub fn build_effective_model(raw: &Model, parent_chain: &[Model], ctx: &ActivationContext) -> Result<ModelBuildingResult, ModelBuildingError> {
    ModelBuilder::default().build(raw, parent_chain, ctx)
}

#[cfg(test)]
mod test {
    use crate::model::*;
    use crate::model::validation::Severity;
    use super::*;

    fn parent() -> Model {
        let mut parent = Model::new("org.example", "parent", "1.0");
        parent.packaging = Some("pom".to_string());
        parent.properties.insert("lib.version".to_string(), "3.1".to_string());
        parent.dependency_management = Some(DependencyManagement {
            dependencies: vec![Dependency::new("org.lib", "lib").with_version("${lib.version}")],
        });

        let mut profile = Profile::new("ci");
        profile.activation = Some(Activation { active_by_default: true, ..Default::default() });
        profile.properties.insert("ci".to_string(), "true".to_string());
        parent.profiles.push(profile);
        parent
    }

    fn child() -> Model {
        let mut child = Model::default();
        child.artifact_id = Some("child".to_string());
        child.parent = Some(Parent {
            group_id: "org.example".to_string(),
            artifact_id: "parent".to_string(),
            version: "1.0".to_string(),
            relative_path: None,
        });
        child.dependencies.push(Dependency::new("org.lib", "lib"));
        child
    }

    #[test]
    fn test_build_effective_model() {
        let result = build_effective_model(&child(), &[parent()], &ActivationContext::default()).unwrap();
        let model = result.effective_model;

        assert_eq!(model.id(), "org.example:child:1.0");
        assert_eq!(model.dependencies[0].version.as_deref(), Some("3.1"));
        assert_eq!(model.properties.get("ci").map(|s| s.as_str()), Some("true"));
        assert_eq!(result.active_profiles, vec!["ci"]);
        assert!(result.problems.is_empty());
    }

    #[test]
    fn test_external_profiles_apply_to_leaf() {
        let mut external = Profile::new("settings");
        external.source = ProfileSource::External("settings.xml".to_string());
        external.activation = Some(Activation { active_by_default: true, ..Default::default() });
        external.properties.insert("lib.version".to_string(), "4.0".to_string());

        let ctx = ActivationContext {
            external_profiles: vec![external],
            ..Default::default()
        };
        let result = build_effective_model(&child(), &[parent()], &ctx).unwrap();

        assert_eq!(result.effective_model.dependencies[0].version.as_deref(), Some("4.0"));
        assert_eq!(result.active_profiles, vec!["ci", "settings"]);
    }

    #[test]
    fn test_missing_version_is_fatal() {
        let mut raw = Model::new("g", "a", "1");
        raw.dependencies.push(Dependency::new("org.lib", "lib"));

        let err = build_effective_model(&raw, &[], &ActivationContext::default()).unwrap_err();
        assert_eq!(err.model_id, "g:a:1");
        assert_eq!(err.problems.len(), 1);
        assert_eq!(err.problems[0].severity, Severity::Error);
    }

    #[test]
    fn test_warnings_are_reported() {
        let mut raw = Model::new("g", "a", "1");
        raw.dependencies.push(Dependency::new("org.lib", "lib").with_version("1"));
        raw.dependencies.push(Dependency::new("org.lib", "lib").with_version("1"));

        let result = build_effective_model(&raw, &[], &ActivationContext::default()).unwrap();
        assert_eq!(result.problems.len(), 1);
        assert_eq!(result.problems[0].severity, Severity::Warning);
    }
}
