use tracing::debug;

use crate::model::merger::{MergeContext, MergeFlavor, ModelMerger};
use crate::model::{Model, Profile};

/// Overlays an active profile onto a model. The profile is the dominant side throughout.
#[derive(Debug, Clone)]
pub struct ProfileInjector {
    merger: ModelMerger,
}

impl Default for ProfileInjector {
    fn default() -> Self {
        ProfileInjector {
            merger: ModelMerger::new(MergeFlavor::Profile),
        }
    }
}

impl ProfileInjector {
    pub fn inject_profile(&self, model: &mut Model, profile: &Profile) {
        debug!("injecting profile {} into {}", profile.id, model.id());

        let merger = &self.merger;
        let mut ctx = MergeContext {
            target_artifact_id: model.artifact_id.clone(),
        };

        merger.merge_dependencies(&mut model.dependencies, &profile.dependencies, true);
        merger.merge_modules(&mut model.modules, &profile.modules);
        merger.merge_repositories(&mut model.repositories, &profile.repositories, true);
        merger.merge_repositories(&mut model.plugin_repositories, &profile.plugin_repositories, true);
        merger.merge_reporting(&mut model.reporting, &profile.reporting, true);
        merger.merge_dependency_management(&mut model.dependency_management, &profile.dependency_management, true);
        merger.merge_distribution_management(&mut model.distribution_management, &profile.distribution_management, true, &ctx);
        merger.merge_build(&mut model.build, &profile.build, true, &mut ctx);
        merger.merge_properties(&mut model.properties, &profile.properties, true);
    }

    pub fn inject_profiles<'a>(&self, model: &mut Model, profiles: impl IntoIterator<Item = &'a Profile>) {
        for profile in profiles {
            self.inject_profile(model, profile);
        }
    }
}
