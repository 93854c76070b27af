use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

use crate::model::profile_activation::ActivationContext;
use crate::model::{Dependency, Model, Plugin};

lazy_static! {
    static ref EXPRESSION_REGEX: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

/// nested expressions are expanded up to this depth, which also stops self-referencing properties
const MAX_DEPTH: usize = 10;

/// Expands `${...}` expressions in the model's properties and in the coordinates of its
///  dependencies and plugins.
///
/// Lookup order is: the model's own coordinates (`project.*`, `pom.*` or unprefixed), the model's
///  properties, user properties, system properties. Unresolvable expressions are left verbatim.
pub fn interpolate_model(model: &mut Model, ctx: &ActivationContext) {
    let source = ValueSource::new(model, ctx);

    let properties: BTreeMap<String, String> = model.properties.iter()
        .map(|(k, v)| (k.clone(), source.expand(v)))
        .collect();
    model.properties = properties;

    for dependency in model.dependencies.iter_mut() {
        interpolate_dependency(dependency, &source);
    }
    if let Some(management) = &mut model.dependency_management {
        for dependency in management.dependencies.iter_mut() {
            interpolate_dependency(dependency, &source);
        }
    }

    if let Some(build) = &mut model.build {
        for plugin in build.plugins.iter_mut() {
            interpolate_plugin(plugin, &source);
        }
        if let Some(management) = &mut build.plugin_management {
            for plugin in management.plugins.iter_mut() {
                interpolate_plugin(plugin, &source);
            }
        }
        interpolate_option(&mut build.directory, &source);
        interpolate_option(&mut build.final_name, &source);
    }

    interpolate_option(&mut model.url, &source);
}

fn interpolate_dependency(dependency: &mut Dependency, source: &ValueSource) {
    dependency.group_id = source.expand(&dependency.group_id);
    dependency.artifact_id = source.expand(&dependency.artifact_id);
    interpolate_option(&mut dependency.version, source);
    interpolate_option(&mut dependency.classifier, source);
    interpolate_option(&mut dependency.system_path, source);
}

fn interpolate_plugin(plugin: &mut Plugin, source: &ValueSource) {
    interpolate_option(&mut plugin.version, source);
    for dependency in plugin.dependencies.iter_mut() {
        interpolate_dependency(dependency, source);
    }
}

fn interpolate_option(value: &mut Option<String>, source: &ValueSource) {
    if let Some(v) = value {
        *v = source.expand(v);
    }
}

struct ValueSource {
    coordinates: BTreeMap<&'static str, String>,
    properties: BTreeMap<String, String>,
    user_properties: BTreeMap<String, String>,
    system_properties: BTreeMap<String, String>,
}

impl ValueSource {
    fn new(model: &Model, ctx: &ActivationContext) -> ValueSource {
        let mut coordinates = BTreeMap::new();
        let mut put = |name: &'static str, value: Option<&str>| {
            if let Some(value) = value {
                coordinates.insert(name, value.to_string());
            }
        };
        put("groupId", model.effective_group_id());
        put("artifactId", model.artifact_id.as_deref());
        put("version", model.effective_version());
        put("packaging", Some(model.packaging.as_deref().unwrap_or("jar")));
        put("name", model.name.as_deref());
        put("description", model.description.as_deref());
        put("url", model.url.as_deref());
        put("parent.groupId", model.parent.as_ref().map(|p| p.group_id.as_str()));
        put("parent.artifactId", model.parent.as_ref().map(|p| p.artifact_id.as_str()));
        put("parent.version", model.parent.as_ref().map(|p| p.version.as_str()));
        if let Some(dir) = &ctx.project_directory {
            put("basedir", Some(dir.to_string_lossy().as_ref()));
        }

        ValueSource {
            coordinates,
            properties: model.properties.clone(),
            user_properties: ctx.user_properties.clone(),
            system_properties: ctx.system_properties.clone(),
        }
    }

    fn lookup(&self, expression: &str) -> Option<&str> {
        let model_expression = expression.strip_prefix("project.")
            .or_else(|| expression.strip_prefix("pom."))
            .unwrap_or(expression);

        self.coordinates.get(model_expression)
            .or_else(|| self.properties.get(expression))
            .or_else(|| self.user_properties.get(expression))
            .or_else(|| self.system_properties.get(expression))
            .map(|s| s.as_str())
    }

    fn expand(&self, value: &str) -> String {
        self.expand_at_depth(value, 0)
    }

    fn expand_at_depth(&self, value: &str, depth: usize) -> String {
        if depth >= MAX_DEPTH || !value.contains("${") {
            return value.to_string();
        }

        EXPRESSION_REGEX.replace_all(value, |caps: &Captures| {
            let expression = &caps[1];
            match self.lookup(expression) {
                Some(resolved) => self.expand_at_depth(resolved, depth + 1),
                None => {
                    trace!("leaving unresolved expression ${{{}}}", expression);
                    caps[0].to_string()
                }
            }
        }).into_owned()
    }
}
