use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::model::dom::XmlNode;
use crate::model::*;

/// The variations of the merge rules. They differ only in how ordered lists (plugins, executions
///  and goals) are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeFlavor {
    /// keyed lists keep the target's order, source-only entries are appended
    Plain,
    /// target is the child, source the parent: the parent's plugin order is the master, the
    ///  child's plugins are interleaved, and entries marked `inherited=false` are dropped
    Inheritance,
    /// target is the model, source an active profile: the model's plugin order is the master
    Profile,
    /// target is a declared plugin, source its managed counterpart: managed executions and goals
    ///  come first
    Management,
}

/// Per-merge state. Only the target's artifactId is needed, to extrapolate inherited URLs.
#[derive(Debug, Clone, Default)]
pub struct MergeContext {
    pub target_artifact_id: Option<String>,
}

/// Combines two models (or model fragments) element by element.
///
/// `source_dominant` decides which side wins for single-valued fields: with a dominant source
///  its values replace the target's, otherwise they only fill in what the target leaves empty.
///  Lists are merged by key where entries have one, and never simply concatenated.
#[derive(Debug, Clone, Copy)]
pub struct ModelMerger {
    flavor: MergeFlavor,
}

impl Default for ModelMerger {
    fn default() -> Self {
        ModelMerger { flavor: MergeFlavor::Plain }
    }
}

impl ModelMerger {
    pub fn new(flavor: MergeFlavor) -> ModelMerger {
        ModelMerger { flavor }
    }

    /// artifactId, packaging, parent, profiles and modelVersion are never merged: they describe
    ///  the target itself.
    pub fn merge_model(&self, target: &mut Model, source: &Model, source_dominant: bool, ctx: &mut MergeContext) {
        ctx.target_artifact_id = target.artifact_id.clone();

        merge_scalar(&mut target.group_id, &source.group_id, source_dominant);
        merge_scalar(&mut target.version, &source.version, source_dominant);
        if source_dominant {
            merge_scalar(&mut target.name, &source.name, true);
        }
        merge_scalar(&mut target.description, &source.description, source_dominant);
        self.merge_url(&mut target.url, &source.url, source_dominant, ctx);

        if target.licenses.is_empty() {
            target.licenses = source.licenses.clone();
        }
        if source_dominant {
            self.merge_modules(&mut target.modules, &source.modules);
        }
        self.merge_properties(&mut target.properties, &source.properties, source_dominant);
        self.merge_dependencies(&mut target.dependencies, &source.dependencies, source_dominant);
        self.merge_dependency_management(&mut target.dependency_management, &source.dependency_management, source_dominant);
        self.merge_repositories(&mut target.repositories, &source.repositories, source_dominant);
        self.merge_repositories(&mut target.plugin_repositories, &source.plugin_repositories, source_dominant);
        self.merge_build(&mut target.build, &source.build, source_dominant, ctx);
        self.merge_reporting(&mut target.reporting, &source.reporting, source_dominant);
        self.merge_distribution_management(&mut target.distribution_management, &source.distribution_management, source_dominant, ctx);
    }

    /// An inherited URL gets the child's artifactId appended, a dominant one is taken verbatim.
    fn merge_url(&self, target: &mut Option<String>, source: &Option<String>, source_dominant: bool, ctx: &MergeContext) {
        let Some(url) = source else { return };
        if source_dominant {
            *target = Some(url.clone());
        }
        else if target.is_none() {
            *target = Some(match &ctx.target_artifact_id {
                Some(artifact_id) if self.flavor == MergeFlavor::Inheritance => extrapolate_child_url(url, artifact_id),
                _ => url.clone(),
            });
        }
    }

    pub fn merge_modules(&self, target: &mut Vec<String>, source: &[String]) {
        merge_string_union(target, source);
    }

    pub fn merge_properties(&self, target: &mut BTreeMap<String, String>, source: &BTreeMap<String, String>, source_dominant: bool) {
        for (key, value) in source {
            if source_dominant {
                target.insert(key.clone(), value.clone());
            }
            else {
                target.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    pub fn merge_dependencies(&self, target: &mut Vec<Dependency>, source: &[Dependency], source_dominant: bool) {
        merge_keyed(target, source, Dependency::management_key, |t, s| self.merge_dependency(t, s, source_dominant));
    }

    pub fn merge_dependency(&self, target: &mut Dependency, source: &Dependency, source_dominant: bool) {
        merge_scalar(&mut target.version, &source.version, source_dominant);
        merge_scalar(&mut target.type_, &source.type_, source_dominant);
        merge_scalar(&mut target.classifier, &source.classifier, source_dominant);
        merge_scalar(&mut target.scope, &source.scope, source_dominant);
        merge_scalar(&mut target.optional, &source.optional, source_dominant);
        merge_scalar(&mut target.system_path, &source.system_path, source_dominant);

        // exclusions are a unit: unioning them would make a declared list unable to narrow a managed one
        if target.exclusions.is_empty() {
            target.exclusions = source.exclusions.clone();
        }
    }

    pub fn merge_dependency_management(&self, target: &mut Option<DependencyManagement>, source: &Option<DependencyManagement>, source_dominant: bool) {
        merge_optional(target, source, |t, s| self.merge_dependencies(&mut t.dependencies, &s.dependencies, source_dominant));
    }

    /// The dominant side's repositories come first, followed by those of the recessive side
    ///  whose id it does not already declare.
    pub fn merge_repositories(&self, target: &mut Vec<Repository>, source: &[Repository], source_dominant: bool) {
        if source.is_empty() {
            return;
        }

        let (dominant, recessive): (&[Repository], &[Repository]) = if source_dominant {
            (source, target.as_slice())
        }
        else {
            (target.as_slice(), source)
        };

        let mut merged = dominant.to_vec();
        for repository in recessive {
            if !merged.iter().any(|r| r.id == repository.id) {
                merged.push(repository.clone());
            }
        }
        *target = merged;
    }

    pub fn merge_build(&self, target: &mut Option<Build>, source: &Option<Build>, source_dominant: bool, ctx: &mut MergeContext) {
        merge_optional(target, source, |t, s| self.merge_build_content(t, s, source_dominant, ctx));
    }

    fn merge_build_content(&self, target: &mut Build, source: &Build, source_dominant: bool, ctx: &mut MergeContext) {
        merge_scalar(&mut target.source_directory, &source.source_directory, source_dominant);
        merge_scalar(&mut target.test_source_directory, &source.test_source_directory, source_dominant);
        merge_scalar(&mut target.output_directory, &source.output_directory, source_dominant);
        merge_scalar(&mut target.test_output_directory, &source.test_output_directory, source_dominant);
        merge_scalar(&mut target.directory, &source.directory, source_dominant);
        merge_scalar(&mut target.final_name, &source.final_name, source_dominant);
        merge_scalar(&mut target.default_goal, &source.default_goal, source_dominant);

        merge_string_union(&mut target.filters, &source.filters);
        merge_resources(&mut target.resources, &source.resources, source_dominant);
        merge_resources(&mut target.test_resources, &source.test_resources, source_dominant);

        self.merge_plugins(&mut target.plugins, &source.plugins, source_dominant, ctx);
        merge_optional(&mut target.plugin_management, &source.plugin_management, |t, s| {
            self.merge_plugins(&mut t.plugins, &s.plugins, source_dominant, ctx)
        });
    }

    pub fn merge_plugins(&self, target: &mut Vec<Plugin>, source: &[Plugin], source_dominant: bool, ctx: &mut MergeContext) {
        match self.flavor {
            MergeFlavor::Inheritance => {
                let mut master = Vec::new();
                for plugin in source {
                    if source_dominant || is_plugin_inheritable(plugin) {
                        let mut inherited = Plugin::new(&plugin.group_id, &plugin.artifact_id);
                        self.merge_plugin(&mut inherited, plugin, source_dominant, ctx);
                        master.push(inherited);
                    }
                }
                let own = std::mem::take(target);
                *target = interleave(master, own, Plugin::key, |parent, child| {
                    let mut child = child;
                    self.merge_plugin(&mut child, &parent, source_dominant, ctx);
                    child
                });
            }
            MergeFlavor::Profile => {
                let master = std::mem::take(target);
                *target = interleave(master, source.to_vec(), Plugin::key, |model, profile| {
                    let mut model = model;
                    self.merge_plugin(&mut model, &profile, source_dominant, ctx);
                    model
                });
            }
            MergeFlavor::Plain | MergeFlavor::Management => {
                merge_keyed(target, source, Plugin::key, |t, s| self.merge_plugin(t, s, source_dominant, ctx));
            }
        }
    }

    pub fn merge_plugin(&self, target: &mut Plugin, source: &Plugin, source_dominant: bool, _ctx: &mut MergeContext) {
        merge_scalar(&mut target.version, &source.version, source_dominant);
        merge_scalar(&mut target.extensions, &source.extensions, source_dominant);
        merge_scalar(&mut target.inherited, &source.inherited, source_dominant);
        target.configuration = merge_configuration(&target.configuration, &source.configuration, source_dominant);
        self.merge_dependencies(&mut target.dependencies, &source.dependencies, source_dominant);
        self.merge_executions(&mut target.executions, &source.executions, source.inherited, source_dominant);
    }

    fn merge_executions(&self, target: &mut Vec<PluginExecution>, source: &[PluginExecution], plugin_inherited: Option<bool>, source_dominant: bool) {
        if source.is_empty() {
            return;
        }

        match self.flavor {
            MergeFlavor::Inheritance | MergeFlavor::Management => {
                // source executions first, then the target's own, merged in place where ids match
                let mut merged: Vec<PluginExecution> = source.iter()
                    .filter(|e| {
                        self.flavor == MergeFlavor::Management
                            || source_dominant
                            || e.inherited.or(plugin_inherited).unwrap_or(true)
                    })
                    .cloned()
                    .collect();

                for mut own in std::mem::take(target) {
                    match merged.iter().position(|e| e.id == own.id) {
                        Some(idx) => {
                            self.merge_plugin_execution(&mut own, &merged[idx], source_dominant);
                            merged[idx] = own;
                        }
                        None => merged.push(own),
                    }
                }
                *target = merged;
            }
            MergeFlavor::Plain | MergeFlavor::Profile => {
                merge_keyed(target, source, |e: &PluginExecution| e.id.clone(), |t, s| self.merge_plugin_execution(t, s, source_dominant));
            }
        }
    }

    pub fn merge_plugin_execution(&self, target: &mut PluginExecution, source: &PluginExecution, source_dominant: bool) {
        merge_scalar(&mut target.phase, &source.phase, source_dominant);
        merge_scalar(&mut target.inherited, &source.inherited, source_dominant);

        if self.flavor == MergeFlavor::Management {
            let mut goals = source.goals.clone();
            merge_string_union(&mut goals, &target.goals);
            target.goals = goals;
        }
        else {
            merge_string_union(&mut target.goals, &source.goals);
        }

        target.configuration = merge_configuration(&target.configuration, &source.configuration, source_dominant);
    }

    pub fn merge_reporting(&self, target: &mut Option<Reporting>, source: &Option<Reporting>, source_dominant: bool) {
        merge_optional(target, source, |t, s| {
            merge_scalar(&mut t.exclude_defaults, &s.exclude_defaults, source_dominant);
            merge_scalar(&mut t.output_directory, &s.output_directory, source_dominant);

            let inheritable: Vec<ReportPlugin> = s.plugins.iter()
                .filter(|p| source_dominant || self.flavor != MergeFlavor::Inheritance || p.inherited.unwrap_or(true))
                .cloned()
                .collect();
            merge_keyed(&mut t.plugins, &inheritable, ReportPlugin::key, |tp, sp| self.merge_report_plugin(tp, sp, source_dominant));
        });
    }

    fn merge_report_plugin(&self, target: &mut ReportPlugin, source: &ReportPlugin, source_dominant: bool) {
        merge_scalar(&mut target.version, &source.version, source_dominant);
        merge_scalar(&mut target.inherited, &source.inherited, source_dominant);
        target.configuration = merge_configuration(&target.configuration, &source.configuration, source_dominant);
        merge_keyed(&mut target.report_sets, &source.report_sets, |r: &ReportSet| r.id.clone(), |t, s| {
            merge_scalar(&mut t.inherited, &s.inherited, source_dominant);
            merge_string_union(&mut t.reports, &s.reports);
            t.configuration = merge_configuration(&t.configuration, &s.configuration, source_dominant);
        });
    }

    pub fn merge_distribution_management(&self, target: &mut Option<DistributionManagement>, source: &Option<DistributionManagement>, source_dominant: bool, ctx: &MergeContext) {
        merge_optional(target, source, |t, s| {
            merge_scalar(&mut t.download_url, &s.download_url, source_dominant);
            if s.repository.is_some() && (source_dominant || t.repository.is_none()) {
                t.repository = s.repository.clone();
            }
            if s.snapshot_repository.is_some() && (source_dominant || t.snapshot_repository.is_none()) {
                t.snapshot_repository = s.snapshot_repository.clone();
            }
            if let Some(source_site) = &s.site {
                let target_empty = t.site.as_ref().map(|site| site.is_empty()).unwrap_or(true);
                if source_dominant || target_empty {
                    let site = t.site.get_or_insert_with(Default::default);
                    merge_scalar(&mut site.id, &source_site.id, source_dominant);
                    merge_scalar(&mut site.name, &source_site.name, source_dominant);
                    self.merge_url(&mut site.url, &source_site.url, source_dominant, ctx);
                }
            }
            // relocation describes the model it is declared in and is not merged
        });
    }
}

/// Sets `target` from `source` if the source has a value and either dominates or the target is unset.
pub fn merge_scalar<T: Clone>(target: &mut Option<T>, source: &Option<T>, source_dominant: bool) {
    if let Some(value) = source {
        if source_dominant || target.is_none() {
            *target = Some(value.clone());
        }
    }
}

/// Merges the content of `source` into `target`, creating an empty target first if needed so
///  that the element-level rules (e.g. inheritance filters) apply to it as well.
fn merge_optional<T: Default>(target: &mut Option<T>, source: &Option<T>, merge: impl FnOnce(&mut T, &T)) {
    if let Some(source) = source {
        merge(target.get_or_insert_with(Default::default), source);
    }
}

/// Target entries keep their position, entries sharing a key are merged, source-only entries
///  are appended in source order.
pub fn merge_keyed<T: Clone, K: Eq + Hash>(target: &mut Vec<T>, source: &[T], key: impl Fn(&T) -> K, mut merge: impl FnMut(&mut T, &T)) {
    let mut index: HashMap<K, usize> = HashMap::new();
    for (idx, element) in target.iter().enumerate() {
        index.entry(key(element)).or_insert(idx);
    }

    for element in source {
        let k = key(element);
        match index.get(&k) {
            Some(&idx) => merge(&mut target[idx], element),
            None => {
                index.insert(k, target.len());
                target.push(element.clone());
            }
        }
    }
}

fn merge_string_union(target: &mut Vec<String>, source: &[String]) {
    for s in source {
        if !target.contains(s) {
            target.push(s.clone());
        }
    }
}

fn merge_resources(target: &mut Vec<Resource>, source: &[Resource], source_dominant: bool) {
    if source_dominant || target.is_empty() {
        for resource in source {
            if !target.contains(resource) {
                target.push(resource.clone());
            }
        }
    }
}

fn merge_configuration(target: &Option<XmlNode>, source: &Option<XmlNode>, source_dominant: bool) -> Option<XmlNode> {
    if source_dominant {
        XmlNode::merge_optional(source.as_ref(), target.as_ref())
    }
    else {
        XmlNode::merge_optional(target.as_ref(), source.as_ref())
    }
}

fn is_plugin_inheritable(plugin: &Plugin) -> bool {
    plugin.is_inherited() || plugin.executions.iter().any(|e| e.inherited == Some(true))
}

fn extrapolate_child_url(parent_url: &str, artifact_id: &str) -> String {
    if parent_url.ends_with('/') {
        format!("{}{}", parent_url, artifact_id)
    }
    else {
        format!("{}/{}", parent_url, artifact_id)
    }
}

/// Combines two ordered lists where `master` dictates the order. Elements of `others` that share
///  a key with a master element are combined into it; the others are placed right before the next
///  master element that follows them in `others`, or at the end if none does.
///
/// With master `A, B, D, E` and others `A, C, D, F` the result is `A, B, C, D, E, F`.
pub fn interleave<T, K: Eq + Hash + Clone>(master: Vec<T>, others: Vec<T>, key: impl Fn(&T) -> K, mut combine: impl FnMut(T, T) -> T) -> Vec<T> {
    let mut slots: Vec<(K, Option<T>)> = Vec::with_capacity(master.len());
    let mut index: HashMap<K, usize> = HashMap::new();
    for element in master {
        let k = key(&element);
        index.entry(k.clone()).or_insert(slots.len());
        slots.push((k, Some(element)));
    }

    let mut predecessors: HashMap<K, Vec<T>> = HashMap::new();
    let mut pending = Vec::new();

    for element in others {
        let k = key(&element);
        match index.get(&k) {
            Some(&idx) => {
                if let Some(existing) = slots[idx].1.take() {
                    slots[idx].1 = Some(combine(existing, element));
                }
                if !pending.is_empty() {
                    predecessors.entry(k).or_default().append(&mut pending);
                }
            }
            None => pending.push(element),
        }
    }

    let mut result = Vec::new();
    for (k, element) in slots {
        if let Some(before) = predecessors.remove(&k) {
            result.extend(before);
        }
        result.extend(element);
    }
    result.extend(pending);
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn plugins(artifact_ids: &[&str]) -> Vec<Plugin> {
        artifact_ids.iter().map(|a| Plugin::new("g", a)).collect()
    }

    fn artifact_ids(plugins: &[Plugin]) -> Vec<String> {
        plugins.iter().map(|p| p.artifact_id.clone()).collect()
    }

    fn sample_model() -> Model {
        let mut model = Model::new("org.example", "app", "1.0");
        model.url = Some("https://example.org/app".to_string());
        model.properties.insert("java.version".to_string(), "17".to_string());

        let mut dep = Dependency::new("junit", "junit").with_version("4.13");
        dep.scope = Some("test".to_string());
        dep.exclusions.push(Exclusion { group_id: "org.hamcrest".to_string(), artifact_id: "hamcrest-core".to_string() });
        model.dependencies.push(dep);

        model.repositories.push(Repository { id: "central".to_string(), ..Default::default() });

        let build = model.build_mut();
        build.filters.push("filter.properties".to_string());
        let mut compiler = Plugin::new("org.apache.maven.plugins", "maven-compiler-plugin");
        compiler.executions.push(PluginExecution::new("compile").with_goals(&["compile"]));
        compiler.configuration = Some(XmlNode::new("configuration").with_child(XmlNode::new("release").with_value("17")));
        build.plugins.push(compiler);
        model
    }

    #[test]
    fn test_merge_with_itself_is_identity() {
        let model = sample_model();
        let mut merged = model.clone();
        ModelMerger::default().merge_model(&mut merged, &model, false, &mut MergeContext::default());
        assert_eq!(merged, model);
    }

    #[test]
    fn test_recessive_source_only_fills_gaps() {
        let mut target = Model::new("org.example", "child", "2.0");
        target.description = Some("child".to_string());
        let mut source = Model::new("org.parent", "parent", "1.0");
        source.description = Some("parent".to_string());
        source.name = Some("Parent".to_string());
        source.packaging = Some("pom".to_string());

        ModelMerger::default().merge_model(&mut target, &source, false, &mut MergeContext::default());

        assert_eq!(target.group_id.as_deref(), Some("org.example"));
        assert_eq!(target.artifact_id.as_deref(), Some("child"));
        assert_eq!(target.description.as_deref(), Some("child"));
        assert_eq!(target.name, None);
        assert_eq!(target.packaging, None);
    }

    #[test]
    fn test_exclusions_are_not_unioned() {
        let exclusion = |a: &str| Exclusion { group_id: "x".to_string(), artifact_id: a.to_string() };

        let mut target = Dependency::new("g", "a");
        target.exclusions.push(exclusion("one"));
        let mut source = Dependency::new("g", "a");
        source.exclusions.push(exclusion("two"));

        let merger = ModelMerger::default();
        merger.merge_dependency(&mut target, &source, true);
        assert_eq!(target.exclusions, vec![exclusion("one")]);

        let mut empty = Dependency::new("g", "a");
        merger.merge_dependency(&mut empty, &source, false);
        assert_eq!(empty.exclusions, vec![exclusion("two")]);
    }

    #[test]
    fn test_keyed_list_order() {
        let mut target = vec![Dependency::new("g", "b"), Dependency::new("g", "a")];
        let source = vec![Dependency::new("g", "c"), Dependency::new("g", "a").with_version("1")];
        ModelMerger::default().merge_dependencies(&mut target, &source, false);

        let keys: Vec<_> = target.iter().map(|d| d.artifact_id.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(target[1].version.as_deref(), Some("1"));
    }

    #[test]
    fn test_interleave() {
        let merged = interleave(plugins(&["A", "B", "D", "E"]), plugins(&["A", "C", "D", "F"]), Plugin::key, |m, _| m);
        assert_eq!(artifact_ids(&merged), vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn test_inherited_plugins_keep_parent_order() {
        let merger = ModelMerger::new(MergeFlavor::Inheritance);
        let mut child = plugins(&["C", "A"]);
        let parent = plugins(&["A", "B"]);
        merger.merge_plugins(&mut child, &parent, false, &mut MergeContext::default());
        assert_eq!(artifact_ids(&child), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_non_inherited_plugins_are_dropped() {
        let merger = ModelMerger::new(MergeFlavor::Inheritance);
        let mut parent = plugins(&["A", "B"]);
        parent[1].inherited = Some(false);

        let mut child = Vec::new();
        merger.merge_plugins(&mut child, &parent, false, &mut MergeContext::default());
        assert_eq!(artifact_ids(&child), vec!["A"]);
    }

    #[test]
    fn test_inherited_executions() {
        let merger = ModelMerger::new(MergeFlavor::Inheritance);
        let mut parent = Plugin::new("g", "p");
        parent.executions.push(PluginExecution::new("shared").with_goals(&["a"]));
        let mut private = PluginExecution::new("private").with_goals(&["x"]);
        private.inherited = Some(false);
        parent.executions.push(private);

        let mut child = Plugin::new("g", "p");
        child.executions.push(PluginExecution::new("own").with_goals(&["c"]));
        child.executions.push(PluginExecution::new("shared").with_goals(&["b"]));

        merger.merge_plugin(&mut child, &parent, false, &mut MergeContext::default());

        let ids: Vec<_> = child.executions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["shared", "own"]);
        assert_eq!(child.executions[0].goals, vec!["b", "a"]);
    }

    #[test]
    fn test_inherited_url_gets_artifact_id() {
        let merger = ModelMerger::new(MergeFlavor::Inheritance);
        let mut child = Model::new("g", "child", "1");
        let mut parent = Model::new("g", "parent", "1");
        parent.url = Some("https://example.org/parent/".to_string());

        merger.merge_model(&mut child, &parent, false, &mut MergeContext::default());
        assert_eq!(child.url.as_deref(), Some("https://example.org/parent/child"));
    }

    #[test]
    fn test_repositories_dominant_first() {
        let repo = |id: &str, url: &str| Repository { id: id.to_string(), url: Some(url.to_string()), ..Default::default() };
        let mut target = vec![repo("a", "t"), repo("b", "t")];
        let source = vec![repo("c", "s"), repo("a", "s")];

        ModelMerger::default().merge_repositories(&mut target, &source, true);

        let ids: Vec<_> = target.iter().map(|r| (r.id.as_str(), r.url.as_deref().unwrap())).collect();
        assert_eq!(ids, vec![("c", "s"), ("a", "s"), ("b", "t")]);
    }

    #[test]
    fn test_modules_only_merged_when_dominant() {
        let mut target = Model::default();
        let mut source = Model::default();
        source.modules.push("core".to_string());

        let merger = ModelMerger::default();
        merger.merge_model(&mut target, &source, false, &mut MergeContext::default());
        assert!(target.modules.is_empty());

        merger.merge_model(&mut target, &source, true, &mut MergeContext::default());
        assert_eq!(target.modules, vec!["core"]);
    }
}
