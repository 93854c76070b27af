use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::{Activation, ActivationOs, Profile, ProfileSource};
use crate::version::{ComparableVersion, VersionRange};

/// The environment that profile activation is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct ActivationContext {
    pub active_profile_ids: Vec<String>,
    pub inactive_profile_ids: Vec<String>,
    pub system_properties: BTreeMap<String, String>,
    pub user_properties: BTreeMap<String, String>,
    pub project_directory: Option<PathBuf>,
    pub os: OsInfo,
    /// falls back to the `java.version` property if unset
    pub jdk_version: Option<String>,
    /// profiles contributed from outside the model, e.g. from settings
    pub external_profiles: Vec<Profile>,
}

impl ActivationContext {
    pub fn is_explicitly_active(&self, profile_id: &str) -> bool {
        self.active_profile_ids.iter().any(|id| id == profile_id)
    }

    pub fn is_explicitly_inactive(&self, profile_id: &str) -> bool {
        self.inactive_profile_ids.iter().any(|id| id == profile_id)
    }

    /// user properties shadow system properties
    pub fn property(&self, name: &str) -> Option<&str> {
        self.user_properties.get(name)
            .or_else(|| self.system_properties.get(name))
            .map(|s| s.as_str())
    }

    fn jdk_version(&self) -> Option<&str> {
        self.jdk_version.as_deref().or_else(|| self.property("java.version"))
    }
}

/// Operating system facts, named the way profile activation expects them (`mac os x`, `amd64`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsInfo {
    pub name: String,
    pub arch: String,
    pub version: String,
}

impl OsInfo {
    pub fn current() -> OsInfo {
        let name = match std::env::consts::OS {
            "macos" => "mac os x",
            "windows" => "windows",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "x86" => "x86",
            other => other,
        };
        OsInfo {
            name: name.to_string(),
            arch: arch.to_string(),
            version: String::new(),
        }
    }

    fn is_family(&self, family: &str) -> bool {
        let name = self.name.to_lowercase();
        match family.to_lowercase().as_str() {
            "windows" => name.contains("windows"),
            "win9x" => name.contains("windows") && ["95", "98", "me", "ce"].iter().any(|v| name.contains(v)),
            "dos" => name.contains("windows") && !name.contains("netware"),
            "os/2" => name.contains("os/2"),
            "netware" => name.contains("netware"),
            "mac" => name.contains("mac"),
            "tandem" => name.contains("nonstop_kernel"),
            "z/os" => name.contains("z/os") || name.contains("os/390"),
            "os/400" => name.contains("os/400"),
            "openvms" => name.contains("openvms"),
            "unix" => !name.contains("windows")
                && !name.contains("os/2")
                && !name.contains("netware")
                && !name.contains("openvms")
                && (!name.contains("mac") || name.ends_with('x')),
            _ => false,
        }
    }
}

/// One kind of activation predicate.
pub trait ProfileActivator: Send + Sync {
    /// true if the profile's activation declares this kind of predicate at all
    fn presents(&self, activation: &Activation) -> bool;

    fn is_active(&self, activation: &Activation, ctx: &ActivationContext) -> bool;
}

/// `<property><name>` with optional `<value>`. A leading `!` on the name means "absent", on the
///  value "not equal".
pub struct PropertyProfileActivator;

impl ProfileActivator for PropertyProfileActivator {
    fn presents(&self, activation: &Activation) -> bool {
        activation.property.is_some()
    }

    fn is_active(&self, activation: &Activation, ctx: &ActivationContext) -> bool {
        let Some(property) = &activation.property else { return false };

        let (name, reverse_name) = strip_negation(property.name.trim());
        if name.is_empty() {
            return false;
        }
        let actual = ctx.property(name).filter(|v| !v.is_empty());

        match property.value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => actual.is_some() != reverse_name,
            Some(expected) => {
                let (expected, reverse_value) = strip_negation(expected);
                let matches = actual == Some(expected);
                matches != reverse_value
            }
        }
    }
}

pub struct OsProfileActivator;

impl ProfileActivator for OsProfileActivator {
    fn presents(&self, activation: &Activation) -> bool {
        activation.os.is_some()
    }

    fn is_active(&self, activation: &Activation, ctx: &ActivationContext) -> bool {
        let Some(os) = &activation.os else { return false };
        os_matches(os, &ctx.os)
    }
}

fn os_matches(os: &ActivationOs, actual: &OsInfo) -> bool {
    let check = |expected: &Option<String>, test: &dyn Fn(&str) -> bool| -> bool {
        match expected.as_deref() {
            None => true,
            Some(expected) => {
                let (expected, reverse) = strip_negation(expected.trim());
                test(expected) != reverse
            }
        }
    };

    check(&os.family, &|f: &str| actual.is_family(f))
        && check(&os.name, &|n: &str| n.eq_ignore_ascii_case(&actual.name))
        && check(&os.arch, &|a: &str| a.eq_ignore_ascii_case(&actual.arch))
        && check(&os.version, &|v: &str| v.eq_ignore_ascii_case(&actual.version))
}

/// `<jdk>` is either a version prefix (`1.8`, `!11`) or a range (`[11,)`).
pub struct JdkProfileActivator;

impl ProfileActivator for JdkProfileActivator {
    fn presents(&self, activation: &Activation) -> bool {
        activation.jdk.is_some()
    }

    fn is_active(&self, activation: &Activation, ctx: &ActivationContext) -> bool {
        let Some(jdk) = activation.jdk.as_deref() else { return false };
        let Some(version) = ctx.jdk_version() else {
            debug!("no jdk version available, jdk activation of '{}' does not apply", jdk);
            return false;
        };
        jdk_matches(jdk.trim(), version)
    }
}

fn jdk_matches(jdk: &str, version: &str) -> bool {
    if jdk.starts_with('[') || jdk.starts_with('(') {
        return match VersionRange::parse(jdk) {
            Ok(range) => range.contains_version(&ComparableVersion::new(&normalize_jdk_version(version))),
            Err(e) => {
                debug!("invalid jdk range '{}': {}", jdk, e);
                false
            }
        };
    }

    let (prefix, reverse) = strip_negation(jdk);
    is_jdk_prefix(prefix, version) != reverse
}

/// Token-wise prefix check, so that `1.8` matches `1.8.0_392` but `1` does not match `11`.
fn is_jdk_prefix(prefix: &str, version: &str) -> bool {
    let prefix_tokens = jdk_tokens(prefix);
    let version_tokens = jdk_tokens(version);
    prefix_tokens.len() <= version_tokens.len()
        && prefix_tokens.iter().zip(version_tokens.iter()).all(|(p, v)| p == v)
}

fn jdk_tokens(version: &str) -> Vec<&str> {
    version.split(['.', '_', '-', '+']).filter(|t| !t.is_empty()).collect()
}

/// `1.8.0_392` becomes `1.8.0.392` so the update number compares numerically
fn normalize_jdk_version(version: &str) -> String {
    version.replace('_', ".")
}

/// `<file><exists>` / `<file><missing>`, relative paths resolve against the project directory.
pub struct FileProfileActivator;

impl ProfileActivator for FileProfileActivator {
    fn presents(&self, activation: &Activation) -> bool {
        activation.file.as_ref()
            .map(|f| f.exists.is_some() || f.missing.is_some())
            .unwrap_or(false)
    }

    fn is_active(&self, activation: &Activation, ctx: &ActivationContext) -> bool {
        let Some(file) = &activation.file else { return false };

        if let Some(exists) = file.exists.as_deref().filter(|s| !s.trim().is_empty()) {
            resolve_activation_path(exists, ctx).exists()
        }
        else if let Some(missing) = file.missing.as_deref().filter(|s| !s.trim().is_empty()) {
            !resolve_activation_path(missing, ctx).exists()
        }
        else {
            false
        }
    }
}

fn resolve_activation_path(path: &str, ctx: &ActivationContext) -> PathBuf {
    let mut expanded = path.trim().to_string();
    if let Some(dir) = &ctx.project_directory {
        let dir = dir.to_string_lossy();
        expanded = expanded.replace("${project.basedir}", &dir).replace("${basedir}", &dir);
    }
    for (name, value) in ctx.system_properties.iter().chain(ctx.user_properties.iter()) {
        expanded = expanded.replace(&format!("${{{}}}", name), value);
    }

    let path = Path::new(&expanded);
    match &ctx.project_directory {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

fn strip_negation(value: &str) -> (&str, bool) {
    match value.strip_prefix('!') {
        Some(rest) => (rest.trim(), true),
        None => (value, false),
    }
}

/// Decides which profiles are active.
///
/// An explicit activation by id always wins, even over an explicit deactivation. Otherwise a
///  profile is active if any of its activation predicates holds. If none of the model's own
///  profiles ends up active, those marked `activeByDefault` are activated instead, unless they
///  are explicitly deactivated. External profiles come first in the result.
pub struct ProfileSelector {
    activators: Vec<Box<dyn ProfileActivator>>,
}

impl Default for ProfileSelector {
    fn default() -> Self {
        ProfileSelector {
            activators: vec![
                Box::new(PropertyProfileActivator),
                Box::new(OsProfileActivator),
                Box::new(JdkProfileActivator),
                Box::new(FileProfileActivator),
            ],
        }
    }
}

impl ProfileSelector {
    pub fn new(activators: Vec<Box<dyn ProfileActivator>>) -> ProfileSelector {
        ProfileSelector { activators }
    }

    pub fn active_profiles<'a>(&self, profiles: &'a [Profile], ctx: &ActivationContext) -> Vec<&'a Profile> {
        let mut seen = HashSet::new();
        let mut external = Vec::new();
        let mut from_pom = Vec::new();

        for profile in profiles {
            if !seen.insert(profile.id.as_str()) {
                debug!("ignoring duplicate declaration of profile {}", profile.id);
                continue;
            }

            let active = ctx.is_explicitly_active(&profile.id)
                || (!ctx.is_explicitly_inactive(&profile.id) && self.is_active(profile, ctx));

            match &profile.source {
                ProfileSource::External(_) => {
                    if active || (profile.is_active_by_default() && !ctx.is_explicitly_inactive(&profile.id)) {
                        external.push(profile);
                    }
                }
                ProfileSource::Pom => {
                    if active {
                        from_pom.push(profile);
                    }
                }
            }
        }

        if from_pom.is_empty() {
            let mut seen = HashSet::new();
            for profile in profiles {
                if profile.source != ProfileSource::Pom || !seen.insert(profile.id.as_str()) {
                    continue;
                }
                if profile.is_active_by_default() && !ctx.is_explicitly_inactive(&profile.id) {
                    from_pom.push(profile);
                }
            }
        }

        for profile in external.iter().chain(from_pom.iter()) {
            debug!("profile {} is active", profile.id);
        }

        external.extend(from_pom);
        external
    }

    fn is_active(&self, profile: &Profile, ctx: &ActivationContext) -> bool {
        let Some(activation) = &profile.activation else { return false };
        self.activators.iter()
            .filter(|a| a.presents(activation))
            .any(|a| a.is_active(activation, ctx))
    }
}

#[cfg(test)]
mod test {
    use rstest::*;

    use crate::model::{ActivationFile, ActivationProperty};
    use super::*;

    fn profile(id: &str, activation: Activation) -> Profile {
        let mut profile = Profile::new(id);
        profile.activation = Some(activation);
        profile
    }

    fn by_default(id: &str) -> Profile {
        profile(id, Activation { active_by_default: true, ..Default::default() })
    }

    fn on_property(id: &str, name: &str, value: Option<&str>) -> Profile {
        profile(id, Activation {
            property: Some(ActivationProperty { name: name.to_string(), value: value.map(|v| v.to_string()) }),
            ..Default::default()
        })
    }

    fn ids(profiles: &[&Profile]) -> Vec<String> {
        profiles.iter().map(|p| p.id.clone()).collect()
    }

    #[rstest]
    #[case::present("env", None, Some("dev"), true)]
    #[case::absent("env", None, None, false)]
    #[case::negated_absent("!env", None, None, true)]
    #[case::negated_present("!env", None, Some("dev"), false)]
    #[case::value_match("env", Some("dev"), Some("dev"), true)]
    #[case::value_mismatch("env", Some("dev"), Some("prod"), false)]
    #[case::negated_value("env", Some("!dev"), Some("prod"), true)]
    #[case::negated_value_missing("env", Some("!dev"), None, true)]
    fn test_property_activation(#[case] name: &str, #[case] value: Option<&str>, #[case] actual: Option<&str>, #[case] expected: bool) {
        let mut ctx = ActivationContext::default();
        if let Some(actual) = actual {
            ctx.user_properties.insert("env".to_string(), actual.to_string());
        }
        let profiles = vec![on_property("p", name, value)];
        assert_eq!(ProfileSelector::default().active_profiles(&profiles, &ctx).len() == 1, expected);
    }

    #[rstest]
    #[case::prefix("1.8", "1.8.0_392", true)]
    #[case::prefix_is_tokenwise("1", "11.0.2", false)]
    #[case::negated("!1.8", "17.0.1", true)]
    #[case::range("[11,)", "17.0.1", true)]
    #[case::range_excludes("[11,)", "1.8.0_392", false)]
    #[case::bounded_range("[1.8,11)", "9.0.4", true)]
    fn test_jdk_activation(#[case] jdk: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(jdk_matches(jdk, version), expected);
    }

    #[rstest]
    #[case::linux_is_unix("linux", "unix", true)]
    #[case::mac_is_unix("mac os x", "unix", true)]
    #[case::mac_is_mac("mac os x", "mac", true)]
    #[case::windows_is_not_unix("windows 10", "unix", false)]
    #[case::negated_family("linux", "!windows", true)]
    fn test_os_family(#[case] name: &str, #[case] family: &str, #[case] expected: bool) {
        let os = ActivationOs { family: Some(family.to_string()), ..Default::default() };
        let actual = OsInfo { name: name.to_string(), arch: "amd64".to_string(), version: String::new() };
        assert_eq!(os_matches(&os, &actual), expected);
    }

    #[test]
    fn test_file_activation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), b"").unwrap();

        let ctx = ActivationContext {
            project_directory: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let file = |exists: Option<&str>, missing: Option<&str>| Activation {
            file: Some(ActivationFile { exists: exists.map(String::from), missing: missing.map(String::from) }),
            ..Default::default()
        };
        let profiles = vec![
            profile("exists", file(Some("${basedir}/marker"), None)),
            profile("relative", file(Some("marker"), None)),
            profile("missing", file(None, Some("other"))),
            profile("not-missing", file(None, Some("marker"))),
        ];

        let active = ProfileSelector::default().active_profiles(&profiles, &ctx);
        assert_eq!(ids(&active), vec!["exists", "relative", "missing"]);
    }

    #[test]
    fn test_active_by_default_fallback() {
        let profiles = vec![by_default("default"), on_property("env", "env", None)];
        let selector = ProfileSelector::default();

        let ctx = ActivationContext::default();
        assert_eq!(ids(&selector.active_profiles(&profiles, &ctx)), vec!["default"]);

        let mut ctx = ActivationContext::default();
        ctx.user_properties.insert("env".to_string(), "x".to_string());
        assert_eq!(ids(&selector.active_profiles(&profiles, &ctx)), vec!["env"]);
    }

    #[test]
    fn test_deactivation_suppresses_default() {
        let profiles = vec![by_default("default")];
        let ctx = ActivationContext {
            inactive_profile_ids: vec!["default".to_string()],
            ..Default::default()
        };
        assert!(ProfileSelector::default().active_profiles(&profiles, &ctx).is_empty());
    }

    #[test]
    fn test_explicit_activation_wins_over_deactivation() {
        let profiles = vec![Profile::new("release")];
        let ctx = ActivationContext {
            active_profile_ids: vec!["release".to_string()],
            inactive_profile_ids: vec!["release".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&ProfileSelector::default().active_profiles(&profiles, &ctx)), vec!["release"]);
    }

    #[test]
    fn test_external_profiles_come_first() {
        let mut external = by_default("settings");
        external.source = ProfileSource::External("settings.xml".to_string());
        let profiles = vec![by_default("pom"), external];

        let active = ProfileSelector::default().active_profiles(&profiles, &ActivationContext::default());
        assert_eq!(ids(&active), vec!["settings", "pom"]);
    }
}
