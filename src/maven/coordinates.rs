use std::fmt::{Display, Formatter};

use lazy_static::lazy_static;
use regex::Regex;

pub const SNAPSHOT_VERSION: &str = "SNAPSHOT";
pub const LATEST_VERSION: &str = "LATEST";
pub const RELEASE_VERSION: &str = "RELEASE";

lazy_static! {
    /// `<base>-<yyyyMMdd.HHmmss>-<buildNumber>`, the form a deployed snapshot is stored under
    static ref TIMESTAMPED_VERSION_REGEX: Regex = Regex::new(r"^(.*)-(\d{8}\.\d{6})-(\d+)$").unwrap();
}

/// A version string, classified by how a repository stores it.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum MavenVersion {
    Release(String),
    Snapshot {
        version: String, // ending in 'SNAPSHOT'
        timestamp: Option<String>,
        build_number: Option<u32>,
    }
}

impl MavenVersion {
    pub fn parse(version: &str) -> MavenVersion {
        if let Some(captures) = TIMESTAMPED_VERSION_REGEX.captures(version) {
            if let Ok(build_number) = captures[3].parse::<u32>() {
                return MavenVersion::Snapshot {
                    version: format!("{}-{}", &captures[1], SNAPSHOT_VERSION),
                    timestamp: Some(captures[2].to_string()),
                    build_number: Some(build_number),
                };
            }
        }

        if is_snapshot_version(version) {
            MavenVersion::Snapshot {
                version: version.to_string(),
                timestamp: None,
                build_number: None,
            }
        }
        else {
            MavenVersion::Release(version.to_string())
        }
    }

    /// the unresolved form: `1.0-20240101.120000-3` becomes `1.0-SNAPSHOT`
    pub fn base_version(&self) -> &str {
        match self {
            MavenVersion::Release(v) => v,
            MavenVersion::Snapshot { version, .. } => version,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, MavenVersion::Snapshot { .. })
    }
}

/// true for `-SNAPSHOT` versions in either their base or their timestamped form
pub fn is_snapshot_version(version: &str) -> bool {
    version.to_ascii_uppercase().ends_with(SNAPSHOT_VERSION) || TIMESTAMPED_VERSION_REGEX.is_match(version)
}

/// `groupId:artifactId:version` of a model or artifact
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct MavenCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl MavenCoordinates {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> MavenCoordinates {
        MavenCoordinates {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
        }
    }

    /// parses `groupId:artifactId:version`
    pub fn parse(coordinates: &str) -> anyhow::Result<MavenCoordinates> {
        let parts: Vec<&str> = coordinates.split(':').collect();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => Ok(MavenCoordinates::new(g, a, v)),
            _ => Err(anyhow::anyhow!("expected groupId:artifactId:version, was {:?}", coordinates)),
        }
    }
}

impl Display for MavenCoordinates {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
