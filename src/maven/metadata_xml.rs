//! The `maven-metadata.xml` document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "metadata", rename_all = "camelCase", default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(skip_serializing_if = "Plugins::is_empty")]
    pub plugins: Plugins,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Versioning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    #[serde(skip_serializing_if = "Versions::is_empty")]
    pub versions: Versions,
    /// `yyyyMMddHHmmss`, compared as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// absent in documents written before per-file snapshot entries existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_versions: Option<SnapshotVersions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Versions {
    #[serde(rename = "version")]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// `yyyyMMdd.HHmmss` in UTC
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub build_number: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub local_copy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotVersions {
    #[serde(rename = "snapshotVersion")]
    pub entries: Vec<SnapshotVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl Versions {
    fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl Plugins {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SnapshotVersion {
    /// `classifier:extension`, what entries are matched by when documents are merged
    pub fn key(&self) -> String {
        format!("{}:{}", self.classifier.as_deref().unwrap_or(""), self.extension.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plugins {
    #[serde(rename = "plugin")]
    pub entries: Vec<PluginMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub prefix: String,
    pub artifact_id: String,
}

impl Metadata {
    pub fn parse(xml: &str) -> anyhow::Result<Metadata> {
        Ok(serde_xml_rs::from_str(xml)?)
    }

    pub fn to_xml(&self) -> anyhow::Result<String> {
        Ok(serde_xml_rs::to_string(self)?)
    }
}
