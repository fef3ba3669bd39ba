use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_TYPE: &str = "jar";

lazy_static! {
    static ref TIMESTAMPED_SNAPSHOT_REGEX: Regex = Regex::new(r"^(.*)-(\d{8}\.\d{6})-(\d+)$").unwrap();
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum MavenVersion {
    Release(String),
    Snapshot {
        version: String, // ending in '-SNAPSHOT'
        timestamp: Option<String>,
        build_number: Option<u32>,
    }
}
impl MavenVersion {
    /// Parses a resolved version string. A deployed snapshot is resolved to a timestamped version
    ///  like "1.0-20120131.101010-3"; the declared "1.0-SNAPSHOT" is a snapshot without timestamp.
    pub fn parse(version: &str) -> MavenVersion {
        if let Some(captures) = TIMESTAMPED_SNAPSHOT_REGEX.captures(version) {
            return MavenVersion::Snapshot {
                version: format!("{}-SNAPSHOT", &captures[1]),
                timestamp: Some(captures[2].to_string()),
                build_number: captures[3].parse().ok(),
            };
        }

        if version.ends_with("-SNAPSHOT") {
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

    /// The version as it is declared in a POM, i.e. without snapshot timestamp
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

#[derive(Debug, Eq, PartialEq, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MavenScope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
    #[serde(other)]
    Other,
}
impl Default for MavenScope {
    fn default() -> Self {
        MavenScope::Compile
    }
}
impl fmt::Display for MavenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MavenScope::Compile => "compile",
            MavenScope::Provided => "provided",
            MavenScope::Runtime => "runtime",
            MavenScope::Test => "test",
            MavenScope::System => "system",
            MavenScope::Other => "other",
        };
        f.write_str(s)
    }
}

/// File extension for a dependency type, following the artifact handlers Maven registers by
///  default. Types without a handler use the type itself as extension.
pub fn extension_for_type(artifact_type: &str) -> &str {
    match artifact_type {
        "test-jar" | "ejb-client" | "ejb" | "maven-plugin" | "nexus-plugin" | "bundle"
        | "java-source" | "javadoc" => DEFAULT_TYPE,
        other => other,
    }
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

/// A dependency artifact as resolved by the host build.
#[derive(Debug, Eq, PartialEq, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    pub group_id: String,
    pub artifact_id: String,
    /// the resolved version, which is a timestamped version for deployed snapshots
    pub version: String,
    #[serde(default)]
    pub base_version: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(rename = "type", default = "default_type")]
    pub artifact_type: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub scope: MavenScope,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// ids of the artifacts through which this one was pulled in, starting at the project's
    ///  direct dependency; empty for direct dependencies
    #[serde(default)]
    pub dependency_trail: Vec<String>,
}

impl ArtifactRef {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> ArtifactRef {
        ArtifactRef {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            base_version: None,
            classifier: None,
            artifact_type: default_type(),
            extension: None,
            scope: MavenScope::Compile,
            optional: false,
            file: None,
            dependency_trail: vec![],
        }
    }

    pub fn with_scope(mut self, scope: MavenScope) -> ArtifactRef {
        self.scope = scope;
        self
    }

    pub fn with_type(mut self, artifact_type: &str) -> ArtifactRef {
        self.artifact_type = artifact_type.to_string();
        self
    }

    pub fn with_classifier(mut self, classifier: &str) -> ArtifactRef {
        self.classifier = Some(classifier.to_string());
        self
    }

    pub fn with_extension(mut self, extension: &str) -> ArtifactRef {
        self.extension = Some(extension.to_string());
        self
    }

    pub fn with_base_version(mut self, base_version: &str) -> ArtifactRef {
        self.base_version = Some(base_version.to_string());
        self
    }

    pub fn with_trail(mut self, trail: &[&str]) -> ArtifactRef {
        self.dependency_trail = trail.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> ArtifactRef {
        self.file = Some(file.into());
        self
    }

    /// `groupId:artifactId:version[:classifier]` - this is what dependency trails refer to
    pub fn id(&self) -> String {
        match self.classifier() {
            Some(c) => format!("{}:{}:{}:{}", self.group_id, self.artifact_id, self.version, c),
            None => format!("{}:{}:{}", self.group_id, self.artifact_id, self.version),
        }
    }

    pub fn base_version(&self) -> String {
        match &self.base_version {
            Some(v) if !v.trim().is_empty() => v.clone(),
            _ => MavenVersion::parse(&self.version).base_version().to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        match &self.extension {
            Some(e) if !e.trim().is_empty() => e,
            _ => extension_for_type(&self.artifact_type),
        }
    }

    /// the classifier, with blank classifiers treated as absent
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
            .filter(|c| !c.trim().is_empty())
    }

    pub fn is_direct(&self) -> bool {
        self.dependency_trail.is_empty()
    }

    pub fn to_coordinate(&self, shared: bool) -> GavCoordinate {
        GavCoordinate::new(
            &self.group_id,
            &self.artifact_id,
            &self.base_version(),
            self.classifier(),
            Some(&self.artifact_type),
            shared,
            self.optional,
        )
    }
}

/// Coordinates as they are written to the plugin descriptor. Two coordinates are equal if
///  groupId, artifactId, version, classifier and type are equal; the shared and optional flags do
///  not take part in equality, hashing or ordering.
#[derive(Debug, Clone)]
pub struct GavCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub artifact_type: String,
    pub shared: bool,
    pub optional: bool,
}

impl GavCoordinate {
    pub fn new(
        group_id: &str,
        artifact_id: &str,
        version: &str,
        classifier: Option<&str>,
        artifact_type: Option<&str>,
        shared: bool,
        optional: bool,
    ) -> GavCoordinate {
        GavCoordinate {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            classifier: classifier
                .filter(|c| !c.trim().is_empty())
                .map(|c| c.to_string()),
            artifact_type: artifact_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_TYPE)
                .to_string(),
            shared,
            optional,
        }
    }

    /// `groupId:artifactId`, the form used to configure shared dependencies
    pub fn group_artifact(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    fn key(&self) -> (&str, &str, &str, Option<&str>, &str) {
        (&self.group_id, &self.artifact_id, &self.version, self.classifier.as_deref(), &self.artifact_type)
    }
}

impl PartialEq for GavCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for GavCoordinate {}

impl Hash for GavCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for GavCoordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for GavCoordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for GavCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;

        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }

        if self.artifact_type != DEFAULT_TYPE {
            if self.classifier.is_none() {
                // keep the type in the type position
                f.write_str(":")?;
            }
            write!(f, ":{}", self.artifact_type)?;
        }
        Ok(())
    }
}
