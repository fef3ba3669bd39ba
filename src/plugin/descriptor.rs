#![allow(non_snake_case)]

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::maven::coordinates::GavCoordinate;
use crate::util::atomic_file::write_atomically;

/// The `plugin.xml` document describing a plugin to the application's plugin manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "plugin")]
pub struct PluginMetadata {
    pub groupId: String,
    pub artifactId: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pluginSite: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicationId: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicationEdition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicationMinVersion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicationMaxVersion: Option<String>,

    #[serde(default, skip_serializing_if = "Licenses::is_empty")]
    pub licenses: Licenses,
    #[serde(default, skip_serializing_if = "ClasspathDependencies::is_empty")]
    pub classpathDependencies: ClasspathDependencies,
    #[serde(default, skip_serializing_if = "PluginDependencies::is_empty")]
    pub pluginDependencies: PluginDependencies,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scmUri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scmVersion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scmTimestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Licenses {
    #[serde(default)]
    pub license: Vec<License>,
}
impl Licenses {
    fn is_empty(&self) -> bool {
        self.license.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClasspathDependencies {
    #[serde(default)]
    pub classpathDependency: Vec<ClasspathDependency>,
}
impl ClasspathDependencies {
    fn is_empty(&self) -> bool {
        self.classpathDependency.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClasspathDependency {
    pub groupId: String,
    pub artifactId: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(rename = "type")]
    pub dependency_type: String,
    #[serde(default)]
    pub shared: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDependencies {
    #[serde(default)]
    pub pluginDependency: Vec<PluginDependency>,
}
impl PluginDependencies {
    fn is_empty(&self) -> bool {
        self.pluginDependency.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDependency {
    pub groupId: String,
    pub artifactId: String,
    pub version: String,
    #[serde(default)]
    pub optional: bool,
}

impl PluginMetadata {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> PluginMetadata {
        PluginMetadata {
            groupId: group_id.to_string(),
            artifactId: artifact_id.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// Licenses are identified by their type; a later license with a known type replaces the url.
    pub fn add_license(&mut self, license_type: Option<&str>, url: Option<&str>) {
        let license = License {
            license_type: license_type.map(|s| s.to_string()),
            url: url.map(|s| s.to_string()),
        };

        match self.licenses.license.iter_mut().find(|l| l.license_type == license.license_type) {
            Some(existing) => existing.url = license.url,
            None => self.licenses.license.push(license),
        }
    }

    pub fn add_classpath_dependency(&mut self, coordinate: &GavCoordinate) {
        self.classpathDependencies.classpathDependency.push(ClasspathDependency {
            groupId: coordinate.group_id.clone(),
            artifactId: coordinate.artifact_id.clone(),
            version: coordinate.version.clone(),
            classifier: coordinate.classifier.clone(),
            dependency_type: coordinate.artifact_type.clone(),
            shared: coordinate.shared,
        });
    }

    pub fn add_plugin_dependency(&mut self, coordinate: &GavCoordinate) {
        self.pluginDependencies.pluginDependency.push(PluginDependency {
            groupId: coordinate.group_id.clone(),
            artifactId: coordinate.artifact_id.clone(),
            version: coordinate.version.clone(),
            optional: coordinate.optional,
        });
    }

    pub fn classpath_dependencies(&self) -> &[ClasspathDependency] {
        &self.classpathDependencies.classpathDependency
    }

    pub fn plugin_dependencies(&self) -> &[PluginDependency] {
        &self.pluginDependencies.pluginDependency
    }

    pub fn to_xml(&self) -> Result<String> {
        Ok(serde_xml_rs::to_string(self)?)
    }

    pub fn from_xml(xml: &str) -> Result<PluginMetadata> {
        Ok(serde_xml_rs::from_str(xml)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        debug!("writing plugin descriptor to {}", path.display());

        let xml = self.to_xml()?;
        write_atomically(path, |f| {
            f.write_all(xml.as_bytes())
                .map_err(|e| PluginError::io(path, e))
        })
    }

    pub fn read(path: &Path) -> Result<PluginMetadata> {
        let xml = fs::read_to_string(path)
            .map_err(|e| PluginError::io(path, e))?;
        PluginMetadata::from_xml(&xml)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn metadata() -> PluginMetadata {
        let mut metadata = PluginMetadata::new("org.example", "demo-plugin", "1.0-SNAPSHOT");
        metadata.name = Some("Demo Plugin".to_string());
        metadata.applicationId = Some("nexus".to_string());
        metadata.applicationMinVersion = Some("1.10.0".to_string());
        metadata.add_license(Some("ASL2"), Some("http://www.apache.org/licenses/LICENSE-2.0"));
        metadata.add_classpath_dependency(&GavCoordinate::new("org.example", "lib", "2.0", None, None, true, false));
        metadata.add_classpath_dependency(&GavCoordinate::new("org.example", "native", "2.0", Some("linux"), Some("zip"), false, false));
        metadata.add_plugin_dependency(&GavCoordinate::new("org.example", "other-plugin", "1.2", None, Some("nexus-plugin"), false, true));
        metadata.scmVersion = Some("abc123".to_string());
        metadata
    }

    #[test]
    fn test_xml_content() {
        let xml = metadata().to_xml().unwrap();

        assert!(xml.contains("<plugin>"), "{}", xml);
        assert!(xml.contains("<groupId>org.example</groupId>"), "{}", xml);
        assert!(xml.contains("<name>Demo Plugin</name>"), "{}", xml);
        assert!(xml.contains("<applicationId>nexus</applicationId>"), "{}", xml);
        assert!(xml.contains("<type>ASL2</type>"), "{}", xml);
        assert!(xml.contains("<artifactId>native</artifactId>"), "{}", xml);
        assert!(xml.contains("<classifier>linux</classifier>"), "{}", xml);
        assert!(xml.contains("<shared>true</shared>"), "{}", xml);
        assert!(xml.contains("<optional>true</optional>"), "{}", xml);
        assert!(xml.contains("<scmVersion>abc123</scmVersion>"), "{}", xml);
        assert!(!xml.contains("description"), "{}", xml);
        assert!(!xml.contains("scmTimestamp"), "{}", xml);
    }

    #[test]
    fn test_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("META-INF/nexus/plugin.xml");

        metadata().write(&path).unwrap();
        let read = PluginMetadata::read(&path).unwrap();

        assert_eq!(read.classpath_dependencies().len(), 2);
        assert_eq!(read.plugin_dependencies().len(), 1);
        assert_eq!(read, metadata());
    }

    #[test]
    fn test_license_deduplication() {
        let mut metadata = PluginMetadata::new("g", "a", "1");
        metadata.add_license(Some("ASL2"), Some("http://old"));
        metadata.add_license(Some("EPL"), Some("http://epl"));
        metadata.add_license(Some("ASL2"), Some("http://new"));

        assert_eq!(metadata.licenses.license.len(), 2);
        assert_eq!(metadata.licenses.license[0].url.as_deref(), Some("http://new"));
    }

    #[test]
    fn test_minimal_descriptor() {
        let xml = PluginMetadata::new("g", "a", "1").to_xml().unwrap();
        assert!(!xml.contains("classpathDependencies"), "{}", xml);
        assert_eq!(PluginMetadata::from_xml(&xml).unwrap(), PluginMetadata::new("g", "a", "1"));
    }
}
