use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PluginError, Result};
use crate::maven::coordinates::ArtifactRef;
use crate::plugin::configuration::PluginConfiguration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scm {
    pub connection: Option<String>,
    pub developer_connection: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default = "Build::default_directory")]
    pub directory: PathBuf,
    #[serde(default = "Build::default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default)]
    pub final_name: Option<String>,
}
impl Build {
    fn default_directory() -> PathBuf {
        PathBuf::from("target")
    }

    fn default_output_directory() -> PathBuf {
        PathBuf::from("target/classes")
    }
}
impl Default for Build {
    fn default() -> Self {
        Build {
            directory: Build::default_directory(),
            output_directory: Build::default_output_directory(),
            final_name: None,
        }
    }
}

/// The part of a Maven project that the plugin goals work on, as exported by the host build after
///  it resolved the project's test scope dependencies.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectModel {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default = "ProjectModel::default_packaging")]
    pub packaging: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub licenses: Vec<License>,
    #[serde(default)]
    pub scm: Option<Scm>,
    #[serde(default)]
    pub basedir: Option<PathBuf>,
    #[serde(default)]
    pub build: Build,
    /// the project's primary artifact, once it is packaged
    #[serde(default)]
    pub artifact_file: Option<PathBuf>,
    /// resolved dependencies in 'test' resolution scope, i.e. all of them
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
    #[serde(default)]
    pub configuration: PluginConfiguration,
}

impl ProjectModel {
    fn default_packaging() -> String {
        "jar".to_string()
    }

    pub fn from_json(json: &str) -> Result<ProjectModel> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a project model file. A missing or relative basedir is resolved against the directory
    ///  containing the model file.
    pub fn load(path: &Path) -> Result<ProjectModel> {
        debug!("loading project model from {}", path.display());

        let json = fs::read_to_string(path)
            .map_err(|e| PluginError::io(path, e))?;
        let mut project = ProjectModel::from_json(&json)?;

        let model_dir = path.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        project.basedir = Some(match project.basedir.take() {
            Some(basedir) if basedir.is_absolute() => basedir,
            Some(basedir) => model_dir.join(basedir),
            None => model_dir,
        });
        Ok(project)
    }

    pub fn basedir(&self) -> PathBuf {
        self.basedir.clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        }
        else {
            self.basedir().join(path)
        }
    }

    pub fn build_directory(&self) -> PathBuf {
        self.resolve(&self.build.directory)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.resolve(&self.build.output_directory)
    }

    pub fn artifact_file(&self) -> Option<PathBuf> {
        self.artifact_file.as_deref()
            .map(|f| self.resolve(f))
    }

    /// `<artifactId>-<version>` unless configured otherwise
    pub fn final_name(&self) -> String {
        match &self.build.final_name {
            Some(n) if !n.trim().is_empty() => n.clone(),
            _ => format!("{}-{}", self.artifact_id, self.version),
        }
    }

    /// dependencies declared in the POM itself as opposed to transitive ones
    pub fn direct_dependencies(&self) -> impl Iterator<Item = &ArtifactRef> {
        self.artifacts.iter()
            .filter(|a| a.is_direct())
    }

    pub fn scm_developer_connection(&self) -> Option<&str> {
        self.scm.as_ref()
            .and_then(|scm| scm.developer_connection.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = r#"{"groupId": "org.example", "artifactId": "demo", "version": "1.0"}"#;

    #[test]
    fn test_defaults() {
        let project = ProjectModel::from_json(MINIMAL).unwrap();
        assert_eq!(project.packaging, "jar");
        assert_eq!(project.final_name(), "demo-1.0");
        assert_eq!(project.build_directory(), PathBuf::from("./target"));
        assert_eq!(project.output_directory(), PathBuf::from("./target/classes"));
        assert!(project.artifacts.is_empty());
        assert!(project.scm_developer_connection().is_none());
    }

    #[test]
    fn test_direct_dependencies() {
        let project = ProjectModel::from_json(r#"{
            "groupId": "org.example", "artifactId": "demo", "version": "1.0", "packaging": "nexus-plugin",
            "build": {"finalName": "custom"},
            "artifacts": [
                {"groupId": "g", "artifactId": "direct", "version": "1"},
                {"groupId": "g", "artifactId": "transitive", "version": "1", "dependencyTrail": ["g:direct:1"]}
            ]
        }"#).unwrap();

        let direct: Vec<_> = project.direct_dependencies().map(|a| a.artifact_id.as_str()).collect();
        assert_eq!(direct, vec!["direct"]);
        assert_eq!(project.final_name(), "custom");
    }

    #[test]
    fn test_load_resolves_basedir() {
        let dir = tempfile::tempdir().unwrap();
        let model_file = dir.path().join("project.json");
        fs::write(&model_file, MINIMAL).unwrap();

        let project = ProjectModel::load(&model_file).unwrap();
        assert_eq!(project.basedir(), dir.path());
        assert_eq!(project.build_directory(), dir.path().join("target"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectModel::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, PluginError::Io { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let err = ProjectModel::from_json("{").unwrap_err();
        assert!(matches!(err, PluginError::ProjectModel(_)));
    }
}
