use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::maven::project::ProjectModel;
use crate::plugin::application::ApplicationInformation;
use crate::plugin::classifier::{classify, ClassificationResult, ClassifierConfig};
use crate::plugin::classpath::ClasspathRecord;
use crate::plugin::descriptor::PluginMetadata;
use crate::plugin::osgi::{self, OSGI_METADATA_FILE};
use crate::plugin::scm::ScmProvider;

/// Generates the plugin descriptor and the classpath record for the bundle, plus OSGi metadata if
///  configured. Files are only written once all of them could be prepared.
pub fn generate_metadata(project: &ProjectModel, application: &ApplicationInformation) -> anyhow::Result<()> {
    if project.packaging != application.plugin_packaging() {
        info!("skipping metadata generation for project with packaging {:?}", project.packaging);
        return Ok(());
    }

    let config = &project.configuration;
    let mut metadata = PluginMetadata::new(&project.group_id, &project.artifact_id, &project.version);
    metadata.name = config.plugin_name.clone().or_else(|| project.name.clone());
    metadata.description = config.plugin_description.clone().or_else(|| project.description.clone());
    metadata.pluginSite = config.plugin_site_url.clone().or_else(|| project.url.clone());

    metadata.applicationId = application.application_id().map(|s| s.to_string());
    metadata.applicationEdition = application.application_edition().map(|s| s.to_string());
    metadata.applicationMinVersion = application.application_min_version().map(|s| s.to_string());
    metadata.applicationMaxVersion = application.application_max_version().map(|s| s.to_string());

    for license in &project.licenses {
        metadata.add_license(license.name.as_deref(), license.url.as_deref());
    }

    if let Some(scm_url) = project.scm_developer_connection() {
        add_scm_info(&mut metadata, scm_url, &project.basedir());
    }

    let classifier_config = ClassifierConfig::for_application(application, config);
    let classification = classify(&project.artifacts, &classifier_config)
        .context("failed to classify plugin dependencies")?;
    log_diagnostics(&classification);

    for dependency in &classification.plugin_dependencies {
        metadata.add_plugin_dependency(dependency);
    }
    for dependency in &classification.classpath_dependencies {
        metadata.add_classpath_dependency(dependency);
    }

    let descriptor_file = application.plugin_metadata_file(project)?;
    let record = ClasspathRecord::from_artifacts(&classification.classpath_artifacts)?;
    let manifest = config.osgi
        .then(|| osgi::synthesize(&metadata, &project.final_name(), &classification.classpath_artifacts));

    metadata.write(&descriptor_file)
        .with_context(|| format!("failed to write plugin descriptor {}", descriptor_file.display()))?;
    info!("generated plugin descriptor {}", descriptor_file.display());

    let build_directory = project.build_directory();
    let record_file = ClasspathRecord::location(&build_directory);
    record.write(&record_file)
        .with_context(|| format!("failed to write classpath record {}", record_file.display()))?;

    if let Some(manifest) = manifest {
        let osgi_file = build_directory.join(OSGI_METADATA_FILE);
        manifest.write(&osgi_file)
            .with_context(|| format!("failed to write OSGi metadata {}", osgi_file.display()))?;
        debug!("generated OSGi metadata {}", osgi_file.display());
    }
    Ok(())
}

/// Missing SCM information does not fail the build
fn add_scm_info(metadata: &mut PluginMetadata, scm_url: &str, basedir: &Path) {
    metadata.scmUri = Some(scm_url.to_string());

    let provider = match ScmProvider::from_connection(scm_url) {
        Ok(Some(provider)) => provider,
        Ok(None) => {
            warn!("no revision information for unsupported SCM {:?}", scm_url);
            return;
        }
        Err(e) => {
            warn!("cannot determine SCM revision: {}", e);
            return;
        }
    };

    match provider.probe(basedir) {
        Ok(revision) => {
            debug!("{} revision {} from {}", provider, revision.revision, revision.timestamp);
            metadata.scmVersion = Some(revision.revision);
            metadata.scmTimestamp = Some(revision.timestamp);
        }
        Err(e) => warn!("cannot determine SCM revision: {}", e),
    }
}

fn log_diagnostics(classification: &ClassificationResult) {
    for key in &classification.excluded_by_user_pattern {
        info!("excluded by configuration: {}", key);
    }
    for key in &classification.excluded_by_ban {
        info!("excluded as application core dependency: {}", key);
    }
    for exclusion in &classification.excluded_transitively {
        debug!("excluded transitively: {} (via {})", exclusion.artifact, exclusion.excluded_ancestor);
    }
    for key in &classification.excluded_by_scope {
        debug!("excluded by scope: {}", key);
    }

    debug!("{} plugin dependencies, {} shared and {} private classpath dependencies",
        classification.plugin_dependencies.len(),
        classification.shared_dependencies().count(),
        classification.private_dependencies().count(),
    );
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::error::PluginError;
    use crate::maven::coordinates::{ArtifactRef, MavenScope};
    use crate::plugin::osgi::Manifest;

    const PROJECT: &str = r#"{
        "groupId": "org.example",
        "artifactId": "demo-plugin",
        "version": "1.0-SNAPSHOT",
        "packaging": "nexus-plugin",
        "name": "Demo",
        "url": "https://example.org/demo",
        "licenses": [
            {"name": "ASL2", "url": "http://www.apache.org/licenses/LICENSE-2.0"},
            {"name": "ASL2", "url": "http://www.apache.org/licenses/LICENSE-2.0.txt"}
        ],
        "scm": {"developerConnection": "scm:cvs:pserver:example.org:/cvs"}
    }"#;

    fn project(dir: &Path, artifacts: Vec<ArtifactRef>) -> ProjectModel {
        let mut project = ProjectModel::from_json(PROJECT).unwrap();
        project.basedir = Some(dir.to_path_buf());
        project.artifacts = artifacts;
        project
    }

    fn jar(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really a jar").unwrap();
        path
    }

    fn descriptor_file(dir: &Path) -> PathBuf {
        dir.join("target/classes/META-INF/nexus/plugin.xml")
    }

    #[test]
    fn test_generate() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), vec![
            ArtifactRef::new("g", "p", "1.0").with_type("nexus-plugin").with_scope(MavenScope::Provided),
            ArtifactRef::new("g", "lib", "2.0").with_file(jar(dir.path(), "lib-2.0.jar")),
            ArtifactRef::new("g", "shared", "3.0").with_file(jar(dir.path(), "shared-3.0.jar")),
            ArtifactRef::new("org.sonatype.nexus", "nexus-api", "1.10.0").with_file(jar(dir.path(), "nexus-api.jar")),
            ArtifactRef::new("g", "y", "4.0").with_scope(MavenScope::Test),
        ]);
        project.configuration.plugin_description = Some("configured".to_string());
        project.configuration.shared_dependencies = vec!["g:shared".to_string()];

        generate_metadata(&project, &ApplicationInformation::nexus().unwrap()).unwrap();

        let metadata = PluginMetadata::read(&descriptor_file(dir.path())).unwrap();
        assert_eq!(metadata.name.as_deref(), Some("Demo"));
        assert_eq!(metadata.description.as_deref(), Some("configured"));
        assert_eq!(metadata.pluginSite.as_deref(), Some("https://example.org/demo"));
        assert_eq!(metadata.applicationId.as_deref(), Some("nexus"));
        assert_eq!(metadata.applicationMinVersion.as_deref(), Some("1.10.0"));
        assert_eq!(metadata.licenses.license.len(), 1);
        assert_eq!(metadata.scmUri.as_deref(), Some("scm:cvs:pserver:example.org:/cvs"));
        assert_eq!(metadata.scmVersion, None);

        assert_eq!(metadata.plugin_dependencies().len(), 1);
        assert_eq!(metadata.plugin_dependencies()[0].artifactId, "p");
        let classpath: Vec<(&str, bool)> = metadata.classpath_dependencies().iter()
            .map(|d| (d.artifactId.as_str(), d.shared))
            .collect();
        assert_eq!(classpath, vec![("lib", false), ("shared", true)]);

        let record = ClasspathRecord::read(&ClasspathRecord::location(&dir.path().join("target"))).unwrap();
        assert_eq!(record.len(), 2);
        assert!(record.get("g:lib:jar:2.0").unwrap().ends_with("lib-2.0.jar"));

        assert!(!dir.path().join("target").join(OSGI_METADATA_FILE).exists());
    }

    #[test]
    fn test_generate_osgi_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), vec![
            ArtifactRef::new("g", "lib", "2.0").with_file(jar(dir.path(), "lib-2.0.jar")),
        ]);
        project.configuration.osgi = true;

        generate_metadata(&project, &ApplicationInformation::nexus().unwrap()).unwrap();

        let manifest = Manifest::read(&dir.path().join("target").join(OSGI_METADATA_FILE)).unwrap();
        assert_eq!(manifest.get(osgi::BUNDLE_SYMBOLIC_NAME), Some("org.example.demo-plugin"));
        assert_eq!(manifest.get(osgi::BUNDLE_CLASSPATH), Some("demo-plugin-1.0-SNAPSHOT.jar,dependencies/lib-2.0.jar"));
    }

    #[test]
    fn test_nothing_written_on_classification_failure() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), vec![
            ArtifactRef::new("g", "lib", "2.0").with_file(jar(dir.path(), "lib-2.0.jar")),
            ArtifactRef::new("g", "p", "1.0").with_type("nexus-plugin"),
        ]);

        let err = generate_metadata(&project, &ApplicationInformation::nexus().unwrap()).unwrap_err();
        assert!(matches!(err.downcast_ref::<PluginError>(), Some(PluginError::Configuration(_))), "{:?}", err);
        assert!(!descriptor_file(dir.path()).exists());
        assert!(!dir.path().join("target").exists());
    }

    #[test]
    fn test_unresolved_classpath_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let project = project(dir.path(), vec![ArtifactRef::new("g", "lib", "2.0")]);

        assert!(generate_metadata(&project, &ApplicationInformation::nexus().unwrap()).is_err());
        assert!(!descriptor_file(dir.path()).exists());
    }

    #[test]
    fn test_other_packaging_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project(dir.path(), vec![]);
        project.packaging = "jar".to_string();

        generate_metadata(&project, &ApplicationInformation::nexus().unwrap()).unwrap();
        assert!(!dir.path().join("target").exists());
    }
}
