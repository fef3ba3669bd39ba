use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{PluginError, Result};
use crate::maven::project::ProjectModel;
use crate::plugin::configuration::PluginConfiguration;

lazy_static! {
    static ref EXPRESSION_REGEX: Regex = Regex::new(r"\$\{([^}]*)\}").unwrap();
}

const PROJECT_PREFIXES: [&str; 2] = ["project.", "pom."];

/// A group id given either literally or as a regular expression matching the entire group id
#[derive(Debug, Clone)]
pub struct GroupIdPattern {
    pattern: String,
    regex: Regex,
}

impl GroupIdPattern {
    pub fn new(pattern: &str) -> Result<GroupIdPattern> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| PluginError::Configuration(format!("invalid core groupId pattern {:?}: {}", pattern, e)))?;
        Ok(GroupIdPattern {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, group_id: &str) -> bool {
        self.pattern == group_id || self.regex.is_match(group_id)
    }
}

/// What a plugin build needs to know about the application the plugin is built for. Instances are
///  immutable; user configuration is applied by [ApplicationInformation::configured], which
///  returns a new instance.
pub struct ApplicationInformation {
    plugin_packaging: String,
    application_id: Option<String>,
    application_edition: Option<String>,
    application_min_version: Option<String>,
    application_max_version: Option<String>,
    plugin_metadata_path: String,
    core_group_id_patterns: Vec<GroupIdPattern>,
}

impl ApplicationInformation {
    /// `core_group_id_patterns` are group ids that belong to the application's core, given either
    ///  literally or as regular expressions matching the entire group id.
    pub fn new(plugin_packaging: &str, plugin_metadata_path: &str, core_group_id_patterns: &[&str]) -> Result<ApplicationInformation> {
        let core_group_id_patterns = core_group_id_patterns.iter()
            .map(|pattern| GroupIdPattern::new(pattern))
            .collect::<Result<Vec<_>>>()?;

        Ok(ApplicationInformation {
            plugin_packaging: plugin_packaging.to_string(),
            application_id: None,
            application_edition: None,
            application_min_version: None,
            application_max_version: None,
            plugin_metadata_path: plugin_metadata_path.to_string(),
            core_group_id_patterns,
        })
    }

    /// Defaults for plugins of the Nexus repository manager
    pub fn nexus() -> Result<ApplicationInformation> {
        let mut result = ApplicationInformation::new(
            "nexus-plugin",
            "${project.build.outputDirectory}/META-INF/nexus/plugin.xml",
            &["org.sonatype.nexus", "com.sonatype.nexus"],
        )?;
        result.application_id = Some("nexus".to_string());
        result.application_edition = Some("OSS".to_string());
        result.application_min_version = Some("1.10.0".to_string());
        Ok(result)
    }

    /// Returns a copy with the application settings the user configured explicitly.
    pub fn configured(self, config: &PluginConfiguration) -> ApplicationInformation {
        ApplicationInformation {
            application_id: config.application_id.clone().or(self.application_id),
            application_edition: config.application_edition.clone().or(self.application_edition),
            application_min_version: config.application_min_version.clone().or(self.application_min_version),
            application_max_version: config.application_max_version.clone().or(self.application_max_version),
            plugin_metadata_path: config.generated_plugin_metadata.clone().unwrap_or(self.plugin_metadata_path),
            ..self
        }
    }

    /// The POM packaging of plugins, which is also the dependency type of inter-plugin dependencies
    pub fn plugin_packaging(&self) -> &str {
        &self.plugin_packaging
    }

    pub fn application_id(&self) -> Option<&str> {
        self.application_id.as_deref()
    }

    pub fn application_edition(&self) -> Option<&str> {
        self.application_edition.as_deref()
    }

    pub fn application_min_version(&self) -> Option<&str> {
        self.application_min_version.as_deref()
    }

    pub fn application_max_version(&self) -> Option<&str> {
        self.application_max_version.as_deref()
    }

    pub fn core_group_id_patterns(&self) -> &[GroupIdPattern] {
        &self.core_group_id_patterns
    }

    pub fn matches_core_group_id(&self, group_id: &str) -> bool {
        self.core_group_id_patterns.iter()
            .any(|p| p.matches(group_id))
    }

    pub fn plugin_metadata_file(&self, project: &ProjectModel) -> Result<PathBuf> {
        let path = PathBuf::from(interpolate(&self.plugin_metadata_path, project)?);
        if path.is_absolute() {
            Ok(path)
        }
        else {
            Ok(project.basedir().join(path))
        }
    }
}

/// Replaces `${project.xyz}` (or `${pom.xyz}`) expressions with values from the project
fn interpolate(pattern: &str, project: &ProjectModel) -> Result<String> {
    let mut result = String::new();
    let mut last_end = 0;

    for captures in EXPRESSION_REGEX.captures_iter(pattern) {
        let Some(whole) = captures.get(0) else { continue };
        result.push_str(&pattern[last_end..whole.start()]);
        result.push_str(&evaluate(&captures[1], project)?);
        last_end = whole.end();
    }
    result.push_str(&pattern[last_end..]);
    Ok(result)
}

fn evaluate(expression: &str, project: &ProjectModel) -> Result<String> {
    let property = PROJECT_PREFIXES.iter()
        .find_map(|prefix| expression.strip_prefix(prefix))
        .or(if expression == "basedir" { Some(expression) } else { None });

    let value = match property {
        Some("basedir") => Some(project.basedir().display().to_string()),
        Some("groupId") => Some(project.group_id.clone()),
        Some("artifactId") => Some(project.artifact_id.clone()),
        Some("version") => Some(project.version.clone()),
        Some("packaging") => Some(project.packaging.clone()),
        Some("name") => project.name.clone(),
        Some("build.directory") => Some(project.build_directory().display().to_string()),
        Some("build.outputDirectory") => Some(project.output_directory().display().to_string()),
        Some("build.finalName") => Some(project.final_name()),
        _ => None,
    };

    value.ok_or_else(|| PluginError::Configuration(format!("cannot interpolate expression ${{{}}}", expression)))
}
