use std::collections::{BTreeSet, HashSet};

use crate::error::{PluginError, Result};
use crate::maven::artifact_key::format_artifact_key;
use crate::maven::coordinates::*;
use crate::plugin::application::{ApplicationInformation, GroupIdPattern};
use crate::plugin::configuration::PluginConfiguration;

pub struct ClassifierConfig {
    /// dependency type of other plugins
    pub plugin_type: String,
    /// `groupId:artifactId` of classpath dependencies that dependant plugins may see
    pub shared_dependencies: HashSet<String>,
    /// artifact key prefixes the user excluded from the classpath
    pub user_exclude_prefixes: Vec<String>,
    /// group ids of the application's core, which are never allowed on the classpath
    pub core_group_ids: Vec<GroupIdPattern>,
    /// artifact key prefixes that are never allowed on the classpath
    pub banned_prefixes: Vec<String>,
}

impl ClassifierConfig {
    pub fn new(plugin_type: &str) -> ClassifierConfig {
        ClassifierConfig {
            plugin_type: plugin_type.to_string(),
            shared_dependencies: HashSet::new(),
            user_exclude_prefixes: vec![],
            core_group_ids: vec![],
            banned_prefixes: vec![],
        }
    }

    /// The application's core group ids are banned together with whatever the user banned.
    pub fn for_application(application: &ApplicationInformation, config: &PluginConfiguration) -> ClassifierConfig {
        ClassifierConfig {
            plugin_type: application.plugin_packaging().to_string(),
            shared_dependencies: config.shared_dependencies.iter().cloned().collect(),
            user_exclude_prefixes: config.classpath_dependency_excludes.clone(),
            core_group_ids: application.core_group_id_patterns().to_vec(),
            banned_prefixes: config.banned_dependencies.clone(),
        }
    }

    fn is_banned(&self, artifact: &ArtifactRef, key: &str) -> bool {
        self.core_group_ids.iter().any(|p| p.matches(&artifact.group_id))
            || self.banned_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    fn is_excluded_by_user(&self, key: &str) -> bool {
        self.user_exclude_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransitiveExclusion {
    /// artifact key of the excluded artifact
    pub artifact: String,
    /// id of the 'provided', 'test' or plugin dependency that pulled it in
    pub excluded_ancestor: String,
}

#[derive(Debug, Default)]
pub struct ClassificationResult {
    pub plugin_dependencies: BTreeSet<GavCoordinate>,
    pub classpath_dependencies: BTreeSet<GavCoordinate>,
    /// the resolved artifacts behind `classpath_dependencies`, in input order
    pub classpath_artifacts: Vec<ArtifactRef>,

    pub excluded_by_scope: Vec<String>,
    pub excluded_by_user_pattern: Vec<String>,
    pub excluded_by_ban: Vec<String>,
    pub excluded_transitively: Vec<TransitiveExclusion>,
}

impl ClassificationResult {
    pub fn shared_dependencies(&self) -> impl Iterator<Item = &GavCoordinate> {
        self.classpath_dependencies.iter().filter(|c| c.shared)
    }

    pub fn private_dependencies(&self) -> impl Iterator<Item = &GavCoordinate> {
        self.classpath_dependencies.iter().filter(|c| !c.shared)
    }
}

/// Sorts a project's resolved dependencies into other plugins, the plugin's own classpath, and
///  everything that must not be bundled.
///
/// Artifacts must be in resolution order: a transitive dependency is only recognized as such if
///  the 'provided' / 'test' / plugin dependency it hangs off comes earlier. Exclusion propagates
///  one level only - artifacts excluded through their trail do not exclude their own dependants.
pub fn classify(artifacts: &[ArtifactRef], config: &ClassifierConfig) -> Result<ClassificationResult> {
    let mut result = ClassificationResult::default();
    let mut excluded_ids: HashSet<String> = HashSet::new();

    for artifact in artifacts {
        if artifact.artifact_type == config.plugin_type {
            if artifact.scope != MavenScope::Provided {
                return Err(PluginError::Configuration(format!(
                    "plugin dependency must use provided scope: {}:{}:{} has scope {}",
                    artifact.group_id, artifact.artifact_id, artifact.artifact_type, artifact.scope,
                )));
            }

            excluded_ids.insert(artifact.id());
            // other plugins are resolved by the application at runtime, so they are referenced by
            //  base version
            result.plugin_dependencies.insert(artifact.to_coordinate(false));
            continue;
        }

        match artifact.scope {
            MavenScope::Provided | MavenScope::Test => {
                excluded_ids.insert(artifact.id());
                result.excluded_by_scope.push(format_artifact_key(artifact));
            }
            MavenScope::Compile | MavenScope::Runtime => {
                let excluded_ancestor = artifact.dependency_trail.iter()
                    .find(|trail_id| excluded_ids.contains(trail_id.as_str()));
                if let Some(ancestor) = excluded_ancestor {
                    result.excluded_transitively.push(TransitiveExclusion {
                        artifact: format_artifact_key(artifact),
                        excluded_ancestor: ancestor.clone(),
                    });
                    continue;
                }

                let key = format_artifact_key(artifact);
                if config.is_banned(artifact, &key) {
                    result.excluded_by_ban.push(key);
                }
                else if config.is_excluded_by_user(&key) {
                    result.excluded_by_user_pattern.push(key);
                }
                else {
                    let shared = config.shared_dependencies.contains(&format!("{}:{}", artifact.group_id, artifact.artifact_id));
                    if result.classpath_dependencies.insert(artifact.to_coordinate(shared)) {
                        result.classpath_artifacts.push(artifact.clone());
                    }
                }
            }
            MavenScope::System | MavenScope::Other => {}
        }
    }

    result.excluded_by_scope.sort();
    result.excluded_by_user_pattern.sort();
    result.excluded_by_ban.sort();
    result.excluded_transitively.sort();
    Ok(result)
}
