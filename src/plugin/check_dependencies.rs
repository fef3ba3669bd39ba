use tracing::{error, info};

use crate::error::PluginError;
use crate::maven::coordinates::{ArtifactRef, MavenScope};
use crate::maven::project::ProjectModel;
use crate::plugin::application::ApplicationInformation;

/// Verifies that a plugin declares other plugins and the application's core artifacts as 'provided'
///  dependencies, reporting all offending dependencies at once.
pub fn check_dependencies(project: &ProjectModel, application: &ApplicationInformation) -> anyhow::Result<()> {
    if project.packaging != application.plugin_packaging() {
        info!("skipping dependency check for project with packaging {:?}", project.packaging);
        return Ok(());
    }

    let problems = find_problems(project, application);
    if problems.is_empty() {
        info!("No dependency problems detected");
        return Ok(());
    }

    for problem in &problems {
        error!("dependency must use provided scope: {}", problem);
    }
    Err(PluginError::Configuration(format!(
        "plugin and core dependencies must use provided scope: {}",
        problems.join(", "),
    )).into())
}

fn find_problems(project: &ProjectModel, application: &ApplicationInformation) -> Vec<String> {
    project.direct_dependencies()
        .filter(|a| a.scope != MavenScope::Test && a.scope != MavenScope::Provided)
        .filter(|a| must_be_provided(a, application))
        .map(|a| format!("{} ({})", a.id(), a.scope))
        .collect()
}

fn must_be_provided(artifact: &ArtifactRef, application: &ApplicationInformation) -> bool {
    artifact.artifact_type == application.plugin_packaging()
        || application.matches_core_group_id(&artifact.group_id)
}
