pub mod error;
pub mod maven;
pub mod plugin;
pub mod util;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::maven::project::ProjectModel;
use crate::plugin::application::ApplicationInformation;
use crate::plugin::check_dependencies::check_dependencies;
use crate::plugin::configuration::PluginConfiguration;
use crate::plugin::create_bundle::create_bundle;
use crate::plugin::generate_metadata::generate_metadata;

#[derive(Parser, Debug)]
#[command(name = "nexus-plugin-bundle")]
#[command(about = "Generates metadata for Nexus plugins and packages them as bundles", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    goal: Goal,
}

#[derive(Subcommand, Debug)]
enum Goal {
    /// Verify that plugin and core dependencies are in 'provided' scope
    CheckDependencies(GoalArgs),
    /// Write plugin.xml, the classpath record and optionally OSGi metadata
    GenerateMetadata(GoalArgs),
    /// Package the plugin and its classpath dependencies as a zip
    CreateBundle(GoalArgs),
}

#[derive(Args, Debug)]
struct GoalArgs {
    /// Project model exported by the host build
    #[arg(short, long, default_value = "target/nexus-plugin-project.json")]
    project: PathBuf,

    #[arg(long)]
    plugin_name: Option<String>,
    #[arg(long)]
    plugin_description: Option<String>,
    #[arg(long)]
    plugin_site_url: Option<String>,

    #[arg(long)]
    application_id: Option<String>,
    #[arg(long)]
    application_edition: Option<String>,
    #[arg(long)]
    application_min_version: Option<String>,
    #[arg(long)]
    application_max_version: Option<String>,

    /// Where to write plugin.xml, may contain ${project.*} expressions
    #[arg(long)]
    generated_plugin_metadata: Option<String>,

    /// Key prefix of classpath dependencies to leave out of the bundle
    #[arg(long = "exclude", value_name = "KEY_PREFIX")]
    classpath_dependency_excludes: Vec<String>,

    /// Classpath dependency that dependant plugins may use
    #[arg(long = "share", value_name = "GROUP_ID:ARTIFACT_ID")]
    shared_dependencies: Vec<String>,

    /// Key prefix of dependencies that must never be bundled
    #[arg(long = "ban", value_name = "KEY_PREFIX")]
    banned_dependencies: Vec<String>,

    /// Generate OSGi metadata
    #[arg(long)]
    osgi: bool,

    #[arg(long)]
    bundle_final_name: Option<String>,
}

impl GoalArgs {
    fn overrides(&self) -> PluginConfiguration {
        PluginConfiguration {
            plugin_name: self.plugin_name.clone(),
            plugin_description: self.plugin_description.clone(),
            plugin_site_url: self.plugin_site_url.clone(),
            application_id: self.application_id.clone(),
            application_edition: self.application_edition.clone(),
            application_min_version: self.application_min_version.clone(),
            application_max_version: self.application_max_version.clone(),
            generated_plugin_metadata: self.generated_plugin_metadata.clone(),
            classpath_dependency_excludes: self.classpath_dependency_excludes.clone(),
            shared_dependencies: self.shared_dependencies.clone(),
            banned_dependencies: self.banned_dependencies.clone(),
            osgi: self.osgi,
            bundle_final_name: self.bundle_final_name.clone(),
        }
    }

    fn load_project(&self) -> anyhow::Result<ProjectModel> {
        let mut project = ProjectModel::load(&self.project)
            .with_context(|| format!("failed to load project model {}", self.project.display()))?;
        project.configuration = std::mem::take(&mut project.configuration).merge(self.overrides());
        debug!("configuration: {:?}", project.configuration);
        Ok(project)
    }
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    }
    else if cli.quiet {
        "warn"
    }
    else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.goal {
        Goal::CheckDependencies(args) => {
            let project = args.load_project()?;
            let application = ApplicationInformation::nexus()?.configured(&project.configuration);
            check_dependencies(&project, &application)
        }
        Goal::GenerateMetadata(args) => {
            let project = args.load_project()?;
            let application = ApplicationInformation::nexus()?.configured(&project.configuration);
            generate_metadata(&project, &application)
        }
        Goal::CreateBundle(args) => {
            let project = args.load_project()?;
            create_bundle(&project)?;
            Ok(())
        }
    }
}
