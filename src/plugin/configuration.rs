use serde::Deserialize;

/// User configuration of the plugin goals, as found in the project model's `configuration`
///  section. Every field is optional; unset fields fall back to the project or to the
///  application's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfiguration {
    pub plugin_name: Option<String>,
    pub plugin_description: Option<String>,
    pub plugin_site_url: Option<String>,

    pub application_id: Option<String>,
    pub application_edition: Option<String>,
    pub application_min_version: Option<String>,
    pub application_max_version: Option<String>,

    /// where to write plugin.xml, may contain `${project.*}` expressions
    pub generated_plugin_metadata: Option<String>,

    /// key prefixes (`groupId:artifactId...`) of classpath dependencies that are not bundled, e.g.
    ///  because they are shaded into the plugin jar
    pub classpath_dependency_excludes: Vec<String>,
    /// `groupId:artifactId` of classpath dependencies that are shared with dependant plugins
    pub shared_dependencies: Vec<String>,
    /// key prefixes of dependencies that must never be bundled, in addition to the application's
    ///  core group ids
    pub banned_dependencies: Vec<String>,

    /// generate OSGi metadata and add it to the bundle
    pub osgi: bool,
    pub bundle_final_name: Option<String>,
}

impl PluginConfiguration {
    /// Applies overrides given on the command line. Lists are appended to, scalars replaced.
    pub fn merge(mut self, overrides: PluginConfiguration) -> PluginConfiguration {
        fn pick(current: &mut Option<String>, new: Option<String>) {
            if new.is_some() {
                *current = new;
            }
        }

        pick(&mut self.plugin_name, overrides.plugin_name);
        pick(&mut self.plugin_description, overrides.plugin_description);
        pick(&mut self.plugin_site_url, overrides.plugin_site_url);
        pick(&mut self.application_id, overrides.application_id);
        pick(&mut self.application_edition, overrides.application_edition);
        pick(&mut self.application_min_version, overrides.application_min_version);
        pick(&mut self.application_max_version, overrides.application_max_version);
        pick(&mut self.generated_plugin_metadata, overrides.generated_plugin_metadata);
        pick(&mut self.bundle_final_name, overrides.bundle_final_name);

        self.classpath_dependency_excludes.extend(overrides.classpath_dependency_excludes);
        self.shared_dependencies.extend(overrides.shared_dependencies);
        self.banned_dependencies.extend(overrides.banned_dependencies);
        self.osgi |= overrides.osgi;
        self
    }
}
