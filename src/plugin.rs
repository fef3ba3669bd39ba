//! The plugin build goals and the metadata they produce

pub mod application;
pub mod check_dependencies;
pub mod classifier;
pub mod classpath;
pub mod configuration;
pub mod create_bundle;
pub mod descriptor;
pub mod generate_metadata;
pub mod osgi;
pub mod scm;
