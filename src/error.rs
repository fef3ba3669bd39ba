use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    /// The build is misconfigured in a way that no retry can fix, e.g. a plugin dependency that is
    ///  not in 'provided' scope or a goal that runs before the goal it depends on.
    #[error("{0}")]
    Configuration(String),

    #[error("bad artifact coordinates {key:?}, expected format is <groupId>:<artifactId>[:<extension>[:<classifier>]]:<version>")]
    MalformedKey { key: String },

    #[error("{command} failed: {stderr}")]
    ScmProbe { command: String, stderr: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plugin descriptor: {0}")]
    Descriptor(#[from] serde_xml_rs::Error),

    #[error("invalid project model: {0}")]
    ProjectModel(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl PluginError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> PluginError {
        PluginError::Io {
            path: path.into(),
            source,
        }
    }
}
