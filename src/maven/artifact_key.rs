use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{PluginError, Result};
use crate::maven::coordinates::*;

lazy_static! {
    // <groupId>:<artifactId>[:<extension>[:<classifier>]]:<version>
    static ref ARTIFACT_KEY_REGEX: Regex = Regex::new(r"^([^: ]+):([^: ]+)(:([^: ]*)(:([^: ]+))?)?:([^: ]+)$").unwrap();
}

/// Renders the key under which a resolved artifact is stored in the classpath record. The
///  resolved version is used since the key is also what locates the file.
///
/// NB: none of the coordinates may contain ':' - this is not checked here
pub fn format_artifact_key(artifact: &ArtifactRef) -> String {
    let mut key = format!("{}:{}:{}", artifact.group_id, artifact.artifact_id, artifact.extension());

    if let Some(classifier) = artifact.classifier() {
        key.push(':');
        key.push_str(classifier);
    }

    key.push(':');
    key.push_str(&artifact.version);
    key
}

/// Inverse of [format_artifact_key]. `file_lookup` is asked for the artifact's file, typically
///  from the classpath record the key was read from.
pub fn parse_artifact_key(key: &str, file_lookup: impl FnOnce(&str) -> Option<PathBuf>) -> Result<ArtifactRef> {
    let captures = ARTIFACT_KEY_REGEX.captures(key)
        .ok_or_else(|| PluginError::MalformedKey { key: key.to_string() })?;

    let extension = captures.get(4)
        .map(|m| m.as_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_TYPE);

    let mut artifact = ArtifactRef::new(&captures[1], &captures[2], &captures[7])
        .with_type(extension)
        .with_extension(extension);
    if let Some(classifier) = captures.get(6) {
        artifact = artifact.with_classifier(classifier.as_str());
    }
    artifact.file = file_lookup(key);

    Ok(artifact)
}

/// The file name under which an artifact is placed in the bundle's dependency directory:
///  `<artifactId>-<version>[-<classifier>].<extension>`
pub fn bundled_file_name(artifact: &ArtifactRef) -> String {
    match artifact.classifier() {
        Some(c) => format!("{}-{}-{}.{}", artifact.artifact_id, artifact.version, c, artifact.extension()),
        None => format!("{}-{}.{}", artifact.artifact_id, artifact.version, artifact.extension()),
    }
}
