use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PluginError, Result};
use crate::maven::artifact_key::{format_artifact_key, parse_artifact_key};
use crate::maven::coordinates::ArtifactRef;
use crate::util::atomic_file::write_atomically;

/// Location of the classpath record relative to the build directory
pub const CLASSPATH_RECORD_FILE: &str = "nexus-plugin-bundle/plugin.classpath";

/// The plugin's resolved classpath dependencies as handed from metadata generation to bundling:
///  artifact key (see [format_artifact_key]) to absolute file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathRecord {
    entries: BTreeMap<String, PathBuf>,
}

impl ClasspathRecord {
    pub fn location(build_directory: &Path) -> PathBuf {
        build_directory.join(CLASSPATH_RECORD_FILE)
    }

    pub fn from_artifacts<'a>(artifacts: impl IntoIterator<Item = &'a ArtifactRef>) -> Result<ClasspathRecord> {
        let mut entries = BTreeMap::new();

        for artifact in artifacts {
            let file = artifact.file.as_ref()
                .ok_or_else(|| PluginError::Configuration(format!("classpath dependency {} was not resolved to a file", artifact.id())))?;
            let file = std::path::absolute(file)
                .map_err(|e| PluginError::io(file, e))?;
            entries.insert(format_artifact_key(artifact), file);
        }
        Ok(ClasspathRecord { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(|p| p.as_path())
    }

    /// The recorded artifacts, in key order, each with its file
    pub fn artifacts(&self) -> Result<Vec<ArtifactRef>> {
        self.entries.keys()
            .map(|key| parse_artifact_key(key, |k| self.entries.get(k).cloned()))
            .collect()
    }

    pub fn to_properties(&self) -> String {
        let mut result = String::from("# plugin classpath dependencies: <groupId>:<artifactId>:<extension>[:<classifier>]:<version>=<file>\n");
        for (key, file) in &self.entries {
            result.push_str(&escape(key, true));
            result.push('=');
            result.push_str(&escape(&file.to_string_lossy(), false));
            result.push('\n');
        }
        result
    }

    /// Parses the property list format. Keys and values are un-escaped the way Java property files
    ///  are, so records written by Java tooling can be read as well.
    pub fn parse_properties(text: &str) -> Result<ClasspathRecord> {
        let mut entries = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let separator = find_separator(line)
                .ok_or_else(|| PluginError::MalformedKey { key: unescape(line) })?;
            let key = unescape(line[..separator].trim_end());
            let value = unescape(line[separator + 1..].trim_start());

            // fail early rather than when bundling
            parse_artifact_key(&key, |_| None)?;
            entries.insert(key, PathBuf::from(value));
        }
        Ok(ClasspathRecord { entries })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        debug!("writing {} classpath entries to {}", self.entries.len(), path.display());

        let properties = self.to_properties();
        write_atomically(path, |f| {
            f.write_all(properties.as_bytes())
                .map_err(|e| PluginError::io(path, e))
        })
    }

    pub fn read(path: &Path) -> Result<ClasspathRecord> {
        if !path.exists() {
            return Err(PluginError::Configuration(format!("cannot find {} - did you run generate-metadata?", path.display())));
        }

        let text = fs::read_to_string(path)
            .map_err(|e| PluginError::io(path, e))?;
        ClasspathRecord::parse_properties(&text)
    }
}

/// index of the first '=' that is not escaped by a backslash
fn find_separator(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' => return Some(i),
            _ => {}
        }
    }
    None
}

fn escape(s: &str, is_key: bool) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '=' if is_key => result.push_str("\\="),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c => result.push(c),
        }
    }
    result
}

/// Java property un-escaping, including `\uXXXX` escapes as `Properties.store` writes them for
///  non-ASCII characters
fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut utf16_units: Vec<u16> = vec![];
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.as_str().starts_with('u') {
            chars.next();
            let hex: String = chars.by_ref().take(4).collect();
            match u16::from_str_radix(&hex, 16) {
                Ok(unit) if hex.len() == 4 => {
                    utf16_units.push(unit);
                    continue;
                }
                _ => {
                    flush_utf16(&mut result, &mut utf16_units);
                    result.push('u');
                    result.push_str(&hex);
                    continue;
                }
            }
        }
        flush_utf16(&mut result, &mut utf16_units);

        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('f') => result.push('\u{c}'),
            Some(other) => result.push(other),
            None => {}
        }
    }
    flush_utf16(&mut result, &mut utf16_units);
    result
}

/// consecutive `\u` escapes may encode a surrogate pair
fn flush_utf16(result: &mut String, units: &mut Vec<u16>) {
    result.extend(char::decode_utf16(units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
}
