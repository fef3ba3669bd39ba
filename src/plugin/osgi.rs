//! Basic OSGi metadata for exploded plugin bundles.
//!
//! The manifest is synthesized from the plugin descriptor when metadata is generated, and
//!  completed with the exported packages once the bundle's content is known.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{PluginError, Result};
use crate::maven::artifact_key::bundled_file_name;
use crate::maven::coordinates::ArtifactRef;
use crate::plugin::descriptor::PluginMetadata;
use crate::util::atomic_file::write_atomically;

/// Location of the OSGi metadata relative to the build directory
pub const OSGI_METADATA_FILE: &str = "nexus-plugin-bundle/osgi.metadata";

pub const MANIFEST_VERSION: &str = "Manifest-Version";
pub const BUNDLE_MANIFEST_VERSION: &str = "Bundle-ManifestVersion";
pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const BUNDLE_VERSION: &str = "Bundle-Version";
pub const BUNDLE_CLASSPATH: &str = "Bundle-ClassPath";
pub const REQUIRE_BUNDLE: &str = "Require-Bundle";
pub const EXPORT_PACKAGE: &str = "Export-Package";

const PLUGIN_API_BUNDLE: &str = "org.sonatype.nexus.plugin-api;resolution:=optional";
const NON_EXPORTED_PREFIXES: [&str; 4] = ["META", "OSGI", "docs", "static"];
const MAX_LINE_BYTES: usize = 72;

lazy_static! {
    static ref FUZZY_VERSION_REGEX: Regex = Regex::new(r"(?s)^(\d+)(\.(\d+)(\.(\d+))?)?([^a-zA-Z0-9](.*))?$").unwrap();
    static ref QUALIFIER_INVALID_CHARS_REGEX: Regex = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
}

/// The main section of a jar manifest, attributes in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Manifest {
    pub fn new() -> Manifest {
        let mut result = Manifest::default();
        result.set(MANIFEST_VERSION, "1.0");
        result
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(attribute) => attribute.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Renders the manifest with CRLF line ends, wrapping lines longer than 72 bytes
    pub fn to_manifest_string(&self) -> String {
        let mut result = String::new();

        // Manifest-Version must come first
        let ordered = self.attributes.iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(MANIFEST_VERSION))
            .chain(self.attributes.iter().filter(|(n, _)| !n.eq_ignore_ascii_case(MANIFEST_VERSION)));

        for (name, value) in ordered {
            write_wrapped(&mut result, &format!("{}: {}", name, value));
        }
        result.push_str("\r\n");
        result
    }

    pub fn parse(text: &str) -> Result<Manifest> {
        let mut attributes: Vec<(String, String)> = vec![];

        for line in text.lines() {
            if line.is_empty() {
                // end of the main section
                break;
            }

            if let Some(continuation) = line.strip_prefix(' ') {
                match attributes.last_mut() {
                    Some((_, value)) => value.push_str(continuation),
                    None => return Err(PluginError::Configuration(format!("manifest starts with a continuation line: {:?}", line))),
                }
                continue;
            }

            let (name, value) = line.split_once(": ")
                .or_else(|| line.strip_suffix(':').map(|n| (n, "")))
                .ok_or_else(|| PluginError::Configuration(format!("invalid manifest line: {:?}", line)))?;
            attributes.push((name.to_string(), value.to_string()));
        }
        Ok(Manifest { attributes })
    }

    pub fn read(path: &Path) -> Result<Manifest> {
        let text = fs::read_to_string(path)
            .map_err(|e| PluginError::io(path, e))?;
        Manifest::parse(&text)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_manifest_string();
        write_atomically(path, |f: &mut File| {
            f.write_all(text.as_bytes())
                .map_err(|e| PluginError::io(path, e))
        })
    }
}

fn write_wrapped(out: &mut String, line: &str) {
    let mut budget = MAX_LINE_BYTES;
    let mut current_len = 0;

    for c in line.chars() {
        if current_len + c.len_utf8() > budget {
            out.push_str("\r\n ");
            // continuation lines lose one byte to the leading space
            budget = MAX_LINE_BYTES - 1;
            current_len = 0;
        }
        out.push(c);
        current_len += c.len_utf8();
    }
    out.push_str("\r\n");
}

/// Converts a Maven version to a valid OSGi version `major.minor.micro[.qualifier]`
pub fn cleanup_version(version: &str) -> String {
    let version = version.trim();

    match FUZZY_VERSION_REGEX.captures(version) {
        Some(captures) => {
            let part = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or("0");
            let mut result = format!("{}.{}.{}", part(1), part(3), part(5));
            if let Some(qualifier) = captures.get(7).filter(|q| !q.as_str().is_empty()) {
                result.push('.');
                result.push_str(&QUALIFIER_INVALID_CHARS_REGEX.replace_all(qualifier.as_str(), "_"));
            }
            result
        }
        None => format!("0.0.0.{}", QUALIFIER_INVALID_CHARS_REGEX.replace_all(version, "_")),
    }
}

/// `major.minor.micro` of the cleaned up version
pub fn version_without_qualifier(version: &str) -> String {
    cleanup_version(version)
        .splitn(4, '.')
        .take(3)
        .collect::<Vec<_>>()
        .join(".")
}

/// Builds the OSGi manifest for a plugin. `classpath` are the bundled classpath artifacts, whose
///  bundle file names make up the Bundle-ClassPath.
pub fn synthesize(metadata: &PluginMetadata, final_name: &str, classpath: &[ArtifactRef]) -> Manifest {
    let mut manifest = Manifest::new();
    manifest.set(BUNDLE_MANIFEST_VERSION, "2");
    manifest.set(BUNDLE_SYMBOLIC_NAME, &format!("{}.{}", metadata.groupId, metadata.artifactId));
    manifest.set(BUNDLE_VERSION, &cleanup_version(&metadata.version));

    let mut bundle_classpath = format!("{}.jar", final_name);
    for artifact in classpath {
        bundle_classpath.push_str(",dependencies/");
        bundle_classpath.push_str(&bundled_file_name(artifact));
    }
    manifest.set(BUNDLE_CLASSPATH, &bundle_classpath);

    let mut required_bundles = String::from(PLUGIN_API_BUNDLE);
    for dependency in metadata.plugin_dependencies() {
        required_bundles.push_str(&format!(
            ",{}.{};bundle-version={}",
            dependency.groupId,
            dependency.artifactId,
            version_without_qualifier(&dependency.version),
        ));
    }
    manifest.set(REQUIRE_BUNDLE, &required_bundles);

    manifest
}

/// The packages contained in the bundled files, in the order they are first encountered. Files
///  that are not zip archives contain no packages.
pub fn exported_packages(files: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut result = vec![];

    for path in files {
        let file = File::open(path)
            .map_err(|e| PluginError::io(path, e))?;
        let mut archive = match ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(ZipError::InvalidArchive(_)) | Err(ZipError::UnsupportedArchive(_)) => {
                debug!("no packages in {}, it is not a zip archive", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let Some((dir, _)) = entry.name().rsplit_once('/') else {
                continue;
            };

            let package = dir.replace('/', ".");
            if package.is_empty() || NON_EXPORTED_PREFIXES.iter().any(|p| package.starts_with(p)) {
                continue;
            }
            if seen.insert(package.clone()) {
                result.push(package);
            }
        }
    }
    Ok(result)
}

/// Adds the Export-Package header for the bundle's content, if there is anything to export
pub fn add_exported_packages(manifest: &mut Manifest, files: &[PathBuf]) -> Result<()> {
    let packages = exported_packages(files)?;
    debug!("exporting {} packages", packages.len());

    if !packages.is_empty() {
        manifest.set(EXPORT_PACKAGE, &packages.join(","));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use rstest::*;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;
    use crate::maven::coordinates::GavCoordinate;

    #[rstest]
    #[case::release("2.3.4", "2.3.4")]
    #[case::major_only("1", "1.0.0")]
    #[case::snapshot("1.0-SNAPSHOT", "1.0.0.SNAPSHOT")]
    #[case::qualifier("1.2.3.Final", "1.2.3.Final")]
    #[case::timestamped("1.0-20120131.101010-3", "1.0.0.20120131_101010-3")]
    #[case::extra_segments("1.2.3.4.5", "1.2.3.4_5")]
    #[case::no_number("latest", "0.0.0.latest")]
    fn test_cleanup_version(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(cleanup_version(version), expected);
    }

    #[rstest]
    #[case::snapshot("1.2-SNAPSHOT", "1.2.0")]
    #[case::full("1.2.3.Final", "1.2.3")]
    fn test_version_without_qualifier(#[case] version: &str, #[case] expected: &str) {
        assert_eq!(version_without_qualifier(version), expected);
    }

    #[test]
    fn test_synthesize() {
        let mut metadata = PluginMetadata::new("org.example", "demo", "1.0-SNAPSHOT");
        metadata.add_plugin_dependency(&GavCoordinate::new("org.example", "other", "2.1-SNAPSHOT", None, None, false, false));
        let classpath = vec![
            ArtifactRef::new("g", "lib", "3.0"),
            ArtifactRef::new("g", "native", "3.0").with_classifier("linux").with_type("zip"),
        ];

        let manifest = synthesize(&metadata, "demo-1.0-SNAPSHOT", &classpath);

        assert_eq!(manifest.get(MANIFEST_VERSION), Some("1.0"));
        assert_eq!(manifest.get(BUNDLE_MANIFEST_VERSION), Some("2"));
        assert_eq!(manifest.get(BUNDLE_SYMBOLIC_NAME), Some("org.example.demo"));
        assert_eq!(manifest.get(BUNDLE_VERSION), Some("1.0.0.SNAPSHOT"));
        assert_eq!(manifest.get(BUNDLE_CLASSPATH), Some("demo-1.0-SNAPSHOT.jar,dependencies/lib-3.0.jar,dependencies/native-3.0-linux.zip"));
        assert_eq!(manifest.get(REQUIRE_BUNDLE), Some("org.sonatype.nexus.plugin-api;resolution:=optional,org.example.other;bundle-version=2.1.0"));
    }

    #[test]
    fn test_long_lines_are_wrapped() {
        let mut manifest = Manifest::new();
        let long_value = "x".repeat(200);
        manifest.set(EXPORT_PACKAGE, &long_value);

        let text = manifest.to_manifest_string();
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        for line in text.split("\r\n") {
            assert!(line.len() <= 72, "{:?}", line);
        }

        assert_eq!(Manifest::parse(&text).unwrap(), manifest);
    }

    #[test]
    fn test_manifest_version_comes_first() {
        let mut manifest = Manifest::default();
        manifest.set(BUNDLE_VERSION, "1.0.0");
        manifest.set(MANIFEST_VERSION, "1.0");
        assert!(manifest.to_manifest_string().starts_with("Manifest-Version: 1.0\r\nBundle-Version: 1.0.0\r\n"));
    }

    #[test]
    fn test_parse_ignores_named_sections() {
        let manifest = Manifest::parse("Manifest-Version: 1.0\nBundle-Version: 1\n\nName: x\nFoo: bar\n").unwrap();
        assert_eq!(manifest.get("bundle-version"), Some("1"));
        assert_eq!(manifest.get("Foo"), None);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Manifest::parse(" continued\n").is_err());
        assert!(Manifest::parse("no separator\n").is_err());
    }

    fn jar(dir: &Path, name: &str, entries: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        for entry in entries {
            if entry.ends_with('/') {
                writer.add_directory(entry.to_string(), FileOptions::default()).unwrap();
            }
            else {
                writer.start_file(entry.to_string(), FileOptions::default()).unwrap();
                writer.write_all(b"x").unwrap();
            }
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_exported_packages() {
        let dir = tempfile::tempdir().unwrap();
        let jars = vec![
            jar(dir.path(), "a.jar", &[
                "META-INF/MANIFEST.MF",
                "org/",
                "org/example/",
                "org/example/A.class",
                "org/example/impl/B.class",
                "static/index.html",
                "top-level.txt",
            ]),
            jar(dir.path(), "b.jar", &[
                "org/example/C.class",
                "com/other/D.class",
                "docs/readme.txt",
                "OSGI-INF/x.xml",
            ]),
        ];

        assert_eq!(exported_packages(&jars).unwrap(), vec!["org.example", "org.example.impl", "com.other"]);

        let mut manifest = Manifest::new();
        add_exported_packages(&mut manifest, &jars).unwrap();
        assert_eq!(manifest.get(EXPORT_PACKAGE), Some("org.example,org.example.impl,com.other"));
    }

    #[test]
    fn test_files_that_are_not_archives_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let text_file = dir.path().join("notes.txt");
        fs::write(&text_file, "not an archive").unwrap();
        let files = vec![
            text_file,
            jar(dir.path(), "native.zip", &["native/linux/lib.so"]),
        ];

        assert_eq!(exported_packages(&files).unwrap(), vec!["native.linux"]);
    }

    #[test]
    fn test_no_export_for_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let jars = vec![jar(dir.path(), "empty.jar", &["META-INF/MANIFEST.MF"])];

        let mut manifest = Manifest::new();
        add_exported_packages(&mut manifest, &jars).unwrap();
        assert_eq!(manifest.get(EXPORT_PACKAGE), None);
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OSGI_METADATA_FILE);
        let metadata = PluginMetadata::new("g", "a", "1.0");

        let manifest = synthesize(&metadata, "a-1.0", &[]);
        manifest.write(&path).unwrap();
        assert_eq!(Manifest::read(&path).unwrap(), manifest);
    }
}
