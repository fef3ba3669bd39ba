use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PluginError, Result};
use crate::maven::artifact_key::{bundled_file_name, format_artifact_key};
use crate::maven::project::ProjectModel;
use crate::plugin::classpath::ClasspathRecord;
use crate::plugin::osgi::{self, Manifest, OSGI_METADATA_FILE};
use crate::util::atomic_file::write_atomically;
use crate::util::checksum::{checksums_of_file, write_checksum_files};

enum EntryContent {
    File(PathBuf),
    Bytes(Vec<u8>),
}

struct BundleEntry {
    name: String,
    content: EntryContent,
}

/// `<build directory>/<final name>-bundle.zip`
pub fn bundle_file(project: &ProjectModel) -> PathBuf {
    let final_name = project.configuration.bundle_final_name.clone()
        .unwrap_or_else(|| project.final_name());
    project.build_directory().join(format!("{}-bundle.zip", final_name))
}

/// Packages the plugin jar and its classpath dependencies (as recorded when the metadata was
///  generated) into a zip, next to which SHA1 and MD5 checksum files are written.
pub fn create_bundle(project: &ProjectModel) -> anyhow::Result<PathBuf> {
    let build_directory = project.build_directory();
    let record = ClasspathRecord::read(&ClasspathRecord::location(&build_directory))?;

    let mut entries = bundle_entries(project, &record)?;

    let osgi_file = build_directory.join(OSGI_METADATA_FILE);
    if osgi_file.exists() {
        let mut manifest = Manifest::read(&osgi_file)?;
        let files: Vec<PathBuf> = entries.iter()
            .filter_map(|e| match &e.content {
                EntryContent::File(path) => Some(path.clone()),
                EntryContent::Bytes(_) => None,
            })
            .collect();
        osgi::add_exported_packages(&mut manifest, &files)
            .context("failed to determine exported packages")?;

        entries.push(BundleEntry {
            name: format!("{}META-INF/MANIFEST.MF", bundle_prefix(project)),
            content: EntryContent::Bytes(manifest.to_manifest_string().into_bytes()),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let bundle = bundle_file(project);
    write_atomically(&bundle, |f| write_zip(f, &entries))
        .with_context(|| format!("failed to write bundle {}", bundle.display()))?;

    let checksums = checksums_of_file(&bundle)?;
    write_checksum_files(&bundle, &checksums)?;

    info!("created plugin bundle {} with {} entries", bundle.display(), entries.len());
    Ok(bundle)
}

fn bundle_prefix(project: &ProjectModel) -> String {
    format!("{}-{}/", project.artifact_id, project.version)
}

fn bundle_entries(project: &ProjectModel, record: &ClasspathRecord) -> Result<Vec<BundleEntry>> {
    let prefix = bundle_prefix(project);

    let artifact_file = project.artifact_file()
        .ok_or_else(|| PluginError::Configuration("the plugin's artifact has not been packaged yet".to_string()))?;
    let artifact_name = artifact_file.file_name()
        .ok_or_else(|| PluginError::Configuration(format!("not a file: {}", artifact_file.display())))?
        .to_string_lossy()
        .to_string();

    let mut entries = vec![BundleEntry {
        name: format!("{}{}", prefix, artifact_name),
        content: EntryContent::File(artifact_file),
    }];

    // artifacts from different groups may share a file name
    let mut sources: HashMap<String, String> = HashMap::new();

    for artifact in record.artifacts()? {
        let name = format!("{}dependencies/{}", prefix, bundled_file_name(&artifact));
        let key = format_artifact_key(&artifact);
        if let Some(previous) = sources.insert(name.clone(), key.clone()) {
            return Err(PluginError::Configuration(format!(
                "{} and {} would both be bundled as {}", previous, key, name,
            )));
        }

        let file = artifact.file
            .ok_or_else(|| PluginError::Configuration(format!("no file recorded for {}", name)))?;
        entries.push(BundleEntry {
            name,
            content: EntryContent::File(file),
        });
    }
    Ok(entries)
}

fn write_zip(file: &mut File, entries: &[BundleEntry]) -> Result<()> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(file);

    for entry in entries {
        debug!("adding {}", entry.name);
        zip.start_file(entry.name.as_str(), options)?;

        match &entry.content {
            EntryContent::File(path) => {
                let mut source = File::open(path)
                    .map_err(|e| PluginError::io(path, e))?;
                io::copy(&mut source, &mut zip)
                    .map_err(|e| PluginError::io(path, e))?;
            }
            EntryContent::Bytes(bytes) => {
                zip.write_all(bytes)
                    .map_err(|e| PluginError::io(Path::new(&entry.name), e))?;
            }
        }
    }
    zip.finish()?;
    Ok(())
}
