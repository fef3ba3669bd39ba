use std::fs::{create_dir_all, remove_file, rename, File};
use std::path::{Path, PathBuf};

use tracing::{error, trace};
use uuid::Uuid;

use crate::error::{PluginError, Result};

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut result = path.to_path_buf();
    result.set_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4().as_hyphenated()));
    result
}

/// Writes a file by having `write` fill a uniquely named sibling file which is then renamed to
///  `path`. Readers never see a partially written file, and a failed write leaves whatever was at
///  `path` before untouched.
pub fn write_atomically<T>(path: &Path, write: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)
                .map_err(|e| PluginError::io(parent, e))?;
        }
    }

    let temp_path = temp_path_for(path);
    trace!("writing {} through temporary file {}", path.display(), temp_path.display());

    let result = File::create(&temp_path)
        .map_err(|e| PluginError::io(&temp_path, e))
        .and_then(|mut file| {
            let value = write(&mut file)?;
            file.sync_all()
                .map_err(|e| PluginError::io(&temp_path, e))?;
            Ok(value)
        })
        .and_then(|value| {
            rename(&temp_path, path)
                .map_err(|e| PluginError::io(path, e))?;
            Ok(value)
        });

    if result.is_err() && temp_path.exists() {
        if let Err(e) = remove_file(&temp_path) {
            error!("error cleaning up temporary file {} after failed write: {}", temp_path.display(), e);
        }
    }
    result
}
