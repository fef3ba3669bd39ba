use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::trace;

use crate::error::{PluginError, Result};
use crate::util::atomic_file::write_atomically;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    pub sha1: [u8; 20],
    pub md5: [u8; 16],
}

/// A sink that computes SHA1 and MD5 of everything written to it, for the checksum files Maven
///  repositories keep next to each artifact
pub struct ChecksumWriter {
    sha1_hasher: Sha1,
    md5_context: md5::Context,
}
impl ChecksumWriter {
    pub fn new() -> ChecksumWriter {
        ChecksumWriter {
            sha1_hasher: Default::default(),
            md5_context: md5::Context::new(),
        }
    }

    pub fn finish(self) -> Checksums {
        Checksums {
            sha1: self.sha1_hasher.finalize().into(),
            md5: self.md5_context.compute().into(),
        }
    }
}
impl Write for ChecksumWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sha1_hasher.update(buf);
        self.md5_context.consume(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn checksums_of_file(path: &Path) -> Result<Checksums> {
    trace!("computing checksums of {}", path.display());

    let file = File::open(path)
        .map_err(|e| PluginError::io(path, e))?;
    let mut writer = ChecksumWriter::new();
    io::copy(&mut BufReader::new(file), &mut writer)
        .map_err(|e| PluginError::io(path, e))?;
    Ok(writer.finish())
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut result = path.as_os_str().to_owned();
    result.push(suffix);
    PathBuf::from(result)
}

/// Writes `<file>.sha1` and `<file>.md5` containing the lowercase hex digests
pub fn write_checksum_files(path: &Path, checksums: &Checksums) -> Result<()> {
    for (suffix, digest) in [(".sha1", hex::encode(checksums.sha1)), (".md5", hex::encode(checksums.md5))] {
        let sidecar = sidecar_path(path, suffix);
        write_atomically(&sidecar, |f| {
            f.write_all(digest.as_bytes())
                .map_err(|e| PluginError::io(&sidecar, e))
        })?;
    }
    Ok(())
}
