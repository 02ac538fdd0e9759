use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTRACT_SUFFIX: &str = "_tmp";

/// Where `archive` gets unpacked: its path without extension, plus `_tmp`.
///
/// The name is stable so a rerun lands in the same place.
pub fn extraction_dir(archive: &Path) -> PathBuf {
    let mut name: OsString = archive
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(EXTRACT_SUFFIX);
    archive.with_file_name(name)
}

/// An unpacked archive. The directory is removed when this is dropped.
#[derive(Debug)]
pub struct ExtractedArchive {
    root: PathBuf,
    removed: bool,
}

impl ExtractedArchive {
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Removes the extracted tree now, reporting any failure.
    pub fn cleanup(mut self) -> Result<()> {
        self.removed = true;
        remove_tree(&self.root)
    }
}

impl Drop for ExtractedArchive {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.root) {
            warn!("leaving {} behind: {e:#}", self.root.display());
        }
    }
}

fn remove_tree(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
    }
}

/// Unpacks a gzip-compressed tar archive next to itself.
///
/// A tree left over from an interrupted run is replaced. If unpacking fails
/// part way the partial tree is removed before the error is returned.
pub fn expand(archive: &Path) -> Result<ExtractedArchive> {
    let target = extraction_dir(archive);
    remove_tree(&target)?;
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;

    let extracted = ExtractedArchive {
        root: target,
        removed: false,
    };
    fs::create_dir_all(extracted.path())
        .with_context(|| format!("creating {}", extracted.path().display()))?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(extracted.path())
        .with_context(|| {
            format!(
                "extracting {} to {}",
                archive.display(),
                extracted.path().display()
            )
        })?;
    debug!("unpacked {:?} into {:?}", archive, extracted.path());
    Ok(extracted)
}
