//! Resource manifest generation
//!
//! Walks the staged virtual-filesystem tree and produces the ordered
//! listing the embedded runtime uses to answer directory queries, since
//! resources baked into the binary cannot be enumerated with a real
//! directory-listing call.

use crate::bundler::PYCACHE_DIR;
use crate::config::VFS_PREFIX;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during manifest generation
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Staged tree unreadable
    #[error("Failed to walk {}: {source}", .path.display())]
    WalkError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Staged entry name is not valid UTF-8
    #[error("Staged path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// Staged entry name contains a line terminator
    #[error("Staged path contains a line terminator: {0}")]
    InvalidPath(String),

    /// Manifest file could not be written
    #[error("Failed to write manifest {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Ordered listing of every staged virtual path
///
/// Directories carry a trailing `/`; the first entry is always the
/// virtual-filesystem root marker. Entries map one-to-one onto the
/// physical entries under the staged root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManifest {
    entries: Vec<String>,
}

impl ResourceManifest {
    /// Manifest entries in emission order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Serialize as newline-delimited text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }

    /// Write the manifest file.
    pub fn write(&self, dest: &Path) -> Result<(), ManifestError> {
        fs::write(dest, self.to_text()).map_err(|source| ManifestError::WriteError {
            path: dest.to_path_buf(),
            source,
        })
    }
}

/// Walk the staged virtual-filesystem root and produce its manifest.
///
/// The walk is depth-first with lexically ordered siblings, so two runs
/// over an unmodified tree produce byte-identical output.
pub fn generate(vfs_root: &Path) -> Result<ResourceManifest, ManifestError> {
    let root_marker = format!("{}/", VFS_PREFIX);
    let mut entries = vec![root_marker.clone()];
    walk(vfs_root, &root_marker, &mut entries)?;
    Ok(ResourceManifest { entries })
}

fn walk(dir: &Path, prefix: &str, entries: &mut Vec<String>) -> Result<(), ManifestError> {
    let read = fs::read_dir(dir).map_err(|source| ManifestError::WalkError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut children: Vec<OsString> = Vec::new();
    for entry in read {
        let entry = entry.map_err(|source| ManifestError::WalkError {
            path: dir.to_path_buf(),
            source,
        })?;
        children.push(entry.file_name());
    }
    children.sort();

    for name in children {
        let path = dir.join(&name);
        let name = name
            .to_str()
            .ok_or_else(|| ManifestError::NonUtf8Path(path.clone()))?;
        if name.contains('\n') || name.contains('\r') {
            return Err(ManifestError::InvalidPath(name.to_string()));
        }

        if path.is_dir() {
            if name == PYCACHE_DIR {
                continue;
            }
            let virtual_path = format!("{}{}/", prefix, name);
            entries.push(virtual_path.clone());
            walk(&path, &virtual_path, entries)?;
        } else {
            entries.push(format!("{}{}", prefix, name));
        }
    }

    Ok(())
}
