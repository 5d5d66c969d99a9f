//! Resource staging
//!
//! Copies the runtime home, standard library, venv, and project trees
//! under their fixed virtual prefixes inside a staging root. Copies
//! preserve relative path structure exactly; any failure aborts the
//! whole build.

use crate::config::{
    GraalPyHome, ENTRY_POINT_FILE, VFS_HOME_PREFIX, VFS_PROJ_PREFIX, VFS_VENV_PREFIX,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Byte-compiled cache directories, never staged.
pub const PYCACHE_DIR: &str = "__pycache__";

/// Heavyweight optional stdlib packages left out of the runtime-home copy.
pub const STDLIB_EXCLUDED_PACKAGES: &[&str] = &["ensurepip", "idlelib", "tkinter", "turtledemo"];

/// Errors that can occur while staging resources
#[derive(Debug, Error)]
pub enum BundleError {
    /// Source tree missing or unreadable
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File copy failed
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    CopyError {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// A single staging exclusion rule; rules on one copy combine by conjunction.
#[derive(Debug, Clone, Copy)]
pub enum FilterRule {
    /// Exclude byte-compiled cache directories.
    CacheDirs,
    /// Exclude directories whose name is in the set.
    DirNames(&'static [&'static str]),
}

impl FilterRule {
    /// Whether a directory with this name is excluded from the copy.
    pub fn excludes_dir(&self, name: &str) -> bool {
        match self {
            FilterRule::CacheDirs => name == PYCACHE_DIR,
            FilterRule::DirNames(names) => names.contains(&name),
        }
    }
}

fn is_excluded_dir(name: &str, filters: &[FilterRule]) -> bool {
    filters.iter().any(|rule| rule.excludes_dir(name))
}

/// Copy a source tree into `resource_root` under a virtual prefix.
///
/// Only directories that contain files end up in the staged tree, so the
/// staged shape is exactly the set of copied files plus their parents.
pub fn copy_tree(
    src: &Path,
    resource_root: &Path,
    prefix: &str,
    filters: &[FilterRule],
) -> Result<(), BundleError> {
    copy_dir_recursive(src, &resource_root.join(prefix), filters)
}

fn copy_dir_recursive(src: &Path, dest: &Path, filters: &[FilterRule]) -> Result<(), BundleError> {
    let entries = fs::read_dir(src).map_err(|source| BundleError::ReadError {
        path: src.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| BundleError::ReadError {
            path: src.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name();

        if path.is_dir() {
            if is_excluded_dir(&name.to_string_lossy(), filters) {
                continue;
            }
            copy_dir_recursive(&path, &dest.join(&name), filters)?;
        } else {
            fs::create_dir_all(dest).map_err(|source| BundleError::CreateDirError {
                path: dest.to_path_buf(),
                source,
            })?;
            let target = dest.join(&name);
            fs::copy(&path, &target).map_err(|source| BundleError::CopyError {
                from: path.clone(),
                to: target,
                source,
            })?;
        }
    }

    Ok(())
}

/// Stage the runtime's support tree and standard library under `vfs/home`.
pub fn stage_python_home(resource_root: &Path, home: &GraalPyHome) -> Result<(), BundleError> {
    copy_tree(
        &home.capi_home(),
        resource_root,
        &format!("{}/lib-graalpython", VFS_HOME_PREFIX),
        &[FilterRule::CacheDirs],
    )?;

    copy_tree(
        &home.stdlib_home(),
        resource_root,
        &format!("{}/lib-python/3", VFS_HOME_PREFIX),
        &[
            FilterRule::CacheDirs,
            FilterRule::DirNames(STDLIB_EXCLUDED_PACKAGES),
        ],
    )
}

/// Stage a virtual environment under `vfs/venv`, verbatim apart from the
/// cache rule.
pub fn stage_venv(resource_root: &Path, venv: &Path) -> Result<(), BundleError> {
    copy_tree(venv, resource_root, VFS_VENV_PREFIX, &[FilterRule::CacheDirs])
}

/// Stage the user's project under `vfs/proj`.
///
/// A directory module is copied verbatim. A single-file module is first
/// placed as the entry-point file inside an isolated holding directory so
/// both input shapes produce an identical staged tree.
pub fn stage_project(resource_root: &Path, module: &Path) -> Result<(), BundleError> {
    if module.is_dir() {
        return copy_tree(module, resource_root, VFS_PROJ_PREFIX, &[FilterRule::CacheDirs]);
    }

    let holding = tempfile::tempdir().map_err(|source| BundleError::CreateDirError {
        path: std::env::temp_dir(),
        source,
    })?;
    let entry = holding.path().join(ENTRY_POINT_FILE);
    fs::copy(module, &entry).map_err(|source| BundleError::CopyError {
        from: module.to_path_buf(),
        to: entry,
        source,
    })?;
    copy_tree(
        holding.path(),
        resource_root,
        VFS_PROJ_PREFIX,
        &[FilterRule::CacheDirs],
    )
}

/// Stage everything one build embeds: runtime home, optional venv, project.
pub fn stage_resources(
    resource_root: &Path,
    home: &GraalPyHome,
    module: &Path,
    venv: Option<&Path>,
) -> Result<(), BundleError> {
    stage_python_home(resource_root, home)?;
    if let Some(venv) = venv {
        stage_venv(resource_root, venv)?;
    }
    stage_project(resource_root, module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VFS_PREFIX;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_filter_rules() {
        assert!(FilterRule::CacheDirs.excludes_dir("__pycache__"));
        assert!(!FilterRule::CacheDirs.excludes_dir("package"));
        assert!(FilterRule::DirNames(&["tkinter"]).excludes_dir("tkinter"));
        assert!(!FilterRule::DirNames(&["tkinter"]).excludes_dir("json"));
    }

    #[test]
    fn test_copy_tree_preserves_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write(&src.join("a.py"), "a");
        write(&src.join("pkg").join("b.py"), "b");
        write(&src.join("pkg").join("sub").join("c.py"), "c");

        let staged = tmp.path().join("staged");
        copy_tree(&src, &staged, "vfs/proj", &[FilterRule::CacheDirs]).unwrap();

        assert!(staged.join("vfs/proj/a.py").is_file());
        assert!(staged.join("vfs/proj/pkg/b.py").is_file());
        assert!(staged.join("vfs/proj/pkg/sub/c.py").is_file());
    }

    #[test]
    fn test_copy_tree_excludes_pycache() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write(&src.join("a.py"), "a");
        write(&src.join("__pycache__").join("a.cpython-311.pyc"), "x");
        write(&src.join("pkg").join("__pycache__").join("b.pyc"), "x");
        write(&src.join("pkg").join("b.py"), "b");

        let staged = tmp.path().join("staged");
        copy_tree(&src, &staged, "vfs/proj", &[FilterRule::CacheDirs]).unwrap();

        assert!(staged.join("vfs/proj/a.py").is_file());
        assert!(staged.join("vfs/proj/pkg/b.py").is_file());
        assert!(!staged.join("vfs/proj/__pycache__").exists());
        assert!(!staged.join("vfs/proj/pkg/__pycache__").exists());
    }

    #[test]
    fn test_stage_python_home_applies_stdlib_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("graalpy");
        write(&root.join("lib-graalpython").join("_sysconfig.py"), "x");
        let stdlib = root.join("lib-python").join("3");
        write(&stdlib.join("os.py"), "x");
        write(&stdlib.join("json").join("__init__.py"), "x");
        for name in STDLIB_EXCLUDED_PACKAGES {
            write(&stdlib.join(name).join("__init__.py"), "x");
        }

        let staged = tmp.path().join("staged");
        let home = GraalPyHome::with_root(root);
        stage_python_home(&staged, &home).unwrap();

        let staged_stdlib = staged.join(VFS_PREFIX).join("home/lib-python/3");
        assert!(staged.join(VFS_PREFIX).join("home/lib-graalpython/_sysconfig.py").is_file());
        assert!(staged_stdlib.join("os.py").is_file());
        assert!(staged_stdlib.join("json/__init__.py").is_file());
        for name in STDLIB_EXCLUDED_PACKAGES {
            assert!(!staged_stdlib.join(name).exists(), "{} staged", name);
        }
    }

    #[test]
    fn test_single_file_and_directory_module_stage_identically() {
        let tmp = tempfile::tempdir().unwrap();

        let file_module = tmp.path().join("app.py");
        fs::write(&file_module, "print('hello')\n").unwrap();
        let staged_file = tmp.path().join("staged-file");
        stage_project(&staged_file, &file_module).unwrap();

        let dir_module = tmp.path().join("appdir");
        write(&dir_module.join(ENTRY_POINT_FILE), "print('hello')\n");
        let staged_dir = tmp.path().join("staged-dir");
        stage_project(&staged_dir, &dir_module).unwrap();

        let entry = Path::new(VFS_PROJ_PREFIX).join(ENTRY_POINT_FILE);
        assert!(staged_file.join(&entry).is_file());
        assert!(staged_dir.join(&entry).is_file());
        assert_eq!(
            fs::read(staged_file.join(&entry)).unwrap(),
            fs::read(staged_dir.join(&entry)).unwrap()
        );
    }

    #[test]
    fn test_copy_tree_missing_source_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = copy_tree(
            &tmp.path().join("missing"),
            &tmp.path().join("staged"),
            "vfs/proj",
            &[],
        );
        assert!(matches!(result, Err(BundleError::ReadError { .. })));
    }
}
