//! Token substitution for generated sources and build descriptors
//!
//! A bounded substitution pass, not a template language: each line is
//! scanned for the literal spelling of every registered token and every
//! occurrence is replaced. Placeholder-shaped text that is not a
//! registered token is left untouched.

use crate::config::{
    Versions, FILES_LIST_NAME, MVN_COMPILER_SOURCE, MVN_COMPILER_TARGET, MVN_GRAAL_SDK_VERSION,
    MVN_JAR_PLUGIN, MVN_NATIVE_IMAGE_PLUGIN, VFS_HOME_PREFIX, VFS_PREFIX, VFS_PROJ_PREFIX,
    VFS_VENV_PREFIX,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Virtual filesystem accessor source.
pub const VFS_JAVA: &str = include_str!("../templates/VirtualFileSystem.java");

/// Launcher source for the native binary and the Java bindings project.
pub const LAUNCHER_JAVA: &str = include_str!("../templates/Py2BinLauncher.java");

/// Entry point source for the polyglot application skeleton.
pub const POLYGLOT_MAIN_JAVA: &str = include_str!("../templates/Main.java");

/// Java module descriptor.
pub const MODULE_INFO: &str = include_str!("../templates/module-info.java");

/// native-image resource configuration.
pub const NATIVE_IMAGE_RESOURCES: &str =
    include_str!("../templates/native-image-resources.json");

/// native-image proxy configuration for the polyglot application skeleton.
pub const NATIVE_IMAGE_PROXY_CONF: &str =
    include_str!("../templates/native-image-proxy-configuration.json");

/// Build descriptor for the Java bindings project.
pub const JAVA_BINDINGS_POM: &str = include_str!("../templates/java_bindings_pom.xml");

/// Build descriptor for the polyglot application skeleton.
pub const POLYGLOT_APP_POM: &str = include_str!("../templates/polyglot_app_pom.xml");

/// Errors that can occur while rendering templates
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file could not be read
    #[error("Failed to read template {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Rendered output could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render a template by replacing every occurrence of each token.
///
/// A token that never occurs is a valid no-op.
pub fn render(template: &str, tokens: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    for line in template.lines() {
        let mut line = line.to_string();
        for (token, value) in tokens {
            if line.contains(token) {
                line = line.replace(token, value);
            }
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Render a template into a file, creating parent directories as needed.
pub fn render_to_file(
    template: &str,
    dest: &Path,
    tokens: &[(&str, &str)],
) -> Result<(), TemplateError> {
    let rendered = render(template, tokens);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| TemplateError::WriteError {
            path: dest.to_path_buf(),
            source,
        })?;
    }
    fs::write(dest, rendered).map_err(|source| TemplateError::WriteError {
        path: dest.to_path_buf(),
        source,
    })
}

/// Render a template file from disk into a file.
pub fn render_file(
    src: &Path,
    dest: &Path,
    tokens: &[(&str, &str)],
) -> Result<(), TemplateError> {
    let template = fs::read_to_string(src).map_err(|source| TemplateError::ReadError {
        path: src.to_path_buf(),
        source,
    })?;
    render_to_file(&template, dest, tokens)
}

/// Tokens for the virtual filesystem accessor source.
pub fn vfs_file_tokens(java_pkg: &str) -> [(&'static str, &str); 3] {
    [
        ("{java-pkg}", java_pkg),
        ("{vfs-prefix}", VFS_PREFIX),
        ("{files-list-name}", FILES_LIST_NAME),
    ]
}

/// Tokens for the launcher sources.
pub fn launcher_tokens(java_pkg: &str) -> [(&'static str, &str); 4] {
    [
        ("{java-pkg}", java_pkg),
        ("{vfs-home-prefix}", VFS_HOME_PREFIX),
        ("{vfs-venv-prefix}", VFS_VENV_PREFIX),
        ("{vfs-proj-prefix}", VFS_PROJ_PREFIX),
    ]
}

/// Tokens for the build descriptors.
pub fn pom_tokens(versions: &Versions) -> [(&'static str, &str); 10] {
    [
        ("{graalpy-version}", versions.graalpy.as_str()),
        ("{mvn-compiler-source}", MVN_COMPILER_SOURCE),
        ("{mvn-compiler-target}", MVN_COMPILER_TARGET),
        ("{mvn-jar-plugin}", MVN_JAR_PLUGIN),
        ("{graal-sdk-version}", MVN_GRAAL_SDK_VERSION),
        ("{native-image-mvn-plugin}", MVN_NATIVE_IMAGE_PLUGIN),
        ("{vfs-prefix}", VFS_PREFIX),
        ("{vfs-home-prefix}", VFS_HOME_PREFIX),
        ("{vfs-venv-prefix}", VFS_VENV_PREFIX),
        ("{files-list-name}", FILES_LIST_NAME),
    ]
}

/// Tokens for the native-image resource configuration.
pub fn resources_tokens() -> [(&'static str, &'static str); 1] {
    [("{vfs-prefix}", VFS_PREFIX)]
}
