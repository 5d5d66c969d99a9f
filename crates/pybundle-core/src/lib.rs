//! Pybundle packaging pipeline
//!
//! This crate turns a Python script or module folder, plus an optional
//! venv, into a single self-contained native binary or a buildable Java
//! project. It provides:
//! - Build request validation and per-run configuration
//! - Resource staging under fixed virtual-filesystem prefixes
//! - Resource manifest generation for the embedded filesystem accessor
//! - Token substitution for generated sources and build descriptors
//! - GraalVM toolchain resolution and runtime-distribution fetch
//! - The native-image build orchestration and project generators

pub mod bundler;
pub mod config;
pub mod manifest;
pub mod native;
pub mod project;
pub mod staging;
pub mod template;
pub mod toolchain;

pub use bundler::{BundleError, FilterRule, STDLIB_EXCLUDED_PACKAGES};
pub use config::{BuildRequest, ConfigError, GraalPyHome, TargetKind, Versions};
pub use manifest::{generate as generate_manifest, ManifestError, ResourceManifest};
pub use native::build_native;
pub use project::{create_java_bindings, create_polyglot_app};
pub use staging::StagingDir;
pub use template::TemplateError;
pub use toolchain::{Toolchain, ToolchainError};

use thiserror::Error;

/// Top-level error for one packaging run
///
/// Every failure is fatal: no stage retries, no partial artifact is kept,
/// and the staging directory is cleaned up on the way out.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Invalid build request
    #[error("{0}")]
    ConfigError(#[from] ConfigError),

    /// Staging failed
    #[error("Staging error: {0}")]
    BundleError(#[from] BundleError),

    /// Manifest generation failed
    #[error("Manifest error: {0}")]
    ManifestError(#[from] ManifestError),

    /// Source generation failed
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),

    /// Toolchain resolution or runtime fetch failed
    #[error("Toolchain error: {0}")]
    ToolchainError(#[from] ToolchainError),

    /// A compiler could not be started
    #[error("Failed to run {tool}: {source}")]
    SpawnError {
        tool: String,
        source: std::io::Error,
    },

    /// A compiler exited nonzero; its output was already surfaced
    #[error("{tool} exited with status {code}")]
    ChildProcessError { tool: String, code: i32 },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
