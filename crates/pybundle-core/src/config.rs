//! Per-run build configuration
//!
//! Holds the immutable request describing one packaging run, the pinned
//! tool versions, and the resolved GraalPy installation paths.

use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Root of the virtual filesystem inside the staged resources.
pub const VFS_PREFIX: &str = "vfs";

/// Virtual prefix for the Python runtime home (support tree + stdlib).
pub const VFS_HOME_PREFIX: &str = "vfs/home";

/// Virtual prefix for the bundled virtual environment.
pub const VFS_VENV_PREFIX: &str = "vfs/venv";

/// Virtual prefix for the user's project code.
pub const VFS_PROJ_PREFIX: &str = "vfs/proj";

/// Name of the resource manifest file, written under [`VFS_PREFIX`].
pub const FILES_LIST_NAME: &str = "fileslist.txt";

/// Java module name for the generated launcher sources.
pub const MODULE_NAME: &str = "standalone";

/// File name a single-file module is staged under inside `vfs/proj`.
pub const ENTRY_POINT_FILE: &str = "__main__.py";

/// Maven source prefix used by the project-producing targets.
pub const MVN_CODE_PREFIX: &str = "src/main/java";

/// Maven resource prefix used by the project-producing targets.
pub const MVN_RESOURCE_PREFIX: &str = "src/main/resources";

/// Package declaration for sources generated into the `standalone` module.
pub const NATIVE_EXEC_JAVA_PKG: &str = "package standalone;";

/// Package declaration for the polyglot application skeleton.
pub const POLYGLOT_APP_JAVA_PKG: &str = "package com.mycompany.javapython;";

/// Class name of the generated launcher.
pub const LAUNCHER_CLASS: &str = "Py2BinLauncher";

/// File name of the generated launcher source.
pub const LAUNCHER_FILE: &str = "Py2BinLauncher.java";

/// File name of the generated virtual filesystem accessor source.
pub const VFS_JAVA_FILE: &str = "VirtualFileSystem.java";

/// File name of the polyglot application entry point source.
pub const POLYGLOT_APP_LAUNCHER_FILE: &str = "Main.java";

/// File name of the Java module descriptor.
pub const MODULE_INFO_FILE: &str = "module-info.java";

/// File name of the native-image resource configuration.
pub const NATIVE_IMAGE_RESOURCES_FILE: &str = "native-image-resources.json";

/// File name of the native-image proxy configuration.
pub const NATIVE_IMAGE_PROXY_CONF_FILE: &str = "native-image-proxy-configuration.json";

/// Maven artifact holding the Python runtime distribution.
pub const PYTHON_ARTIFACT_ID: &str = "python-community";

/// Base URL GraalVM archives are downloaded from.
pub const GRAALVM_URL_BASE: &str = "https://download.oracle.com/graalvm/";

pub const MVN_COMPILER_SOURCE: &str = "17";
pub const MVN_COMPILER_TARGET: &str = "17";
pub const MVN_JAR_PLUGIN: &str = "3.1.0";
pub const MVN_GRAAL_SDK_VERSION: &str = "23.0.0";
pub const MVN_NATIVE_IMAGE_PLUGIN: &str = "0.9.23";

const DEFAULT_GRAALPY_VERSION: &str = "23.0.0";
const DEFAULT_JDK_VERSION: &str = "17.0.7";

/// Errors raised while validating a build request or resolving the
/// runtime installation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Output location already exists
    #[error("Output path already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Output location nested inside the module directory
    #[error("Output path {} cannot be placed inside the module folder {}", .output.display(), .module.display())]
    OutputInsideModule { output: PathBuf, module: PathBuf },

    /// Module path does not exist
    #[error("Module path does not exist: {}", .0.display())]
    ModuleNotFound(PathBuf),

    /// Target kind requires a module but none was given
    #[error("This target requires a module path")]
    MissingModule,

    /// GRAALPY_HOME is not set
    #[error("GRAALPY_HOME is not set; point it to a GraalPy installation")]
    HomeNotSet,

    /// GRAALPY_HOME points to a missing directory
    #[error("GRAALPY_HOME does not point to a directory: {}", .0.display())]
    HomeNotFound(PathBuf),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// What kind of artifact a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A single self-contained native binary
    NativeExecutable,
    /// A buildable Maven project embedding the Python code
    JavaBindings,
    /// A buildable Maven project skeleton without user code
    PolyglotApp,
}

/// Immutable configuration for one packaging run
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Target kind
    pub kind: TargetKind,

    /// Python file or module folder to bundle (absent for [`TargetKind::PolyglotApp`])
    pub module: Option<PathBuf>,

    /// Virtual environment to bundle
    pub venv: Option<PathBuf>,

    /// Output binary path or project directory
    pub output: PathBuf,

    /// Optimize the binary for size instead of speed
    pub size_opt: bool,

    /// Extra arguments appended to the native-image invocation
    pub ni_args: Vec<String>,

    /// Print actions as they are performed
    pub verbose: bool,

    /// Keep temporary build files
    pub keep_temp: bool,
}

impl BuildRequest {
    /// Request for a single native binary.
    pub fn native(
        module: PathBuf,
        venv: Option<PathBuf>,
        output: PathBuf,
        size_opt: bool,
        ni_args: Vec<String>,
    ) -> Self {
        Self {
            kind: TargetKind::NativeExecutable,
            module: Some(module),
            venv,
            output,
            size_opt,
            ni_args,
            verbose: false,
            keep_temp: false,
        }
    }

    /// Request for a buildable Java bindings project.
    pub fn java_bindings(module: PathBuf, venv: Option<PathBuf>, output_dir: PathBuf) -> Self {
        Self {
            kind: TargetKind::JavaBindings,
            module: Some(module),
            venv,
            output: output_dir,
            size_opt: false,
            ni_args: Vec::new(),
            verbose: false,
            keep_temp: false,
        }
    }

    /// Request for a polyglot application skeleton.
    pub fn polyglot_app(output_dir: PathBuf) -> Self {
        Self {
            kind: TargetKind::PolyglotApp,
            module: None,
            venv: None,
            output: output_dir,
            size_opt: false,
            ni_args: Vec::new(),
            verbose: false,
            keep_temp: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn keep_temp(mut self, keep_temp: bool) -> Self {
        self.keep_temp = keep_temp;
        self
    }

    /// Validate the request before any side effect is performed.
    ///
    /// Rejects a pre-existing output location and, for directory modules,
    /// an output location nested inside the module directory (the bundler
    /// would otherwise recursively include its own output).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.exists() {
            return Err(ConfigError::OutputExists(self.output.clone()));
        }

        match self.kind {
            TargetKind::NativeExecutable | TargetKind::JavaBindings => {
                let module = self.module.as_ref().ok_or(ConfigError::MissingModule)?;
                if !module.exists() {
                    return Err(ConfigError::ModuleNotFound(module.clone()));
                }
                if module.is_dir() {
                    let module_abs = absolutize(module)?;
                    let output_abs = absolutize(&self.output)?;
                    if output_abs.starts_with(&module_abs) {
                        return Err(ConfigError::OutputInsideModule {
                            output: self.output.clone(),
                            module: module.clone(),
                        });
                    }
                }
            }
            TargetKind::PolyglotApp => {}
        }

        Ok(())
    }
}

/// Make a path absolute against the current working directory.
pub fn absolutize(path: &Path) -> Result<PathBuf, std::io::Error> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Pinned versions threaded through one run
#[derive(Debug, Clone)]
pub struct Versions {
    /// Version of the GraalPy runtime distribution to fetch
    pub graalpy: String,

    /// JDK version used to compute the GraalVM download URL
    pub jdk: String,

    /// Custom package registry for the runtime fetch
    pub registry: Option<String>,
}

impl Versions {
    /// Resolve versions from the environment, falling back to the pins.
    ///
    /// `MVN_GRAALPY_VERSION` overrides the runtime distribution version,
    /// `GRAALVM_JDK_VERSION` the JDK version, and `MVN_REPOSITORY` names a
    /// custom registry.
    pub fn from_env() -> Self {
        Self {
            graalpy: env::var("MVN_GRAALPY_VERSION")
                .unwrap_or_else(|_| DEFAULT_GRAALPY_VERSION.to_string()),
            jdk: env::var("GRAALVM_JDK_VERSION")
                .unwrap_or_else(|_| DEFAULT_JDK_VERSION.to_string()),
            registry: env::var("MVN_REPOSITORY").ok(),
        }
    }
}

impl Default for Versions {
    fn default() -> Self {
        Self {
            graalpy: DEFAULT_GRAALPY_VERSION.to_string(),
            jdk: DEFAULT_JDK_VERSION.to_string(),
            registry: None,
        }
    }
}

/// Resolved GraalPy installation the bundled runtime is taken from
#[derive(Debug, Clone)]
pub struct GraalPyHome {
    home: PathBuf,
}

impl GraalPyHome {
    /// Resolve the installation from `GRAALPY_HOME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = env::var_os("GRAALPY_HOME").ok_or(ConfigError::HomeNotSet)?;
        let home = PathBuf::from(home);
        if !home.is_dir() {
            return Err(ConfigError::HomeNotFound(home));
        }
        Ok(Self { home })
    }

    /// Use an explicit installation root.
    pub fn with_root(home: PathBuf) -> Self {
        Self { home }
    }

    /// Installation root.
    pub fn root(&self) -> &Path {
        &self.home
    }

    /// Native-extension support tree (`lib-graalpython`).
    pub fn capi_home(&self) -> PathBuf {
        self.home.join("lib-graalpython")
    }

    /// Standard library tree (`lib-python/3`).
    pub fn stdlib_home(&self) -> PathBuf {
        self.home.join("lib-python").join("3")
    }

    /// Helper executables shipped with the installation.
    pub fn libexec(&self) -> PathBuf {
        self.home.join("libexec")
    }
}
