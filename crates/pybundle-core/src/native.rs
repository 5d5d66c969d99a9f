//! Native executable build orchestration
//!
//! Drives the linear pipeline for the `native` target: resolve the
//! toolchain, fetch the runtime jars, stage resources, render the
//! generated sources, snapshot the manifest, compile, and link. No
//! stage retries and no stage is skipped on failure; every error
//! unwinds through the staging guard.

use crate::config::{
    absolutize, BuildRequest, ConfigError, GraalPyHome, Versions, FILES_LIST_NAME, LAUNCHER_CLASS,
    LAUNCHER_FILE, MODULE_INFO_FILE, MODULE_NAME, NATIVE_EXEC_JAVA_PKG,
    NATIVE_IMAGE_RESOURCES_FILE, VFS_JAVA_FILE, VFS_PREFIX,
};
use crate::staging::StagingDir;
use crate::toolchain::Toolchain;
use crate::{bundler, manifest, template, toolchain, BuildError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Feature modules enabled in the AOT image.
const ADD_MODULES: &str = "standalone,org.graalvm.llvm.nativemode.resources,org.graalvm.py.resources";

/// Separator joining module-path entries.
const MODULE_PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// Build a single self-contained native binary.
///
/// Returns the absolute path of the produced executable.
pub fn build_native(
    request: &BuildRequest,
    home: &GraalPyHome,
    versions: &Versions,
) -> Result<PathBuf, BuildError> {
    request.validate()?;
    let output = absolutize(&request.output)?;

    let staging = StagingDir::new()?;
    let outcome = run_pipeline(request, home, versions, staging.path(), &output);

    if request.keep_temp {
        let kept = staging.keep();
        println!("Temporary build files kept at {}", kept.display());
    }

    outcome?;
    Ok(output)
}

fn run_pipeline(
    request: &BuildRequest,
    home: &GraalPyHome,
    versions: &Versions,
    staging: &Path,
    output: &Path,
) -> Result<(), BuildError> {
    let module = request.module.as_deref().ok_or(ConfigError::MissingModule)?;

    let tools = toolchain::resolve(versions, staging, request.verbose)?;
    toolchain::fetch_runtime(home, versions, &tools.modules_dir, request.verbose)?;

    if request.verbose {
        println!("Bundling Python resources into {}", staging.display());
    }
    bundler::stage_resources(staging, home, module, request.venv.as_deref())?;
    render_sources(staging)?;

    let vfs_root = staging.join(VFS_PREFIX);
    let files_list = manifest::generate(&vfs_root)?;
    files_list.write(&vfs_root.join(FILES_LIST_NAME))?;

    compile_sources(&tools, staging, versions, request.verbose)?;
    link_binary(&tools, staging, request, output)
}

/// Render the launcher, filesystem accessor, module descriptor, and
/// resource configuration into the staging root.
fn render_sources(staging: &Path) -> Result<(), BuildError> {
    let module_dir = staging.join(MODULE_NAME);

    template::render_to_file(
        template::LAUNCHER_JAVA,
        &module_dir.join(LAUNCHER_FILE),
        &template::launcher_tokens(NATIVE_EXEC_JAVA_PKG),
    )?;
    template::render_to_file(
        template::VFS_JAVA,
        &module_dir.join(VFS_JAVA_FILE),
        &template::vfs_file_tokens(NATIVE_EXEC_JAVA_PKG),
    )?;
    template::render_to_file(
        template::MODULE_INFO,
        &staging.join(MODULE_INFO_FILE),
        &[],
    )?;
    template::render_to_file(
        template::NATIVE_IMAGE_RESOURCES,
        &staging.join(NATIVE_IMAGE_RESOURCES_FILE),
        &template::resources_tokens(),
    )?;
    Ok(())
}

fn compile_sources(
    tools: &Toolchain,
    staging: &Path,
    versions: &Versions,
    verbose: bool,
) -> Result<(), BuildError> {
    let polyglot_jar = tools.modules_dir.join(format!(
        "org.graalvm.polyglot-polyglot-{}.jar",
        versions.graalpy
    ));

    let mut cmd = Command::new(&tools.javac);
    cmd.current_dir(staging)
        .arg("--module-path")
        .arg(&polyglot_jar)
        .arg(MODULE_INFO_FILE)
        .arg(Path::new(MODULE_NAME).join(VFS_JAVA_FILE))
        .arg(Path::new(MODULE_NAME).join(LAUNCHER_FILE));

    if verbose {
        println!("Compiling standalone entry point: {:?}", cmd);
    }
    run_tool(cmd, "javac", verbose)
}

fn link_binary(
    tools: &Toolchain,
    staging: &Path,
    request: &BuildRequest,
    output: &Path,
) -> Result<(), BuildError> {
    let module_path = module_path_of(&tools.modules_dir)?;

    let mut cmd = Command::new(&tools.native_image);
    cmd.current_dir(staging)
        .arg("--module-path")
        .arg(&module_path)
        .arg("--add-modules")
        .arg(ADD_MODULES);
    for arg in &request.ni_args {
        cmd.arg(arg);
    }
    if request.size_opt {
        cmd.arg("-Dtruffle.TruffleRuntime=com.oracle.truffle.api.impl.DefaultTruffleRuntime")
            .arg("-Dpolyglot.engine.WarnInterpreterOnly=false");
    }
    cmd.arg("--no-fallback")
        .arg("-H:-CopyLanguageResources")
        .arg(format!(
            "-H:ResourceConfigurationFiles={}",
            NATIVE_IMAGE_RESOURCES_FILE
        ))
        .arg("-o")
        .arg(output)
        .arg(format!("{}.{}", MODULE_NAME, LAUNCHER_CLASS));

    if request.verbose {
        println!("Building Python standalone binary: {:?}", cmd);
    }
    run_tool(cmd, "native-image", request.verbose)
}

/// Enumerate every jar in the module directory, joined for the compiler
/// module path; the staging root itself is appended for the compiled
/// launcher classes.
fn module_path_of(modules_dir: &Path) -> Result<String, BuildError> {
    let mut jars: Vec<String> = Vec::new();
    for entry in fs::read_dir(modules_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "jar") {
            jars.push(path.to_string_lossy().into_owned());
        }
    }
    jars.sort();
    jars.push(".".to_string());
    Ok(jars.join(MODULE_PATH_SEPARATOR))
}

fn run_tool(mut cmd: Command, tool: &str, verbose: bool) -> Result<(), BuildError> {
    let output = cmd.output().map_err(|source| BuildError::SpawnError {
        tool: tool.to_string(),
        source,
    })?;

    if verbose || !output.status.success() {
        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }
    if !output.status.success() {
        return Err(BuildError::ChildProcessError {
            tool: tool.to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}
