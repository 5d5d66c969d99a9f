//! Compiler toolchain resolution
//!
//! Locates or downloads the GraalVM toolchain (javac + native-image) for
//! one build run, and fetches the Python runtime jars the launcher links
//! against. Nothing is cached across runs.

use crate::config::{GraalPyHome, Versions, GRAALVM_URL_BASE, PYTHON_ARTIFACT_ID};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

/// Name of the runtime-distribution fetch tool under `libexec`.
pub const POLYGLOT_GET_TOOL: &str = "graalpy-polyglot-get";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while resolving the toolchain
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Host OS family has no GraalVM distribution
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Host CPU architecture has no GraalVM distribution
    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),

    /// Archive download failed at the transport level
    #[error("Failed to download from {url}: {source}")]
    DownloadError {
        url: String,
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("Download of {url} failed with HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    /// Archive could not be unpacked
    #[error("Failed to extract toolchain archive: {0}")]
    ExtractError(String),

    /// GRAALVM_HOME lacks the required executables
    #[error(
        "GRAALVM_HOME has no native-image or javac: expected {} and {}; \
         point it to a GraalVM installation that provides both",
        .native_image.display(), .javac.display()
    )]
    MissingInstalledTools { native_image: PathBuf, javac: PathBuf },

    /// Downloaded archive lacks the required executables
    #[error("GraalVM downloaded from {url} has no native-image or javac")]
    MissingDownloadedTools { url: String },

    /// Runtime-distribution fetch tool is absent from the installation
    #[error("Runtime fetch tool not found: {}", .0.display())]
    FetchToolNotFound(PathBuf),

    /// Runtime-distribution fetch tool exited nonzero
    #[error("Runtime distribution fetch exited with status {code}")]
    FetchFailed { code: i32 },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Resolved compiler locations plus the module search directory
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// `javac` executable
    pub javac: PathBuf,

    /// `native-image` executable
    pub native_image: PathBuf,

    /// Directory holding the runtime jars the launcher links against
    pub modules_dir: PathBuf,
}

/// Probe for an executable, trying the bare name plus the Windows
/// launcher suffixes.
pub fn find_executable(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    for suffix in ["exe", "cmd"] {
        let candidate = base.with_extension(suffix);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Compute the GraalVM archive URL for an OS family and architecture.
///
/// The JDK version is an explicit parameter; its major component selects
/// the release directory.
pub fn download_url_for(jdk_version: &str, os: &str, arch: &str) -> Result<String, ToolchainError> {
    let major = jdk_version.split('.').next().unwrap_or(jdk_version);

    let (system, suffix) = match os {
        "linux" => ("linux", "tar.gz"),
        "macos" => ("macos", "tar.gz"),
        "windows" => ("windows", "zip"),
        other => return Err(ToolchainError::UnsupportedPlatform(other.to_string())),
    };

    let machine = match arch {
        "x86_64" => "x64",
        "aarch64" => "aarch64",
        other => return Err(ToolchainError::UnsupportedArch(other.to_string())),
    };

    Ok(format!(
        "{}{}/archive/graalvm-jdk-{}_{}-{}_bin.{}",
        GRAALVM_URL_BASE, major, jdk_version, system, machine, suffix
    ))
}

/// Compute the GraalVM archive URL for the host platform.
pub fn graalvm_download_url(jdk_version: &str) -> Result<String, ToolchainError> {
    download_url_for(jdk_version, std::env::consts::OS, std::env::consts::ARCH)
}

/// Resolve the toolchain for one run.
///
/// A `GRAALVM_HOME` override names an existing installation; otherwise
/// the platform archive is downloaded into the staging area and
/// extracted there.
pub fn resolve(
    versions: &Versions,
    staging_root: &Path,
    verbose: bool,
) -> Result<Toolchain, ToolchainError> {
    let (graalvm_home, modules_dir, download_url) = match std::env::var_os("GRAALVM_HOME") {
        Some(home) => (PathBuf::from(home), staging_root.join("modules"), None),
        None => {
            let modules_dir = staging_root.join("lib");
            fs::create_dir_all(&modules_dir)?;

            let url = graalvm_download_url(&versions.jdk)?;
            let archive_name = url.rsplit('/').next().unwrap_or("graalvm-archive");
            let archive_path = modules_dir.join(archive_name);
            if verbose {
                println!("downloading {} to {}", url, archive_path.display());
            }
            let bytes = download(&url)?;
            fs::write(&archive_path, &bytes)?;

            let first_member = if url.ends_with(".zip") {
                extract_zip(&bytes, &modules_dir)?
            } else {
                extract_tar_gz(&bytes, &modules_dir)?
            };
            let top_level = first_member
                .split('/')
                .next()
                .unwrap_or(first_member.as_str());

            let graalvm_dir = modules_dir.join(top_level);
            let home = if cfg!(target_os = "macos") {
                graalvm_dir.join("Contents").join("Home")
            } else {
                graalvm_dir
            };
            (home, modules_dir, Some(url))
        }
    };
    fs::create_dir_all(&modules_dir)?;

    let native_image_base = graalvm_home.join("bin").join("native-image");
    let javac_base = graalvm_home.join("bin").join("javac");
    let native_image = find_executable(&native_image_base);
    let javac = find_executable(&javac_base);

    if verbose {
        println!("using GraalVM at {}", graalvm_home.display());
        println!("  native-image: {:?}", native_image);
        println!("  javac: {:?}", javac);
    }

    match (native_image, javac) {
        (Some(native_image), Some(javac)) => Ok(Toolchain {
            javac,
            native_image,
            modules_dir,
        }),
        _ => match download_url {
            Some(url) => Err(ToolchainError::MissingDownloadedTools { url }),
            None => Err(ToolchainError::MissingInstalledTools {
                native_image: native_image_base,
                javac: javac_base,
            }),
        },
    }
}

/// Fetch the Python runtime jars into the module directory.
///
/// Runs the fetch tool shipped with the GraalPy installation; a nonzero
/// exit surfaces the captured output and aborts the build.
pub fn fetch_runtime(
    home: &GraalPyHome,
    versions: &Versions,
    modules_dir: &Path,
    verbose: bool,
) -> Result<(), ToolchainError> {
    let tool_base = home.libexec().join(POLYGLOT_GET_TOOL);
    let tool =
        find_executable(&tool_base).ok_or(ToolchainError::FetchToolNotFound(tool_base))?;

    let mut cmd = Command::new(&tool);
    if let Some(registry) = &versions.registry {
        cmd.arg("-r").arg(registry);
    }
    cmd.arg("-a")
        .arg(PYTHON_ARTIFACT_ID)
        .arg("-v")
        .arg(&versions.graalpy)
        .arg("-o")
        .arg(modules_dir);

    if verbose {
        println!("fetching Python runtime distribution: {:?}", cmd);
    }

    let output = cmd.output()?;
    if verbose || !output.status.success() {
        print!("{}", String::from_utf8_lossy(&output.stdout));
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }
    if !output.status.success() {
        return Err(ToolchainError::FetchFailed {
            code: output.status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

fn download(url: &str) -> Result<Vec<u8>, ToolchainError> {
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("pybundle/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| ToolchainError::DownloadError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| ToolchainError::DownloadError {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolchainError::DownloadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .map_err(|source| ToolchainError::DownloadError {
            url: url.to_string(),
            source,
        })?;
    Ok(bytes.to_vec())
}

fn extract_tar_gz(bytes: &[u8], dest: &Path) -> Result<String, ToolchainError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let first_member = {
        let mut entries = archive
            .entries()
            .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
        let entry = entries
            .next()
            .ok_or_else(|| ToolchainError::ExtractError("empty archive".to_string()))?
            .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
        entry
            .path()
            .map_err(|e| ToolchainError::ExtractError(e.to_string()))?
            .to_string_lossy()
            .into_owned()
    };

    // entries() consumed the reader position; unpack from a fresh pass
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    archive
        .unpack(dest)
        .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
    Ok(first_member)
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<String, ToolchainError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
    let first_member = {
        let file = archive
            .by_index(0)
            .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
        file.name().to_string()
    };
    archive
        .extract(dest)
        .map_err(|e| ToolchainError::ExtractError(e.to_string()))?;
    Ok(first_member)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_linux_x64() {
        let url = download_url_for("17.0.7", "linux", "x86_64").unwrap();
        assert_eq!(
            url,
            "https://download.oracle.com/graalvm/17/archive/graalvm-jdk-17.0.7_linux-x64_bin.tar.gz"
        );
    }

    #[test]
    fn test_download_url_macos_aarch64() {
        let url = download_url_for("21.0.1", "macos", "aarch64").unwrap();
        assert_eq!(
            url,
            "https://download.oracle.com/graalvm/21/archive/graalvm-jdk-21.0.1_macos-aarch64_bin.tar.gz"
        );
    }

    #[test]
    fn test_download_url_windows_uses_zip() {
        let url = download_url_for("17.0.7", "windows", "x86_64").unwrap();
        assert!(url.ends_with("graalvm-jdk-17.0.7_windows-x64_bin.zip"));
    }

    #[test]
    fn test_download_url_major_only_version() {
        let url = download_url_for("21", "linux", "aarch64").unwrap();
        assert!(url.contains("/graalvm/21/archive/"));
        assert!(url.contains("graalvm-jdk-21_linux-aarch64_bin.tar.gz"));
    }

    #[test]
    fn test_download_url_rejects_unknown_platform() {
        let result = download_url_for("17.0.7", "plan9", "x86_64");
        assert!(matches!(result, Err(ToolchainError::UnsupportedPlatform(_))));
    }

    #[test]
    fn test_download_url_rejects_unknown_arch() {
        let result = download_url_for("17.0.7", "linux", "riscv64");
        assert!(matches!(result, Err(ToolchainError::UnsupportedArch(_))));
    }

    #[test]
    fn test_find_executable_plain_file() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tmp.path().join("javac");
        fs::write(&tool, "").unwrap();
        assert_eq!(find_executable(&tool), Some(tool));
    }

    #[test]
    fn test_find_executable_probes_suffixes() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = tmp.path().join("native-image");
        fs::write(tool.with_extension("cmd"), "").unwrap();
        assert_eq!(find_executable(&tool), Some(tool.with_extension("cmd")));
    }

    #[test]
    fn test_find_executable_missing() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_executable(&tmp.path().join("nope")), None);
    }

    #[test]
    fn test_extract_tar_gz_reports_first_member() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        let data = b"hello";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "graalvm-jdk-17/README", &data[..])
            .unwrap();
        let mut encoder = builder.into_inner().unwrap();
        encoder.flush().unwrap();
        let bytes = encoder.finish().unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let first = extract_tar_gz(&bytes, tmp.path()).unwrap();
        assert_eq!(first, "graalvm-jdk-17/README");
        assert!(tmp.path().join("graalvm-jdk-17/README").is_file());
    }
}
