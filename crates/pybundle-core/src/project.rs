//! Buildable project generation
//!
//! The two project-producing targets share the staging and manifest
//! utilities with the native pipeline but write into a persistent
//! output directory laid out as a Maven project: build descriptor at
//! the root, sources under `src/main/java`, staged resources under
//! `src/main/resources`.

use crate::config::{
    BuildRequest, ConfigError, GraalPyHome, Versions, FILES_LIST_NAME, LAUNCHER_FILE,
    MODULE_INFO_FILE, MODULE_NAME, MVN_CODE_PREFIX, MVN_RESOURCE_PREFIX,
    NATIVE_EXEC_JAVA_PKG, NATIVE_IMAGE_PROXY_CONF_FILE, NATIVE_IMAGE_RESOURCES_FILE,
    POLYGLOT_APP_JAVA_PKG, POLYGLOT_APP_LAUNCHER_FILE, VFS_JAVA_FILE, VFS_PREFIX,
};
use crate::{bundler, manifest, template, BuildError};
use std::path::Path;

/// Generate a buildable Java bindings project embedding the Python code.
pub fn create_java_bindings(
    request: &BuildRequest,
    home: &GraalPyHome,
    versions: &Versions,
) -> Result<(), BuildError> {
    request.validate()?;
    let module = request.module.as_deref().ok_or(ConfigError::MissingModule)?;
    let target = &request.output;

    if request.verbose {
        println!(
            "Creating Java bindings project in {}",
            target.display()
        );
    }

    let resource_root = target.join(MVN_RESOURCE_PREFIX);
    bundler::stage_resources(&resource_root, home, module, request.venv.as_deref())?;

    let code_root = target.join(MVN_CODE_PREFIX);
    template::render_to_file(
        template::LAUNCHER_JAVA,
        &code_root.join(LAUNCHER_FILE),
        &template::launcher_tokens(NATIVE_EXEC_JAVA_PKG),
    )?;
    template::render_to_file(
        template::VFS_JAVA,
        &code_root.join(MODULE_NAME).join(VFS_JAVA_FILE),
        &template::vfs_file_tokens(NATIVE_EXEC_JAVA_PKG),
    )?;
    template::render_to_file(template::MODULE_INFO, &target.join(MODULE_INFO_FILE), &[])?;
    template::render_to_file(
        template::NATIVE_IMAGE_RESOURCES,
        &target.join(NATIVE_IMAGE_RESOURCES_FILE),
        &template::resources_tokens(),
    )?;
    template::render_to_file(
        template::JAVA_BINDINGS_POM,
        &target.join("pom.xml"),
        &template::pom_tokens(versions),
    )?;

    write_manifest(&resource_root)
}

/// Generate a polyglot Java/Python application skeleton.
pub fn create_polyglot_app(
    request: &BuildRequest,
    home: &GraalPyHome,
    versions: &Versions,
) -> Result<(), BuildError> {
    request.validate()?;
    let target = &request.output;

    if request.verbose {
        println!(
            "Creating polyglot Java/Python application in {}",
            target.display()
        );
    }

    let pkg_dir = target
        .join(MVN_CODE_PREFIX)
        .join("com")
        .join("mycompany")
        .join("javapython");
    template::render_to_file(
        template::VFS_JAVA,
        &pkg_dir.join(VFS_JAVA_FILE),
        &template::vfs_file_tokens(POLYGLOT_APP_JAVA_PKG),
    )?;
    template::render_to_file(
        template::POLYGLOT_MAIN_JAVA,
        &pkg_dir.join(POLYGLOT_APP_LAUNCHER_FILE),
        &template::launcher_tokens(POLYGLOT_APP_JAVA_PKG),
    )?;
    template::render_to_file(
        template::MODULE_INFO,
        &target.join(MVN_CODE_PREFIX).join(MODULE_INFO_FILE),
        &[],
    )?;

    let resource_root = target.join(MVN_RESOURCE_PREFIX);
    bundler::stage_python_home(&resource_root, home)?;

    template::render_to_file(
        template::NATIVE_IMAGE_RESOURCES,
        &target.join(NATIVE_IMAGE_RESOURCES_FILE),
        &template::resources_tokens(),
    )?;
    template::render_to_file(
        template::NATIVE_IMAGE_PROXY_CONF,
        &target.join(NATIVE_IMAGE_PROXY_CONF_FILE),
        &[],
    )?;
    template::render_to_file(
        template::POLYGLOT_APP_POM,
        &target.join("pom.xml"),
        &template::pom_tokens(versions),
    )?;

    write_manifest(&resource_root)
}

fn write_manifest(resource_root: &Path) -> Result<(), BuildError> {
    let vfs_root = resource_root.join(VFS_PREFIX);
    let files_list = manifest::generate(&vfs_root)?;
    files_list.write(&vfs_root.join(FILES_LIST_NAME))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fake_home(root: &Path) -> GraalPyHome {
        write(&root.join("lib-graalpython").join("_sysconfig.py"), "x");
        write(
            &root.join("lib-python").join("3").join("os.py"),
            "x",
        );
        GraalPyHome::with_root(root.to_path_buf())
    }

    #[test]
    fn test_java_bindings_project_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let home = fake_home(&tmp.path().join("graalpy"));
        let module = tmp.path().join("app.py");
        fs::write(&module, "print('hi')\n").unwrap();

        let target = tmp.path().join("project");
        let request = BuildRequest::java_bindings(module, None, target.clone());
        create_java_bindings(&request, &home, &Versions::default()).unwrap();

        assert!(target.join("pom.xml").is_file());
        assert!(target.join(MODULE_INFO_FILE).is_file());
        assert!(target.join(NATIVE_IMAGE_RESOURCES_FILE).is_file());
        assert!(target.join("src/main/java/Py2BinLauncher.java").is_file());
        assert!(target
            .join("src/main/java/standalone/VirtualFileSystem.java")
            .is_file());
        assert!(target
            .join("src/main/resources/vfs/proj/__main__.py")
            .is_file());
        assert!(target
            .join("src/main/resources/vfs/fileslist.txt")
            .is_file());

        let pom = fs::read_to_string(target.join("pom.xml")).unwrap();
        assert!(!pom.contains("{graal-sdk-version}"));

        let launcher =
            fs::read_to_string(target.join("src/main/java/Py2BinLauncher.java")).unwrap();
        assert!(launcher.contains("package standalone;"));
    }

    #[test]
    fn test_polyglot_app_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let home = fake_home(&tmp.path().join("graalpy"));

        let target = tmp.path().join("app-project");
        let request = BuildRequest::polyglot_app(target.clone());
        create_polyglot_app(&request, &home, &Versions::default()).unwrap();

        assert!(target.join("pom.xml").is_file());
        assert!(target.join(NATIVE_IMAGE_PROXY_CONF_FILE).is_file());
        assert!(target
            .join("src/main/java/com/mycompany/javapython/Main.java")
            .is_file());
        assert!(target
            .join("src/main/java/com/mycompany/javapython/VirtualFileSystem.java")
            .is_file());
        assert!(target
            .join("src/main/resources/vfs/home/lib-python/3/os.py")
            .is_file());

        let vfs = fs::read_to_string(
            target.join("src/main/java/com/mycompany/javapython/VirtualFileSystem.java"),
        )
        .unwrap();
        assert!(vfs.contains("package com.mycompany.javapython;"));
    }

    #[test]
    fn test_rejects_existing_output_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let home = fake_home(&tmp.path().join("graalpy"));
        let module = tmp.path().join("app.py");
        fs::write(&module, "").unwrap();

        let target = tmp.path().join("existing");
        fs::create_dir(&target).unwrap();
        let request = BuildRequest::java_bindings(module, None, target.clone());
        let result = create_java_bindings(&request, &home, &Versions::default());
        assert!(result.is_err());
        // validation happens before any mutation
        assert!(!target.join("pom.xml").exists());
    }

    #[test]
    fn test_manifest_covers_staged_resources() {
        let tmp = tempfile::tempdir().unwrap();
        let home = fake_home(&tmp.path().join("graalpy"));
        let module: PathBuf = tmp.path().join("app.py");
        fs::write(&module, "print('hi')\n").unwrap();

        let target = tmp.path().join("project");
        let request = BuildRequest::java_bindings(module, None, target.clone());
        create_java_bindings(&request, &home, &Versions::default()).unwrap();

        let listing =
            fs::read_to_string(target.join("src/main/resources/vfs/fileslist.txt")).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "vfs/");
        assert!(lines.contains(&"vfs/proj/__main__.py"));
        assert!(lines.contains(&"vfs/home/"));
    }
}
