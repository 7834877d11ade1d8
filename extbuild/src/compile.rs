//! Hands assembled extension targets to the compiler driver.
//!
//! Compilation itself is delegated to `cc`, which parallelizes across the
//! translation units of a target. This module only feeds it the descriptor
//! and maps its failure into the process exit status; missing dependencies
//! are not pre-validated here.

use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::descriptor::{Extension, Language};
use crate::platform::Platform;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("No sources declared for extension: {0}")]
    NoSources(String),
    #[error(transparent)]
    ToolError(#[from] cc::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Compiles extension targets into static archives under one output
/// directory.
pub struct Builder {
    out_dir: PathBuf,
    cargo_metadata: bool,
}

impl Builder {
    pub fn new(out_dir: &Path) -> Builder {
        Builder {
            out_dir: out_dir.to_path_buf(),
            cargo_metadata: false,
        }
    }

    /// Let `cc` print `cargo:` directives itself. Only wanted when running
    /// inside a build script.
    pub fn cargo_metadata(mut self, enabled: bool) -> Builder {
        self.cargo_metadata = enabled;
        self
    }

    /// Compile one extension target. Returns the path of the produced
    /// archive, named after the module's artifact name.
    pub fn compile(&self, ext: &Extension) -> Result<PathBuf, CompileError> {
        if ext.sources.is_empty() {
            return Err(CompileError::NoSources(ext.name.to_string()));
        }

        let mut build = cc::Build::new();
        build
            .cpp(ext.language == Language::Cpp)
            .warnings(false)
            .out_dir(&self.out_dir)
            .cargo_metadata(self.cargo_metadata);

        for dir in &ext.include_dirs {
            build.include(dir);
        }
        for flag in &ext.extra_compile_args {
            build.flag(flag);
        }
        for src in &ext.sources {
            build.file(src);
        }
        for obj in &ext.extra_objects {
            build.object(obj);
        }

        debug!("compiling {} from {} sources", ext.name, ext.sources.len());
        build.try_compile(ext.name.artifact_name())?;

        let artifact = self.out_dir.join(ext.name.artifact_file_name());
        info!("{} -> {}", ext.name, artifact.display());
        Ok(artifact)
    }
}

/// Link and rebuild-tracking directives for a target, in the form a build
/// script prints them.
pub fn cargo_directives(ext: &Extension) -> Vec<String> {
    let mut lines = vec![];
    for dir in &ext.library_dirs {
        lines.push(format!("cargo:rustc-link-search=native={}", dir.display()));
    }
    for lib in &ext.libraries {
        lines.push(format!("cargo:rustc-link-lib={}", lib));
    }
    for arg in &ext.extra_link_args {
        lines.push(format!("cargo:rustc-link-arg={}", arg));
    }
    for dep in &ext.depends {
        lines.push(format!("cargo:rerun-if-changed={}", dep.display()));
    }
    lines
}

/// `cc` expects the cargo build-script environment. When driven from the
/// command line instead, provide the missing pieces without clobbering an
/// enclosing cargo invocation.
pub fn ensure_build_env(platform: Platform, out_dir: &Path, jobs: u32) {
    let triple = platform.default_target_triple();
    if env::var_os("TARGET").is_none() {
        env::set_var("TARGET", triple);
    }
    if env::var_os("HOST").is_none() {
        env::set_var("HOST", triple);
    }
    if env::var_os("OPT_LEVEL").is_none() {
        env::set_var("OPT_LEVEL", "2");
    }
    if env::var_os("OUT_DIR").is_none() {
        env::set_var("OUT_DIR", out_dir);
    }
    env::set_var("NUM_JOBS", jobs.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleName;
    use serial_test::serial;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("extbuild-compile-tests").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn extension(name: &str) -> Extension {
        Extension {
            name: name.parse::<ModuleName>().unwrap(),
            sources: vec![],
            include_dirs: vec![],
            library_dirs: vec![],
            libraries: vec![],
            extra_objects: vec![],
            extra_compile_args: vec![],
            extra_link_args: vec![],
            depends: vec![],
            language: Language::C,
        }
    }

    #[test]
    fn test_compile_without_sources() {
        let out_dir = scratch("no-sources");
        let ext = extension("pupil_detectors.detector_base");

        match Builder::new(&out_dir).compile(&ext) {
            Err(CompileError::NoSources(name)) => {
                assert_eq!(name, "pupil_detectors.detector_base")
            }
            _ => panic!("Should have failed."),
        }
    }

    #[test]
    fn test_cargo_directives() {
        let mut ext = extension("pupil_detectors.detector_2d.detector_2d");
        ext.library_dirs = vec![PathBuf::from("/usr/local/lib")];
        ext.libraries = vec!["ceres".to_string(), "opencv_core".to_string()];
        ext.extra_link_args = vec!["-Wl,-R/usr/local/lib".to_string()];
        ext.depends = vec![PathBuf::from("singleeyefitter/utils.h")];

        assert_eq!(
            cargo_directives(&ext),
            vec![
                "cargo:rustc-link-search=native=/usr/local/lib",
                "cargo:rustc-link-lib=ceres",
                "cargo:rustc-link-lib=opencv_core",
                "cargo:rustc-link-arg=-Wl,-R/usr/local/lib",
                "cargo:rerun-if-changed=singleeyefitter/utils.h",
            ]
        );
    }

    #[test]
    #[serial]
    fn test_compile_produces_named_artifact() {
        let src_dir = scratch("probe-src");
        let out_dir = scratch("probe-out");
        let src = src_dir.join("probe.c");
        fs::write(&src, b"int extbuild_probe_marker(void) { return 42; }\n").unwrap();

        ensure_build_env(Platform::host(), &out_dir, 1);

        let mut ext = extension("pupil_detectors.probe");
        ext.sources = vec![src];

        let artifact = Builder::new(&out_dir).compile(&ext).unwrap();
        assert_eq!(artifact, out_dir.join("libprobe.a"));
        assert!(artifact.is_file());
    }

    #[test]
    #[serial]
    fn test_ensure_build_env_respects_existing() {
        let out_dir = scratch("env");

        env::set_var("TARGET", "riscv64gc-unknown-linux-gnu");
        ensure_build_env(Platform::Linux, &out_dir, 8);
        assert_eq!(env::var("TARGET").unwrap(), "riscv64gc-unknown-linux-gnu");
        assert_eq!(env::var("NUM_JOBS").unwrap(), "8");
        env::remove_var("TARGET");
    }
}
