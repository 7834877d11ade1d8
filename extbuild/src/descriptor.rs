//! Declarative build targets for the native extension.
//!
//! An [`Extension`] binds a source group, include paths, library names, and
//! compiler flags into one named target, mirroring the record the build
//! driver consumes. Targets are declared in a `build.toml` manifest and bound
//! to the resolved dependency configuration at assembly time.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::platform::Platform;
use crate::probe::ResolvedDeps;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Cannot parse extension module name from: {0}")]
    InvalidModuleName(String),
    #[error("No sources declared for extension: {0}")]
    NoSources(String),
    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Dotted module path of an extension, e.g.
/// `pupil_detectors.detector_2d.detector_2d`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleName(String);

impl ModuleName {
    /// Final path segment, used as the artifact and link name.
    pub fn artifact_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap()
    }

    /// Directory the artifact lives in, derived from the dotted prefix.
    pub fn package_dir(&self) -> PathBuf {
        let segments: Vec<&str> = self.0.split('.').collect();
        segments[..segments.len() - 1].iter().copied().collect()
    }

    /// File name of the static archive the compiler driver produces.
    pub fn artifact_file_name(&self) -> String {
        format!("lib{}.a", self.artifact_name())
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModuleName {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<ModuleName, DescriptorError> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
        }
        if RE.is_match(s) {
            Ok(ModuleName(s.to_string()))
        } else {
            Err(DescriptorError::InvalidModuleName(s.to_string()))
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum Language {
    #[serde(rename = "c")]
    C,
    #[serde(rename = "c++", alias = "cpp")]
    Cpp,
}

impl Default for Language {
    fn default() -> Language {
        Language::Cpp
    }
}

/// One named build target: a declarative record, no behavior.
#[derive(Clone, Debug)]
pub struct Extension {
    pub name: ModuleName,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_objects: Vec<PathBuf>,
    pub extra_compile_args: Vec<String>,
    pub extra_link_args: Vec<String>,
    pub depends: Vec<PathBuf>,
    pub language: Language,
}

/// Compiler flags shared by every extension target.
pub fn common_compile_args(platform: Platform) -> Vec<String> {
    let mut args: Vec<String> = ["-D_USE_MATH_DEFINES", "-std=c++11", "-w", "-O2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if platform == Platform::Windows {
        // Works around MSVC aligned storage breakage in the detector core,
        // see pupil-labs/pupil#1331.
        args.push("-D_ENABLE_EXTENDED_ALIGNED_STORAGE".to_string());
    }
    args
}

/// Walk a source tree and collect every `.h` header, so that header changes
/// retrigger compilation of the extensions that include them.
pub fn collect_headers(root: &Path) -> Vec<PathBuf> {
    let mut headers = vec![];
    walk_headers(root, &mut headers);
    headers.sort();
    headers
}

fn walk_headers(dir: &Path, headers: &mut Vec<PathBuf>) {
    // An unreadable directory is skipped, same as a missing install prefix.
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_headers(&path, headers);
        } else if path.extension().map_or(false, |ext| ext == "h") {
            headers.push(path);
        }
    }
}

/// Extension target as declared in `build.toml`.
#[derive(Debug, Deserialize)]
pub struct ExtensionSpec {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
    #[serde(default)]
    pub depends_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
}

/// The `build.toml` manifest: package metadata plus the extension targets.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub package: Package,
    #[serde(default, rename = "extension")]
    pub extensions: Vec<ExtensionSpec>,
}

impl Manifest {
    pub fn from_str(s: &str) -> Result<Manifest, DescriptorError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Manifest, DescriptorError> {
        Manifest::from_str(&fs::read_to_string(path)?)
    }

    /// Bind every declared target to the resolved dependency configuration.
    ///
    /// Each target must carry a source group; everything else (dirs, libs,
    /// flags) is merged in from the platform tables.
    pub fn extensions(
        &self,
        platform: Platform,
        deps: &ResolvedDeps,
    ) -> Result<Vec<Extension>, DescriptorError> {
        let mut extensions = vec![];
        for spec in &self.extensions {
            let name: ModuleName = spec.name.parse()?;
            if spec.sources.is_empty() {
                return Err(DescriptorError::NoSources(spec.name.clone()));
            }

            let mut include_dirs = deps.include_dirs.clone();
            include_dirs.extend(spec.include_dirs.iter().cloned());

            let mut libraries = deps.libraries.clone();
            libraries.extend(spec.libraries.iter().cloned());

            let mut extra_compile_args = common_compile_args(platform);
            extra_compile_args.extend(spec.extra_compile_args.iter().cloned());

            let depends = spec
                .depends_dirs
                .iter()
                .flat_map(|dir| collect_headers(dir))
                .collect();

            extensions.push(Extension {
                name,
                sources: spec.sources.clone(),
                include_dirs,
                library_dirs: deps.library_dirs.clone(),
                libraries,
                extra_objects: deps.extra_objects.clone(),
                extra_compile_args,
                extra_link_args: spec.extra_link_args.clone(),
                depends,
                language: spec.language,
            });
        }
        Ok(extensions)
    }
}
