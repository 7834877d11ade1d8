//! Locates the native dependencies the detector core links against.
//!
//! Each dependency is probed against a fixed, ordered list of well-known
//! install locations. The first location that exists on disk wins. A
//! dependency that resolves nowhere is simply left out of the configuration
//! and the compiler or linker reports the hard failure later.

use std::env;
use std::path::{Path, PathBuf};

use log::debug;

use crate::platform::Platform;

/// OpenCV 3 split highgui into imgcodecs, videoio, and highgui itself.
pub const OPENCV_LIBRARIES: [&str; 6] = [
    "opencv_core",
    "opencv_highgui",
    "opencv_videoio",
    "opencv_imgcodecs",
    "opencv_imgproc",
    "opencv_video",
];

/// Lib dirs for homebrew installed opencv, oldest brew layout first.
const OPENCV_LIBRARY_DIRS: [&str; 3] = [
    "/usr/local/opt/opencv/lib",
    "/usr/local/opt/opencv@3/lib",
    "/usr/local/lib",
];

const OPENCV_INCLUDE_DIRS: [&str; 3] = [
    "/usr/local/opt/opencv/include",
    "/usr/local/opt/opencv@3/include",
    "/usr/local/include/opencv4",
];

const EIGEN_INCLUDE_DIRS: [&str; 2] = ["/usr/local/include/eigen3", "/usr/include/eigen3"];

/// ROS distributions that shipped their own OpenCV 3 build.
const ROS_DISTS: [&str; 3] = ["kinetic", "jade", "indigo"];

/// Include directory paired with the static library handed to the linker as
/// an extra object. An empty second entry means header-only.
const WINDOWS_LIB_SPEC: [(&str, &str); 5] = [
    (
        "C:\\work\\opencv\\build\\include",
        "C:\\work\\opencv\\build\\x64\\vc14\\lib\\opencv_world345.lib",
    ),
    ("C:\\work\\ceres-windows\\Eigen", ""),
    (
        "C:\\work\\ceres-windows\\ceres-solver\\include",
        "C:\\work\\ceres-windows\\x64\\Release\\ceres_static.lib",
    ),
    (
        "C:\\work\\ceres-windows\\glog\\src\\windows",
        "C:\\work\\ceres-windows\\x64\\Release\\libglog_static.lib",
    ),
    ("C:\\work\\ceres-windows", ""),
];

/// One located native dependency.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NativeLib {
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_objects: Vec<PathBuf>,
}

impl NativeLib {
    pub fn is_empty(&self) -> bool {
        self.include_dirs.is_empty()
            && self.library_dirs.is_empty()
            && self.libraries.is_empty()
            && self.extra_objects.is_empty()
    }
}

impl From<pkg_config::Library> for NativeLib {
    fn from(lib: pkg_config::Library) -> NativeLib {
        NativeLib {
            include_dirs: lib.include_paths,
            library_dirs: lib.link_paths,
            libraries: lib.libs,
            extra_objects: vec![],
        }
    }
}

/// Merged resolution for every dependency of a target set. Directories and
/// library names are deduplicated preserving first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedDeps {
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub extra_objects: Vec<PathBuf>,
}

impl ResolvedDeps {
    pub fn push(&mut self, lib: NativeLib) {
        extend_unique(&mut self.include_dirs, lib.include_dirs);
        extend_unique(&mut self.library_dirs, lib.library_dirs);
        extend_unique(&mut self.libraries, lib.libraries);
        extend_unique(&mut self.extra_objects, lib.extra_objects);
    }
}

fn extend_unique<T: PartialEq>(dst: &mut Vec<T>, src: Vec<T>) {
    for v in src {
        if !dst.contains(&v) {
            dst.push(v);
        }
    }
}

/// Resolve every dependency for the given platform.
pub fn resolve(platform: Platform) -> ResolvedDeps {
    let mut deps = ResolvedDeps::default();
    match platform {
        Platform::Windows => {
            deps.push(windows_lib_spec());
        }
        _ => {
            deps.push(opencv());
            deps.push(eigen());
            deps.push(ceres());
        }
    }
    debug!("resolved native deps: {:#?}", deps);
    deps
}

/// Keep only the candidates that exist on disk, preserving order.
pub fn existing<P: AsRef<Path>>(candidates: &[P]) -> Vec<PathBuf> {
    candidates
        .iter()
        .map(|c| PathBuf::from(c.as_ref()))
        .filter(|p| p.exists())
        .collect()
}

/// First candidate that exists on disk, if any.
pub fn first_existing<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    existing(candidates).into_iter().next()
}

/// An `EXTBUILD_<DEP>_PREFIX` environment variable takes precedence over
/// every probed location.
fn env_prefix(dep: &str) -> Option<PathBuf> {
    let var = format!("EXTBUILD_{}_PREFIX", dep.to_ascii_uppercase());
    env::var_os(var).map(PathBuf::from)
}

fn opencv_core_in(dir: &Path) -> bool {
    dir.join("libopencv_core.so").is_file() || dir.join("libopencv_core.dylib").is_file()
}

/// Locate OpenCV. Probe order: env prefix, pkg-config, homebrew/system
/// prefixes, ROS-shipped builds.
pub fn opencv() -> NativeLib {
    if let Some(prefix) = env_prefix("opencv") {
        let lib_dir = prefix.join("lib");
        if opencv_core_in(&lib_dir) {
            debug!("opencv from EXTBUILD_OPENCV_PREFIX: {}", prefix.display());
            return NativeLib {
                include_dirs: existing(&[prefix.join("include"), prefix.join("include/opencv4")]),
                library_dirs: vec![lib_dir],
                libraries: OPENCV_LIBRARIES.iter().map(|l| l.to_string()).collect(),
                extra_objects: vec![],
            };
        }
    }

    for package in &["opencv4", "opencv"] {
        let mut cfg = pkg_config::Config::new();
        cfg.atleast_version("3.0.0").cargo_metadata(false);
        if let Ok(lib) = cfg.probe(package) {
            debug!("opencv from pkg-config package {}", package);
            return NativeLib::from(lib);
        }
    }

    let core_found = OPENCV_LIBRARY_DIRS
        .iter()
        .any(|d| opencv_core_in(Path::new(d)));
    if core_found {
        return NativeLib {
            include_dirs: existing(&OPENCV_INCLUDE_DIRS),
            library_dirs: existing(&OPENCV_LIBRARY_DIRS),
            libraries: OPENCV_LIBRARIES.iter().map(|l| l.to_string()).collect(),
            extra_objects: vec![],
        };
    }

    ros_opencv().unwrap_or_default()
}

/// OpenCV as shipped by a ROS distribution. Those builds suffix every
/// library name with `3` (e.g. `libopencv_core3.so`).
pub fn ros_opencv() -> Option<NativeLib> {
    ros_opencv_in(Path::new("/opt/ros"))
}

fn ros_opencv_in(root: &Path) -> Option<NativeLib> {
    for dist in &ROS_DISTS {
        let lib_dir = root.join(dist).join("lib");
        if lib_dir.join("libopencv_core3.so").is_file() {
            debug!("opencv from ROS dist {}", dist);
            return Some(NativeLib {
                include_dirs: vec![root.join(dist).join("include/opencv-3.1.0-dev")],
                library_dirs: vec![lib_dir],
                libraries: OPENCV_LIBRARIES.iter().map(|l| format!("{}3", l)).collect(),
                extra_objects: vec![],
            });
        }
    }
    None
}

/// Locate the Eigen headers. Header-only, so only include dirs resolve.
pub fn eigen() -> NativeLib {
    let mut candidates = vec![];
    if let Some(prefix) = env_prefix("eigen") {
        candidates.push(prefix.join("include/eigen3"));
    }
    candidates.extend(EIGEN_INCLUDE_DIRS.iter().map(PathBuf::from));

    NativeLib {
        include_dirs: first_existing(&candidates).into_iter().collect(),
        ..NativeLib::default()
    }
}

/// Ceres Solver. The system include path covers its headers, so only the
/// link name is declared.
pub fn ceres() -> NativeLib {
    NativeLib {
        libraries: vec!["ceres".to_string()],
        ..NativeLib::default()
    }
}

/// Fixed install layout used for Windows builds, filtered to what exists.
pub fn windows_lib_spec() -> NativeLib {
    let includes: Vec<&str> = WINDOWS_LIB_SPEC.iter().map(|spec| spec.0).collect();
    let objects: Vec<&str> = WINDOWS_LIB_SPEC
        .iter()
        .map(|spec| spec.1)
        .filter(|obj| !obj.is_empty())
        .collect();

    NativeLib {
        include_dirs: existing(&includes),
        library_dirs: vec![],
        libraries: vec![],
        extra_objects: existing(&objects),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("extbuild-probe-tests").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_existing_filters_missing_paths() {
        let dir = scratch("existing");
        let missing = dir.join("not-there");

        let found = existing(&[missing.clone(), dir.clone()]);
        assert_eq!(found, vec![dir.clone()]);

        assert_eq!(first_existing(&[missing.clone(), dir.clone()]), Some(dir));
        assert_eq!(first_existing(&[missing]), None);
    }

    #[test]
    fn test_existing_preserves_order() {
        let a = scratch("order-a");
        let b = scratch("order-b");
        assert_eq!(existing(&[b.clone(), a.clone()]), vec![b, a]);
    }

    #[test]
    fn test_ros_opencv_in() {
        let root = scratch("ros/opt/ros");
        let lib_dir = root.join("kinetic/lib");
        fs::create_dir_all(&lib_dir).unwrap();
        fs::write(lib_dir.join("libopencv_core3.so"), b"").unwrap();

        let lib = ros_opencv_in(&root).unwrap();
        assert_eq!(lib.library_dirs, vec![lib_dir]);
        assert_eq!(
            lib.include_dirs,
            vec![root.join("kinetic/include/opencv-3.1.0-dev")]
        );
        assert!(lib.libraries.contains(&"opencv_core3".to_string()));
        assert_eq!(lib.libraries.len(), OPENCV_LIBRARIES.len());
    }

    #[test]
    fn test_ros_opencv_in_empty_root() {
        let root = scratch("ros-empty");
        if let Some(_) = ros_opencv_in(&root) {
            panic!("Should have failed.");
        }
    }

    #[test]
    #[serial]
    fn test_opencv_env_prefix_override() {
        let prefix = scratch("opencv-prefix");
        let lib_dir = prefix.join("lib");
        fs::create_dir_all(&lib_dir).unwrap();
        fs::create_dir_all(prefix.join("include")).unwrap();
        fs::write(lib_dir.join("libopencv_core.so"), b"").unwrap();

        env::set_var("EXTBUILD_OPENCV_PREFIX", &prefix);
        let lib = opencv();
        env::remove_var("EXTBUILD_OPENCV_PREFIX");

        assert_eq!(lib.library_dirs, vec![lib_dir]);
        assert_eq!(lib.include_dirs, vec![prefix.join("include")]);
        assert_eq!(lib.libraries.len(), OPENCV_LIBRARIES.len());
        assert!(lib.extra_objects.is_empty());
    }

    #[test]
    #[serial]
    fn test_eigen_env_prefix_override() {
        let prefix = scratch("eigen-prefix");
        let include = prefix.join("include/eigen3");
        fs::create_dir_all(&include).unwrap();

        env::set_var("EXTBUILD_EIGEN_PREFIX", &prefix);
        let lib = eigen();
        env::remove_var("EXTBUILD_EIGEN_PREFIX");

        assert_eq!(lib.include_dirs, vec![include]);
        assert!(lib.libraries.is_empty());
    }

    #[test]
    fn test_ceres_link_name_only() {
        let lib = ceres();
        assert_eq!(lib.libraries, vec!["ceres".to_string()]);
        assert!(lib.include_dirs.is_empty());
        assert!(lib.library_dirs.is_empty());
    }

    #[test]
    fn test_windows_lib_spec_table() {
        // Five include dirs, three static libraries (Eigen and the ceres
        // root are header-only).
        assert_eq!(WINDOWS_LIB_SPEC.len(), 5);
        let objects: Vec<&str> = WINDOWS_LIB_SPEC
            .iter()
            .map(|spec| spec.1)
            .filter(|obj| !obj.is_empty())
            .collect();
        assert_eq!(objects.len(), 3);
        assert!(WINDOWS_LIB_SPEC.iter().all(|spec| !spec.0.is_empty()));
    }

    #[test]
    fn test_resolved_deps_dedup() {
        let mut deps = ResolvedDeps::default();
        deps.push(NativeLib {
            include_dirs: vec![PathBuf::from("/a"), PathBuf::from("/b")],
            libraries: vec!["ceres".to_string()],
            ..NativeLib::default()
        });
        deps.push(NativeLib {
            include_dirs: vec![PathBuf::from("/b"), PathBuf::from("/c")],
            libraries: vec!["ceres".to_string(), "opencv_core".to_string()],
            ..NativeLib::default()
        });

        assert_eq!(
            deps.include_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
        assert_eq!(
            deps.libraries,
            vec!["ceres".to_string(), "opencv_core".to_string()]
        );
    }
}
