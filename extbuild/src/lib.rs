#![forbid(unsafe_code)]

//! Build-configuration resolver for the pupil detector native extension.
//!
//! Given the host platform, this crate locates the native dependencies the
//! detector core is compiled against (OpenCV, Eigen, Ceres Solver, glog),
//! binds them into declarative extension build targets, and hands those
//! targets to the compiler driver. It is meant to be called from a `build.rs`
//! or from the `pdbuild` command-line front end.

pub mod compile;
pub mod descriptor;
pub mod platform;
pub mod probe;

pub use compile::Builder;
pub use descriptor::{Extension, Manifest, ModuleName};
pub use platform::Platform;
pub use probe::{NativeLib, ResolvedDeps};
