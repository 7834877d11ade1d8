use std::env;
use std::path::{Path, PathBuf};

use extbuild::compile::{self, Builder};
use extbuild::descriptor::{self, Manifest};
use extbuild::platform::Platform;
use extbuild::probe;

fn main() {
    let platform = Platform::host();
    let deps = probe::resolve(platform);

    // Search paths for whatever resolved; an absent dependency is simply
    // omitted and the linker reports it if anything ends up needing it.
    for dir in &deps.library_dirs {
        println!("cargo:rustc-link-search=native={}", dir.display());
    }

    // Header changes must retrigger the build.
    for header in descriptor::collect_headers(Path::new("singleeyefitter")) {
        println!("cargo:rerun-if-changed={}", header.display());
    }
    println!("cargo:rerun-if-changed=include/pupil_detectors.h");
    println!("cargo:rerun-if-changed=build.toml");
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_COMPILE_NATIVE").is_none() {
        return;
    }

    let manifest = Manifest::from_path(Path::new("build.toml")).unwrap();
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let builder = Builder::new(&out_dir);

    for ext in manifest.extensions(platform, &deps).unwrap() {
        builder.compile(&ext).unwrap();
        println!("cargo:rustc-link-lib=static={}", ext.name.artifact_name());
        for line in compile::cargo_directives(&ext) {
            println!("{}", line);
        }
    }
}
