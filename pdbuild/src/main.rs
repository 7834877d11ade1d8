//! A binary for resolving native dependency paths and compiling the pupil
//! detector extension targets declared in a build manifest.
//!
//! Plays the role the old `setup.py build_ext` invocation played: probe the
//! platform's well-known install locations, bind the resolved configuration
//! into the declared targets, and hand each target to the compiler driver.
//! The process exits nonzero as soon as the delegated compile fails.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info};
use structopt::clap::AppSettings;
use structopt::StructOpt;

use extbuild::compile::{self, Builder};
use extbuild::descriptor::Manifest;
use extbuild::platform::Platform;
use extbuild::probe;

#[derive(StructOpt, Debug)]
#[structopt(
    about("Resolve native dependencies and build the pupil detector extension targets."),
    setting(AppSettings::ColoredHelp),
    setting(AppSettings::ColorAuto)
)]
struct Opt {
    /// Path to the extension manifest.
    #[structopt(short, long, default_value = "build.toml", parse(from_os_str))]
    manifest: PathBuf,

    /// Override host platform detection.
    #[structopt(
        short,
        long,
        possible_values = &Platform::variants(),
        case_insensitive = true
    )]
    platform: Option<Platform>,

    /// Directory the compiled archives are written to.
    #[structopt(short, long, default_value = "build", parse(from_os_str))]
    out_dir: PathBuf,

    /// Resolve and print the build configuration without compiling.
    #[structopt(short, long)]
    dry_run: bool,

    /// Number of parallel compile jobs.
    #[structopt(short, long, default_value = "8")]
    jobs: u32,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let opt = Opt::from_args();

    let platform = opt.platform.unwrap_or_else(Platform::host);
    info!("building for platform: {}", platform);

    compile::ensure_build_env(platform, &opt.out_dir, opt.jobs);

    let time = Instant::now();
    let deps = probe::resolve(platform);
    debug!("dependency resolution: {:#?}", time.elapsed());

    let manifest = Manifest::from_path(&opt.manifest)?;
    let extensions = manifest.extensions(platform, &deps)?;
    info!(
        "{} v{}: {} extension target(s)",
        manifest.package.name,
        manifest.package.version,
        extensions.len()
    );

    if opt.dry_run {
        for ext in &extensions {
            println!("{:#?}", ext);
        }
        return Ok(());
    }

    fs::create_dir_all(&opt.out_dir)?;
    let builder = Builder::new(&opt.out_dir);

    for ext in &extensions {
        info!("compiling {}", ext.name);
        let time = Instant::now();
        let artifact = builder.compile(ext)?;
        info!("wrote {} in {:#?}", artifact.display(), time.elapsed());
    }

    Ok(())
}
