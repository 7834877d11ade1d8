//! Host platform identification.
//!
//! The dependency tables are keyed by platform. Anything that is not Windows
//! falls through to the Unix-style search paths, so an unrecognized platform
//! still resolves (possibly incorrectly) rather than erroring out.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Unrecognized platform: {0}")]
    UnrecognizedPlatform(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl Platform {
    /// Identify the platform this binary was compiled for.
    pub fn host() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    /// Accepted names for the CLI platform override.
    pub fn variants() -> [&'static str; 4] {
        ["windows", "macos", "linux", "other"]
    }

    /// Rust target triple used when the compiler driver runs outside cargo.
    pub fn default_target_triple(self) -> &'static str {
        match self {
            Platform::Windows => "x86_64-pc-windows-msvc",
            Platform::MacOs => "x86_64-apple-darwin",
            Platform::Linux | Platform::Other => "x86_64-unknown-linux-gnu",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Other => "other",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Platform, PlatformError> {
        match s.to_ascii_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "macos" | "darwin" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            "other" => Ok(Platform::Other),
            _ => Err(PlatformError::UnrecognizedPlatform(s.to_string())),
        }
    }
}
