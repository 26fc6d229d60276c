//! Native compiler option strings

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use super::platform::vendor;

/// OpenCL C language versions accepted by `-std`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ClStandard {
    Cl10,
    Cl11,
    Cl12,
    Cl20,
    Cl21,
}

impl ClStandard {
    pub const ALL: [ClStandard; 5] = [
        ClStandard::Cl10,
        ClStandard::Cl11,
        ClStandard::Cl12,
        ClStandard::Cl20,
        ClStandard::Cl21,
    ];

    pub fn version(self) -> (u32, u32) {
        match self {
            ClStandard::Cl10 => (1, 0),
            ClStandard::Cl11 => (1, 1),
            ClStandard::Cl12 => (1, 2),
            ClStandard::Cl20 => (2, 0),
            ClStandard::Cl21 => (2, 1),
        }
    }

    /// `-cl-std=` flag for this version
    pub fn flag(self) -> String {
        format!("-cl-std=CL{self}")
    }
}

impl fmt::Display for ClStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.version();
        write!(f, "{major}.{minor}")
    }
}

impl FromStr for ClStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClStandard::ALL
            .into_iter()
            .find(|standard| standard.to_string() == s.trim())
            .ok_or_else(|| format!("Unsupported OpenCL standard: {s} (expected 1.0, 1.1, 1.2, 2.0 or 2.1)"))
    }
}

/// Inputs that shape the native options string
#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub standard: Option<ClStandard>,
    pub include_paths: Vec<PathBuf>,
    pub debug: bool,
    /// Prefix for the AMD `-save-temps` listing, when assembling
    pub save_temps: Option<Option<PathBuf>>,
}

impl CompilerOptions {
    /// Space-joined options for a platform reporting `platform_name`
    pub fn render(&self, platform_name: &str) -> String {
        let mut flags: Vec<String> = Vec::new();

        if platform_name == vendor::AMD {
            if self.debug {
                flags.push("-g".to_string());
            } else {
                flags.extend(
                    ["-fno-bin-source", "-fno-bin-llvmir", "-fno-bin-amdil"]
                        .iter()
                        .map(|flag| flag.to_string()),
                );
            }
            match &self.save_temps {
                Some(Some(prefix)) => flags.push(format!("-save-temps={}", prefix.display())),
                Some(None) => flags.push("-save-temps".to_string()),
                None => {}
            }
        }

        if let Some(standard) = self.standard {
            flags.push(standard.flag());
        }
        flags.extend(self.include_paths.iter().map(|path| include_flag(path)));

        flags.join(" ")
    }
}

fn include_flag(path: &Path) -> String {
    format!("-I{}", path.display())
}
