//! Driver library location

use std::path::Path;

use tracing::debug;

use crate::opencl::{ClccError, OpenClLibrary, Result};

/// Environment variable overriding the OpenCL library path
pub const LIBRARY_ENV: &str = "CLCC_OPENCL_LIBRARY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Library names or paths tried in order
    pub library_candidates: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            library_candidates: default_library_candidates()
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl DriverConfig {
    /// Explicit path wins over the platform defaults
    pub fn with_library(library: Option<&Path>) -> Self {
        match library {
            Some(path) => {
                debug!("Using OpenCL library override {}", path.display());
                Self {
                    library_candidates: vec![path.display().to_string()],
                }
            }
            None => Self::default(),
        }
    }

    /// Load the first candidate that opens; reports the first failure
    pub fn load(&self) -> Result<OpenClLibrary> {
        let mut first_error: Option<ClccError> = None;
        for candidate in &self.library_candidates {
            match OpenClLibrary::load(candidate) {
                Ok(library) => return Ok(library),
                Err(err @ ClccError::LibraryLoad { .. }) => {
                    debug!("{}", err);
                    first_error.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(first_error.unwrap_or_else(|| {
            ClccError::unsupported("clGetPlatformIDs", "no OpenCL library candidates configured")
        }))
    }
}

#[cfg(target_os = "macos")]
fn default_library_candidates() -> &'static [&'static str] {
    &["/Library/Frameworks/OpenCL.framework/OpenCL"]
}

#[cfg(target_os = "windows")]
fn default_library_candidates() -> &'static [&'static str] {
    &["OpenCL.dll"]
}

#[cfg(target_os = "linux")]
fn default_library_candidates() -> &'static [&'static str] {
    // The unversioned name only exists with ICD loader development files
    &["libOpenCL.so", "libOpenCL.so.1"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
fn default_library_candidates() -> &'static [&'static str] {
    &["libOpenCL.so"]
}
