use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use super::types::{status_name, ClStatus};

/// A native entry point returned a non-zero status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub struct NativeCallError {
    pub entry_point: &'static str,
    pub status: ClStatus,
}

impl NativeCallError {
    pub fn new(entry_point: &'static str, status: ClStatus) -> Self {
        Self {
            entry_point,
            status,
        }
    }
}

impl fmt::Display for NativeCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed with error code {}",
            self.entry_point, self.status
        )?;
        if let Some(name) = status_name(self.status) {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no OpenCL platforms found")]
    NoPlatforms,

    #[error("no target OpenCL platform specified: {count} platforms are available (clcc -l to list platforms)")]
    AmbiguousPlatform { count: usize },

    #[error("invalid platform value {value}: positive number required (clcc -l to list platforms)")]
    NonPositivePlatform { value: String },

    #[error("invalid platform value {value}: only {count} OpenCL platforms are available (clcc -l to list platforms)")]
    PlatformOutOfRange { value: String, count: usize },

    #[error("invalid platform name {value}: use one of ({aliases})")]
    UnknownAlias { value: String, aliases: String },

    #[error("platform \"{alias}\" ({driver_name}) is not available")]
    PlatformUnavailable { alias: String, driver_name: String },

    #[error("no OpenCL devices found on the selected platform")]
    NoDevices,

    #[error("invalid device value {index}: positive number required (clcc -l to list devices)")]
    NonPositiveDevice { index: usize },

    #[error("invalid device value {index}: only {count} OpenCL devices are available (clcc -l to list devices)")]
    DeviceOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum ClccError {
    #[error("failed to load OpenCL library ({path}): {source}")]
    LibraryLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("OpenCL library does not export {symbol}: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error(transparent)]
    NativeCall(#[from] NativeCallError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("{entry_point} is not supported: {reason}")]
    Unsupported {
        entry_point: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Usage(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClccError {
    pub fn unsupported(entry_point: &'static str, reason: impl Into<String>) -> Self {
        ClccError::Unsupported {
            entry_point,
            reason: reason.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ClccError::Unsupported { .. })
    }

    /// Native status code, if this error came from a driver call
    pub fn status(&self) -> Option<ClStatus> {
        match self {
            ClccError::NativeCall(err) => Some(err.status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClccError>;

/// Map a native status to `Ok(())` or a `NativeCallError` naming the entry point
pub fn check_status(entry_point: &'static str, status: ClStatus) -> Result<()> {
    if status == super::types::CL_SUCCESS {
        Ok(())
    } else {
        Err(NativeCallError::new(entry_point, status).into())
    }
}
