//! clcc - OpenCL offline compiler
//!
//! This crate loads the system's OpenCL driver at runtime, enumerates its
//! platforms and devices, and has the driver build or compile kernel source
//! into a vendor-specific binary, reporting the driver's build log.

pub mod build;
pub mod cli;
pub mod config;
pub mod opencl;

pub use build::{BuildOrchestrator, BuildOutcome, BuildRequest, Command};
pub use config::DriverConfig;
pub use opencl::{ClccError, Driver, OpenClLibrary, Result};
