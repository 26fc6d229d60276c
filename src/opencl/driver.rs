//! The seam between native OpenCL calls and everything built on them
//!
//! Methods mirror the C entry points one-to-one but take slices and options
//! instead of raw pointers. Two-phase queries are expressed by passing `None`
//! for the output buffer to obtain the required size.

use std::fmt;

use super::error::Result;
use super::types::{ClContextProperty, ClStatus, ContextId, DeviceId, DeviceType, PlatformId, ProgramId};

/// Object an info query is issued against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTarget {
    Platform(PlatformId),
    Device(DeviceId),
    Context(ContextId),
    Program(ProgramId),
    ProgramBuild(ProgramId, DeviceId),
}

impl InfoTarget {
    /// Native entry point that serves queries for this object kind
    pub fn entry_point(&self) -> &'static str {
        match self {
            InfoTarget::Platform(_) => "clGetPlatformInfo",
            InfoTarget::Device(_) => "clGetDeviceInfo",
            InfoTarget::Context(_) => "clGetContextInfo",
            InfoTarget::Program(_) => "clGetProgramInfo",
            InfoTarget::ProgramBuild(..) => "clGetProgramBuildInfo",
        }
    }
}

/// Entry points that older drivers may not export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalEntryPoint {
    ReleaseDevice,
    CompileProgram,
}

impl OptionalEntryPoint {
    pub fn symbol(self) -> &'static str {
        match self {
            OptionalEntryPoint::ReleaseDevice => "clReleaseDevice",
            OptionalEntryPoint::CompileProgram => "clCompileProgram",
        }
    }
}

impl fmt::Display for OptionalEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Typed access to an OpenCL implementation
pub trait Driver {
    /// `clGetPlatformIDs`; returns the number of available platforms
    fn get_platform_ids(&self, platforms: Option<&mut [PlatformId]>) -> Result<u32>;

    /// `clGetDeviceIDs`; returns the number of matching devices
    fn get_device_ids(
        &self,
        platform: PlatformId,
        device_type: DeviceType,
        devices: Option<&mut [DeviceId]>,
    ) -> Result<u32>;

    /// `clGet*Info`; offers `value.len()` bytes to the driver and returns the
    /// size the driver reports for the parameter
    fn get_info(&self, target: InfoTarget, param: u32, value: Option<&mut [u8]>) -> Result<usize>;

    /// `clGetProgramInfo(CL_PROGRAM_BINARIES)` for a single-device program
    fn get_program_binary(&self, program: ProgramId, binary: &mut [u8]) -> Result<()>;

    /// `clReleaseDevice`; `Unsupported` when the driver predates OpenCL 1.2
    fn release_device(&self, device: DeviceId) -> Result<()>;

    /// `clCreateContext`; `properties` must end with a zero sentinel
    fn create_context(
        &self,
        properties: &[ClContextProperty],
        devices: &[DeviceId],
    ) -> Result<ContextId>;

    /// `clCreateContextFromType`; `properties` must end with a zero sentinel
    fn create_context_from_type(
        &self,
        properties: &[ClContextProperty],
        device_type: DeviceType,
    ) -> Result<ContextId>;

    fn release_context(&self, context: ContextId) -> Result<()>;

    fn create_program_with_source(&self, context: ContextId, source: &str) -> Result<ProgramId>;

    /// `clBuildProgram`; the status is returned rather than raised since the
    /// build log must still be collected on failure
    fn build_program(&self, program: ProgramId, devices: &[DeviceId], options: &str) -> Result<ClStatus>;

    /// `clCompileProgram` with no embedded headers; status returned as for
    /// [`Driver::build_program`]
    fn compile_program(&self, program: ProgramId, devices: &[DeviceId], options: &str) -> Result<ClStatus>;

    fn release_program(&self, program: ProgramId) -> Result<()>;

    /// Whether an optional entry point is exported by this implementation
    fn supports(&self, entry_point: OptionalEntryPoint) -> bool;
}
