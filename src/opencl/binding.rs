//! Dynamically loaded OpenCL library

use std::ffi::{c_char, c_void, CString};
use std::mem::size_of;
use std::ptr;

use libloading::Library;
use tracing::{debug, info};

use super::driver::{Driver, InfoTarget, OptionalEntryPoint};
use super::error::{check_status, ClccError, NativeCallError, Result};
use super::types::{
    program_info, ClContextProperty, ClInt, ClStatus, ClUint, ContextId, DeviceId, DeviceType,
    PlatformId, ProgramId, RawHandle, CL_INVALID_BUILD_OPTIONS, CL_INVALID_VALUE,
};

type ContextNotify =
    Option<unsafe extern "system" fn(*const c_char, *const c_void, usize, *mut c_void)>;
type ProgramNotify = Option<unsafe extern "system" fn(RawHandle, *mut c_void)>;

type GetPlatformIdsFn = unsafe extern "system" fn(ClUint, *mut PlatformId, *mut ClUint) -> ClInt;
type GetPlatformInfoFn =
    unsafe extern "system" fn(PlatformId, ClUint, usize, *mut c_void, *mut usize) -> ClInt;
type GetDeviceIdsFn =
    unsafe extern "system" fn(PlatformId, u64, ClUint, *mut DeviceId, *mut ClUint) -> ClInt;
type GetDeviceInfoFn =
    unsafe extern "system" fn(DeviceId, ClUint, usize, *mut c_void, *mut usize) -> ClInt;
type ReleaseDeviceFn = unsafe extern "system" fn(DeviceId) -> ClInt;
type CreateContextFn = unsafe extern "system" fn(
    *const ClContextProperty,
    ClUint,
    *const DeviceId,
    ContextNotify,
    *mut c_void,
    *mut ClInt,
) -> ContextId;
type CreateContextFromTypeFn = unsafe extern "system" fn(
    *const ClContextProperty,
    u64,
    ContextNotify,
    *mut c_void,
    *mut ClInt,
) -> ContextId;
type GetContextInfoFn =
    unsafe extern "system" fn(ContextId, ClUint, usize, *mut c_void, *mut usize) -> ClInt;
type ReleaseContextFn = unsafe extern "system" fn(ContextId) -> ClInt;
type CreateProgramWithSourceFn = unsafe extern "system" fn(
    ContextId,
    ClUint,
    *const *const c_char,
    *const usize,
    *mut ClInt,
) -> ProgramId;
type BuildProgramFn = unsafe extern "system" fn(
    ProgramId,
    ClUint,
    *const DeviceId,
    *const c_char,
    ProgramNotify,
    *mut c_void,
) -> ClInt;
type CompileProgramFn = unsafe extern "system" fn(
    ProgramId,
    ClUint,
    *const DeviceId,
    *const c_char,
    ClUint,
    *const ProgramId,
    *const *const c_char,
    ProgramNotify,
    *mut c_void,
) -> ClInt;
type GetProgramInfoFn =
    unsafe extern "system" fn(ProgramId, ClUint, usize, *mut c_void, *mut usize) -> ClInt;
type GetProgramBuildInfoFn = unsafe extern "system" fn(
    ProgramId,
    DeviceId,
    ClUint,
    usize,
    *mut c_void,
    *mut usize,
) -> ClInt;
type ReleaseProgramFn = unsafe extern "system" fn(ProgramId) -> ClInt;

/// Entry points resolved from an OpenCL ICD loader or vendor library
pub struct OpenClLibrary {
    path: String,
    get_platform_ids: GetPlatformIdsFn,
    get_platform_info: GetPlatformInfoFn,
    get_device_ids: GetDeviceIdsFn,
    get_device_info: GetDeviceInfoFn,
    release_device: Option<ReleaseDeviceFn>,
    create_context: CreateContextFn,
    create_context_from_type: CreateContextFromTypeFn,
    get_context_info: GetContextInfoFn,
    release_context: ReleaseContextFn,
    create_program_with_source: CreateProgramWithSourceFn,
    build_program: BuildProgramFn,
    compile_program: Option<CompileProgramFn>,
    get_program_info: GetProgramInfoFn,
    get_program_build_info: GetProgramBuildInfoFn,
    release_program: ReleaseProgramFn,
    // Keeps the function pointers above valid
    _library: Library,
}

/// Resolve a mandatory entry point
///
/// # Safety
/// `T` must be the exact function pointer type of `symbol`.
unsafe fn required<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    let name = format!("{symbol}\0");
    let resolved = library
        .get::<T>(name.as_bytes())
        .map_err(|source| ClccError::MissingSymbol { symbol, source })?;
    Ok(*resolved)
}

/// Resolve an entry point that may be absent on pre-1.2 drivers
///
/// # Safety
/// `T` must be the exact function pointer type of `symbol`.
unsafe fn optional<T: Copy>(library: &Library, symbol: &'static str) -> Option<T> {
    let name = format!("{symbol}\0");
    match library.get::<T>(name.as_bytes()) {
        Ok(resolved) => Some(*resolved),
        Err(err) => {
            debug!("Optional entry point {} unavailable: {}", symbol, err);
            None
        }
    }
}

impl OpenClLibrary {
    /// Load the shared library at `path` and resolve every entry point
    pub fn load(path: &str) -> Result<Self> {
        debug!("Loading OpenCL library from {}", path);
        // SAFETY: loading the ICD runs its initializers; the OpenCL loader has
        // no load-time requirements on the host process.
        let library = unsafe { Library::new(path) }.map_err(|source| ClccError::LibraryLoad {
            path: path.to_string(),
            source,
        })?;

        // SAFETY: every type alias matches the prototype in CL/cl.h.
        let binding = unsafe {
            OpenClLibrary {
                path: path.to_string(),
                get_platform_ids: required(&library, "clGetPlatformIDs")?,
                get_platform_info: required(&library, "clGetPlatformInfo")?,
                get_device_ids: required(&library, "clGetDeviceIDs")?,
                get_device_info: required(&library, "clGetDeviceInfo")?,
                release_device: optional(&library, "clReleaseDevice"),
                create_context: required(&library, "clCreateContext")?,
                create_context_from_type: required(&library, "clCreateContextFromType")?,
                get_context_info: required(&library, "clGetContextInfo")?,
                release_context: required(&library, "clReleaseContext")?,
                create_program_with_source: required(&library, "clCreateProgramWithSource")?,
                build_program: required(&library, "clBuildProgram")?,
                compile_program: optional(&library, "clCompileProgram"),
                get_program_info: required(&library, "clGetProgramInfo")?,
                get_program_build_info: required(&library, "clGetProgramBuildInfo")?,
                release_program: required(&library, "clReleaseProgram")?,
                _library: library,
            }
        };

        info!(
            "Loaded OpenCL library {} (clReleaseDevice: {}, clCompileProgram: {})",
            path,
            binding.release_device.is_some(),
            binding.compile_program.is_some()
        );
        Ok(binding)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Driver for OpenClLibrary {
    fn get_platform_ids(&self, platforms: Option<&mut [PlatformId]>) -> Result<u32> {
        let mut count: ClUint = 0;
        let (len, buf) = match platforms {
            Some(slice) => (slice.len() as ClUint, slice.as_mut_ptr()),
            None => (0, ptr::null_mut()),
        };
        // SAFETY: `buf` is null or valid for `len` writes.
        let status = unsafe { (self.get_platform_ids)(len, buf, &mut count) };
        check_status("clGetPlatformIDs", status)?;
        Ok(count)
    }

    fn get_device_ids(
        &self,
        platform: PlatformId,
        device_type: DeviceType,
        devices: Option<&mut [DeviceId]>,
    ) -> Result<u32> {
        let mut count: ClUint = 0;
        let (len, buf) = match devices {
            Some(slice) => (slice.len() as ClUint, slice.as_mut_ptr()),
            None => (0, ptr::null_mut()),
        };
        // SAFETY: `buf` is null or valid for `len` writes.
        let status =
            unsafe { (self.get_device_ids)(platform, device_type.bits(), len, buf, &mut count) };
        check_status("clGetDeviceIDs", status)?;
        Ok(count)
    }

    fn get_info(&self, target: InfoTarget, param: u32, value: Option<&mut [u8]>) -> Result<usize> {
        let mut size_ret: usize = 0;
        let (len, buf) = match value {
            Some(slice) => (slice.len(), slice.as_mut_ptr() as *mut c_void),
            None => (0, ptr::null_mut()),
        };
        // SAFETY: `buf` is null or valid for `len` bytes of writes.
        let status = unsafe {
            match target {
                InfoTarget::Platform(id) => {
                    (self.get_platform_info)(id, param, len, buf, &mut size_ret)
                }
                InfoTarget::Device(id) => (self.get_device_info)(id, param, len, buf, &mut size_ret),
                InfoTarget::Context(id) => {
                    (self.get_context_info)(id, param, len, buf, &mut size_ret)
                }
                InfoTarget::Program(id) => {
                    (self.get_program_info)(id, param, len, buf, &mut size_ret)
                }
                InfoTarget::ProgramBuild(program, device) => {
                    (self.get_program_build_info)(program, device, param, len, buf, &mut size_ret)
                }
            }
        };
        check_status(target.entry_point(), status)?;
        Ok(size_ret)
    }

    fn get_program_binary(&self, program: ProgramId, binary: &mut [u8]) -> Result<()> {
        let mut pointers: [*mut u8; 1] = [binary.as_mut_ptr()];
        // SAFETY: the driver writes at most CL_PROGRAM_BINARY_SIZES bytes through
        // the single pointer, and `binary` was sized from that query.
        let status = unsafe {
            (self.get_program_info)(
                program,
                program_info::BINARIES,
                size_of::<[*mut u8; 1]>(),
                pointers.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            )
        };
        check_status("clGetProgramInfo", status)
    }

    fn release_device(&self, device: DeviceId) -> Result<()> {
        let release = self.release_device.ok_or_else(|| {
            ClccError::unsupported("clReleaseDevice", "driver predates OpenCL 1.2")
        })?;
        // SAFETY: `device` came from this driver.
        check_status("clReleaseDevice", unsafe { release(device) })
    }

    fn create_context(
        &self,
        properties: &[ClContextProperty],
        devices: &[DeviceId],
    ) -> Result<ContextId> {
        debug_assert_eq!(properties.last(), Some(&0));
        let mut status: ClInt = 0;
        // SAFETY: `properties` is zero-terminated, `devices` is valid for its length.
        let context = unsafe {
            (self.create_context)(
                properties.as_ptr(),
                devices.len() as ClUint,
                devices.as_ptr(),
                None,
                ptr::null_mut(),
                &mut status,
            )
        };
        check_status("clCreateContext", status)?;
        Ok(context)
    }

    fn create_context_from_type(
        &self,
        properties: &[ClContextProperty],
        device_type: DeviceType,
    ) -> Result<ContextId> {
        debug_assert_eq!(properties.last(), Some(&0));
        let mut status: ClInt = 0;
        // SAFETY: `properties` is zero-terminated.
        let context = unsafe {
            (self.create_context_from_type)(
                properties.as_ptr(),
                device_type.bits(),
                None,
                ptr::null_mut(),
                &mut status,
            )
        };
        check_status("clCreateContextFromType", status)?;
        Ok(context)
    }

    fn release_context(&self, context: ContextId) -> Result<()> {
        // SAFETY: `context` came from this driver.
        check_status("clReleaseContext", unsafe { (self.release_context)(context) })
    }

    fn create_program_with_source(&self, context: ContextId, source: &str) -> Result<ProgramId> {
        let source = c_source(source)?;
        let strings: [*const c_char; 1] = [source.as_ptr()];
        let mut status: ClInt = 0;
        // SAFETY: `source` is NUL-terminated and a null `lengths` array tells the
        // driver to measure it; the empty source is a valid one-byte buffer.
        let program = unsafe {
            (self.create_program_with_source)(
                context,
                1,
                strings.as_ptr(),
                ptr::null(),
                &mut status,
            )
        };
        check_status("clCreateProgramWithSource", status)?;
        Ok(program)
    }

    fn build_program(&self, program: ProgramId, devices: &[DeviceId], options: &str) -> Result<ClStatus> {
        let options = c_options("clBuildProgram", options)?;
        // SAFETY: `options` is NUL-terminated and outlives the blocking call.
        Ok(unsafe {
            (self.build_program)(
                program,
                devices.len() as ClUint,
                devices.as_ptr(),
                options.as_ptr(),
                None,
                ptr::null_mut(),
            )
        })
    }

    fn compile_program(&self, program: ProgramId, devices: &[DeviceId], options: &str) -> Result<ClStatus> {
        let compile = self.compile_program.ok_or_else(|| {
            ClccError::unsupported(
                "clCompileProgram",
                "separate compilation requires an OpenCL 1.2 driver",
            )
        })?;
        let options = c_options("clCompileProgram", options)?;
        // SAFETY: no headers are passed; `options` outlives the blocking call.
        Ok(unsafe {
            compile(
                program,
                devices.len() as ClUint,
                devices.as_ptr(),
                options.as_ptr(),
                0,
                ptr::null(),
                ptr::null(),
                None,
                ptr::null_mut(),
            )
        })
    }

    fn release_program(&self, program: ProgramId) -> Result<()> {
        // SAFETY: `program` came from this driver.
        check_status("clReleaseProgram", unsafe { (self.release_program)(program) })
    }

    fn supports(&self, entry_point: OptionalEntryPoint) -> bool {
        match entry_point {
            OptionalEntryPoint::ReleaseDevice => self.release_device.is_some(),
            OptionalEntryPoint::CompileProgram => self.compile_program.is_some(),
        }
    }
}

fn c_source(source: &str) -> Result<CString> {
    CString::new(source)
        .map_err(|_| NativeCallError::new("clCreateProgramWithSource", CL_INVALID_VALUE).into())
}

fn c_options(entry_point: &'static str, options: &str) -> Result<CString> {
    CString::new(options)
        .map_err(|_| NativeCallError::new(entry_point, CL_INVALID_BUILD_OPTIONS).into())
}
