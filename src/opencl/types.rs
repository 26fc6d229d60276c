//! Raw OpenCL handle types, info codes and status codes

use std::ffi::c_void;
use std::fmt;

pub type ClInt = i32;
pub type ClUint = u32;
pub type ClStatus = ClInt;
pub type ClContextProperty = isize;

/// Opaque native handle as it crosses the C ABI
pub type RawHandle = *mut c_void;

pub const CL_SUCCESS: ClStatus = 0;
pub const CL_DEVICE_NOT_FOUND: ClStatus = -1;
pub const CL_BUILD_PROGRAM_FAILURE: ClStatus = -11;
pub const CL_INVALID_VALUE: ClStatus = -30;
pub const CL_INVALID_BUILD_OPTIONS: ClStatus = -43;

macro_rules! cl_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(RawHandle);

        impl $name {
            pub fn from_raw(raw: RawHandle) -> Self {
                Self(raw)
            }

            pub fn as_raw(self) -> RawHandle {
                self.0
            }

            pub fn null() -> Self {
                Self(std::ptr::null_mut())
            }

            pub fn is_null(self) -> bool {
                self.0.is_null()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:p})"), self.0)
            }
        }
    };
}

cl_handle!(
    /// Driver platform, owned by the ICD and never released
    PlatformId
);
cl_handle!(
    /// Compute device under a platform
    DeviceId
);
cl_handle!(ContextId);
cl_handle!(ProgramId);

/// `cl_device_type` bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceType(pub u64);

impl DeviceType {
    pub const DEFAULT: DeviceType = DeviceType(0x0000_0001);
    pub const CPU: DeviceType = DeviceType(0x0000_0002);
    pub const GPU: DeviceType = DeviceType(0x0000_0004);
    pub const ACCELERATOR: DeviceType = DeviceType(0x0000_0008);
    pub const CUSTOM: DeviceType = DeviceType(0x0000_0010);
    pub const ALL: DeviceType = DeviceType(0xFFFF_FFFF);

    pub fn bits(self) -> u64 {
        self.0
    }
}

/// Platform info codes (`cl_platform_info`)
pub mod platform_info {
    pub const PROFILE: u32 = 0x0900;
    pub const VERSION: u32 = 0x0901;
    pub const NAME: u32 = 0x0902;
    pub const VENDOR: u32 = 0x0903;
    pub const EXTENSIONS: u32 = 0x0904;
}

/// Device info codes (`cl_device_info`), including vendor extension codes
pub mod device_info {
    pub const TYPE: u32 = 0x1000;
    pub const COMPILER_AVAILABLE: u32 = 0x1028;
    pub const NAME: u32 = 0x102B;
    pub const VENDOR: u32 = 0x102C;
    pub const EXTENSIONS: u32 = 0x1030;
    pub const LINKER_AVAILABLE: u32 = 0x103E;
    pub const BUILT_IN_KERNELS: u32 = 0x103F;

    pub const COMPUTE_CAPABILITY_MAJOR_NV: u32 = 0x4000;
    pub const COMPUTE_CAPABILITY_MINOR_NV: u32 = 0x4001;
    pub const GFXIP_MAJOR_AMD: u32 = 0x404A;
    pub const GFXIP_MINOR_AMD: u32 = 0x404B;
}

/// Context info codes and context property names
pub mod context_info {
    pub const DEVICES: u32 = 0x1081;
    pub const NUM_DEVICES: u32 = 0x1083;

    pub const PLATFORM: isize = 0x1084;
    pub const OFFLINE_DEVICES_AMD: isize = 0x403F;
}

/// Program info and build info codes
pub mod program_info {
    pub const BINARY_SIZES: u32 = 0x1165;
    pub const BINARIES: u32 = 0x1166;
    pub const NUM_KERNELS: u32 = 0x1167;
    pub const KERNEL_NAMES: u32 = 0x1168;

    pub const BUILD_STATUS: u32 = 0x1181;
    pub const BUILD_OPTIONS: u32 = 0x1182;
    pub const BUILD_LOG: u32 = 0x1183;
}

/// Extension names the tool reacts to
pub mod extensions {
    pub const AMD_OFFLINE_DEVICES: &str = "cl_amd_offline_devices";
    pub const AMD_DEVICE_ATTRIBUTE_QUERY: &str = "cl_amd_device_attribute_query";
    pub const NV_DEVICE_ATTRIBUTE_QUERY: &str = "cl_nv_device_attribute_query";
}

/// Whitespace-separated extension list as reported by the driver
pub fn has_extension(extensions: &str, name: &str) -> bool {
    extensions.split_whitespace().any(|ext| ext == name)
}

/// Symbolic name for a native status code
pub fn status_name(status: ClStatus) -> Option<&'static str> {
    let name = match status {
        0 => "CL_SUCCESS",
        -1 => "CL_DEVICE_NOT_FOUND",
        -2 => "CL_DEVICE_NOT_AVAILABLE",
        -3 => "CL_COMPILER_NOT_AVAILABLE",
        -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
        -5 => "CL_OUT_OF_RESOURCES",
        -6 => "CL_OUT_OF_HOST_MEMORY",
        -7 => "CL_PROFILING_INFO_NOT_AVAILABLE",
        -8 => "CL_MEM_COPY_OVERLAP",
        -9 => "CL_IMAGE_FORMAT_MISMATCH",
        -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
        -11 => "CL_BUILD_PROGRAM_FAILURE",
        -12 => "CL_MAP_FAILURE",
        -13 => "CL_MISALIGNED_SUB_BUFFER_OFFSET",
        -14 => "CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST",
        -15 => "CL_COMPILE_PROGRAM_FAILURE",
        -16 => "CL_LINKER_NOT_AVAILABLE",
        -17 => "CL_LINK_PROGRAM_FAILURE",
        -18 => "CL_DEVICE_PARTITION_FAILED",
        -19 => "CL_KERNEL_ARG_INFO_NOT_AVAILABLE",
        -30 => "CL_INVALID_VALUE",
        -31 => "CL_INVALID_DEVICE_TYPE",
        -32 => "CL_INVALID_PLATFORM",
        -33 => "CL_INVALID_DEVICE",
        -34 => "CL_INVALID_CONTEXT",
        -35 => "CL_INVALID_QUEUE_PROPERTIES",
        -36 => "CL_INVALID_COMMAND_QUEUE",
        -37 => "CL_INVALID_HOST_PTR",
        -38 => "CL_INVALID_MEM_OBJECT",
        -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
        -40 => "CL_INVALID_IMAGE_SIZE",
        -41 => "CL_INVALID_SAMPLER",
        -42 => "CL_INVALID_BINARY",
        -43 => "CL_INVALID_BUILD_OPTIONS",
        -44 => "CL_INVALID_PROGRAM",
        -45 => "CL_INVALID_PROGRAM_EXECUTABLE",
        -46 => "CL_INVALID_KERNEL_NAME",
        -47 => "CL_INVALID_KERNEL_DEFINITION",
        -48 => "CL_INVALID_KERNEL",
        -49 => "CL_INVALID_ARG_INDEX",
        -50 => "CL_INVALID_ARG_VALUE",
        -51 => "CL_INVALID_ARG_SIZE",
        -52 => "CL_INVALID_KERNEL_ARGS",
        -53 => "CL_INVALID_WORK_DIMENSION",
        -54 => "CL_INVALID_WORK_GROUP_SIZE",
        -55 => "CL_INVALID_WORK_ITEM_SIZE",
        -56 => "CL_INVALID_GLOBAL_OFFSET",
        -57 => "CL_INVALID_EVENT_WAIT_LIST",
        -58 => "CL_INVALID_EVENT",
        -59 => "CL_INVALID_OPERATION",
        -60 => "CL_INVALID_GL_OBJECT",
        -61 => "CL_INVALID_BUFFER_SIZE",
        -62 => "CL_INVALID_MIP_LEVEL",
        -63 => "CL_INVALID_GLOBAL_WORK_SIZE",
        -64 => "CL_INVALID_PROPERTY",
        -65 => "CL_INVALID_IMAGE_DESCRIPTOR",
        -66 => "CL_INVALID_COMPILER_OPTIONS",
        -67 => "CL_INVALID_LINKER_OPTIONS",
        -68 => "CL_INVALID_DEVICE_PARTITION_COUNT",
        -69 => "CL_INVALID_PIPE_SIZE",
        -70 => "CL_INVALID_DEVICE_QUEUE",
        -1001 => "CL_PLATFORM_NOT_FOUND_KHR",
        _ => return None,
    };
    Some(name)
}
