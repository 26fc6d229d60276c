//! Safe layer over the native OpenCL API

pub mod binding;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod types;

pub use binding::OpenClLibrary;
pub use driver::{Driver, InfoTarget, OptionalEntryPoint};
pub use error::{ClccError, NativeCallError, Result, SelectionError};
pub use lifecycle::{platforms, platform_devices, select_device, BuildMode, BuiltProgram, Context, Device, Program};
pub use query::{query, query_string, query_u32, query_u64, InfoShape, InfoValue};
pub use types::{ClStatus, ContextId, DeviceId, DeviceType, PlatformId, ProgramId};
