//! Scope guards for native objects
//!
//! Every object the tool creates is wrapped in a guard whose `Drop` releases
//! it, so an early return anywhere in a build still tears everything down.
//! Release failures are logged and never propagated.

use std::mem::size_of;

use tracing::{debug, warn};

use super::driver::{Driver, InfoTarget};
use super::error::{ClccError, Result, SelectionError};
use super::query::{program_binary, query_blob, query_string, query_u32};
use super::types::{
    context_info, extensions, has_extension, platform_info, program_info, ClStatus, ContextId,
    DeviceId, DeviceType, PlatformId, ProgramId, RawHandle, CL_DEVICE_NOT_FOUND,
};

/// Device handle tagged with whether this process holds a reference to it
pub struct Device<'d> {
    driver: &'d dyn Driver,
    id: DeviceId,
    owned: bool,
}

impl<'d> Device<'d> {
    /// Device returned by `clGetDeviceIDs`; never released
    pub fn borrowed(driver: &'d dyn Driver, id: DeviceId) -> Self {
        Self {
            driver,
            id,
            owned: false,
        }
    }

    /// Reference-counted device (offline or sub-device path)
    pub fn owned(driver: &'d dyn Driver, id: DeviceId) -> Self {
        Self {
            driver,
            id,
            owned: true,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Drop this process's reference. Repeated calls and calls on borrowed
    /// devices do nothing.
    pub fn release(&mut self) {
        if !self.owned {
            return;
        }
        self.owned = false;
        match self.driver.release_device(self.id) {
            Ok(()) => debug!("Released device {:?}", self.id),
            Err(err) if err.is_unsupported() => {
                debug!("Device {:?} not released: {}", self.id, err)
            }
            Err(err) => warn!("could not release device object: {}", err),
        }
    }
}

impl Drop for Device<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Device<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("owned", &self.owned)
            .finish()
    }
}

/// Context bound to one platform and a device list
pub struct Context<'d> {
    driver: &'d dyn Driver,
    id: ContextId,
}

impl<'d> Context<'d> {
    /// `clCreateContext` with `CL_CONTEXT_PLATFORM` set to `platform`
    pub fn create(driver: &'d dyn Driver, platform: PlatformId, devices: &[DeviceId]) -> Result<Self> {
        let properties = [
            context_info::PLATFORM,
            platform.as_raw() as isize,
            0,
        ];
        let id = driver.create_context(&properties, devices)?;
        debug!("Created context {:?} on {:?}", id, platform);
        Ok(Self { driver, id })
    }

    /// Context over the AMD offline devices of `platform`
    pub fn create_offline(driver: &'d dyn Driver, platform: PlatformId) -> Result<Self> {
        let properties = [
            context_info::PLATFORM,
            platform.as_raw() as isize,
            context_info::OFFLINE_DEVICES_AMD,
            1,
            0,
        ];
        let id = driver.create_context_from_type(&properties, DeviceType::ALL)?;
        debug!("Created offline-device context {:?} on {:?}", id, platform);
        Ok(Self { driver, id })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Devices attached to this context, as raw handles
    pub fn device_ids(&self) -> Result<Vec<DeviceId>> {
        let target = InfoTarget::Context(self.id);
        let count = query_u32(self.driver, target, context_info::NUM_DEVICES)? as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let raw = query_blob(self.driver, target, context_info::DEVICES)?;
        let ids = raw
            .chunks_exact(size_of::<RawHandle>())
            .take(count)
            .map(|chunk| {
                let mut bytes = [0u8; size_of::<usize>()];
                bytes.copy_from_slice(chunk);
                DeviceId::from_raw(usize::from_ne_bytes(bytes) as RawHandle)
            })
            .collect();
        Ok(ids)
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        match self.driver.release_context(self.id) {
            Ok(()) => debug!("Released context {:?}", self.id),
            Err(err) => warn!("could not release context object: {}", err),
        }
    }
}

/// Releases a program handle on drop; shared by both program states
struct ProgramHandle<'d> {
    driver: &'d dyn Driver,
    id: ProgramId,
}

impl Drop for ProgramHandle<'_> {
    fn drop(&mut self) {
        match self.driver.release_program(self.id) {
            Ok(()) => debug!("Released program {:?}", self.id),
            Err(err) => warn!("could not release program object: {}", err),
        }
    }
}

/// Program created from source and not yet built
pub struct Program<'d> {
    handle: ProgramHandle<'d>,
}

/// Which native call turns source into an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// `clBuildProgram`: compile and link
    Link,
    /// `clCompileProgram`: object only
    CompileOnly,
}

impl<'d> Program<'d> {
    pub fn with_source(driver: &'d dyn Driver, context: &Context<'d>, source: &str) -> Result<Self> {
        let id = driver.create_program_with_source(context.id(), source)?;
        debug!("Created program {:?} ({} bytes of source)", id, source.len());
        Ok(Self {
            handle: ProgramHandle { driver, id },
        })
    }

    pub fn id(&self) -> ProgramId {
        self.handle.id
    }

    /// Run the build for one device. The returned program carries the
    /// driver status; a failed build is not an error at this level.
    pub fn build(self, device: &Device<'d>, options: &str, mode: BuildMode) -> Result<BuiltProgram<'d>> {
        let driver = self.handle.driver;
        let devices = [device.id()];
        debug!("Building program {:?} with options \"{}\"", self.id(), options);
        let status = match mode {
            BuildMode::Link => driver.build_program(self.id(), &devices, options)?,
            BuildMode::CompileOnly => driver.compile_program(self.id(), &devices, options)?,
        };
        Ok(BuiltProgram {
            handle: self.handle,
            device: device.id(),
            status,
        })
    }
}

/// Program after the build call; only now do log and binary exist
pub struct BuiltProgram<'d> {
    handle: ProgramHandle<'d>,
    device: DeviceId,
    status: ClStatus,
}

impl BuiltProgram<'_> {
    pub fn id(&self) -> ProgramId {
        self.handle.id
    }

    pub fn status(&self) -> ClStatus {
        self.status
    }

    pub fn succeeded(&self) -> bool {
        self.status == 0
    }

    pub fn build_log(&self) -> Result<String> {
        query_string(
            self.handle.driver,
            InfoTarget::ProgramBuild(self.handle.id, self.device),
            program_info::BUILD_LOG,
        )
    }

    pub fn binary(&self) -> Result<Vec<u8>> {
        program_binary(self.handle.driver, self.handle.id)
    }
}

/// All platforms exported by the driver, in driver order
pub fn platforms(driver: &dyn Driver) -> Result<Vec<PlatformId>> {
    let count = driver.get_platform_ids(None)? as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut ids = vec![PlatformId::null(); count];
    driver.get_platform_ids(Some(&mut ids))?;
    Ok(ids)
}

/// Devices reachable on `platform`
///
/// Platforms exporting `cl_amd_offline_devices` list every device the
/// compiler can target, installed or not, unless `online_only` is set.
pub fn platform_devices<'d>(
    driver: &'d dyn Driver,
    platform: PlatformId,
    online_only: bool,
) -> Result<Vec<Device<'d>>> {
    let platform_extensions =
        query_string(driver, InfoTarget::Platform(platform), platform_info::EXTENSIONS)?;

    if !online_only && has_extension(&platform_extensions, extensions::AMD_OFFLINE_DEVICES) {
        debug!("Enumerating offline devices on {:?}", platform);
        let context = Context::create_offline(driver, platform)?;
        let devices = context
            .device_ids()?
            .into_iter()
            .map(|id| Device::owned(driver, id))
            .collect();
        return Ok(devices);
    }

    let count = match driver.get_device_ids(platform, DeviceType::ALL, None) {
        Ok(count) => count as usize,
        Err(ClccError::NativeCall(err)) if err.status == CL_DEVICE_NOT_FOUND => 0,
        Err(err) => return Err(err),
    };
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut ids = vec![DeviceId::null(); count];
    driver.get_device_ids(platform, DeviceType::ALL, Some(&mut ids))?;
    Ok(ids.into_iter().map(|id| Device::borrowed(driver, id)).collect())
}

/// Keep the device at 1-based `index` and release every other one
pub fn select_device<'d>(devices: Vec<Device<'d>>, index: usize) -> Result<Device<'d>> {
    if devices.is_empty() {
        return Err(SelectionError::NoDevices.into());
    }
    if index == 0 {
        return Err(SelectionError::NonPositiveDevice { index }.into());
    }
    let count = devices.len();
    if index > count {
        return Err(SelectionError::DeviceOutOfRange { index, count }.into());
    }

    let mut selected = None;
    for (position, mut device) in devices.into_iter().enumerate() {
        if position + 1 == index {
            selected = Some(device);
        } else {
            device.release();
        }
    }
    selected.ok_or_else(|| SelectionError::DeviceOutOfRange { index, count }.into())
}
