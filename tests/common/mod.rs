//! In-memory OpenCL driver used by the integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use clcc::opencl::error::NativeCallError;
use clcc::opencl::types::{
    context_info, device_info, platform_info, program_info, ClContextProperty, ClStatus, RawHandle,
    CL_BUILD_PROGRAM_FAILURE, CL_DEVICE_NOT_FOUND, CL_INVALID_VALUE,
};
use clcc::opencl::{
    ClccError, ContextId, DeviceId, DeviceType, Driver, InfoTarget, OptionalEntryPoint, PlatformId,
    ProgramId, Result,
};

/// Source containing this marker fails to build
pub const SYNTAX_ERROR: &str = "syntax error";
pub const FAILURE_LOG: &str = "kernel.cl:1:1: error: expected ';' after expression";

const PLATFORM_STRIDE: usize = 0x1000;
const OFFLINE_BASE: usize = 0x800;
const CL_INVALID_PLATFORM: ClStatus = -32;
const CL_INVALID_DEVICE: ClStatus = -33;
const CL_INVALID_CONTEXT: ClStatus = -34;
const CL_INVALID_PROGRAM: ClStatus = -44;
const CL_OUT_OF_HOST_MEMORY: ClStatus = -6;

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub device_type: u64,
    pub name: String,
    pub extensions: String,
    pub gfxip: Option<(u32, u32)>,
    pub compute_capability: Option<(u32, u32)>,
}

impl FakeDevice {
    pub fn gpu(name: &str) -> Self {
        Self {
            device_type: DeviceType::GPU.bits(),
            name: name.to_string(),
            extensions: String::new(),
            gfxip: None,
            compute_capability: None,
        }
    }

    pub fn cpu(name: &str) -> Self {
        Self {
            device_type: DeviceType::CPU.bits(),
            ..Self::gpu(name)
        }
    }

    pub fn with_gfxip(mut self, major: u32, minor: u32) -> Self {
        self.extensions = "cl_khr_fp64 cl_amd_device_attribute_query".to_string();
        self.gfxip = Some((major, minor));
        self
    }

    pub fn with_compute_capability(mut self, major: u32, minor: u32) -> Self {
        self.extensions = "cl_khr_fp64 cl_nv_device_attribute_query".to_string();
        self.compute_capability = Some((major, minor));
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakePlatform {
    pub name: String,
    pub profile: String,
    pub version: String,
    pub extensions: String,
    pub devices: Vec<FakeDevice>,
    pub offline_devices: Vec<FakeDevice>,
}

impl FakePlatform {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            profile: "FULL_PROFILE".to_string(),
            version: "OpenCL 1.2 fake".to_string(),
            extensions: "cl_khr_icd".to_string(),
            devices: vec![FakeDevice::gpu("Fake GPU")],
            offline_devices: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_devices(mut self, devices: Vec<FakeDevice>) -> Self {
        self.devices = devices;
        self
    }

    /// Advertise `cl_amd_offline_devices` with the given device list
    pub fn with_offline_devices(mut self, devices: Vec<FakeDevice>) -> Self {
        self.extensions = "cl_khr_icd cl_amd_offline_devices".to_string();
        self.offline_devices = devices;
        self
    }
}

#[derive(Debug, Clone)]
struct FakeContext {
    platform: usize,
    devices: Vec<usize>,
}

#[derive(Debug, Clone)]
struct FakeProgram {
    source: String,
    log: String,
    binary: Vec<u8>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_handle: usize,
    contexts: HashMap<usize, FakeContext>,
    programs: HashMap<usize, FakeProgram>,
    device_releases: HashMap<usize, u32>,
    context_releases: HashMap<usize, u32>,
    program_releases: HashMap<usize, u32>,
    build_options: Vec<String>,
    build_calls: Vec<&'static str>,
}

pub struct FakeDriver {
    platforms: Vec<FakePlatform>,
    release_device: bool,
    compile_program: bool,
    fail_program_creation: bool,
    fail_device_release: bool,
    success_log: String,
    state: RefCell<FakeState>,
}

impl FakeDriver {
    pub fn new(platforms: Vec<FakePlatform>) -> Self {
        Self {
            platforms,
            release_device: true,
            compile_program: true,
            fail_program_creation: false,
            fail_device_release: false,
            success_log: String::new(),
            state: RefCell::new(FakeState {
                next_handle: 0x10_0000,
                ..FakeState::default()
            }),
        }
    }

    /// One generic platform with a single GPU
    pub fn single() -> Self {
        Self::new(vec![FakePlatform::new("Fake Platform")])
    }

    /// Driver predating OpenCL 1.2: no clReleaseDevice or clCompileProgram
    pub fn legacy(mut self) -> Self {
        self.release_device = false;
        self.compile_program = false;
        self
    }

    pub fn failing_program_creation(mut self) -> Self {
        self.fail_program_creation = true;
        self
    }

    /// clReleaseDevice exists but rejects every handle
    pub fn failing_device_release(mut self) -> Self {
        self.fail_device_release = true;
        self
    }

    pub fn with_success_log(mut self, log: &str) -> Self {
        self.success_log = log.to_string();
        self
    }

    pub fn platform_id(&self, index: usize) -> PlatformId {
        PlatformId::from_raw(platform_raw(index) as RawHandle)
    }

    pub fn device_id(&self, platform: usize, device: usize) -> DeviceId {
        DeviceId::from_raw((platform_raw(platform) + device + 1) as RawHandle)
    }

    pub fn offline_device_id(&self, platform: usize, device: usize) -> DeviceId {
        DeviceId::from_raw((platform_raw(platform) + OFFLINE_BASE + device + 1) as RawHandle)
    }

    pub fn device_releases(&self, device: DeviceId) -> u32 {
        let state = self.state.borrow();
        state
            .device_releases
            .get(&(device.as_raw() as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_device_releases(&self) -> u32 {
        self.state.borrow().device_releases.values().sum()
    }

    pub fn contexts_created(&self) -> usize {
        let state = self.state.borrow();
        state.contexts.len()
    }

    /// Every created context was released exactly once
    pub fn contexts_balanced(&self) -> bool {
        let state = self.state.borrow();
        state
            .contexts
            .keys()
            .all(|id| state.context_releases.get(id) == Some(&1))
            && state.context_releases.len() == state.contexts.len()
    }

    pub fn programs_created(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Every created program was released exactly once
    pub fn programs_balanced(&self) -> bool {
        let state = self.state.borrow();
        state
            .programs
            .keys()
            .all(|id| state.program_releases.get(id) == Some(&1))
            && state.program_releases.len() == state.programs.len()
    }

    /// Source text of every program created so far
    pub fn program_sources(&self) -> Vec<String> {
        let state = self.state.borrow();
        state.programs.values().map(|program| program.source.clone()).collect()
    }

    pub fn build_options(&self) -> Vec<String> {
        self.state.borrow().build_options.clone()
    }

    pub fn build_calls(&self) -> Vec<&'static str> {
        self.state.borrow().build_calls.clone()
    }

    fn platform_index(&self, platform: PlatformId) -> Option<usize> {
        let raw = platform.as_raw() as usize;
        if raw == 0 || raw % PLATFORM_STRIDE != 0 {
            return None;
        }
        let index = raw / PLATFORM_STRIDE - 1;
        (index < self.platforms.len()).then_some(index)
    }

    fn device(&self, raw: usize) -> Option<&FakeDevice> {
        let platform = self.platforms.get((raw / PLATFORM_STRIDE).checked_sub(1)?)?;
        let slot = raw % PLATFORM_STRIDE;
        if slot > OFFLINE_BASE {
            platform.offline_devices.get(slot - OFFLINE_BASE - 1)
        } else {
            platform.devices.get(slot.checked_sub(1)?)
        }
    }

    fn allocate_handle(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.next_handle += 0x10;
        state.next_handle
    }

    fn info_bytes(&self, target: InfoTarget, param: u32) -> std::result::Result<Vec<u8>, ClStatus> {
        match target {
            InfoTarget::Platform(platform) => {
                let platform = self
                    .platform_index(platform)
                    .map(|index| &self.platforms[index])
                    .ok_or(CL_INVALID_PLATFORM)?;
                let text = match param {
                    platform_info::PROFILE => &platform.profile,
                    platform_info::VERSION => &platform.version,
                    platform_info::NAME | platform_info::VENDOR => &platform.name,
                    platform_info::EXTENSIONS => &platform.extensions,
                    _ => return Err(CL_INVALID_VALUE),
                };
                Ok(c_string(text))
            }
            InfoTarget::Device(device) => {
                let device = self
                    .device(device.as_raw() as usize)
                    .ok_or(CL_INVALID_VALUE)?;
                match param {
                    device_info::TYPE => Ok(device.device_type.to_ne_bytes().to_vec()),
                    device_info::NAME => Ok(c_string(&device.name)),
                    device_info::EXTENSIONS => Ok(c_string(&device.extensions)),
                    device_info::GFXIP_MAJOR_AMD => scalar_u32(device.gfxip.map(|v| v.0)),
                    device_info::GFXIP_MINOR_AMD => scalar_u32(device.gfxip.map(|v| v.1)),
                    device_info::COMPUTE_CAPABILITY_MAJOR_NV => {
                        scalar_u32(device.compute_capability.map(|v| v.0))
                    }
                    device_info::COMPUTE_CAPABILITY_MINOR_NV => {
                        scalar_u32(device.compute_capability.map(|v| v.1))
                    }
                    _ => Err(CL_INVALID_VALUE),
                }
            }
            InfoTarget::Context(context) => {
                let state = self.state.borrow();
                let context = state
                    .contexts
                    .get(&(context.as_raw() as usize))
                    .ok_or(CL_INVALID_CONTEXT)?;
                match param {
                    context_info::NUM_DEVICES => Ok((context.devices.len() as u32).to_ne_bytes().to_vec()),
                    context_info::DEVICES => Ok(context
                        .devices
                        .iter()
                        .flat_map(|raw| raw.to_ne_bytes())
                        .collect()),
                    _ => Err(CL_INVALID_VALUE),
                }
            }
            InfoTarget::Program(program) => {
                let state = self.state.borrow();
                let program = state
                    .programs
                    .get(&(program.as_raw() as usize))
                    .ok_or(CL_INVALID_PROGRAM)?;
                match param {
                    program_info::BINARY_SIZES => Ok(program.binary.len().to_ne_bytes().to_vec()),
                    _ => Err(CL_INVALID_VALUE),
                }
            }
            InfoTarget::ProgramBuild(program, _) => {
                let state = self.state.borrow();
                let program = state
                    .programs
                    .get(&(program.as_raw() as usize))
                    .ok_or(CL_INVALID_PROGRAM)?;
                match param {
                    program_info::BUILD_LOG => Ok(c_string(&program.log)),
                    _ => Err(CL_INVALID_VALUE),
                }
            }
        }
    }

    fn run_build(
        &self,
        entry_point: &'static str,
        program: ProgramId,
        options: &str,
    ) -> Result<ClStatus> {
        let success_log = self.success_log.clone();
        let mut state = self.state.borrow_mut();
        state.build_calls.push(entry_point);
        state.build_options.push(options.to_string());
        let program = state
            .programs
            .get_mut(&(program.as_raw() as usize))
            .ok_or_else(|| native(entry_point, CL_INVALID_PROGRAM))?;

        if program.source.contains(SYNTAX_ERROR) {
            program.log = FAILURE_LOG.to_string();
            program.binary.clear();
            return Ok(CL_BUILD_PROGRAM_FAILURE);
        }
        program.log = success_log;
        program.binary = format!("BINARY[{}]", program.source.len()).into_bytes();
        Ok(0)
    }
}

impl Driver for FakeDriver {
    fn get_platform_ids(&self, platforms: Option<&mut [PlatformId]>) -> Result<u32> {
        if let Some(out) = platforms {
            for (index, slot) in out.iter_mut().enumerate().take(self.platforms.len()) {
                *slot = self.platform_id(index);
            }
        }
        Ok(self.platforms.len() as u32)
    }

    fn get_device_ids(
        &self,
        platform: PlatformId,
        device_type: DeviceType,
        devices: Option<&mut [DeviceId]>,
    ) -> Result<u32> {
        let index = self
            .platform_index(platform)
            .ok_or_else(|| native("clGetDeviceIDs", CL_INVALID_PLATFORM))?;
        let matching: Vec<DeviceId> = self.platforms[index]
            .devices
            .iter()
            .enumerate()
            .filter(|(_, device)| device.device_type & device_type.bits() != 0)
            .map(|(position, _)| self.device_id(index, position))
            .collect();
        if matching.is_empty() {
            return Err(native("clGetDeviceIDs", CL_DEVICE_NOT_FOUND));
        }
        if let Some(out) = devices {
            for (slot, id) in out.iter_mut().zip(&matching) {
                *slot = *id;
            }
        }
        Ok(matching.len() as u32)
    }

    fn get_info(&self, target: InfoTarget, param: u32, value: Option<&mut [u8]>) -> Result<usize> {
        let bytes = self
            .info_bytes(target, param)
            .map_err(|status| native(target.entry_point(), status))?;
        if let Some(out) = value {
            if out.len() < bytes.len() {
                return Err(native(target.entry_point(), CL_INVALID_VALUE));
            }
            out[..bytes.len()].copy_from_slice(&bytes);
        }
        Ok(bytes.len())
    }

    fn get_program_binary(&self, program: ProgramId, binary: &mut [u8]) -> Result<()> {
        let state = self.state.borrow();
        let program = state
            .programs
            .get(&(program.as_raw() as usize))
            .ok_or_else(|| native("clGetProgramInfo", CL_INVALID_PROGRAM))?;
        if binary.len() < program.binary.len() {
            return Err(native("clGetProgramInfo", CL_INVALID_VALUE));
        }
        binary[..program.binary.len()].copy_from_slice(&program.binary);
        Ok(())
    }

    fn release_device(&self, device: DeviceId) -> Result<()> {
        if !self.release_device {
            return Err(ClccError::unsupported(
                "clReleaseDevice",
                "not exported by the OpenCL library",
            ));
        }
        if self.fail_device_release {
            return Err(native("clReleaseDevice", CL_INVALID_DEVICE));
        }
        let mut state = self.state.borrow_mut();
        *state
            .device_releases
            .entry(device.as_raw() as usize)
            .or_insert(0) += 1;
        Ok(())
    }

    fn create_context(
        &self,
        properties: &[ClContextProperty],
        devices: &[DeviceId],
    ) -> Result<ContextId> {
        let platform = context_platform(properties)
            .and_then(|platform| self.platform_index(platform))
            .ok_or_else(|| native("clCreateContext", CL_INVALID_PLATFORM))?;
        let handle = self.allocate_handle();
        self.state.borrow_mut().contexts.insert(
            handle,
            FakeContext {
                platform,
                devices: devices.iter().map(|id| id.as_raw() as usize).collect(),
            },
        );
        Ok(ContextId::from_raw(handle as RawHandle))
    }

    fn create_context_from_type(
        &self,
        properties: &[ClContextProperty],
        _device_type: DeviceType,
    ) -> Result<ContextId> {
        let platform = context_platform(properties)
            .and_then(|platform| self.platform_index(platform))
            .ok_or_else(|| native("clCreateContextFromType", CL_INVALID_PLATFORM))?;
        if !properties.contains(&context_info::OFFLINE_DEVICES_AMD) {
            return Err(native("clCreateContextFromType", CL_INVALID_VALUE));
        }
        let devices = (0..self.platforms[platform].offline_devices.len())
            .map(|position| self.offline_device_id(platform, position).as_raw() as usize)
            .collect();
        let handle = self.allocate_handle();
        self.state
            .borrow_mut()
            .contexts
            .insert(handle, FakeContext { platform, devices });
        Ok(ContextId::from_raw(handle as RawHandle))
    }

    fn release_context(&self, context: ContextId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        *state
            .context_releases
            .entry(context.as_raw() as usize)
            .or_insert(0) += 1;
        Ok(())
    }

    fn create_program_with_source(&self, context: ContextId, source: &str) -> Result<ProgramId> {
        if self.fail_program_creation {
            return Err(native("clCreateProgramWithSource", CL_OUT_OF_HOST_MEMORY));
        }
        if source.contains('\0') {
            return Err(native("clCreateProgramWithSource", CL_INVALID_VALUE));
        }
        if !self
            .state
            .borrow()
            .contexts
            .contains_key(&(context.as_raw() as usize))
        {
            return Err(native("clCreateProgramWithSource", CL_INVALID_CONTEXT));
        }
        let handle = self.allocate_handle();
        self.state.borrow_mut().programs.insert(
            handle,
            FakeProgram {
                source: source.to_string(),
                log: String::new(),
                binary: Vec::new(),
            },
        );
        Ok(ProgramId::from_raw(handle as RawHandle))
    }

    fn build_program(&self, program: ProgramId, _devices: &[DeviceId], options: &str) -> Result<ClStatus> {
        self.run_build("clBuildProgram", program, options)
    }

    fn compile_program(&self, program: ProgramId, _devices: &[DeviceId], options: &str) -> Result<ClStatus> {
        if !self.compile_program {
            return Err(ClccError::unsupported(
                "clCompileProgram",
                "not exported by the OpenCL library",
            ));
        }
        self.run_build("clCompileProgram", program, options)
    }

    fn release_program(&self, program: ProgramId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        *state
            .program_releases
            .entry(program.as_raw() as usize)
            .or_insert(0) += 1;
        Ok(())
    }

    fn supports(&self, entry_point: OptionalEntryPoint) -> bool {
        match entry_point {
            OptionalEntryPoint::ReleaseDevice => self.release_device,
            OptionalEntryPoint::CompileProgram => self.compile_program,
        }
    }
}

fn platform_raw(index: usize) -> usize {
    (index + 1) * PLATFORM_STRIDE
}

fn native(entry_point: &'static str, status: ClStatus) -> ClccError {
    NativeCallError::new(entry_point, status).into()
}

fn c_string(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

fn scalar_u32(value: Option<u32>) -> std::result::Result<Vec<u8>, ClStatus> {
    value
        .map(|v| v.to_ne_bytes().to_vec())
        .ok_or(CL_INVALID_VALUE)
}

fn context_platform(properties: &[ClContextProperty]) -> Option<PlatformId> {
    properties
        .chunks(2)
        .take_while(|pair| pair[0] != 0)
        .find(|pair| pair[0] == context_info::PLATFORM && pair.len() == 2)
        .map(|pair| PlatformId::from_raw(pair[1] as RawHandle))
}
