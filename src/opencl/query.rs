//! Two-phase property queries
//!
//! Every OpenCL `clGet*Info` call follows the same protocol: ask for the size
//! with a null buffer, allocate, then ask again for the data. Scalars skip the
//! probe since their width is fixed by the API.

use std::mem::size_of;

use tracing::trace;

use super::driver::{Driver, InfoTarget};
use super::error::{ClccError, NativeCallError, Result};
use super::types::{program_info, ProgramId, CL_INVALID_VALUE};

/// Expected layout of a queried parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoShape {
    /// Fixed-width integer of `size` bytes (1, 2, 4 or 8)
    Scalar { size: usize },
    /// NUL-terminated character data
    String,
    /// Raw bytes of driver-defined length
    Blob,
}

/// Decoded query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoValue {
    Scalar(u64),
    String(String),
    Blob(Vec<u8>),
}

impl InfoValue {
    pub fn as_scalar(&self) -> Option<u64> {
        match self {
            InfoValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            InfoValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Vec<u8>> {
        match self {
            InfoValue::Blob(value) => Some(value),
            _ => None,
        }
    }
}

/// Issue one property query in the requested shape
pub fn query(
    driver: &dyn Driver,
    target: InfoTarget,
    param: u32,
    shape: InfoShape,
) -> Result<InfoValue> {
    trace!("Querying {:?} param 0x{:04X} as {:?}", target, param, shape);
    match shape {
        InfoShape::Scalar { size } => query_scalar(driver, target, param, size).map(InfoValue::Scalar),
        InfoShape::String => {
            let raw = fetch_two_phase(driver, target, param, 1)?;
            Ok(InfoValue::String(decode_c_string(&raw)))
        }
        InfoShape::Blob => fetch_two_phase(driver, target, param, 0).map(InfoValue::Blob),
    }
}

pub fn query_string(driver: &dyn Driver, target: InfoTarget, param: u32) -> Result<String> {
    let raw = fetch_two_phase(driver, target, param, 1)?;
    Ok(decode_c_string(&raw))
}

pub fn query_blob(driver: &dyn Driver, target: InfoTarget, param: u32) -> Result<Vec<u8>> {
    fetch_two_phase(driver, target, param, 0)
}

pub fn query_u32(driver: &dyn Driver, target: InfoTarget, param: u32) -> Result<u32> {
    query_scalar(driver, target, param, size_of::<u32>()).map(|value| value as u32)
}

pub fn query_u64(driver: &dyn Driver, target: InfoTarget, param: u32) -> Result<u64> {
    query_scalar(driver, target, param, size_of::<u64>())
}

pub fn query_usize(driver: &dyn Driver, target: InfoTarget, param: u32) -> Result<usize> {
    query_scalar(driver, target, param, size_of::<usize>()).map(|value| value as usize)
}

/// Binary produced for the single device a program was built for
pub fn program_binary(driver: &dyn Driver, program: ProgramId) -> Result<Vec<u8>> {
    let size = query_usize(driver, InfoTarget::Program(program), program_info::BINARY_SIZES)?;
    let mut binary = vec![0u8; size];
    if size > 0 {
        driver.get_program_binary(program, &mut binary)?;
    }
    Ok(binary)
}

fn query_scalar(driver: &dyn Driver, target: InfoTarget, param: u32, size: usize) -> Result<u64> {
    if !matches!(size, 1 | 2 | 4 | 8) {
        return Err(invalid_value(target));
    }
    let mut buffer = [0u8; 8];
    driver.get_info(target, param, Some(&mut buffer[..size]))?;

    let value = match size {
        1 => buffer[0] as u64,
        2 => u16::from_ne_bytes([buffer[0], buffer[1]]) as u64,
        4 => u32::from_ne_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as u64,
        _ => u64::from_ne_bytes(buffer),
    };
    Ok(value)
}

/// Probe the size, then fetch into a buffer with `guard` spare bytes that are
/// never offered to the driver
fn fetch_two_phase(
    driver: &dyn Driver,
    target: InfoTarget,
    param: u32,
    guard: usize,
) -> Result<Vec<u8>> {
    let size = driver.get_info(target, param, None)?;
    let mut buffer = vec![0u8; size + guard];
    if size > 0 {
        driver.get_info(target, param, Some(&mut buffer[..size]))?;
    }
    buffer.truncate(size);
    Ok(buffer)
}

fn decode_c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn invalid_value(target: InfoTarget) -> ClccError {
    NativeCallError::new(target.entry_point(), CL_INVALID_VALUE).into()
}
