//! Human-oriented description of the installed platforms and devices

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::build::platform::vendor;
use crate::build::ClStandard;
use crate::opencl::query::{query_string, query_u32, query_u64};
use crate::opencl::types::{device_info, extensions, has_extension, platform_info, DeviceType};
use crate::opencl::{platform_devices, platforms, Device, Driver, InfoTarget, Result};

static PLATFORM_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^OpenCL (\d+)\.(\d+)").expect("valid version pattern"));

#[derive(Debug, Clone, Serialize)]
pub struct PlatformListing {
    /// 1-based position, usable with `-p`
    pub index: usize,
    pub name: String,
    pub driver_name: String,
    pub version: String,
    pub devices: Vec<DeviceListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceListing {
    /// 1-based position, usable with `-d`
    pub index: usize,
    pub device_type: String,
    pub name: String,
    pub architecture: Option<String>,
}

impl DeviceListing {
    pub fn display_name(&self) -> String {
        match &self.architecture {
            Some(architecture) => format!("{} [{}]", self.name, architecture),
            None => self.name.clone(),
        }
    }
}

/// Enumerate platforms and devices, skipping platforms older than `min_standard`
pub fn collect_listing(
    driver: &dyn Driver,
    min_standard: Option<ClStandard>,
    online_only: bool,
) -> Result<Vec<PlatformListing>> {
    let mut listing = Vec::new();

    for (position, platform) in platforms(driver)?.into_iter().enumerate() {
        let target = InfoTarget::Platform(platform);
        let driver_name = query_string(driver, target, platform_info::NAME)?;
        let profile = query_string(driver, target, platform_info::PROFILE)?;
        let version = query_string(driver, target, platform_info::VERSION)?;

        let (version, platform_standard) = describe_version(&version, &profile);
        if let Some(min) = min_standard {
            match platform_standard {
                Some(standard) if standard >= min.version() => {}
                _ => continue,
            }
        }

        let devices = platform_devices(driver, platform, online_only)?
            .into_iter()
            .enumerate()
            .map(|(index, device)| describe_device(driver, index + 1, device))
            .collect::<Result<Vec<_>>>()?;

        listing.push(PlatformListing {
            index: position + 1,
            name: unified_platform_name(&driver_name),
            driver_name,
            version,
            devices,
        });
    }

    Ok(listing)
}

/// Query everything shown for one device, then release it
fn describe_device(driver: &dyn Driver, index: usize, mut device: Device<'_>) -> Result<DeviceListing> {
    let target = InfoTarget::Device(device.id());
    let device_type = query_u64(driver, target, device_info::TYPE)?;
    let name = query_string(driver, target, device_info::NAME)?;

    let architecture = if device_type & DeviceType::GPU.bits() != 0 {
        let device_extensions = query_string(driver, target, device_info::EXTENSIONS)?;
        gpu_architecture(driver, target, &device_extensions)?
    } else {
        None
    };

    device.release();
    Ok(DeviceListing {
        index,
        device_type: device_type_name(device_type),
        name,
        architecture,
    })
}

fn gpu_architecture(
    driver: &dyn Driver,
    target: InfoTarget,
    device_extensions: &str,
) -> Result<Option<String>> {
    if has_extension(device_extensions, extensions::AMD_DEVICE_ATTRIBUTE_QUERY) {
        let major = query_u32(driver, target, device_info::GFXIP_MAJOR_AMD)?;
        let minor = query_u32(driver, target, device_info::GFXIP_MINOR_AMD)?;
        Ok(Some(annotate("GFXIP", major, minor, gfxip_architecture(major))))
    } else if has_extension(device_extensions, extensions::NV_DEVICE_ATTRIBUTE_QUERY) {
        let major = query_u32(driver, target, device_info::COMPUTE_CAPABILITY_MAJOR_NV)?;
        let minor = query_u32(driver, target, device_info::COMPUTE_CAPABILITY_MINOR_NV)?;
        Ok(Some(annotate("SM", major, minor, sm_architecture(major))))
    } else {
        Ok(None)
    }
}

fn annotate(prefix: &str, major: u32, minor: u32, architecture: Option<&str>) -> String {
    match architecture {
        Some(architecture) => format!("{prefix} {major}.{minor}; {architecture}"),
        None => format!("{prefix} {major}.{minor}"),
    }
}

pub fn unified_platform_name(driver_name: &str) -> String {
    let name = match driver_name {
        vendor::AMD => "AMD",
        vendor::NVIDIA => "nVidia",
        vendor::BEIGNET => "Intel Beignet",
        vendor::INTEL => "Intel",
        vendor::APPLE => "Apple",
        vendor::QUALCOMM => "Qualcomm",
        vendor::ARM => "ARM",
        vendor::POCL => "POCL",
        other => return format!("Unknown ({other})"),
    };
    name.to_string()
}

fn unified_profile(profile: &str) -> String {
    match profile {
        "FULL_PROFILE" => "full profile".to_string(),
        "EMBEDDED_PROFILE" => "embedded profile".to_string(),
        other => format!("unknown profile ({other})"),
    }
}

/// `"OpenCL x.y, <profile>"` plus the parsed version, when the driver string
/// follows the `OpenCL <major>.<minor>` convention
pub fn describe_version(version: &str, profile: &str) -> (String, Option<(u32, u32)>) {
    let profile = unified_profile(profile);
    let parsed = PLATFORM_VERSION.captures(version).and_then(|captures| {
        let major = captures[1].parse().ok()?;
        let minor = captures[2].parse().ok()?;
        Some((captures[0].to_string(), (major, minor)))
    });

    match parsed {
        Some((prefix, standard)) => (format!("{prefix}, {profile}"), Some(standard)),
        None => (profile, None),
    }
}

pub fn device_type_name(device_type: u64) -> String {
    // CL_DEVICE_TYPE_DEFAULT may be combined with the real type
    let kind = device_type & !DeviceType::DEFAULT.bits();
    match DeviceType(kind) {
        DeviceType::CPU => "CPU".to_string(),
        DeviceType::GPU => "GPU".to_string(),
        DeviceType::ACCELERATOR => "accelerator".to_string(),
        DeviceType::CUSTOM => "custom".to_string(),
        _ => format!("unknown type (0x{device_type:X})"),
    }
}

pub fn gfxip_architecture(major: u32) -> Option<&'static str> {
    match major {
        4 => Some("VLIW5"),
        5 => Some("VLIW4"),
        6 => Some("GCN 1.0"),
        7 => Some("GCN 1.1"),
        8 => Some("GCN 1.2"),
        9 => Some("GCN 5"),
        _ => None,
    }
}

pub fn sm_architecture(major: u32) -> Option<&'static str> {
    match major {
        1 => Some("Tesla"),
        2 => Some("Fermi"),
        3 => Some("Kepler"),
        5 => Some("Maxwell"),
        6 => Some("Pascal"),
        7 => Some("Volta"),
        8 => Some("Ampere"),
        9 => Some("Hopper"),
        _ => None,
    }
}
