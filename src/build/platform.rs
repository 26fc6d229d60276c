//! Target platform resolution

use tracing::debug;

use crate::opencl::query::query_string;
use crate::opencl::types::platform_info;
use crate::opencl::{Driver, InfoTarget, PlatformId, Result, SelectionError};

/// Driver-reported platform names of the vendors the tool knows about
pub mod vendor {
    pub const AMD: &str = "AMD Accelerated Parallel Processing";
    pub const NVIDIA: &str = "NVIDIA CUDA";
    pub const INTEL: &str = "Intel(R) OpenCL";
    pub const BEIGNET: &str = "Intel Gen OCL Driver";
    pub const APPLE: &str = "Apple";
    pub const QUALCOMM: &str = "QUALCOMM Snapdragon(TM)";
    pub const ARM: &str = "ARM Platform";
    pub const POCL: &str = "Portable Computing Language";
}

/// Vendor aliases accepted by `-p`, matched case-insensitively
const PLATFORM_ALIASES: &[(&str, &str)] = &[
    ("amd", vendor::AMD),
    ("intel", vendor::INTEL),
    ("beignet", vendor::BEIGNET),
    ("nv", vendor::NVIDIA),
    ("nvidia", vendor::NVIDIA),
    ("apple", vendor::APPLE),
    ("pocl", vendor::POCL),
    ("qcom", vendor::QUALCOMM),
    ("qualcomm", vendor::QUALCOMM),
    ("arm", vendor::ARM),
];

/// Parsed `-p` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSelector {
    /// 1-based position in driver enumeration order
    Ordinal(i64),
    /// Vendor alias together with the platform name it stands for
    Vendor {
        alias: String,
        driver_name: &'static str,
    },
}

impl PlatformSelector {
    pub fn parse(value: &str) -> std::result::Result<Self, SelectionError> {
        let value = value.trim();
        if let Ok(ordinal) = value.parse::<i64>() {
            return Ok(PlatformSelector::Ordinal(ordinal));
        }
        match driver_name_for_alias(value) {
            Some(driver_name) => Ok(PlatformSelector::Vendor {
                alias: value.to_string(),
                driver_name,
            }),
            None => Err(SelectionError::UnknownAlias {
                value: value.to_string(),
                aliases: alias_list(),
            }),
        }
    }
}

pub fn driver_name_for_alias(alias: &str) -> Option<&'static str> {
    PLATFORM_ALIASES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(alias))
        .map(|(_, driver_name)| *driver_name)
}

fn alias_list() -> String {
    PLATFORM_ALIASES
        .iter()
        .map(|(alias, _)| *alias)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick one platform out of `platforms` according to `target`
pub fn select_platform(
    driver: &dyn Driver,
    platforms: &[PlatformId],
    target: Option<&str>,
) -> Result<PlatformId> {
    if platforms.is_empty() {
        return Err(SelectionError::NoPlatforms.into());
    }

    let Some(target) = target else {
        return match platforms {
            [only] => Ok(*only),
            _ => Err(SelectionError::AmbiguousPlatform {
                count: platforms.len(),
            }
            .into()),
        };
    };

    match PlatformSelector::parse(target)? {
        PlatformSelector::Ordinal(ordinal) => {
            if ordinal <= 0 {
                return Err(SelectionError::NonPositivePlatform {
                    value: target.to_string(),
                }
                .into());
            }
            usize::try_from(ordinal)
                .ok()
                .and_then(|ordinal| platforms.get(ordinal - 1))
                .copied()
                .ok_or_else(|| {
                    SelectionError::PlatformOutOfRange {
                        value: target.to_string(),
                        count: platforms.len(),
                    }
                    .into()
                })
        }
        PlatformSelector::Vendor { alias, driver_name } => {
            for &platform in platforms {
                let name = platform_name(driver, platform)?;
                if name == driver_name {
                    debug!("Platform alias {} resolved to {:?}", alias, platform);
                    return Ok(platform);
                }
            }
            Err(SelectionError::PlatformUnavailable {
                alias,
                driver_name: driver_name.to_string(),
            }
            .into())
        }
    }
}

pub fn platform_name(driver: &dyn Driver, platform: PlatformId) -> Result<String> {
    query_string(driver, InfoTarget::Platform(platform), platform_info::NAME)
}
