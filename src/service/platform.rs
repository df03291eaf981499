//! Target platform mapping
//!
//! Translates .NET runtime identifier architectures to container platforms.

use crate::constants::platform;
use anyhow::Result;

/// Container platform for a .NET architecture token
pub fn target_platform(arch: &str) -> Result<&'static str> {
    match arch {
        "x64" => Ok(platform::LINUX_AMD64),
        "arm64" => Ok(platform::LINUX_ARM64),
        "s390x" => Ok(platform::LINUX_S390X),
        "ppc64le" => Ok(platform::LINUX_PPC64LE),
        _ => anyhow::bail!("Unknown target architecture: {}.", arch),
    }
}
