// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target platforms and the host OS they build on.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A build target platform. Wire names are lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Osx,
    Windows,
    Ubuntu,
}

crate::simple_display! {
    Platform {
        Android => "android",
        Ios => "ios",
        Osx => "osx",
        Windows => "windows",
        Ubuntu => "ubuntu",
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            "osx" => Ok(Platform::Osx),
            "windows" => Ok(Platform::Windows),
            "ubuntu" => Ok(Platform::Ubuntu),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

impl Platform {
    pub fn all() -> [Platform; 5] {
        [
            Platform::Android,
            Platform::Ios,
            Platform::Osx,
            Platform::Windows,
            Platform::Ubuntu,
        ]
    }
}

/// The operating system a worker host runs on.
///
/// Object-store keys under `libs/` and `sdks/` carry one of these as a
/// suffix; only matching archives are mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Darwin,
    Linux,
    Win32,
}

crate::simple_display! {
    HostOs {
        Darwin => "darwin",
        Linux => "linux",
        Win32 => "win32",
    }
}

impl HostOs {
    /// The host OS this binary was compiled for.
    pub fn current() -> HostOs {
        if cfg!(target_os = "macos") {
            HostOs::Darwin
        } else if cfg!(target_os = "windows") {
            HostOs::Win32
        } else {
            HostOs::Linux
        }
    }

    /// Suffix used in object-store keys, e.g. `8.0.0-linux.tar.bz2`.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            HostOs::Darwin => "darwin",
            HostOs::Linux => "linux",
            HostOs::Win32 => "win32",
        }
    }
}

/// The platforms a host OS can build natively.
pub fn host_platforms(os: HostOs) -> Vec<Platform> {
    match os {
        HostOs::Darwin => vec![Platform::Android, Platform::Ios, Platform::Osx],
        HostOs::Linux => vec![Platform::Android, Platform::Ubuntu],
        HostOs::Win32 => vec![Platform::Windows],
    }
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
