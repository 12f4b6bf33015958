// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::HealError;
use rustfs_madmin::heal_commands::{HealOpts, HealScanMode};
use std::fmt;
use std::str::FromStr;

pub const SCAN_NORMAL_MODE: &str = "normal";
pub const SCAN_DEEP_MODE: &str = "deep";

/// How thoroughly the server inspects each object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanIntensity {
    /// Detect objects missing on one or more drives.
    #[default]
    Normal,
    /// Also detect silent data corruption.
    Deep,
}

impl ScanIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanIntensity::Normal => SCAN_NORMAL_MODE,
            ScanIntensity::Deep => SCAN_DEEP_MODE,
        }
    }
}

impl FromStr for ScanIntensity {
    type Err = HealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            SCAN_NORMAL_MODE => Ok(ScanIntensity::Normal),
            SCAN_DEEP_MODE => Ok(ScanIntensity::Deep),
            other => Err(HealError::syntax(format!(
                "unknown scan mode `{other}`, expected `{SCAN_NORMAL_MODE}` or `{SCAN_DEEP_MODE}`"
            ))),
        }
    }
}

impl fmt::Display for ScanIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ScanIntensity> for HealScanMode {
    fn from(value: ScanIntensity) -> Self {
        match value {
            ScanIntensity::Normal => HealScanMode::Normal,
            ScanIntensity::Deep => HealScanMode::Deep,
        }
    }
}

/// Options chosen once per invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealOptions {
    pub scan_intensity: ScanIntensity,
    pub recursive: bool,
    pub dry_run: bool,
    pub remove_dangling: bool,
}

impl From<HealOptions> for HealOpts {
    fn from(value: HealOptions) -> Self {
        HealOpts {
            recursive: value.recursive,
            dry_run: value.dry_run,
            remove: value.remove_dangling,
            scan_mode: value.scan_intensity.into(),
        }
    }
}
