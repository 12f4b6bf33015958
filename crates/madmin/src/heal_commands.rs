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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type HealItemType = String;

pub const HEAL_ITEM_METADATA: &str = "metadata";
pub const HEAL_ITEM_BUCKET: &str = "bucket";
pub const HEAL_ITEM_BUCKET_METADATA: &str = "bucket-metadata";
pub const HEAL_ITEM_OBJECT: &str = "object";

pub const DRIVE_STATE_OK: &str = "ok";
pub const DRIVE_STATE_OFFLINE: &str = "offline";
pub const DRIVE_STATE_CORRUPT: &str = "corrupt";
pub const DRIVE_STATE_MISSING: &str = "missing";

pub const HEAL_NOT_STARTED_STATUS: &str = "not started";
pub const HEAL_RUNNING_STATUS: &str = "running";
pub const HEAL_STOPPED_STATUS: &str = "stopped";
pub const HEAL_FINISHED_STATUS: &str = "finished";

/// Scan mode sent to the server, encoded as an integer on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum HealScanMode {
    Unknown = 0,
    #[default]
    Normal = 1,
    Deep = 2,
}

impl Serialize for HealScanMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for HealScanMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HealScanModeVisitor;

        impl serde::de::Visitor<'_> for HealScanModeVisitor {
            type Value = HealScanMode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an integer between 0 and 2")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match value {
                    0 => Ok(HealScanMode::Unknown),
                    1 => Ok(HealScanMode::Normal),
                    2 => Ok(HealScanMode::Deep),
                    _ => Err(E::custom(format!("invalid HealScanMode value: {value}"))),
                }
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if value < 0 {
                    return Err(E::custom(format!("invalid HealScanMode value: {value}")));
                }
                self.visit_u64(value as u64)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if let Ok(num) = value.parse::<u64>() {
                    return self.visit_u64(num);
                }
                match value {
                    "Unknown" | "unknown" => Ok(HealScanMode::Unknown),
                    "Normal" | "normal" => Ok(HealScanMode::Normal),
                    "Deep" | "deep" => Ok(HealScanMode::Deep),
                    _ => Err(E::custom(format!("invalid HealScanMode string: {value}"))),
                }
            }
        }

        deserializer.deserialize_any(HealScanModeVisitor)
    }
}

/// Options attached to a heal sequence start request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealOpts {
    pub recursive: bool,
    #[serde(rename = "dryRun")]
    pub dry_run: bool,
    pub remove: bool,
    #[serde(rename = "scanMode")]
    pub scan_mode: HealScanMode,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealDriveInfo {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub state: String,
}

impl HealDriveInfo {
    pub fn is_online(&self) -> bool {
        self.state == DRIVE_STATE_OK
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infos {
    #[serde(rename = "drives", default)]
    pub drives: Vec<HealDriveInfo>,
}

impl Infos {
    pub fn online_count(&self) -> usize {
        self.drives.iter().filter(|d| d.is_online()).count()
    }
}

/// One per-item outcome reported by a heal sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealResultItem {
    #[serde(rename = "resultId", default)]
    pub result_index: usize,
    #[serde(rename = "type", default)]
    pub heal_item_type: HealItemType,
    #[serde(rename = "bucket", default)]
    pub bucket: String,
    #[serde(rename = "object", default)]
    pub object: String,
    #[serde(rename = "versionId", default)]
    pub version_id: String,
    #[serde(rename = "detail", default)]
    pub detail: String,
    #[serde(rename = "parityBlocks", default)]
    pub parity_blocks: usize,
    #[serde(rename = "dataBlocks", default)]
    pub data_blocks: usize,
    #[serde(rename = "diskCount", default)]
    pub disk_count: usize,
    #[serde(rename = "setCount", default)]
    pub set_count: usize,
    #[serde(rename = "before", default)]
    pub before: Infos,
    #[serde(rename = "after", default)]
    pub after: Infos,
    /// Size in bytes, or -1 when the server could not determine it.
    #[serde(rename = "objectSize", default)]
    pub object_size: i64,
}

impl HealResultItem {
    /// Number of drives in `ok` state before and after the heal.
    pub fn online_counts(&self) -> (usize, usize) {
        (self.before.online_count(), self.after.online_count())
    }

    /// `bucket/object` path of the item, or just the bucket for bucket items.
    pub fn entity(&self) -> String {
        if self.object.is_empty() {
            self.bucket.clone()
        } else {
            format!("{}/{}", self.bucket, self.object)
        }
    }
}

/// Reply to a heal start request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealStartSuccess {
    #[serde(rename = "clientToken", default)]
    pub client_token: String,
    #[serde(rename = "clientAddress", default)]
    pub client_address: String,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Reply to a force-stop request.
pub type HealStopSuccess = HealStartSuccess;

/// Reply to a heal status query made with a client token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealTaskStatus {
    #[serde(rename = "summary", default)]
    pub summary: String,
    #[serde(rename = "detail", default)]
    pub failure_detail: String,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "settings", default)]
    pub heal_settings: HealOpts,
    #[serde(rename = "items", default)]
    pub items: Vec<HealResultItem>,
}

impl HealTaskStatus {
    pub fn is_finished(&self) -> bool {
        self.summary == HEAL_FINISHED_STATUS
    }

    pub fn is_stopped(&self) -> bool {
        self.summary == HEAL_STOPPED_STATUS
    }
}

/// Snapshot of the always-on background heal routine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgHealState {
    #[serde(rename = "ScannedItemsCount", default)]
    pub scanned_items_count: i64,
    #[serde(rename = "LastHealActivity", default)]
    pub last_heal_activity: DateTime<Utc>,
}
