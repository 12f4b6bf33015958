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

use rustfs_madmin::heal_commands::{
    HEAL_ITEM_BUCKET, HEAL_ITEM_BUCKET_METADATA, HEAL_ITEM_METADATA, HEAL_ITEM_OBJECT, HealResultItem,
};
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_PARITY_SHARDS: usize = 8;

/// Post-heal health of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthClass {
    /// Every parity shard is available.
    Green,
    /// Some parity shards are missing, data is still redundant.
    Yellow,
    /// Exactly enough shards to read the data, no redundancy left.
    Red,
    /// Fewer shards than needed to read the data.
    Grey,
    /// Could not be classified from the reported layout.
    Unknown,
}

impl HealthClass {
    /// Order used when displaying counts.
    pub const DISPLAY_ORDER: [HealthClass; 5] = [
        HealthClass::Green,
        HealthClass::Yellow,
        HealthClass::Red,
        HealthClass::Grey,
        HealthClass::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthClass::Green => "green",
            HealthClass::Yellow => "yellow",
            HealthClass::Red => "red",
            HealthClass::Grey => "grey",
            HealthClass::Unknown => "unknown",
        }
    }

    /// Colour code for `surplus` shards beyond the read quorum out of `parity`.
    pub fn from_surplus(surplus: isize, parity: isize) -> Option<HealthClass> {
        if parity < 1 || parity > MAX_PARITY_SHARDS as isize || surplus > parity {
            return None;
        }
        Some(match surplus {
            s if s < 0 => HealthClass::Grey,
            0 => HealthClass::Red,
            s if s == parity => HealthClass::Green,
            _ => HealthClass::Yellow,
        })
    }
}

impl fmt::Display for HealthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Object,
    Bucket,
    Metadata,
    Other,
}

impl ItemKind {
    pub fn from_wire(heal_item_type: &str) -> Self {
        match heal_item_type {
            HEAL_ITEM_OBJECT => ItemKind::Object,
            HEAL_ITEM_BUCKET => ItemKind::Bucket,
            HEAL_ITEM_METADATA | HEAL_ITEM_BUCKET_METADATA => ItemKind::Metadata,
            _ => ItemKind::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// More drives hold a valid copy after the heal than before.
    Healed,
    /// Nothing needed to change.
    Clean,
    /// The server attached an error to the item.
    Failed,
}

impl Disposition {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Disposition::Failed)
    }
}

/// Reduced form of a [`HealResultItem`], everything the aggregate needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemResult {
    pub kind: ItemKind,
    pub disposition: Disposition,
    pub health: HealthClass,
    pub online_before: usize,
    pub online_after: usize,
    pub object_size: i64,
}

impl ItemResult {
    pub fn classify(item: &HealResultItem) -> Self {
        let kind = ItemKind::from_wire(&item.heal_item_type);
        let (online_before, online_after) = item.online_counts();

        let disposition = if !item.detail.is_empty() {
            Disposition::Failed
        } else if online_after > online_before {
            Disposition::Healed
        } else {
            Disposition::Clean
        };

        let health = match kind {
            ItemKind::Bucket | ItemKind::Metadata => replicated_health(item, online_after),
            ItemKind::Object | ItemKind::Other => erasure_health(item, online_after),
        }
        .unwrap_or(HealthClass::Unknown);

        Self {
            kind,
            disposition,
            health,
            online_before,
            online_after,
            object_size: item.object_size,
        }
    }
}

fn erasure_health(item: &HealResultItem, online: usize) -> Option<HealthClass> {
    let surplus = online as isize - item.data_blocks as isize;
    HealthClass::from_surplus(surplus, item.parity_blocks as isize)
}

// Buckets and metadata are replicated on every drive of a set, so the read
// quorum is a simple majority per set.
fn replicated_health(item: &HealResultItem, online: usize) -> Option<HealthClass> {
    if item.set_count == 0 {
        return None;
    }
    let per_set = (item.disk_count / item.set_count) as isize;
    let quorum = per_set / 2 + 1;
    let surplus = (online / item.set_count) as isize - quorum;
    HealthClass::from_surplus(surplus, per_set - quorum)
}
