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

use super::health::{HealthClass, ItemKind, ItemResult};
use rustfs_madmin::heal_commands::HealResultItem;
use serde::Serialize;
use std::collections::BTreeMap;

/// Running totals of a heal sequence.
///
/// Memory is bounded by the number of distinct drive counts and health
/// classes, never by the number of items folded. Every counter only grows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateState {
    pub items_scanned: u64,
    pub items_healed: u64,
    pub items_failed: u64,
    pub objects_scanned: u64,
    pub objects_healed: u64,
    pub bytes_scanned: u64,
    /// Successful items keyed by how many drives hold a valid copy after the heal.
    pub objects_by_online_drives: BTreeMap<usize, u64>,
    pub items_by_health: BTreeMap<HealthClass, u64>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a batch of wire items. Never fails.
    pub fn fold<'a, I>(&mut self, items: I)
    where
        I: IntoIterator<Item = &'a HealResultItem>,
    {
        for item in items {
            self.fold_result(&ItemResult::classify(item));
        }
    }

    pub fn fold_result(&mut self, result: &ItemResult) {
        self.items_scanned += 1;

        if result.kind == ItemKind::Object {
            self.objects_scanned += 1;
            // Size is -1 when the server could not stat the object.
            if result.object_size > 0 {
                self.bytes_scanned += result.object_size as u64;
            }
        }

        if result.disposition.succeeded() {
            *self.objects_by_online_drives.entry(result.online_after).or_insert(0) += 1;
            if result.online_after > result.online_before {
                self.items_healed += 1;
                if result.kind == ItemKind::Object {
                    self.objects_healed += 1;
                }
            }
        } else {
            self.items_failed += 1;
        }

        *self.items_by_health.entry(result.health).or_insert(0) += 1;
    }

    /// Adds another partial aggregate into this one.
    pub fn merge(&mut self, other: &AggregateState) {
        self.items_scanned += other.items_scanned;
        self.items_healed += other.items_healed;
        self.items_failed += other.items_failed;
        self.objects_scanned += other.objects_scanned;
        self.objects_healed += other.objects_healed;
        self.bytes_scanned += other.bytes_scanned;
        for (drives, count) in &other.objects_by_online_drives {
            *self.objects_by_online_drives.entry(*drives).or_insert(0) += count;
        }
        for (class, count) in &other.items_by_health {
            *self.items_by_health.entry(*class).or_insert(0) += count;
        }
    }

    pub fn health_count(&self, class: HealthClass) -> u64 {
        self.items_by_health.get(&class).copied().unwrap_or(0)
    }

    pub fn online_drive_count(&self, drives: usize) -> u64 {
        self.objects_by_online_drives.get(&drives).copied().unwrap_or(0)
    }
}
