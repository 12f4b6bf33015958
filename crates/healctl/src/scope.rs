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

use crate::error::{HealError, Result};
use std::fmt;

/// Heal target resolved from an `alias[/bucket[/prefix]]` locator.
///
/// An empty bucket always comes with an empty prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealScope {
    pub alias: String,
    pub bucket: String,
    pub prefix: String,
    /// The locator as typed, with `/` separators.
    pub locator: String,
}

impl HealScope {
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.replace('\\', "/");
        let mut parts = locator.splitn(3, '/');
        let alias = parts.next().unwrap_or_default().to_string();
        let bucket = parts.next().unwrap_or_default().to_string();
        let prefix = parts.next().unwrap_or_default().to_string();

        if alias.is_empty() {
            return Err(HealError::syntax(format!("missing alias in target `{locator}`")));
        }
        if bucket.is_empty() && !prefix.is_empty() {
            return Err(HealError::syntax(format!("prefix given without a bucket in target `{locator}`")));
        }

        Ok(Self {
            alias,
            bucket,
            prefix,
            locator,
        })
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.bucket.is_empty()
    }
}

impl fmt::Display for HealScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}
