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

//! Alias lookup: `RUSTFS_HEALCTL_HOST_<alias>` first, then `config.json`.

use crate::client::AdminCredentials;
use crate::error::{HealError, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const HOST_ENV_PREFIX: &str = "RUSTFS_HEALCTL_HOST_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasEntry>,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    pub url: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
}

impl fmt::Debug for AliasEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasEntry")
            .field("url", &self.url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[HIDDEN]")
            .finish()
    }
}

/// Endpoint and credentials an alias points at.
#[derive(Clone, Debug)]
pub struct ResolvedAlias {
    pub endpoint: Url,
    pub credentials: AdminCredentials,
}

impl AliasConfig {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// A missing file is an empty configuration.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no alias config at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(HealError::config(format!("unable to read {}", path.display())).trace([e.to_string()]));
            }
        };
        serde_json::from_slice(&data)
            .map_err(|e| HealError::config(format!("unable to parse {}", path.display())).trace([e.to_string()]))
    }

    pub fn resolve(&self, alias: &str) -> Result<ResolvedAlias> {
        let entry = self
            .aliases
            .get(alias)
            .ok_or_else(|| HealError::config(format!("no such alias `{alias}`")))?;
        let endpoint = parse_endpoint(alias, &entry.url)?;
        Ok(ResolvedAlias {
            endpoint,
            credentials: AdminCredentials {
                access_key: entry.access_key.clone(),
                secret_key: entry.secret_key.clone(),
            },
        })
    }
}

/// Resolves `alias`, letting the environment override the config file.
pub fn resolve_alias(alias: &str, config_dir: &Path) -> Result<ResolvedAlias> {
    let var = format!("{HOST_ENV_PREFIX}{alias}");
    if let Ok(value) = std::env::var(&var) {
        debug!("alias `{}` resolved from {}", alias, var);
        return from_host_url(alias, &value);
    }
    AliasConfig::load(config_dir)?.resolve(alias)
}

/// Parses `http(s)://ACCESS:SECRET@host:port`, taking the credentials out of the URL.
pub fn from_host_url(alias: &str, value: &str) -> Result<ResolvedAlias> {
    let mut endpoint = parse_endpoint(alias, value)?;
    let credentials = AdminCredentials {
        access_key: decode(endpoint.username()),
        secret_key: decode(endpoint.password().unwrap_or_default()),
    };
    // Only fails for URLs that cannot carry userinfo, rejected above.
    let _ = endpoint.set_username("");
    let _ = endpoint.set_password(None);
    Ok(ResolvedAlias { endpoint, credentials })
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

fn parse_endpoint(alias: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| HealError::config(format!("invalid URL for alias `{alias}`")).trace([e.to_string()]))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(HealError::config(format!(
            "alias `{alias}` must point at an http or https endpoint, got `{}`",
            url.scheme()
        )));
    }
    Ok(url)
}
