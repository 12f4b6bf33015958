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

use super::signer::sign_v4;
use super::{ADMIN_PREFIX, AdminClient, AdminError, HealReply, HealRequest};
use async_trait::async_trait;
use http::Method;
use rustfs_madmin::heal_commands::{BgHealState, HealStartSuccess, HealTaskStatus};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const INVALID_CLIENT_TOKEN_CODES: [&str; 2] = ["XRustFSHealInvalidClientToken", "XMinioHealInvalidClientToken"];

#[derive(Clone, Default)]
pub struct AdminCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[HIDDEN]")
            .finish()
    }
}

/// Error payload returned by the admin API, either as JSON or S3-style XML.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

impl ApiErrorBody {
    fn parse(body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            return parsed;
        }
        let trimmed = body.trim();
        if trimmed.starts_with('<') {
            match quick_xml::de::from_str::<ApiErrorBody>(trimmed) {
                Ok(parsed) if !parsed.code.is_empty() || !parsed.message.is_empty() => return parsed,
                Ok(_) => {}
                Err(e) => debug!("admin error body is not XML: {}", e),
            }
        }
        Self {
            code: String::new(),
            message: trimmed.to_string(),
        }
    }
}

fn is_token_mismatch(code: &str, message: &str) -> bool {
    INVALID_CLIENT_TOKEN_CODES.contains(&code) || message.to_lowercase().contains("client token mismatch")
}

fn decode_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AdminError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Admin client speaking the RustFS admin REST API.
#[derive(Debug, Clone)]
pub struct HttpAdminClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: AdminCredentials,
    region: String,
    poll_interval: Duration,
}

impl HttpAdminClient {
    pub fn new(endpoint: Url, credentials: AdminCredentials, region: impl Into<String>) -> Result<Self, AdminError> {
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AdminError::InvalidRequest(format!("unsupported endpoint `{endpoint}`")));
        }
        let http = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint,
            credentials,
            region: region.into(),
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Minimum delay before each status query; zero disables pacing.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn admin_url(&self, segments: &[&str]) -> Result<Url, AdminError> {
        let mut url = self.endpoint.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| AdminError::InvalidRequest(format!("endpoint `{}` cannot carry a path", self.endpoint)))?;
            path.pop_if_empty();
            path.extend(ADMIN_PREFIX.trim_start_matches('/').split('/'));
            path.extend(segments);
        }
        Ok(url)
    }

    pub(crate) fn heal_url(&self, request: &HealRequest) -> Result<Url, AdminError> {
        let mut segments = vec!["v3", "heal", request.bucket.as_str()];
        if !request.prefix.is_empty() {
            segments.push(request.prefix.as_str());
        }
        let mut url = self.admin_url(&segments)?;

        let mut query: Vec<(&str, &str)> = Vec::new();
        if !request.client_token.is_empty() {
            query.push(("clientToken", request.client_token.as_str()));
        }
        // The admin API rejects forceStart together with forceStop.
        if request.force_start && !request.force_stop {
            query.push(("forceStart", "true"));
        }
        if request.force_stop {
            query.push(("forceStop", "true"));
        }
        if !query.is_empty() {
            let encoded = serde_urlencoded::to_string(&query)
                .map_err(|e| AdminError::InvalidRequest(format!("cannot encode heal query: {e}")))?;
            url.set_query(Some(&encoded));
        }
        Ok(url)
    }

    async fn execute(&self, method: Method, url: Url, body: Vec<u8>) -> Result<Vec<u8>, AdminError> {
        let mut req = http::Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body)
            .map_err(|e| AdminError::InvalidRequest(e.to_string()))?;
        sign_v4(
            &mut req,
            &self.credentials.access_key,
            &self.credentials.secret_key,
            &self.region,
            OffsetDateTime::now_utc(),
        )?;

        debug!("admin request: {} {}", req.method(), url);
        let req = reqwest::Request::try_from(req)?;
        let resp = self.http.execute(req).await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let err = ApiErrorBody::parse(&String::from_utf8_lossy(&bytes));
        warn!("admin API error, status: {}, code: {}, message: {}", status, err.code, err.message);
        Err(AdminError::Api {
            status: status.as_u16(),
            code: err.code,
            message: err.message,
        })
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn heal(&self, request: &HealRequest) -> Result<HealReply, AdminError> {
        if request.force_start && request.force_stop {
            debug!("dropping forceStart from a forceStop request at {}/{}", request.bucket, request.prefix);
        }

        let status_query = request.is_status_query();
        if status_query && !self.poll_interval.is_zero() {
            tokio::time::sleep(self.poll_interval).await;
        }

        let url = self.heal_url(request)?;
        let body = if request.client_token.is_empty() {
            serde_json::to_vec(&request.opts)?
        } else {
            Vec::new()
        };

        let bytes = match self.execute(Method::POST, url, body).await {
            Ok(bytes) => bytes,
            Err(AdminError::Api { code, message, .. }) if status_query && is_token_mismatch(&code, &message) => {
                return Err(AdminError::TokenMismatch {
                    token: request.client_token.clone(),
                    message,
                });
            }
            Err(e) => return Err(e),
        };

        if status_query {
            let status: HealTaskStatus = decode_or_default(&bytes)?;
            Ok(HealReply {
                status,
                ..Default::default()
            })
        } else {
            let start: HealStartSuccess = decode_or_default(&bytes)?;
            Ok(HealReply {
                start,
                ..Default::default()
            })
        }
    }

    async fn background_heal_status(&self) -> Result<BgHealState, AdminError> {
        let url = self.admin_url(&["v3", "background-heal", "status"])?;
        let bytes = self.execute(Method::POST, url, Vec::new()).await?;
        decode_or_default(&bytes)
    }
}
