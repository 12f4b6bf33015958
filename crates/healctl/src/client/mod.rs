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

//! Admin control plane as seen by the heal controller.
//!
//! [`AdminClient`] is the only seam the controller talks through; the
//! production implementation is [`HttpAdminClient`], tests script their own.

mod rest;
pub mod signer;

pub use rest::{AdminCredentials, HttpAdminClient};

use crate::error::ErrorKind;
use async_trait::async_trait;
use rustfs_madmin::heal_commands::{BgHealState, HealOpts, HealStartSuccess, HealTaskStatus};
use thiserror::Error;

pub const ADMIN_PREFIX: &str = "/rustfs/admin";

/// Parameters of one heal control request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealRequest {
    pub bucket: String,
    pub prefix: String,
    pub opts: HealOpts,
    pub client_token: String,
    pub force_start: bool,
    pub force_stop: bool,
}

impl HealRequest {
    /// A request with a token and no force flag queries a running sequence.
    pub fn is_status_query(&self) -> bool {
        !self.client_token.is_empty() && !self.force_start && !self.force_stop
    }
}

/// What the server handed back for a heal request.
///
/// Start and stop requests fill `start`; status queries fill `status`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HealReply {
    pub start: HealStartSuccess,
    pub status: HealTaskStatus,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("client token `{token}` is no longer valid: {message}")]
    TokenMismatch { token: String, message: String },

    #[error("admin API returned {status} {code}: {message}")]
    Api { status: u16, code: String, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unable to decode admin response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid admin request: {0}")]
    InvalidRequest(String),
}

impl AdminError {
    /// Errors the server answered with are sequence-level, the rest never reached it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::TokenMismatch { .. } | AdminError::Api { .. } => ErrorKind::Sequence,
            AdminError::Transport(_) | AdminError::Decode(_) | AdminError::InvalidRequest(_) => ErrorKind::Transport,
        }
    }
}

impl From<reqwest::Error> for AdminError {
    fn from(err: reqwest::Error) -> Self {
        AdminError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait AdminClient: Send + Sync {
    /// Start, stop or poll a heal sequence.
    ///
    /// Status queries may block until the server has new results.
    async fn heal(&self, request: &HealRequest) -> Result<HealReply, AdminError>;

    async fn background_heal_status(&self) -> Result<BgHealState, AdminError>;
}

#[async_trait]
impl<T: AdminClient + ?Sized> AdminClient for std::sync::Arc<T> {
    async fn heal(&self, request: &HealRequest) -> Result<HealReply, AdminError> {
        (**self).heal(request).await
    }

    async fn background_heal_status(&self) -> Result<BgHealState, AdminError> {
        (**self).background_heal_status().await
    }
}
