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

use super::aggregate::AggregateState;
use crate::client::{AdminClient, AdminError, HealRequest};
use crate::error::{HealError, Result};
use crate::options::HealOptions;
use crate::scope::HealScope;
use rustfs_madmin::heal_commands::{BgHealState, HealOpts, HealResultItem, HealTaskStatus};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_PROGRAM_NAME: &str = "rustfs-healctl";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    BackgroundQuery,
    Starting,
    Polling,
    Completed,
    Stopped,
    Failed,
    Detached,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SequenceState::Idle => "idle",
            SequenceState::BackgroundQuery => "background-query",
            SequenceState::Starting => "starting",
            SequenceState::Polling => "polling",
            SequenceState::Completed => "completed",
            SequenceState::Stopped => "stopped",
            SequenceState::Failed => "failed",
            SequenceState::Detached => "detached",
        };
        f.write_str(s)
    }
}

/// Continuation token of the sequence being followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceHandle {
    pub client_token: String,
}

/// Why a followed sequence ended without completing.
#[derive(Debug)]
pub enum FailureReason {
    /// The server marked the sequence as stopped; `detail` is its diagnostic.
    Sequence { detail: String, status: Box<HealTaskStatus> },
    /// Another client force-started a sequence for the same scope.
    TokenInvalidated { token: String, message: String },
    /// The status query itself failed.
    Transport(AdminError),
}

impl FailureReason {
    pub fn into_error(self, locator: &str) -> HealError {
        match self {
            FailureReason::Sequence { detail, status } => {
                if detail.is_empty() {
                    return HealError::sequence("Unable to display heal status.").trace([locator]);
                }
                let err = HealError::sequence(format!("Heal had an error - {detail}")).trace([locator]);
                // Serializing a derived wire struct cannot fail.
                let trace = serde_json::to_string_pretty(&status).expect("heal status serializes to JSON");
                err.trace([trace])
            }
            FailureReason::TokenInvalidated { token, message } => {
                HealError::sequence("Heal sequence was replaced by another client.")
                    .trace([locator.to_string(), format!("client token {token}: {message}")])
            }
            FailureReason::Transport(e) => {
                HealError::new(e.kind(), "Unable to display heal status.").trace([locator.to_string(), e.to_string()])
            }
        }
    }
}

/// Terminal result of one invocation.
#[derive(Debug)]
pub enum Outcome {
    Background(BgHealState),
    Stopped { alias: String },
    Completed { aggregate: AggregateState, status: HealTaskStatus },
    Failed { reason: FailureReason, aggregate: AggregateState },
    Detached { aggregate: AggregateState, resume_hint: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Background(_) | Outcome::Stopped { .. } | Outcome::Completed { .. })
    }
}

/// Receives the running aggregate after every folded batch.
pub trait ProgressObserver {
    fn on_progress(&mut self, aggregate: &AggregateState, batch: &[HealResultItem]);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&AggregateState, &[HealResultItem]),
{
    fn on_progress(&mut self, aggregate: &AggregateState, batch: &[HealResultItem]) {
        self(aggregate, batch)
    }
}

/// Drives one heal invocation from `Idle` to a terminal [`Outcome`].
pub struct SequenceController<C> {
    client: C,
    scope: HealScope,
    options: HealOptions,
    force_start: bool,
    force_stop: bool,
    cancel: CancellationToken,
    program: String,
    state: SequenceState,
}

impl<C: AdminClient> SequenceController<C> {
    pub fn new(client: C, scope: HealScope, options: HealOptions) -> Self {
        Self {
            client,
            scope,
            options,
            force_start: false,
            force_stop: false,
            cancel: CancellationToken::new(),
            program: DEFAULT_PROGRAM_NAME.to_string(),
            state: SequenceState::Idle,
        }
    }

    pub fn with_force_start(mut self, force_start: bool) -> Self {
        self.force_start = force_start;
        self
    }

    pub fn with_force_stop(mut self, force_stop: bool) -> Self {
        self.force_stop = force_stop;
        self
    }

    /// Cancelling the token detaches from the sequence; the server keeps healing.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_program_name(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn scope(&self) -> &HealScope {
        &self.scope
    }

    fn transition(&mut self, next: SequenceState) {
        debug!("heal sequence for {}: {} -> {}", self.scope, self.state, next);
        self.state = next;
    }

    fn wants_background_status(&self) -> bool {
        self.scope.is_cluster_wide() && !self.options.recursive && !self.force_start && !self.force_stop
    }

    fn request(&self, client_token: &str, force_start: bool, force_stop: bool) -> HealRequest {
        HealRequest {
            bucket: self.scope.bucket.clone(),
            prefix: self.scope.prefix.clone(),
            opts: HealOpts::from(self.options),
            client_token: client_token.to_string(),
            force_start,
            force_stop,
        }
    }

    /// Command that reattaches to a backgrounded sequence.
    pub fn resume_hint(&self) -> String {
        let mut flags = String::new();
        if self.options.recursive {
            flags.push_str("--recursive ");
        }
        if self.options.dry_run {
            flags.push_str("--dry-run ");
        }
        format!(
            "Healing is backgrounded, to resume watching use `{} {}{}`",
            self.program, flags, self.scope
        )
    }

    pub async fn run(&mut self, observer: &mut dyn ProgressObserver) -> Result<Outcome> {
        if self.state != SequenceState::Idle {
            return Err(HealError::sequence(format!("heal controller already ran, state: {}", self.state)));
        }

        if self.wants_background_status() {
            return self.query_background().await;
        }

        if self.force_stop {
            return self.stop().await;
        }

        let mut aggregate = AggregateState::new();
        let handle = self.start(observer, &mut aggregate).await?;
        self.follow(handle, aggregate, observer).await
    }

    async fn query_background(&mut self) -> Result<Outcome> {
        if self.options != HealOptions::default() {
            warn!("no bucket and no --recursive given, heal flags are ignored and background heal status is shown");
        }
        self.transition(SequenceState::BackgroundQuery);

        match self.client.background_heal_status().await {
            Ok(state) => Ok(Outcome::Background(state)),
            Err(e) => {
                self.transition(SequenceState::Failed);
                Err(HealError::new(e.kind(), "Failed to get the status of the background heal.")
                    .trace([self.scope.to_string(), e.to_string()]))
            }
        }
    }

    async fn stop(&mut self) -> Result<Outcome> {
        if self.force_start {
            warn!("both --force-start and --force-stop given, stopping the running heal sequence only");
        }

        let request = self.request("", self.force_start, true);
        match self.client.heal(&request).await {
            Ok(_) => {
                info!("heal sequence stopped at {}", self.scope);
                self.transition(SequenceState::Stopped);
                Ok(Outcome::Stopped {
                    alias: self.scope.to_string(),
                })
            }
            Err(e) => {
                self.transition(SequenceState::Failed);
                Err(HealError::new(e.kind(), "Failed to stop heal sequence.").trace([self.scope.to_string(), e.to_string()]))
            }
        }
    }

    async fn start(&mut self, observer: &mut dyn ProgressObserver, aggregate: &mut AggregateState) -> Result<SequenceHandle> {
        self.transition(SequenceState::Starting);

        let request = self.request("", self.force_start, false);
        let reply = match self.client.heal(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                self.transition(SequenceState::Failed);
                return Err(
                    HealError::new(e.kind(), "Failed to start heal sequence.").trace([self.scope.to_string(), e.to_string()])
                );
            }
        };

        if reply.start.client_token.is_empty() {
            self.transition(SequenceState::Failed);
            return Err(HealError::transport("Failed to start heal sequence.")
                .trace([self.scope.to_string(), "server returned an empty client token".to_string()]));
        }

        info!(
            "heal sequence started at {}, client token: {}, force start: {}",
            self.scope, reply.start.client_token, self.force_start
        );

        aggregate.fold(&reply.status.items);
        observer.on_progress(aggregate, &reply.status.items);

        Ok(SequenceHandle {
            client_token: reply.start.client_token,
        })
    }

    async fn follow(
        &mut self,
        handle: SequenceHandle,
        mut aggregate: AggregateState,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Outcome> {
        self.transition(SequenceState::Polling);
        let request = self.request(&handle.client_token, false, false);

        loop {
            let reply = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                reply = self.client.heal(&request) => Some(reply),
            };
            let Some(reply) = reply else {
                self.transition(SequenceState::Detached);
                return Ok(Outcome::Detached {
                    aggregate,
                    resume_hint: self.resume_hint(),
                });
            };

            let status = match reply {
                Ok(reply) => reply.status,
                Err(AdminError::TokenMismatch { token, message }) => {
                    warn!("client token {} was invalidated: {}", token, message);
                    self.transition(SequenceState::Failed);
                    return Ok(Outcome::Failed {
                        reason: FailureReason::TokenInvalidated { token, message },
                        aggregate,
                    });
                }
                Err(e) => {
                    warn!("heal status query for {} failed: {}", self.scope, e);
                    self.transition(SequenceState::Failed);
                    return Ok(Outcome::Failed {
                        reason: FailureReason::Transport(e),
                        aggregate,
                    });
                }
            };

            aggregate.fold(&status.items);
            observer.on_progress(&aggregate, &status.items);

            if status.is_finished() {
                self.transition(SequenceState::Completed);
                return Ok(Outcome::Completed { aggregate, status });
            }

            if status.is_stopped() {
                self.transition(SequenceState::Failed);
                return Ok(Outcome::Failed {
                    reason: FailureReason::Sequence {
                        detail: status.failure_detail.clone(),
                        status: Box::new(status),
                    },
                    aggregate,
                });
            }
        }
    }
}
