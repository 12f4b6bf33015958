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

//! Client-side controller for RustFS heal sequences.
//!
//! A [`SequenceController`] starts, follows or stops one heal sequence through
//! an [`AdminClient`], folding reported items into an [`AggregateState`] that a
//! [`Renderer`] turns into live progress and a final report.

pub mod alias;
pub mod client;
pub mod config;
pub mod error;
pub mod heal;
pub mod options;
pub mod render;
pub mod scope;

pub use client::{AdminClient, AdminCredentials, AdminError, HealReply, HealRequest, HttpAdminClient};
pub use config::Cli;
pub use error::{ErrorKind, HealError, Result};
pub use heal::{AggregateState, FailureReason, HealthClass, Outcome, ProgressObserver, SequenceController, SequenceState};
pub use options::{HealOptions, ScanIntensity};
pub use render::{OutputMode, Renderer, Theme};
pub use scope::HealScope;
