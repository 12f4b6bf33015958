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

//! Final messages printed when an invocation ends.

use super::theme::{Theme, ThemeKey};
use crate::error::HealError;
use crate::heal::{AggregateState, HealthClass};
use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use rustfs_madmin::heal_commands::BgHealState;
use rustfs_madmin::utils::humanize_duration;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

const STATUS_SUCCESS: &str = "success";
const STATUS_PARTIAL: &str = "partial";
const STATUS_DETACHED: &str = "detached";
const STATUS_ERROR: &str = "error";

pub trait Report {
    fn render_human(&self, theme: &Theme) -> String;

    /// One-line JSON document.
    fn render_structured(&self) -> String;
}

fn to_json_line<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("report structs serialize to JSON")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StopHealMessage {
    pub status: &'static str,
    pub alias: String,
}

impl StopHealMessage {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS,
            alias: alias.into(),
        }
    }
}

impl Report for StopHealMessage {
    fn render_human(&self, theme: &Theme) -> String {
        theme.paint(ThemeKey::HealStopped, &format!("Heal stopped successfully at `{}`.", self.alias))
    }

    fn render_structured(&self) -> String {
        to_json_line(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BackgroundHealStatusMessage {
    pub status: &'static str,
    #[serde(rename = "HealInfo")]
    pub heal_info: BgHealState,
    #[serde(skip)]
    now: DateTime<Utc>,
}

impl BackgroundHealStatusMessage {
    pub fn new(heal_info: BgHealState) -> Self {
        Self {
            status: STATUS_SUCCESS,
            heal_info,
            now: Utc::now(),
        }
    }

    /// Reference time used for the "ago" line.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn since_last_activity(&self) -> Duration {
        // Clock skew between client and server can make this negative.
        (self.now - self.heal_info.last_heal_activity).to_std().unwrap_or_default()
    }
}

impl Report for BackgroundHealStatusMessage {
    fn render_human(&self, theme: &Theme) -> String {
        let mut out = theme.paint(ThemeKey::HealBackgroundTitle, "Background healing status:");
        out.push('\n');
        let _ = writeln!(
            out,
            "  Total items scanned: {}",
            theme.paint(ThemeKey::HealBackground, &self.heal_info.scanned_items_count.to_string())
        );
        let _ = write!(
            out,
            "  Last background heal check: {}",
            theme.paint(
                ThemeKey::HealBackground,
                &format!("{} ago", humanize_duration(self.since_last_activity()))
            )
        );
        out
    }

    fn render_structured(&self) -> String {
        to_json_line(self)
    }
}

/// Totals of a followed sequence, complete or not.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealSummaryMessage {
    pub status: &'static str,
    pub alias: String,
    pub elapsed_seconds: u64,
    pub summary: AggregateState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip)]
    elapsed: Duration,
}

impl HealSummaryMessage {
    pub fn completed(alias: impl Into<String>, summary: AggregateState, elapsed: Duration) -> Self {
        Self::with_status(STATUS_SUCCESS, alias, summary, elapsed)
    }

    /// Partial totals of a sequence that ended in failure.
    pub fn partial(alias: impl Into<String>, summary: AggregateState, elapsed: Duration) -> Self {
        Self::with_status(STATUS_PARTIAL, alias, summary, elapsed)
    }

    pub fn detached(alias: impl Into<String>, summary: AggregateState, elapsed: Duration, hint: impl Into<String>) -> Self {
        let mut msg = Self::with_status(STATUS_DETACHED, alias, summary, elapsed);
        msg.hint = Some(hint.into());
        msg
    }

    fn with_status(status: &'static str, alias: impl Into<String>, summary: AggregateState, elapsed: Duration) -> Self {
        Self {
            status,
            alias: alias.into(),
            elapsed_seconds: elapsed.as_secs(),
            summary,
            hint: None,
            elapsed,
        }
    }

    fn title(&self, theme: &Theme) -> String {
        match self.status {
            STATUS_SUCCESS => theme.paint(ThemeKey::Heal, &format!("Heal completed at `{}`.", self.alias)),
            STATUS_DETACHED => theme.paint(ThemeKey::HealDetached, &format!("Stopped watching heal at `{}`.", self.alias)),
            _ => theme.paint(ThemeKey::Error, &format!("Heal did not complete at `{}`.", self.alias)),
        }
    }
}

/// `green 3, yellow 1, ...` with each class in its own colour.
pub fn health_counts(summary: &AggregateState, theme: &Theme) -> String {
    HealthClass::DISPLAY_ORDER
        .iter()
        .map(|class| {
            theme.paint(
                ThemeKey::Health(*class),
                &format!("{} {}", class, summary.health_count(*class)),
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Report for HealSummaryMessage {
    fn render_human(&self, theme: &Theme) -> String {
        let s = &self.summary;
        let mut out = self.title(theme);
        out.push('\n');
        let _ = writeln!(
            out,
            "  Scanned:  {} items, {} objects, {}",
            s.items_scanned,
            s.objects_scanned,
            ByteSize::b(s.bytes_scanned)
        );
        let _ = writeln!(
            out,
            "  Healed:   {}/{} objects, {} items",
            s.objects_healed, s.objects_scanned, s.items_healed
        );
        if s.items_failed > 0 {
            let _ = writeln!(
                out,
                "  Failed:   {}",
                theme.paint(ThemeKey::Error, &format!("{} items", s.items_failed))
            );
        }
        let _ = writeln!(out, "  Health:   {}", health_counts(s, theme));
        if !s.objects_by_online_drives.is_empty() {
            out.push_str("  Online drives after heal:\n");
            for (drives, count) in &s.objects_by_online_drives {
                let _ = writeln!(out, "    {drives:>3} drives: {count} items");
            }
        }
        let _ = write!(out, "  Elapsed:  {}", humanize_duration(self.elapsed));
        if let Some(hint) = &self.hint {
            out.push('\n');
            out.push_str(&theme.paint(ThemeKey::HealDetached, hint));
        }
        out
    }

    fn render_structured(&self) -> String {
        to_json_line(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorMessage {
    pub status: &'static str,
    pub error: HealError,
    #[serde(skip)]
    program: String,
}

impl ErrorMessage {
    pub fn new(program: impl Into<String>, error: HealError) -> Self {
        Self {
            status: STATUS_ERROR,
            error,
            program: program.into(),
        }
    }
}

impl Report for ErrorMessage {
    fn render_human(&self, theme: &Theme) -> String {
        let mut out = format!(
            "{}: {} {}",
            self.program,
            theme.paint(ThemeKey::Error, "<ERROR>"),
            self.error.message
        );
        for (i, line) in self.error.context.iter().enumerate() {
            let _ = write!(out, "\n ({i}) {line}");
        }
        out
    }

    fn render_structured(&self) -> String {
        to_json_line(self)
    }
}
