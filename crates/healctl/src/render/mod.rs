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

//! Live progress and final reports.
//!
//! The renderer only formats; the controller owns all state. Output is
//! best effort: a broken pipe never changes the outcome of a heal.

pub mod report;
pub mod theme;

pub use report::{BackgroundHealStatusMessage, ErrorMessage, HealSummaryMessage, Report, StopHealMessage, health_counts};
pub use theme::{Style, Theme, ThemeKey};

use crate::error::HealError;
use crate::heal::controller::DEFAULT_PROGRAM_NAME;
use crate::heal::{AggregateState, Outcome, ProgressObserver};
use bytesize::ByteSize;
use rustfs_madmin::heal_commands::HealResultItem;
use rustfs_madmin::utils::humanize_duration;
use serde::Serialize;
use std::io::{self, Write};
use std::time::{Duration, Instant};
use tracing::warn;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
const ERASE_LINE: &str = "\r\x1b[2K";
const MAX_ENTITY_WIDTH: usize = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Redrawn status line, then a human summary.
    #[default]
    Human,
    /// One JSON document per item and per report.
    Json,
    /// Final report only.
    Quiet,
}

#[derive(Serialize)]
struct HealItemMessage<'a> {
    status: &'static str,
    #[serde(flatten)]
    item: &'a HealResultItem,
}

pub struct Renderer<W = io::Stdout, E = io::Stderr> {
    out: W,
    err: E,
    mode: OutputMode,
    theme: Theme,
    program: String,
    started: Instant,
    frame: usize,
    live_line: bool,
    last_entity: String,
}

impl Renderer {
    pub fn stdio(mode: OutputMode, theme: Theme) -> Self {
        Renderer::new(io::stdout(), io::stderr(), mode, theme)
    }
}

impl<W: Write, E: Write> Renderer<W, E> {
    pub fn new(out: W, err: E, mode: OutputMode, theme: Theme) -> Self {
        Self {
            out,
            err,
            mode,
            theme,
            program: DEFAULT_PROGRAM_NAME.to_string(),
            started: Instant::now(),
            frame: 0,
            live_line: false,
            last_entity: String::new(),
        }
    }

    pub fn with_program_name(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }

    pub fn update(&mut self, aggregate: &AggregateState, batch: &[HealResultItem]) {
        match self.mode {
            OutputMode::Quiet => {}
            OutputMode::Json => {
                for item in batch {
                    let line = serde_json::to_string(&HealItemMessage { status: "success", item })
                        .expect("heal items serialize to JSON");
                    write_best_effort(&mut self.out, &format!("{line}\n"));
                }
            }
            OutputMode::Human => {
                if let Some(last) = batch.last() {
                    self.last_entity = last.entity();
                }
                let line = self.progress_line(aggregate);
                write_best_effort(&mut self.out, &format!("{ERASE_LINE}{line}"));
                self.live_line = true;
                self.frame = self.frame.wrapping_add(1);
            }
        }
    }

    fn progress_line(&self, aggregate: &AggregateState) -> String {
        let glyph = SPINNER[self.frame % SPINNER.len()].to_string();
        format!(
            "{} {} | {}/{} objects healed; {} in {} | {}",
            self.theme.paint(ThemeKey::HealUpdateUI, &glyph),
            truncate_left(&self.last_entity, MAX_ENTITY_WIDTH),
            aggregate.objects_healed,
            aggregate.objects_scanned,
            ByteSize::b(aggregate.bytes_scanned),
            humanize_duration(self.elapsed()),
            health_counts(aggregate, &self.theme),
        )
    }

    fn clear_live_line(&mut self) {
        if self.live_line {
            write_best_effort(&mut self.out, ERASE_LINE);
            self.live_line = false;
        }
    }

    /// Prints a report in the current mode, replacing the live line.
    pub fn emit(&mut self, report: &dyn Report) {
        self.clear_live_line();
        let text = match self.mode {
            OutputMode::Json => report.render_structured(),
            OutputMode::Human | OutputMode::Quiet => report.render_human(&self.theme),
        };
        write_best_effort(&mut self.out, &format!("{text}\n"));
    }

    /// Prints the final report for `outcome`. Failures only get their partial totals here.
    pub fn finish(&mut self, locator: &str, outcome: &Outcome) {
        let elapsed = self.elapsed();
        match outcome {
            Outcome::Background(state) => self.emit(&BackgroundHealStatusMessage::new(state.clone())),
            Outcome::Stopped { alias } => self.emit(&StopHealMessage::new(alias.clone())),
            Outcome::Completed { aggregate, .. } => {
                self.emit(&HealSummaryMessage::completed(locator, aggregate.clone(), elapsed))
            }
            Outcome::Failed { aggregate, .. } => self.emit(&HealSummaryMessage::partial(locator, aggregate.clone(), elapsed)),
            Outcome::Detached { aggregate, resume_hint } => self.emit(&HealSummaryMessage::detached(
                locator,
                aggregate.clone(),
                elapsed,
                resume_hint.clone(),
            )),
        }
    }

    /// JSON errors go to stdout next to the other documents, human ones to stderr.
    pub fn render_error(&mut self, error: &HealError) {
        self.clear_live_line();
        let msg = ErrorMessage::new(self.program.clone(), error.clone());
        match self.mode {
            OutputMode::Json => write_best_effort(&mut self.out, &format!("{}\n", msg.render_structured())),
            OutputMode::Human | OutputMode::Quiet => {
                write_best_effort(&mut self.err, &format!("{}\n", msg.render_human(&self.theme)))
            }
        }
    }
}

impl<W: Write, E: Write> ProgressObserver for Renderer<W, E> {
    fn on_progress(&mut self, aggregate: &AggregateState, batch: &[HealResultItem]) {
        self.update(aggregate, batch);
    }
}

fn write_best_effort<T: Write>(out: &mut T, text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        warn!("failed to write heal output: {}", e);
    }
}

/// Keeps the tail of `s`, which is the part that changes between items.
fn truncate_left(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (width - 3)).collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AdminError;
    use crate::heal::FailureReason;
    use rustfs_madmin::heal_commands::{HEAL_ITEM_OBJECT, HealDriveInfo, Infos};
    use serde_json::Value;

    fn renderer(mode: OutputMode) -> Renderer<Vec<u8>, Vec<u8>> {
        Renderer::new(Vec::new(), Vec::new(), mode, Theme::plain())
    }

    fn item(object: &str) -> HealResultItem {
        let drives = Infos {
            drives: vec![
                HealDriveInfo {
                    state: "ok".to_string(),
                    ..Default::default()
                };
                4
            ],
        };
        HealResultItem {
            heal_item_type: HEAL_ITEM_OBJECT.to_string(),
            bucket: "bucket".to_string(),
            object: object.to_string(),
            parity_blocks: 2,
            data_blocks: 2,
            disk_count: 4,
            set_count: 1,
            before: drives.clone(),
            after: drives,
            object_size: 100,
            ..Default::default()
        }
    }

    fn stdout(r: Renderer<Vec<u8>, Vec<u8>>) -> String {
        String::from_utf8(r.into_inner().0).unwrap()
    }

    #[test]
    fn test_human_live_line_rotates_glyph() {
        let mut r = renderer(OutputMode::Human);
        let batch = [item("a.txt")];
        let mut state = AggregateState::new();
        state.fold(&batch);
        r.update(&state, &batch);
        r.update(&state, &[]);

        let out = stdout(r);
        let lines: Vec<&str> = out.split(ERASE_LINE).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("| bucket/a.txt | 0/1 objects healed;"));
        assert!(lines[1].starts_with("/ bucket/a.txt"));
        assert!(lines[1].contains("green 1, yellow 0"));
        assert!(!out.contains('\n'));
    }

    #[test]
    fn test_json_mode_prints_one_line_per_item() {
        let mut r = renderer(OutputMode::Json);
        let batch = [item("a"), item("b")];
        r.update(&AggregateState::new(), &batch);

        let out = stdout(r);
        let lines: Vec<Value> = out.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[1]["object"], "b");
        assert_eq!(lines[1]["type"], "object");
    }

    #[test]
    fn test_quiet_mode_only_prints_final_report() {
        let mut r = renderer(OutputMode::Quiet);
        let batch = [item("a")];
        let mut state = AggregateState::new();
        state.fold(&batch);
        r.update(&state, &batch);
        r.finish(
            "myrustfs/bucket",
            &Outcome::Completed {
                aggregate: state,
                status: Default::default(),
            },
        );

        let out = stdout(r);
        assert!(out.starts_with("Heal completed at `myrustfs/bucket`."));
        assert!(!out.contains(ERASE_LINE));
    }

    #[test]
    fn test_finish_clears_live_line() {
        let mut r = renderer(OutputMode::Human);
        r.update(&AggregateState::new(), &[item("a")]);
        r.finish(
            "myrustfs/bucket",
            &Outcome::Stopped {
                alias: "myrustfs/bucket".to_string(),
            },
        );
        let out = stdout(r);
        assert!(out.ends_with(&format!("{ERASE_LINE}Heal stopped successfully at `myrustfs/bucket`.\n")));
    }

    #[test]
    fn test_failed_outcome_renders_partial_totals_and_error() {
        let mut r = renderer(OutputMode::Human);
        let outcome = Outcome::Failed {
            reason: FailureReason::Transport(AdminError::Transport("reset".to_string())),
            aggregate: AggregateState::new(),
        };
        r.finish("myrustfs/bucket", &outcome);
        let Outcome::Failed { reason, .. } = outcome else { unreachable!() };
        r.render_error(&reason.into_error("myrustfs/bucket"));

        let (out, err) = r.into_inner();
        assert!(String::from_utf8(out).unwrap().starts_with("Heal did not complete at `myrustfs/bucket`."));
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("rustfs-healctl: <ERROR> Unable to display heal status."));
        assert!(err.contains(" (1) request failed: reset"));
    }

    #[test]
    fn test_json_error_goes_to_stdout() {
        let mut r = renderer(OutputMode::Json);
        r.render_error(&HealError::syntax("bad target"));
        let (out, err) = r.into_inner();
        assert!(err.is_empty());
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "syntax");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_swallowed() {
        let mut r = Renderer::new(BrokenPipe, BrokenPipe, OutputMode::Human, Theme::plain());
        r.update(&AggregateState::new(), &[item("a")]);
        r.finish("myrustfs", &Outcome::Stopped { alias: "myrustfs".to_string() });
        r.render_error(&HealError::transport("offline"));
    }

    #[test]
    fn test_truncate_left() {
        assert_eq!(truncate_left("short", 10), "short");
        assert_eq!(truncate_left("bucket/very/long/path", 10), "...ng/path");
        assert_eq!(truncate_left("ééééééééééé", 5), "...éé");
    }
}
