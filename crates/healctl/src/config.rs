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
use crate::options::{HealOptions, SCAN_NORMAL_MODE, ScanIntensity};
use crate::render::{OutputMode, Theme};
use crate::scope::HealScope;
use clap::Parser;
use rustfs_madmin::utils::parse_duration;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const CONFIG_DIR_NAME: &str = ".rustfs-healctl";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rustfs-healctl",
    about = "Heal buckets and objects on a RustFS cluster",
    long_about = "Start, monitor or stop a heal sequence on a RustFS cluster.\n\n\
                  With only an alias and no --recursive, prints the status of the background heal.",
    after_help = "EXAMPLES:\n  \
                  rustfs-healctl myrustfs\n  \
                  rustfs-healctl --recursive --scan deep myrustfs/bucket\n  \
                  rustfs-healctl --dry-run -r myrustfs/bucket/prefix/\n  \
                  rustfs-healctl --force-stop myrustfs/bucket",
    version
)]
pub struct Cli {
    /// Heal target, ALIAS[/BUCKET[/PREFIX]]
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    #[arg(long, default_value = SCAN_NORMAL_MODE, help = "Scan intensity: normal or deep")]
    pub scan: String,

    #[arg(short, long, help = "Heal recursively")]
    pub recursive: bool,

    #[arg(short = 'n', long, help = "Only inspect data, do not mutate")]
    pub dry_run: bool,

    #[arg(short = 'f', long, help = "Force start a new heal sequence")]
    pub force_start: bool,

    #[arg(short = 's', long, help = "Force stop a running heal sequence")]
    pub force_stop: bool,

    #[arg(long, help = "Remove dangling objects in heal sequence")]
    pub remove: bool,

    #[arg(long, help = "Print JSON lines instead of human output")]
    pub json: bool,

    #[arg(long, help = "Only print the final report")]
    pub quiet: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,

    #[arg(long, env = "RUSTFS_HEALCTL_CONFIG_DIR", help = "Directory holding config.json")]
    pub config_dir: Option<PathBuf>,

    #[arg(long, default_value = "warn", help = "Log level, overridden by RUST_LOG")]
    pub log_level: String,

    #[arg(long, default_value = "1s", value_parser = parse_duration, help = "Delay between heal status queries")]
    pub poll_interval: Duration,

    #[arg(long, default_value = "us-east-1", help = "Region used to sign admin requests")]
    pub region: String,
}

impl Cli {
    /// Checks what clap cannot: one target and a known scan mode.
    pub fn validate(&self) -> Result<()> {
        if self.targets.len() != 1 {
            return Err(HealError::syntax(format!(
                "exactly one heal target is required, got {}",
                self.targets.len()
            )));
        }
        self.scan.parse::<ScanIntensity>()?;
        if self.region.is_empty() {
            return Err(HealError::syntax("region must not be empty"));
        }
        Ok(())
    }

    pub fn scope(&self) -> Result<HealScope> {
        match self.targets.as_slice() {
            [target] => HealScope::parse(target),
            _ => Err(HealError::syntax("exactly one heal target is required")),
        }
    }

    pub fn heal_options(&self) -> Result<HealOptions> {
        Ok(HealOptions {
            scan_intensity: self.scan.parse()?,
            recursive: self.recursive,
            dry_run: self.dry_run,
            remove_dangling: self.remove,
        })
    }

    /// `--json` wins over `--quiet`.
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Human
        }
    }

    pub fn theme(&self) -> Theme {
        if self.no_color || self.json { Theme::plain() } else { Theme::colored() }
    }

    pub fn log_filter(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }

    /// `--config-dir`, else `$HOME/.rustfs-healctl`.
    pub fn config_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.config_dir {
            return Ok(dir.clone());
        }
        match std::env::var_os("HOME") {
            Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(CONFIG_DIR_NAME)),
            _ => Err(HealError::config("cannot locate the config directory, set --config-dir or HOME")),
        }
    }

    pub fn log_configuration(&self) {
        debug!("heal targets: {:?}", self.targets);
        debug!(
            "scan: {}, recursive: {}, dry run: {}, remove: {}",
            self.scan, self.recursive, self.dry_run, self.remove
        );
        debug!("force start: {}, force stop: {}", self.force_start, self.force_stop);
        debug!("output: {:?}, poll interval: {:?}, region: {}", self.output_mode(), self.poll_interval, self.region);
    }
}
