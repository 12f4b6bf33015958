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

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, error::ErrorKind as ClapErrorKind};
use rustfs_healctl::alias::resolve_alias;
use rustfs_healctl::{Cli, HealError, HttpAdminClient, Outcome, Renderer, SequenceController};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    init_tracing(&cli)?;

    if let Err(e) = cli.validate() {
        error!("invalid arguments: {}", e);
        print_usage_help(&e);
        std::process::exit(e.exit_code());
    }

    cli.log_configuration();

    let code = run(cli).await;
    debug!("exiting with code {}", code);
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let mut renderer = Renderer::stdio(cli.output_mode(), cli.theme());
    match heal(&cli, &mut renderer).await {
        Ok(code) => code,
        Err(e) => {
            renderer.render_error(&e);
            e.exit_code()
        }
    }
}

async fn heal(cli: &Cli, renderer: &mut Renderer) -> rustfs_healctl::Result<i32> {
    let scope = cli.scope()?;
    let options = cli.heal_options()?;
    let alias = resolve_alias(&scope.alias, &cli.config_dir()?)?;

    let client = HttpAdminClient::new(alias.endpoint, alias.credentials, cli.region.clone())
        .map_err(|e| HealError::new(e.kind(), "Unable to initialize admin connection.").trace([scope.alias.clone(), e.to_string()]))?
        .with_poll_interval(cli.poll_interval);
    info!("using admin endpoint {} for alias `{}`", client.endpoint(), scope.alias);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, detaching from heal sequence");
                cancel.cancel();
            }
        }
    });

    let mut controller = SequenceController::new(client, scope.clone(), options)
        .with_force_start(cli.force_start)
        .with_force_stop(cli.force_stop)
        .with_cancellation(cancel);

    let outcome = controller.run(renderer).await?;
    renderer.finish(&scope.locator, &outcome);

    match outcome {
        Outcome::Failed { reason, .. } => Err(reason.into_error(&scope.locator)),
        outcome if outcome.is_success() => Ok(0),
        _ => Ok(1),
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = if cli.debug {
        EnvFilter::try_new(cli.log_filter())
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(cli.log_filter()))
    }
    .context("Failed to create log filter")?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set global tracing subscriber")?;

    Ok(())
}

fn print_usage_help(err: &HealError) {
    let _ = Cli::command().write_help(&mut std::io::stderr());
    eprintln!();
    eprintln!("rustfs-healctl: {err}");
}
