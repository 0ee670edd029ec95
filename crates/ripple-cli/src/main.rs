// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ripple CLI entrypoint.
//!
//! Developer tooling for recorded feeds:
//!
//! - `ripple record <in.jsonl> <out.rpl>` converts a JSON-lines fixture into a
//!   checksummed packet log.
//! - `ripple replay <log>` drives a log through a session with one view and
//!   prints every change, then the final view.
//! - `ripple inspect <log>` prints the decoded events.
//!
//! Logs are read by extension: `.jsonl`/`.json` are JSON lines, anything else
//! is a packet log. Diagnostics go to stderr (`RUST_LOG` controls the level);
//! stdout carries only command output. Exits non-zero on error.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod feed;
mod render;
mod replay;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::render::{event_line, Format};
use crate::replay::ReplayArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "Record, replay, and inspect Ripple feed logs")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a JSON-lines feed into a packet log
    Record {
        /// JSON-lines input
        input: PathBuf,
        /// Output log (packets unless the extension says JSON lines)
        output: PathBuf,
    },
    /// Replay a feed log into a view and print its changes
    Replay(ReplayArgs),
    /// Print the events of a feed log
    Inspect {
        /// Feed log to read
        log: PathBuf,
        /// Output style
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Record { input, output } => {
            let events = feed::load(&input)?;
            feed::save(&output, &events)?;
            info!(events = events.len(), output = %output.display(), "recorded");
            println!("recorded {} events to {}", events.len(), output.display());
        }
        Command::Replay(replay) => replay::run(replay).await?,
        Command::Inspect { log, format } => {
            for (index, event) in feed::load(&log)?.iter().enumerate() {
                println!("{}", event_line(index, event, format)?);
            }
        }
    }
    Ok(())
}
