// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ragdoll Animator - keyframe editor for demo ragdoll poses
//!
//! # Commands
//!
//! - `ragdoll_animator new` - Create a timeline holding the anchor pose
//! - `ragdoll_animator show` - Print the keyframe grid
//! - `ragdoll_animator add|remove|retime` - Edit keyframe columns
//! - `ragdoll_animator set|unset` - Edit bones within a column
//! - `ragdoll_animator sample` - Print the pose at a time
//! - `ragdoll_animator export` - Write the demo file
//! - `ragdoll_animator play` - Print poses at a fixed frame rate
//! - `ragdoll_animator config` - Print or write the settings file
//!
//! # Usage
//!
//! ```bash
//! ragdoll_animator new
//! ragdoll_animator add 0
//! ragdoll_animator set 1 LRL --pitch 0 --ramp 0.5
//! ragdoll_animator export -o walk.cohdemo
//! ```
//!
//! Logging goes to stderr and is filtered with `RUST_LOG`.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Command, Workspace};
use config::{Settings, CONFIG_FILE_NAME};
use ragdoll_animator_timeline::document::DEFAULT_FILE_NAME;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Ragdoll Animator - keyframe editor for demo ragdoll poses
#[derive(Parser)]
#[command(name = "ragdoll_animator")]
#[command(about = "Keyframe editor for demo ragdoll poses")]
#[command(version)]
struct Cli {
    /// Timeline file
    #[arg(short, long, global = true, default_value = DEFAULT_FILE_NAME)]
    file: PathBuf,

    /// Settings file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragdoll_animator=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!("Starting Ragdoll Animator v{}", env!("CARGO_PKG_VERSION"));

    let workspace = Workspace {
        timeline_path: cli.file,
        settings: Settings::load_or_default(&cli.config)?,
        settings_path: cli.config,
    };
    commands::execute(cli.command, &workspace, &mut std::io::stdout().lock())
}
