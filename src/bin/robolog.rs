// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Robolog CLI
//!
//! Command-line tool for MCAP and ROS1 bag files.
//!
//! ## Usage
//!
//! ```sh
//! # Show file information
//! robolog info file.mcap
//!
//! # Keep two topics within a time window
//! robolog filter in.mcap --include-topic /imu --include-topic /odom \
//!     --start-time 10 --end-time 20 -o out.mcap
//!
//! # Sort by topic and log time
//! robolog sort in.mcap --by-topic --log-time -o sorted.mcap
//!
//! # Rebuild a damaged file
//! robolog recover broken.mcap -o fixed.mcap
//!
//! # Convert formats
//! robolog convert input.bag output.mcap
//! ```

mod cmd;
mod common;

use std::process;

use clap::{Parser, Subcommand};
use cmd::{ConvertCmd, FilterCmd, InfoCmd, InspectCmd, MergeCmd, RecoverCmd, SortCmd, StructureCmd};
use common::Result;

/// Robolog - MCAP and ROS1 bag toolkit
///
/// Work with robotics log containers through a unified interface.
/// Formats are detected from file magic, not extensions.
#[derive(Parser, Clone)]
#[command(name = "robolog")]
#[command(about = "Toolkit for MCAP and ROS1 bag files", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Show statistics, duration and per-topic frequency
    Info(InfoCmd),

    /// Keep messages matching topics and a time window
    Filter(FilterCmd),

    /// Sort an MCAP file by topic and/or log time
    Sort(SortCmd),

    /// Merge files of one format into a single container
    Merge(MergeCmd),

    /// Rebuild a clean container from a damaged file
    Recover(RecoverCmd),

    /// Dump the record structure
    Structure(StructureCmd),

    /// Dump the record structure with chunk and summary details
    Inspect(InspectCmd),

    /// Convert between .bag and .mcap
    Convert(ConvertCmd),
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Info(cmd) => cmd.run(),
        Commands::Filter(cmd) => cmd.run(),
        Commands::Sort(cmd) => cmd.run(),
        Commands::Merge(cmd) => cmd.run(),
        Commands::Recover(cmd) => cmd.run(),
        Commands::Structure(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run(),
        Commands::Convert(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
