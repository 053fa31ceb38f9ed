//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Packline using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Packline - packing-list quantity engine
#[derive(Parser, Debug)]
#[command(name = "packline")]
#[command(version, about, long_about = None)]
#[command(author = "Packline Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "packline.toml", env = "PACKLINE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PACKLINE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a packing list, persist its lines and reconcile linked projects
    Sync(commands::sync::SyncArgs),

    /// Recompute a project's export quantity from the packing ledger
    Reconcile(commands::reconcile::ReconcileArgs),

    /// Delete one packing line and reconcile its project
    DeleteLine(commands::delete::DeleteLineArgs),

    /// Delete every line of a packing code on a date
    DeleteGroup(commands::delete::DeleteGroupArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show project inventory quantities
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
