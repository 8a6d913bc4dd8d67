//! CLI command definitions for inspection-lineage
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands;
//! [`commands::execute`] runs one against an [`Engine`](crate::engine::Engine).

pub mod commands;

use crate::format::OutputFormat;
use crate::types::TaskStatus;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Inspection lineage resolution and task adjudication
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Acting user id (overrides INSPECTION_LINEAGE_USER)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the deduplicated checklist of an inspection and its ancestors
    Resolve {
        inspection: String,
    },

    /// Create a follow-up inspection carrying the resolved checklist
    FollowUp(FollowUpArgs),

    /// Set a task's status (re-selecting the current status reverts to pending)
    Mark(MarkArgs),

    /// Mark a task done, or not done with --undo
    Complete {
        task: String,

        #[arg(long)]
        undo: bool,
    },

    /// Add a note to a task's history
    Note {
        task: String,
        text: String,
    },

    /// Show a task's activity, oldest first
    History {
        task: String,
    },

    /// Inventory and vendor needs over failed tasks
    Report {
        inspection: String,
    },
}

/// Arguments for the follow-up subcommand
#[derive(Args, Debug)]
pub struct FollowUpArgs {
    /// Inspection to follow up
    pub inspection: String,

    /// Scheduled start as RFC 3339 (default: now)
    #[arg(long, value_name = "TIME")]
    pub scheduled_at: Option<String>,
}

/// Status choices for the mark subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarkStatus {
    Pass,
    Fail,
    Pending,
}

impl From<MarkStatus> for TaskStatus {
    fn from(status: MarkStatus) -> Self {
        match status {
            MarkStatus::Pass => TaskStatus::Pass,
            MarkStatus::Fail => TaskStatus::Fail,
            MarkStatus::Pending => TaskStatus::Pending,
        }
    }
}

/// Arguments for the mark subcommand
#[derive(Args, Debug)]
pub struct MarkArgs {
    pub task: String,

    #[arg(value_enum)]
    pub status: MarkStatus,

    /// Why the item failed (required for fail)
    #[arg(short, long)]
    pub note: Option<String>,

    /// User responsible for the fix (required for fail)
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Inventory quantity needed (required for inventory items)
    #[arg(short, long)]
    pub quantity: Option<i64>,

    /// Attachment id backing a failure
    #[arg(long)]
    pub attachment: Option<String>,
}
