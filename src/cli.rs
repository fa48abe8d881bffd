//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::audit::ActionKind;
use crate::models::SizeBucket;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Queueboard - routing-queue statistics and membership editor
///
/// Reads queue configuration from the lead-routing API, prints
/// per-queue / per-rep pivots and participation tables, and edits
/// queue membership with an audit trail.
///
/// Examples:
///   queueboard stats
///   queueboard stats --workspace CS --size 51-100 --format json
///   queueboard set-weight --queue-id q1 --member-id u1 --weight 40
///   queueboard assign --queue-id q1 --rep "Ada Lovelace" --weight 50
///   queueboard audit --action weight --user ops@
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .queueboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token for the routing API
    #[arg(long, env = "CHILI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Routing API base URL
    #[arg(long, value_name = "URL", env = "QUEUEBOARD_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Acting user recorded in the audit log
    #[arg(long, value_name = "USER", env = "QUEUEBOARD_ACTOR", global = true)]
    pub actor: Option<String>,

    /// Audit log file (JSON lines)
    #[arg(long, value_name = "FILE", env = "QUEUEBOARD_AUDIT_LOG", global = true)]
    pub audit_log: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print queue statistics
    Stats(StatsArgs),

    /// List the values the stats filters accept
    Filters,

    /// Set a uniform weight for members of a queue
    SetWeight(SetWeightArgs),

    /// Change a member's order (not supported by the routing API; no-op)
    SetOrder(SetOrderArgs),

    /// Remove members from a queue
    Unassign(UnassignArgs),

    /// Add members to a queue
    Assign(AssignArgs),

    /// Show the audit log
    Audit(AuditArgs),

    /// Generate a default .queueboard.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct StatsArgs {
    /// Workspace label to show ("All" for every workspace)
    ///
    /// Defaults to general.default_workspace from the config (Sales).
    #[arg(short, long, value_name = "LABEL")]
    pub workspace: Option<String>,

    /// Only show this rep ("All" for everyone)
    #[arg(short, long, value_name = "NAME")]
    pub rep: Option<String>,

    /// Size bucket: 1-50, 51-100, "101 and above", "No Size" or All
    #[arg(short, long, value_name = "BUCKET")]
    pub size: Option<String>,

    /// Section of the report to print
    #[arg(long, default_value = "all")]
    pub section: Section,

    /// Column the per-queue rep tables are sorted by
    #[arg(long, default_value = "order", value_name = "COLUMN")]
    pub sort_by: SortKey,

    /// Sort the per-queue rep tables in descending order
    #[arg(long)]
    pub descending: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SetWeightArgs {
    #[arg(long, value_name = "ID")]
    pub queue_id: String,

    /// Member id (repeatable)
    #[arg(long = "member-id", value_name = "ID", required = true)]
    pub member_ids: Vec<String>,

    /// New weight (1-100)
    #[arg(long)]
    pub weight: u32,

    /// Queue name for the audit log (looked up when omitted)
    #[arg(long, value_name = "NAME")]
    pub queue_name: Option<String>,

    /// Rep name for the audit log (looked up when omitted)
    #[arg(long, value_name = "NAME")]
    pub rep_name: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SetOrderArgs {
    #[arg(long, value_name = "ID")]
    pub queue_id: String,

    #[arg(long, value_name = "ID")]
    pub member_id: String,

    #[arg(long)]
    pub order: i64,
}

#[derive(clap::Args, Debug, Clone)]
pub struct UnassignArgs {
    #[arg(long, value_name = "ID")]
    pub queue_id: String,

    /// Member id (repeatable)
    #[arg(long = "member-id", value_name = "ID", required = true)]
    pub member_ids: Vec<String>,

    /// Confirm the removal; it cannot be undone
    #[arg(long)]
    pub yes: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AssignArgs {
    #[arg(long, value_name = "ID")]
    pub queue_id: String,

    /// Member id (repeatable)
    #[arg(long = "member-id", value_name = "ID", required_unless_present = "reps")]
    pub member_ids: Vec<String>,

    /// Rep name (repeatable), resolved to a member id from the current snapshot
    #[arg(long = "rep", value_name = "NAME", conflicts_with = "member_ids")]
    pub reps: Vec<String>,

    /// Weight (1-100) applied to every added member; unweighted when omitted
    #[arg(long)]
    pub weight: Option<u32>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct AuditArgs {
    /// Only rows from this day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,

    /// Only rows of this action: weight, remove, add
    #[arg(long, value_name = "ACTION")]
    pub action: Option<ActionKind>,

    /// Only rows whose user contains this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    pub user: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report section for `stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Section {
    /// Every section
    #[default]
    All,
    /// Queues and their reps
    Queues,
    /// Reps and their queues
    Reps,
    /// Rep x queue weight tables
    Participation,
    /// Member count per queue
    RepsByQueue,
    /// Distribution of queue sizes
    QueuesBySize,
    /// Headline counters
    Overall,
}

/// Sort column for the per-queue rep tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    /// Rep name
    Name,
    Weight,
    /// Routing order (default)
    #[default]
    Order,
}

/// "All" (any case) and empty mean no filter.
pub fn parse_selection(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Command::Stats(stats) => {
                if let Some(size) = parse_selection(stats.size.as_deref()) {
                    size.parse::<SizeBucket>()?;
                }
            }
            Command::SetWeight(args) => validate_weight(args.weight)?,
            Command::Assign(args) => {
                if let Some(weight) = args.weight {
                    validate_weight(weight)?;
                }
            }
            Command::Unassign(args) => {
                if !args.yes {
                    return Err(format!(
                        "Refusing to remove {} member(s) from queue {} without --yes",
                        args.member_ids.len(),
                        args.queue_id
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_weight(weight: u32) -> Result<(), String> {
    if crate::gateway::WEIGHT_RANGE.contains(&weight) {
        Ok(())
    } else {
        Err("Weight must be between 1 and 100".to_string())
    }
}
