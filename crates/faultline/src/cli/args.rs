//! CLI argument structs for all commands.

use clap::Parser;

use super::types::{FailureTypeArg, SeverityArg};

/// A hypothetical failure to analyze
#[derive(Parser, Debug, Clone)]
pub struct FailureArgs {
    /// Id of the failing system
    pub system_id: String,

    /// Kind of failure
    #[arg(short = 't', long = "type", value_enum, default_value = "service_down")]
    pub failure_type: FailureTypeArg,

    /// Severity (defaults to the system type's outage severity)
    #[arg(short, long, value_enum)]
    pub severity: Option<SeverityArg>,
}

/// Arguments for the `cascade` command
#[derive(Parser, Debug, Clone)]
pub struct CascadeArgs {
    /// The failure to trace
    #[command(flatten)]
    pub failure: FailureArgs,

    /// Bound on cascade depth (defaults to the configured value)
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,
}

/// Arguments for the `path` command
#[derive(Parser, Debug, Clone)]
pub struct PathArgs {
    /// Dependent system the path starts from
    pub source: String,

    /// Dependency the path ends at
    pub target: String,

    /// List every simple path instead of the shortest one
    #[arg(short, long)]
    pub all: bool,
}
