//! CLI argument parsing and command dispatch.
//!
//! Every command loads a graph document (see [`crate::graph::GraphDocument`])
//! and runs one analysis against it.
//!
//! # Commands
//!
//! - `impact`: Blast radius of a hypothetical failure
//! - `cascade`: Hop-by-hop propagation trace of a failure
//! - `recovery`: Ordered recovery plan for a failure
//! - `spof`: Single points of failure
//! - `criticality`: Criticality score of every system
//! - `optimize`: Structural improvement suggestions
//! - `cycles`: Circular dependencies
//! - `path`: Dependency paths between two systems
//! - `metrics`: Graph size and timing
//!
//! # Global Flags
//!
//! - `--graph`: Graph document to load (default `faultline.json`)
//! - `--config`: YAML tracker configuration
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! faultline --graph prod.json impact orders-db --type data_corruption
//! faultline --graph prod.json cascade api-gateway --max-depth 4
//! faultline --graph prod.json --json optimize
//! ```

mod args;
mod execute;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::TrackerConfig;
use crate::graph::{DependencyGraph, GraphDocument};
use crate::output::{OutputConfig, OutputMode};
use crate::tracker::DependencyTracker;

// Re-export argument structs
pub use args::{CascadeArgs, FailureArgs, PathArgs};

// Re-export types
pub use types::{FailureTypeArg, SeverityArg};

/// Default graph document path
pub const DEFAULT_GRAPH_FILE: &str = "faultline.json";

/// Faultline - dependency graph and cascading-failure analysis
///
/// Loads a graph of systems and dependencies and answers "what breaks if this
/// breaks?" along with structural questions about the graph.
#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Graph document to analyze
    #[arg(short, long, global = true, default_value = DEFAULT_GRAPH_FILE)]
    pub graph: PathBuf,

    /// YAML tracker configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Estimate the blast radius of a failure
    ///
    /// Shows affected systems with impact scores, estimated downtime, users
    /// and revenue at risk, recovery order and mitigation steps.
    Impact(FailureArgs),

    /// Trace how a failure cascades through dependents
    Cascade(CascadeArgs),

    /// Generate an ordered recovery plan for a failure
    Recovery(FailureArgs),

    /// List single points of failure
    Spof,

    /// Score how critical every system is
    Criticality,

    /// Suggest structural improvements
    Optimize,

    /// Detect circular dependencies
    Cycles,

    /// Find dependency paths between two systems
    Path(PathArgs),

    /// Show graph size and timing
    Metrics,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let colors = OutputConfig::from_env();

        let mut config = match &self.config {
            Some(path) => TrackerConfig::load(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => TrackerConfig::default(),
        };
        if let Commands::Cascade(args) = &self.command
            && let Some(depth) = args.max_depth
        {
            config.max_cascade_depth = depth;
        }

        let tracker = self.load_tracker(config).await?;

        match &self.command {
            Commands::Impact(args) => {
                execute::execute_impact(&tracker, args, output_mode, colors).await
            }
            Commands::Cascade(args) => {
                execute::execute_cascade(&tracker, &args.failure, output_mode, colors).await
            }
            Commands::Recovery(args) => {
                execute::execute_recovery(&tracker, args, output_mode, colors).await
            }
            Commands::Spof => execute::execute_spof(&tracker, output_mode, colors).await,
            Commands::Criticality => {
                execute::execute_criticality(&tracker, output_mode, colors).await
            }
            Commands::Optimize => execute::execute_optimize(&tracker, output_mode, colors).await,
            Commands::Cycles => execute::execute_cycles(&tracker, output_mode, colors).await,
            Commands::Path(args) => execute::execute_path(&tracker, args, output_mode, colors).await,
            Commands::Metrics => execute::execute_metrics(&tracker, output_mode).await,
        }
    }

    async fn load_tracker(&self, config: TrackerConfig) -> Result<DependencyTracker> {
        let content = tokio::fs::read_to_string(&self.graph)
            .await
            .with_context(|| format!("Failed to read graph {}", self.graph.display()))?;
        let document = GraphDocument::from_json(&content)
            .with_context(|| format!("Invalid graph document {}", self.graph.display()))?;
        let graph = DependencyGraph::from_document(document)?;
        Ok(DependencyTracker::with_graph(graph, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_impact_with_type() {
        let cli = Cli::try_parse_from([
            "faultline",
            "--graph",
            "prod.json",
            "impact",
            "orders-db",
            "--type",
            "data_corruption",
        ])
        .unwrap();
        assert_eq!(cli.graph, PathBuf::from("prod.json"));
        match cli.command {
            Commands::Impact(args) => {
                assert_eq!(args.system_id, "orders-db");
                assert_eq!(args.failure_type, FailureTypeArg::DataCorruption);
                assert!(args.severity.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_json_after_subcommand() {
        let cli = Cli::try_parse_from(["faultline", "spof", "--json"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.graph, PathBuf::from(DEFAULT_GRAPH_FILE));
    }

    #[test]
    fn test_parse_path_all() {
        let cli = Cli::try_parse_from(["faultline", "path", "web", "db", "--all"]).unwrap();
        match cli.command {
            Commands::Path(args) => {
                assert_eq!((args.source.as_str(), args.target.as_str()), ("web", "db"));
                assert!(args.all);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["faultline"]).is_err());
    }
}
