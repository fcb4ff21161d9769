//! Faultline CLI binary.

use anyhow::Result;
use faultline::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the faultline CLI.
///
/// Every command loads one graph document and runs one analysis, so the
/// current_thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    // Example: RUST_LOG=faultline=debug faultline --graph graph.json spof
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("faultline=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting faultline CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Faultline CLI completed successfully");
    Ok(())
}
