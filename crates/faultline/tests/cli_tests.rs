//! Integration tests for CLI command execution against graph documents.

mod common;

use common::storefront;
use faultline::cli::Cli;
use rstest::rstest;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

fn write_storefront(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("storefront.json");
    std::fs::write(&path, storefront().to_document().to_json().unwrap()).unwrap();
    path
}

fn cli(graph: &Path, args: &[&str]) -> Cli {
    let mut argv = vec!["faultline", "--graph", graph.to_str().unwrap()];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[rstest]
#[case(&["impact", "orders-db"])]
#[case(&["impact", "orders-db", "--type", "data_corruption", "--severity", "high"])]
#[case(&["cascade", "orders-db", "--max-depth", "3"])]
#[case(&["recovery", "cache"])]
#[case(&["spof"])]
#[case(&["criticality"])]
#[case(&["optimize"])]
#[case(&["cycles"])]
#[case(&["path", "web-a", "orders-db", "--all"])]
#[case(&["metrics"])]
#[tokio::test]
async fn test_commands_run_against_document(#[case] args: &[&str], #[values(false, true)] json: bool) {
    let dir = tempdir().unwrap();
    let graph = write_storefront(&dir);
    let mut args = args.to_vec();
    if json {
        args.push("--json");
    }
    cli(&graph, &args).execute().await.unwrap();
}

#[tokio::test]
async fn test_missing_graph_document_is_error() {
    let dir = tempdir().unwrap();
    let result = cli(&dir.path().join("absent.json"), &["spof"]).execute().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_config_is_error() {
    let dir = tempdir().unwrap();
    let graph = write_storefront(&dir);
    let config = dir.path().join("faultline.yaml");
    std::fs::write(&config, "monitor-interval-secs: 0\n").unwrap();

    let result = cli(&graph, &["--config", config.to_str().unwrap(), "cycles"])
        .execute()
        .await;
    assert!(result.is_err());
}
