//! Command execution logic.

use anyhow::Result;
use serde_json::json;

use super::args::{FailureArgs, PathArgs};
use crate::domain::{FailureEvent, FailureType, Severity, SystemId};
use crate::output::{self, OutputConfig, OutputMode};
use crate::tracker::DependencyTracker;

/// Build the hypothetical failure described by `args`.
///
/// Severity falls back to the system type's outage severity, or medium for
/// systems not in the graph.
async fn failure_from_args(tracker: &DependencyTracker, args: &FailureArgs) -> FailureEvent {
    let failure_type = FailureType::from(args.failure_type);
    let severity = match args.severity {
        Some(severity) => Severity::from(severity),
        None => tracker
            .graph()
            .await
            .system(&args.system_id)
            .map_or(Severity::Medium, |node| node.system_type.outage_severity()),
    };
    FailureEvent::new(
        args.system_id.as_str(),
        failure_type,
        severity,
        format!("Hypothetical {failure_type} on {}", args.system_id),
    )
}

fn format_ids(ids: &[SystemId], colors: OutputConfig) -> String {
    ids.iter()
        .map(|id| output::system_id(id.as_str(), colors))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Execute the impact command
pub async fn execute_impact(
    tracker: &DependencyTracker,
    args: &FailureArgs,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let failure = failure_from_args(tracker, args).await;
    let impact = tracker.analyze_cascade_impact(&failure).await;

    match output_mode {
        OutputMode::Json => output::print_json(&impact)?,
        OutputMode::Text => {
            println!(
                "{} {} ({}, {})",
                output::header("Impact of", colors),
                output::system_id(impact.system_id.as_str(), colors),
                failure.failure_type,
                failure.severity
            );
            if impact.degraded {
                println!(
                    "  {}",
                    output::warning("System is not in the graph; analysis is degraded", colors)
                );
            }
            println!("  Affected systems: {}", impact.affected_systems.len());
            println!("  Users at risk:    ~{}", impact.user_impact);
            println!("  Revenue at risk:  ~${:.0}", impact.revenue_impact);
            println!();
            println!("{}", output::header("Recovery order", colors));
            for (rank, id) in impact.recovery_priority.iter().enumerate() {
                let score = impact.impact_scores.get(id).copied().unwrap_or(0.0);
                let downtime = impact.estimated_downtime.get(id).copied().unwrap_or(0.0);
                println!(
                    "  {:>2}. {} score {} ~{downtime:.0} min",
                    rank + 1,
                    output::system_id(id.as_str(), colors),
                    output::score(score, colors)
                );
            }
            if !impact.mitigation_strategies.is_empty() {
                println!();
                println!("{}", output::header("Mitigation", colors));
                for strategy in &impact.mitigation_strategies {
                    println!("  - {strategy}");
                }
            }
        }
    }
    Ok(())
}

/// Execute the cascade command
pub async fn execute_cascade(
    tracker: &DependencyTracker,
    args: &FailureArgs,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let failure = failure_from_args(tracker, args).await;
    let cascade = tracker.track_cascade_failure(&failure).await;

    match output_mode {
        OutputMode::Json => output::print_json(&cascade)?,
        OutputMode::Text => {
            println!(
                "{} {} reaches {} dependent(s), total impact {:.3}",
                output::header("Cascade from", colors),
                output::system_id(failure.system_id.as_str(), colors),
                cascade.cascade_size(),
                cascade.total_impact_score
            );
            for step in &cascade.steps {
                println!(
                    "  {}{} p={}",
                    "  ".repeat(step.depth),
                    output::system_id(step.system_id.as_str(), colors),
                    output::score(step.probability, colors)
                );
            }
        }
    }
    Ok(())
}

/// Execute the recovery command
pub async fn execute_recovery(
    tracker: &DependencyTracker,
    args: &FailureArgs,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let failure = failure_from_args(tracker, args).await;
    let plan = tracker.generate_recovery_plan(&failure).await;

    match output_mode {
        OutputMode::Json => output::print_json(&plan)?,
        OutputMode::Text => {
            println!("{}", output::header("Recovery plan", colors));
            for step in &plan {
                println!(
                    "  {:>2}. [{}] {} (~{:.0} min)",
                    step.priority,
                    step.action,
                    step.description,
                    step.estimated_minutes
                );
            }
        }
    }
    Ok(())
}

/// Execute the spof command
pub async fn execute_spof(
    tracker: &DependencyTracker,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let spofs = tracker.find_single_points_of_failure().await;

    match output_mode {
        OutputMode::Json => output::print_json(&json!({ "single_points_of_failure": spofs }))?,
        OutputMode::Text => {
            if spofs.is_empty() {
                println!("No single points of failure found.");
            } else {
                println!("{}", output::header("Single points of failure", colors));
                for id in &spofs {
                    println!("  {}", output::system_id(id.as_str(), colors));
                }
            }
        }
    }
    Ok(())
}

/// Execute the criticality command
pub async fn execute_criticality(
    tracker: &DependencyTracker,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let scores = tracker.calculate_system_criticality().await;

    match output_mode {
        OutputMode::Json => output::print_json(&scores)?,
        OutputMode::Text => {
            let mut ranked: Vec<_> = scores.iter().collect();
            ranked.sort_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then_with(|| a_id.cmp(b_id)));
            println!("{}", output::header("System criticality", colors));
            for (id, score) in ranked {
                println!(
                    "  {} {}",
                    output::score(*score, colors),
                    output::system_id(id.as_str(), colors)
                );
            }
        }
    }
    Ok(())
}

/// Execute the optimize command
pub async fn execute_optimize(
    tracker: &DependencyTracker,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let suggestions = tracker.optimize_dependency_structure().await;

    match output_mode {
        OutputMode::Json => output::print_json(&suggestions)?,
        OutputMode::Text => {
            if suggestions.is_empty() {
                println!("No structural improvements suggested.");
                return Ok(());
            }
            println!("{}", output::header("Suggestions", colors));
            for suggestion in &suggestions {
                println!(
                    "  {} [{}] {} ({} effort)",
                    output::score(suggestion.priority_score, colors),
                    output::warning(&suggestion.suggestion_type.to_string(), colors),
                    suggestion.description,
                    suggestion.implementation_effort
                );
                println!("        {}", suggestion.expected_benefit);
            }
        }
    }
    Ok(())
}

/// Execute the cycles command
pub async fn execute_cycles(
    tracker: &DependencyTracker,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let cycles = tracker.detect_cycles().await;

    match output_mode {
        OutputMode::Json => output::print_json(&json!({ "cycles": cycles }))?,
        OutputMode::Text => {
            if cycles.is_empty() {
                println!("No circular dependencies found.");
            } else {
                println!("{}", output::header("Circular dependencies", colors));
                for cycle in &cycles {
                    println!("  {}", format_ids(cycle, colors));
                }
            }
        }
    }
    Ok(())
}

/// Execute the path command
pub async fn execute_path(
    tracker: &DependencyTracker,
    args: &PathArgs,
    output_mode: OutputMode,
    colors: OutputConfig,
) -> Result<()> {
    let paths = if args.all {
        tracker.all_paths(&args.source, &args.target).await
    } else {
        tracker
            .shortest_path(&args.source, &args.target)
            .await
            .into_iter()
            .collect()
    };

    match output_mode {
        OutputMode::Json => output::print_json(&json!({ "paths": paths }))?,
        OutputMode::Text => {
            if paths.is_empty() {
                println!("No path from {} to {}.", args.source, args.target);
            }
            for path in &paths {
                println!("  {}", format_ids(path, colors));
            }
        }
    }
    Ok(())
}

/// Execute the metrics command
pub async fn execute_metrics(tracker: &DependencyTracker, output_mode: OutputMode) -> Result<()> {
    let metrics = tracker.graph_metrics().await;

    match output_mode {
        OutputMode::Json => output::print_json(&metrics)?,
        OutputMode::Text => {
            println!("Systems:      {}", metrics.nodes_count);
            println!("Dependencies: {}", metrics.edges_count);
            println!("Build time:   {:.6}s", metrics.graph_build_time);
            if let Some(at) = metrics.last_update {
                println!("Last update:  {}", at.to_rfc3339());
            }
        }
    }
    Ok(())
}
