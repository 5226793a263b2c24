//! `strata log` command - show tracked branches as a tree, or the state history.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use strata_core::{BranchGraph, LogEntry};

use super::utils::Workspace;
use crate::output;

/// One tracked branch in JSON output.
#[derive(Debug, Serialize)]
struct BranchInfo {
    name: String,
    base: String,
    head: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    change: Option<String>,
    needs_restack: bool,
    is_current: bool,
}

#[derive(Debug, Serialize)]
struct JsonOutput {
    trunk: String,
    current: Option<String>,
    branches: Vec<BranchInfo>,
}

/// Run the log command.
pub fn run(history: bool, json: bool) -> Result<()> {
    let ws = Workspace::open()?;

    if history {
        let entries = ws.state.history()?;
        if json {
            output::essential(&serde_json::to_string_pretty(&entries)?);
        } else {
            print_history(&entries);
        }
        return Ok(());
    }

    let graph = ws.service().branch_graph()?;
    let current = ws.repo.current_branch().ok();

    let mut branches = Vec::with_capacity(graph.len());
    for item in &graph {
        let needs_restack = ws
            .repo
            .peel_to_commit(&item.base)
            .is_ok_and(|base_head| !ws.repo.is_ancestor(base_head, item.head));
        branches.push(BranchInfo {
            name: item.name.clone(),
            base: item.base.clone(),
            head: item.head.to_string(),
            change: item.change.as_ref().map(|c| c.change_id()),
            needs_restack,
            is_current: current.as_deref() == Some(item.name.as_str()),
        });
    }

    if json {
        let out = JsonOutput {
            trunk: graph.trunk().to_string(),
            current,
            branches,
        };
        output::essential(&serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if graph.is_empty() {
        output::info("No tracked branches yet. Use `strata track` to add one.");
        return Ok(());
    }
    print_tree(&graph, &branches, current.as_deref());
    Ok(())
}

/// Print tracked branches depth-first below trunk.
fn print_tree(graph: &BranchGraph, branches: &[BranchInfo], current: Option<&str>) {
    println!();
    println!("  {}", output::branch_name(graph.trunk(), current == Some(graph.trunk())));
    output::hr();

    let mut pending: Vec<(&str, usize)> = graph.aboves(graph.trunk()).map(|b| (b, 1)).collect();
    pending.reverse();
    while let Some((name, depth)) = pending.pop() {
        let Some(info) = branches.iter().find(|b| b.name == name) else {
            continue;
        };
        let indent = "  ".repeat(depth);
        let change = output::change_ref(info.change.as_deref());
        let marker = output::restack_marker(info.needs_restack);
        println!(
            "{indent}{} {change} {marker}",
            output::branch_name(name, info.is_current)
        );

        let mut children: Vec<_> = graph.aboves(name).map(|b| (b, depth + 1)).collect();
        children.reverse();
        pending.extend(children);
    }
    println!();
}

fn print_history(entries: &[LogEntry]) {
    if entries.is_empty() {
        output::info("No history recorded");
        return;
    }
    for entry in entries.iter().rev() {
        output::detail(&format!("{} {}", timestamp(entry.at).dimmed(), entry.message));
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
