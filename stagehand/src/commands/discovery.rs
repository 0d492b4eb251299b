//! Graph inspection commands.

use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;

use stagehand_core::Scanner;

pub fn cmd_graph(root: PathBuf, json: bool) -> Result<()> {
    let graph = Scanner::new(&root).graph()?;

    if json {
        let nodes: Vec<serde_json::Value> = graph
            .workspaces()
            .map(|ws| {
                serde_json::json!({
                    "name": ws.name(),
                    "location": ws.location().to_string_lossy(),
                    "root": ws.is_root(),
                    "private": ws.is_private(),
                    "dependencies": graph.dependencies_of(ws.name()).unwrap_or_default(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    for workspace in graph.workspaces() {
        let marker = if workspace.is_root() { " (root)" } else { "" };
        println!(
            "{}{}",
            workspace.name().bold().white(),
            marker.bright_black()
        );
        for dep in graph.dependencies_of(workspace.name())? {
            println!("  -> {}", dep);
        }
    }

    Ok(())
}

pub fn cmd_affected(root: PathBuf, workspaces: Vec<String>, json: bool) -> Result<()> {
    let graph = Scanner::new(&root).graph()?;

    for name in &workspaces {
        graph.require(name)?;
    }
    let affected = graph.affected(workspaces.iter().map(String::as_str));

    if json {
        let names: Vec<&String> = affected.iter().collect();
        println!("{}", serde_json::to_string(&names)?);
    } else if affected.is_empty() {
        println!("  {} No affected workspaces", "WARNING:".yellow());
    } else {
        for name in &affected {
            println!("{}", name);
        }
    }

    Ok(())
}
