//! Platforms command - list host-tool platforms and manifest platforms

use super::Workspace;
use anyhow::Result;
use rulekit_resolver::Platform;
use std::collections::BTreeSet;

/// Run the platforms command
pub fn run(workspace: &Workspace, json: bool) -> Result<()> {
    let host_tools: Vec<Platform> = Platform::host_tool_platforms().collect();

    let referenced: BTreeSet<&Platform> = workspace
        .table
        .rules()
        .filter_map(|rule| rule.target().constraints.as_ref())
        .flat_map(|constraints| constraints.platforms())
        .collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "host_tools": host_tools,
                "referenced": referenced,
            }))?
        );
        return Ok(());
    }

    println!("Platforms with host tools:");
    for platform in &host_tools {
        println!("  {}", platform);
    }

    if !referenced.is_empty() {
        println!("Platforms referenced by constraint maps:");
        for platform in referenced {
            let marker = if platform.has_host_tools() { "" } else { " (target only)" };
            println!("  {}{}", platform, marker);
        }
    }

    Ok(())
}
