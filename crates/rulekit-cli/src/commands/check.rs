//! Check command - validate a rules manifest without resolving it

use super::Workspace;
use anyhow::{bail, Result};

/// Run the check command
pub fn run(workspace: &Workspace, json: bool) -> Result<()> {
    workspace.require_manifest()?;

    let result = workspace.table.validate();
    let build_scripts = workspace
        .table
        .rules()
        .filter(|rule| rule.is_build_script())
        .count();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_ok(),
                "targets": workspace.table.len(),
                "build_scripts": build_scripts,
                "error": result.as_ref().err().map(|e| e.to_string()),
            }))?
        );
    }

    if let Err(err) = result {
        if !json {
            eprintln!("error: {}", err);
        }
        bail!("rules manifest is invalid");
    }

    if !json {
        println!(
            "OK: {} targets ({} build scripts), no missing dependencies or cycles",
            workspace.table.len(),
            build_scripts
        );
    }

    Ok(())
}
