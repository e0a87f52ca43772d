//! Resolve command - compatibility and dependency closure of one target

use super::Workspace;
use anyhow::{Context, Result};
use rulekit_resolver::{Resolution, ResolvedTarget, Resolver};

/// Resolve command arguments
pub struct ResolveArgs {
    /// Target name
    pub target: String,
    /// Target platform
    pub platform: Option<String>,
    /// JSON output
    pub json: bool,
}

/// Run the resolve command
pub fn run(workspace: &Workspace, args: ResolveArgs) -> Result<()> {
    workspace.require_manifest()?;
    let platform = workspace.platform(args.platform.as_deref())?;

    let resolver = Resolver::new(&workspace.table, workspace.config.settings())?;
    let resolution = resolver
        .resolve(&args.target, &platform)
        .with_context(|| format!("Failed to resolve '{}' for {}", args.target, platform))?;

    match resolution {
        Resolution::Compatible(resolved) => {
            if args.json {
                print_json(&resolved)?;
            } else {
                print_resolved(&resolved)?;
            }
        }
        Resolution::Incompatible(reason) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "target": args.target,
                        "platform": platform,
                        "status": "incompatible",
                        "message": reason.to_string(),
                        "reason": reason,
                    }))?
                );
            } else {
                println!("{}", reason);
            }
        }
    }

    Ok(())
}

fn print_json(resolved: &ResolvedTarget) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "target": resolved.name(),
            "platform": resolved.platform(),
            "status": "compatible",
            "unit": resolved.unit,
            "closure": resolved.closure,
            "build_groups": resolved.build_groups()?,
            "clippy": resolved.runs_clippy(),
            "rustfmt": resolved.runs_rustfmt(),
            "fingerprint": resolved.fingerprint()?,
        }))?
    );
    Ok(())
}

fn print_resolved(resolved: &ResolvedTarget) -> Result<()> {
    let unit = &resolved.unit;

    println!(
        "{} ({}) is compatible with {}",
        resolved.name(),
        unit.kind,
        resolved.platform()
    );

    if !unit.deps.is_empty() {
        println!("  Dependencies:");
        for dep in &unit.deps {
            println!("    {}", dep);
        }
    }

    if !resolved.closure.is_empty() {
        println!("  Closure ({} units):", resolved.closure.len());
        for dep in &resolved.closure {
            println!("    {}", dep.key);
        }
    }

    if !unit.features.is_empty() {
        let features: Vec<&str> = unit.features.iter().map(String::as_str).collect();
        println!("  Features: {}", features.join(", "));
    }

    if !unit.rustc_flags.is_empty() {
        println!("  Rustc flags: {}", unit.rustc_flags.join(" "));
    }

    if !unit.build_script_env.is_empty() {
        println!("  Build script environment:");
        for (key, value) in &unit.build_script_env {
            println!("    {}={}", key, value);
        }
    }

    println!(
        "  Aspects: clippy {}, rustfmt {}",
        on_off(resolved.runs_clippy()),
        on_off(resolved.runs_rustfmt())
    );
    println!("  Fingerprint: {}", resolved.fingerprint()?);

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
