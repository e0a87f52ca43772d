//! Plan command - resolve every wildcard-buildable target for a platform

use super::Workspace;
use anyhow::{bail, Result};
use rulekit_resolver::{BuildPlan, Resolver, Verdict};

/// Plan command arguments
pub struct PlanArgs {
    /// Target platform
    pub platform: Option<String>,
    /// Worker threads, overriding settings.jobs
    pub jobs: Option<usize>,
    /// JSON output
    pub json: bool,
}

/// Run the plan command
pub fn run(workspace: &Workspace, args: PlanArgs) -> Result<()> {
    workspace.require_manifest()?;
    let platform = workspace.platform(args.platform.as_deref())?;

    let mut settings = workspace.config.settings().clone();
    if args.jobs.is_some() {
        settings.jobs = args.jobs;
    }

    let resolver = Resolver::new(&workspace.table, &settings)?;
    let plan = resolver.resolve_all(&platform)?;

    if args.json {
        print_json(&plan)?;
    } else {
        print_plan(&plan);
    }

    let failed = plan.failures().count();
    if failed > 0 {
        bail!("{} target(s) failed to resolve for {}", failed, plan.platform);
    }

    Ok(())
}

fn print_json(plan: &BuildPlan) -> Result<()> {
    let mut targets = serde_json::Map::new();
    for (name, verdict) in &plan.verdicts {
        let entry = match verdict {
            Verdict::Resolved(resolved) => serde_json::json!({
                "status": verdict.status(),
                "closure": resolved.closure_names(),
                "fingerprint": resolved.fingerprint()?,
            }),
            Verdict::Incompatible(reason) => serde_json::json!({
                "status": verdict.status(),
                "message": reason.to_string(),
            }),
            Verdict::Failed(err) => serde_json::json!({
                "status": verdict.status(),
                "error": err.to_string(),
            }),
        };
        targets.insert(name.clone(), entry);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "platform": plan.platform,
            "success": plan.is_success(),
            "targets": targets,
            "skipped": plan.skipped,
        }))?
    );
    Ok(())
}

fn print_plan(plan: &BuildPlan) {
    println!("Plan for {}", plan.platform);

    for resolved in plan.resolved() {
        println!(
            "  {:<32} {} dependencies",
            resolved.name(),
            resolved.closure.len()
        );
    }

    if let Some(message) = plan.skipping_message() {
        println!("{}", message);
    }

    for (name, err) in plan.failures() {
        eprintln!("error: {}: {}", name, err);
    }

    if !plan.skipped.is_empty() {
        println!("Manual targets not planned: {}", plan.skipped.join(", "));
    }

    println!("{}", plan);
}
