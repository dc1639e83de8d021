//! `peerbump update` command implementation.
//!
//! Runs the full resolution pipeline on the manifest and writes the result
//! back to package.json when every conflict was resolved.

use std::time::Instant;

use peerbump_core::error::BumpResult;
use peerbump_resolver::ResolutionReport;
use serde_json::json;

use super::{prepare, CommandContext, CommandOutcome};
use crate::ResolveArgs;

/// Execute the `peerbump update` command
pub async fn execute(args: ResolveArgs, dry_run: bool, ctx: &CommandContext) -> BumpResult<CommandOutcome> {
    let start_time = Instant::now();
    let mut session = prepare(&args, ctx).await?;

    let report = session
        .pipeline
        .run(&mut session.manifest, session.planned.clone())
        .await;
    let outcome = CommandOutcome::from_report(&report);

    let write = should_write(&report, dry_run);
    if write {
        session.package.apply_manifest(&session.manifest);
        peerbump_config::json::save_to_file(&session.manifest_path, &session.package).await?;
    }

    if args.json {
        ctx.output.json(&json!({
            "manifest": session.manifest_path.as_str(),
            "dryRun": dry_run,
            "written": write,
            "report": report,
        }));
        return Ok(outcome);
    }

    ctx.output.narrative(&report.resolutions);

    if !report.changes.is_empty() {
        ctx.output.heading("Changes:");
        ctx.output.changes(&report.changes);
    }

    if write {
        ctx.output.success(&format!(
            "Wrote {} in {:.2}s",
            session.manifest_path,
            start_time.elapsed().as_secs_f64()
        ));
    } else if report.changes.is_empty() {
        ctx.output.info("Nothing to change");
    } else if dry_run {
        ctx.output.info(&format!("Dry run: {} left unchanged", session.manifest_path));
    } else if report.cancelled {
        ctx.output.warn(&format!("Cancelled: {} left unchanged", session.manifest_path));
    } else {
        ctx.output.warn(&format!(
            "{} conflict(s) unresolved: {} left unchanged",
            report.unresolved.len(),
            session.manifest_path
        ));
    }

    Ok(outcome)
}

/// Only a complete, conflict-free result is written
pub fn should_write(report: &ResolutionReport, dry_run: bool) -> bool {
    !dry_run && !report.cancelled && report.unresolved.is_empty() && !report.changes.is_empty()
}
