//! `peerbump check` command implementation.
//!
//! Reports the peer conflicts the updates would cause. Nothing is written.

use peerbump_core::error::BumpResult;
use serde_json::json;

use super::{prepare, CommandContext, CommandOutcome};
use crate::ResolveArgs;

/// Execute the `peerbump check` command
pub async fn execute(args: ResolveArgs, ctx: &CommandContext) -> BumpResult<CommandOutcome> {
    let session = prepare(&args, ctx).await?;

    let report = session.pipeline.check(&session.manifest, &session.planned).await;
    let outcome = CommandOutcome::from_report(&report);

    if args.json {
        ctx.output.json(&json!({
            "manifest": session.manifest_path.as_str(),
            "report": report,
        }));
        return Ok(outcome);
    }

    ctx.output.narrative(&report.resolutions);

    if report.conflicts.is_empty() {
        ctx.output.success("No peer dependency conflicts");
    } else {
        ctx.output.heading("Conflicts:");
        for conflict in &report.conflicts {
            ctx.output.info(&format!("  {}", conflict));
        }
        ctx.output.info("Run `peerbump update` with the same arguments to try resolving them");
    }

    Ok(outcome)
}
