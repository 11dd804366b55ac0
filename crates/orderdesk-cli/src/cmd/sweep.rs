use crate::cmd::{Ctx, release_and_push_swept};
use crate::output::render;
use crate::project::Project;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SweepOutput {
    removed: Vec<String>,
    window_days: i64,
}

/// Evict delivered orders older than the retention window.
///
/// Opening the desk already sweeps, so the start-up report is what gets
/// printed.
pub fn run_sweep(ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;
    let report = desk.startup_sweep().clone();
    release_and_push_swept(&project, lock, &desk, ctx);

    let result = SweepOutput {
        removed: report.removed.iter().map(ToString::to_string).collect(),
        window_days: desk.policy().window.num_days(),
    };
    render(ctx.output, &result, |r, w| {
        if r.removed.is_empty() {
            return writeln!(w, "Nothing older than {} days to remove.", r.window_days);
        }
        writeln!(w, "✓ Removed {} delivered order(s):", r.removed.len())?;
        for id in &r.removed {
            writeln!(w, "  {id}")?;
        }
        Ok(())
    })
}
