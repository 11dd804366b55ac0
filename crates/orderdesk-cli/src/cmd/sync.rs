//! `od sync` and `od push`.

use crate::cmd::Ctx;
use crate::output::{render, render_success, render_warning};
use crate::project::{Project, ProjectError};
use anyhow::Context as _;
use clap::Args;
use orderdesk_core::OrderError;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Merge the remote snapshot but do not push the result back.
    #[arg(long)]
    pub no_push: bool,
}

/// Pull, merge, and push. Remote failures are reported, never fatal.
pub fn run_sync(args: &SyncArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    if !project.has_remote()? {
        return Err(ProjectError::RemoteNotConfigured.into());
    }

    let report = project.sync(ctx.token, !args.no_push)?;
    for error in &report.errors {
        render_warning(ctx.output, error);
    }

    render(ctx.output, &report, |r, w| {
        match &r.merged {
            Some(merged) => writeln!(
                w,
                "✓ Pulled: {} new, {} updated ({} moved), {} older remote copies ignored",
                merged.inserted, merged.updated, merged.moved, merged.discarded
            )?,
            None => writeln!(w, "Remote unreachable, working offline.")?,
        }
        if !r.swept.is_empty() {
            writeln!(w, "✓ Dropped {} order(s) already past retention", r.swept.len())?;
        }
        if r.pushed {
            writeln!(w, "✓ Pushed")?;
        }
        Ok(())
    })
}

/// Merge the remote, then upload. A failed push here is an error.
pub fn run_push(ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    if !project.remote_is_writable()? {
        return Err(ProjectError::RemoteNotConfigured.into());
    }
    let report = project.sync(ctx.token, true)?;
    if !report.pushed {
        return Err(anyhow::Error::new(OrderError::Transport(report.errors.join("; "))))
            .context("Push failed; orders are still saved locally");
    }
    let pulled = report.merged.map_or(0, |merged| merged.inserted + merged.updated);
    render_success(
        ctx.output,
        &format!("Pushed, after merging {pulled} remote change(s)"),
    )
}
