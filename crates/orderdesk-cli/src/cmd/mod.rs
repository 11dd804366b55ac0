pub mod completions;
pub mod create;
pub mod init;
pub mod list;
pub mod mark;
pub mod show;
pub mod sweep;
pub mod sync;
pub mod theme;
pub mod view;
pub mod watch;

use crate::output::{OutputMode, render_warning};
use crate::project::{Desk, Project};
use orderdesk_core::lock::StoreLock;
use std::path::Path;
use tracing::warn;

/// What every handler gets from the top-level flags.
#[derive(Debug, Clone, Copy)]
pub struct Ctx<'a> {
    pub cwd: &'a Path,
    pub output: OutputMode,
    pub token: Option<&'a str>,
}

/// Sync after a local save when `push_on_save` is set and the remote is
/// writable. Call it only after releasing the data-directory lock.
///
/// Failures are warnings: the local write already succeeded.
pub fn push_if_configured(project: &Project, ctx: Ctx<'_>) {
    if !project.config.remote.push_on_save {
        return;
    }
    match project.remote_is_writable() {
        Ok(true) => {}
        Ok(false) => return,
        Err(err) => {
            render_warning(ctx.output, &format!("{err:#}"));
            return;
        }
    }
    match project.sync(ctx.token, true) {
        Ok(report) => {
            for error in &report.errors {
                warn!(error = %error, "push after save incomplete, data kept locally");
                render_warning(ctx.output, &format!("orders saved locally only: {error}"));
            }
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "push after save failed, data kept locally");
            render_warning(ctx.output, &format!("push failed, orders saved locally only: {err:#}"));
        }
    }
}

/// Release the lock, then publish what the start-up sweep removed.
///
/// Opening the desk sweeps and persists, even for read-only commands.
pub fn release_and_push_swept(project: &Project, lock: StoreLock, desk: &Desk, ctx: Ctx<'_>) {
    lock.release();
    if !desk.startup_sweep().is_empty() {
        push_if_configured(project, ctx);
    }
}
