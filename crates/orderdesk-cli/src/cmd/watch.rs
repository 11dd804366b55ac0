//! `od watch`: keep sweeping (and syncing) on an interval.
//!
//! Each tick reopens the desk under the data-directory lock, so `od` commands
//! run from other terminals in between are never overwritten by stale state.

use crate::cmd::Ctx;
use crate::output::OutputMode;
use crate::project::Project;
use clap::Args;
use orderdesk_core::SyncReport;
use orderdesk_core::retention::PeriodicTask;
use serde::Serialize;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between ticks (default: `[retention] interval_hours`).
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Stop after this many ticks instead of running until killed.
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Only sweep; never contact the remote.
    #[arg(long)]
    pub no_sync: bool,
}

#[derive(Debug, Serialize)]
struct Tick {
    tick: u32,
    removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<SyncReport>,
}

fn run_tick(project: &Project, token: Option<&str>, sync: bool, tick: u32) -> anyhow::Result<Tick> {
    let (lock, desk) = project.open_desk(token)?;
    let removed = desk.startup_sweep().removed.len();
    lock.release();
    let sync = if sync && project.has_remote()? {
        Some(project.sync(token, project.config.remote.push_on_save)?)
    } else {
        None
    };
    Ok(Tick { tick, removed, sync })
}

fn print_tick(output: OutputMode, tick: &Tick) {
    if output.is_json() {
        match serde_json::to_string(tick) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(error = %err, "tick report not serializable"),
        }
        return;
    }
    let sync = match &tick.sync {
        Some(report) if report.is_offline() => ", remote unreachable".to_string(),
        Some(report) => format!(
            ", pulled {} new / {} updated",
            report.merged.map_or(0, |m| m.inserted),
            report.merged.map_or(0, |m| m.updated)
        ),
        None => String::new(),
    };
    println!("tick {}: removed {}{sync}", tick.tick, tick.removed);
}

pub fn run_watch(args: &WatchArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let interval = args
        .interval_secs
        .map_or_else(|| project.config.retention.interval(), Duration::from_secs);
    let limit = args.iterations;
    let sync = !args.no_sync;
    let token = ctx.token.map(str::to_string);
    let output = ctx.output;

    info!(?interval, ?limit, "watching orders");
    let mut tick = 0_u32;
    let task = PeriodicTask::spawn(interval, move || {
        tick += 1;
        match run_tick(&project, token.as_deref(), sync, tick) {
            Ok(report) => print_tick(output, &report),
            Err(err) => warn!(error = %format!("{err:#}"), tick, "watch tick failed"),
        }
        if limit.is_some_and(|limit| tick >= limit) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    task.join();
    Ok(())
}
