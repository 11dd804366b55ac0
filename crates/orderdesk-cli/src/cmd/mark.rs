//! `od paid`, `od delivered`, `od hide`, `od restore`.

use crate::cmd::view::OrderView;
use crate::cmd::{Ctx, push_if_configured};
use crate::output::render_item;
use crate::project::Project;
use anyhow::Context as _;
use clap::Args;
use orderdesk_core::OrderId;

#[derive(Args, Debug)]
pub struct MarkArgs {
    /// Order id.
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Paid,
    Delivered,
    Hide,
    Restore,
}

impl Mark {
    const fn verb(self) -> &'static str {
        match self {
            Self::Paid => "toggle paid on",
            Self::Delivered => "toggle delivered on",
            Self::Hide => "hide",
            Self::Restore => "restore",
        }
    }
}

pub fn run_mark(mark: Mark, args: &MarkArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;
    let id = OrderId::from(args.id.trim());

    let order = match mark {
        Mark::Paid => desk.toggle_paid(&id),
        Mark::Delivered => desk.toggle_delivered(&id),
        Mark::Hide => desk.hide(&id),
        Mark::Restore => desk.restore(&id),
    }
    .with_context(|| format!("Could not {} order {id}", mark.verb()))?;

    lock.release();
    push_if_configured(&project, ctx);
    render_item(&OrderView::new(order.collection(), order), ctx.output)
}
