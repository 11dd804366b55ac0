use crate::cmd::{Ctx, release_and_push_swept};
use crate::cmd::view::OrderView;
use crate::output::render_list;
use crate::project::Project;
use clap::Args;
use orderdesk_core::Collection;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show hidden (archived) orders instead of visible ones.
    #[arg(long, conflicts_with = "all")]
    pub hidden: bool,

    /// Show visible and hidden orders.
    #[arg(long)]
    pub all: bool,

    /// Only orders not yet paid.
    #[arg(long)]
    pub unpaid: bool,

    /// Only orders not yet delivered.
    #[arg(long)]
    pub pending: bool,
}

impl ListArgs {
    fn keep(&self, view: &OrderView) -> bool {
        (!self.unpaid || !view.order.paid) && (!self.pending || !view.order.delivered)
    }
}

pub fn run_list(args: &ListArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;

    let mut views = Vec::new();
    if !args.hidden {
        views.extend(OrderView::all(Collection::Visible, desk.visible()));
    }
    if args.hidden || args.all {
        views.extend(OrderView::all(Collection::Hidden, desk.hidden()));
    }
    views.retain(|view| args.keep(view));
    release_and_push_swept(&project, lock, &desk, ctx);

    if views.is_empty() && !ctx.output.is_json() {
        println!("No orders.");
        return Ok(());
    }
    render_list(&views, ctx.output)
}
