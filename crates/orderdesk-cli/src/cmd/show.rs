use crate::cmd::{Ctx, release_and_push_swept};
use crate::cmd::view::OrderView;
use crate::output::render_item;
use crate::project::Project;
use clap::Args;
use orderdesk_core::{Collection, OrderError, OrderId};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Order id.
    pub id: String,
}

pub fn run_show(args: &ShowArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;
    let id = OrderId::from(args.id.trim());
    let found = desk.get(&id);
    release_and_push_swept(&project, lock, &desk, ctx);
    let (collection, order) = found.ok_or(OrderError::NotFound {
        id,
        collection: Collection::Visible,
    })?;
    render_item(&OrderView::new(collection, order), ctx.output)
}
