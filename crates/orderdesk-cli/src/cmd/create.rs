use crate::cmd::view::OrderView;
use crate::cmd::{Ctx, push_if_configured};
use crate::output::render_item;
use crate::project::Project;
use anyhow::Context as _;
use clap::Args;
use orderdesk_core::{Collection, NewOrder};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Customer name.
    #[arg(short, long)]
    pub customer: String,

    /// Contact phone number.
    #[arg(short, long)]
    pub phone: String,

    /// What was ordered.
    #[arg(long)]
    pub product: String,

    /// Free-form notes.
    #[arg(short, long, default_value = "")]
    pub notes: String,
}

impl CreateArgs {
    fn fields(&self) -> NewOrder {
        NewOrder {
            customer_name: self.customer.clone(),
            phone_number: self.phone.clone(),
            product_type: self.product.clone(),
            observations: self.notes.clone(),
        }
    }
}

pub fn run_create(args: &CreateArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;
    let order = desk.create(args.fields()).context("Order not created")?;
    lock.release();
    push_if_configured(&project, ctx);
    render_item(&OrderView::new(Collection::Visible, order), ctx.output)
}
