use crate::cmd::{Ctx, release_and_push_swept};
use crate::output::render;
use crate::project::Project;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ThemeArgs {
    /// Theme to save. Omit to print the current one.
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ThemeOutput {
    theme: String,
}

pub fn run_theme(args: &ThemeArgs, ctx: Ctx<'_>) -> anyhow::Result<()> {
    let project = Project::discover(ctx.cwd)?;
    let (lock, desk) = project.open_desk(ctx.token)?;
    if let Some(name) = &args.name {
        desk.set_theme(name)?;
    }
    let result = ThemeOutput {
        theme: desk.theme()?,
    };
    release_and_push_swept(&project, lock, &desk, ctx);
    render(ctx.output, &result, |r, w| writeln!(w, "{}", r.theme))
}
