//! `od init`: create `.orderdesk/` with a default config.

use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use clap::Args;
use orderdesk_core::config::{CONFIG_FILE, PROJECT_DIR, render_default_config};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the config even if `.orderdesk/` already exists.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "data/\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    project_dir: String,
    config: String,
}

pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let project_dir = project_root.join(PROJECT_DIR);
    if project_dir.exists() && !args.force {
        anyhow::bail!("{PROJECT_DIR}/ already exists. Use `od init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Failed to create {}", project_dir.display()))?;

    let config_path = project_dir.join(CONFIG_FILE);
    std::fs::write(&config_path, render_default_config()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = project_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;

    tracing::info!(path = %project_dir.display(), "project initialized");

    let result = InitOutput {
        project_dir: project_dir.display().to_string(),
        config: config_path.display().to_string(),
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ Initialized {}", r.project_dir)?;
        writeln!(w)?;
        writeln!(w, "  Config: {}", r.config)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  od create --customer Ana --phone 555 --product Pizza")?;
        writeln!(w, "  od list")
    })
}
