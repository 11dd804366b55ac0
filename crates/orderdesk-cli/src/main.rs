#![forbid(unsafe_code)]

mod cmd;
mod output;
mod project;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Ctx;
use cmd::mark::Mark;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "orderdesk: order tracking for a small shop",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// API token for the remote (overrides ORDERDESK_TOKEN / GITHUB_TOKEN).
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize an order desk",
        long_about = "Create .orderdesk/ with a default config in the current directory.",
        after_help = "EXAMPLES:\n    od init\n\n    # Rewrite the default config\n    od init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Record a new order",
        long_about = "Record a new visible, unpaid, undelivered order.",
        after_help = "EXAMPLES:\n    od create --customer Ana --phone 555 --product Pizza\n\n    # With notes, machine-readable\n    od create -c Ana -p 555 --product Pizza -n \"no onions\" --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Orders",
        about = "List orders",
        long_about = "List visible orders, or hidden ones with --hidden / --all.",
        after_help = "EXAMPLES:\n    od list\n\n    # Everything still owed\n    od list --unpaid\n\n    od list --all --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Show one order",
        after_help = "EXAMPLES:\n    od show 1700000000000"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Toggle the paid flag",
        after_help = "EXAMPLES:\n    od paid 1700000000000"
    )]
    Paid(cmd::mark::MarkArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Toggle the delivered flag",
        long_about = "Toggle delivered. Marking delivered stamps the delivery time that retention counts from.",
        after_help = "EXAMPLES:\n    od delivered 1700000000000"
    )]
    Delivered(cmd::mark::MarkArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Move an order to the hidden set",
        after_help = "EXAMPLES:\n    od hide 1700000000000"
    )]
    Hide(cmd::mark::MarkArgs),

    #[command(
        next_help_heading = "Orders",
        about = "Bring a hidden order back",
        after_help = "EXAMPLES:\n    od restore 1700000000000"
    )]
    Restore(cmd::mark::MarkArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Remove delivered orders past the retention window",
        after_help = "EXAMPLES:\n    od sweep\n\n    od sweep --json"
    )]
    Sweep,

    #[command(
        next_help_heading = "Remote",
        about = "Merge the remote snapshot, then push",
        long_about = "Fetch the remote snapshot, merge it by last-writer-wins on lastModified, and push the result. Remote failures leave local orders untouched.",
        after_help = "EXAMPLES:\n    od sync\n\n    # Pull only\n    od sync --no-push"
    )]
    Sync(cmd::sync::SyncArgs),

    #[command(
        next_help_heading = "Remote",
        about = "Upload the local snapshot",
        after_help = "EXAMPLES:\n    ORDERDESK_TOKEN=... od push"
    )]
    Push,

    #[command(
        next_help_heading = "Setup",
        about = "Show or set the display theme",
        after_help = "EXAMPLES:\n    od theme\n\n    od theme dark"
    )]
    Theme(cmd::theme::ThemeArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Sweep and sync on an interval",
        after_help = "EXAMPLES:\n    od watch\n\n    # Three quick ticks, no network\n    od watch --interval-secs 1 --iterations 3 --no-sync"
    )]
    Watch(cmd::watch::WatchArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    od completions bash\n\n    od completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ORDERDESK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "orderdesk=debug,info"
        } else {
            "orderdesk=info,warn"
        })
    });

    let format = env::var("ORDERDESK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

fn output_mode(json_flag: bool) -> OutputMode {
    let user_output = match orderdesk_core::config::load_user_config() {
        Ok(user) => user.output,
        Err(err) => {
            debug!(error = %format!("{err:#}"), "ignoring unreadable user config");
            None
        }
    };
    resolve_output_mode(json_flag, user_output.as_deref())
}

fn dispatch(command: Commands, ctx: Ctx<'_>) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => cmd::init::run_init(&args, ctx.output, ctx.cwd),
        Commands::Create(args) => cmd::create::run_create(&args, ctx),
        Commands::List(args) => cmd::list::run_list(&args, ctx),
        Commands::Show(args) => cmd::show::run_show(&args, ctx),
        Commands::Paid(args) => cmd::mark::run_mark(Mark::Paid, &args, ctx),
        Commands::Delivered(args) => cmd::mark::run_mark(Mark::Delivered, &args, ctx),
        Commands::Hide(args) => cmd::mark::run_mark(Mark::Hide, &args, ctx),
        Commands::Restore(args) => cmd::mark::run_mark(Mark::Restore, &args, ctx),
        Commands::Sweep => cmd::sweep::run_sweep(ctx),
        Commands::Sync(args) => cmd::sync::run_sync(&args, ctx),
        Commands::Push => cmd::sync::run_push(ctx),
        Commands::Theme(args) => cmd::theme::run_theme(&args, ctx),
        Commands::Watch(args) => cmd::watch::run_watch(&args, ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = output_mode(cli.json);
    let result = env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let ctx = Ctx {
                cwd: &cwd,
                output,
                token: cli.token.as_deref(),
            };
            dispatch(cli.command, ctx)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(output, &CliError::from(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
