use clap::Parser;
use std::process;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use taskrank::cli::commands::{Cli, Commands};
use taskrank::cli::{self, finish, Context};
use taskrank::config::Config;
use taskrank::db::connection;
use taskrank::error::TaskrankError;

const LOG_ENV: &str = "TASKRANK_LOG";

fn main() {
    let cli_args = Cli::parse();
    let json_output = cli_args.json;

    let ctx = match build_context(&cli_args) {
        Ok(ctx) => ctx,
        Err(e) => process::exit(finish(Err(e), json_output)),
    };
    if let Err(e) = init_logging(&ctx.config.log_filter) {
        eprintln!("Warning: logging disabled: {e:#}");
    }
    tracing::debug!(home = %ctx.home.display(), owner = %ctx.owner, "starting");

    let exit_code = match cli_args.command {
        Commands::Init => cli::init::run(&ctx),
        Commands::Task(cmd) => cli::task::run(cmd, &ctx),
        Commands::Subtask(cmd) => cli::subtask::run(cmd, &ctx),
        Commands::Dep(cmd) => cli::dep::run(cmd, &ctx),
        Commands::Series(cmd) => cli::series::run(cmd, &ctx),
        Commands::Pref(cmd) => cli::pref::run(cmd, &ctx),
        Commands::Next { limit, all } => cli::next::run(limit, all, &ctx),
        Commands::AtRisk => cli::next::run_at_risk(&ctx),
        Commands::Rescore => cli::next::run_rescore(&ctx),
    };

    process::exit(exit_code);
}

fn build_context(cli_args: &Cli) -> Result<Context, TaskrankError> {
    let home = connection::resolve_home(cli_args.home.as_deref());
    let config = Config::load(&home)?;
    let owner = match cli_args.user.as_deref() {
        Some(user) if user.trim().is_empty() => {
            return Err(TaskrankError::validation("--user must not be empty"));
        }
        Some(user) => user.trim().to_string(),
        None => config.owner.clone(),
    };
    Ok(Context {
        home,
        owner,
        config,
        json: cli_args.json,
    })
}

/// Logs go to stderr so `--json` output stays parseable. `TASKRANK_LOG`
/// overrides the configured filter.
fn init_logging(configured: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid log filter '{configured}'"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
