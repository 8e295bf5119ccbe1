use clap::Parser;
use tracing_subscriber::EnvFilter;

use kiara::cli::orchestration::{run_init, run_release_workflow, ReleaseWorkflowArgs};
use kiara::cli::{Cli, Command};
use kiara::ui;

fn init_tracing(verbose: bool) {
    let default = if verbose { "kiara=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let workdir = std::env::current_dir()?;

    match cli.command {
        Command::Release(args) => {
            init_tracing(args.verbose);
            run_release_workflow(ReleaseWorkflowArgs {
                options: args.options(),
                config_path: args.config.clone(),
                workdir,
            })?;
        }
        Command::Init { force } => {
            init_tracing(false);
            run_init(&workdir, force)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
