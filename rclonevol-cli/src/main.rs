mod cli;
mod commands;

use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Only the daemon is chatty by default
    let default_level = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    let _log_guard = rclonevol::util::init_logging(cli.global.log_dir.as_deref(), default_level)?;

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, &cli.global).await,
        Commands::Ls(args) => commands::ls::execute(args, &cli.global),
        Commands::Inspect(args) => commands::inspect::execute(args, &cli.global),
    }
}
