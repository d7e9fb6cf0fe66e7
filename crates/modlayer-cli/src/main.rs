//! modlayer CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use modlayer_cli::cmd;
use modlayer_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { name, force } => cmd::fetch::fetch(name.as_deref(), force).await,
        Commands::List { name, page } => cmd::list::list(name.as_deref(), page).await,
        Commands::Info { name } => cmd::info::info(&name).await,
        Commands::Install { name, version } => {
            cmd::install::install(&name, version.as_deref()).await
        }
        Commands::Uninstall { name, yes } => cmd::uninstall::uninstall(&name, yes).await,
        Commands::Enable { name } => cmd::toggle::enable(&name).await,
        Commands::Disable { name } => cmd::toggle::disable(&name).await,
        Commands::Update { name } => cmd::update::update(name.as_deref()).await,
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
