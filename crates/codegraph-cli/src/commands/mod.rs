mod consume;
mod graph;
mod index;
mod memory;
mod resources;
mod search;
mod worker;

use crate::cli::{Cli, Commands};

/// Dispatch a parsed command to its handler module.
pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Index(args) => index::run(args, format).await,
        Commands::Search(args) => search::run(args, format).await,
        Commands::Worker(args) => worker::run(args).await,
        Commands::Consume(args) => consume::run(args).await,
        Commands::Graph { action } => graph::run(action, format).await,
        Commands::Memory { action } => memory::run(action, format).await,
    }
}
