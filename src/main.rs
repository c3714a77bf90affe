use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use sitelog::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing();

    match args.get_command() {
        cli::Commands::List(list) => {
            commands::logs::list(&args.config, list).await?;
        }
        cli::Commands::Delete(delete) => {
            commands::logs::delete(&args.config, delete).await?;
        }
        cli::Commands::Clear(clear) => {
            commands::logs::clear(&args.config, clear).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("sitelog v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
