use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use llm_monitor::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    init_tracing(args.log_format == cli::LogFormat::Json);

    // Dispatch to appropriate command handler
    match args.command {
        cli::Commands::Replay {
            input,
            failure,
            prometheus,
        } => {
            commands::replay::execute(&args.config, &input, failure, prometheus).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("llm-monitor v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
