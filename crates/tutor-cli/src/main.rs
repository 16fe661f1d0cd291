use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;
use tutor_cli::cli::{Cli, Commands};
use tutor_core::TutorConfig;

mod commands;

use commands::{evaluate, generate, inspect, rank};

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = TutorConfig::load_or_default(cli.config.as_deref())?;
    match &cli.command {
        Some(Commands::Generate(args)) => generate::handle(args, &config),
        Some(Commands::Inspect(args)) => inspect::handle(args, &config),
        Some(Commands::Rank(args)) => rank::handle(args, &config),
        Some(Commands::Evaluate(args)) => evaluate::handle(args, &config),
        Some(Commands::Config { command }) => commands::config::handle(command, &config),
        None => {
            info!("No subcommand provided. Use `tutor --help` for more information.");
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    if let Err(e) = run(&cli) {
        error!("Command failed: {:?}", e);
        std::process::exit(1);
    }
}
