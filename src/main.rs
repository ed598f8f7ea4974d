use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod cues;

use commands::{show_status, CommandContext, ConfigCommand, StepsCommand, WaterCommand};
use config::Config;
use cues::{CuePlayer, SilentCues, TerminalCues};

#[derive(Parser)]
#[command(name = "fitquest")]
#[command(version)]
#[command(about = "Track daily hydration and steps against your goals", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Day to track (YYYY-MM-DD), defaults to today
    #[arg(long, short, global = true)]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Track glasses of water
    Water(WaterCommand),

    /// Track daily step count
    Steps(StepsCommand),

    /// Show server configuration and status
    Status,

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitquest=warn,fitquest_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    // Load configuration
    let config = Config::load(cli.config)?;

    let cues: Box<dyn CuePlayer> = if config.sound.value {
        Box::new(TerminalCues::new(true))
    } else {
        Box::new(SilentCues)
    };
    cues.init();

    let ctx = CommandContext {
        config: &config,
        date: cli.date.unwrap_or_else(|| Local::now().date_naive()),
        cues: cues.as_ref(),
    };

    match &cli.command {
        Some(Commands::Water(cmd)) => cmd.run(&ctx).await?,
        Some(Commands::Steps(cmd)) => cmd.run(&ctx).await?,
        Some(Commands::Status) => show_status(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config, cli_config_path)?,
        None => println!("Use --help to see available commands"),
    }

    Ok(())
}
