use clap::{Args, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# fitquest configuration

# Backend base URL
server_url: "http://localhost:3000"

# API key sent as a bearer token
# api_key: "your-api-key"

# Most glasses drawn in the hydration row
max_glasses: 12

# Milliseconds a glass stays filling/emptying before it settles
glass_delay_ms: 1500

# Seconds before a backend request gives up
request_timeout_secs: 10

# Ring the terminal bell on fills, goals and failures
sound: false
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_text(config),
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'fitquest config show' to view current configuration.");
                    return Ok(());
                }

                write_default_config(&config_path)?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn print_text(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("server_url: {}", config.server_url.value);
    println!("  source: {}", config.server_url.source);
    println!();

    println!(
        "api_key: {}",
        config
            .api_key_hint()
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!();

    println!("max_glasses: {}", config.max_glasses.value);
    println!("  source: {}", config.max_glasses.source);
    println!();

    println!("glass_delay_ms: {}", config.glass_delay_ms.value);
    println!("  source: {}", config.glass_delay_ms.source);
    println!();

    println!("request_timeout_secs: {}", config.request_timeout_secs.value);
    println!("  source: {}", config.request_timeout_secs.source);
    println!();

    println!("sound: {}", config.sound.value);
    println!("  source: {}", config.sound.source);
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())
}
