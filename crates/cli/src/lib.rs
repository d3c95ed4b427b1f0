pub mod answers;
pub mod commands;
pub mod outbox;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use courtier_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "courtier",
    about = "Courtier quote-request wizard CLI",
    long_about = "Inspect product wizards, run the health premium simulation and submit quote requests from answer files.",
    after_help = "Examples:\n  courtier products\n  courtier simulate --age 35 --tier confort --coverages dental,optical\n  courtier quote --product health --answers answers.toml"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file (defaults to courtier.toml or config/courtier.toml)")]
    config_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List products with their steps and rendered fields")]
    Products,
    #[command(about = "Estimate the monthly health premium")]
    Simulate {
        #[arg(long)]
        age: u32,
        #[arg(long, help = "essentiel|confort|premium")]
        tier: String,
        #[arg(long, value_delimiter = ',', help = "Comma separated health coverage ids")]
        coverages: Vec<String>,
    },
    #[command(about = "Drive a product wizard from an answers file and submit it to the outbox")]
    Quote {
        #[arg(long, help = "new-business|new-business-history|home|health")]
        product: String,
        #[arg(long, help = "TOML file of field answers")]
        answers: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config_file, ..LoadOptions::default() };

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Products => commands::products::run(),
        Command::Simulate { age, tier, coverages } => commands::simulate::run(age, &tier, &coverages),
        Command::Quote { product, answers } => commands::quote::run(&options, &product, &answers),
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout only carries the command's JSON document.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
