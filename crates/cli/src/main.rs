use anyhow::Context;
use clap::{Parser, Subcommand};
use sentiment_trade_core::{AppConfig, ConfigLoader};

mod commands;

use commands::{BacktestArgs, ConfigArgs, SelectArgs, SweepArgs, TrainArgs};

#[derive(Parser)]
#[command(name = "sentiment-trade")]
#[command(about = "News-sentiment equity signals and long/short backtests", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    /// Profile file layered over the config file (Config.toml pairs with Config.<profile>.toml)
    #[arg(short, long, global = true, env = "SENTIMENT_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build features and run the walk-forward model, writing the signal file
    Train(TrainArgs),
    /// Backtest the signal file and print statistics
    Backtest(BacktestArgs),
    /// Grid-search two backtest parameters
    Sweep(SweepArgs),
    /// Export one date's long and short tickers
    Select(SelectArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&cli.config, cli.profile.as_deref())?;

    match cli.command {
        Commands::Train(args) => commands::run_train(config, args).await?,
        Commands::Backtest(args) => commands::run_backtest(config, args).await?,
        Commands::Sweep(args) => commands::run_sweep(config, args).await?,
        Commands::Select(args) => commands::run_select(config, args).await?,
        Commands::Config(args) => commands::run_show_config(&config, &args)?,
    }

    Ok(())
}

fn load_config(path: &str, profile: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile)
            .with_context(|| format!("Failed to load configuration profile '{profile}' over {path}"))?,
        None => ConfigLoader::load_from(path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
    };
    tracing::debug!("Effective configuration: {:?}", config);
    Ok(config)
}
