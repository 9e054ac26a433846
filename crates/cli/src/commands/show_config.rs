use anyhow::Result;
use clap::Args;
use sentiment_trade_core::AppConfig;

/// Arguments for the config command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Print a single section (data, features, trainer, backtest, sweep)
    #[arg(long)]
    pub section: Option<String>,
}

/// Prints the merged configuration as JSON.
pub fn run_show_config(config: &AppConfig, args: &ConfigArgs) -> Result<()> {
    let value = serde_json::to_value(config)?;
    let shown = match args.section.as_deref() {
        Some(section) => value
            .get(section)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown config section: '{section}'"))?,
        None => value,
    };
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
