use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use wrapped_app::{app, config, logging};

#[derive(Debug, Parser)]
#[command(name = "wrapped", about = "Follow a wallet report from request to result")]
struct Cli {
    /// Wallet address to connect on startup; overrides the config file.
    #[arg(short, long)]
    wallet: Option<String>,

    /// Path to the RON config file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Request a new report as soon as the wallet is connected.
    #[arg(long)]
    start: bool,

    /// Write the default config to `--config` and exit.
    #[arg(long)]
    init_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        config::write_default(&cli.config)?;
        println!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let config = config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    logging::initialize(
        config.log,
        logging::parse_level(&config.log_level),
        &config.log_file,
    );

    let wallet = cli.wallet.or_else(|| config.wallet.clone());
    app::run(config, wallet, cli.start)
}
