use anyhow::Result;
use clap::Parser;

use dojo_cli::{
    api::DojoClient,
    app::load_config,
    cli::{handle_command, Cli},
    utils::{error, init_logger, install_palette},
};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::debug!("{:?}", err);
        error(format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    install_palette(&config);

    let client = DojoClient::new(&config)?;
    handle_command(cli.command, &config, &client).await
}
