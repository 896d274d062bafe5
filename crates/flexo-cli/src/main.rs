//! `flexo` - shell over the customer and supplier record tables

mod cli;
mod logging;

use clap::Parser;
use cli::Cli;
use flexo_store::{StoreConfig, TableManager};
use logging::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let logging_config = if args.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    let _log_guard = logging::init(
        logging_config
            .with_json_logs(args.json_logs)
            .with_console_logs(!args.quiet),
    )?;

    let table = args.table()?;
    let config = StoreConfig::from_env();
    let manager = TableManager::from_config(&config).await?;

    let output = cli::run(&manager, table, args.command).await.inspect_err(|e| {
        tracing::error!(error = %e, table = %table.physical_name(), "command failed");
    })?;
    println!("{output}");
    Ok(())
}
