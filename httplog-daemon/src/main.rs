use anyhow::Result;
use clap::Parser;

use httplog_daemon::cli::DaemonCli;
use httplog_daemon::logging::init_tracing;
use httplog_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let (config, source) = cli.load_config().await?;

    if cli.validate {
        println!("configuration is valid ({source})");
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(
        config = %source,
        endpoint = %config.receiver.endpoint,
        "httplog-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await?;

    tracing::info!("httplog-daemon shut down");
    Ok(())
}
