use clap::Parser;
use docqa_cli::{AppConfig, Cli, build_pipeline, logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging)?;

    let pipeline = build_pipeline(&config).await?;
    run(&pipeline, cli.command, cli.json).await
}
