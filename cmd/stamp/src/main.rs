mod cli;
mod keys;

use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::Directive};

use crate::cli::CLI;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = CLI::parse();

    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(cli.opts.log_level))
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    cli.command.run(&cli.opts).await
}
