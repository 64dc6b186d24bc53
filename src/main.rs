//! stackforge CLI: emits CloudFormation templates for a VPC and an app cluster.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stackforge",
    version,
    about = "Declarative CloudFormation generator for a VPC topology and a tiered app cluster"
)]
struct Cli {
    #[command(subcommand)]
    command: stackforge::cli::Commands,
}

fn main() {
    // stdout carries the document; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = stackforge::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
