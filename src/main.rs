use anyhow::Result;
use clap::Parser;
use miccheck::cli::{handle_check_command, handle_serve_command, Cli, CliCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("miccheck {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Serve(args)) => handle_serve_command(args).await,
        Some(CliCommand::Check(args)) => handle_check_command(args).await,
        None => handle_check_command(Default::default()).await,
    }
}
