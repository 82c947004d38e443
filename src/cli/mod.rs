pub mod args;
pub mod check;

use crate::app;
use crate::config::Config;
use anyhow::Result;

pub use args::{CheckCliArgs, Cli, CliCommand, ServeCliArgs};
pub use check::handle_check_command;

pub async fn handle_serve_command(args: ServeCliArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = args.port {
        config.server.bind_port = port;
    }
    if args.no_transcode {
        config.server.transcode = false;
    }

    app::run_server(&config).await
}
