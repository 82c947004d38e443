use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "miccheck")]
#[command(about = "Check that your microphone works", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Record a short sample, upload it and play back the server copy
    Check(CheckCliArgs),
    /// Run the local development server for the mic check endpoints
    Serve(ServeCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct CheckCliArgs {
    /// Server base URL (default: from config)
    #[arg(long)]
    pub base_url: Option<String>,
    /// Do not play the sample back after uploading
    #[arg(long)]
    pub no_playback: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ServeCliArgs {
    /// Port to bind on 127.0.0.1 (default: from config)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Store uploads as-is instead of transcoding them with ffmpeg
    #[arg(long)]
    pub no_transcode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_with_base_url() {
        let cli = Cli::parse_from(["miccheck", "check", "--base-url", "http://example.test"]);
        match cli.command {
            Some(CliCommand::Check(args)) => {
                assert_eq!(args.base_url.as_deref(), Some("http://example.test"));
                assert!(!args.no_playback);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::parse_from(["miccheck", "-v", "serve", "--port", "9000", "--no-transcode"]);
        assert!(cli.verbose);
        match cli.command {
            Some(CliCommand::Serve(args)) => {
                assert_eq!(args.port, Some(9000));
                assert!(args.no_transcode);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::parse_from(["miccheck"]);
        assert!(cli.command.is_none());
    }
}
