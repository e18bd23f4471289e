//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

use crate::commands::{self, RecordOptions};
use crate::logging;

/// Record from the microphone, listen back, and upload each take
#[derive(Parser)]
#[command(name = "micpost")]
#[command(version)]
#[command(about = "Record from the microphone, listen back, and upload each take")]
#[command(long_about = "Record from the microphone, listen back, and upload each take.\n\nEvery recording is played back locally and sent as a single multipart POST\n(field 'audio', file 'recording.wav') to the configured endpoint,\nhttp://localhost:8080/upload by default.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nEXAMPLES:\n    # Interactive recorder\n    $ micpost\n\n    # Record 10 seconds without the UI and upload\n    $ micpost record --duration 10\n\n    # Upload to a different endpoint\n    $ micpost record --endpoint http://127.0.0.1:9000/upload\n\n    # Upload an existing file\n    $ micpost upload take.wav")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/micpost/micpost.toml\n    Logs:               ~/.local/state/micpost/micpost.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio, play it back, and upload it (default)
    ///
    /// Press 's' or Space to start, Enter or 'x' to stop and upload, 'q' to quit.
    /// Sending SIGUSR1 stops the current recording.
    #[command(visible_alias = "r")]
    Record {
        /// Record for SECS seconds without the UI, upload, and exit
        #[arg(short, long, value_name = "SECS")]
        duration: Option<u64>,

        /// Do not play recordings back locally
        #[arg(long)]
        no_playback: bool,

        /// Upload endpoint overriding the config file
        #[arg(short, long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Upload an existing audio file to the endpoint
    #[command(visible_alias = "u")]
    Upload {
        /// Path to the audio file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Upload endpoint overriding the config file
        #[arg(short, long, value_name = "URL")]
        endpoint: Option<String>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Writes the default configuration first if none exists.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    Logs,

    /// Generate shell completion script
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "micpost", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Logs) => {
            if let Err(e) = commands::handle_logs() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None => commands::handle_record(RecordOptions::default()).await?,
        Some(Commands::Record {
            duration,
            no_playback,
            endpoint,
        }) => {
            commands::handle_record(RecordOptions {
                duration,
                no_playback,
                endpoint,
            })
            .await?
        }
        Some(Commands::Upload { file, endpoint }) => {
            commands::handle_upload(file, endpoint).await?
        }
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_record_flags_parse() {
        let cli = Cli::try_parse_from([
            "micpost",
            "record",
            "--duration",
            "5",
            "--no-playback",
            "-e",
            "http://127.0.0.1:9000/upload",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Record {
                duration,
                no_playback,
                endpoint,
            }) => {
                assert_eq!(duration, Some(5));
                assert!(no_playback);
                assert_eq!(endpoint.as_deref(), Some("http://127.0.0.1:9000/upload"));
            }
            _ => panic!("expected record command"),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_record() {
        let cli = Cli::try_parse_from(["micpost"]).unwrap();
        assert!(cli.command.is_none());
    }
}
