use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(about = "A chat-protocol client that keeps one character logged in")]
pub struct Cli {
    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and stay connected until interrupted
    ///
    /// Account, character and server default to the configuration file.
    ///
    /// Examples:
    ///   chatwire connect --account alice --character Alice
    ///   CHATWIRE_PASSWORD=secret chatwire connect --no-handshake
    Connect {
        /// Account used to request the login ticket
        #[arg(short, long)]
        account: Option<String>,
        /// Character to log in as
        #[arg(short, long)]
        character: Option<String>,
        /// Account password
        #[arg(short, long, env = "CHATWIRE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Chat server host
        #[arg(long)]
        host: Option<String>,
        /// Chat server port
        #[arg(long)]
        port: Option<u16>,
        /// Identify directly instead of sending the legacy upgrade request
        #[arg(long)]
        no_handshake: bool,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default configuration file (overwrites existing)
    Init,
}
