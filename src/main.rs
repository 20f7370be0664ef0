use anyhow::{Context, Result};
use chatwire::cli::{Cli, Commands, Config, ConfigCommand, LoggingDispatcher};
use chatwire::network::{Session, TcpConnector};
use chatwire::ticket::{Credentials, HttpTicketIssuer, TicketCache};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn config_path(cli_path: Option<&Path>) -> Result<PathBuf> {
    match cli_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_config_file(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let path = config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommand::Path => {
                println!("{}", path.display());
                if !path.exists() {
                    info!("Configuration file does not exist yet");
                    info!("Run 'chatwire config init' to create it");
                }
            }
            ConfigCommand::Show => {
                let config = Config::load_or_create(&path)?;
                let content = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                print!("{}", content);
            }
            ConfigCommand::Init => {
                Config::default().save_to(&path)?;
                info!("Wrote default configuration to {}", path.display());
            }
        },
        Commands::Connect {
            account,
            character,
            password,
            host,
            port,
            no_handshake,
        } => {
            let mut config = Config::load_or_create(&path)
                .context("Failed to initialize configuration")?;
            if let Some(account) = account {
                config.account = account;
            }
            if let Some(character) = character {
                config.character = character;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if no_handshake {
                config.legacy_handshake = false;
            }

            if config.account.is_empty() || config.character.is_empty() {
                anyhow::bail!(
                    "An account and a character are required; pass --account/--character or set them in {}",
                    path.display()
                );
            }

            run_session(config, password).await?;
        }
    }

    Ok(())
}

async fn run_session(config: Config, password: String) -> Result<()> {
    let session_config = config.session_config()?;
    let user_agent = format!(
        "{}/{}",
        session_config.client_name, session_config.client_version
    );
    let issuer = HttpTicketIssuer::new(&config.ticket_url, config.http_timeout(), &user_agent)
        .context("Failed to create ticket client")?;
    let credentials = Credentials::new(&config.account, password, &config.character);

    let (session, handle) = Session::new(
        session_config,
        credentials,
        TcpConnector,
        issuer,
        TicketCache::new(),
        LoggingDispatcher::new(),
    );

    let interrupt = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, logging out");
                interrupt.close();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match session.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Disconnected: {}", e);
            Err(e).context("Session ended with an error")
        }
    }
}
