//! CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::Value;
use simulador_core::FileStorage;
use simulador_http::{SessionClient, SessionTeardown};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{self, CliConfig};

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Session(SessionCommands),

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Commands that talk to the API with the stored session
#[derive(Subcommand)]
pub enum SessionCommands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SIMULADOR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the session
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "SIMULADOR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Validate the stored session and show the signed-in user
    Whoami,

    /// GET a protected resource and print its JSON body
    Get {
        /// Path relative to the base URL, e.g. /api/portafolio
        path: String,
    },

    /// POST a JSON body to a protected resource
    Post {
        /// Path relative to the base URL
        path: String,

        /// JSON request body (defaults to `{}`)
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate a default configuration file
    Init {
        /// Output file path (defaults to <data_dir>/config.json)
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

/// Session teardown for the terminal: the store is already empty, so the
/// only thing left is to send the user back to `login`.
struct LoginPrompt;

impl SessionTeardown for LoginPrompt {
    fn abandon_session(&self) {
        warn!("Session expired and could not be renewed");
        eprintln!("Your session has expired. Run `simulador login` to sign in again.");
    }
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, config_file: Option<PathBuf>) -> Result<()> {
        let config_file = config_file.or_else(|| {
            let default_config = data_dir.join("config.json");
            default_config.exists().then_some(default_config)
        });

        match self {
            Commands::Session(command) => {
                if let Some(path) = &config_file {
                    info!("Loading configuration from: {}", path.display());
                }
                let config = CliConfig::load(config_file.as_deref())?;
                let client = build_client(&config, &data_dir)?;
                command.execute(&client).await
            }
            Commands::Config { command } => command.execute(data_dir, config_file),
        }
    }
}

impl SessionCommands {
    pub async fn execute(self, client: &SessionClient) -> Result<()> {
        match self {
            SessionCommands::Login { email, password } => {
                let user = client.login(&email, &password).await?;
                println!("Logged in as {} <{}>", user.name, user.email);
            }
            SessionCommands::Register {
                name,
                email,
                password,
            } => {
                let user = client.register(&name, &email, &password).await?;
                println!("Registered and logged in as {} <{}>", user.name, user.email);
            }
            SessionCommands::Logout => {
                client.logout()?;
                println!("Logged out");
            }
            SessionCommands::Whoami => match client.restore_session().await? {
                Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
                None => println!("Not logged in"),
            },
            SessionCommands::Get { path } => {
                let body: Value = client.get_json(&path).await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            SessionCommands::Post { path, body } => {
                let body: Value = match body {
                    Some(raw) => serde_json::from_str(&raw).context("--body is not valid JSON")?,
                    None => Value::Object(serde_json::Map::new()),
                };
                let response: Value = client.post_json(&path, &body).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }

        Ok(())
    }
}

impl ConfigCommands {
    pub fn execute(self, data_dir: PathBuf, config_file: Option<PathBuf>) -> Result<()> {
        match self {
            ConfigCommands::Init { output } => {
                let config_path = output.unwrap_or_else(|| data_dir.join("config.json"));

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
            ConfigCommands::Show => {
                let config = CliConfig::load(config_file.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                println!(
                    "# session file: {}",
                    config.session_file(&data_dir).display()
                );
                Ok(())
            }
        }
    }
}

fn build_client(config: &CliConfig, data_dir: &std::path::Path) -> Result<SessionClient> {
    let session_file = config.session_file(data_dir);
    let storage = FileStorage::open(&session_file)
        .with_context(|| format!("Failed to open session file {}", session_file.display()))?;

    let client = SessionClient::builder()
        .config(&config.client)
        .storage(Arc::new(storage))
        .teardown(Arc::new(LoginPrompt))
        .build()?;

    Ok(client)
}
