//! CLI entry point for the Apatie client.

pub mod auth;
pub mod request;

use clap::{Parser, Subcommand};

use crate::client::ApiClientOptions;

/// Apatie API CLI
#[derive(Parser, Debug)]
#[command(name = "apatie", version, about = "Apatie API client")]
pub struct Cli {
    /// API base URL (defaults to APATIE_API_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Language preference sent as Accept-Language (fa, en, ...)
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Client options from the global flags.
    pub fn client_options(&self) -> ApiClientOptions {
        ApiClientOptions {
            base_url: self.base_url.clone(),
            timeout: self.timeout_ms.map(std::time::Duration::from_millis),
            language: self.language.clone(),
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Obtain and store a token pair
    Login(LoginArgs),
    /// Forget stored credentials
    Logout,
    /// Show authentication status
    Status,
    /// Send an authenticated request
    Request(RequestArgs),
}

/// Arguments for `apatie login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account username
    pub username: String,

    /// Password (prompted on stdin when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Arguments for `apatie request`.
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to the base URL, e.g. /services
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}
