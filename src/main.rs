//! Apatie CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apatie_client::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.client_options();

    let result = match cli.command {
        Commands::Login(args) => {
            apatie_client::cli::auth::handle_login(options, &args.username, args.password).await
        }
        Commands::Logout => apatie_client::cli::auth::handle_logout(),
        Commands::Status => apatie_client::cli::auth::handle_status(),
        Commands::Request(args) => {
            apatie_client::cli::request::handle_request(
                options,
                &args.method,
                &args.path,
                args.data.as_deref(),
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
