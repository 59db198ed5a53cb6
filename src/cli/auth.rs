//! CLI auth command handlers for login, status, and logout.

use std::io::Write;

use crate::auth::AuthSession;
use crate::client::{create_api_client, ApiClientOptions};

/// Handle `apatie login <username>`.
pub async fn handle_login(
    options: ApiClientOptions,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    if password.is_empty() {
        return Err("No password provided".into());
    }

    let client = create_api_client(options)?;
    let tokens = client.login(username, &password).await?;
    match tokens.expires_at {
        Some(expires) => println!(
            "Logged in as {username} (access token expires {})",
            expires.format("%Y-%m-%d %H:%M")
        ),
        None => println!("Logged in as {username}"),
    }
    Ok(())
}

/// Handle `apatie status`.
pub fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let session = AuthSession::global();
    match session.get_auth_tokens() {
        Some(tokens) => {
            let status = match tokens.expires_at {
                Some(expires) if tokens.is_expired() => format!(
                    "Access token expired at {} (refreshes on next request)",
                    expires.format("%Y-%m-%d %H:%M")
                ),
                Some(expires) => format!(
                    "Logged in (access token expires {})",
                    expires.format("%Y-%m-%d %H:%M")
                ),
                None => "Logged in".to_string(),
            };
            println!("{status}");
            if !tokens.has_refresh_token() {
                println!("No refresh token stored; a 401 will require logging in again");
            }
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

/// Handle `apatie logout`.
pub fn handle_logout() -> Result<(), Box<dyn std::error::Error>> {
    AuthSession::global().clear_authentication();
    println!("Logged out");
    Ok(())
}

fn prompt_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
