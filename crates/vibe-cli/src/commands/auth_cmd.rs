use vibe_core::config::ClientConfig;

use crate::auth::{auth_client, clear_stored_session, load_stored_session, AuthSession};
use crate::cli::AuthCommands;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, config: &ClientConfig) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let session = auth_client(config)?.sign_in(&email, &password).await?;
            println!("Signed in as {}", email_label(&session));
        }
        AuthCommands::Status => {
            let session = if config.supabase().is_ok() {
                auth_client(config)?.restore_session().await?
            } else {
                load_stored_session()?
            };

            match session {
                Some(session) => println!(
                    "Signed in as {} (expires_at={})",
                    email_label(&session),
                    session.expires_at
                ),
                None => println!("Not signed in."),
            }
        }
        AuthCommands::Logout => {
            let stored = load_stored_session()?;
            match (config.supabase().is_ok(), stored) {
                (true, Some(session)) => {
                    auth_client(config)?.sign_out(&session.access_token).await?;
                }
                _ => clear_stored_session()?,
            }
            println!("Signed out");
        }
    }
    Ok(())
}

fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
