use clap::Subcommand;
use serde_json::json;

use crate::auth::RegistrationForm;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::PortfolioClient;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the backend")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Register new user")]
    Register {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Password confirmation (will prompt if not provided)")]
        password_confirmation: Option<String>,
    },

    #[command(about = "Logout and forget stored credentials")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh authentication token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, client: &PortfolioClient, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            let password = secret_or_prompt(password, "Password: ")?;
            let outcome = client.auth().login(&username, &password).await?;

            output_success(
                output_format,
                &format!("{} (redirect: {})", outcome.message, outcome.redirect.path()),
                Some(json!({
                    "username": username,
                    "is_admin": outcome.session.is_admin(),
                    "redirect": outcome.redirect.path(),
                })),
            )
        }
        AuthCommands::Register { username, email, password, password_confirmation } => {
            let password = secret_or_prompt(password, "Password: ")?;
            let password_confirmation = secret_or_prompt(password_confirmation, "Confirm password: ")?;
            let form = RegistrationForm::new(username.clone(), email, password, password_confirmation);

            let outcome = client.auth().register(&form).await?;

            output_success(
                output_format,
                &format!("Registered user '{}'", username),
                Some(json!({
                    "username": username,
                    "redirect": outcome.redirect.path(),
                })),
            )
        }
        AuthCommands::Logout => {
            client.auth().logout();
            output_success(output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let session = client.session().session();

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "authenticated": session.is_authenticated(),
                            "has_refresh_token": session.refresh_token.is_some(),
                            "username": session.username,
                            "is_admin": session.is_admin(),
                            "updated_at": session.updated_at,
                            "backend": client.gateway().base_url().as_str(),
                        }))?
                    );
                }
                OutputFormat::Text => {
                    if session.is_authenticated() {
                        println!("Authenticated as {}", session.username.as_deref().unwrap_or("<unknown>"));
                    } else {
                        println!("Not authenticated");
                    }
                    println!("Refresh token: {}", if session.refresh_token.is_some() { "present" } else { "absent" });
                    println!("Admin: {}", session.is_admin());
                    if let Some(updated_at) = session.updated_at {
                        println!("Updated: {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                    println!("Backend: {}", client.gateway().base_url());
                }
            }
            Ok(())
        }
        AuthCommands::Refresh => {
            client.gateway().refresh().await?;
            output_success(output_format, "Access token refreshed", None)
        }
        AuthCommands::Whoami => {
            let session = client.session().session();

            match session.username.as_deref() {
                Some(username) if session.is_authenticated() => output_success(
                    output_format,
                    username,
                    Some(json!({ "username": username, "is_admin": session.is_admin() })),
                ),
                _ => anyhow::bail!("Not logged in"),
            }
        }
    }
}
