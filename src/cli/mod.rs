pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{self, ClientConfig};
use crate::error::ClientError;
use crate::PortfolioClient;

#[derive(Parser)]
#[command(name = "portf")]
#[command(about = "Portfolio CLI - Command-line client for the portfolio backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "PORTFOLIO_BACKEND_URL", help = "Backend base URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Portfolio content operations")]
    Content {
        #[command(subcommand)]
        cmd: commands::content::ContentCommands,
    },

    #[command(about = "Toggle a reaction on a meme or blog post")]
    React {
        #[arg(value_enum, help = "What to react to")]
        target: crate::api::ReactionTarget,
        #[arg(help = "Meme or blog ID")]
        id: u64,
        #[arg(value_enum, help = "Reaction to toggle")]
        reaction: crate::api::ReactionType,
    },

    #[command(about = "Meme comments")]
    Comment {
        #[command(subcommand)]
        cmd: commands::social::CommentCommands,
    },

    #[command(about = "Send a message through the contact form")]
    Contact {
        #[arg(long, help = "Your name")]
        name: String,
        #[arg(long, help = "Your email address")]
        email: String,
        #[arg(long, help = "Message text")]
        message: String,
    },

    #[command(about = "Admin dashboard")]
    Admin {
        #[command(subcommand)]
        cmd: commands::admin::AdminCommands,
    },

    #[command(about = "Show where navigating to a path would land")]
    Route {
        #[arg(help = "Path, e.g. /admin")]
        path: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let config = config::config().clone();
    match cli.base_url.as_deref() {
        Some(url) => config.with_base_url(url),
        None => Ok(config),
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = PortfolioClient::from_config(&client_config(&cli)?)?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &client, &output_format).await,
        Commands::Content { cmd } => commands::content::handle(cmd, &client, &output_format).await,
        Commands::React { target, id, reaction } => {
            commands::social::react(target, id, reaction, &client, &output_format).await
        }
        Commands::Comment { cmd } => commands::social::handle(cmd, &client, &output_format).await,
        Commands::Contact { name, email, message } => {
            commands::social::contact(&name, &email, &message, &client, &output_format).await
        }
        Commands::Admin { cmd } => commands::admin::handle(cmd, &client, &output_format).await,
        Commands::Route { path } => commands::admin::route(&path, &client, &output_format),
    };

    if let Err(e) = &result {
        if let Some(client_error) = e.downcast_ref::<ClientError>() {
            utils::output_client_error(&output_format, client_error)?;
        }
    }

    result
}
