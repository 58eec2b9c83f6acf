use clap::Subcommand;
use serde_json::json;

use crate::api::{ReactionChange, ReactionTarget, ReactionType};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::PortfolioClient;

#[derive(Subcommand)]
pub enum CommentCommands {
    #[command(about = "Comment on a meme")]
    Add {
        #[arg(help = "Meme ID")]
        meme_id: u64,
        #[arg(help = "Comment text")]
        text: String,
    },

    #[command(about = "Edit one of your comments")]
    Edit {
        #[arg(help = "Comment ID")]
        id: String,
        #[arg(help = "New comment text")]
        text: String,
    },

    #[command(about = "Delete one of your comments")]
    Delete {
        #[arg(help = "Comment ID")]
        id: String,
    },
}

pub async fn handle(cmd: CommentCommands, client: &PortfolioClient, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CommentCommands::Add { meme_id, text } => {
            let comment = client.api().add_comment(meme_id, &text).await?;
            output_value(output_format, &comment)
        }
        CommentCommands::Edit { id, text } => {
            let comment = client.api().edit_comment(&id, &text).await?;
            output_value(output_format, &comment)
        }
        CommentCommands::Delete { id } => {
            client.api().delete_comment(&id).await?;
            output_success(output_format, &format!("Deleted comment {}", id), None)
        }
    }
}

pub async fn react(
    target: ReactionTarget,
    id: u64,
    reaction: ReactionType,
    client: &PortfolioClient,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    let change = client.api().react(target, id, reaction).await?;

    let message = match &change {
        ReactionChange::Created(_) => "Reaction added",
        ReactionChange::Updated(_) => "Reaction updated",
        ReactionChange::Removed => "Reaction removed",
    };

    output_success(output_format, message, Some(json!({ "reaction": change })))
}

pub async fn contact(
    name: &str,
    email: &str,
    message: &str,
    client: &PortfolioClient,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    client.api().send_contact(name, email, message).await?;
    output_success(output_format, "Message sent successfully!", None)
}
