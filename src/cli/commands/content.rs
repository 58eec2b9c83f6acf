use clap::Subcommand;

use crate::api::{count_items, Resource};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::PortfolioClient;

#[derive(Subcommand)]
pub enum ContentCommands {
    #[command(about = "List records of a resource")]
    List {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
    },

    #[command(about = "Create record from stdin")]
    Create {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
    },

    #[command(about = "Update record from stdin")]
    Update {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(help = "Record ID to update")]
        id: String,
    },

    #[command(about = "Delete record")]
    Delete {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(help = "Record ID to delete")]
        id: String,
    },
}

pub async fn handle(cmd: ContentCommands, client: &PortfolioClient, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ContentCommands::List { resource } => {
            let records = client.api().list(resource).await?;
            if matches!(output_format, OutputFormat::Text) && count_items(&records) == 0 {
                println!("No {} found", resource.label());
                return Ok(());
            }
            output_value(output_format, &records)
        }
        ContentCommands::Create { resource } => {
            let data = read_json_stdin()?;
            let created = client.api().create(resource, &data).await?;
            output_value(output_format, &created)
        }
        ContentCommands::Update { resource, id } => {
            let data = read_json_stdin()?;
            let updated = client.api().update(resource, &id, &data).await?;
            output_value(output_format, &updated)
        }
        ContentCommands::Delete { resource, id } => {
            client.api().delete(resource, &id).await?;
            output_success(output_format, &format!("Deleted {} {}", resource.label(), id), None)
        }
    }
}
