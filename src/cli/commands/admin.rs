use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::routes::{AdminGuard, GuardDecision, Navigation};
use crate::PortfolioClient;

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Show item counts for every dashboard section")]
    Dashboard,
}

pub async fn handle(cmd: AdminCommands, client: &PortfolioClient, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Dashboard => {
            if let GuardDecision::Redirect(route) = AdminGuard::check(&client.session().session()) {
                anyhow::bail!("Admin session required; log in as an admin first ({})", route.path());
            }

            let stats = client.api().dashboard_stats().await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "sections": stats }))?);
                }
                OutputFormat::Text => {
                    println!("{:<16} {}", "SECTION", "ITEMS");
                    println!("{}", "-".repeat(30));
                    for entry in &stats {
                        match (entry.count, entry.error.as_deref()) {
                            (Some(count), _) => println!("{:<16} {}", entry.resource.label(), count),
                            (None, Some(error)) => println!("{:<16} error: {}", entry.resource.label(), error),
                            (None, None) => println!("{:<16} -", entry.resource.label()),
                        }
                    }
                }
            }

            Ok(())
        }
    }
}

pub fn route(path: &str, client: &PortfolioClient, output_format: &OutputFormat) -> anyhow::Result<()> {
    let navigation = client.navigate(path);

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "path": path, "navigation": navigation }))?);
        }
        OutputFormat::Text => match navigation {
            Navigation::Render(route) => println!("{} renders {:?}", path, route),
            Navigation::Redirect(route) => println!("{} redirects to {}", path, route.path()),
        },
    }

    Ok(())
}
