use clap::Parser;
use portfolio_client::cli::Cli;
use portfolio_client::ClientError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so PORTFOLIO_BACKEND_URL and friends are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = portfolio_client::cli::run(cli).await {
        // Client errors were already reported in the requested output format
        if e.downcast_ref::<ClientError>().is_none() {
            match std::env::var("CLI_VERBOSE").as_deref() {
                Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
                _ => eprintln!("Error: {e}"),
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
