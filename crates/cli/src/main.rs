use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::modules::books::models::NewBook;
use shelf_app::modules::search::providers::ExternalLookup;
use shelf_app::Application;
use shelf_kernel::settings::Settings;

/// Operate a shelf book library.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    /// Database URL, overriding `database.url` from configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API until interrupted
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Add catalog books from a JSON array of book payloads
    Import {
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Check whether the external metadata providers are reachable
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            shelf_telemetry::init_fallback();
            return Err(err.context("failed to load shelf settings"));
        }
    };
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }
    shelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => Application::bootstrap(settings).await?.run().await,
        Command::Migrate => {
            let app = Application::bootstrap(settings).await?;
            println!("{} migrations applied", app.migrations_applied());
            app.pool().close().await;
            Ok(())
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let books: Vec<NewBook> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of books", file.display()))?;

            let app = Application::bootstrap(settings).await?;
            let report = app.services().books.import_catalog(books).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            app.pool().close().await;
            Ok(())
        }
        Command::Providers => {
            let lookup = ExternalLookup::from_settings(&settings.providers)?;
            let health = lookup.health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            Ok(())
        }
    }
}
