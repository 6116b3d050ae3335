use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "shelf", version, about = "Book catalogue service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Print the merged OpenAPI document
    Openapi,
    /// Print the resolved settings as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load settings")?;

    match cli.command {
        Command::Serve => {
            shelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "shelf serve starting");
            shelf_app::run(settings).await
        }
        Command::Openapi => {
            // Documents only need the module shapes, not a live database
            let registry = shelf_app::build_registry(&shelf_app::Storage::memory());
            let document = shelf_http::router::openapi_document(&registry);
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
