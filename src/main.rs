//! umlgen - PlantUML class diagrams for Python packages

mod catalog_cli;
mod uml_cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "umlgen")]
#[command(about = "PlantUML class diagrams for Python packages", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate PlantUML notation
    Generate(uml_cli::GenerateArgs),
    /// Generate and render through a Kroki server
    Render(uml_cli::RenderArgs),
    /// Inspect what the scanner sees
    #[command(subcommand)]
    Catalog(catalog_cli::CatalogCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the diagram text
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => uml_cli::generate(args).await?,
        Commands::Render(args) => uml_cli::render(args).await?,
        Commands::Catalog(cmd) => catalog_cli::run(cmd)?,
    }

    Ok(())
}
