//! generate / render subcommands

use crate::catalog_cli::load_catalog;
use clap::Args;
use reflect::TypeCatalog;
use std::path::Path;
use uml::{ClassFilter, Diagram, KrokiRenderer, OutputFormat, Renderer, UmlConfig};

/// Flags shared by generate and render
#[derive(Args, Debug, Clone, Default)]
pub struct DiagramArgs {
    /// Package directory
    pub path: String,
    /// Package name (default: directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Drop classes defined outside the package
    #[arg(long)]
    pub internal_only: bool,
    /// Drop classes under this module or class prefix (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,
    /// Wrap everything in a namespace block
    #[arg(long)]
    pub namespace: Option<String>,
    /// Keep filesystem traversal order instead of sorting modules
    #[arg(long)]
    pub unsorted: bool,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub diagram: DiagramArgs,
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub diagram: DiagramArgs,
    /// Image file
    #[arg(short, long)]
    pub output: String,
    /// svg, png, pdf or txt
    #[arg(short, long)]
    pub format: Option<String>,
    /// Kroki base URL
    #[arg(long)]
    pub server: Option<String>,
    /// Also save the PlantUML source
    #[arg(long)]
    pub source: Option<String>,
}

/// 命令行参数覆盖环境变量
fn apply_flags(mut config: UmlConfig, args: &DiagramArgs) -> UmlConfig {
    if args.unsorted {
        config.sort_modules = false;
    }
    if args.internal_only {
        config.internal_only = true;
    }
    if let Some(namespace) = &args.namespace {
        config.namespace = Some(namespace.clone());
    }
    config
}

fn build_diagram(config: &UmlConfig, args: &DiagramArgs, root: &str) -> Diagram {
    let mut filter = ClassFilter::new();
    if config.internal_only {
        filter = filter.internal_only(root);
    }
    for prefix in &args.exclude {
        filter = filter.exclude(prefix);
    }

    let diagram = Diagram::new().with_options(config.diagram_options());
    if filter.is_empty() {
        diagram
    } else {
        diagram.with_filter(filter.into_predicate())
    }
}

fn generate_text(config: &UmlConfig, args: &DiagramArgs) -> anyhow::Result<String> {
    let catalog = load_catalog(&args.path, args.name.as_deref())?;
    let diagram = build_diagram(config, args, catalog.root());
    Ok(diagram.generate(&catalog)?)
}

fn write_text(path: &str, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, format!("{}\n", text))?;
    eprintln!("Saved to: {}", path);
    Ok(())
}

pub async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = apply_flags(UmlConfig::from_env(), &args.diagram);
    let text = generate_text(&config, &args.diagram)?;

    match args.output.as_deref() {
        Some(file) => write_text(file, &text)?,
        None => println!("{}", text),
    }

    Ok(())
}

pub async fn render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = apply_flags(UmlConfig::from_env(), &args.diagram);
    if let Some(format) = &args.format {
        config.format = format.parse::<OutputFormat>()?;
    }
    if let Some(server) = &args.server {
        config.render_url = server.clone();
    }

    let text = generate_text(&config, &args.diagram)?;
    if let Some(source) = args.source.as_deref() {
        write_text(source, &text)?;
    }

    let renderer = KrokiRenderer::new(&config.render_url)?;
    eprintln!("Rendering {} via {}", config.format, renderer.base_url());
    let image = renderer.render(&text, config.format).await?;

    std::fs::write(Path::new(&args.output), &image)?;
    eprintln!("Saved to: {} ({} bytes)", args.output, image.len());

    Ok(())
}
