//! catalog subcommand - inspect scanned modules and classes

use clap::Subcommand;
use reflect::{ClassId, PackageCatalog, TypeCatalog};
use std::collections::HashSet;
use std::path::Path;
use uml::MemberLister;

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List discovered modules
    Modules {
        /// Package directory
        path: String,
        /// Package name (default: directory name)
        #[arg(long)]
        name: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// List classes with their bases and public functions
    Classes {
        /// Package directory
        path: String,
        /// Package name (default: directory name)
        #[arg(long)]
        name: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cmd: CatalogCommands) -> anyhow::Result<()> {
    match cmd {
        CatalogCommands::Modules { path, name, json } => cmd_modules(&path, name.as_deref(), json),
        CatalogCommands::Classes { path, name, json } => cmd_classes(&path, name.as_deref(), json),
    }
}

/// 扫描并解析包目录
pub fn load_catalog(path: &str, name: Option<&str>) -> anyhow::Result<PackageCatalog> {
    let root = Path::new(path);
    eprintln!("Scanning: {}", root.display());

    let catalog = match name {
        Some(name) => PackageCatalog::load_as(root, name)?,
        None => PackageCatalog::load(root)?,
    };
    eprintln!(
        "Package {}: {} modules",
        catalog.root(),
        catalog.modules().len()
    );
    Ok(catalog)
}

fn cmd_modules(path: &str, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let catalog = load_catalog(path, name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.modules())?);
    } else {
        for record in catalog.modules() {
            println!("{:<40} {}", record.module, record.relative);
        }
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct ClassItem {
    id: String,
    bases: Vec<String>,
    members: Vec<String>,
}

/// 按发现顺序收集每个类一次
fn collect_classes(catalog: &PackageCatalog) -> anyhow::Result<Vec<ClassItem>> {
    let lister = MemberLister::new(catalog);
    let mut seen: HashSet<ClassId> = HashSet::new();
    let mut items = Vec::new();

    for record in catalog.modules() {
        for class in catalog.classes_in(&record.module)? {
            if !seen.insert(class.clone()) {
                continue;
            }
            let bases = catalog.bases_of(&class)?;
            let members = lister.entries(&class)?;
            items.push(ClassItem {
                id: class.to_string(),
                bases: bases.iter().map(|b| b.to_string()).collect(),
                members: members
                    .iter()
                    .map(|m| format!("{}{}", m.name, m.signature))
                    .collect(),
            });
        }
    }

    Ok(items)
}

fn cmd_classes(path: &str, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let catalog = load_catalog(path, name)?;
    let items = collect_classes(&catalog)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        println!("\nFound {} classes:\n", items.len());
        for item in &items {
            if item.bases.is_empty() {
                println!("  {}", item.id);
            } else {
                println!("  {}({})", item.id, item.bases.join(", "));
            }
            for member in &item.members {
                println!("    +{}", member);
            }
            println!();
        }
    }

    Ok(())
}
