use anyhow::Context;
use clap::Parser;
use portal_plugins::core::Entity;
use portal_plugins::utils::logger;
use portal_plugins::{resolve_doc_root, AppConfig, ArchiveUrlReader};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "techdocs-root")]
#[command(about = "Materialize an entity's repository and print its documentation root")]
struct Args {
    /// Path to a catalog entity JSON file
    entity: PathBuf,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override techdocs.working_directory
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => AppConfig::default(),
    };
    let working_dir = args
        .working_dir
        .unwrap_or(config.techdocs.working_directory);

    let content = std::fs::read_to_string(&args.entity)
        .with_context(|| format!("failed to read entity file '{}'", args.entity.display()))?;
    let entity: Entity = serde_json::from_str(&content)
        .with_context(|| format!("'{}' is not a valid entity", args.entity.display()))?;

    let reader = ArchiveUrlReader::new(working_dir)?;
    let doc_root = match resolve_doc_root(&reader, &entity).await {
        Ok(doc_root) => doc_root,
        Err(e) => {
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            return Err(e).with_context(|| {
                format!("failed to resolve docs for '{}'", entity.metadata.name)
            });
        }
    };

    println!("{}", doc_root.display());
    Ok(())
}
