use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use artioma::config::ExhibitConfig;

/// First-person walkthrough of the Artioma exhibition.
#[derive(Parser, Debug)]
#[command(name = "artioma", version, about)]
struct Args {
    /// RON file overriding the built-in exhibition settings
    #[arg(short, long, env = "ARTIOMA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the asset paths are resolved against
    #[arg(short, long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    artioma::logging::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExhibitConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExhibitConfig::default(),
    };
    if let Some(root) = args.assets {
        config.assets.root = root;
    }

    tracing::info!("Assets from {}", config.assets.root.display());
    artioma::app::run(config).context("running the exhibition")?;
    Ok(())
}
