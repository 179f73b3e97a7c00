use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use artioma::server::{self, DEFAULT_PORT};

/// Serve the built web bundle with a single-page fallback.
#[derive(Parser, Debug)]
#[command(name = "artioma-serve", version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Document root holding index.html
    #[arg(short, long, default_value = "dist")]
    root: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    artioma::logging::init();
    let args = Args::parse();

    server::serve(args.port, args.root.clone())
        .await
        .with_context(|| format!("serving {}", args.root.display()))
}
