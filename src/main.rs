use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kestrel_uci::UciEngine;

fn main() -> Result<()> {
    // stdout carries the UCI protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    info!("kestrel starting");
    UciEngine::new().run()?;
    Ok(())
}
