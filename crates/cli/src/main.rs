//! CropSight - Main Entry Point

use clap::Parser;
use cli::{init_logging, run, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    run(Args::parse()).await
}
