use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use mpt_tracer::config::TracerConfig;
use mpt_tracer::env::load_dotenvy_vars_if_present;
use mpt_tracer::provider::RpcStateProvider;
use tracing::info;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenvy_vars_if_present();
    mpt_tracer::tracing::init();

    let config: TracerConfig = cli::Cli::parse().into();
    info!(
        "Tracing block {} via {} into {}",
        config.block_number,
        config.rpc_url,
        config.output_dir.display()
    );

    let provider = RpcStateProvider::connect(
        config.rpc_url.clone(),
        config.max_concurrent_requests,
    );

    let start = Instant::now();
    let written = mpt_tracer::run(&provider, &config).await?;
    info!(
        "Wrote {} artifacts in {:?}",
        written.len(),
        start.elapsed()
    );
    for path in written {
        info!("{}", path.display());
    }

    Ok(())
}
