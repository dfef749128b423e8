//! Fetches the state proofs of every account a block touched, verifies them
//! against the state roots before and after the block and writes the
//! resulting trie graphs and leaf records as JSON artifacts.

use std::path::PathBuf;

pub mod aggregator;
pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod provider;
pub mod rpc;
pub mod tracing;

use config::TracerConfig;
use provider::StateProvider;

/// Traces `config.block_number` and writes its artifacts to
/// `config.output_dir`, returning the paths written.
///
/// Nothing is written unless every proof of the block verified.
pub async fn run<P: StateProvider>(
    provider: &P,
    config: &TracerConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let proof_set = aggregator::trace_block(provider, config).await?;
    let artifacts = fs::render_artifacts(&proof_set)?;

    fs::write_artifacts(&config.output_dir, artifacts).await
}
