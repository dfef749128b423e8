use std::num::NonZeroUsize;
use std::path::PathBuf;

use alloy::transports::http::reqwest::Url;
use clap::{Parser, ValueHint};
use mpt_tracer::config::{
    parse_block_number, TracerConfig, DEFAULT_BLOCK_NUMBER, DEFAULT_RPC_URL,
};

/// Verifies the state proofs touched by a block and writes their trie graphs.
#[derive(Parser)]
#[command(version, about)]
pub(crate) struct Cli {
    /// The block to trace, in decimal or `0x` prefixed hex.
    #[arg(value_parser = parse_block_number, default_value_t = DEFAULT_BLOCK_NUMBER)]
    pub(crate) block_number: u64,
    /// The node RPC URL.
    #[arg(short = 'u', long, env = "MPT_TRACER_RPC_URL", default_value = DEFAULT_RPC_URL, value_hint = ValueHint::Url)]
    pub(crate) rpc_url: Url,
    /// The directory to which artifacts are written.
    #[arg(short, long, env = "MPT_TRACER_OUTPUT_DIR", default_value = ".", value_hint = ValueHint::DirPath)]
    pub(crate) output_dir: PathBuf,
    /// The maximum number of RPC requests in flight.
    #[arg(long, env = "MPT_TRACER_MAX_CONCURRENT_REQUESTS", default_value = "16")]
    pub(crate) max_concurrent_requests: NonZeroUsize,
}

impl From<Cli> for TracerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            rpc_url: cli.rpc_url,
            block_number: cli.block_number,
            output_dir: cli.output_dir,
            max_concurrent_requests: cli.max_concurrent_requests,
        }
    }
}
