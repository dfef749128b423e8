use std::num::{NonZeroUsize, ParseIntError};
use std::path::PathBuf;

use alloy::transports::http::reqwest::Url;

/// Block traced when none is given.
pub const DEFAULT_BLOCK_NUMBER: u64 = 0x151d747;

/// Endpoint used when none is given.
pub const DEFAULT_RPC_URL: &str = "https://docs-demo.quiknode.pro/";

/// Upper bound of RPC requests in flight at any moment.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// Everything one run of the tracer depends on.
#[derive(Clone, Debug)]
pub struct TracerConfig {
    /// JSON-RPC endpoint. Must serve `debug_traceTransaction` and
    /// `eth_getProof` for the traced block and its parent.
    pub rpc_url: Url,
    /// The block whose touched state is traced.
    pub block_number: u64,
    /// Where the artifacts are written.
    pub output_dir: PathBuf,
    /// Upper bound of RPC requests in flight at any moment.
    pub max_concurrent_requests: NonZeroUsize,
}

impl TracerConfig {
    /// A configuration for `block_number` with default output directory and
    /// concurrency.
    pub fn new(rpc_url: Url, block_number: u64) -> Self {
        Self {
            rpc_url,
            block_number,
            output_dir: PathBuf::from("."),
            max_concurrent_requests: NonZeroUsize::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Parses a block number given either in decimal or as `0x` prefixed hex.
pub fn parse_block_number(s: &str) -> Result<u64, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
