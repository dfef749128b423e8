use alloy::transports::TransportError;
use mpt_proof::{proof::MalformedProofError, proof_set::Phase, verifier::ProofError};
use thiserror::Error;
use tokio::sync::AcquireError;

/// A request to the state provider did not produce a usable result.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{method} failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("{method} returned no or an invalid `{path}`: {source}")]
    MissingField {
        method: &'static str,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("block {0} does not exist")]
    BlockNotFound(u64),

    #[error("request limiter was closed")]
    LimiterClosed(#[from] AcquireError),
}

/// Tracing a block was aborted. No artifact is written after any of these.
#[derive(Debug, Error)]
pub enum BlockTraceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Malformed(#[from] MalformedProofError),

    #[error("{phase} {source}")]
    Proof {
        phase: Phase,
        #[source]
        source: ProofError,
    },

    #[error("block 0 has no parent state to trace against")]
    GenesisBlock,
}
