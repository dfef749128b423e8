//! Drives the fetch, verify and merge pipeline for one block.
//!
//! Fetches run concurrently (bounded by the configured request limit) but
//! their results are consumed in request order by a single writer, so the
//! resulting [`BlockProofSet`] only depends on the chain data, never on which
//! request finished first. The first failure drops the pipeline, which cancels
//! every request still in flight.

use std::pin::pin;

use ethereum_types::{H160, H256};
use futures::{stream, StreamExt, TryStreamExt};
use hashbrown::HashSet;
use mpt_proof::{
    proof::RawAccountProof,
    proof_set::{BlockProofSet, Phase},
};
use tracing::{debug, info};

use crate::config::TracerConfig;
use crate::error::{BlockTraceError, FetchError};
use crate::provider::StateProvider;
use crate::rpc::PrestateTrace;

/// One account whose proofs are needed, with the slots to prove.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProofRequest {
    pub address: H160,
    /// Ascending.
    pub slots: Vec<H256>,
}

/// Flattens the traces of a block's transactions into proof requests, in
/// transaction order and then address order. Requests identical to an earlier
/// one are dropped.
pub fn touched_accounts(traces: &[PrestateTrace]) -> Vec<ProofRequest> {
    let mut seen = HashSet::new();

    traces
        .iter()
        .flat_map(|trace| trace.iter())
        .map(|(address, account)| ProofRequest {
            address: *address,
            slots: account.slots(),
        })
        .filter(|request| seen.insert(request.clone()))
        .collect()
}

/// Fetches, verifies and consolidates the proofs of every account touched by
/// `config.block_number`, before and after the block.
///
/// Any fetch, decoding or verification failure aborts the whole block.
pub async fn trace_block<P: StateProvider>(
    provider: &P,
    config: &TracerConfig,
) -> Result<BlockProofSet, BlockTraceError> {
    let block_number = config.block_number;
    if block_number == 0 {
        return Err(BlockTraceError::GenesisBlock);
    }
    let limit = config.max_concurrent_requests.get();

    let (parent, block) = futures::try_join!(
        provider.block_summary(block_number - 1),
        provider.block_summary(block_number),
    )?;
    info!(
        "Block {} has {} transactions (pre-state root {:#x}, post-state root {:#x})",
        block_number,
        block.transactions.len(),
        parent.state_root,
        block.state_root
    );

    let traces = stream::iter(block.transactions.iter().copied())
        .map(|tx_hash| provider.prestate_trace(tx_hash))
        .buffered(limit)
        .try_collect::<Vec<_>>()
        .await?;

    let requests = touched_accounts(&traces);
    info!(
        "Fetching proofs for {} touched accounts in both phases",
        requests.len()
    );

    let mut proof_set = BlockProofSet::new(block_number, parent.state_root, block.state_root);

    let jobs = requests
        .iter()
        .flat_map(|request| Phase::ALL.map(|phase| (phase, request)));
    let mut proofs = pin!(stream::iter(jobs)
        .map(|(phase, request)| fetch_proof(provider, phase, request, block_number))
        .buffered(limit));

    while let Some((phase, request, raw)) = proofs.try_next().await? {
        let proof = raw.normalize()?;
        proof_set
            .absorb(phase, &proof)
            .map_err(|source| BlockTraceError::Proof { phase, source })?;

        debug!(
            "Verified {} proof of {:#x} ({} slots)",
            phase,
            request.address,
            request.slots.len()
        );
    }

    Ok(proof_set)
}

async fn fetch_proof<'a, P: StateProvider>(
    provider: &P,
    phase: Phase,
    request: &'a ProofRequest,
    block_number: u64,
) -> Result<(Phase, &'a ProofRequest, RawAccountProof), FetchError> {
    let raw = provider
        .account_proof(
            request.address,
            request.slots.clone(),
            phase.state_block(block_number),
        )
        .await?;

    Ok((phase, request, raw))
}
