use std::future::Future;
use std::num::NonZeroUsize;
use std::ops::Deref;
use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::{http::ReqwestTransport, http::reqwest::Url, Transport};
use ethereum_types::{H160, H256};
use mpt_proof::proof::RawAccountProof;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::trace;

use crate::error::FetchError;
use crate::rpc::{decode, BlockSummary, PrestateTrace};

/// The chain data the tracer needs. Implementations only report final
/// outcomes; retrying is up to them.
pub trait StateProvider {
    /// The state root and transactions of a block.
    fn block_summary(
        &self,
        block_number: u64,
    ) -> impl Future<Output = Result<BlockSummary, FetchError>> + Send;

    /// The accounts (and their slots) a transaction touched.
    fn prestate_trace(
        &self,
        tx_hash: H256,
    ) -> impl Future<Output = Result<PrestateTrace, FetchError>> + Send;

    /// Account and storage proofs of `address` in the state after
    /// `block_number`.
    fn account_proof(
        &self,
        address: H160,
        slots: Vec<H256>,
        block_number: u64,
    ) -> impl Future<Output = Result<RawAccountProof, FetchError>> + Send;
}

/// [`StateProvider`] backed by a JSON-RPC endpoint.
pub struct RpcStateProvider<ProviderT, TransportT> {
    provider: Arc<ProviderT>,
    // `Alloy` provider is using `Reqwest` http client under the hood. It has an unbounded
    // connection pool. We need to limit the number of parallel connections by ourselves, so we
    // use semaphore to count the number of parallel RPC requests happening at any moment.
    semaphore: Arc<Semaphore>,
    _phantom: std::marker::PhantomData<TransportT>,
}

pub struct ProviderGuard<'a, ProviderT> {
    provider: Arc<ProviderT>,
    _permit: SemaphorePermit<'a>,
}

impl<'a, ProviderT> Deref for ProviderGuard<'a, ProviderT> {
    type Target = Arc<ProviderT>;

    fn deref(&self) -> &Self::Target {
        &self.provider
    }
}

impl RpcStateProvider<RootProvider<ReqwestTransport>, ReqwestTransport> {
    /// Connects to an HTTP endpoint.
    pub fn connect(rpc_url: Url, max_concurrent_requests: NonZeroUsize) -> Self {
        Self::new(
            ProviderBuilder::new().on_http(rpc_url),
            max_concurrent_requests,
        )
    }
}

impl<ProviderT, TransportT> RpcStateProvider<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    pub fn new(provider: ProviderT, max_concurrent_requests: NonZeroUsize) -> Self {
        Self {
            provider: provider.into(),
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.get())),
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn get_provider(&self) -> Result<ProviderGuard<ProviderT>, FetchError> {
        Ok(ProviderGuard {
            provider: self.provider.clone(),
            _permit: self.semaphore.acquire().await?,
        })
    }

    /// Issues one request. A `null` result is returned as is.
    async fn request(&self, method: &'static str, params: Value) -> Result<Value, FetchError> {
        trace!("{method} {params}");

        self.get_provider()
            .await?
            .raw_request::<_, Value>(method.into(), params)
            .await
            .map_err(|source| FetchError::Transport { method, source })
    }

    async fn request_decoded<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, FetchError> {
        let value = self.request(method, params).await?;
        decode(method, value)
    }
}

impl<ProviderT, TransportT> StateProvider for RpcStateProvider<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    async fn block_summary(&self, block_number: u64) -> Result<BlockSummary, FetchError> {
        const METHOD: &str = "eth_getBlockByNumber";

        let value = self
            .request(METHOD, json!([format!("{block_number:#x}"), false]))
            .await?;
        if value.is_null() {
            return Err(FetchError::BlockNotFound(block_number));
        }

        decode(METHOD, value)
    }

    async fn prestate_trace(&self, tx_hash: H256) -> Result<PrestateTrace, FetchError> {
        self.request_decoded(
            "debug_traceTransaction",
            json!([tx_hash, { "tracer": "prestateTracer" }]),
        )
        .await
    }

    async fn account_proof(
        &self,
        address: H160,
        slots: Vec<H256>,
        block_number: u64,
    ) -> Result<RawAccountProof, FetchError> {
        self.request_decoded(
            "eth_getProof",
            json!([address, slots, format!("{block_number:#x}")]),
        )
        .await
    }
}
