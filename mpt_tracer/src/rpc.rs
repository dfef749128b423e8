//! Wire types of the JSON-RPC methods the tracer depends on.

use std::collections::BTreeMap;

use ethereum_types::{H160, H256, U256, U64};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::FetchError;

/// The parts of `eth_getBlockByNumber(number, false)` the tracer uses.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: U64,
    pub state_root: H256,
    /// Transaction hashes in inclusion order.
    pub transactions: Vec<H256>,
}

/// One account of a `prestateTracer` result: the state the transaction found
/// before it ran.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrestateAccount {
    pub balance: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// `0x` prefixed bytecode, omitted for accounts without code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Storage slots read or written by the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<H256, H256>>,
}

impl PrestateAccount {
    /// The touched storage slots, in ascending order.
    pub fn slots(&self) -> Vec<H256> {
        self.storage
            .as_ref()
            .map(|storage| storage.keys().copied().collect())
            .unwrap_or_default()
    }
}

/// The result of `debug_traceTransaction` with the `prestateTracer`, ordered
/// by address.
pub type PrestateTrace = BTreeMap<H160, PrestateAccount>;

/// Deserializes an RPC result, reporting the path of the first field that is
/// missing or invalid.
pub(crate) fn decode<T: DeserializeOwned>(
    method: &'static str,
    value: serde_json::Value,
) -> Result<T, FetchError> {
    serde_path_to_error::deserialize(value).map_err(|err| FetchError::MissingField {
        method,
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}
