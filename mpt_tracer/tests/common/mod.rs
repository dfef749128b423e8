//! An in-memory chain serving proofs built with a reference trie
//! implementation.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use eth_trie::{EthTrie, MemoryDB, Trie};
use ethereum_types::{H160, H256, U256, U64};
use keccak_hash::keccak;
use mpt_proof::{
    account::AccountRecord,
    proof::{RawAccountProof, RawNode, RawStorageProof},
    utils::EMPTY_CODE_HASH,
};
use mpt_tracer::{
    config::TracerConfig,
    error::FetchError,
    provider::StateProvider,
    rpc::{BlockSummary, PrestateAccount, PrestateTrace},
};

/// The traced block of every scenario.
pub const BLOCK: u64 = 10;

pub fn init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn config(block_number: u64, output_dir: &Path, max_concurrent_requests: usize) -> TracerConfig {
    TracerConfig {
        rpc_url: "http://localhost:8545".parse().unwrap(),
        block_number,
        output_dir: output_dir.to_path_buf(),
        max_concurrent_requests: NonZeroUsize::new(max_concurrent_requests).unwrap(),
    }
}

/// One account of a [`World`].
#[derive(Clone, Debug, Default)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub code: Vec<u8>,
    pub storage: BTreeMap<H256, U256>,
}

impl AccountState {
    pub fn eoa(nonce: u64, balance: u64) -> Self {
        Self {
            nonce,
            balance: balance.into(),
            ..Default::default()
        }
    }

    pub fn contract(nonce: u64, code: &[u8], storage: &[(u64, u64)]) -> Self {
        Self {
            nonce,
            balance: U256::zero(),
            code: code.to_vec(),
            storage: storage
                .iter()
                .map(|(slot, value)| (H256::from_low_u64_be(*slot), U256::from(*value)))
                .collect(),
        }
    }

    fn code_hash(&self) -> H256 {
        match self.code.is_empty() {
            true => EMPTY_CODE_HASH,
            false => keccak(&self.code),
        }
    }

    fn storage_trie(&self) -> EthTrie<MemoryDB> {
        let mut trie = new_trie();
        for (slot, value) in self.storage.iter().filter(|(_, v)| !v.is_zero()) {
            trie.insert(keccak(slot).as_bytes(), &rlp::encode(value))
                .unwrap();
        }

        trie
    }

    fn record(&self, storage_root: H256) -> AccountRecord {
        AccountRecord {
            nonce: self.nonce.into(),
            balance: self.balance,
            storage_root,
            code_hash: self.code_hash(),
        }
    }

    /// What a prestate tracer reports for this account when a transaction
    /// touches `slots`.
    pub fn prestate(&self, slots: &[u64]) -> PrestateAccount {
        let code = (!self.code.is_empty()).then(|| {
            let digits = self
                .code
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<String>();
            format!("0x{digits}")
        });
        let storage = (!slots.is_empty()).then(|| {
            slots
                .iter()
                .map(|slot| {
                    let slot = H256::from_low_u64_be(*slot);
                    let mut word = [0; 32];
                    self.storage
                        .get(&slot)
                        .copied()
                        .unwrap_or_default()
                        .to_big_endian(&mut word);
                    (slot, H256(word))
                })
                .collect()
        });

        PrestateAccount {
            balance: self.balance,
            nonce: Some(self.nonce),
            code,
            storage,
        }
    }
}

/// The state after one block.
pub type World = BTreeMap<H160, AccountState>;

/// How a served account proof is damaged.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Corruption {
    /// Flip a bit of the last node, keeping it well formed.
    FlipLastByte,
    /// Replace the last node with an RLP byte string.
    NotAList,
}

/// A chain whose blocks only consist of a state and some traced
/// transactions.
#[derive(Debug, Default)]
pub struct FixtureChain {
    states: BTreeMap<u64, World>,
    transactions: BTreeMap<u64, Vec<H256>>,
    traces: BTreeMap<H256, PrestateTrace>,
    corrupted: Option<(u64, H160, Corruption)>,
}

impl FixtureChain {
    pub fn with_state(mut self, block_number: u64, world: World) -> Self {
        self.states.insert(block_number, world);
        self
    }

    pub fn with_transaction(mut self, block_number: u64, tx_hash: H256, trace: PrestateTrace) -> Self {
        self.transactions
            .entry(block_number)
            .or_default()
            .push(tx_hash);
        self.traces.insert(tx_hash, trace);
        self
    }

    /// Corrupts the last account proof node served for `address` at
    /// `block_number`.
    pub fn tamper(mut self, block_number: u64, address: H160) -> Self {
        self.corrupted = Some((block_number, address, Corruption::FlipLastByte));
        self
    }

    /// Replaces the last account proof node served for `address` at
    /// `block_number` with something that is not a trie node.
    pub fn malform(mut self, block_number: u64, address: H160) -> Self {
        self.corrupted = Some((block_number, address, Corruption::NotAList));
        self
    }

    pub fn state_root(&self, block_number: u64) -> H256 {
        root(&mut state_trie(&self.states[&block_number]))
    }

    pub fn storage_root(&self, block_number: u64, address: H160) -> H256 {
        root(&mut self.states[&block_number][&address].storage_trie())
    }

    fn world(&self, block_number: u64) -> Result<&World, FetchError> {
        self.states
            .get(&block_number)
            .ok_or(FetchError::BlockNotFound(block_number))
    }
}

fn new_trie() -> EthTrie<MemoryDB> {
    EthTrie::new(Arc::new(MemoryDB::new(true)))
}

fn root(trie: &mut EthTrie<MemoryDB>) -> H256 {
    H256(trie.root_hash().unwrap().0)
}

fn state_trie(world: &World) -> EthTrie<MemoryDB> {
    let mut trie = new_trie();
    for (address, account) in world.iter() {
        let record = account.record(root(&mut account.storage_trie()));
        if !record.is_blank() {
            trie.insert(keccak(address).as_bytes(), &rlp::encode(&record))
                .unwrap();
        }
    }

    trie
}

fn raw_nodes(proof: Vec<Vec<u8>>) -> Vec<RawNode> {
    proof.into_iter().map(RawNode).collect()
}

impl StateProvider for FixtureChain {
    async fn block_summary(&self, block_number: u64) -> Result<BlockSummary, FetchError> {
        let world = self.world(block_number)?;

        Ok(BlockSummary {
            number: U64::from(block_number),
            state_root: root(&mut state_trie(world)),
            transactions: self
                .transactions
                .get(&block_number)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn prestate_trace(&self, tx_hash: H256) -> Result<PrestateTrace, FetchError> {
        Ok(self
            .traces
            .get(&tx_hash)
            .cloned()
            .unwrap_or_else(|| panic!("unknown transaction {tx_hash:#x}")))
    }

    async fn account_proof(
        &self,
        address: H160,
        slots: Vec<H256>,
        block_number: u64,
    ) -> Result<RawAccountProof, FetchError> {
        let world = self.world(block_number)?;
        let account = world.get(&address).cloned().unwrap_or_default();

        let mut storage = account.storage_trie();
        let storage_hash = root(&mut storage);
        let record = account.record(storage_hash);

        let mut state = state_trie(world);
        root(&mut state);
        let mut account_proof = state.get_proof(keccak(address).as_bytes()).unwrap();
        match self.corrupted {
            Some((block, target, corruption)) if block == block_number && target == address => {
                let node = account_proof.last_mut().unwrap();
                match corruption {
                    Corruption::FlipLastByte => *node.last_mut().unwrap() ^= 0x01,
                    Corruption::NotAList => *node = vec![0x05],
                }
            }
            _ => (),
        }

        let storage_proof = slots
            .into_iter()
            .map(|slot| RawStorageProof {
                key: slot,
                value: account.storage.get(&slot).copied().unwrap_or_default(),
                proof: raw_nodes(storage.get_proof(keccak(slot).as_bytes()).unwrap()),
            })
            .collect();

        Ok(RawAccountProof {
            address,
            nonce: record.nonce,
            balance: record.balance,
            storage_hash,
            code_hash: record.code_hash,
            account_proof: raw_nodes(account_proof),
            storage_proof,
        })
    }
}

pub fn alice() -> H160 {
    H160::from_low_u64_be(0xa11ce)
}

pub fn bob() -> H160 {
    H160::from_low_u64_be(0xb0b)
}

pub fn carol() -> H160 {
    H160::from_low_u64_be(0xca401)
}

/// A contract with storage written by the traced block.
pub fn counter() -> H160 {
    H160::from_low_u64_be(0xc0)
}

/// A contract with storage only read by the traced block.
pub fn registry() -> H160 {
    H160::from_low_u64_be(0xb0)
}

/// Alice sends `10` wei to Bob. Carol exists but is not touched.
pub fn transfer_chain() -> FixtureChain {
    let pre = World::from([
        (alice(), AccountState::eoa(1, 100)),
        (bob(), AccountState::eoa(0, 5)),
        (carol(), AccountState::eoa(3, 1000)),
    ]);
    let post = World::from([
        (alice(), AccountState::eoa(2, 90)),
        (bob(), AccountState::eoa(0, 15)),
        (carol(), AccountState::eoa(3, 1000)),
    ]);
    let trace = PrestateTrace::from([
        (alice(), pre[&alice()].prestate(&[])),
        (bob(), pre[&bob()].prestate(&[])),
    ]);

    FixtureChain::default()
        .with_state(BLOCK - 1, pre)
        .with_state(BLOCK, post)
        .with_transaction(BLOCK, H256::repeat_byte(0x01), trace)
}

/// A contract deployed by Alice.
pub fn created() -> H160 {
    H160::from_low_u64_be(0xdead)
}

/// Alice deploys a contract. The tracer sees the new address before the
/// deployment, i.e. without code.
pub fn creation_chain() -> FixtureChain {
    let pre = World::from([(alice(), AccountState::eoa(1, 100))]);
    let post = World::from([
        (alice(), AccountState::eoa(2, 100)),
        (created(), AccountState::contract(1, &[0x60, 0x00], &[])),
    ]);
    let trace = PrestateTrace::from([
        (alice(), pre[&alice()].prestate(&[])),
        (created(), AccountState::default().prestate(&[])),
    ]);

    FixtureChain::default()
        .with_state(BLOCK - 1, pre)
        .with_state(BLOCK, post)
        .with_transaction(BLOCK, H256::repeat_byte(0x03), trace)
}

/// Alice sets slot `0` of the counter from `0` to `5`, reading slot `3` of
/// the registry on the way.
pub fn storage_chain() -> FixtureChain {
    const COUNTER_CODE: &[u8] = &[0x60, 0x00];
    const REGISTRY_CODE: &[u8] = &[0x60, 0x01];

    let pre = World::from([
        (alice(), AccountState::eoa(1, 100)),
        (counter(), AccountState::contract(1, COUNTER_CODE, &[(1, 7)])),
        (registry(), AccountState::contract(1, REGISTRY_CODE, &[(3, 9)])),
    ]);
    let post = World::from([
        (alice(), AccountState::eoa(2, 99)),
        (
            counter(),
            AccountState::contract(1, COUNTER_CODE, &[(0, 5), (1, 7)]),
        ),
        (registry(), AccountState::contract(1, REGISTRY_CODE, &[(3, 9)])),
    ]);
    let trace = PrestateTrace::from([
        (alice(), pre[&alice()].prestate(&[])),
        (counter(), pre[&counter()].prestate(&[0])),
        (registry(), pre[&registry()].prestate(&[3])),
    ]);

    FixtureChain::default()
        .with_state(BLOCK - 1, pre)
        .with_state(BLOCK, post)
        .with_transaction(BLOCK, H256::repeat_byte(0x02), trace)
}
