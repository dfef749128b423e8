use std::sync::Arc;

use eth_trie::{EthTrie, MemoryDB, Trie};
use ethereum_types::{H160, H256, U256};
use keccak_hash::keccak;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use rlp::RlpStream;

use crate::{account::AccountRecord, node::TrieNode};

/// Values are at least this long so that no leaf of a random trie is small
/// enough to be embedded in its parent.
const MIN_RANDOM_VALUE_BYTES: usize = 32;

pub(crate) fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

/// A key of a reference trie together with its value (empty if absent) and
/// the reference implementation's proof for it.
#[derive(Clone, Debug)]
pub(crate) struct ReferenceEntry {
    pub(crate) key: H256,
    pub(crate) value: Vec<u8>,
    pub(crate) proof: Vec<Vec<u8>>,
}

pub(crate) struct SlotProof {
    pub(crate) slot: H256,
    pub(crate) value: U256,
    pub(crate) proof: Vec<Vec<u8>>,
}

pub(crate) struct StorageFixture {
    pub(crate) root: H256,
    pub(crate) proofs: Vec<SlotProof>,
}

pub(crate) struct AddressProof {
    #[allow(dead_code)]
    pub(crate) address: H160,
    pub(crate) proof: Vec<Vec<u8>>,
}

pub(crate) struct AccountFixture {
    pub(crate) root: H256,
    pub(crate) proofs: Vec<AddressProof>,
}

/// A hand built trie where the leaves are embedded in their branch:
///
/// `extension (62 nibbles) -> branch -> { 1: leaf(a), 2: leaf(b) }`
pub(crate) struct EmbeddedFixture {
    pub(crate) root: H256,
    pub(crate) key: H256,
    pub(crate) value: Vec<u8>,
    pub(crate) sibling_key: H256,
    pub(crate) sibling_value: Vec<u8>,
    /// `[extension, branch]`
    pub(crate) proof: Vec<Vec<u8>>,
    /// The raw leaf of `key`, as embedded in slot `1` of the branch.
    pub(crate) leaf: Vec<u8>,
}

pub(crate) fn create_truth_trie() -> EthTrie<MemoryDB> {
    let db = Arc::new(MemoryDB::new(true));
    EthTrie::new(db)
}

fn root_and_proofs<'a>(
    trie: &mut EthTrie<MemoryDB>,
    keys: impl Iterator<Item = &'a [u8]>,
) -> (H256, Vec<Vec<Vec<u8>>>) {
    // Proofs are only available after the trie has been committed.
    let root = H256(trie.root_hash().unwrap().0);
    let proofs = keys.map(|k| trie.get_proof(k).unwrap()).collect();

    (root, proofs)
}

/// Builds a trie of `n` random keys and values, and returns proofs for all of
/// them plus `n / 4` random absent keys.
pub(crate) fn reference_trie_with_proofs(n: usize, seed: u64) -> (H256, Vec<ReferenceEntry>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut trie = create_truth_trie();

    let mut entries = (0..n)
        .map(|_| {
            let key = H256(rng.gen());
            let mut value = vec![0; rng.gen_range(MIN_RANDOM_VALUE_BYTES..64)];
            rng.fill_bytes(&mut value);
            trie.insert(key.as_bytes(), &value).unwrap();

            (key, value)
        })
        .collect::<Vec<_>>();
    entries.extend((0..n / 4).map(|_| (H256(rng.gen()), Vec::new())));

    let (root, proofs) = root_and_proofs(&mut trie, entries.iter().map(|(k, _)| k.as_bytes()));
    let entries = entries
        .into_iter()
        .zip(proofs)
        .map(|((key, value), proof)| ReferenceEntry { key, value, proof })
        .collect();

    (root, entries)
}

/// Builds a storage trie from `slots` and returns proofs for them followed by
/// proofs for the `absent` slots.
pub(crate) fn reference_storage_trie(slots: &[(H256, U256)], absent: &[H256]) -> StorageFixture {
    let mut trie = create_truth_trie();
    for (slot, value) in slots.iter() {
        trie.insert(keccak(slot).as_bytes(), &rlp::encode(value))
            .unwrap();
    }

    let all = slots
        .iter()
        .copied()
        .chain(absent.iter().map(|slot| (*slot, U256::zero())))
        .collect::<Vec<_>>();
    let hashed = all.iter().map(|(slot, _)| keccak(slot)).collect::<Vec<_>>();

    let (root, proofs) = root_and_proofs(&mut trie, hashed.iter().map(|k| k.as_bytes()));
    let proofs = all
        .into_iter()
        .zip(proofs)
        .map(|((slot, value), proof)| SlotProof { slot, value, proof })
        .collect();

    StorageFixture { root, proofs }
}

/// Builds a state trie from `accounts` and returns proofs for them followed by
/// proofs for the `absent` addresses.
pub(crate) fn reference_account_trie(
    accounts: &[(H160, AccountRecord)],
    absent: &[H160],
) -> AccountFixture {
    let mut trie = create_truth_trie();
    for (address, account) in accounts.iter() {
        trie.insert(keccak(address).as_bytes(), &rlp::encode(account))
            .unwrap();
    }

    let all = accounts
        .iter()
        .map(|(address, _)| *address)
        .chain(absent.iter().copied())
        .collect::<Vec<_>>();
    let hashed = all.iter().map(keccak).collect::<Vec<_>>();

    let (root, proofs) = root_and_proofs(&mut trie, hashed.iter().map(|k| k.as_bytes()));
    let proofs = all
        .into_iter()
        .zip(proofs)
        .map(|(address, proof)| AddressProof { address, proof })
        .collect();

    AccountFixture { root, proofs }
}

pub(crate) fn embedded_leaf_trie() -> EmbeddedFixture {
    let mut key = [0x11; 32];
    key[31] = 0x1a;
    let mut sibling_key = [0x11; 32];
    sibling_key[31] = 0x2b;

    let value = vec![0xaa; 10];
    let sibling_value = vec![0xbb; 10];

    let leaf = short_node(&[0x3a], &value);
    let sibling_leaf = short_node(&[0x3b], &sibling_value);

    let mut branch = RlpStream::new_list(17);
    for slot in 0..16 {
        match slot {
            1 => branch.append_raw(&leaf, 1),
            2 => branch.append_raw(&sibling_leaf, 1),
            _ => branch.append_empty_data(),
        };
    }
    branch.append_empty_data();
    let branch = branch.out().to_vec();

    let mut path = vec![0x00];
    path.extend([0x11; 31]);
    let extension = short_node(&path, keccak(&branch).as_bytes());

    EmbeddedFixture {
        root: keccak(&extension),
        key: H256(key),
        value,
        sibling_key: H256(sibling_key),
        sibling_value,
        proof: vec![extension, branch],
        leaf,
    }
}

fn short_node(path: &[u8], second: &[u8]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(2);
    stream.append(&path.to_vec()).append(&second.to_vec());
    stream.out().to_vec()
}

pub(crate) fn decode_proof(raw: &[Vec<u8>]) -> Vec<TrieNode> {
    raw.iter().map(|n| TrieNode::decode(n).unwrap()).collect()
}
