//! Typed accessors over the block-scoped trie.
//!
//! `State` never iterates the trie directly (its key space is pre-hashed and
//! unordered); every enumerable registry (tokens, validators, roles, ...)
//! keeps an explicit sorted index alongside its entries, per the
//! deterministic-iteration requirement.

use nhb_trie::{MemoryTrie, Trie, TrieDb};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::Result;

pub struct State<D: TrieDb + Clone> {
    pub(crate) trie: Trie<D>,
}

impl State<nhb_trie::MemoryTrieDb> {
    pub fn new() -> Self {
        Self {
            trie: MemoryTrie::new(),
        }
    }
}

impl Default for State<nhb_trie::MemoryTrieDb> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TrieDb + Clone> State<D> {
    pub fn with_trie(trie: Trie<D>) -> Self {
        Self { trie }
    }

    pub fn root_hash(&mut self) -> Result<shared_types::Hash> {
        Ok(self.trie.hash()?)
    }

    pub fn commit(&mut self, parent: shared_types::Hash, height: u64) -> Result<shared_types::Hash> {
        Ok(self.trie.commit(parent, height)?)
    }

    pub fn reset(&mut self, root: shared_types::Hash) -> Result<()> {
        Ok(self.trie.reset(root)?)
    }

    pub fn copy(&self) -> Self {
        Self {
            trie: self.trie.copy(),
        }
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, key: &[u8; 32]) -> Option<T> {
        self.trie
            .get(key)
            .and_then(|bytes| bincode::deserialize(&bytes).ok())
    }

    pub(crate) fn put<T: Serialize>(&mut self, key: [u8; 32], value: &T) {
        let bytes = bincode::serialize(value).expect("state values are always serializable");
        self.trie.update(&key, Some(bytes));
    }

    pub(crate) fn remove(&mut self, key: [u8; 32]) {
        self.trie.update(&key, None);
    }

    /// Append `id` to the sorted index stored under `index_key` if absent.
    pub(crate) fn index_insert(&mut self, index_key: [u8; 32], id: String) {
        let mut index: Vec<String> = self.get(&index_key).unwrap_or_default();
        if let Err(pos) = index.binary_search(&id) {
            index.insert(pos, id);
        }
        self.put(index_key, &index);
    }

    pub(crate) fn index_list(&self, index_key: [u8; 32]) -> Vec<String> {
        self.get(&index_key).unwrap_or_default()
    }
}
