//! Pluggable node storage. A [`Trie`](crate::trie::Trie) never deletes a
//! node once written, so any root it has ever computed stays reachable for
//! [`Trie::reset`](crate::trie::Trie::reset).

use crate::node::TrieNode;
use shared_crypto::Hash;
use std::collections::HashMap;

pub trait TrieDb {
    fn get_node(&self, hash: &Hash) -> Option<TrieNode>;
    fn put_node(&mut self, hash: Hash, node: TrieNode);
}

/// In-memory node store. The node runtime's persistent store plugs in by
/// implementing [`TrieDb`] over its own backing file or database instead.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrieDb {
    nodes: HashMap<Hash, TrieNode>,
}

impl MemoryTrieDb {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }
}

impl TrieDb for MemoryTrieDb {
    fn get_node(&self, hash: &Hash) -> Option<TrieNode> {
        self.nodes.get(hash).cloned()
    }

    fn put_node(&mut self, hash: Hash, node: TrieNode) {
        self.nodes.insert(hash, node);
    }
}
