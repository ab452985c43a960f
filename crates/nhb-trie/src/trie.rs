//! Block-scoped Modified Merkle Patricia Trie.
//!
//! The node runtime keeps exactly one writer per trie instance (the state
//! processor applying the block currently in flight); readers go through
//! snapshots taken with [`Trie::copy`]. A node, once written, is never
//! deleted, so [`Trie::reset`] can always rewind to any root this trie has
//! ever committed.

use crate::db::{MemoryTrieDb, TrieDb};
use crate::errors::TrieError;
use crate::nibbles::Nibbles;
use crate::node::{TrieNode, EMPTY_TRIE_ROOT};
use shared_crypto::Hash;
use std::collections::BTreeMap;

/// A trie backed by the default in-memory node store.
pub type MemoryTrie = Trie<MemoryTrieDb>;

pub struct Trie<D: TrieDb> {
    db: D,
    root: Hash,
    /// Live key/value working set mirroring `root`; rebuilt wholesale on
    /// every [`Trie::hash`] call after a dirty [`Trie::update`], and on
    /// every [`Trie::reset`] by walking the target root back out of `db`.
    items: BTreeMap<Vec<u8>, Vec<u8>>,
    dirty: bool,
    commits: BTreeMap<u64, Hash>,
}

impl Trie<MemoryTrieDb> {
    pub fn new() -> Self {
        Self::with_db(MemoryTrieDb::new())
    }
}

impl Default for Trie<MemoryTrieDb> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TrieDb + Clone> Trie<D> {
    pub fn with_db(db: D) -> Self {
        Self {
            db,
            root: EMPTY_TRIE_ROOT,
            items: BTreeMap::new(),
            dirty: false,
            commits: BTreeMap::new(),
        }
    }

    /// Current state root, rebuilding from pending updates first if dirty.
    pub fn hash(&mut self) -> Result<Hash, TrieError> {
        if self.dirty {
            self.rebuild()?;
            self.dirty = false;
        }
        Ok(self.root)
    }

    /// Look up a key by walking the trie from the current root. Correct
    /// regardless of whether pending updates have been rebuilt yet, since
    /// it always consults `items` for the value of keys still pending.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.items.get(key).cloned()
    }

    /// Stage an insert (`Some(value)`) or delete (`None`) for `key`. Takes
    /// effect the next time [`Trie::hash`] rebuilds the trie.
    pub fn update(&mut self, key: &[u8], value: Option<Vec<u8>>) {
        match value {
            Some(v) => {
                self.items.insert(key.to_vec(), v);
            }
            None => {
                self.items.remove(key);
            }
        }
        self.dirty = true;
    }

    /// Finalize the current root as the state after block `height` whose
    /// parent state root is `parent`. Returns the committed root.
    pub fn commit(&mut self, parent: Hash, height: u64) -> Result<Hash, TrieError> {
        let _ = parent;
        let root = self.hash()?;
        if let Some(existing) = self.commits.get(&height) {
            if *existing != root {
                return Err(TrieError::HeightConflict { height });
            }
        }
        self.commits.insert(height, root);
        Ok(root)
    }

    /// Rewind the live view to a previously computed root. The root must
    /// still be reachable in the backing store (true for any root this
    /// trie has ever hashed, since nodes are never deleted).
    pub fn reset(&mut self, root: Hash) -> Result<(), TrieError> {
        if root == EMPTY_TRIE_ROOT {
            self.items.clear();
            self.root = EMPTY_TRIE_ROOT;
            self.dirty = false;
            return Ok(());
        }
        let mut out = Vec::new();
        self.walk(root, Nibbles::default(), &mut out)?;
        self.items = out.into_iter().collect();
        self.root = root;
        self.dirty = false;
        Ok(())
    }

    /// Independent snapshot sharing the same node history, for a reader
    /// that must not observe further writes to `self`.
    pub fn copy(&self) -> Self {
        Self {
            db: self.db.clone(),
            root: self.root,
            items: self.items.clone(),
            dirty: self.dirty,
            commits: self.commits.clone(),
        }
    }

    fn walk(
        &self,
        hash: Hash,
        prefix: Nibbles,
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), TrieError> {
        if hash == EMPTY_TRIE_ROOT {
            return Ok(());
        }
        let node = self
            .db
            .get_node(&hash)
            .ok_or(TrieError::MissingNode(hash))?;
        match node {
            TrieNode::Empty => {}
            TrieNode::Leaf { path, value } => {
                let mut full = prefix;
                full.0.extend(path.0.iter());
                out.push((nibbles_to_bytes(&full), value));
            }
            TrieNode::Extension { path, child } => {
                let mut full = prefix;
                full.0.extend(path.0.iter());
                self.walk(child, full, out)?;
            }
            TrieNode::Branch { children, value } => {
                if let Some(v) = value {
                    out.push((nibbles_to_bytes(&prefix), v));
                }
                for (i, child) in children.iter().enumerate() {
                    if let Some(child_hash) = child {
                        let mut full = prefix.clone();
                        full.0.push(i as u8);
                        self.walk(*child_hash, full, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn rebuild(&mut self) -> Result<(), TrieError> {
        if self.items.is_empty() {
            self.root = EMPTY_TRIE_ROOT;
            return Ok(());
        }
        let entries: Vec<(Nibbles, Vec<u8>)> = self
            .items
            .iter()
            .map(|(k, v)| (Nibbles::from_bytes(k), v.clone()))
            .collect();
        self.root = self.build_node(&entries, 0);
        Ok(())
    }

    fn build_node(&mut self, items: &[(Nibbles, Vec<u8>)], depth: usize) -> Hash {
        if items.is_empty() {
            return EMPTY_TRIE_ROOT;
        }

        if items.len() == 1 {
            let (key, value) = &items[0];
            let node = TrieNode::Leaf {
                path: key.slice(depth),
                value: value.clone(),
            };
            let hash = node.hash();
            self.db.put_node(hash, node);
            return hash;
        }

        let first_key = &items[0].0;
        let common_len = items
            .iter()
            .skip(1)
            .map(|(k, _)| k.slice(depth).common_prefix_len(&first_key.slice(depth)))
            .min()
            .unwrap_or(0);

        if common_len > 0 {
            let prefix = first_key.slice_range(depth, depth + common_len);
            let child = self.build_node(items, depth + common_len);
            let node = TrieNode::Extension {
                path: prefix,
                child,
            };
            let hash = node.hash();
            self.db.put_node(hash, node);
            return hash;
        }

        let mut children: [Option<Hash>; 16] = [None; 16];
        let mut branch_value = None;

        for nibble in 0..16u8 {
            let group: Vec<_> = items
                .iter()
                .filter(|(k, _)| k.len() > depth && k.at(depth) == nibble)
                .cloned()
                .collect();
            if !group.is_empty() {
                children[nibble as usize] = Some(self.build_node(&group, depth + 1));
            }
        }

        for (key, value) in items {
            if key.len() == depth {
                branch_value = Some(value.clone());
                break;
            }
        }

        let node = TrieNode::Branch {
            children: Box::new(children),
            value: branch_value,
        };
        let hash = node.hash();
        self.db.put_node(hash, node);
        hash
    }
}

fn nibbles_to_bytes(nibbles: &Nibbles) -> Vec<u8> {
    nibbles
        .0
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}
