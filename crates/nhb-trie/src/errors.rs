use shared_crypto::Hash;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("trie node {0:?} missing from backing store")]
    MissingNode(Hash),
    #[error("commit root {0:?} is not known to this trie")]
    UnknownRoot(Hash),
    #[error("height {height} already committed with a different root")]
    HeightConflict { height: u64 },
}
