//! Trie node shapes: the Modified Merkle Patricia Trie has four of them.

use crate::nibbles::Nibbles;
use crate::rlp::{rlp_encode_bytes, rlp_encode_list_items, rlp_encode_two_items};
use shared_crypto::{keccak256, Hash};

pub const EMPTY_TRIE_ROOT: Hash = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieNode {
    Empty,
    Leaf { path: Nibbles, value: Vec<u8> },
    Extension { path: Nibbles, child: Hash },
    Branch {
        children: Box<[Option<Hash>; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl TrieNode {
    pub fn rlp_encode(&self) -> Vec<u8> {
        match self {
            TrieNode::Empty => rlp_encode_bytes(&[]),
            TrieNode::Leaf { path, value } => {
                rlp_encode_two_items(&path.hex_prefix_encode(true), value)
            }
            TrieNode::Extension { path, child } => {
                rlp_encode_two_items(&path.hex_prefix_encode(false), child)
            }
            TrieNode::Branch { children, value } => {
                let mut items: Vec<Vec<u8>> = children
                    .iter()
                    .map(|c| match c {
                        Some(hash) => rlp_encode_bytes(hash),
                        None => rlp_encode_bytes(&[]),
                    })
                    .collect();
                items.push(match value {
                    Some(v) => rlp_encode_bytes(v),
                    None => rlp_encode_bytes(&[]),
                });
                rlp_encode_list_items(&items)
            }
        }
    }

    pub fn hash(&self) -> Hash {
        if matches!(self, TrieNode::Empty) {
            return EMPTY_TRIE_ROOT;
        }
        keccak256(&self.rlp_encode())
    }
}
