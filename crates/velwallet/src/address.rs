//! Deterministic public key -> address mapping.
//!
//! The address is part of the wire contract with the ledger node, so the scheme is pinned as a
//! versioned constant instead of being inlined at call sites.

use sha2::{Digest as _, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressHash {
    Sha256,
}

/// Hash algorithm and truncation length that together define an address format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressScheme {
    pub version: u8,
    pub hash: AddressHash,
    /// Number of lowercase hex characters kept from the digest.
    pub hex_len: usize,
}

/// SHA-256 over the public key's hex text, truncated to 40 hex characters.
pub const ADDRESS_SCHEME_V1: AddressScheme = AddressScheme {
    version: 1,
    hash: AddressHash::Sha256,
    hex_len: 40,
};

pub const CURRENT_ADDRESS_SCHEME: AddressScheme = ADDRESS_SCHEME_V1;

impl AddressScheme {
    pub fn derive(&self, public_key_hex: &str) -> String {
        let digest = match self.hash {
            AddressHash::Sha256 => Sha256::digest(public_key_hex.as_bytes()),
        };
        let mut out = hex::encode(digest);
        out.truncate(self.hex_len);
        out
    }

    /// Shape check only; says nothing about which public key produced the address.
    pub fn is_well_formed(&self, address: &str) -> bool {
        address.len() == self.hex_len
            && address
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

pub fn derive(public_key_hex: &str) -> String {
    CURRENT_ADDRESS_SCHEME.derive(public_key_hex)
}
