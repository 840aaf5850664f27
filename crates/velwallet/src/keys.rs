use crate::errors::VelwalletError;
use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::rand_core::OsRng,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A secp256k1 key pair plus the address it is known by.
///
/// For generated wallets `address == address::derive(public_key)`. Imported wallets keep the
/// address the operator supplied, even when it does not match.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct WalletIdentity {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

impl std::fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish()
    }
}

impl WalletIdentity {
    pub fn signing_key(&self) -> Result<SigningKey, VelwalletError> {
        parse_private_key(&self.private_key)
    }
}

/// Uncompressed SEC1 encoding (`04 || X || Y`), lowercase hex.
pub fn public_key_hex(vk: &VerifyingKey) -> String {
    hex::encode(vk.to_encoded_point(false).as_bytes())
}

pub fn generate() -> WalletIdentity {
    let sk = SigningKey::random(&mut OsRng);
    let private_key = hex::encode(sk.to_bytes());
    let public_key = public_key_hex(sk.verifying_key());
    let address = crate::address::derive(&public_key);
    WalletIdentity {
        private_key,
        public_key,
        address,
    }
}

/// Rebuild an identity from a hex private key, keeping `supplied_address` verbatim.
pub fn import_from_private_key(
    private_key_hex: &str,
    supplied_address: &str,
) -> Result<WalletIdentity, VelwalletError> {
    let sk = parse_private_key(private_key_hex)?;
    Ok(WalletIdentity {
        private_key: hex::encode(sk.to_bytes()),
        public_key: public_key_hex(sk.verifying_key()),
        address: supplied_address.to_owned(),
    })
}

/// Accepts an optional `0x` prefix and short (or odd-length) hex, which is left-padded to 32
/// bytes. Zero and values at or above the curve order are rejected.
pub fn parse_private_key(s: &str) -> Result<SigningKey, VelwalletError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.is_empty() || s.len() > 64 {
        return Err(VelwalletError::InvalidKey);
    }

    let mut padded = Zeroizing::new(String::with_capacity(64));
    for _ in s.len()..64 {
        padded.push('0');
    }
    padded.push_str(s);

    let mut bytes = Zeroizing::new([0_u8; 32]);
    hex::decode_to_slice(padded.as_str(), bytes.as_mut_slice())
        .map_err(|_err| VelwalletError::InvalidKey)?;
    SigningKey::from_slice(bytes.as_slice()).map_err(|_err| VelwalletError::InvalidKey)
}
