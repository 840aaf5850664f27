//! Canonical transfer message construction and ECDSA signing.
//!
//! The node rebuilds `"{from}->{to}:{amount}"` from the request body and verifies the signature
//! against SHA-256 of that text, so the message and the wire amount must agree byte-for-byte.

use crate::{amount::canonical_amount, errors::VelwalletError, keys::WalletIdentity};
use k256::ecdsa::{
    signature::hazmat::{PrehashSigner as _, PrehashVerifier as _},
    Signature, VerifyingKey,
};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest as _, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

/// Body of `POST /transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransfer {
    pub from: String,
    pub to: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub signature: String,
    pub public_key: String,
}

pub fn build_message(from: &str, to: &str, amount: Decimal) -> String {
    format!("{from}->{to}:{}", canonical_amount(amount))
}

fn message_digest(message: &str) -> [u8; 32] {
    Sha256::digest(message.as_bytes()).into()
}

/// DER-encoded, hex ECDSA signature over `build_message(identity.address, to, amount)`.
pub fn sign(identity: &WalletIdentity, to: &str, amount: Decimal) -> Result<String, VelwalletError> {
    let sk = identity
        .signing_key()
        .map_err(|_err| VelwalletError::SigningError)?;
    let digest = message_digest(&build_message(&identity.address, to, amount));
    let sig: Signature = sk
        .sign_prehash(&digest)
        .map_err(|_err| VelwalletError::SigningError)?;
    Ok(hex::encode(sig.to_der().as_bytes()))
}

pub fn sign_transfer(
    identity: &WalletIdentity,
    intent: &TransferIntent,
) -> Result<SignedTransfer, VelwalletError> {
    let signature = sign(identity, &intent.to, intent.amount)?;
    Ok(SignedTransfer {
        from: intent.from.clone(),
        to: intent.to.clone(),
        amount: intent.amount.normalize(),
        signature,
        public_key: identity.public_key.clone(),
    })
}

/// Check a hex DER signature the way the node does. Malformed inputs verify as `false`.
pub fn verify(
    public_key_hex: &str,
    from: &str,
    to: &str,
    amount: Decimal,
    signature_hex: &str,
) -> bool {
    let Ok(pk_bytes) = hex::decode(public_key_hex.trim()) else {
        return false;
    };
    let Ok(vk) = VerifyingKey::from_sec1_bytes(&pk_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(&sig_bytes) else {
        return false;
    };
    // Accept high-S encodings produced by other secp256k1 libraries.
    let sig = sig.normalize_s().unwrap_or(sig);
    let digest = message_digest(&build_message(from, to, amount));
    vk.verify_prehash(&digest, &sig).is_ok()
}
