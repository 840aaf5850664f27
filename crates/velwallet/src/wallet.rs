use crate::{
    address::CURRENT_ADDRESS_SCHEME,
    errors::VelwalletError,
    keys::{self, WalletIdentity},
    kv::KvStore,
};
use eyre::Context as _;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const WALLET_KEY: &str = "velcoin_wallet";
pub const HISTORY_KEY: &str = "velcoin_history";

/// One acknowledged outgoing transfer. `tx_hash` comes from the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    /// Seconds since the Unix epoch (fractional).
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

/// How a supplied import address relates to the key it came with. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportedAddress {
    Derived,
    Mismatch,
    Malformed,
}

fn check_imported_address(identity: &WalletIdentity) -> ImportedAddress {
    if CURRENT_ADDRESS_SCHEME.derive(&identity.public_key) == identity.address {
        ImportedAddress::Derived
    } else if CURRENT_ADDRESS_SCHEME.is_well_formed(&identity.address) {
        ImportedAddress::Mismatch
    } else {
        ImportedAddress::Malformed
    }
}

/// Sole owner of the persisted wallet identity and its transaction history.
///
/// Every mutation is written through to `kv` before the in-memory copy changes, so a failed
/// write leaves both views as they were.
#[derive(Debug)]
pub struct WalletStore<K: KvStore> {
    kv: K,
    identity: Option<WalletIdentity>,
    history: Vec<HistoryEntry>,
}

fn load_or_absent<T: DeserializeOwned>(kv: &impl KvStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "unreadable persisted state; treating as absent");
            return None;
        }
    };
    match serde_json::from_str::<T>(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "malformed persisted state; treating as absent");
            None
        }
    }
}

impl<K: KvStore> WalletStore<K> {
    /// Load persisted state. Malformed data degrades to LoggedOut / empty history.
    pub fn open(kv: K) -> Self {
        let identity: Option<WalletIdentity> = load_or_absent(&kv, WALLET_KEY);
        let history: Vec<HistoryEntry> = load_or_absent(&kv, HISTORY_KEY).unwrap_or_default();
        Self {
            kv,
            identity,
            history,
        }
    }

    pub const fn state(&self) -> SessionState {
        if self.identity.is_some() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        }
    }

    pub const fn identity(&self) -> Option<&WalletIdentity> {
        self.identity.as_ref()
    }

    pub fn require_identity(&self) -> Result<&WalletIdentity, VelwalletError> {
        self.identity().ok_or(VelwalletError::NoWallet)
    }

    /// Newest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn save_identity(&mut self, identity: WalletIdentity) -> eyre::Result<&WalletIdentity> {
        let s = serde_json::to_string(&identity).context("serialize wallet")?;
        self.kv.set(WALLET_KEY, &s).context("persist wallet")?;
        let stored: &WalletIdentity = self.identity.insert(identity);
        Ok(stored)
    }

    /// Replace any current identity with a freshly generated one. History is kept.
    pub fn create(&mut self) -> eyre::Result<&WalletIdentity> {
        let identity = keys::generate();
        tracing::info!(address = %identity.address, "wallet created");
        self.save_identity(identity)
    }

    /// Replace any current identity with an imported one. The supplied address is trusted as-is.
    pub fn import(
        &mut self,
        private_key_hex: &str,
        address: &str,
    ) -> eyre::Result<&WalletIdentity> {
        let address = address.trim();
        if address.is_empty() {
            eyre::bail!("import address must not be empty");
        }
        let identity = keys::import_from_private_key(private_key_hex, address)?;
        match check_imported_address(&identity) {
            ImportedAddress::Derived => {}
            ImportedAddress::Mismatch => tracing::warn!(
                address = %identity.address,
                "imported address does not match the derived address; keeping supplied address"
            ),
            ImportedAddress::Malformed => tracing::warn!(
                address = %identity.address,
                "imported address is not in the current address format; keeping supplied address"
            ),
        }
        tracing::info!(address = %identity.address, "wallet imported");
        self.save_identity(identity)
    }

    /// Forget the identity. Persisted history is left in place.
    pub fn logout(&mut self) -> eyre::Result<()> {
        self.kv.remove(WALLET_KEY).context("remove wallet")?;
        if let Some(old) = self.identity.take() {
            tracing::info!(address = %old.address, "wallet logged out");
        }
        Ok(())
    }

    pub fn append_history(&mut self, entry: HistoryEntry) -> eyre::Result<()> {
        if self.identity.is_none() {
            return Err(VelwalletError::NoWallet.into());
        }
        let mut next = Vec::with_capacity(self.history.len().saturating_add(1));
        next.push(entry);
        next.extend(self.history.iter().cloned());
        let s = serde_json::to_string(&next).context("serialize history")?;
        self.kv.set(HISTORY_KEY, &s).context("persist history")?;
        self.history = next;
        Ok(())
    }

    pub fn clear_history(&mut self) -> eyre::Result<()> {
        self.kv.remove(HISTORY_KEY).context("remove history")?;
        self.history.clear();
        Ok(())
    }

    #[cfg(test)]
    pub fn into_kv(self) -> K {
        self.kv
    }
}
