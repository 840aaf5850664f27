use crate::{
    amount::parse_transfer_amount,
    errors::VelwalletError,
    keys::WalletIdentity,
    node::LedgerNode,
    signer::{self, TransferIntent},
    wallet::HistoryEntry,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Validate -> sign -> submit. Persisting the returned entry is the caller's job, through the
/// wallet store.
///
/// Nothing here retries: resubmitting a signed transfer is a decision for the user, and
/// duplicate rejection belongs to the node. At most one `send` per identity may be in flight;
/// callers gate that (see `fsutil::try_lock_exclusive`).
#[derive(Debug, Clone)]
pub struct TransferCoordinator<N: LedgerNode> {
    node: N,
}

/// Checks run in order; the first failure wins. No network access.
pub fn validate(
    identity: &WalletIdentity,
    to: &str,
    amount: &str,
    current_balance: Decimal,
) -> Result<TransferIntent, VelwalletError> {
    let to = to.trim();
    if to.is_empty() {
        return Err(VelwalletError::InvalidRecipient);
    }
    let amount = parse_transfer_amount(amount)?;
    if amount > current_balance {
        return Err(VelwalletError::InsufficientFunds {
            amount,
            balance: current_balance,
        });
    }
    Ok(TransferIntent {
        from: identity.address.clone(),
        to: to.to_owned(),
        amount,
    })
}

fn now_epoch_seconds() -> f64 {
    Utc::now()
        .signed_duration_since(DateTime::<Utc>::UNIX_EPOCH)
        .to_std()
        .map_or(0.0, |d| d.as_secs_f64())
}

impl<N: LedgerNode> TransferCoordinator<N> {
    pub const fn new(node: N) -> Self {
        Self { node }
    }

    pub const fn node(&self) -> &N {
        &self.node
    }

    pub async fn send(
        &self,
        identity: &WalletIdentity,
        to: &str,
        amount: &str,
        current_balance: Decimal,
    ) -> Result<HistoryEntry, VelwalletError> {
        let intent = validate(identity, to, amount, current_balance)?;
        let signed = signer::sign_transfer(identity, &intent)?;

        tracing::info!(from = %intent.from, to = %intent.to, amount = %signed.amount, "submitting transfer");
        let receipt = match self.node.submit(&signed).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, to = %intent.to, "transfer not accepted");
                return Err(e);
            }
        };
        tracing::info!(tx_hash = %receipt.tx_hash, "transfer accepted");

        Ok(HistoryEntry {
            tx_hash: receipt.tx_hash,
            from: intent.from,
            to: intent.to,
            amount: signed.amount,
            timestamp: now_epoch_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        keys,
        kv::MemoryKv,
        node::TransferReceipt,
        signer::SignedTransfer,
        wallet::WalletStore,
    };
    use std::sync::Mutex;

    struct MockNode {
        balance: Decimal,
        outcome: Result<TransferReceipt, VelwalletError>,
        submitted: Mutex<Vec<SignedTransfer>>,
    }

    impl MockNode {
        fn accepting(balance: i64) -> Self {
            Self {
                balance: Decimal::from(balance),
                outcome: Ok(TransferReceipt {
                    tx_hash: "hash".into(),
                }),
                submitted: Mutex::new(vec![]),
            }
        }

        fn failing(e: VelwalletError) -> Self {
            Self {
                balance: Decimal::from(100_i32),
                outcome: Err(e),
                submitted: Mutex::new(vec![]),
            }
        }

        fn submitted(&self) -> eyre::Result<Vec<SignedTransfer>> {
            Ok(self
                .submitted
                .lock()
                .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
                .clone())
        }
    }

    impl LedgerNode for MockNode {
        async fn balance(&self, _address: &str) -> Result<Decimal, VelwalletError> {
            Ok(self.balance)
        }

        async fn submit(&self, transfer: &SignedTransfer) -> Result<TransferReceipt, VelwalletError> {
            self.submitted
                .lock()
                .map_err(|e| VelwalletError::NodeUnreachable(format!("mutex poisoned: {e}")))?
                .push(transfer.clone());
            self.outcome.clone()
        }
    }

    async fn send_err(
        c: &TransferCoordinator<MockNode>,
        to: &str,
        amount: &str,
        balance: Decimal,
    ) -> Option<VelwalletError> {
        let id = keys::generate();
        c.send(&id, to, amount, balance).await.err()
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() -> eyre::Result<()> {
        let c = TransferCoordinator::new(MockNode::accepting(100));
        let bal = Decimal::from(100_i32);
        assert_eq!(send_err(&c, "X", "0", bal).await, Some(VelwalletError::InvalidAmount));
        assert_eq!(send_err(&c, "X", "-5", bal).await, Some(VelwalletError::InvalidAmount));
        assert_eq!(send_err(&c, "X", "abc", bal).await, Some(VelwalletError::InvalidAmount));
        assert!(c.node().submitted()?.is_empty(), "no request may reach the node");
        Ok(())
    }

    #[tokio::test]
    async fn rejects_blank_recipient_before_amount() -> eyre::Result<()> {
        let c = TransferCoordinator::new(MockNode::accepting(100));
        let bal = Decimal::from(100_i32);
        assert_eq!(send_err(&c, "   ", "0", bal).await, Some(VelwalletError::InvalidRecipient));
        assert!(c.node().submitted()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn balance_boundary_is_inclusive() -> eyre::Result<()> {
        let c = TransferCoordinator::new(MockNode::accepting(10));
        let id = keys::generate();
        let bal = Decimal::from(10_i32);

        let over = c.send(&id, "X", "10.01", bal).await;
        assert_eq!(
            over.err(),
            Some(VelwalletError::InsufficientFunds {
                amount: Decimal::new(1001, 2),
                balance: bal,
            })
        );
        assert!(c.node().submitted()?.is_empty());

        let exact = c.send(&id, "X", "10", bal).await?;
        assert_eq!(exact.amount, bal);
        assert_eq!(c.node().submitted()?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn submitted_transfer_is_verifiable() -> eyre::Result<()> {
        let c = TransferCoordinator::new(MockNode::accepting(100));
        let id = keys::generate();
        let entry = c.send(&id, "  def456 ", "2.50", Decimal::from(100_i32)).await?;
        assert_eq!(entry.to, "def456");
        assert_eq!(entry.from, id.address);
        assert_eq!(entry.tx_hash, "hash");
        assert!(entry.timestamp > 0.0);

        let sent = c.node().submitted()?;
        let t = sent.first().ok_or_else(|| eyre::eyre!("nothing submitted"))?;
        assert_eq!(t.amount.to_string(), "2.5");
        assert_eq!(t.public_key, id.public_key);
        assert!(signer::verify(&t.public_key, &t.from, &t.to, t.amount, &t.signature));
        Ok(())
    }

    #[tokio::test]
    async fn node_failures_are_returned_without_history() -> eyre::Result<()> {
        let mut store = WalletStore::open(MemoryKv::default());
        let id = store.create()?.clone();

        for e in [
            VelwalletError::NodeRejected(Some("Invalid signature".into())),
            VelwalletError::NodeUnreachable("connection refused".into()),
        ] {
            let c = TransferCoordinator::new(MockNode::failing(e.clone()));
            let r = c.send(&id, "X", "1", Decimal::from(100_i32)).await;
            assert_eq!(r.err(), Some(e));
            assert_eq!(c.node().submitted()?.len(), 1, "exactly one attempt, no retry");
        }
        assert!(store.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn two_sends_are_recorded_newest_first() -> eyre::Result<()> {
        let mut store = WalletStore::open(MemoryKv::default());
        let id = store.create()?.clone();
        let c = TransferCoordinator::new(MockNode::accepting(100));

        let balance = c.node().balance(&id.address).await?;
        let first = c.send(&id, "X", "5", balance).await?;
        store.append_history(first)?;
        let second = c.send(&id, "Y", "3", balance).await?;
        store.append_history(second)?;

        let reopened = WalletStore::open(store.into_kv());
        let got: Vec<(String, Decimal)> = reopened
            .history()
            .iter()
            .map(|e| (e.to.clone(), e.amount))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Y".to_owned(), Decimal::from(3_i32)),
                ("X".to_owned(), Decimal::from(5_i32))
            ]
        );
        Ok(())
    }
}
