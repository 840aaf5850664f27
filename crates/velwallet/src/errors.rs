use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A structured error suitable for printing as machine-readable CLI output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
}

impl CliError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VelwalletError {
    #[error("invalid private key")]
    InvalidKey,

    #[error("invalid recipient address")]
    InvalidRecipient,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("insufficient funds: amount {amount} exceeds balance {balance}")]
    InsufficientFunds { amount: Decimal, balance: Decimal },

    #[error("signing failed")]
    SigningError,

    #[error("node unreachable: {0}")]
    NodeUnreachable(String),

    #[error("node rejected request: {}", .0.as_deref().unwrap_or("no message"))]
    NodeRejected(Option<String>),

    #[error("no wallet loaded")]
    NoWallet,

    #[error("another transfer is in progress")]
    Busy,
}

impl VelwalletError {
    /// Stable identifier for scripts consuming `--json` output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid_key",
            Self::InvalidRecipient => "invalid_recipient",
            Self::InvalidAmount => "invalid_amount",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::SigningError => "signing_error",
            Self::NodeUnreachable(_) => "node_unreachable",
            Self::NodeRejected(_) => "node_rejected",
            Self::NoWallet => "no_wallet",
            Self::Busy => "busy",
        }
    }

    /// True for failures detected before any network round-trip.
    pub const fn is_local_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey | Self::InvalidRecipient | Self::InvalidAmount | Self::InsufficientFunds { .. }
        )
    }
}

impl From<VelwalletError> for CliError {
    fn from(e: VelwalletError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<&eyre::Report> for CliError {
    fn from(r: &eyre::Report) -> Self {
        match r.downcast_ref::<VelwalletError>() {
            Some(e) => e.clone().into(),
            None => Self::new("internal", format!("{r:#}")),
        }
    }
}
