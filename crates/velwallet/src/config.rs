use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_NODE_URL: &str = "https://velcoin.onrender.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Ledger node base URL. Must be `https`, or loopback `http` for local testing.
    pub base_url: String,
    /// Per-request timeout for balance lookups and transfer submission.
    pub timeout_seconds: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NODE_URL.into(),
            timeout_seconds: 15,
        }
    }
}

impl NodeConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelwalletConfig {
    pub node: NodeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() -> eyre::Result<()> {
        let cfg: VelwalletConfig = toml::from_str("")?;
        assert_eq!(cfg, VelwalletConfig::default());

        let partial: VelwalletConfig = toml::from_str("[node]\ntimeout_seconds = 3\n")?;
        assert_eq!(partial.node.base_url, DEFAULT_NODE_URL);
        assert_eq!(partial.node.timeout(), Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn toml_roundtrip_keeps_node_url() -> eyre::Result<()> {
        let mut cfg = VelwalletConfig::default();
        cfg.node.base_url = "http://127.0.0.1:5000".into();
        let s = toml::to_string_pretty(&cfg)?;
        let back: VelwalletConfig = toml::from_str(&s)?;
        assert_eq!(back, cfg);
        Ok(())
    }
}
