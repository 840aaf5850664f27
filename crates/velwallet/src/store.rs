use crate::{config::VelwalletConfig, paths::VelwalletPaths};
use eyre::Context as _;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

/// Apply environment variable overrides to the config (node endpoint, timeout).
fn apply_env_overrides(cfg: &mut VelwalletConfig) {
    apply_overrides_from(cfg, |var| std::env::var(var).ok());
}

fn apply_overrides_from(cfg: &mut VelwalletConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("VELWALLET_NODE_URL") {
        let t = v.trim();
        if !t.is_empty() {
            t.clone_into(&mut cfg.node.base_url);
        }
    }
    if let Some(v) = get("VELWALLET_NODE_TIMEOUT_SECONDS") {
        if let Ok(n) = v.trim().parse::<u64>() {
            if n > 0 {
                cfg.node.timeout_seconds = n;
            }
        }
    }
}

impl ConfigStore {
    pub fn new(paths: &VelwalletPaths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn load_or_init_default(&self) -> eyre::Result<VelwalletConfig> {
        let mut cfg = if self.path.exists() {
            let s = fs::read_to_string(&self.path).context("read config.toml")?;
            toml::from_str(&s).context("parse config.toml")?
        } else {
            let cfg = VelwalletConfig::default();
            self.save(&cfg)?;
            cfg
        };
        apply_env_overrides(&mut cfg);
        Ok(cfg)
    }

    pub fn save(&self, cfg: &VelwalletConfig) -> eyre::Result<()> {
        let s = toml::to_string_pretty(cfg).context("serialize config.toml")?;
        crate::fsutil::write_string_atomic_restrictive(
            &self.path,
            &s,
            crate::fsutil::MODE_FILE_PRIVATE,
        )
        .context("write config.toml")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> ConfigStore {
        ConfigStore {
            path: dir.join("config.toml"),
        }
    }

    #[test]
    fn first_load_writes_defaults() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        let store = store_in(td.path());
        let cfg = store.load_or_init_default()?;
        assert!(td.path().join("config.toml").exists());
        let again = store.load_or_init_default()?;
        assert_eq!(cfg.node.timeout_seconds, again.node.timeout_seconds);
        Ok(())
    }

    #[test]
    fn invalid_toml_is_an_error() -> eyre::Result<()> {
        let td = tempfile::tempdir().context("create tempdir")?;
        fs::write(td.path().join("config.toml"), "[node\n")?;
        assert!(store_in(td.path()).load_or_init_default().is_err());
        Ok(())
    }

    #[test]
    fn env_overrides_apply_over_file_values() {
        let mut cfg = VelwalletConfig::default();
        apply_overrides_from(&mut cfg, |k| match k {
            "VELWALLET_NODE_URL" => Some(" http://127.0.0.1:9000 ".into()),
            "VELWALLET_NODE_TIMEOUT_SECONDS" => Some("0".into()),
            _ => None,
        });
        assert_eq!(cfg.node.base_url, "http://127.0.0.1:9000");
        assert_eq!(cfg.node.timeout_seconds, 15, "zero timeout is ignored");
    }
}
