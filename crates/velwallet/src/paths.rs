use directories::ProjectDirs;
use eyre::ContextCompat as _;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VelwalletPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl VelwalletPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) = (
            std::env::var("VELWALLET_DATA_DIR"),
            std::env::var("VELWALLET_CONFIG_DIR"),
        ) {
            return Ok(Self::from_dirs(PathBuf::from(config_dir), PathBuf::from(data_dir)));
        }

        // macOS: ~/Library/Application Support/velwallet
        // Linux: ~/.config/velwallet, ~/.local/share/velwallet
        // Windows: %APPDATA%\\velwallet
        let proj =
            ProjectDirs::from("", "", "velwallet").context("failed to resolve project dirs")?;
        Ok(Self::from_dirs(
            proj.config_dir().to_path_buf(),
            proj.data_dir().to_path_buf(),
        ))
    }

    pub fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let log_file = data_dir.join("velwallet.log.jsonl");
        Self {
            config_dir,
            data_dir,
            log_file,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Root of the key-value wallet state (one file per key).
    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn send_lock_path(&self) -> PathBuf {
        self.data_dir.join("send.lock")
    }

    pub fn ensure_private_dirs(&self) -> eyre::Result<()> {
        crate::fsutil::ensure_private_dir(&self.config_dir)?;
        crate::fsutil::ensure_private_dir(&self.data_dir)?;
        Ok(())
    }
}
