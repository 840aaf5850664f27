use eyre::Context as _;
use std::{fs, path::PathBuf};

/// String-valued key-value persistence, the shape the wallet state has always been stored in.
pub trait KvStore {
    fn get(&self, key: &str) -> eyre::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()>;
    fn remove(&mut self, key: &str) -> eyre::Result<()>;
}

/// One private file per key under `root`, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, key: &str) -> eyre::Result<PathBuf> {
        let ok = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !ok {
            eyre::bail!("invalid storage key: {key:?}");
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        let p = self.path_for(key)?;
        if !p.exists() {
            return Ok(None);
        }
        let md = fs::symlink_metadata(&p).with_context(|| format!("stat {}", p.display()))?;
        if md.file_type().is_symlink() {
            eyre::bail!("refusing to read symlink: {}", p.display());
        }
        let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
        Ok(Some(s))
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        let p = self.path_for(key)?;
        crate::fsutil::write_string_atomic_restrictive(&p, value, crate::fsutil::MODE_FILE_PRIVATE)
            .with_context(|| format!("write {key}"))
    }

    fn remove(&mut self, key: &str) -> eyre::Result<()> {
        let p = self.path_for(key)?;
        match fs::remove_file(&p) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(eyre::Report::new(e).wrap_err(format!("remove {}", p.display()))),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    pub entries: std::collections::BTreeMap<String, String>,
}

#[cfg(test)]
impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> eyre::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> eyre::Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> eyre::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
