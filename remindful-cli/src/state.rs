use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const HOME_ENV: &str = "REMINDFUL_HOME";

/// On-disk layout under the remindful home directory.
#[derive(Debug, Clone)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    /// `--home` wins, then `$REMINDFUL_HOME`, then `$HOME/.remindful`.
    pub fn resolve(home_override: Option<PathBuf>) -> Result<Self> {
        if let Some(home) = home_override {
            return Ok(Self::at(home));
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(home)));
        }
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(Self::at(PathBuf::from(home).join(".remindful")))
    }

    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn ensure_home(&self) -> Result<&Path> {
        fs::create_dir_all(&self.home)
            .with_context(|| format!("create {}", self.home.display()))?;
        Ok(&self.home)
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.join("tasks.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_home_wins() {
        let paths = Paths::resolve(Some(PathBuf::from("/tmp/rm-home"))).unwrap();
        assert_eq!(paths.home(), Path::new("/tmp/rm-home"));
        assert_eq!(paths.config_path(), Path::new("/tmp/rm-home/config.toml"));
        assert_eq!(paths.store_path(), Path::new("/tmp/rm-home/tasks.json"));
    }

    #[test]
    fn ensure_home_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path().join("a").join("b"));
        assert!(!paths.home().exists());
        paths.ensure_home().unwrap();
        assert!(paths.home().is_dir());
    }
}
