use std::path::{Path, PathBuf};
use table::LoadStrategy;

/// How [`Database::open`](crate::Database::open) loads the base table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Map the file unless it is on a network filesystem (default).
    #[default]
    Detect,
    /// Always map. Unsafe on NFS, where mapped pages can vanish.
    Map,
    /// Always read the whole file into memory.
    Read,
}

impl LoadPolicy {
    /// Resolves the policy to a concrete strategy for `path`.
    pub fn strategy_for(self, path: &Path) -> LoadStrategy {
        match self {
            LoadPolicy::Detect => LoadStrategy::detect(path),
            LoadPolicy::Map => LoadStrategy::Map,
            LoadPolicy::Read => LoadStrategy::Read,
        }
    }
}

/// Configuration for a single database
#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// Base table load policy (default: detect)
    pub load: LoadPolicy,
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base table load policy
    pub fn load(mut self, policy: LoadPolicy) -> Self {
        self.load = policy;
        self
    }
}

/// Configuration for a [`PermissionStore`](crate::PermissionStore)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one table file per table name
    pub dir: PathBuf,

    /// Settings applied to every database the store opens
    pub db: DbConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./permissions"),
            db: DbConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Create a new config with the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Set per-database settings
    pub fn db(mut self, config: DbConfig) -> Self {
        self.db = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.dir, PathBuf::from("./permissions"));
        assert_eq!(config.db.load, LoadPolicy::Detect);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("/tmp/perms").db(DbConfig::new().load(LoadPolicy::Read));
        assert_eq!(config.dir, PathBuf::from("/tmp/perms"));
        assert_eq!(config.db.load, LoadPolicy::Read);
    }

    #[test]
    fn test_forced_policies() {
        let p = Path::new("/anywhere/perms.db");
        assert_eq!(LoadPolicy::Map.strategy_for(p), LoadStrategy::Map);
        assert_eq!(LoadPolicy::Read.strategy_for(p), LoadStrategy::Read);
    }
}
