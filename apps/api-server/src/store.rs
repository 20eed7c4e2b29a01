// Store abstraction supporting memory or sqlite (feature-gated).

use domain::adapters::memory_store::InMemoryStore;
use domain::{CoreError, Link, LinkStore, ShortCode, Upsert};

use crate::config::{Config, StorageProvider};

pub enum AnyStore {
    Memory(InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteStore),
}

impl AnyStore {
    /// Open the backend selected by config.
    pub fn open(cfg: &Config) -> Result<Self, CoreError> {
        match cfg.storage_provider {
            #[cfg(feature = "sqlite")]
            StorageProvider::Sqlite => Ok(Self::Sqlite(sqlite_adapter::SqliteStore::open(
                &cfg.db_path,
            )?)),
            _ => Ok(Self::Memory(InMemoryStore::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnyStore::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(_) => "sqlite",
        }
    }

    pub fn close(self) -> Result<(), CoreError> {
        match self {
            AnyStore::Memory(_) => Ok(()),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.close(),
        }
    }
}

impl LinkStore for AnyStore {
    fn find_by_url(&self, full: &str) -> Result<Option<Link>, CoreError> {
        match self {
            AnyStore::Memory(s) => s.find_by_url(full),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.find_by_url(full),
        }
    }

    fn find_by_code(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        match self {
            AnyStore::Memory(s) => s.find_by_code(short),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.find_by_code(short),
        }
    }

    fn insert(&self, full: &str, short: &ShortCode) -> Result<Link, CoreError> {
        match self {
            AnyStore::Memory(s) => s.insert(full, short),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.insert(full, short),
        }
    }

    fn insert_if_absent(&self, full: &str, short: &ShortCode) -> Result<Upsert, CoreError> {
        match self {
            AnyStore::Memory(s) => s.insert_if_absent(full, short),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.insert_if_absent(full, short),
        }
    }

    fn increment_clicks(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        match self {
            AnyStore::Memory(s) => s.increment_clicks(short),
            #[cfg(feature = "sqlite")]
            AnyStore::Sqlite(s) => s.increment_clicks(short),
        }
    }
}
