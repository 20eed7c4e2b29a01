//! Domain library for the URL Shortener.
//!
//! Holds the link types, the ports (traits) adapters implement, and the error
//! definitions. Keep HTTP and database concerns out of this crate.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// A URL-safe code identifying a short link.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Returns `None` for strings no generator could have produced.
    pub fn parse<S: Into<String>>(s: S) -> Option<Self> {
        let val = s.into();
        Self::is_well_formed(&val).then_some(Self(val))
    }

    /// Non-empty, ASCII alphanumerics plus `-` and `_`.
    pub fn is_well_formed(s: &str) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored short link. Field names match the JSON the HTTP layer returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Normalized original URL; always carries a scheme prefix.
    pub full: String,
    pub short: ShortCode,
    /// Number of successful redirects.
    pub clicks: u64,
}

impl Link {
    /// A freshly created link with zero clicks.
    pub fn new(full: String, short: ShortCode) -> Self {
        Self {
            full,
            short,
            clicks: 0,
        }
    }
}

/// Outcome of [`LinkStore::insert_if_absent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// No record existed for the URL; this one was created.
    Inserted(Link),
    /// A record for the URL was already stored and is returned untouched.
    Existing(Link),
}

impl Upsert {
    pub fn into_link(self) -> Link {
        match self {
            Upsert::Inserted(link) | Upsert::Existing(link) => link,
        }
    }
}

/// Short code generator interface. Generators never consult the store.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> ShortCode;
}

/// Store port for persisting and loading links.
pub trait LinkStore: Send + Sync {
    fn find_by_url(&self, full: &str) -> Result<Option<Link>, CoreError>;
    fn find_by_code(&self, short: &ShortCode) -> Result<Option<Link>, CoreError>;
    /// Create a record with zero clicks. Fails with `CodeTaken` / `UrlTaken`
    /// when either key is already stored.
    fn insert(&self, full: &str, short: &ShortCode) -> Result<Link, CoreError>;
    /// Atomically return the record for `full` or create it with `short`.
    fn insert_if_absent(&self, full: &str, short: &ShortCode) -> Result<Upsert, CoreError>;
    /// Atomically add one click and return the updated record.
    fn increment_clicks(&self, short: &ShortCode) -> Result<Option<Link>, CoreError>;
}

impl<T: LinkStore + ?Sized> LinkStore for Arc<T> {
    fn find_by_url(&self, full: &str) -> Result<Option<Link>, CoreError> {
        (**self).find_by_url(full)
    }

    fn find_by_code(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        (**self).find_by_code(short)
    }

    fn insert(&self, full: &str, short: &ShortCode) -> Result<Link, CoreError> {
        (**self).insert(full, short)
    }

    fn insert_if_absent(&self, full: &str, short: &ShortCode) -> Result<Upsert, CoreError> {
        (**self).insert_if_absent(full, short)
    }

    fn increment_clicks(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        (**self).increment_clicks(short)
    }
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("link not found")]
    NotFound,
    #[error("short code already in use")]
    CodeTaken,
    #[error("url already shortened")]
    UrlTaken,
    #[error("no free short code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },
    #[error("store error: {0}")]
    Store(String),
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - domain library loaded", pkg, ver)
}

pub mod adapters;
pub mod codegen;
pub mod normalize;
pub mod service;
