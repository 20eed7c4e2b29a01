use tracing::{debug, warn};

use crate::normalize::normalize;
use crate::{CodeGenerator, CoreError, Link, LinkStore, ShortCode, Upsert};

/// How many freshly generated codes `shorten` tries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Application service turning long URLs into stored links.
///
/// Deduplicates on the normalized URL: shortening the same URL twice returns
/// the first record. New codes come from the generator and are committed with
/// the store's atomic insert-if-absent, so two concurrent requests for the
/// same URL end up with one record. A generated code that collides with a
/// different URL's record is discarded and a new one drawn, up to
/// `max_attempts` times.
pub struct ShortenService<S: LinkStore, G: CodeGenerator> {
    store: S,
    generator: G,
    max_attempts: u32,
}

impl<S: LinkStore, G: CodeGenerator> ShortenService<S, G> {
    pub fn new(store: S, generator: G) -> Self {
        Self {
            store,
            generator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the collision retry budget. Values below one are treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Shorten `raw_url`, returning the existing record when the normalized
    /// URL is already stored.
    pub fn shorten(&self, raw_url: &str) -> Result<Link, CoreError> {
        let full = normalize(raw_url);

        if let Some(existing) = self.store.find_by_url(&full)? {
            debug!(short = %existing.short, "url already shortened");
            return Ok(existing);
        }

        for attempt in 1..=self.max_attempts {
            let code = self.generator.generate();
            match self.store.insert_if_absent(&full, &code) {
                Ok(Upsert::Inserted(link)) => {
                    debug!(short = %link.short, attempt, "link created");
                    return Ok(link);
                }
                Ok(Upsert::Existing(link)) => {
                    debug!(short = %link.short, "lost insert race, returning existing link");
                    return Ok(link);
                }
                Err(CoreError::CodeTaken) => {
                    warn!(short = %code, attempt, "generated code collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CoreError::CodeSpaceExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// Application service resolving short codes and counting visits.
pub struct RedirectService<S: LinkStore> {
    store: S,
}

impl<S: LinkStore> RedirectService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Count one visit for `code` and return the updated record. The caller
    /// redirects to `link.full`. Unknown or malformed codes yield `NotFound`
    /// and touch nothing.
    pub fn resolve(&self, code: &str) -> Result<Link, CoreError> {
        let Some(code) = ShortCode::parse(code) else {
            return Err(CoreError::NotFound);
        };
        self.store
            .increment_clicks(&code)?
            .ok_or(CoreError::NotFound)
    }
}
