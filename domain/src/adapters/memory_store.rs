use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::{CoreError, Link, LinkStore, ShortCode, Upsert};

#[derive(Default)]
struct Tables {
    by_code: BTreeMap<String, Link>,
    /// normalized url -> short code
    by_url: BTreeMap<String, String>,
}

/// In-memory store. A single mutex guards both indexes, so every operation
/// is atomic with respect to the others.
pub struct InMemoryStore {
    inner: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables::default()),
        }
    }

    /// Number of stored links.
    pub fn len(&self) -> Result<usize, CoreError> {
        Ok(self.lock()?.by_code.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Store("mutex poisoned".into()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    fn create(&mut self, full: &str, short: &ShortCode) -> Link {
        let link = Link::new(full.to_string(), short.clone());
        self.by_url
            .insert(full.to_string(), short.as_str().to_string());
        self.by_code
            .insert(short.as_str().to_string(), link.clone());
        link
    }

    fn get_by_url(&self, full: &str) -> Option<&Link> {
        self.by_url
            .get(full)
            .and_then(|code| self.by_code.get(code))
    }
}

impl LinkStore for InMemoryStore {
    fn find_by_url(&self, full: &str) -> Result<Option<Link>, CoreError> {
        Ok(self.lock()?.get_by_url(full).cloned())
    }

    fn find_by_code(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        Ok(self.lock()?.by_code.get(short.as_str()).cloned())
    }

    fn insert(&self, full: &str, short: &ShortCode) -> Result<Link, CoreError> {
        let mut tables = self.lock()?;
        if tables.by_code.contains_key(short.as_str()) {
            return Err(CoreError::CodeTaken);
        }
        if tables.by_url.contains_key(full) {
            return Err(CoreError::UrlTaken);
        }
        Ok(tables.create(full, short))
    }

    fn insert_if_absent(&self, full: &str, short: &ShortCode) -> Result<Upsert, CoreError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables.get_by_url(full) {
            return Ok(Upsert::Existing(existing.clone()));
        }
        if tables.by_code.contains_key(short.as_str()) {
            return Err(CoreError::CodeTaken);
        }
        Ok(Upsert::Inserted(tables.create(full, short)))
    }

    fn increment_clicks(&self, short: &ShortCode) -> Result<Option<Link>, CoreError> {
        let mut tables = self.lock()?;
        Ok(tables.by_code.get_mut(short.as_str()).map(|link| {
            link.clicks += 1;
            link.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::parse(s).unwrap()
    }

    #[test]
    fn insert_then_find_both_ways() {
        let store = InMemoryStore::new();
        let created = store.insert("http://a.com", &code("aaa")).unwrap();
        assert_eq!(created.clicks, 0);
        assert_eq!(store.find_by_url("http://a.com").unwrap(), Some(created.clone()));
        assert_eq!(store.find_by_code(&code("aaa")).unwrap(), Some(created));
        assert_eq!(store.find_by_url("http://b.com").unwrap(), None);
        assert_eq!(store.find_by_code(&code("bbb")).unwrap(), None);
    }

    #[test]
    fn insert_rejects_duplicate_keys() {
        let store = InMemoryStore::new();
        store.insert("http://a.com", &code("aaa")).unwrap();
        assert!(matches!(
            store.insert("http://other.com", &code("aaa")),
            Err(CoreError::CodeTaken)
        ));
        assert!(matches!(
            store.insert("http://a.com", &code("bbb")),
            Err(CoreError::UrlTaken)
        ));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn insert_if_absent_returns_existing_record() {
        let store = InMemoryStore::new();
        let first = store.insert_if_absent("http://a.com", &code("aaa")).unwrap();
        assert!(matches!(first, Upsert::Inserted(_)));

        // different code, same url: existing record wins, code is not reassigned
        let second = store.insert_if_absent("http://a.com", &code("zzz")).unwrap();
        match second {
            Upsert::Existing(link) => assert_eq!(link.short.as_str(), "aaa"),
            other => panic!("expected Existing, got {other:?}"),
        }
        assert_eq!(store.find_by_code(&code("zzz")).unwrap(), None);
    }

    #[test]
    fn insert_if_absent_reports_code_collision() {
        let store = InMemoryStore::new();
        store.insert("http://a.com", &code("aaa")).unwrap();
        let err = store.insert_if_absent("http://b.com", &code("aaa")).unwrap_err();
        assert!(matches!(err, CoreError::CodeTaken));
        assert_eq!(store.find_by_url("http://b.com").unwrap(), None);
    }

    #[test]
    fn increment_updates_and_returns_record() {
        let store = InMemoryStore::new();
        store.insert("http://a.com", &code("aaa")).unwrap();
        let one = store.increment_clicks(&code("aaa")).unwrap().unwrap();
        let two = store.increment_clicks(&code("aaa")).unwrap().unwrap();
        assert_eq!((one.clicks, two.clicks), (1, 2));
        assert_eq!(store.find_by_url("http://a.com").unwrap().unwrap().clicks, 2);
    }

    #[test]
    fn increment_missing_is_none() {
        let store = InMemoryStore::new();
        assert_eq!(store.increment_clicks(&code("nope")).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }
}
