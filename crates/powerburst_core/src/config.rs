//! # Configuration Provider
//!
//! The effect never reaches into global configuration state. It is handed a
//! [`ConfigProvider`] with two capabilities:
//!
//! - `current()` returns the whole configuration document
//! - `on_change(listener)` registers a callback fired on every change
//!
//! There is no diffing. Every notification reloads the snapshot.
//!
//! [`ConfigStore`] is the in-process provider: a TOML document behind a
//! `parking_lot` lock plus a listener list. Hosts with their own settings
//! system implement the trait directly.

use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use toml::{Table, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::settings::SETTINGS_SECTION;

/// Callback fired with the new document after every change.
pub type ConfigListener = Box<dyn Fn(&Table) + Send + Sync>;

/// Source of the host configuration.
pub trait ConfigProvider {
    /// The current configuration document.
    fn current(&self) -> Table;

    /// Registers `listener`. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    fn on_change(&self, listener: ConfigListener) -> Subscription;
}

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Wraps the action that removes the listener.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct StoreInner {
    document: Table,
    listeners: Vec<(u64, Arc<ConfigListener>)>,
    next_id: u64,
}

/// In-process [`ConfigProvider`] backed by a TOML document.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ConfigStore {
    /// Creates a store holding `document`.
    #[must_use]
    pub fn new(document: Table) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                document,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::InvalidSection`] when the effect section is not a table.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(Self::new(parse_document(source)?))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`ConfigStore::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::info!("loaded configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Replaces the document and notifies every listener.
    pub fn set(&self, document: Table) {
        let listeners: Vec<Arc<ConfigListener>> = {
            let mut guard = self.inner.write();
            guard.document = document.clone();
            guard.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        // Listeners run outside the lock so they may call back into the store.
        for listener in listeners {
            (**listener)(&document);
        }
    }

    /// Parses `source` and replaces the document with it.
    ///
    /// # Errors
    ///
    /// On a parse error the current document is kept and nobody is notified.
    pub fn reload_str(&self, source: &str) -> ConfigResult<()> {
        let document = parse_document(source)?;
        self.set(document);
        Ok(())
    }

    /// Sets one key inside the effect section and notifies.
    pub fn set_effect_value(&self, key: &str, value: impl Into<Value>) {
        let mut document = self.current();
        let section = document
            .entry(SETTINGS_SECTION.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !section.is_table() {
            *section = Value::Table(Table::new());
        }
        if let Value::Table(section) = section {
            section.insert(key.to_string(), value.into());
        }
        self.set(document);
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.read().listeners.len()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(Table::new())
    }
}

impl ConfigProvider for ConfigStore {
    fn current(&self) -> Table {
        self.inner.read().document.clone()
    }

    fn on_change(&self, listener: ConfigListener) -> Subscription {
        let id = {
            let mut guard = self.inner.write();
            let id = guard.next_id;
            guard.next_id += 1;
            guard.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<RwLock<StoreInner>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.write().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

fn parse_document(source: &str) -> ConfigResult<Table> {
    let document: Table = source.parse()?;
    match document.get(SETTINGS_SECTION) {
        Some(section) if !section.is_table() => {
            Err(ConfigError::InvalidSection(SETTINGS_SECTION.to_string()))
        }
        _ => Ok(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_from_toml_str() {
        let store = ConfigStore::from_toml_str("[powerburst]\nshake = true").unwrap();
        let doc = store.current();
        assert_eq!(doc["powerburst"]["shake"].as_bool(), Some(true));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ConfigStore::from_toml_str("[powerburst"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ConfigStore::from_toml_str("powerburst = 1"),
            Err(ConfigError::InvalidSection(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ConfigStore::from_path("/definitely/not/here/powerburst.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_listener_fires_on_every_set() {
        let store = ConfigStore::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = store.on_change(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.set(Table::new());
        store.set(Table::new());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = ConfigStore::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = store.on_change(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(store.listener_count(), 1);

        drop(sub);
        assert_eq!(store.listener_count(), 0);
        store.set(Table::new());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reload_str_keeps_document_on_error() {
        let store = ConfigStore::from_toml_str("[powerburst]\nparticleSize = 4").unwrap();
        assert!(store.reload_str("not toml = = =").is_err());
        assert_eq!(store.current()["powerburst"]["particleSize"].as_integer(), Some(4));
    }

    #[test]
    fn test_set_effect_value() {
        let store = ConfigStore::default();
        store.set_effect_value("colorMode", "rainbow");
        store.set_effect_value("particleSize", 6);
        let doc = store.current();
        assert_eq!(doc["powerburst"]["colorMode"].as_str(), Some("rainbow"));
        assert_eq!(doc["powerburst"]["particleSize"].as_integer(), Some(6));
    }

    #[test]
    fn test_unsubscribe_after_store_dropped() {
        let store = ConfigStore::default();
        let sub = store.on_change(Box::new(|_| {}));
        drop(store);
        sub.unsubscribe();
    }
}
