//! Interrupt Registry - named values pushed from scripts to the host
//!
//! Scripts push values for a parameter name; the host registers a callback
//! per name and is notified synchronously, on the pushing thread, each time a
//! new value arrives. Entries are never removed.

use std::sync::Arc;

use dashmap::DashMap;
use scriptdev_types::Variant;

/// Notification invoked after a new value has been cached
pub type InterruptCallback = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    value: Variant,
    callback: InterruptCallback,
}

/// Name-keyed cache of the last pushed value and its notification callback
#[derive(Default)]
pub struct InterruptRegistry {
    entries: DashMap<String, Entry>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `name`.
    ///
    /// The first registrant of a name owns its callback slot; later calls
    /// leave it untouched and return false.
    pub fn register<F>(&self, name: impl Into<String>, callback: F) -> bool
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = name.into();
        let mut inserted = false;
        self.entries.entry(name.clone()).or_insert_with(|| {
            inserted = true;
            Entry {
                value: Variant::None,
                callback: Arc::new(callback),
            }
        });

        if inserted {
            tracing::debug!("[interrupt:{}] Registered", name);
        } else {
            tracing::debug!("[interrupt:{}] Already registered, keeping first callback", name);
        }
        inserted
    }

    /// Cache `value` for `name` and invoke its callback.
    ///
    /// Returns false if nobody registered `name`. The callback runs after the
    /// entry is unlocked, so it may read the registry.
    pub fn push(&self, name: &str, value: Variant) -> bool {
        let callback = match self.entries.get_mut(name) {
            Some(mut entry) => {
                entry.value = value;
                entry.callback.clone()
            }
            None => {
                tracing::trace!("[interrupt:{}] Push for unregistered name ignored", name);
                return false;
            }
        };

        callback();
        true
    }

    /// Last pushed value for `name`, or [`Variant::None`] if unknown or never
    /// pushed
    pub fn read(&self, name: &str) -> Variant {
        self.entries
            .get(name)
            .map(|entry| entry.value.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in no particular order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
