//! Process-wide collection of live client instances.
//!
//! Built once at startup and append-only afterwards: instances are never
//! removed during normal operation, only told to quit during shutdown. The
//! registry owns its instances; instances know nothing about the registry.

use std::sync::{Arc, PoisonError, RwLock};

use super::instance::{IrcInstance, Status};

/// All active client instances.
#[derive(Debug, Default)]
pub struct Registry {
    instances: RwLock<Vec<Arc<IrcInstance>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance. Instances are only ever appended.
    pub fn insert(&self, instance: Arc<IrcInstance>) {
        self.guard().push(instance);
    }

    /// Look up an instance by its network name.
    pub fn get(&self, name: &str) -> Option<Arc<IrcInstance>> {
        self.read_guard()
            .iter()
            .find(|instance| instance.name() == name)
            .cloned()
    }

    /// Snapshot of all instances, in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<IrcInstance>> {
        self.read_guard().clone()
    }

    /// Weakly consistent snapshot of every instance's status ledger.
    pub fn statuses(&self) -> Vec<(String, Status)> {
        self.read_guard()
            .iter()
            .map(|instance| (instance.name().to_string(), instance.status()))
            .collect()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    /// Whether no instances are registered.
    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    fn guard(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<IrcInstance>>> {
        self.instances.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<IrcInstance>>> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }
}
