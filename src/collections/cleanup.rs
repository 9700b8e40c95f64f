//! Release hooks for keys and values leaving a map.

use std::fmt;

use super::Pair;

/// A boxed release hook receiving ownership of a key or value.
pub type Cleanup<T> = Box<dyn FnMut(T)>;

/// Optional key and value release hooks installed on a map.
///
/// Every key and value that leaves a map through replacement, removal,
/// `clear` or drop passes through [`release`](Self::release) exactly once.
/// Without a hook the payload is simply dropped.
pub(crate) struct CleanupHooks<K, V> {
    key: Option<Cleanup<K>>,
    value: Option<Cleanup<V>>,
}

impl<K, V> CleanupHooks<K, V> {
    pub(crate) const fn new() -> Self {
        Self {
            key: None,
            value: None,
        }
    }

    pub(crate) fn set_key<F>(&mut self, hook: F)
    where
        F: FnMut(K) + 'static,
    {
        self.key = Some(Box::new(hook));
    }

    pub(crate) fn set_value<F>(&mut self, hook: F)
    where
        F: FnMut(V) + 'static,
    {
        self.value = Some(Box::new(hook));
    }

    /// `true` when neither hook is installed, so payloads can be dropped in bulk.
    pub(crate) const fn is_empty(&self) -> bool {
        self.key.is_none() && self.value.is_none()
    }

    pub(crate) fn release(&mut self, pair: Pair<K, V>) {
        let Pair { key, value } = pair;
        if let Some(hook) = self.key.as_mut() {
            hook(key);
        }
        if let Some(hook) = self.value.as_mut() {
            hook(value);
        }
    }
}

impl<K, V> fmt::Debug for CleanupHooks<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CleanupHooks")
            .field("key", &self.key.is_some())
            .field("value", &self.value.is_some())
            .finish()
    }
}
