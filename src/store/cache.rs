//! Bounded LRU cache of resolved symbols.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::models::Symbol;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Symbol id → resolved symbol, least recently used evicted first.
pub struct SymbolCache {
    entries: Mutex<LruCache<String, Symbol>>,
}

impl SymbolCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a symbol, marking it most recently used.
    pub fn get(&self, symbol: &str) -> Option<Symbol> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(symbol).cloned()
    }

    pub fn add(&self, symbol: Symbol) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(symbol.symbol.clone(), symbol);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
