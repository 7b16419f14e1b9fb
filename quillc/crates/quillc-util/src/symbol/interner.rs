//! String interner implementation using DashMap for concurrent access.
//!
//! This module provides a thread-safe string interner used to give
//! function, class, and global names a compact, comparable handle:
//! - Lock-free concurrent access via DashMap
//! - Fast hashing with AHasher
//! - Statistics tracking for profiling
//!
//! # Performance Characteristics
//!
//! - **Interning (hit)**: O(1) - hash lookup only
//! - **Interning (miss)**: O(1) - hash insert + allocation
//! - **Symbol comparison**: O(1) - index comparison
//! - **String retrieval**: O(n) - linear search by index (rare operation)

use ahash::AHasher;
use dashmap::DashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::LazyLock;

use super::{InternerStats, Symbol};

/// Global string table instance, initialized lazily on first use.
pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// Thread-safe string table using DashMap.
///
/// Strings are allocated on the heap and leaked (intentionally) to obtain
/// `'static` lifetime references. This is safe because the table lives for
/// the entire program duration and interned strings are never removed.
pub struct StringTable {
    /// Maps string hash to (string, symbol index) for fast lookup.
    map: DashMap<u64, (&'static str, u32)>,
    next_index: AtomicU32,
    collisions: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl StringTable {
    #[inline]
    fn new() -> Self {
        Self {
            map: DashMap::with_capacity(256),
            next_index: AtomicU32::new(0),
            collisions: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Intern a string, returning its symbol.
    ///
    /// Thread-safe. If the string is already interned, returns the existing
    /// symbol; otherwise allocates a new entry.
    pub fn intern(&self, string: &str) -> Symbol {
        let hash = Self::hash_string(string);

        if let Some(entry) = self.map.get(&hash) {
            if entry.value().0 == string {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Symbol {
                    index: entry.value().1,
                };
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        match self.map.entry(hash) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                if entry.get().0 == string {
                    return Symbol { index: entry.get().1 };
                }
                self.handle_collision(string, hash)
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
                let idx = self.next_index.fetch_add(1, Ordering::Relaxed);
                entry.insert((interned, idx));
                Symbol { index: idx }
            }
        }
    }

    /// Handle hash collisions via linear probing with a golden-ratio offset.
    fn handle_collision(&self, string: &str, original_hash: u64) -> Symbol {
        const MAX_PROBES: u64 = 32;
        const PROBE_PRIME: u64 = 0x9e3779b97f4a7c15;

        for i in 1u64..=MAX_PROBES {
            let probe_hash = original_hash.wrapping_add(i.wrapping_mul(PROBE_PRIME));

            if let Some(entry) = self.map.get(&probe_hash) {
                if entry.value().0 == string {
                    return Symbol {
                        index: entry.value().1,
                    };
                }
            } else {
                self.collisions.fetch_add(1, Ordering::Relaxed);
                let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
                let idx = self.next_index.fetch_add(1, Ordering::Relaxed);
                self.map.insert(probe_hash, (interned, idx));
                return Symbol { index: idx };
            }
        }

        self.collisions.fetch_add(1, Ordering::Relaxed);
        let interned: &'static str = Box::leak(string.to_string().into_boxed_str());
        let idx = self.next_index.fetch_add(1, Ordering::Relaxed);
        self.map.insert(original_hash, (interned, idx));
        Symbol { index: idx }
    }

    /// Get the string backing a symbol.
    ///
    /// O(n) in the number of interned strings; DashMap has no efficient
    /// index-based lookup, which is an accepted trade-off for fast writes.
    pub fn get(&self, symbol: Symbol) -> Option<&'static str> {
        self.map
            .iter()
            .find(|entry| entry.value().1 == symbol.index)
            .map(|entry| entry.value().0)
    }

    #[inline]
    fn hash_string(string: &str) -> u64 {
        let mut hasher = AHasher::default();
        string.hash(&mut hasher);
        hasher.finish()
    }

    /// Snapshot statistics about the string table, useful for profiling.
    pub fn stats(&self) -> InternerStats {
        InternerStats {
            count: self.map.len(),
            capacity: self.map.capacity(),
            collisions: self.collisions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
