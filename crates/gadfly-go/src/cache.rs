//! Thread-safe memoization for the symbol resolver.
//!
//! Five independent caches, each behind its own reader-writer lock so that
//! contention in one category never blocks another:
//!
//! 1. resolved references (arbitrary string key)
//! 2. method sets (`methodset:<package>:<type>`)
//! 3. package symbol tables (import path)
//! 4. identifier types (`<file>:<position>`)
//! 5. method-belongs-to-type decisions
//!
//! A statistics sidecar under a separate lock counts hits and misses per
//! category; queries never contend with bookkeeping.
//!
//! Invalidation is the only state mutation reachable after workspace load:
//! by package (drops the table, every reference key containing the package
//! identifier, and every `methodset:<package>:` key) or by file (drops every
//! reference key prefixed with the file path).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::resolver::Reference;
use crate::symbols::{Symbol, SymbolTable};

// ============================================================================
// Statistics
// ============================================================================

/// Hit/miss counters for one cache category.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

impl CacheCounters {
    fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Snapshot of all cache counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub references: CacheCounters,
    pub method_sets: CacheCounters,
    pub symbol_tables: CacheCounters,
    pub ident_types: CacheCounters,
    pub method_type_pairs: CacheCounters,
}

// ============================================================================
// Cache
// ============================================================================

/// Thread-safe resolver cache. Safe under concurrent readers and writers;
/// writers take a brief exclusive lock per category.
#[derive(Default)]
pub struct SymbolCache {
    references: RwLock<HashMap<String, Vec<Reference>>>,
    method_sets: RwLock<HashMap<String, Vec<Arc<Symbol>>>>,
    symbol_tables: RwLock<HashMap<String, Arc<SymbolTable>>>,
    ident_types: RwLock<HashMap<String, String>>,
    method_type_pairs: RwLock<HashMap<String, bool>>,
    stats: Mutex<CacheStats>,
}

impl SymbolCache {
    pub fn new() -> Self {
        SymbolCache::default()
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap()
    }

    // ------------------------------------------------------------------
    // Resolved references
    // ------------------------------------------------------------------

    pub fn get_references(&self, key: &str) -> Option<Vec<Reference>> {
        let value = self.references.read().unwrap().get(key).cloned();
        self.stats.lock().unwrap().references.record(value.is_some());
        value
    }

    pub fn put_references(&self, key: &str, refs: Vec<Reference>) {
        self.references.write().unwrap().insert(key.to_string(), refs);
    }

    // ------------------------------------------------------------------
    // Method sets
    // ------------------------------------------------------------------

    pub fn get_method_set(&self, key: &str) -> Option<Vec<Arc<Symbol>>> {
        let value = self.method_sets.read().unwrap().get(key).cloned();
        self.stats.lock().unwrap().method_sets.record(value.is_some());
        value
    }

    pub fn put_method_set(&self, key: &str, set: Vec<Arc<Symbol>>) {
        self.method_sets.write().unwrap().insert(key.to_string(), set);
    }

    // ------------------------------------------------------------------
    // Package symbol tables
    // ------------------------------------------------------------------

    pub fn get_symbol_table(&self, package: &str) -> Option<Arc<SymbolTable>> {
        let value = self.symbol_tables.read().unwrap().get(package).cloned();
        self.stats.lock().unwrap().symbol_tables.record(value.is_some());
        value
    }

    pub fn put_symbol_table(&self, package: &str, table: Arc<SymbolTable>) {
        self.symbol_tables
            .write()
            .unwrap()
            .insert(package.to_string(), table);
    }

    // ------------------------------------------------------------------
    // Identifier types (file:position -> resolved type name)
    // ------------------------------------------------------------------

    pub fn get_ident_type(&self, key: &str) -> Option<String> {
        let value = self.ident_types.read().unwrap().get(key).cloned();
        self.stats.lock().unwrap().ident_types.record(value.is_some());
        value
    }

    pub fn put_ident_type(&self, key: &str, type_name: String) {
        self.ident_types
            .write()
            .unwrap()
            .insert(key.to_string(), type_name);
    }

    // ------------------------------------------------------------------
    // Method-belongs-to-type decisions
    // ------------------------------------------------------------------

    pub fn get_method_type(&self, key: &str) -> Option<bool> {
        let value = self.method_type_pairs.read().unwrap().get(key).copied();
        self.stats
            .lock()
            .unwrap()
            .method_type_pairs
            .record(value.is_some());
        value
    }

    pub fn put_method_type(&self, key: &str, decision: bool) {
        self.method_type_pairs
            .write()
            .unwrap()
            .insert(key.to_string(), decision);
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Drop everything derived from one package.
    pub fn invalidate_package(&self, package: &str) {
        self.symbol_tables.write().unwrap().remove(package);
        self.references
            .write()
            .unwrap()
            .retain(|key, _| !key.contains(package));
        let prefix = format!("methodset:{}:", package);
        self.method_sets
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(&prefix));
    }

    /// Drop every resolved-reference entry derived from one file.
    pub fn invalidate_file(&self, path: &Path) {
        let prefix = format!("{}:", path.display());
        self.references
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(&prefix));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gadfly_go_cst::pos::Pos;
    use std::path::PathBuf;

    fn reference(file: &str) -> Reference {
        Reference {
            file: PathBuf::from(file),
            pos: Pos(1),
            line: 1,
            col: 1,
            text: "x".to_string(),
        }
    }

    #[test]
    fn hit_and_miss_counters() {
        let cache = SymbolCache::new();
        assert!(cache.get_references("k").is_none());
        cache.put_references("k", vec![reference("a.go")]);
        assert_eq!(cache.get_references("k").unwrap().len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.references.misses, 1);
        assert_eq!(stats.references.hits, 1);
    }

    #[test]
    fn invalidate_package_sweeps_matching_keys() {
        let cache = SymbolCache::new();
        cache.put_references("a/a.go:12:m/a:", vec![reference("a.go")]);
        cache.put_references("b/b.go:40:m/b:", vec![reference("b.go")]);
        cache.put_method_set("methodset:m/a:Server", vec![]);
        cache.put_method_set("methodset:m/b:Server", vec![]);

        cache.invalidate_package("m/a");
        assert!(cache.get_references("a/a.go:12:m/a:").is_none());
        assert!(cache.get_references("b/b.go:40:m/b:").is_some());
        assert!(cache.get_method_set("methodset:m/a:Server").is_none());
        assert!(cache.get_method_set("methodset:m/b:Server").is_some());
    }

    #[test]
    fn invalidate_file_sweeps_prefixed_reference_keys() {
        let cache = SymbolCache::new();
        cache.put_references("a/a.go:12:m/a:", vec![reference("a.go")]);
        cache.put_references("a/aux.go:9:m/a:", vec![reference("aux.go")]);

        cache.invalidate_file(Path::new("a/a.go"));
        assert!(cache.get_references("a/a.go:12:m/a:").is_none());
        assert!(cache.get_references("a/aux.go:9:m/a:").is_some());
    }

    #[test]
    fn categories_are_independent() {
        let cache = SymbolCache::new();
        cache.put_ident_type("a.go:10", "Server".to_string());
        cache.put_method_type("m/a.Server.Run|m/a.Server", true);

        cache.invalidate_package("m/a");
        // Only reference/method-set/table categories are swept by package.
        assert_eq!(cache.get_ident_type("a.go:10").as_deref(), Some("Server"));
        assert_eq!(cache.get_method_type("m/a.Server.Run|m/a.Server"), Some(true));
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(SymbolCache::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                let key = format!("k{}", i % 4);
                for _ in 0..100 {
                    cache.put_references(&key, vec![reference("a.go")]);
                    let _ = cache.get_references(&key);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let stats = cache.stats();
        assert_eq!(stats.references.hits + stats.references.misses, 800);
    }
}
