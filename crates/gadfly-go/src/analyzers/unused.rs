//! Unused-symbol detection over the reference index.
//!
//! A candidate symbol is reported when the index yields no non-declaring
//! reference. Skipped up front: `main`/`init`, symbols declared in test
//! files, test-prefixed names, exported symbols (unless `include_exported`),
//! and - for methods - any name that appears in an interface method list
//! anywhere in the workspace (pre-collected once), a conservative guard
//! against interface-dispatch false positives.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::index::ReferenceIndex;
use crate::resolver::SymbolResolver;
use crate::symbols::{Symbol, SymbolKind};

/// Name prefixes marking test entry points.
const TEST_PREFIXES: &[&str] = &["Test", "Benchmark", "Example", "Fuzz"];

/// Options for [`UnusedAnalyzer`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnusedOptions {
    /// Also examine exported symbols.
    pub include_exported: bool,
}

/// A symbol with no non-declaring reference.
#[derive(Debug, Clone, Serialize)]
pub struct UnusedViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    /// `Type.Method` for methods, the bare name otherwise.
    pub symbol: String,
    pub kind: String,
}

#[derive(Debug, Default)]
pub struct UnusedAnalyzer {
    pub options: UnusedOptions,
}

impl UnusedAnalyzer {
    pub fn new(options: UnusedOptions) -> Self {
        UnusedAnalyzer { options }
    }

    pub fn analyze(
        &self,
        resolver: &SymbolResolver,
        index: &ReferenceIndex,
    ) -> Vec<UnusedViolation> {
        let ws = resolver.workspace();

        // Every method name declared by any interface in the workspace.
        let mut interface_methods: HashSet<String> = HashSet::new();
        for pkg in ws.packages.values() {
            let Some(table) = pkg.symbols() else { continue };
            for (receiver, methods) in &table.methods {
                let is_interface = table
                    .types
                    .get(receiver)
                    .map(|t| t.kind == SymbolKind::Interface)
                    .unwrap_or(false);
                if is_interface {
                    interface_methods.extend(methods.iter().map(|m| m.name.clone()));
                }
            }
        }

        let mut violations = Vec::new();
        for pkg in ws.packages.values() {
            let Some(table) = pkg.symbols() else { continue };
            let mut symbols: Vec<_> = table.all_symbols().collect();
            symbols.sort_by_key(|s| s.span.start);
            for sym in symbols {
                if self.skip(sym, &interface_methods) {
                    continue;
                }
                if !resolver.has_non_declaration_reference(sym, index) {
                    violations.push(UnusedViolation {
                        file: sym.file.clone(),
                        line: sym.line,
                        col: sym.col,
                        symbol: sym.qualified_name(),
                        kind: sym.kind.to_string(),
                    });
                }
            }
        }
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }

    fn skip(&self, sym: &Symbol, interface_methods: &HashSet<String>) -> bool {
        if sym.name == "main" || sym.name == "init" {
            return true;
        }
        if sym
            .file
            .to_string_lossy()
            .ends_with("_test.go")
        {
            return true;
        }
        if TEST_PREFIXES.iter().any(|p| sym.name.starts_with(p)) {
            return true;
        }
        if sym.exported && !self.options.include_exported {
            return true;
        }
        if sym.kind == SymbolKind::Method && interface_methods.contains(&sym.name) {
            return true;
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
