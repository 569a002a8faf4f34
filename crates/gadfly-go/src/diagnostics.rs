//! Diagnostic enrichment for failed resolutions.
//!
//! When an identifier fails to resolve, the engine collects the scope
//! context at the failure position (scope kind, names visible in the
//! chain, package-level names, imports, enclosing function) and generates
//! suggestions: names within case-insensitive edit distance 2, an import
//! hint for dotted names, and close matches from a curated list of
//! standard-library package names. Visibility failures get a capitalized
//! rename proposal.
//!
//! Enrichment never changes the original error: [`Diagnostic`] wraps it so
//! programmatic callers can still branch on the error kind.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use gadfly_core::error::{ErrorKind, GadflyError};
use gadfly_go_cst::pos::Pos;

use crate::resolver::enclosing_function;
use crate::scope::{ScopeAnalyzer, ScopeKind, UNIVERSE};
use crate::workspace::Workspace;

/// Curated standard-library-style package names used for import hints.
const STD_PACKAGES: &[&str] = &[
    "bufio",
    "bytes",
    "context",
    "encoding/json",
    "errors",
    "flag",
    "fmt",
    "io",
    "log",
    "math",
    "net/http",
    "os",
    "path/filepath",
    "regexp",
    "sort",
    "strconv",
    "strings",
    "sync",
    "time",
];

/// Maximum case-insensitive edit distance for a name suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 2;

// ============================================================================
// Diagnostic Types
// ============================================================================

/// Context collected around a failed resolution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionContext {
    /// Kind of the innermost scope at the failure position.
    pub scope_kind: Option<String>,
    /// Names visible in the scope chain at the position.
    pub scope_symbols: Vec<String>,
    /// Names at package scope.
    pub package_symbols: Vec<String>,
    /// Import paths of the failing file.
    pub imports: Vec<String>,
    /// Enclosing function name, when inside one.
    pub function: Option<String>,
    /// Sorted, deduplicated suggestions.
    pub suggestions: Vec<String>,
}

/// A resolution failure enriched with context. The wrapped error keeps its
/// original kind.
#[derive(Debug)]
pub struct Diagnostic {
    pub error: GadflyError,
    pub context: ResolutionContext,
}

impl Diagnostic {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if !self.context.suggestions.is_empty() {
            write!(f, " (suggestions: {})", self.context.suggestions.join("; "))?;
        }
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct DiagnosticEngine {
    ws: Arc<Workspace>,
    scopes: ScopeAnalyzer,
}

impl DiagnosticEngine {
    pub fn new(ws: Arc<Workspace>) -> Self {
        let scopes = ScopeAnalyzer::new(ws.clone());
        DiagnosticEngine { ws, scopes }
    }

    /// Wrap a resolution failure with scope context and suggestions for the
    /// identifier `name` at `pos` in `file`.
    pub fn enrich(
        &self,
        error: GadflyError,
        file: &Path,
        pos: Pos,
        name: &str,
    ) -> Diagnostic {
        let mut context = self.context_at(file, pos);
        context.suggestions = self.suggest(name, &error, &context);
        Diagnostic { error, context }
    }

    fn context_at(&self, path: &Path, pos: Pos) -> ResolutionContext {
        let Some(file) = self.ws.file(path) else {
            return ResolutionContext::default();
        };
        let tree = self.scopes.tree_for(&file);
        let scope_id = tree.scope_at(pos);

        let mut scope_symbols = BTreeSet::new();
        let mut package_symbols = BTreeSet::new();
        for id in tree.chain(scope_id) {
            let scope = tree.scope(id);
            for name in scope.symbols.keys() {
                scope_symbols.insert(name.clone());
                if scope.kind == ScopeKind::Package {
                    package_symbols.insert(name.clone());
                }
            }
        }

        let function =
            enclosing_function(&file, file.local(pos)).map(|f| f.name.name.clone());

        ResolutionContext {
            scope_kind: Some(tree.scope(scope_id).kind.as_str().to_string()),
            scope_symbols: scope_symbols.into_iter().collect(),
            package_symbols: package_symbols.into_iter().collect(),
            imports: file.ast.imports.iter().map(|i| i.path.clone()).collect(),
            function,
            suggestions: Vec::new(),
        }
    }

    fn suggest(
        &self,
        name: &str,
        error: &GadflyError,
        context: &ResolutionContext,
    ) -> Vec<String> {
        let mut suggestions = BTreeSet::new();

        // Visibility failures: propose the exported spelling.
        if error.kind() == ErrorKind::VisibilityViolation {
            suggestions.insert(format!("rename to '{}'", capitalize(name)));
        }

        // Dotted name: the left component is probably a missing import.
        if let Some((alias, _)) = name.split_once('.') {
            if !context.imports.iter().any(|i| i.ends_with(alias)) {
                for candidate in self.import_candidates(alias) {
                    suggestions.insert(format!("import \"{}\"", candidate));
                }
            }
        }

        // Close names from the scope chain, package scope, and universe.
        let target = name.rsplit('.').next().unwrap_or(name);
        let candidates = context
            .scope_symbols
            .iter()
            .chain(context.package_symbols.iter())
            .map(String::as_str)
            .chain(UNIVERSE.iter().map(|b| b.name));
        for candidate in candidates {
            if candidate != target
                && levenshtein_ci(target, candidate) <= MAX_SUGGESTION_DISTANCE
            {
                suggestions.insert(format!("did you mean '{}'?", candidate));
            }
        }

        suggestions.into_iter().collect()
    }

    /// Import-path candidates close to a dotted name's left component:
    /// workspace packages plus the standard-library seed list.
    fn import_candidates(&self, alias: &str) -> Vec<String> {
        let mut out = Vec::new();
        for path in self.ws.packages.keys() {
            let last = path.rsplit('/').next().unwrap_or(path);
            if levenshtein_ci(alias, last) <= MAX_SUGGESTION_DISTANCE {
                out.push(path.clone());
            }
        }
        for path in STD_PACKAGES {
            let last = path.rsplit('/').next().unwrap_or(path);
            if levenshtein_ci(alias, last) <= MAX_SUGGESTION_DISTANCE {
                out.push(path.to_string());
            }
        }
        out
    }
}

// ============================================================================
// Edit distance
// ============================================================================

/// Case-insensitive Levenshtein distance.
pub fn levenshtein_ci(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().flat_map(char::to_lowercase).collect();
    let b: Vec<char> = b.chars().flat_map(char::to_lowercase).collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn capitalize(name: &str) -> String {
    let bare = name.rsplit('.').next().unwrap_or(name);
    let mut chars = bare.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn engine(sources: &[(&str, &str)]) -> (Arc<Workspace>, DiagnosticEngine) {
        let ws = Workspace::from_sources("m", sources).unwrap();
        let engine = DiagnosticEngine::new(ws.clone());
        (ws, engine)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein_ci("abc", "abc"), 0);
        assert_eq!(levenshtein_ci("abc", "ABC"), 0);
        assert_eq!(levenshtein_ci("server", "serve"), 1);
        assert_eq!(levenshtein_ci("kitten", "sitting"), 3);
        assert_eq!(levenshtein_ci("", "ab"), 2);
    }

    #[test]
    fn close_names_are_suggested() {
        let (ws, engine) = engine(&[(
            "p/p.go",
            "package p\n\nfunc Handler() {}\n\nfunc f() {\n\thandlr()\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(file.content.find("handlr").unwrap() as u32);
        let err = GadflyError::symbol_not_found("handlr", "p/p.go", 5, 2);
        let diag = engine.enrich(err, &PathBuf::from("p/p.go"), pos, "handlr");

        assert_eq!(diag.kind(), ErrorKind::SymbolNotFound);
        assert!(diag
            .context
            .suggestions
            .iter()
            .any(|s| s.contains("Handler")));
        assert_eq!(diag.context.function.as_deref(), Some("f"));
        assert!(diag.context.package_symbols.contains(&"Handler".to_string()));
    }

    #[test]
    fn dotted_name_suggests_import() {
        let (ws, engine) = engine(&[(
            "p/p.go",
            "package p\n\nfunc f() {\n\tfmt.Println(1)\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(file.content.find("fmt").unwrap() as u32);
        let err = GadflyError::symbol_not_found("fmt.Println", "p/p.go", 4, 2);
        let diag = engine.enrich(err, &PathBuf::from("p/p.go"), pos, "fmt.Println");
        assert!(diag
            .context
            .suggestions
            .iter()
            .any(|s| s == "import \"fmt\""));
    }

    #[test]
    fn visibility_failure_proposes_capitalized_rename() {
        let (ws, engine) = engine(&[(
            "p/p.go",
            "package p\n\nfunc hidden() {}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(15);
        let err = GadflyError::visibility("hidden", "q/q.go", 3, 1);
        let diag = engine.enrich(err, &PathBuf::from("p/p.go"), pos, "hidden");
        assert!(diag
            .context
            .suggestions
            .iter()
            .any(|s| s.contains("rename to 'Hidden'")));
    }

    #[test]
    fn suggestions_sorted_and_deduplicated() {
        let (ws, engine) = engine(&[(
            "p/p.go",
            "package p\n\nvar count int\nvar Count2 int\n\nfunc f() {\n\tcont()\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(file.content.find("cont()").unwrap() as u32);
        let err = GadflyError::symbol_not_found("cont", "p/p.go", 7, 2);
        let diag = engine.enrich(err, &PathBuf::from("p/p.go"), pos, "cont");
        let suggestions = &diag.context.suggestions;
        let mut sorted = suggestions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(*suggestions, sorted);
        assert!(suggestions.iter().any(|s| s.contains("count")));
    }

    #[test]
    fn context_reports_scope_kind() {
        let (ws, engine) = engine(&[(
            "p/p.go",
            "package p\n\nfunc f() {\n\tx := 1\n\t_ = x\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(file.content.find("_ = x").unwrap() as u32);
        let err = GadflyError::symbol_not_found("y", "p/p.go", 5, 2);
        let diag = engine.enrich(err, &PathBuf::from("p/p.go"), pos, "y");
        assert_eq!(diag.context.scope_kind.as_deref(), Some("block"));
        assert!(diag.context.scope_symbols.contains(&"x".to_string()));
    }
}
