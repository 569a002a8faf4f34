//! Symbol extraction: per-package symbol tables.
//!
//! A single AST pass per file collects functions, methods (keyed by the
//! receiver type's bare name), types, interfaces (whose declared methods are
//! mirrored into the method map under the interface's own name), variables,
//! and constants. A second pass wires each method's `parent` to its receiver
//! type symbol, so source order never matters; the table is only published
//! after the fixup.
//!
//! Conflict policy: when a name is declared in both a non-test and a test
//! file of the same package, the non-test symbol wins and the test variant
//! is dropped.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use gadfly_go_cst::ast::{self, Decl, DeclKeyword, Expr, FuncDecl, Spec};
use gadfly_go_cst::pos::{FileSet, PosSpan};

use crate::workspace::{File, Package};

// ============================================================================
// Symbol
// ============================================================================

/// Kinds of named entities in the workspace model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Interface,
    Variable,
    Constant,
    Package,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Function => "func",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Interface => "interface",
            SymbolKind::Variable => "var",
            SymbolKind::Constant => "const",
            SymbolKind::Package => "package",
        };
        write!(f, "{}", s)
    }
}

/// A named, positioned entity: the atomic unit of resolution and
/// reference tracking.
///
/// Two symbols are equal iff their positions coincide; the workspace-global
/// span start is a unique identity because every file occupies a distinct
/// range of the shared file set.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Import path of the owning package.
    pub package: String,
    /// Workspace-relative path of the declaring file.
    pub file: PathBuf,
    /// Span of the declaring name identifier.
    pub span: PosSpan,
    pub line: u32,
    pub col: u32,
    pub exported: bool,
    /// Receiver type for methods; interface symbol for mirrored interface
    /// methods; `None` otherwise (or when the receiver type is not declared
    /// in this package).
    pub parent: Option<Arc<Symbol>>,
    /// Stable display signature (names only, no types).
    pub signature: Option<String>,
    pub doc: Option<String>,
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.span.start == other.span.start
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.span.start.hash(state);
    }
}

impl Symbol {
    /// `Type.Method` for methods, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match (&self.kind, &self.parent) {
            (SymbolKind::Method, Some(parent)) => format!("{}.{}", parent.name, self.name),
            _ => self.name.clone(),
        }
    }
}

// ============================================================================
// Symbol Table
// ============================================================================

/// Per-package symbol table with separate name-keyed maps per category and
/// a receiver-name-keyed map of ordered method lists.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Import path of the owning package.
    pub package: String,
    pub functions: HashMap<String, Arc<Symbol>>,
    /// Types and interfaces, by name.
    pub types: HashMap<String, Arc<Symbol>>,
    pub variables: HashMap<String, Arc<Symbol>>,
    pub constants: HashMap<String, Arc<Symbol>>,
    /// Receiver type name (or interface name) to its methods, source order.
    pub methods: HashMap<String, Vec<Arc<Symbol>>>,
}

impl SymbolTable {
    /// Look up a non-method symbol by name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Symbol>> {
        self.functions
            .get(name)
            .or_else(|| self.types.get(name))
            .or_else(|| self.variables.get(name))
            .or_else(|| self.constants.get(name))
    }

    /// Methods declared on (or mirrored for) the named type.
    pub fn methods_of(&self, type_name: &str) -> &[Arc<Symbol>] {
        self.methods
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every symbol in the table, methods included.
    pub fn all_symbols(&self) -> impl Iterator<Item = &Arc<Symbol>> {
        self.functions
            .values()
            .chain(self.types.values())
            .chain(self.variables.values())
            .chain(self.constants.values())
            .chain(self.methods.values().flatten())
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Extract the symbol table for a package.
///
/// Non-test files are processed before test files so the conflict policy
/// falls out of insertion order.
pub fn extract_package(pkg: &Package, fset: &FileSet) -> SymbolTable {
    let mut table = SymbolTable {
        package: pkg.import_path.clone(),
        ..SymbolTable::default()
    };
    // (receiver bare name, symbol, declared in a test file)
    let mut pending_methods: Vec<(String, Symbol, bool)> = Vec::new();

    for file in pkg.all_files() {
        extract_file(pkg, file, fset, &mut table, &mut pending_methods);
    }

    // Second pass: wire Parent pointers now that every type in the package
    // has been seen, regardless of source order.
    for (recv_name, mut sym, from_test) in pending_methods {
        let existing = table.methods_of(&recv_name);
        if from_test && existing.iter().any(|m| m.name == sym.name) {
            continue;
        }
        sym.parent = table.types.get(&recv_name).cloned();
        table
            .methods
            .entry(recv_name)
            .or_default()
            .push(Arc::new(sym));
    }

    table
}

fn extract_file(
    pkg: &Package,
    file: &File,
    fset: &FileSet,
    table: &mut SymbolTable,
    pending_methods: &mut Vec<(String, Symbol, bool)>,
) {
    for decl in &file.ast.decls {
        match decl {
            Decl::Func(func) => extract_func(pkg, file, fset, func, table, pending_methods),
            Decl::Gen(gen) => {
                for spec in &gen.specs {
                    match spec {
                        Spec::Type(ts) => {
                            extract_type(pkg, file, fset, ts, gen.doc.as_deref(), table)
                        }
                        Spec::Value(vs) => {
                            let kind = match gen.keyword {
                                DeclKeyword::Const => SymbolKind::Constant,
                                _ => SymbolKind::Variable,
                            };
                            for name in &vs.names {
                                if name.is_blank() {
                                    continue;
                                }
                                let sym = make_symbol(
                                    pkg,
                                    file,
                                    fset,
                                    &name.name,
                                    name.span,
                                    kind,
                                    vs.doc.as_deref().or(gen.doc.as_deref()),
                                );
                                let map = match kind {
                                    SymbolKind::Constant => &mut table.constants,
                                    _ => &mut table.variables,
                                };
                                map.entry(name.name.clone()).or_insert_with(|| Arc::new(sym));
                            }
                        }
                        Spec::Import(_) => {}
                    }
                }
            }
        }
    }
}

fn extract_func(
    pkg: &Package,
    file: &File,
    fset: &FileSet,
    func: &FuncDecl,
    table: &mut SymbolTable,
    pending_methods: &mut Vec<(String, Symbol, bool)>,
) {
    let signature = Some(signature_string(&func.name.name, &func.sig));
    match func.receiver_type_name() {
        None => {
            let mut sym = make_symbol(
                pkg,
                file,
                fset,
                &func.name.name,
                func.name.span,
                SymbolKind::Function,
                func.doc.as_deref(),
            );
            sym.signature = signature;
            table
                .functions
                .entry(func.name.name.clone())
                .or_insert_with(|| Arc::new(sym));
        }
        Some(recv) => {
            let mut sym = make_symbol(
                pkg,
                file,
                fset,
                &func.name.name,
                func.name.span,
                SymbolKind::Method,
                func.doc.as_deref(),
            );
            sym.signature = signature;
            pending_methods.push((recv.to_string(), sym, file.is_test));
        }
    }
}

fn extract_type(
    pkg: &Package,
    file: &File,
    fset: &FileSet,
    ts: &ast::TypeSpec,
    decl_doc: Option<&str>,
    table: &mut SymbolTable,
) {
    if table.types.contains_key(&ts.name.name) {
        // Non-test declaration already seen; a test-file duplicate is
        // silently discarded.
        return;
    }
    let kind = match &ts.ty {
        Expr::Interface(_) => SymbolKind::Interface,
        _ => SymbolKind::Type,
    };
    let sym = Arc::new(make_symbol(
        pkg,
        file,
        fset,
        &ts.name.name,
        ts.name.span,
        kind,
        ts.doc.as_deref().or(decl_doc),
    ));
    table.types.insert(ts.name.name.clone(), sym.clone());

    // Mirror interface methods under the interface's own name so "methods
    // of an interface type" is the same lookup as for concrete types.
    if let Expr::Interface(iface) = &ts.ty {
        for (name, sig) in iface.methods() {
            let mut method = make_symbol(
                pkg,
                file,
                fset,
                &name.name,
                name.span,
                SymbolKind::Method,
                None,
            );
            method.parent = Some(sym.clone());
            method.signature = Some(signature_string(&name.name, sig));
            table
                .methods
                .entry(ts.name.name.clone())
                .or_default()
                .push(Arc::new(method));
        }
    }
}

fn make_symbol(
    pkg: &Package,
    file: &File,
    fset: &FileSet,
    name: &str,
    span: gadfly_core::patch::Span,
    kind: SymbolKind,
    doc: Option<&str>,
) -> Symbol {
    let global = file.pos_span(span);
    let (line, col) = fset
        .position(global.start)
        .map(|p| (p.line, p.col))
        .unwrap_or((0, 0));
    Symbol {
        name: name.to_string(),
        kind,
        package: pkg.import_path.clone(),
        file: file.path.clone(),
        span: global,
        line,
        col,
        exported: ast::is_exported(name),
        parent: None,
        signature: None,
        doc: doc.map(str::to_string),
    }
}

/// Stable signature key: name plus parenthesized, comma-joined parameter
/// names. Types are intentionally omitted.
fn signature_string(name: &str, sig: &ast::FuncType) -> String {
    let params: Vec<&str> = sig
        .params
        .iter()
        .flat_map(|f| f.names.iter().map(|n| n.name.as_str()))
        .collect();
    format!("{}({})", name, params.join(", "))
}

// ============================================================================
// Tests
// ============================================================================
