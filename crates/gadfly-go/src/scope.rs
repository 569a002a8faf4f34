//! Lexical scope analysis.
//!
//! For each file the analyzer builds a tree rooted at a Package scope whose
//! direct child is a File scope holding the import bindings. Function
//! declarations open Function scopes (receiver, parameters, named results);
//! blocks, if/for/range/switch/type-switch statements open Block scopes with
//! their specialized bindings (range key/value, type-switch guard, short
//! declarations).
//!
//! Resolution walks the chain outward from the innermost scope containing a
//! position, then tries qualified (`alias.Name`) resolution through the
//! file's imports, then the universe table of built-ins.
//!
//! Trees are cached per file; invalidation is by file path. Type-parameter
//! scopes are not modelled.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use gadfly_core::error::{GadflyError, GadflyResult};
use gadfly_go_cst::ast::{
    Block, Decl, DeclKeyword, Expr, FuncDecl, Ident, Spec, Stmt,
};
use gadfly_go_cst::pos::{Pos, PosSpan};

use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::workspace::{File, Workspace};

// ============================================================================
// Scope Tree
// ============================================================================

/// The kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// The implicit outermost scope of built-ins (never materialized as a
    /// `Scope`; resolution falls back to the universe table instead).
    Universe,
    Package,
    File,
    Function,
    Block,
    /// Type-parameter scope. Reserved; the current analyzer does not open
    /// these (generics limitation).
    Type,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Universe => "universe",
            ScopeKind::Package => "package",
            ScopeKind::File => "file",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
            ScopeKind::Type => "type",
        }
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Index of a scope within its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// One scope: kind, position span, bindings, and tree links.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Symbols introduced in this scope, by name.
    pub symbols: HashMap<String, Arc<Symbol>>,
    pub span: PosSpan,
}

/// The per-file scope tree. Scope 0 is the Package scope root.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// The innermost scope whose span contains `pos`.
    pub fn scope_at(&self, pos: Pos) -> ScopeId {
        let mut current = self.root();
        'descend: loop {
            for &child in &self.scope(current).children {
                if self.scope(child).span.contains(pos) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Resolve a name by walking the scope chain outward from `from`.
    pub fn resolve(&self, from: ScopeId, name: &str) -> Option<Arc<Symbol>> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(sym) = scope.symbols.get(name) {
                return Some(sym.clone());
            }
            current = scope.parent;
        }
        None
    }

    /// Scope ids from `from` outward to the root.
    pub fn chain(&self, from: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            out.push(id);
            current = self.scope(id).parent;
        }
        out
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>, span: PosSpan) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            children: Vec::new(),
            symbols: HashMap::new(),
            span,
        });
        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }
        id
    }

    fn bind(&mut self, id: ScopeId, sym: Arc<Symbol>) {
        self.scopes[id.0 as usize]
            .symbols
            .insert(sym.name.clone(), sym);
    }
}

// ============================================================================
// Universe
// ============================================================================

/// Kinds of universe-scope built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Type,
    Func,
    Const,
}

/// A universe-scope built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
}

/// The hard-coded universe table of built-in types, functions, and constants.
pub const UNIVERSE: &[Builtin] = &[
    Builtin { name: "any", kind: BuiltinKind::Type },
    Builtin { name: "bool", kind: BuiltinKind::Type },
    Builtin { name: "byte", kind: BuiltinKind::Type },
    Builtin { name: "comparable", kind: BuiltinKind::Type },
    Builtin { name: "complex64", kind: BuiltinKind::Type },
    Builtin { name: "complex128", kind: BuiltinKind::Type },
    Builtin { name: "error", kind: BuiltinKind::Type },
    Builtin { name: "float32", kind: BuiltinKind::Type },
    Builtin { name: "float64", kind: BuiltinKind::Type },
    Builtin { name: "int", kind: BuiltinKind::Type },
    Builtin { name: "int8", kind: BuiltinKind::Type },
    Builtin { name: "int16", kind: BuiltinKind::Type },
    Builtin { name: "int32", kind: BuiltinKind::Type },
    Builtin { name: "int64", kind: BuiltinKind::Type },
    Builtin { name: "rune", kind: BuiltinKind::Type },
    Builtin { name: "string", kind: BuiltinKind::Type },
    Builtin { name: "uint", kind: BuiltinKind::Type },
    Builtin { name: "uint8", kind: BuiltinKind::Type },
    Builtin { name: "uint16", kind: BuiltinKind::Type },
    Builtin { name: "uint32", kind: BuiltinKind::Type },
    Builtin { name: "uint64", kind: BuiltinKind::Type },
    Builtin { name: "uintptr", kind: BuiltinKind::Type },
    Builtin { name: "append", kind: BuiltinKind::Func },
    Builtin { name: "cap", kind: BuiltinKind::Func },
    Builtin { name: "clear", kind: BuiltinKind::Func },
    Builtin { name: "close", kind: BuiltinKind::Func },
    Builtin { name: "complex", kind: BuiltinKind::Func },
    Builtin { name: "copy", kind: BuiltinKind::Func },
    Builtin { name: "delete", kind: BuiltinKind::Func },
    Builtin { name: "imag", kind: BuiltinKind::Func },
    Builtin { name: "len", kind: BuiltinKind::Func },
    Builtin { name: "make", kind: BuiltinKind::Func },
    Builtin { name: "max", kind: BuiltinKind::Func },
    Builtin { name: "min", kind: BuiltinKind::Func },
    Builtin { name: "new", kind: BuiltinKind::Func },
    Builtin { name: "panic", kind: BuiltinKind::Func },
    Builtin { name: "print", kind: BuiltinKind::Func },
    Builtin { name: "println", kind: BuiltinKind::Func },
    Builtin { name: "real", kind: BuiltinKind::Func },
    Builtin { name: "recover", kind: BuiltinKind::Func },
    Builtin { name: "true", kind: BuiltinKind::Const },
    Builtin { name: "false", kind: BuiltinKind::Const },
    Builtin { name: "iota", kind: BuiltinKind::Const },
    Builtin { name: "nil", kind: BuiltinKind::Const },
];

/// Look up a name in the universe table.
pub fn lookup_universe(name: &str) -> Option<Builtin> {
    UNIVERSE.iter().find(|b| b.name == name).copied()
}

// ============================================================================
// Builder
// ============================================================================

/// Build the scope tree for one file against its package's symbol table.
pub fn build_scopes(file: &File, table: &SymbolTable) -> ScopeTree {
    let mut builder = Builder { file, tree: ScopeTree::default() };

    // Package scope holds all package-level symbols; the file scope sits
    // strictly inside it, starting after the package clause.
    let package = builder.tree.push(ScopeKind::Package, None, file.span());
    for sym in table
        .functions
        .values()
        .chain(table.types.values())
        .chain(table.variables.values())
        .chain(table.constants.values())
    {
        builder.tree.bind(package, sym.clone());
    }

    let file_span = PosSpan::new(
        file.pos(file.ast.package.span.end),
        file.span().end,
    );
    let file_scope = builder.tree.push(ScopeKind::File, Some(package), file_span);
    for import in &file.ast.imports {
        let sym = builder.local_symbol(
            import.local_name(),
            SymbolKind::Package,
            import.alias.as_ref().map(|a| a.span).unwrap_or(import.span),
        );
        builder.tree.bind(file_scope, sym);
    }

    for decl in &file.ast.decls {
        if let Decl::Func(func) = decl {
            builder.func_scope(func, file_scope);
        }
    }

    builder.tree
}

struct Builder<'a> {
    file: &'a File,
    tree: ScopeTree,
}

impl<'a> Builder<'a> {
    fn local_symbol(
        &self,
        name: &str,
        kind: SymbolKind,
        span: gadfly_core::patch::Span,
    ) -> Arc<Symbol> {
        let pkg = self
            .file
            .package()
            .map(|p| p.import_path.clone())
            .unwrap_or_default();
        Arc::new(Symbol {
            name: name.to_string(),
            kind,
            package: pkg,
            file: self.file.path.clone(),
            span: self.file.pos_span(span),
            line: 0,
            col: 0,
            exported: gadfly_go_cst::ast::is_exported(name),
            parent: None,
            signature: None,
            doc: None,
        })
    }

    fn bind_ident(&mut self, scope: ScopeId, ident: &Ident, kind: SymbolKind) {
        if ident.is_blank() {
            return;
        }
        let sym = self.local_symbol(&ident.name, kind, ident.span);
        self.tree.bind(scope, sym);
    }

    fn func_scope(&mut self, func: &FuncDecl, parent: ScopeId) {
        let Some(body) = &func.body else { return };
        let scope = self
            .tree
            .push(ScopeKind::Function, Some(parent), self.file.pos_span(func.span));
        if let Some(recv) = &func.recv {
            for name in &recv.names {
                self.bind_ident(scope, name, SymbolKind::Variable);
            }
        }
        for field in func.sig.params.iter().chain(&func.sig.results) {
            for name in &field.names {
                self.bind_ident(scope, name, SymbolKind::Variable);
            }
        }
        self.block_scope(body, scope);
    }

    fn block_scope(&mut self, block: &Block, parent: ScopeId) -> ScopeId {
        let scope = self
            .tree
            .push(ScopeKind::Block, Some(parent), self.file.pos_span(block.span));
        for stmt in &block.stmts {
            self.walk_stmt(stmt, scope);
        }
        scope
    }

    fn walk_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Assign(assign) if assign.is_define() => {
                for lhs in &assign.lhs {
                    if let Expr::Ident(id) = lhs {
                        self.bind_ident(scope, id, SymbolKind::Variable);
                    }
                }
            }
            Stmt::Decl(decl) => {
                for spec in &decl.specs {
                    match spec {
                        Spec::Value(vs) => {
                            let kind = match decl.keyword {
                                DeclKeyword::Const => SymbolKind::Constant,
                                _ => SymbolKind::Variable,
                            };
                            for name in &vs.names {
                                self.bind_ident(scope, name, kind);
                            }
                        }
                        Spec::Type(ts) => {
                            self.bind_ident(scope, &ts.name, SymbolKind::Type)
                        }
                        Spec::Import(_) => {}
                    }
                }
            }
            Stmt::Block(block) => {
                self.block_scope(block, scope);
            }
            Stmt::If(ifs) => {
                let if_scope = self.tree.push(
                    ScopeKind::Block,
                    Some(scope),
                    self.file.pos_span(ifs.span),
                );
                if let Some(init) = &ifs.init {
                    self.walk_stmt(init, if_scope);
                }
                self.block_scope(&ifs.then, if_scope);
                if let Some(els) = ifs.els.as_deref() {
                    match els {
                        Stmt::If(_) => self.walk_stmt(els, if_scope),
                        Stmt::Block(block) => {
                            self.block_scope(block, if_scope);
                        }
                        _ => {}
                    }
                }
            }
            Stmt::For(fs) => {
                let for_scope = self.tree.push(
                    ScopeKind::Block,
                    Some(scope),
                    self.file.pos_span(fs.span),
                );
                if let Some(init) = &fs.init {
                    self.walk_stmt(init, for_scope);
                }
                self.block_scope(&fs.body, for_scope);
            }
            Stmt::Range(rs) => {
                let range_scope = self.tree.push(
                    ScopeKind::Block,
                    Some(scope),
                    self.file.pos_span(rs.span),
                );
                if rs.define {
                    for binding in [&rs.key, &rs.value].into_iter().flatten() {
                        if let Expr::Ident(id) = binding {
                            self.bind_ident(range_scope, id, SymbolKind::Variable);
                        }
                    }
                }
                self.block_scope(&rs.body, range_scope);
            }
            Stmt::Switch(sw) => {
                let sw_scope = self.tree.push(
                    ScopeKind::Block,
                    Some(scope),
                    self.file.pos_span(sw.span),
                );
                if let Some(init) = &sw.init {
                    self.walk_stmt(init, sw_scope);
                }
                for case in &sw.cases {
                    let case_scope = self.tree.push(
                        ScopeKind::Block,
                        Some(sw_scope),
                        self.file.pos_span(case.span),
                    );
                    for stmt in &case.body {
                        self.walk_stmt(stmt, case_scope);
                    }
                }
            }
            Stmt::TypeSwitch(ts) => {
                let sw_scope = self.tree.push(
                    ScopeKind::Block,
                    Some(scope),
                    self.file.pos_span(ts.span),
                );
                if let Some(init) = &ts.init {
                    self.walk_stmt(init, sw_scope);
                }
                if let Some(binding) = &ts.binding {
                    self.bind_ident(sw_scope, binding, SymbolKind::Variable);
                }
                for case in &ts.cases {
                    let case_scope = self.tree.push(
                        ScopeKind::Block,
                        Some(sw_scope),
                        self.file.pos_span(case.span),
                    );
                    for stmt in &case.body {
                        self.walk_stmt(stmt, case_scope);
                    }
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Analyzer facade with per-file cache
// ============================================================================

/// Result of resolving an identifier at a position.
#[derive(Debug, Clone)]
pub enum Resolution {
    Symbol(Arc<Symbol>),
    Builtin(Builtin),
}

/// Scope analysis with a per-file tree cache.
pub struct ScopeAnalyzer {
    ws: Arc<Workspace>,
    trees: RwLock<HashMap<PathBuf, Arc<ScopeTree>>>,
}

impl ScopeAnalyzer {
    pub fn new(ws: Arc<Workspace>) -> Self {
        ScopeAnalyzer {
            ws,
            trees: RwLock::new(HashMap::new()),
        }
    }

    /// The (cached) scope tree for a file.
    pub fn tree_for(&self, file: &Arc<File>) -> Arc<ScopeTree> {
        if let Some(tree) = self.trees.read().unwrap().get(&file.path) {
            return tree.clone();
        }
        let table = file
            .package()
            .and_then(|p| p.symbols().cloned())
            .unwrap_or_default();
        let tree = Arc::new(build_scopes(file, &table));
        self.trees
            .write()
            .unwrap()
            .insert(file.path.clone(), tree.clone());
        tree
    }

    /// Drop the cached tree for a file path.
    pub fn invalidate_file(&self, path: &Path) {
        self.trees.write().unwrap().remove(path);
    }

    /// Resolve `name` as seen from `pos` in `file`.
    ///
    /// A dotted name (`alias.Ident`) is resolved through the file's imports;
    /// a bare name walks the scope chain and then the universe table.
    pub fn resolve_at(
        &self,
        file: &Arc<File>,
        pos: Pos,
        name: &str,
    ) -> GadflyResult<Resolution> {
        if let Some((alias, member)) = name.split_once('.') {
            return self.resolve_qualified(file, pos, alias, member);
        }

        let tree = self.tree_for(file);
        if let Some(sym) = tree.resolve(tree.scope_at(pos), name) {
            return Ok(Resolution::Symbol(sym));
        }
        if let Some(builtin) = lookup_universe(name) {
            return Ok(Resolution::Builtin(builtin));
        }
        Err(self.not_found(file, pos, name))
    }

    fn resolve_qualified(
        &self,
        file: &Arc<File>,
        pos: Pos,
        alias: &str,
        member: &str,
    ) -> GadflyResult<Resolution> {
        let Some(import) = file.ast.import_named(alias) else {
            return Err(self.not_found(file, pos, &format!("{}.{}", alias, member)));
        };
        let Some(pkg) = self.ws.package(&import.path) else {
            return Err(self.not_found(file, pos, &format!("{}.{}", alias, member)));
        };
        let Some(table) = pkg.symbols() else {
            return Err(self.not_found(file, pos, member));
        };
        match table.lookup(member) {
            Some(sym) if sym.exported => Ok(Resolution::Symbol(sym.clone())),
            Some(sym) => {
                let (line, col) = self.line_col(pos);
                Err(GadflyError::visibility(
                    sym.name.clone(),
                    file.path.display().to_string(),
                    line,
                    col,
                ))
            }
            None => Err(self.not_found(file, pos, member)),
        }
    }

    fn line_col(&self, pos: Pos) -> (u32, u32) {
        self.ws
            .position(pos)
            .map(|p| (p.line, p.col))
            .unwrap_or((0, 0))
    }

    fn not_found(&self, file: &Arc<File>, pos: Pos, name: &str) -> GadflyError {
        let (line, col) = self.line_col(pos);
        GadflyError::symbol_not_found(name, file.path.display().to_string(), line, col)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn analyzer(sources: &[(&str, &str)]) -> (Arc<Workspace>, ScopeAnalyzer) {
        let ws = Workspace::from_sources("m", sources).unwrap();
        let analyzer = ScopeAnalyzer::new(ws.clone());
        (ws, analyzer)
    }

    #[test]
    fn tree_shape_package_file_function_block() {
        let (ws, analyzer) = analyzer(&[(
            "p/p.go",
            "package p\n\nfunc f(a int) {\n\tif a > 0 {\n\t\tb := a\n\t\t_ = b\n\t}\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let tree = analyzer.tree_for(&file);
        assert_eq!(tree.scope(tree.root()).kind, ScopeKind::Package);
        let file_scope = tree.scope(tree.root()).children[0];
        assert_eq!(tree.scope(file_scope).kind, ScopeKind::File);
        let func_scope = tree.scope(file_scope).children[0];
        assert_eq!(tree.scope(func_scope).kind, ScopeKind::Function);
        assert!(tree.scope(func_scope).symbols.contains_key("a"));
    }

    #[test]
    fn child_spans_contained_and_siblings_disjoint() {
        let (ws, analyzer) = analyzer(&[(
            "p/p.go",
            "package p\n\nfunc f(a int) {\n\tif a > 0 {\n\t\tuse(a)\n\t} else {\n\t\tdrop(a)\n\t}\n\tfor i := 0; i < a; i++ {\n\t\tuse(i)\n\t}\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let tree = analyzer.tree_for(&file);
        for id in 0..tree.len() as u32 {
            let scope = tree.scope(ScopeId(id));
            let children = &scope.children;
            for &child in children {
                assert!(
                    scope.span.contains_span(&tree.scope(child).span),
                    "child span must be contained in parent"
                );
            }
            for (i, &a) in children.iter().enumerate() {
                for &b in &children[i + 1..] {
                    assert!(
                        !tree.scope(a).span.overlaps(&tree.scope(b).span),
                        "sibling spans must not overlap"
                    );
                }
            }
        }
    }

    #[test]
    fn short_declaration_binds_in_enclosing_block() {
        let (ws, analyzer) = analyzer(&[(
            "p/p.go",
            "package p\n\nfunc f() {\n\tx := 1\n\t_ = x\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        // Position of the `_ = x` use of x.
        let offset = file.content.find("_ = x").unwrap() as u32 + 4;
        match analyzer.resolve_at(&file, file.pos(offset), "x").unwrap() {
            Resolution::Symbol(sym) => assert_eq!(sym.kind, SymbolKind::Variable),
            other => panic!("expected symbol, got {:?}", other),
        }
    }

    #[test]
    fn range_bindings_skip_blank() {
        let (ws, analyzer) = analyzer(&[(
            "p/p.go",
            "package p\n\nfunc f(xs []int) {\n\tfor _, v := range xs {\n\t\tuse(v)\n\t}\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let offset = file.content.find("use(v)").unwrap() as u32 + 4;
        let pos = file.pos(offset);
        assert!(matches!(
            analyzer.resolve_at(&file, pos, "v").unwrap(),
            Resolution::Symbol(_)
        ));
        assert!(analyzer.resolve_at(&file, pos, "_").is_err());
    }

    #[test]
    fn type_switch_guard_binding() {
        let (ws, analyzer) = analyzer(&[(
            "p/p.go",
            "package p\n\nfunc f(v any) {\n\tswitch g := v.(type) {\n\tcase string:\n\t\tuse(g)\n\t}\n}\n",
        )]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let offset = file.content.find("use(g)").unwrap() as u32 + 4;
        assert!(matches!(
            analyzer.resolve_at(&file, file.pos(offset), "g").unwrap(),
            Resolution::Symbol(_)
        ));
    }

    #[test]
    fn package_scope_resolves_across_files() {
        let (ws, analyzer) = analyzer(&[
            ("p/a.go", "package p\n\nfunc caller() {\n\thelper()\n}\n"),
            ("p/b.go", "package p\n\nfunc helper() {}\n"),
        ]);
        let file = ws.file(Path::new("p/a.go")).unwrap();
        let offset = file.content.find("helper()").unwrap() as u32;
        match analyzer.resolve_at(&file, file.pos(offset), "helper").unwrap() {
            Resolution::Symbol(sym) => assert_eq!(sym.file, PathBuf::from("p/b.go")),
            other => panic!("expected symbol, got {:?}", other),
        }
    }

    #[test]
    fn qualified_resolution_through_imports() {
        let (ws, analyzer) = analyzer(&[
            ("util/util.go", "package util\n\nfunc Exported() {}\nfunc hidden() {}\n"),
            (
                "app/app.go",
                "package app\n\nimport \"m/util\"\n\nfunc f() {\n\tutil.Exported()\n}\n",
            ),
        ]);
        let file = ws.file(Path::new("app/app.go")).unwrap();
        let pos = file.pos(file.content.find("util.Exported").unwrap() as u32);

        assert!(matches!(
            analyzer.resolve_at(&file, pos, "util.Exported").unwrap(),
            Resolution::Symbol(_)
        ));
        let err = analyzer.resolve_at(&file, pos, "util.hidden").unwrap_err();
        assert_eq!(err.kind(), gadfly_core::error::ErrorKind::VisibilityViolation);
    }

    #[test]
    fn universe_fallback() {
        let (ws, analyzer) = analyzer(&[("p/p.go", "package p\n\nfunc f() {}\n")]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(20);
        match analyzer.resolve_at(&file, pos, "len").unwrap() {
            Resolution::Builtin(b) => assert_eq!(b.kind, BuiltinKind::Func),
            other => panic!("expected builtin, got {:?}", other),
        }
        let err = analyzer.resolve_at(&file, pos, "nosuchthing").unwrap_err();
        assert_eq!(err.kind(), gadfly_core::error::ErrorKind::SymbolNotFound);
    }

    #[test]
    fn cache_invalidation_rebuilds_tree() {
        let (ws, analyzer) = analyzer(&[("p/p.go", "package p\n\nfunc f() {}\n")]);
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let first = analyzer.tree_for(&file);
        let again = analyzer.tree_for(&file);
        assert!(Arc::ptr_eq(&first, &again));
        analyzer.invalidate_file(Path::new("p/p.go"));
        let rebuilt = analyzer.tree_for(&file);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
    }
}
