//! Symbol resolution and reference queries.
//!
//! The resolver is the orchestrator over the extracted model: it serves
//! name lookups (with `Type.Method` disambiguation), indexed reference
//! queries (object fast path, then name-path fallback), method-set
//! resolution with embedded-field promotion, and interface compliance.
//!
//! Reference queries prefer the object index: when the target resolves to a
//! canonical object and the index carries object entries, results are exact.
//! Otherwise the name index is filtered with the untyped acceptance rules,
//! which deliberately over-report (a superset) rather than miss references.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use gadfly_core::error::{GadflyError, GadflyResult};
use gadfly_core::text::line_at_offset;
use gadfly_go_cst::ast::{AssignStmt, Block, Decl, Expr, FuncDecl, Spec, Stmt};
use gadfly_go_cst::pos::Pos;

use crate::cache::SymbolCache;
use crate::index::{MethodCallInfo, NameEntry, ReferenceIndex};
use crate::scope::ScopeAnalyzer;
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::typeinfo::TypeObject;
use crate::workspace::{File, Workspace};

// ============================================================================
// Reference
// ============================================================================

/// A resolved reference to a symbol, with a one-line source snippet.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    pub file: PathBuf,
    pub pos: Pos,
    pub line: u32,
    pub col: u32,
    /// Text of the containing line, without the trailing newline.
    pub text: String,
}

// ============================================================================
// Resolver
// ============================================================================

pub struct SymbolResolver {
    ws: Arc<Workspace>,
    cache: Arc<SymbolCache>,
    scopes: ScopeAnalyzer,
}

impl SymbolResolver {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self::with_cache(ws, Arc::new(SymbolCache::new()))
    }

    pub fn with_cache(ws: Arc<Workspace>, cache: Arc<SymbolCache>) -> Self {
        let scopes = ScopeAnalyzer::new(ws.clone());
        SymbolResolver { ws, cache, scopes }
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.ws
    }

    pub fn cache(&self) -> &Arc<SymbolCache> {
        &self.cache
    }

    pub fn scopes(&self) -> &ScopeAnalyzer {
        &self.scopes
    }

    /// Invalidate cached data for a package (and its files' scope trees).
    pub fn invalidate_package(&self, package: &str) {
        self.cache.invalidate_package(package);
        if let Some(pkg) = self.ws.package(package) {
            for file in pkg.all_files() {
                self.scopes.invalidate_file(&file.path);
                self.cache.invalidate_file(&file.path);
            }
        }
    }

    fn table(&self, package: &str) -> GadflyResult<Arc<SymbolTable>> {
        if let Some(table) = self.cache.get_symbol_table(package) {
            return Ok(table);
        }
        let pkg = self.ws.package(package).ok_or_else(|| {
            GadflyError::symbol_not_found(package, package, 0, 0)
        })?;
        let table = pkg.symbols().cloned().ok_or_else(|| {
            GadflyError::invalid_operation(format!(
                "package '{}' has no symbol table",
                package
            ))
        })?;
        self.cache.put_symbol_table(package, table.clone());
        Ok(table)
    }

    // ------------------------------------------------------------------
    // ResolveSymbol
    // ------------------------------------------------------------------

    /// Resolve a name within a package.
    ///
    /// A dotted `Type.Method` form disambiguates methods; a bare method
    /// name that exists on several receiver types fails with an error
    /// listing the dotted alternatives.
    pub fn resolve_symbol(&self, package: &str, name: &str) -> GadflyResult<Arc<Symbol>> {
        let table = self.table(package)?;

        if let Some((type_name, method_name)) = name.split_once('.') {
            return table
                .methods_of(type_name)
                .iter()
                .find(|m| m.name == method_name)
                .cloned()
                .ok_or_else(|| GadflyError::symbol_not_found(name, package, 0, 0));
        }

        if let Some(sym) = table.lookup(name) {
            return Ok(sym.clone());
        }

        let mut candidates: Vec<(String, Arc<Symbol>)> = Vec::new();
        for (receiver, methods) in &table.methods {
            for method in methods {
                if method.name == name {
                    candidates.push((receiver.clone(), method.clone()));
                }
            }
        }
        match candidates.len() {
            0 => Err(GadflyError::symbol_not_found(name, package, 0, 0)),
            1 => Ok(candidates.remove(0).1),
            _ => {
                let mut alternatives: Vec<String> = candidates
                    .iter()
                    .map(|(receiver, _)| format!("{}.{}", receiver, name))
                    .collect();
                alternatives.sort();
                Err(GadflyError::invalid_operation(format!(
                    "ambiguous method '{}': use one of {}",
                    name,
                    alternatives.join(", ")
                )))
            }
        }
    }

    // ------------------------------------------------------------------
    // Reference queries
    // ------------------------------------------------------------------

    /// All non-declaring references to `sym`, via the object index when the
    /// symbol has a canonical object, otherwise via name-path fallback.
    ///
    /// `allowed` restricts results to files in the listed packages.
    pub fn find_references_indexed(
        &self,
        sym: &Arc<Symbol>,
        index: &ReferenceIndex,
        allowed: Option<&[String]>,
    ) -> Vec<Reference> {
        let key = self.refs_cache_key(sym, allowed);
        if let Some(refs) = self.cache.get_references(&key) {
            return refs;
        }
        let refs = self.collect_references(sym, index, allowed, false);
        debug!(
            symbol = %sym.qualified_name(),
            count = refs.len(),
            "reference query"
        );
        self.cache.put_references(&key, refs.clone());
        refs
    }

    /// Short-circuiting variant: does any non-declaring reference exist?
    pub fn has_non_declaration_reference(
        &self,
        sym: &Arc<Symbol>,
        index: &ReferenceIndex,
    ) -> bool {
        !self.collect_references(sym, index, None, true).is_empty()
    }

    fn collect_references(
        &self,
        sym: &Arc<Symbol>,
        index: &ReferenceIndex,
        allowed: Option<&[String]>,
        first_only: bool,
    ) -> Vec<Reference> {
        let canonical = self.canonical_object(sym);
        let mut refs = Vec::new();

        // Object fast path: exact answers, zero false positives.
        if let Some(object) = &canonical {
            if index.has_objects() {
                for entry in index.object_entries(object) {
                    if entry.is_declaration || entry.pos == sym.span.start {
                        continue;
                    }
                    if !self.file_allowed(&entry.file, allowed) {
                        continue;
                    }
                    refs.push(self.make_reference(&entry.file, entry.pos));
                    if first_only {
                        return refs;
                    }
                }
                return refs;
            }
        }

        // Name-path fallback.
        for entry in index.name_entries(&sym.name) {
            if entry.pos == sym.span.start || entry.is_declaration {
                continue;
            }
            if !self.file_allowed(&entry.file, allowed) {
                continue;
            }
            if !self.entry_refers_to(entry, sym, &canonical) {
                continue;
            }
            refs.push(self.make_reference(&entry.file, entry.pos));
            if first_only {
                return refs;
            }
        }
        refs
    }

    /// Resolve the symbol to its canonical object by searching the owning
    /// package's Defs for an identifier at the symbol's position.
    fn canonical_object(&self, sym: &Symbol) -> Option<Arc<TypeObject>> {
        self.ws
            .package(&sym.package)?
            .type_info()?
            .defs
            .get(&sym.span.start)
            .cloned()
    }

    fn file_allowed(&self, file: &Path, allowed: Option<&[String]>) -> bool {
        match allowed {
            None => true,
            Some(list) => self
                .ws
                .import_path_of(file)
                .map(|p| list.iter().any(|a| a == p))
                .unwrap_or(false),
        }
    }

    /// Untyped acceptance rules for a name-index entry.
    fn entry_refers_to(
        &self,
        entry: &NameEntry,
        sym: &Arc<Symbol>,
        canonical: &Option<Arc<TypeObject>>,
    ) -> bool {
        // Both sides canonical: pointer identity decides.
        if let (Some(entry_obj), Some(sym_obj)) = (&entry.object, canonical) {
            return Arc::ptr_eq(entry_obj, sym_obj);
        }

        // Method-call selectors against method targets: receiver type must
        // admit the method; an unresolvable receiver is accepted so the
        // untyped path stays a superset.
        if let Some(mc) = &entry.method_call {
            if sym.kind == SymbolKind::Method {
                let entry_pkg = self
                    .ws
                    .import_path_of(&entry.file)
                    .unwrap_or_default()
                    .to_string();
                return match self.receiver_type(&entry.file, mc) {
                    Some(type_name) => {
                        self.method_belongs_to_type(sym, &type_name, &entry_pkg)
                    }
                    None => true,
                };
            }
        }

        // Plain selectors: the alias must import the target's package.
        if let Some(alias) = &entry.selector {
            return self
                .ws
                .file(&entry.file)
                .and_then(|f| {
                    f.ast
                        .import_named(alias)
                        .map(|import| import.path == sym.package)
                })
                .unwrap_or(false);
        }

        // Bare identifiers: same package as the target.
        self.ws
            .import_path_of(&entry.file)
            .map(|p| p == sym.package)
            .unwrap_or(false)
    }

    fn make_reference(&self, file: &Path, pos: Pos) -> Reference {
        let (line, col) = self
            .ws
            .position(pos)
            .map(|p| (p.line, p.col))
            .unwrap_or((0, 0));
        let text = self
            .ws
            .file(file)
            .map(|f| line_at_offset(&f.content, f.local(pos) as usize).to_string())
            .unwrap_or_default();
        Reference {
            file: file.to_path_buf(),
            pos,
            line,
            col,
            text,
        }
    }

    fn refs_cache_key(&self, sym: &Symbol, allowed: Option<&[String]>) -> String {
        format!(
            "{}:{}:{}:{}",
            sym.file.display(),
            sym.span.start.0,
            sym.package,
            allowed.map(|a| a.join(",")).unwrap_or_default()
        )
    }

    // ------------------------------------------------------------------
    // Receiver type heuristic (untyped path)
    // ------------------------------------------------------------------

    /// Resolve a method-call receiver to a type name from local declaration
    /// patterns: `x := T{...}`, `x := &T{...}`, `var x T`, `x := NewT(...)`,
    /// parameter and receiver declarations.
    fn receiver_type(&self, file_path: &Path, mc: &MethodCallInfo) -> Option<String> {
        let key = format!("{}:{}", file_path.display(), mc.receiver_pos.0);
        if let Some(cached) = self.cache.get_ident_type(&key) {
            return (!cached.is_empty()).then_some(cached);
        }
        let file = self.ws.file(file_path)?;
        let resolved = infer_receiver_type(&file, mc);
        self.cache
            .put_ident_type(&key, resolved.clone().unwrap_or_default());
        resolved
    }

    // ------------------------------------------------------------------
    // Method sets and interfaces
    // ------------------------------------------------------------------

    /// Does `method` belong to the method set of `type_name` in `package`?
    ///
    /// Direct match: the method's parent is that type (pointer markers
    /// stripped). Interface parent: the candidate type's resolved method
    /// set must contain a method of the same name.
    pub fn method_belongs_to_type(
        &self,
        method: &Arc<Symbol>,
        type_name: &str,
        package: &str,
    ) -> bool {
        let bare = type_name.trim_start_matches('*');
        let key = format!(
            "{}.{}|{}.{}",
            method.package,
            method.qualified_name(),
            package,
            bare
        );
        if let Some(decision) = self.cache.get_method_type(&key) {
            return decision;
        }

        let decision = match &method.parent {
            Some(parent) if parent.kind == SymbolKind::Interface => self
                .ws
                .package(package)
                .and_then(|p| p.symbols())
                .and_then(|t| t.types.get(bare).cloned())
                .map(|ty| {
                    self.resolve_method_set(&ty)
                        .map(|set| set.iter().any(|m| m.name == method.name))
                        .unwrap_or(false)
                })
                .unwrap_or(false),
            Some(parent) => parent.name == bare && parent.package == package,
            None => false,
        };
        self.cache.put_method_type(&key, decision);
        decision
    }

    /// The method set of a type: direct methods plus methods promoted from
    /// embedded fields (exported, or same-package). Idempotent and cached.
    pub fn resolve_method_set(&self, ty: &Arc<Symbol>) -> GadflyResult<Vec<Arc<Symbol>>> {
        if !matches!(ty.kind, SymbolKind::Type | SymbolKind::Interface) {
            return Err(GadflyError::invalid_operation(format!(
                "method set requested on non-type '{}'",
                ty.name
            )));
        }
        let key = format!("methodset:{}:{}", ty.package, ty.name);
        if let Some(set) = self.cache.get_method_set(&key) {
            return Ok(set);
        }
        let mut visited = HashSet::new();
        let set = self.method_set_inner(ty, &mut visited)?;
        self.cache.put_method_set(&key, set.clone());
        Ok(set)
    }

    fn method_set_inner(
        &self,
        ty: &Arc<Symbol>,
        visited: &mut HashSet<Pos>,
    ) -> GadflyResult<Vec<Arc<Symbol>>> {
        if !visited.insert(ty.span.start) {
            return Ok(Vec::new());
        }
        let table = self.table(&ty.package)?;
        let mut set: Vec<Arc<Symbol>> = table.methods_of(&ty.name).to_vec();

        for embedded in self.embedded_types(ty) {
            for method in self.method_set_inner(&embedded, visited)? {
                if set.iter().any(|m| m.name == method.name) {
                    continue;
                }
                if method.exported || embedded.package == ty.package {
                    set.push(method);
                }
            }
        }
        Ok(set)
    }

    /// Embedded types of a struct (anonymous fields) or interface
    /// (embedded interfaces), resolved to symbols through the declaring
    /// file's imports when qualified.
    fn embedded_types(&self, ty: &Arc<Symbol>) -> Vec<Arc<Symbol>> {
        let Some(file) = self.ws.file(&ty.file) else {
            return Vec::new();
        };
        let local = file.local(ty.span.start);
        let mut out = Vec::new();
        for decl in &file.ast.decls {
            let Decl::Gen(gen) = decl else { continue };
            for spec in &gen.specs {
                let Spec::Type(ts) = spec else { continue };
                if ts.name.span.start != local {
                    continue;
                }
                match &ts.ty {
                    Expr::Struct(st) => {
                        for field in st.embedded_fields() {
                            if let Some(sym) = self.resolve_type_expr(&file, &field.ty) {
                                out.push(sym);
                            }
                        }
                    }
                    Expr::Interface(it) => {
                        for elem in &it.elems {
                            if let gadfly_go_cst::ast::InterfaceElem::Embedded(e) = elem {
                                if let Some(sym) = self.resolve_type_expr(&file, e) {
                                    out.push(sym);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        out
    }

    fn resolve_type_expr(&self, file: &Arc<File>, expr: &Expr) -> Option<Arc<Symbol>> {
        let mut base = expr.unwrap_pointer();
        if let Expr::Index { x, .. } = base {
            base = x.unwrap_pointer();
        }
        match base {
            Expr::Ident(id) => file
                .package()?
                .symbols()?
                .types
                .get(&id.name)
                .cloned(),
            Expr::Selector { x, sel, .. } => {
                let alias = x.as_ident()?;
                let import = file.ast.import_named(&alias.name)?;
                self.ws
                    .package(&import.path)?
                    .symbols()?
                    .types
                    .get(&sel.name)
                    .cloned()
            }
            _ => None,
        }
    }

    /// All workspace types whose method set name-matches every method of
    /// the interface. Signatures are not compared (known over-approximation).
    pub fn find_interface_implementations(
        &self,
        iface: &Arc<Symbol>,
    ) -> GadflyResult<Vec<Arc<Symbol>>> {
        if iface.kind != SymbolKind::Interface {
            return Err(GadflyError::invalid_operation(format!(
                "'{}' is not an interface",
                iface.name
            )));
        }
        let required: Vec<String> = self
            .table(&iface.package)?
            .methods_of(&iface.name)
            .iter()
            .map(|m| m.name.clone())
            .collect();

        let mut out = Vec::new();
        for pkg in self.ws.packages.values() {
            let Some(table) = pkg.symbols() else { continue };
            let mut types: Vec<&Arc<Symbol>> = table
                .types
                .values()
                .filter(|t| t.kind == SymbolKind::Type)
                .collect();
            types.sort_by(|a, b| a.name.cmp(&b.name));
            for ty in types {
                let set = self.resolve_method_set(ty)?;
                let have: HashSet<&str> = set.iter().map(|m| m.name.as_str()).collect();
                if required.iter().all(|r| have.contains(r.as_str())) {
                    out.push(ty.clone());
                }
            }
        }
        Ok(out)
    }

    /// Whether `ty` satisfies `iface` by method names, with the list of
    /// missing method names.
    pub fn check_interface_compliance(
        &self,
        ty: &Arc<Symbol>,
        iface: &Arc<Symbol>,
    ) -> GadflyResult<(bool, Vec<String>)> {
        if iface.kind != SymbolKind::Interface {
            return Err(GadflyError::invalid_operation(format!(
                "'{}' is not an interface",
                iface.name
            )));
        }
        let set = self.resolve_method_set(ty)?;
        let have: HashSet<&str> = set.iter().map(|m| m.name.as_str()).collect();
        let missing: Vec<String> = self
            .table(&iface.package)?
            .methods_of(&iface.name)
            .iter()
            .filter(|m| !have.contains(m.name.as_str()))
            .map(|m| m.name.clone())
            .collect();
        Ok((missing.is_empty(), missing))
    }
}

// ============================================================================
// Receiver type inference
// ============================================================================

/// Scan the function enclosing the receiver for declaration patterns that
/// reveal its type.
pub(crate) fn infer_receiver_type(file: &Arc<File>, mc: &MethodCallInfo) -> Option<String> {
    let local = file.local(mc.receiver_pos);
    let func = file
        .ast
        .funcs()
        .find(|f| f.span.contains_offset(local))?;

    // Receiver and parameter declarations.
    if let Some(recv) = &func.recv {
        if recv.names.iter().any(|n| n.name == mc.receiver) {
            return func.receiver_type_name().map(str::to_string);
        }
    }
    for field in &func.sig.params {
        if field.names.iter().any(|n| n.name == mc.receiver) {
            return bare_type_name(&field.ty);
        }
    }

    func.body
        .as_ref()
        .and_then(|body| scan_block(body, &mc.receiver))
}

fn scan_block(block: &Block, name: &str) -> Option<String> {
    for stmt in &block.stmts {
        if let Some(found) = scan_stmt(stmt, name) {
            return Some(found);
        }
    }
    None
}

fn scan_stmt(stmt: &Stmt, name: &str) -> Option<String> {
    match stmt {
        Stmt::Assign(assign) if assign.is_define() => scan_assign(assign, name),
        Stmt::Decl(decl) => {
            for spec in &decl.specs {
                if let Spec::Value(vs) = spec {
                    if vs.names.iter().any(|n| n.name == name) {
                        if let Some(ty) = &vs.ty {
                            return bare_type_name(ty);
                        }
                        if let Some(value) = vs.values.first() {
                            return infer_from_value(value);
                        }
                    }
                }
            }
            None
        }
        Stmt::Block(block) => scan_block(block, name),
        Stmt::If(ifs) => {
            let mut found = ifs
                .init
                .as_deref()
                .and_then(|init| scan_stmt(init, name))
                .or_else(|| scan_block(&ifs.then, name));
            if found.is_none() {
                found = ifs.els.as_deref().and_then(|els| scan_stmt(els, name));
            }
            found
        }
        Stmt::For(fs) => scan_block(&fs.body, name),
        Stmt::Range(rs) => scan_block(&rs.body, name),
        Stmt::Switch(sw) => sw
            .cases
            .iter()
            .find_map(|c| c.body.iter().find_map(|s| scan_stmt(s, name))),
        Stmt::TypeSwitch(ts) => ts
            .cases
            .iter()
            .find_map(|c| c.body.iter().find_map(|s| scan_stmt(s, name))),
        _ => None,
    }
}

fn scan_assign(assign: &AssignStmt, name: &str) -> Option<String> {
    for (i, lhs) in assign.lhs.iter().enumerate() {
        let Some(id) = lhs.as_ident() else { continue };
        if id.name != name {
            continue;
        }
        let value = assign.rhs.get(i).or_else(|| assign.rhs.first())?;
        return infer_from_value(value);
    }
    None
}

fn infer_from_value(value: &Expr) -> Option<String> {
    match value {
        Expr::Composite { ty: Some(ty), .. } => bare_type_name(ty),
        Expr::Unary { x, .. } => infer_from_value(x),
        Expr::Call { func, .. } => {
            let callee = match func.as_ref() {
                Expr::Ident(id) => Some(id.name.as_str()),
                Expr::Selector { sel, .. } => Some(sel.name.as_str()),
                _ => None,
            }?;
            callee
                .strip_prefix("New")
                .filter(|rest| !rest.is_empty())
                .map(str::to_string)
        }
        _ => None,
    }
}

fn bare_type_name(ty: &Expr) -> Option<String> {
    let mut base = ty.unwrap_pointer();
    if let Expr::Index { x, .. } = base {
        base = x.unwrap_pointer();
    }
    match base {
        Expr::Ident(id) => Some(id.name.clone()),
        Expr::Selector { sel, .. } => Some(sel.name.clone()),
        _ => None,
    }
}

/// Convenience used by analyzers: the function declaration enclosing a
/// file-local offset, if any.
pub fn enclosing_function<'a>(file: &'a File, offset: u32) -> Option<&'a FuncDecl> {
    file.ast.funcs().find(|f| f.span.contains_offset(offset))
}

// ============================================================================
// Tests
// ============================================================================
