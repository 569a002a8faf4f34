//! Per-package type info: canonical objects and Defs/Uses maps.
//!
//! [`TypeInfo`] is the surface an external type checker fills: for every
//! identifier occurrence, the Defs map (defining occurrences) or the Uses
//! map (referring occurrences) associates its position with a canonical
//! [`TypeObject`]. Canonical objects are shared workspace-wide; `Arc`
//! pointer equality implies semantic identity, so identically-named symbols
//! from different packages never compare equal.
//!
//! [`bind_workspace`] is the bundled checker: a name binder that resolves
//! every identifier through the scope analyzer (and imports, for qualified
//! names) without inferring types. It covers declarations, locals, and
//! package-qualified uses; selected names of field accesses and method
//! calls get no Uses entry, which is exactly the gap the reference index's
//! method-call flags exist to cover. Packages analyzed without running the
//! binder exercise the untyped reference path.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use gadfly_core::error::GadflyResult;
use gadfly_go_cst::ast::Expr;
use gadfly_go_cst::inspect::{inspect, Node};
use gadfly_go_cst::pos::Pos;

use crate::scope::ScopeAnalyzer;
use crate::symbols::{Symbol, SymbolKind};
use crate::workspace::{Package, Workspace};

// ============================================================================
// Canonical Objects
// ============================================================================

/// Kinds of canonical objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Func,
    Type,
    Var,
    Const,
    PkgName,
}

/// The canonical representation of a named entity, shared across all of its
/// uses. Compare with `Arc::ptr_eq`; two distinct allocations are distinct
/// entities even if the fields coincide.
#[derive(Debug)]
pub struct TypeObject {
    pub name: String,
    /// Import path of the declaring package.
    pub package: String,
    pub kind: ObjectKind,
    /// Position of the defining identifier.
    pub decl: Pos,
}

/// Defs/Uses maps for one package, keyed by identifier position.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Defining occurrences: identifier position to its object.
    pub defs: HashMap<Pos, Arc<TypeObject>>,
    /// Referring occurrences: identifier position to its object.
    pub uses: HashMap<Pos, Arc<TypeObject>>,
}

impl TypeInfo {
    /// The object at an identifier position, defining or referring.
    pub fn object_at(&self, pos: Pos) -> Option<&Arc<TypeObject>> {
        self.defs.get(&pos).or_else(|| self.uses.get(&pos))
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty() && self.uses.is_empty()
    }
}

// ============================================================================
// Binder
// ============================================================================

/// Bind every package in the workspace, publishing a [`TypeInfo`] on each.
///
/// One binder instance serves the whole workspace so canonical objects are
/// shared across packages.
pub fn bind_workspace(ws: &Arc<Workspace>) -> GadflyResult<()> {
    let scopes = ScopeAnalyzer::new(ws.clone());
    let mut binder = Binder {
        objects: HashMap::new(),
    };
    for pkg in ws.packages.values() {
        let info = binder.bind_package(ws, pkg, &scopes);
        debug!(
            package = %pkg.import_path,
            defs = info.defs.len(),
            uses = info.uses.len(),
            "bound package"
        );
        pkg.set_type_info(Arc::new(info));
    }
    Ok(())
}

struct Binder {
    /// Canonical objects keyed by defining position.
    objects: HashMap<Pos, Arc<TypeObject>>,
}

impl Binder {
    fn object_for(&mut self, sym: &Arc<Symbol>) -> Arc<TypeObject> {
        self.objects
            .entry(sym.span.start)
            .or_insert_with(|| {
                Arc::new(TypeObject {
                    name: sym.name.clone(),
                    package: sym.package.clone(),
                    kind: object_kind(sym.kind),
                    decl: sym.span.start,
                })
            })
            .clone()
    }

    fn bind_package(
        &mut self,
        ws: &Arc<Workspace>,
        pkg: &Arc<Package>,
        scopes: &ScopeAnalyzer,
    ) -> TypeInfo {
        let mut info = TypeInfo::default();

        for file in pkg.all_files() {
            let tree = scopes.tree_for(file);
            inspect(&file.ast, &mut |node, parents| {
                let Node::Ident(id) = node else { return };
                if id.is_blank() {
                    return;
                }
                let pos = file.pos(id.span.start);

                // Selected name of a selector: package-qualified uses bind
                // through the import; member accesses bind only when the
                // receiver's type is locally inferable. Anything else stays
                // unbound (full member resolution needs real types).
                if let Some(selector_lhs) = selected_name_lhs(id, parents) {
                    let shadowed = matches!(
                        tree.resolve(tree.scope_at(pos), &selector_lhs.name),
                        Some(sym) if sym.kind != SymbolKind::Package
                    );
                    if shadowed {
                        if let Some(obj) = self.bind_method_use(pkg, file, id, selector_lhs)
                        {
                            info.uses.insert(pos, obj);
                        }
                        return;
                    }
                    let Some(import) = file.ast.import_named(&selector_lhs.name) else {
                        return;
                    };
                    let Some(target) = ws.package(&import.path) else {
                        return;
                    };
                    let Some(table) = target.symbols() else { return };
                    if let Some(sym) = table.lookup(&id.name) {
                        let obj = self.object_for(sym);
                        info.uses.insert(pos, obj);
                    }
                    return;
                }

                // Bare identifier: scope-chain resolution decides def vs use.
                if let Some(sym) = tree.resolve(tree.scope_at(pos), &id.name) {
                    let obj = self.object_for(&sym);
                    if sym.span.start == pos {
                        info.defs.insert(pos, obj);
                    } else {
                        info.uses.insert(pos, obj);
                    }
                }
            });
        }

        // Method and interface-method names never resolve through the scope
        // chain; make sure every table symbol has its defining entry.
        if let Some(table) = pkg.symbols() {
            for sym in table.all_symbols() {
                let obj = self.object_for(sym);
                info.defs.entry(sym.span.start).or_insert(obj);
            }
        }

        info
    }

    /// Bind `recv.Name` to a declared method when `recv`'s type can be read
    /// off a local declaration pattern in the enclosing function.
    fn bind_method_use(
        &mut self,
        pkg: &Arc<Package>,
        file: &Arc<crate::workspace::File>,
        id: &gadfly_go_cst::ast::Ident,
        recv: &gadfly_go_cst::ast::Ident,
    ) -> Option<Arc<TypeObject>> {
        let mc = crate::index::MethodCallInfo {
            receiver: recv.name.clone(),
            receiver_pos: file.pos(recv.span.start),
        };
        let type_name = crate::resolver::infer_receiver_type(file, &mc)?;
        let table = pkg.symbols()?;
        let method = table
            .methods_of(type_name.trim_start_matches('*'))
            .iter()
            .find(|m| m.name == id.name)?
            .clone();
        Some(self.object_for(&method))
    }
}

fn object_kind(kind: SymbolKind) -> ObjectKind {
    match kind {
        SymbolKind::Function | SymbolKind::Method => ObjectKind::Func,
        SymbolKind::Type | SymbolKind::Interface => ObjectKind::Type,
        SymbolKind::Variable => ObjectKind::Var,
        SymbolKind::Constant => ObjectKind::Const,
        SymbolKind::Package => ObjectKind::PkgName,
    }
}

/// When `id` is the selected name of `X.id` with `X` a bare identifier,
/// return `X`.
fn selected_name_lhs<'a>(
    id: &gadfly_go_cst::ast::Ident,
    parents: &[Node<'a>],
) -> Option<&'a gadfly_go_cst::ast::Ident> {
    let parent = parents.last().copied()?;
    let Node::Expr(Expr::Selector { x, sel, .. }) = parent else {
        return None;
    };
    if sel.span != id.span {
        return None;
    }
    x.as_ident()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn bound(sources: &[(&str, &str)]) -> Arc<Workspace> {
        let ws = Workspace::from_sources("m", sources).unwrap();
        bind_workspace(&ws).unwrap();
        ws
    }

    #[test]
    fn defs_and_uses_for_package_level_function() {
        let ws = bound(&[(
            "p/p.go",
            "package p\n\nfunc Foo() {}\n\nfunc Bar() {\n\tFoo()\n}\n",
        )]);
        let pkg = ws.package("m/p").unwrap();
        let info = pkg.type_info().unwrap();
        let file = ws.file(Path::new("p/p.go")).unwrap();

        let decl_pos = file.pos(file.content.find("Foo").unwrap() as u32);
        let use_pos = file.pos(file.content.rfind("Foo").unwrap() as u32);
        let def_obj = info.defs.get(&decl_pos).expect("def entry for Foo");
        let use_obj = info.uses.get(&use_pos).expect("use entry for Foo");
        assert!(Arc::ptr_eq(def_obj, use_obj));
        assert_eq!(def_obj.kind, ObjectKind::Func);
    }

    #[test]
    fn same_name_in_different_packages_gets_distinct_objects() {
        let ws = bound(&[
            ("a/a.go", "package a\n\nfunc Run() {}\n\nvar _ = Run\n"),
            ("b/b.go", "package b\n\nfunc Run() {}\n\nvar _ = Run\n"),
        ]);
        let a = ws.package("m/a").unwrap().type_info().unwrap();
        let b = ws.package("m/b").unwrap().type_info().unwrap();
        let obj_a = a.uses.values().find(|o| o.name == "Run").unwrap();
        let obj_b = b.uses.values().find(|o| o.name == "Run").unwrap();
        assert!(!Arc::ptr_eq(obj_a, obj_b));
        assert_eq!(obj_a.name, obj_b.name);
    }

    #[test]
    fn qualified_use_binds_to_target_package_object() {
        let ws = bound(&[
            ("util/u.go", "package util\n\nfunc Exported() {}\n"),
            (
                "app/a.go",
                "package app\n\nimport \"m/util\"\n\nfunc f() {\n\tutil.Exported()\n}\n",
            ),
        ]);
        let app = ws.package("m/app").unwrap().type_info().unwrap();
        let util = ws.package("m/util").unwrap().type_info().unwrap();

        let file = ws.file(Path::new("app/a.go")).unwrap();
        let use_pos = file.pos(file.content.find("Exported()").unwrap() as u32);
        let use_obj = app.uses.get(&use_pos).expect("qualified use entry");

        let ufile = ws.file(Path::new("util/u.go")).unwrap();
        let def_pos = ufile.pos(ufile.content.find("Exported").unwrap() as u32);
        let def_obj = util.defs.get(&def_pos).expect("def entry");
        assert!(Arc::ptr_eq(use_obj, def_obj));
    }

    #[test]
    fn locals_get_defs_at_their_declaration() {
        let ws = bound(&[(
            "p/p.go",
            "package p\n\nfunc f() int {\n\tn := 1\n\treturn n\n}\n",
        )]);
        let info = ws.package("m/p").unwrap().type_info().unwrap();
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let decl_pos = file.pos(file.content.find("n :=").unwrap() as u32);
        let use_pos = file.pos(file.content.find("return n").unwrap() as u32 + 7);
        assert!(info.defs.contains_key(&decl_pos));
        assert!(info.uses.contains_key(&use_pos));
        assert!(Arc::ptr_eq(&info.defs[&decl_pos], &info.uses[&use_pos]));
    }

    #[test]
    fn method_declarations_have_def_entries() {
        let ws = bound(&[(
            "p/p.go",
            "package p\n\ntype S struct{}\n\nfunc (s S) Work() {}\n",
        )]);
        let info = ws.package("m/p").unwrap().type_info().unwrap();
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let pos = file.pos(file.content.find("Work").unwrap() as u32);
        assert_eq!(info.defs.get(&pos).unwrap().kind, ObjectKind::Func);
    }

    #[test]
    fn inferable_method_calls_bind_to_the_method() {
        let ws = bound(&[(
            "p/p.go",
            "package p\n\ntype S struct{}\n\nfunc (s S) Work() {}\n\nfunc f(s S) {\n\ts.Work()\n}\n",
        )]);
        let info = ws.package("m/p").unwrap().type_info().unwrap();
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let call_pos = file.pos(file.content.find("s.Work()").unwrap() as u32 + 2);
        let decl_pos = file.pos(file.content.find("Work").unwrap() as u32);
        let use_obj = info.uses.get(&call_pos).expect("receiver type is a parameter");
        assert!(Arc::ptr_eq(use_obj, &info.defs[&decl_pos]));
    }

    #[test]
    fn opaque_receivers_stay_unbound() {
        let ws = bound(&[(
            "p/p.go",
            "package p\n\ntype S struct{}\n\nfunc (s S) Work() {}\n\nfunc f() {\n\tx := pick()\n\tx.Work()\n}\n",
        )]);
        let info = ws.package("m/p").unwrap().type_info().unwrap();
        let file = ws.file(Path::new("p/p.go")).unwrap();
        let call_pos = file.pos(file.content.find("x.Work()").unwrap() as u32 + 2);
        assert!(info.uses.get(&call_pos).is_none());
    }
}
