//! Workspace-wide reference index.
//!
//! One parallel pass over all files produces two maps:
//!
//! - **Name index**: identifier name to occurrences, each flagged as
//!   declaration / selector (with the left-hand alias) / method call (with
//!   the receiver), and carrying the canonical object when type info exists.
//! - **Object index**: canonical object to `(file, position, is-declaration)`
//!   entries. Populated only for packages with type info; when present it is
//!   the authoritative answer and the name index is a fallback superset.
//!
//! Files are dispatched to `min(cpu count, file count)` worker threads over
//! a bounded channel. Each worker writes only to its private maps; a serial
//! merge in file order assembles the final index, so no shared locks are
//! taken during the pass and the result is deterministic.
//!
//! Per file there is exactly one cursor traversal. The parent chain at each
//! identifier classifies it inline: defining occurrence, selected name of a
//! selector, or method-call callee - no second walk, no side maps.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use gadfly_go_cst::ast::{Decl, Expr, InterfaceElem, Spec};
use gadfly_go_cst::inspect::{inspect, Node};
use gadfly_go_cst::pos::Pos;

use crate::typeinfo::{TypeInfo, TypeObject};
use crate::workspace::{File, Workspace};

// ============================================================================
// Entries
// ============================================================================

/// Method-call context for a selected name used as a call's callee.
#[derive(Debug, Clone)]
pub struct MethodCallInfo {
    /// Receiver identifier text (`s` in `s.Handle()`).
    pub receiver: String,
    /// Position of the receiver identifier.
    pub receiver_pos: Pos,
}

/// One identifier occurrence in the name index.
#[derive(Debug, Clone)]
pub struct NameEntry {
    pub file: PathBuf,
    pub pos: Pos,
    /// True when this is the defining occurrence in a function, type,
    /// value, or interface-method declaration.
    pub is_declaration: bool,
    /// When the identifier is the selected name of `alias.Name` with a
    /// bare-identifier left side, the alias text.
    pub selector: Option<String>,
    /// Set when the selector is the callee of a call expression.
    pub method_call: Option<MethodCallInfo>,
    /// Canonical object, when type info covered this occurrence.
    pub object: Option<Arc<TypeObject>>,
}

/// One occurrence in the object index.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub file: PathBuf,
    pub pos: Pos,
    pub is_declaration: bool,
}

/// Hash/Eq wrapper giving canonical objects pointer identity as map keys.
#[derive(Debug, Clone)]
pub struct ObjectKey(pub Arc<TypeObject>);

impl PartialEq for ObjectKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectKey {}

impl Hash for ObjectKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// The assembled reference index. Callers may read, never mutate.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    names: HashMap<String, Vec<NameEntry>>,
    objects: HashMap<ObjectKey, Vec<ObjectEntry>>,
}

impl ReferenceIndex {
    /// Whether the object index has any entries (some package had type info).
    pub fn has_objects(&self) -> bool {
        !self.objects.is_empty()
    }

    /// Name-index bucket for an identifier, in traversal order.
    pub fn name_entries(&self, name: &str) -> &[NameEntry] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Object-index bucket for a canonical object.
    pub fn object_entries(&self, object: &Arc<TypeObject>) -> &[ObjectEntry] {
        self.objects
            .get(&ObjectKey(object.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of name-index entries (diagnostics).
    pub fn name_entry_count(&self) -> usize {
        self.names.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Build the reference index for a workspace.
pub fn build_index(ws: &Workspace) -> ReferenceIndex {
    let files = ws.files();
    if files.is_empty() {
        return ReferenceIndex::default();
    }

    let workers = num_cpus::get().min(files.len()).max(1);
    debug!(files = files.len(), workers, "building reference index");

    let (tx, rx) = mpsc::sync_channel::<(usize, Arc<File>)>(workers * 2);
    let rx = Arc::new(Mutex::new(rx));

    let mut per_file: Vec<Option<FileIndex>> = (0..files.len()).map(|_| None).collect();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let rx = Arc::clone(&rx);
                scope.spawn(move || {
                    let mut out: Vec<(usize, FileIndex)> = Vec::new();
                    loop {
                        let next = rx.lock().unwrap().recv();
                        match next {
                            Ok((idx, file)) => out.push((idx, index_file(&file))),
                            Err(_) => break,
                        }
                    }
                    out
                })
            })
            .collect();

        for (idx, file) in files.iter().enumerate() {
            // A send can only fail if every worker died; the join below
            // will surface that panic.
            let _ = tx.send((idx, file.clone()));
        }
        drop(tx);

        for handle in handles {
            let batch = handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            for (idx, file_index) in batch {
                per_file[idx] = Some(file_index);
            }
        }
    });

    // Serial merge, in file order: concatenate entries per key.
    let mut index = ReferenceIndex::default();
    for file_index in per_file.into_iter().flatten() {
        for (name, entry) in file_index.names {
            index.names.entry(name).or_default().push(entry);
        }
        for (key, entry) in file_index.objects {
            index.objects.entry(key).or_default().push(entry);
        }
    }
    index
}

/// Private per-file output of one worker.
struct FileIndex {
    names: Vec<(String, NameEntry)>,
    objects: Vec<(ObjectKey, ObjectEntry)>,
}

fn index_file(file: &Arc<File>) -> FileIndex {
    let facts = collect_facts(file);
    let info = file
        .package()
        .and_then(|p| p.type_info().cloned())
        .filter(|info| !info.is_empty());

    match info {
        Some(info) => typed_entries(file, &info, &facts),
        None => untyped_entries(file, &facts),
    }
}

/// Everything one cursor pass learns about a file's identifiers.
struct FileFacts {
    /// Traversal-ordered identifier occurrences (name, local offset).
    idents: Vec<(String, u32)>,
    /// Local offsets of defining occurrences.
    declarations: HashSet<u32>,
    /// Selected-name offset to left-hand alias text.
    selectors: HashMap<u32, String>,
    /// Selected-name offset to method-call receiver (name, local offset).
    method_calls: HashMap<u32, (String, u32)>,
}

fn collect_facts(file: &Arc<File>) -> FileFacts {
    let mut facts = FileFacts {
        idents: Vec::new(),
        declarations: HashSet::new(),
        selectors: HashMap::new(),
        method_calls: HashMap::new(),
    };

    inspect(&file.ast, &mut |node, parents| {
        let Node::Ident(id) = node else { return };
        if id.is_blank() {
            return;
        }
        facts.idents.push((id.name.clone(), id.span.start));

        match parents.last() {
            Some(Node::Decl(Decl::Func(fd))) if fd.name.span == id.span => {
                facts.declarations.insert(id.span.start);
            }
            Some(Node::Spec(Spec::Type(ts))) if ts.name.span == id.span => {
                facts.declarations.insert(id.span.start);
            }
            Some(Node::Spec(Spec::Value(vs)))
                if vs.names.iter().any(|n| n.span == id.span) =>
            {
                facts.declarations.insert(id.span.start);
            }
            Some(Node::IfaceElem(InterfaceElem::Method { name, .. }))
                if name.span == id.span =>
            {
                facts.declarations.insert(id.span.start);
            }
            Some(Node::Expr(Expr::Selector { x, sel, span })) if sel.span == id.span => {
                let Some(lhs) = x.as_ident() else { return };
                facts.selectors.insert(id.span.start, lhs.name.clone());

                // Method-call pattern: the selector is the callee of the
                // parent call expression.
                let grandparent = parents
                    .len()
                    .checked_sub(2)
                    .and_then(|i| parents.get(i));
                if let Some(Node::Expr(Expr::Call { func, .. })) = grandparent {
                    if func.span() == *span {
                        facts
                            .method_calls
                            .insert(id.span.start, (lhs.name.clone(), lhs.span.start));
                    }
                }
            }
            _ => {}
        }
    });

    facts
}

/// Typed path: emit entries from Defs/Uses only. Zero false positives; the
/// canonical object rides along on every entry.
fn typed_entries(file: &Arc<File>, info: &TypeInfo, facts: &FileFacts) -> FileIndex {
    let ident_names: HashMap<u32, &str> = facts
        .idents
        .iter()
        .map(|(name, off)| (*off, name.as_str()))
        .collect();

    let mut occurrences: Vec<(Pos, Arc<TypeObject>, bool)> = Vec::new();
    for (pos, obj) in &info.defs {
        if file.contains(*pos) {
            occurrences.push((*pos, obj.clone(), true));
        }
    }
    for (pos, obj) in &info.uses {
        if file.contains(*pos) {
            occurrences.push((*pos, obj.clone(), false));
        }
    }
    occurrences.sort_by_key(|(pos, _, _)| *pos);

    let mut out = FileIndex {
        names: Vec::with_capacity(occurrences.len()),
        objects: Vec::with_capacity(occurrences.len()),
    };
    for (pos, obj, is_declaration) in occurrences {
        let local = file.local(pos);
        let Some(name) = ident_names.get(&local) else {
            continue;
        };
        out.names.push((
            name.to_string(),
            NameEntry {
                file: file.path.clone(),
                pos,
                is_declaration,
                selector: facts.selectors.get(&local).cloned(),
                method_call: method_call_info(file, facts, local),
                object: Some(obj.clone()),
            },
        ));
        out.objects.push((
            ObjectKey(obj),
            ObjectEntry {
                file: file.path.clone(),
                pos,
                is_declaration,
            },
        ));
    }
    out
}

/// Untyped path: every identifier occurrence becomes an entry. Conservative
/// superset; callers tolerate over-reporting.
fn untyped_entries(file: &Arc<File>, facts: &FileFacts) -> FileIndex {
    let mut out = FileIndex {
        names: Vec::with_capacity(facts.idents.len()),
        objects: Vec::new(),
    };
    for (name, local) in &facts.idents {
        out.names.push((
            name.clone(),
            NameEntry {
                file: file.path.clone(),
                pos: file.pos(*local),
                is_declaration: facts.declarations.contains(local),
                selector: facts.selectors.get(local).cloned(),
                method_call: method_call_info(file, facts, *local),
                object: None,
            },
        ));
    }
    out
}

fn method_call_info(file: &Arc<File>, facts: &FileFacts, local: u32) -> Option<MethodCallInfo> {
    facts
        .method_calls
        .get(&local)
        .map(|(receiver, recv_off)| MethodCallInfo {
            receiver: receiver.clone(),
            receiver_pos: file.pos(*recv_off),
        })
}

// ============================================================================
// Tests
// ============================================================================
