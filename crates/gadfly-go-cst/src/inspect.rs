//! Cursor-based tree inspection with parent-chain access.
//!
//! [`inspect`] walks a parsed file depth-first and hands the callback each
//! node together with the chain of its ancestors (innermost last). Having
//! the parent chain at every node means classifications like "this
//! identifier is the selected name of a selector that is the callee of a
//! call" are a single pass, with no side maps.
//!
//! Every identifier occurrence in the tree is delivered exactly once as
//! [`Node::Ident`] - including declaration names, field names, and the
//! selected name of a selector - so an index over identifiers needs no
//! case-by-case extraction logic.

use gadfly_core::patch::Span;

use crate::ast::*;

/// A borrowed reference to any node in the syntax tree.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    File(&'a SourceFile),
    Decl(&'a Decl),
    Spec(&'a Spec),
    Field(&'a Field),
    Block(&'a Block),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Case(&'a CaseClause),
    IfaceElem(&'a InterfaceElem),
    Ident(&'a Ident),
}

impl<'a> Node<'a> {
    pub fn span(&self) -> Span {
        match self {
            Node::File(f) => f.span,
            Node::Decl(d) => d.span(),
            Node::Spec(s) => match s {
                Spec::Import(i) => i.span,
                Spec::Value(v) => v.span,
                Spec::Type(t) => t.span,
            },
            Node::Field(f) => f.span,
            Node::Block(b) => b.span,
            Node::Stmt(s) => s.span(),
            Node::Expr(e) => e.span(),
            Node::Case(c) => c.span,
            Node::IfaceElem(e) => match e {
                InterfaceElem::Method { name, sig } => Span::new(name.span.start, sig.span.end),
                InterfaceElem::Embedded(e) => e.span(),
            },
            Node::Ident(id) => id.span,
        }
    }

    pub fn as_expr(&self) -> Option<&'a Expr> {
        match self {
            Node::Expr(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&'a Ident> {
        match self {
            Node::Ident(id) => Some(id),
            _ => None,
        }
    }
}

/// Walk the file depth-first. The callback receives each node and its
/// ancestor chain, outermost first; `parents.last()` is the direct parent.
pub fn inspect<'a, F>(file: &'a SourceFile, f: &mut F)
where
    F: FnMut(Node<'a>, &[Node<'a>]),
{
    let mut stack: Vec<Node<'a>> = Vec::with_capacity(32);
    visit(Node::File(file), &mut stack, f);
}

fn visit<'a, F>(node: Node<'a>, stack: &mut Vec<Node<'a>>, f: &mut F)
where
    F: FnMut(Node<'a>, &[Node<'a>]),
{
    f(node, stack);
    stack.push(node);
    match node {
        Node::File(file) => {
            for decl in &file.decls {
                visit(Node::Decl(decl), stack, f);
            }
        }
        Node::Decl(Decl::Func(fd)) => {
            if let Some(recv) = &fd.recv {
                visit(Node::Field(recv), stack, f);
            }
            visit(Node::Ident(&fd.name), stack, f);
            visit_func_type(&fd.sig, stack, f);
            if let Some(body) = &fd.body {
                visit(Node::Block(body), stack, f);
            }
        }
        Node::Decl(Decl::Gen(g)) => {
            for spec in &g.specs {
                visit(Node::Spec(spec), stack, f);
            }
        }
        Node::Spec(Spec::Import(spec)) => {
            if let Some(alias) = &spec.alias {
                visit(Node::Ident(alias), stack, f);
            }
        }
        Node::Spec(Spec::Value(spec)) => {
            for name in &spec.names {
                visit(Node::Ident(name), stack, f);
            }
            if let Some(ty) = &spec.ty {
                visit(Node::Expr(ty), stack, f);
            }
            for value in &spec.values {
                visit(Node::Expr(value), stack, f);
            }
        }
        Node::Spec(Spec::Type(spec)) => {
            visit(Node::Ident(&spec.name), stack, f);
            for param in &spec.type_params {
                visit(Node::Field(param), stack, f);
            }
            visit(Node::Expr(&spec.ty), stack, f);
        }
        Node::Field(field) => {
            for name in &field.names {
                visit(Node::Ident(name), stack, f);
            }
            visit(Node::Expr(&field.ty), stack, f);
        }
        Node::Block(block) => {
            for stmt in &block.stmts {
                visit(Node::Stmt(stmt), stack, f);
            }
        }
        Node::Stmt(stmt) => visit_stmt_children(stmt, stack, f),
        Node::Expr(expr) => visit_expr_children(expr, stack, f),
        Node::Case(case) => {
            for expr in &case.exprs {
                visit(Node::Expr(expr), stack, f);
            }
            for stmt in &case.body {
                visit(Node::Stmt(stmt), stack, f);
            }
        }
        Node::IfaceElem(InterfaceElem::Method { name, sig }) => {
            visit(Node::Ident(name), stack, f);
            visit_func_type(sig, stack, f);
        }
        Node::IfaceElem(InterfaceElem::Embedded(e)) => {
            visit(Node::Expr(e), stack, f);
        }
        Node::Ident(_) => {}
    }
    stack.pop();
}

fn visit_func_type<'a, F>(sig: &'a FuncType, stack: &mut Vec<Node<'a>>, f: &mut F)
where
    F: FnMut(Node<'a>, &[Node<'a>]),
{
    for field in sig
        .type_params
        .iter()
        .chain(&sig.params)
        .chain(&sig.results)
    {
        visit(Node::Field(field), stack, f);
    }
}

fn visit_stmt_children<'a, F>(stmt: &'a Stmt, stack: &mut Vec<Node<'a>>, f: &mut F)
where
    F: FnMut(Node<'a>, &[Node<'a>]),
{
    match stmt {
        Stmt::Expr { expr, .. } => visit(Node::Expr(expr), stack, f),
        Stmt::Assign(assign) => {
            for lhs in &assign.lhs {
                visit(Node::Expr(lhs), stack, f);
            }
            for rhs in &assign.rhs {
                visit(Node::Expr(rhs), stack, f);
            }
        }
        Stmt::IncDec { x, .. } => visit(Node::Expr(x), stack, f),
        Stmt::Send { chan, value, .. } => {
            visit(Node::Expr(chan), stack, f);
            visit(Node::Expr(value), stack, f);
        }
        Stmt::Return { results, .. } => {
            for result in results {
                visit(Node::Expr(result), stack, f);
            }
        }
        Stmt::If(ifs) => {
            if let Some(init) = &ifs.init {
                visit(Node::Stmt(init), stack, f);
            }
            visit(Node::Expr(&ifs.cond), stack, f);
            visit(Node::Block(&ifs.then), stack, f);
            if let Some(els) = &ifs.els {
                visit(Node::Stmt(els), stack, f);
            }
        }
        Stmt::For(fs) => {
            if let Some(init) = &fs.init {
                visit(Node::Stmt(init), stack, f);
            }
            if let Some(cond) = &fs.cond {
                visit(Node::Expr(cond), stack, f);
            }
            if let Some(post) = &fs.post {
                visit(Node::Stmt(post), stack, f);
            }
            visit(Node::Block(&fs.body), stack, f);
        }
        Stmt::Range(rs) => {
            if let Some(key) = &rs.key {
                visit(Node::Expr(key), stack, f);
            }
            if let Some(value) = &rs.value {
                visit(Node::Expr(value), stack, f);
            }
            visit(Node::Expr(&rs.x), stack, f);
            visit(Node::Block(&rs.body), stack, f);
        }
        Stmt::Switch(sw) => {
            if let Some(init) = &sw.init {
                visit(Node::Stmt(init), stack, f);
            }
            if let Some(tag) = &sw.tag {
                visit(Node::Expr(tag), stack, f);
            }
            for case in &sw.cases {
                visit(Node::Case(case), stack, f);
            }
        }
        Stmt::TypeSwitch(ts) => {
            if let Some(init) = &ts.init {
                visit(Node::Stmt(init), stack, f);
            }
            if let Some(binding) = &ts.binding {
                visit(Node::Ident(binding), stack, f);
            }
            visit(Node::Expr(&ts.x), stack, f);
            for case in &ts.cases {
                visit(Node::Case(case), stack, f);
            }
        }
        Stmt::Block(block) => visit(Node::Block(block), stack, f),
        Stmt::Decl(decl) => {
            for spec in &decl.specs {
                visit(Node::Spec(spec), stack, f);
            }
        }
        Stmt::Defer { call, .. } | Stmt::Go { call, .. } => visit(Node::Expr(call), stack, f),
        Stmt::Branch { label, .. } => {
            if let Some(label) = label {
                visit(Node::Ident(label), stack, f);
            }
        }
        Stmt::Empty { .. } => {}
    }
}

fn visit_expr_children<'a, F>(expr: &'a Expr, stack: &mut Vec<Node<'a>>, f: &mut F)
where
    F: FnMut(Node<'a>, &[Node<'a>]),
{
    match expr {
        Expr::Ident(id) => visit(Node::Ident(id), stack, f),
        Expr::BasicLit { .. } => {}
        Expr::Selector { x, sel, .. } => {
            visit(Node::Expr(x), stack, f);
            visit(Node::Ident(sel), stack, f);
        }
        Expr::Call { func, args, .. } => {
            visit(Node::Expr(func), stack, f);
            for arg in args {
                visit(Node::Expr(arg), stack, f);
            }
        }
        Expr::Index { x, indices, .. } => {
            visit(Node::Expr(x), stack, f);
            for index in indices {
                visit(Node::Expr(index), stack, f);
            }
        }
        Expr::Paren { x, .. } | Expr::Unary { x, .. } | Expr::Star { x, .. } => {
            visit(Node::Expr(x), stack, f)
        }
        Expr::Binary { x, y, .. } => {
            visit(Node::Expr(x), stack, f);
            visit(Node::Expr(y), stack, f);
        }
        Expr::Composite { ty, elems, .. } => {
            if let Some(ty) = ty {
                visit(Node::Expr(ty), stack, f);
            }
            for elem in elems {
                visit(Node::Expr(elem), stack, f);
            }
        }
        Expr::KeyValue { key, value, .. } => {
            visit(Node::Expr(key), stack, f);
            visit(Node::Expr(value), stack, f);
        }
        Expr::FuncLit { sig, body, .. } => {
            visit_func_type(sig, stack, f);
            visit(Node::Block(body), stack, f);
        }
        Expr::TypeAssert { x, ty, .. } => {
            visit(Node::Expr(x), stack, f);
            if let Some(ty) = ty {
                visit(Node::Expr(ty), stack, f);
            }
        }
        Expr::Ellipsis { ty, .. } => {
            if let Some(ty) = ty {
                visit(Node::Expr(ty), stack, f);
            }
        }
        Expr::ArrayType { len, elem, .. } => {
            if let Some(len) = len {
                visit(Node::Expr(len), stack, f);
            }
            visit(Node::Expr(elem), stack, f);
        }
        Expr::MapType { key, value, .. } => {
            visit(Node::Expr(key), stack, f);
            visit(Node::Expr(value), stack, f);
        }
        Expr::ChanType { elem, .. } => visit(Node::Expr(elem), stack, f),
        Expr::Struct(st) => {
            for field in &st.fields {
                visit(Node::Field(field), stack, f);
            }
        }
        Expr::Interface(it) => {
            for elem in &it.elems {
                visit(Node::IfaceElem(elem), stack, f);
            }
        }
        Expr::FuncTypeExpr(ft) => visit_func_type(ft, stack, f),
    }
}

// ============================================================================
// Tests
// ============================================================================
