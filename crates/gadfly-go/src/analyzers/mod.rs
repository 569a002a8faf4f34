//! Code-quality analyzers.
//!
//! Each analyzer is a stateless pass over the resolved workspace model that
//! emits typed violation records with file, line, column, and the enclosing
//! function. Results are sorted by (file, line, column) before they are
//! returned.

pub mod bool_branch;
pub mod deep_if;
pub mod env_bool;
pub mod error_wrap;
pub mod if_init;
pub mod missing_ctx;
pub mod unused;

use std::sync::Arc;

use gadfly_go_cst::ast::FuncDecl;

use crate::workspace::{File, Workspace};

/// Visit every function declaration in the workspace, package order then
/// file order then source order.
pub(crate) fn for_each_function<F>(ws: &Workspace, mut f: F)
where
    F: FnMut(&Arc<File>, &FuncDecl),
{
    for pkg in ws.packages.values() {
        for file in pkg.all_files() {
            for func in file.ast.funcs() {
                f(file, func);
            }
        }
    }
}

/// Source text of a file-local span.
pub(crate) fn span_text(file: &File, span: gadfly_core::patch::Span) -> String {
    file.content
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
        .to_string()
}

/// 1-based line and column for a file-local offset.
pub(crate) fn line_col(file: &File, offset: u32) -> (u32, u32) {
    gadfly_core::text::offset_to_position(&file.content, offset as usize)
}
