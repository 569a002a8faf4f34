//! Fixers: violation records to byte-exact refactoring plans.
//!
//! Every fixer reads the file's original bytes, lifts indentation by
//! scanning back to the preceding newline, and emits verified [`Change`]s
//! (`old_text` always equals the original slice). A fixer that meets a
//! shape it cannot transform safely skips the violation; the plan simply
//! contains fewer changes than there were violations.

pub mod bool_switch;
pub mod error_wrap;
pub mod guard;
pub mod if_init;

use gadfly_go_cst::ast::{Block, IfStmt, Stmt};
use gadfly_go_cst::inspect::{inspect, Node};

use crate::workspace::File;

/// The if statement starting at a file-local offset, if any.
pub(crate) fn find_if_at(file: &File, offset: u32) -> Option<&IfStmt> {
    let mut found: Option<&IfStmt> = None;
    inspect(&file.ast, &mut |node, _| {
        if let Node::Stmt(Stmt::If(ifs)) = node {
            if ifs.span.start == offset {
                found = Some(ifs);
            }
        }
    });
    found
}

/// The statements of a block as source text, stripped of the brace lines'
/// leading/trailing whitespace but with internal structure intact.
pub(crate) fn block_body_text(file: &File, block: &Block) -> String {
    let start = block.span.start as usize + 1;
    let end = (block.span.end as usize).saturating_sub(1).max(start);
    let inner = file.content.get(start..end).unwrap_or_default();
    let inner = inner.strip_prefix('\n').unwrap_or(inner);
    inner.trim_end().to_string()
}

/// Source text of a file-local span.
pub(crate) fn text_at(file: &File, span: gadfly_core::patch::Span) -> String {
    file.content
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
        .to_string()
}
