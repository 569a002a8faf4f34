//! Deep if-else nesting detection.
//!
//! A function is reported when an if-chain's maximum then-branch nesting
//! depth exceeds `max_nesting` and the cumulative line count of its else
//! blocks exceeds `min_else_lines`. Depth descends into the single
//! statement of a then-body when that statement is itself an if-with-else,
//! and follows chained else-ifs without deepening.

use std::path::PathBuf;

use serde::Serialize;

use gadfly_core::patch::Span;
use gadfly_core::text::span_line_count;
use gadfly_go_cst::ast::{Block, IfStmt, Stmt};

use crate::analyzers::{for_each_function, line_col};
use crate::workspace::{File, Workspace};

/// Options for [`DeepIfElseAnalyzer`].
#[derive(Debug, Clone, Serialize)]
pub struct DeepIfElseOptions {
    /// Maximum tolerated then-branch nesting depth.
    pub max_nesting: usize,
    /// Minimum cumulative else-block lines before reporting.
    pub min_else_lines: usize,
}

impl Default for DeepIfElseOptions {
    fn default() -> Self {
        DeepIfElseOptions {
            max_nesting: 2,
            min_else_lines: 3,
        }
    }
}

/// A function with an over-nested if-else chain.
#[derive(Debug, Clone, Serialize)]
pub struct DeepIfElseViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    pub depth: usize,
    pub else_lines: usize,
    /// File-local byte offset of the chain's `if` keyword.
    pub offset: u32,
}

#[derive(Debug, Default)]
pub struct DeepIfElseAnalyzer {
    pub options: DeepIfElseOptions,
}

impl DeepIfElseAnalyzer {
    pub fn new(options: DeepIfElseOptions) -> Self {
        DeepIfElseAnalyzer { options }
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<DeepIfElseViolation> {
        let mut violations = Vec::new();
        for_each_function(ws, |file, func| {
            let Some(body) = &func.body else { return };
            self.scan_block(file, &func.name.name, body, &mut violations);
        });
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }

    fn scan_block(
        &self,
        file: &File,
        function: &str,
        block: &Block,
        out: &mut Vec<DeepIfElseViolation>,
    ) {
        for stmt in &block.stmts {
            self.scan_stmt(file, function, stmt, out);
        }
    }

    fn scan_stmt(
        &self,
        file: &File,
        function: &str,
        stmt: &Stmt,
        out: &mut Vec<DeepIfElseViolation>,
    ) {
        match stmt {
            Stmt::If(ifs) => {
                let depth = chain_depth(ifs);
                let else_lines = chain_else_lines(&file.content, ifs);
                if depth > self.options.max_nesting && else_lines > self.options.min_else_lines
                {
                    let offset = ifs.span.start;
                    let (line, col) = line_col(file, offset);
                    out.push(DeepIfElseViolation {
                        file: file.path.clone(),
                        line,
                        col,
                        function: function.to_string(),
                        depth,
                        else_lines,
                        offset,
                    });
                }
                // Statements inside the branches may start chains of their
                // own; the nested-single-if pattern is already part of this
                // chain's depth, so skip it when recursing.
                if single_then_if(ifs).is_none() {
                    self.scan_block(file, function, &ifs.then, out);
                }
                match ifs.els.as_deref() {
                    Some(els @ Stmt::If(_)) => self.scan_stmt(file, function, els, out),
                    Some(Stmt::Block(block)) => self.scan_block(file, function, block, out),
                    _ => {}
                }
            }
            Stmt::For(fs) => self.scan_block(file, function, &fs.body, out),
            Stmt::Range(rs) => self.scan_block(file, function, &rs.body, out),
            Stmt::Block(block) => self.scan_block(file, function, block, out),
            Stmt::Switch(sw) => {
                for case in &sw.cases {
                    for stmt in &case.body {
                        self.scan_stmt(file, function, stmt, out);
                    }
                }
            }
            Stmt::TypeSwitch(ts) => {
                for case in &ts.cases {
                    for stmt in &case.body {
                        self.scan_stmt(file, function, stmt, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// The nested if-with-else when the then-body is exactly one such statement.
pub(crate) fn single_then_if(ifs: &IfStmt) -> Option<&IfStmt> {
    if ifs.then.stmts.len() != 1 {
        return None;
    }
    match &ifs.then.stmts[0] {
        Stmt::If(inner) if inner.els.is_some() => Some(inner),
        _ => None,
    }
}

/// Maximum then-branch nesting depth of a chain.
pub(crate) fn chain_depth(ifs: &IfStmt) -> usize {
    let mut depth = 1;
    if let Some(inner) = single_then_if(ifs) {
        depth = 1 + chain_depth(inner);
    }
    if let Some(Stmt::If(elseif)) = ifs.els.as_deref() {
        depth = depth.max(chain_depth(elseif));
    }
    depth
}

/// Cumulative line count of every else block reachable through the chain.
fn chain_else_lines(content: &str, ifs: &IfStmt) -> usize {
    let mut lines = 0;
    if let Some(inner) = single_then_if(ifs) {
        lines += chain_else_lines(content, inner);
    }
    match ifs.els.as_deref() {
        Some(Stmt::If(elseif)) => lines += chain_else_lines(content, elseif),
        Some(Stmt::Block(block)) => {
            lines += span_line_count(content, Span::new(block.span.start, block.span.end))
                as usize
        }
        _ => {}
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str, options: DeepIfElseOptions) -> Vec<DeepIfElseViolation> {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        DeepIfElseAnalyzer::new(options).analyze(&ws)
    }

    const NESTED: &str = "package p\n\nfunc load(err error, user *User) error {\n\tif err == nil {\n\t\tif user != nil {\n\t\t\treturn doWork(user)\n\t\t} else {\n\t\t\treturn errNotFound\n\t\t}\n\t} else {\n\t\treturn errDB\n\t}\n}\n";

    #[test]
    fn nested_chain_measured() {
        let violations = analyze(
            NESTED,
            DeepIfElseOptions {
                max_nesting: 1,
                min_else_lines: 1,
            },
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].depth, 2);
        assert!(violations[0].else_lines >= 2);
        assert_eq!(violations[0].function, "load");
    }

    #[test]
    fn defaults_tolerate_shallow_chains() {
        let violations = analyze(NESTED, DeepIfElseOptions::default());
        assert!(violations.is_empty(), "depth 2 does not exceed max_nesting 2");
    }

    #[test]
    fn else_if_does_not_deepen() {
        let src = "package p\n\nfunc f(x int) int {\n\tif x == 1 {\n\t\treturn 1\n\t} else if x == 2 {\n\t\treturn 2\n\t} else {\n\t\treturn 3\n\t}\n}\n";
        let violations = analyze(
            src,
            DeepIfElseOptions {
                max_nesting: 1,
                min_else_lines: 0,
            },
        );
        assert!(violations.is_empty(), "flat else-if chain has depth 1");
    }

    #[test]
    fn triple_nesting() {
        let src = "package p\n\nfunc f(a, b, c bool) int {\n\tif a {\n\t\tif b {\n\t\t\tif c {\n\t\t\t\treturn 3\n\t\t\t} else {\n\t\t\t\treturn 2\n\t\t\t}\n\t\t} else {\n\t\t\treturn 1\n\t\t}\n\t} else {\n\t\treturn 0\n\t}\n}\n";
        let violations = analyze(src, DeepIfElseOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].depth, 3);
    }
}
