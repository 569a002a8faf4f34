//! Initializer-in-conditional detection.
//!
//! Reports every `if` statement that carries a short-declare initializer
//! (`if v, ok := m[k]; ok { ... }`). The paired fixer hoists the
//! initializer onto its own line.

use std::path::PathBuf;

use serde::Serialize;

use gadfly_go_cst::ast::Stmt;
use gadfly_go_cst::inspect::{inspect, Node};

use crate::analyzers::line_col;
use crate::resolver::enclosing_function;
use crate::workspace::Workspace;

/// An `if` statement with an initializer clause.
#[derive(Debug, Clone, Serialize)]
pub struct IfInitViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    /// File-local byte offset of the `if` keyword.
    pub offset: u32,
}

#[derive(Debug, Default)]
pub struct IfInitAnalyzer;

impl IfInitAnalyzer {
    pub fn new() -> Self {
        IfInitAnalyzer
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<IfInitViolation> {
        let mut violations = Vec::new();
        for pkg in ws.packages.values() {
            for file in pkg.all_files() {
                inspect(&file.ast, &mut |node, _| {
                    let Node::Stmt(Stmt::If(ifs)) = node else { return };
                    if ifs.init.is_none() {
                        return;
                    }
                    let offset = ifs.span.start;
                    let (line, col) = line_col(file, offset);
                    let function = enclosing_function(file, offset)
                        .map(|f| f.name.name.clone())
                        .unwrap_or_default();
                    violations.push(IfInitViolation {
                        file: file.path.clone(),
                        line,
                        col,
                        function,
                        offset,
                    });
                });
            }
        }
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_if_with_initializer() {
        let ws = Workspace::from_sources(
            "m",
            &[(
                "p/p.go",
                "package p\n\nfunc f(m map[string]int) int {\n\tif v, ok := m[\"k\"]; ok {\n\t\treturn v\n\t}\n\tif len(m) > 0 {\n\t\treturn 1\n\t}\n\treturn 0\n}\n",
            )],
        )
        .unwrap();
        let violations = IfInitAnalyzer::new().analyze(&ws);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].function, "f");
        assert_eq!(violations[0].line, 4);
    }

    #[test]
    fn zero_packages_zero_violations() {
        let ws = Workspace::from_sources("m", &[]).unwrap();
        assert!(IfInitAnalyzer::new().analyze(&ws).is_empty());
    }
}
