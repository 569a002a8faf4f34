//! Boolean-branching detection.
//!
//! Within a function, short-declared assignments of the form `v := E == L`
//! (or `!=`) are grouped by the textual form of `E`. A group of at least
//! `min_branches` variables that all appear as whole-expression conditions
//! of one if/else-if chain is reported; the paired fixer rewrites the chain
//! as a switch on `E`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use gadfly_go_cst::ast::{BinaryOp, Block, Expr, IfStmt, Stmt};

use crate::analyzers::{for_each_function, line_col, span_text};
use crate::workspace::{File, Workspace};

/// Options for [`BoolBranchAnalyzer`].
#[derive(Debug, Clone, Serialize)]
pub struct BoolBranchOptions {
    /// Minimum group size before reporting.
    pub min_branches: usize,
}

impl Default for BoolBranchOptions {
    fn default() -> Self {
        BoolBranchOptions { min_branches: 2 }
    }
}

/// One boolean assignment participating in a group, in chain order.
#[derive(Debug, Clone, Serialize)]
pub struct BoolBranch {
    /// The boolean variable name.
    pub var: String,
    /// Source text of the comparison literal.
    pub literal: String,
    /// True when the comparison was `!=` rather than `==`.
    pub negated: bool,
    /// File-local span of the whole assignment statement.
    pub assign_offset: u32,
    pub assign_end: u32,
}

/// A group of boolean comparisons branching on one subject expression.
#[derive(Debug, Clone, Serialize)]
pub struct BoolBranchViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    /// Source text of the common comparison subject.
    pub subject: String,
    /// Branches in if-chain order.
    pub branches: Vec<BoolBranch>,
    /// File-local byte offset of the if-chain.
    pub chain_offset: u32,
}

#[derive(Debug, Default)]
pub struct BoolBranchAnalyzer {
    pub options: BoolBranchOptions,
}

struct Candidate {
    var: String,
    subject: String,
    literal: String,
    negated: bool,
    assign_offset: u32,
    assign_end: u32,
    line: u32,
    col: u32,
}

impl BoolBranchAnalyzer {
    pub fn new(options: BoolBranchOptions) -> Self {
        BoolBranchAnalyzer { options }
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<BoolBranchViolation> {
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
        out: &mut Vec<BoolBranchViolation>,
    ) {
        // Candidates grouped by subject text, in declaration order.
        let mut groups: HashMap<String, Vec<Candidate>> = HashMap::new();
        for stmt in &block.stmts {
            if let Some(candidate) = boolean_comparison(file, stmt) {
                groups
                    .entry(candidate.subject.clone())
                    .or_default()
                    .push(candidate);
            }
        }

        for candidates in groups.into_values() {
            if candidates.len() < self.options.min_branches {
                continue;
            }
            let Some((chain_offset, order)) = find_chain(block, &candidates) else {
                continue;
            };
            // Reorder branches to match the chain's condition order.
            let branches: Vec<BoolBranch> = order
                .iter()
                .filter_map(|var| {
                    candidates.iter().find(|c| &c.var == var).map(|c| BoolBranch {
                        var: c.var.clone(),
                        literal: c.literal.clone(),
                        negated: c.negated,
                        assign_offset: c.assign_offset,
                        assign_end: c.assign_end,
                    })
                })
                .collect();
            let first = &candidates[0];
            out.push(BoolBranchViolation {
                file: file.path.clone(),
                line: first.line,
                col: first.col,
                function: function.to_string(),
                subject: first.subject.clone(),
                branches,
                chain_offset,
            });
        }

        // Recurse into nested structures.
        for stmt in &block.stmts {
            match stmt {
                Stmt::If(ifs) => {
                    self.scan_block(file, function, &ifs.then, out);
                    if let Some(Stmt::Block(els)) = ifs.els.as_deref() {
                        self.scan_block(file, function, els, out);
                    }
                }
                Stmt::For(fs) => self.scan_block(file, function, &fs.body, out),
                Stmt::Range(rs) => self.scan_block(file, function, &rs.body, out),
                Stmt::Block(inner) => self.scan_block(file, function, inner, out),
                _ => {}
            }
        }
    }
}

/// Recognize `v := E op L` with `op` one of `==`/`!=` and `L` a literal.
fn boolean_comparison(file: &File, stmt: &Stmt) -> Option<Candidate> {
    let Stmt::Assign(assign) = stmt else { return None };
    if !assign.is_define() || assign.lhs.len() != 1 || assign.rhs.len() != 1 {
        return None;
    }
    let var = assign.lhs[0].as_ident()?;
    let Expr::Binary { op, x, y, .. } = &assign.rhs[0] else {
        return None;
    };
    if !matches!(op, BinaryOp::Eql | BinaryOp::Neq) {
        return None;
    }
    let Expr::BasicLit { span: lit_span, .. } = y.as_ref() else {
        return None;
    };
    let (line, col) = line_col(file, assign.span.start);
    Some(Candidate {
        var: var.name.clone(),
        subject: span_text(file, x.span()),
        literal: span_text(file, *lit_span),
        negated: *op == BinaryOp::Neq,
        assign_offset: assign.span.start,
        assign_end: assign.span.end,
        line,
        col,
    })
}

/// Find an if/else-if chain in the block whose conditions are exactly the
/// group's variables. Returns the chain offset and the variables in chain
/// order.
fn find_chain(block: &Block, candidates: &[Candidate]) -> Option<(u32, Vec<String>)> {
    for stmt in &block.stmts {
        let Stmt::If(ifs) = stmt else { continue };
        if let Some(order) = chain_matches(ifs, candidates) {
            return Some((ifs.span.start, order));
        }
    }
    None
}

fn chain_matches(ifs: &IfStmt, candidates: &[Candidate]) -> Option<Vec<String>> {
    let mut order = Vec::new();
    let mut current = Some(ifs);
    while let Some(level) = current {
        let cond = level.cond.as_ident()?;
        if !candidates.iter().any(|c| c.var == cond.name) {
            return None;
        }
        if order.contains(&cond.name) {
            return None;
        }
        order.push(cond.name.clone());
        current = match level.els.as_deref() {
            Some(Stmt::If(next)) => Some(next),
            _ => None,
        };
    }
    // Every variable in the group must appear as a condition.
    if order.len() == candidates.len() {
        Some(order)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "package p\n\nfunc h(accept string) {\n\twantShape := accept == \"x-shapefile\"\n\twantGeo := accept == \"geojson\"\n\tif wantShape {\n\t\tdoShape()\n\t} else if wantGeo {\n\t\tdoGeo()\n\t}\n}\n";

    fn analyze(src: &str) -> Vec<BoolBranchViolation> {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        BoolBranchAnalyzer::new(BoolBranchOptions::default()).analyze(&ws)
    }

    #[test]
    fn detects_grouped_boolean_branching() {
        let violations = analyze(SOURCE);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.subject, "accept");
        assert_eq!(v.function, "h");
        assert_eq!(v.branches.len(), 2);
        assert_eq!(v.branches[0].var, "wantShape");
        assert_eq!(v.branches[0].literal, "\"x-shapefile\"");
        assert_eq!(v.branches[1].var, "wantGeo");
        assert!(!v.branches[0].negated);
    }

    #[test]
    fn single_comparison_not_reported() {
        let src = "package p\n\nfunc f(s string) {\n\tok := s == \"a\"\n\tif ok {\n\t\tdo()\n\t}\n}\n";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn different_subjects_do_not_group() {
        let src = "package p\n\nfunc f(a, b string) {\n\tx := a == \"1\"\n\ty := b == \"2\"\n\tif x {\n\t\tdo()\n\t} else if y {\n\t\tother()\n\t}\n}\n";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn group_without_matching_chain_not_reported() {
        let src = "package p\n\nfunc f(s string) {\n\ta := s == \"1\"\n\tb := s == \"2\"\n\tuse(a, b)\n}\n";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn chain_with_foreign_condition_not_reported() {
        let src = "package p\n\nfunc f(s string, other bool) {\n\ta := s == \"1\"\n\tb := s == \"2\"\n\tif a {\n\t\tdo()\n\t} else if other {\n\t\tx()\n\t} else if b {\n\t\ty()\n\t}\n}\n";
        assert!(analyze(src).is_empty());
    }
}
