//! Deep if-else fixer: flatten nested chains into guard clauses.
//!
//! Walks a chain whose shape is exactly "then is one nested if-with-else or
//! the happy path; else is a block containing a return", inverts each
//! condition textually, and replaces the whole chain with the sequence of
//! inverted-guard-with-return statements followed by the happy-path body.
//!
//! Inversion rules: comparison operators flip to their complements, `!x`
//! simplifies to `x`, parenthesized expressions unwrap, `&&`/`||` get an
//! outer negation, a bare identifier becomes `!x`, anything else is wrapped
//! in an outer negation.
//!
//! Refused (skipped) shapes: a level without an else, an else that is not a
//! block, an empty else block, an else block without a top-level return.

use gadfly_core::error::GadflyResult;
use gadfly_core::patch::{Change, RefactorPlan, Span};
use gadfly_core::text::{leading_indent, reindent};
use gadfly_go_cst::ast::{Block, Expr, IfStmt, Stmt, UnaryOp};

use crate::analyzers::deep_if::{single_then_if, DeepIfElseViolation};
use crate::ops::{block_body_text, find_if_at, text_at};
use crate::workspace::{File, Workspace};

#[derive(Debug, Default)]
pub struct GuardClauseFixer;

struct GuardLevel<'a> {
    cond: &'a Expr,
    else_block: &'a Block,
}

impl GuardClauseFixer {
    pub fn new() -> Self {
        GuardClauseFixer
    }

    pub fn fix(
        &self,
        ws: &Workspace,
        violations: &[DeepIfElseViolation],
    ) -> GadflyResult<RefactorPlan> {
        let mut plan = RefactorPlan::new();
        for violation in violations {
            let Some(file) = ws.file(&violation.file) else { continue };
            let Some(change) = self.change_for(&file, violation) else {
                continue;
            };
            plan.record_file_hash(&file.path, file.content.as_bytes());
            if plan.add_change(change).is_err() {
                continue;
            }
        }
        Ok(plan)
    }

    fn change_for(&self, file: &File, violation: &DeepIfElseViolation) -> Option<Change> {
        let chain = find_if_at(file, violation.offset)?;
        let (levels, happy) = collect_levels(chain)?;

        let indent = leading_indent(&file.content, chain.span.start as usize);
        let inner_indent = format!("{}\t", indent);

        let mut out = String::new();
        for (i, level) in levels.iter().enumerate() {
            if i > 0 {
                out.push_str(indent);
            }
            out.push_str(&format!("if {} {{\n", invert_condition(file, level.cond)));
            out.push_str(&reindent(
                &block_body_text(file, level.else_block),
                &inner_indent,
            ));
            out.push('\n');
            out.push_str(indent);
            out.push_str("}\n");
        }
        out.push_str(&reindent(&block_body_text(file, happy), indent));

        let span = Span::new(chain.span.start, chain.span.end);
        let old = file
            .content
            .get(span.start as usize..span.end as usize)?;
        Some(Change::new(
            file.path.clone(),
            span,
            old,
            out,
            format!(
                "flatten nested if-else in {} into guard clauses",
                violation.function
            ),
        ))
    }
}

/// Validate the chain shape and collect its levels plus the happy path.
fn collect_levels(chain: &IfStmt) -> Option<(Vec<GuardLevel<'_>>, &Block)> {
    let mut levels = Vec::new();
    let mut current = chain;
    loop {
        let else_block = match current.els.as_deref() {
            Some(Stmt::Block(block)) => block,
            // No else, or a chained else-if: not the supported shape.
            _ => return None,
        };
        if else_block.stmts.is_empty() {
            return None;
        }
        if !else_block.stmts.iter().any(|s| matches!(s, Stmt::Return { .. })) {
            return None;
        }
        levels.push(GuardLevel {
            cond: &current.cond,
            else_block,
        });

        match single_then_if(current) {
            Some(inner) => current = inner,
            None => return Some((levels, &current.then)),
        }
    }
}

/// Textual condition inversion.
fn invert_condition(file: &File, cond: &Expr) -> String {
    match cond {
        Expr::Binary { op, x, y, .. } => match op.complement() {
            Some(flipped) => format!(
                "{} {} {}",
                text_at(file, x.span()),
                flipped.as_str(),
                text_at(file, y.span())
            ),
            None => format!("!({})", text_at(file, cond.span())),
        },
        Expr::Unary {
            op: UnaryOp::Not,
            x,
            ..
        } => text_at(file, x.span()),
        Expr::Paren { x, .. } => invert_condition(file, x),
        Expr::Ident(id) => format!("!{}", id.name),
        _ => format!("!({})", text_at(file, cond.span())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::deep_if::{DeepIfElseAnalyzer, DeepIfElseOptions};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn fix(src: &str) -> (RefactorPlan, String) {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        let violations = DeepIfElseAnalyzer::new(DeepIfElseOptions {
            max_nesting: 0,
            min_else_lines: 0,
        })
        .analyze(&ws);
        let plan = GuardClauseFixer::new().fix(&ws, &violations).unwrap();
        let mut contents = HashMap::new();
        contents.insert(PathBuf::from("p/p.go"), src.to_string());
        plan.apply(&mut contents).unwrap();
        let fixed = contents.remove(&PathBuf::from("p/p.go")).unwrap();
        (plan, fixed)
    }

    const NESTED: &str = "package p\n\nimport \"errors\"\n\nfunc load(err error, user *User) error {\n\tif err == nil {\n\t\tif user != nil {\n\t\t\treturn doWork(user)\n\t\t} else {\n\t\t\treturn errors.New(\"not found\")\n\t\t}\n\t} else {\n\t\treturn errors.New(\"db error\")\n\t}\n}\n";

    #[test]
    fn nested_chain_becomes_guard_clauses() {
        let (plan, fixed) = fix(NESTED);
        assert_eq!(plan.len(), 1);
        let expected = "if err != nil {\n\t\treturn errors.New(\"db error\")\n\t}\n\tif user == nil {\n\t\treturn errors.New(\"not found\")\n\t}\n\treturn doWork(user)";
        assert_eq!(plan.changes[0].new_text, expected);
        assert!(fixed.contains("if err != nil {"));
        assert!(fixed.contains("if user == nil {"));
        gadfly_go_cst::parse_file(&fixed).unwrap();
    }

    #[test]
    fn empty_else_is_refused() {
        let src = "package p\n\nfunc f(a bool) int {\n\tif a {\n\t\treturn 1\n\t} else {\n\t}\n\treturn 0\n}\n";
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        let violations = vec![DeepIfElseViolation {
            file: PathBuf::from("p/p.go"),
            line: 4,
            col: 2,
            function: "f".to_string(),
            depth: 1,
            else_lines: 1,
            offset: src.find("if a").unwrap() as u32,
        }];
        let plan = GuardClauseFixer::new().fix(&ws, &violations).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn else_without_return_is_refused() {
        let src = "package p\n\nfunc f(a bool) {\n\tif a {\n\t\tdoA()\n\t} else {\n\t\tdoB()\n\t}\n}\n";
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        let violations = vec![DeepIfElseViolation {
            file: PathBuf::from("p/p.go"),
            line: 4,
            col: 2,
            function: "f".to_string(),
            depth: 1,
            else_lines: 1,
            offset: src.find("if a").unwrap() as u32,
        }];
        let plan = GuardClauseFixer::new().fix(&ws, &violations).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn condition_inversions() {
        let src = "package p\n\nfunc f(ready bool, n int) error {\n\tif !ready {\n\t\tif (n > 0) {\n\t\t\treturn work(n)\n\t\t} else {\n\t\t\treturn errNeg\n\t\t}\n\t} else {\n\t\treturn errReady\n\t}\n}\n";
        let (plan, fixed) = fix(src);
        assert_eq!(plan.len(), 1);
        // `!ready` inverts to `ready`; `(n > 0)` unwraps and flips to `n <= 0`.
        assert!(plan.changes[0].new_text.starts_with("if ready {"));
        assert!(plan.changes[0].new_text.contains("if n <= 0 {"));
        gadfly_go_cst::parse_file(&fixed).unwrap();
    }

    #[test]
    fn logical_operators_get_outer_negation() {
        let src = "package p\n\nfunc f(a, b bool) error {\n\tif a && b {\n\t\treturn nil\n\t} else {\n\t\treturn errBoth\n\t}\n}\n";
        let (plan, _) = fix(src);
        assert_eq!(plan.len(), 1);
        assert!(plan.changes[0].new_text.starts_with("if !(a && b) {"));
    }
}
