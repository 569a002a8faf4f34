//! Boolean-branching fixer: rewrite flag-variable if-chains as a switch.
//!
//! For each reported group, emits one deletion per boolean assignment (the
//! whole line including its trailing newline) and one replacement of the
//! if-chain with a switch on the common subject, whose cases are the
//! comparison literals and whose bodies are the original branch bodies
//! re-indented one level deeper. A trailing bare `else` becomes `default:`.
//!
//! Refused (skipped) shapes: groups containing `!=` comparisons, and chains
//! whose conditions no longer line up with the group's variables.

use gadfly_core::error::GadflyResult;
use gadfly_core::patch::{Change, RefactorPlan, Span};
use gadfly_core::text::{leading_indent, line_end, line_start, reindent};
use gadfly_go_cst::ast::{Block, IfStmt, Stmt};

use crate::analyzers::bool_branch::BoolBranchViolation;
use crate::ops::{block_body_text, find_if_at};
use crate::workspace::{File, Workspace};

#[derive(Debug, Default)]
pub struct BoolBranchFixer;

impl BoolBranchFixer {
    pub fn new() -> Self {
        BoolBranchFixer
    }

    pub fn fix(
        &self,
        ws: &Workspace,
        violations: &[BoolBranchViolation],
    ) -> GadflyResult<RefactorPlan> {
        let mut plan = RefactorPlan::new();
        for violation in violations {
            let Some(file) = ws.file(&violation.file) else { continue };
            if let Some(changes) = self.changes_for(&file, violation) {
                plan.record_file_hash(&file.path, file.content.as_bytes());
                for change in changes {
                    if plan.add_change(change).is_err() {
                        break;
                    }
                }
            }
        }
        Ok(plan)
    }

    fn changes_for(
        &self,
        file: &File,
        violation: &BoolBranchViolation,
    ) -> Option<Vec<Change>> {
        // A `!=` comparison would invert the case semantics; refuse.
        if violation.branches.iter().any(|b| b.negated) {
            return None;
        }
        let chain = find_if_at(file, violation.chain_offset)?;
        let (bodies, default_block) = chain_bodies(chain, violation.branches.len())?;

        let mut changes = Vec::new();

        // One deletion per boolean assignment, full line with its newline.
        for branch in &violation.branches {
            let start = line_start(&file.content, branch.assign_offset as usize) as u32;
            let end = line_end(&file.content, branch.assign_end as usize) as u32;
            let span = Span::new(start, end);
            let old = file.content.get(start as usize..end as usize)?;
            changes.push(Change::new(
                file.path.clone(),
                span,
                old,
                "",
                format!("remove boolean flag '{}'", branch.var),
            ));
        }

        // Replace the chain with a switch on the subject.
        let indent = leading_indent(&file.content, chain.span.start as usize);
        let body_indent = format!("{}\t", indent);
        let mut switch = format!("switch {} {{", violation.subject);
        for (branch, body) in violation.branches.iter().zip(&bodies) {
            switch.push_str(&format!("\n{}case {}:", indent, branch.literal));
            switch.push('\n');
            switch.push_str(&reindent(&block_body_text(file, body), &body_indent));
        }
        if let Some(default_block) = default_block {
            switch.push_str(&format!("\n{}default:", indent));
            switch.push('\n');
            switch.push_str(&reindent(
                &block_body_text(file, default_block),
                &body_indent,
            ));
        }
        switch.push_str(&format!("\n{}}}", indent));

        let span = Span::new(chain.span.start, chain.span.end);
        let old = file
            .content
            .get(span.start as usize..span.end as usize)?;
        changes.push(Change::new(
            file.path.clone(),
            span,
            old,
            switch,
            format!("replace boolean branching on '{}' with switch", violation.subject),
        ));
        Some(changes)
    }
}

/// Then-blocks of the chain in order, plus the trailing bare else, when the
/// chain has exactly `expected` conditions.
fn chain_bodies(chain: &IfStmt, expected: usize) -> Option<(Vec<&Block>, Option<&Block>)> {
    let mut bodies = Vec::new();
    let mut default_block = None;
    let mut current = Some(chain);
    while let Some(level) = current {
        bodies.push(&level.then);
        current = match level.els.as_deref() {
            Some(Stmt::If(next)) => Some(next),
            Some(Stmt::Block(block)) => {
                default_block = Some(block);
                None
            }
            None => None,
            Some(_) => return None,
        };
    }
    (bodies.len() == expected).then_some((bodies, default_block))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::bool_branch::{BoolBranchAnalyzer, BoolBranchOptions};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn fix(src: &str) -> (RefactorPlan, String) {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        let violations =
            BoolBranchAnalyzer::new(BoolBranchOptions::default()).analyze(&ws);
        let plan = BoolBranchFixer::new().fix(&ws, &violations).unwrap();
        let mut contents = HashMap::new();
        contents.insert(PathBuf::from("p/p.go"), src.to_string());
        plan.apply(&mut contents).unwrap();
        let fixed = contents.remove(&PathBuf::from("p/p.go")).unwrap();
        (plan, fixed)
    }

    const SOURCE: &str = "package p\n\nfunc h(accept string) {\n\twantShape := accept == \"x-shapefile\"\n\twantGeo := accept == \"geojson\"\n\tif wantShape {\n\t\tdoShape()\n\t} else if wantGeo {\n\t\tdoGeo()\n\t}\n}\n";

    #[test]
    fn two_deletions_and_one_switch_replacement() {
        let (plan, fixed) = fix(SOURCE);
        assert_eq!(plan.len(), 3);

        let deletions: Vec<_> = plan
            .changes
            .iter()
            .filter(|c| c.new_text.is_empty())
            .collect();
        assert_eq!(deletions.len(), 2);
        assert_eq!(deletions[0].old_text, "\twantShape := accept == \"x-shapefile\"\n");
        assert_eq!(deletions[1].old_text, "\twantGeo := accept == \"geojson\"\n");

        let replacement = plan
            .changes
            .iter()
            .find(|c| !c.new_text.is_empty())
            .unwrap();
        assert_eq!(
            replacement.new_text,
            "switch accept {\n\tcase \"x-shapefile\":\n\t\tdoShape()\n\tcase \"geojson\":\n\t\tdoGeo()\n\t}"
        );

        assert!(!fixed.contains("wantShape :="));
        assert!(fixed.contains("switch accept {"));
        // Fix-then-reparse fidelity.
        gadfly_go_cst::parse_file(&fixed).unwrap();
    }

    #[test]
    fn trailing_else_becomes_default() {
        let src = "package p\n\nfunc h(kind string) {\n\tisA := kind == \"a\"\n\tisB := kind == \"b\"\n\tif isA {\n\t\tdoA()\n\t} else if isB {\n\t\tdoB()\n\t} else {\n\t\tfallbackCase()\n\t}\n}\n";
        let (_, fixed) = fix(src);
        assert!(fixed.contains("\tdefault:\n\t\tfallbackCase()"));
        gadfly_go_cst::parse_file(&fixed).unwrap();
    }

    #[test]
    fn negated_comparison_is_refused() {
        let src = "package p\n\nfunc h(kind string) {\n\tnotA := kind != \"a\"\n\tnotB := kind != \"b\"\n\tif notA {\n\t\tx()\n\t} else if notB {\n\t\ty()\n\t}\n}\n";
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        let violations =
            BoolBranchAnalyzer::new(BoolBranchOptions::default()).analyze(&ws);
        assert_eq!(violations.len(), 1, "analyzer reports the group");
        let plan = BoolBranchFixer::new().fix(&ws, &violations).unwrap();
        assert!(plan.is_empty(), "fixer declines to transform");
    }
}
