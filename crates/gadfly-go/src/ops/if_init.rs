//! If-init fixer: hoist initializers out of `if` conditions.
//!
//! For `if v, ok := m[k]; ok {`, the byte range from the `if` keyword
//! through the opening brace is replaced with the initializer on its own
//! line followed by `if <condition> {` at the original indentation.

use gadfly_core::error::GadflyResult;
use gadfly_core::patch::{Change, RefactorPlan, Span};
use gadfly_core::text::leading_indent;

use crate::analyzers::if_init::IfInitViolation;
use crate::ops::{find_if_at, text_at};
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct IfInitFixer;

impl IfInitFixer {
    pub fn new() -> Self {
        IfInitFixer
    }

    pub fn fix(
        &self,
        ws: &Workspace,
        violations: &[IfInitViolation],
    ) -> GadflyResult<RefactorPlan> {
        let mut plan = RefactorPlan::new();
        for violation in violations {
            let Some(file) = ws.file(&violation.file) else { continue };
            let Some(ifs) = find_if_at(&file, violation.offset) else {
                continue;
            };
            let Some(init) = &ifs.init else { continue };

            // From the `if` keyword through the opening brace.
            let span = Span::new(ifs.span.start, ifs.then.span.start + 1);
            let Some(old) = file
                .content
                .get(span.start as usize..span.end as usize)
            else {
                continue;
            };

            let init_text = text_at(&file, init.span());
            let cond_text = text_at(&file, ifs.cond.span());
            let indent = leading_indent(&file.content, ifs.span.start as usize);
            let replacement = format!("{}\n{}if {} {{", init_text, indent, cond_text);

            plan.record_file_hash(&file.path, file.content.as_bytes());
            let change = Change::new(
                file.path.clone(),
                span,
                old,
                replacement,
                format!(
                    "hoist initializer out of if condition in {}",
                    violation.function
                ),
            );
            if plan.add_change(change).is_err() {
                continue;
            }
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::if_init::IfInitAnalyzer;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const SOURCE: &str = "package p\n\nfunc f(m map[string]int) int {\n\tif v, ok := m[\"k\"]; ok {\n\t\treturn v\n\t}\n\treturn 0\n}\n";

    #[test]
    fn hoists_initializer_above_condition() {
        let ws = Workspace::from_sources("m", &[("p/p.go", SOURCE)]).unwrap();
        let violations = IfInitAnalyzer::new().analyze(&ws);
        let plan = IfInitFixer::new().fix(&ws, &violations).unwrap();
        assert_eq!(plan.len(), 1);

        let change = &plan.changes[0];
        assert_eq!(change.old_text, "if v, ok := m[\"k\"]; ok {");
        assert_eq!(change.new_text, "v, ok := m[\"k\"]\n\tif ok {");

        let mut contents = HashMap::new();
        contents.insert(PathBuf::from("p/p.go"), SOURCE.to_string());
        plan.apply(&mut contents).unwrap();
        let fixed = &contents[&PathBuf::from("p/p.go")];
        assert!(fixed.contains("\tv, ok := m[\"k\"]\n\tif ok {\n"));
        // Fix-then-reparse fidelity.
        gadfly_go_cst::parse_file(fixed).unwrap();
    }

    #[test]
    fn plans_are_empty_for_no_violations() {
        let ws = Workspace::from_sources("m", &[("p/p.go", "package p\n")]).unwrap();
        let plan = IfInitFixer::new().fix(&ws, &[]).unwrap();
        assert!(plan.is_empty());
        assert!(plan.affected_files.is_empty());
    }
}
