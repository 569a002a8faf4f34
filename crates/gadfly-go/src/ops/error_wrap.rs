//! Error-wrapping fixer.
//!
//! - Bare `return err`: the error identifier alone is replaced with
//!   `fmt.Errorf("<context>: %w", err)`, where `<context>` derives from the
//!   enclosing function's name split at internal upper-case boundaries and
//!   lower-cased.
//! - `%v` instead of `%w`: the format literal is replaced with the same
//!   string, first `%v` changed to `%w`.
//! - Vacuous wrapped message: the format literal becomes `"<context>: %w"`.

use gadfly_core::error::GadflyResult;
use gadfly_core::patch::{Change, RefactorPlan, Span};

use crate::analyzers::error_wrap::{ErrorWrapKind, ErrorWrapViolation};
use crate::workspace::Workspace;

#[derive(Debug, Default)]
pub struct ErrorWrapFixer;

impl ErrorWrapFixer {
    pub fn new() -> Self {
        ErrorWrapFixer
    }

    pub fn fix(
        &self,
        ws: &Workspace,
        violations: &[ErrorWrapViolation],
    ) -> GadflyResult<RefactorPlan> {
        let mut plan = RefactorPlan::new();
        for violation in violations {
            let Some(file) = ws.file(&violation.file) else { continue };
            let span = Span::new(violation.target_offset, violation.target_end);
            let Some(old) = file
                .content
                .get(span.start as usize..span.end as usize)
            else {
                continue;
            };

            let context = wrap_context(&violation.function);
            let (replacement, description) = match violation.kind {
                ErrorWrapKind::BareReturn => (
                    format!("fmt.Errorf(\"{}: %w\", {})", context, old),
                    format!("wrap bare error return in {}", violation.function),
                ),
                ErrorWrapKind::VerbNotWrap => (
                    old.replacen("%v", "%w", 1),
                    format!("preserve error chain with %w in {}", violation.function),
                ),
                ErrorWrapKind::GenericMessage => (
                    format!("\"{}: %w\"", context),
                    format!("add context to wrapped error in {}", violation.function),
                ),
            };

            plan.record_file_hash(&file.path, file.content.as_bytes());
            let change = Change::new(file.path.clone(), span, old, replacement, description);
            if plan.add_change(change).is_err() {
                continue;
            }
        }
        Ok(plan)
    }
}

/// Human-readable context from a function name: split at internal
/// upper-case boundaries and lower-case everything. Acronyms split
/// letter-by-letter (`HTTP` becomes `h t t p`).
fn wrap_context(function: &str) -> String {
    let mut out = String::new();
    for (i, ch) in function.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push(' ');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
