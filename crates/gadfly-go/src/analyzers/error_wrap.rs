//! Error-wrapping analysis.
//!
//! Only functions whose result list includes `error` are analyzed. Three
//! findings, two severities:
//!
//! - `return err` (a bare error-named identifier) - critical
//! - `fmt.Errorf("... %v ...", ..., err)` where `%v` should be `%w` - critical
//! - `fmt.Errorf("failed: %w", err)`-style vacuous messages - warning
//!
//! The `severity` option filters inclusively: `Warning` includes critical
//! findings, `Info` includes both.

use std::path::PathBuf;

use serde::Serialize;

use gadfly_core::patch::Span;
use gadfly_go_cst::ast::{Block, Expr, FuncDecl, LitKind, Stmt};

use crate::analyzers::{for_each_function, line_col, span_text};
use crate::workspace::{File, Workspace};

/// Messages considered vacuous once the wrap verb is removed.
const GENERIC_MESSAGES: &[&str] = &["", "error", "err", "failed", "failure", "error occurred"];

// ============================================================================
// Options and Violations
// ============================================================================

/// Finding severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Options for [`ErrorWrapAnalyzer`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorWrapOptions {
    /// Minimum severity to report (inclusive: `Warning` includes critical).
    pub severity: Severity,
}

impl Default for ErrorWrapOptions {
    fn default() -> Self {
        ErrorWrapOptions {
            severity: Severity::Warning,
        }
    }
}

/// What the analyzer found at a return site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorWrapKind {
    /// `return err` with no context.
    BareReturn,
    /// `%v` used where `%w` would preserve the error chain.
    VerbNotWrap,
    /// `%w` present but the message adds nothing.
    GenericMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorWrapViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    pub kind: ErrorWrapKind,
    pub severity: Severity,
    /// File-local span of the text the fixer replaces: the error identifier
    /// for bare returns, the format string literal otherwise.
    pub target_offset: u32,
    pub target_end: u32,
}

// ============================================================================
// Analyzer
// ============================================================================

#[derive(Debug, Default)]
pub struct ErrorWrapAnalyzer {
    pub options: ErrorWrapOptions,
}

impl ErrorWrapAnalyzer {
    pub fn new(options: ErrorWrapOptions) -> Self {
        ErrorWrapAnalyzer { options }
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<ErrorWrapViolation> {
        let mut violations = Vec::new();
        for_each_function(ws, |file, func| {
            if !returns_error(func) {
                return;
            }
            let Some(body) = &func.body else { return };
            scan_block(file, &func.name.name, body, &mut violations);
        });
        violations.retain(|v| v.severity <= self.options.severity);
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }
}

fn returns_error(func: &FuncDecl) -> bool {
    func.sig.results.iter().any(|field| {
        matches!(field.ty.unwrap_pointer(), Expr::Ident(id) if id.name == "error")
    })
}

fn scan_block(file: &File, function: &str, block: &Block, out: &mut Vec<ErrorWrapViolation>) {
    for stmt in &block.stmts {
        scan_stmt(file, function, stmt, out);
    }
}

fn scan_stmt(file: &File, function: &str, stmt: &Stmt, out: &mut Vec<ErrorWrapViolation>) {
    match stmt {
        Stmt::Return { results, .. } => {
            for result in results {
                check_result(file, function, result, out);
            }
        }
        Stmt::If(ifs) => {
            scan_block(file, function, &ifs.then, out);
            if let Some(els) = ifs.els.as_deref() {
                scan_stmt(file, function, els, out);
            }
        }
        Stmt::For(fs) => scan_block(file, function, &fs.body, out),
        Stmt::Range(rs) => scan_block(file, function, &rs.body, out),
        Stmt::Block(block) => scan_block(file, function, block, out),
        Stmt::Switch(sw) => {
            for case in &sw.cases {
                for stmt in &case.body {
                    scan_stmt(file, function, stmt, out);
                }
            }
        }
        Stmt::TypeSwitch(ts) => {
            for case in &ts.cases {
                for stmt in &case.body {
                    scan_stmt(file, function, stmt, out);
                }
            }
        }
        _ => {}
    }
}

fn check_result(file: &File, function: &str, result: &Expr, out: &mut Vec<ErrorWrapViolation>) {
    // `return err`
    if let Expr::Ident(id) = result {
        if is_error_name(&id.name) {
            out.push(violation(
                file,
                function,
                ErrorWrapKind::BareReturn,
                Severity::Critical,
                id.span,
            ));
        }
        return;
    }

    // `return fmt.Errorf(...)`
    let Expr::Call { func, args, .. } = result else {
        return;
    };
    let Expr::Selector { x, sel, .. } = func.as_ref() else {
        return;
    };
    let is_errorf =
        matches!(x.as_ident(), Some(pkg) if pkg.name == "fmt") && sel.name == "Errorf";
    if !is_errorf || args.is_empty() {
        return;
    }
    let Expr::BasicLit {
        kind: LitKind::Str,
        span: format_span,
        ..
    } = &args[0]
    else {
        return;
    };
    let format = span_text(file, *format_span);
    let format = format.trim_matches(['"', '`']);

    if format.contains("%v") && !format.contains("%w") {
        let last_is_error = matches!(
            args.last(),
            Some(Expr::Ident(id)) if is_error_name(&id.name)
        );
        if last_is_error {
            out.push(violation(
                file,
                function,
                ErrorWrapKind::VerbNotWrap,
                Severity::Critical,
                *format_span,
            ));
        }
        return;
    }

    if format.contains("%w") && is_generic_message(format) {
        out.push(violation(
            file,
            function,
            ErrorWrapKind::GenericMessage,
            Severity::Warning,
            *format_span,
        ));
    }
}

fn violation(
    file: &File,
    function: &str,
    kind: ErrorWrapKind,
    severity: Severity,
    target: Span,
) -> ErrorWrapViolation {
    let (line, col) = line_col(file, target.start);
    ErrorWrapViolation {
        file: file.path.clone(),
        line,
        col,
        function: function.to_string(),
        kind,
        severity,
        target_offset: target.start,
        target_end: target.end,
    }
}

/// Error-named identifier heuristic: `err`, `error`, or an `err`/`Err`
/// suffix.
pub(crate) fn is_error_name(name: &str) -> bool {
    name == "err" || name == "error" || name.ends_with("Err") || (name.len() > 3 && name.ends_with("err"))
}

/// The format minus its wrap verb, normalized, is one of the vacuous
/// messages.
fn is_generic_message(format: &str) -> bool {
    let stripped = format.replacen("%w", "", 1);
    let normalized = stripped.trim().trim_matches(':').trim();
    GENERIC_MESSAGES.contains(&normalized)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str, options: ErrorWrapOptions) -> Vec<ErrorWrapViolation> {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        ErrorWrapAnalyzer::new(options).analyze(&ws)
    }

    #[test]
    fn bare_return_is_critical() {
        let src = "package p\n\nfunc CreateOrder() error {\n\terr := step()\n\treturn err\n}\n";
        let violations = analyze(src, ErrorWrapOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ErrorWrapKind::BareReturn);
        assert_eq!(violations[0].severity, Severity::Critical);
        assert_eq!(violations[0].function, "CreateOrder");
    }

    #[test]
    fn verb_v_with_error_arg_is_critical() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f() error {\n\terr := step()\n\treturn fmt.Errorf(\"load failed: %v\", err)\n}\n";
        let violations = analyze(src, ErrorWrapOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ErrorWrapKind::VerbNotWrap);
    }

    #[test]
    fn generic_wrapped_message_is_warning() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f() error {\n\terr := step()\n\treturn fmt.Errorf(\"failed: %w\", err)\n}\n";
        let violations = analyze(src, ErrorWrapOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ErrorWrapKind::GenericMessage);
        assert_eq!(violations[0].severity, Severity::Warning);
    }

    #[test]
    fn severity_filter_is_inclusive() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f() error {\n\terr := step()\n\tif bad() {\n\t\treturn err\n\t}\n\treturn fmt.Errorf(\"failed: %w\", err)\n}\n";
        let critical_only = analyze(
            src,
            ErrorWrapOptions {
                severity: Severity::Critical,
            },
        );
        assert_eq!(critical_only.len(), 1);
        assert_eq!(critical_only[0].kind, ErrorWrapKind::BareReturn);

        let warnings = analyze(src, ErrorWrapOptions::default());
        assert_eq!(warnings.len(), 2);

        let info = analyze(
            src,
            ErrorWrapOptions {
                severity: Severity::Info,
            },
        );
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn functions_without_error_result_ignored() {
        let src = "package p\n\nfunc f() int {\n\terr := 1\n\treturn err\n}\n";
        assert!(analyze(src, ErrorWrapOptions::default()).is_empty());
    }

    #[test]
    fn descriptive_wrap_is_clean() {
        let src = "package p\n\nimport \"fmt\"\n\nfunc f() error {\n\terr := step()\n\treturn fmt.Errorf(\"parsing config header: %w\", err)\n}\n";
        assert!(analyze(src, ErrorWrapOptions::default()).is_empty());
    }

    #[test]
    fn error_name_heuristic() {
        assert!(is_error_name("err"));
        assert!(is_error_name("parseErr"));
        assert!(is_error_name("loadErr"));
        assert!(!is_error_name("errata"));
        assert!(!is_error_name("result"));
    }
}
