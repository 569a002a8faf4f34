//! Missing-context detection.
//!
//! Reports functions that synthesize a root cancellation context
//! (`context.TODO()` or `context.Background()`) in their body without
//! accepting a `context.Context` parameter. `main` and `init` are exempt -
//! they are legitimate context roots.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use gadfly_go_cst::ast::{Expr, FuncDecl};
use gadfly_go_cst::inspect::{inspect, Node};

use crate::analyzers::line_col;
use crate::resolver::enclosing_function;
use crate::workspace::Workspace;

/// A function creating root contexts instead of accepting one.
#[derive(Debug, Clone, Serialize)]
pub struct MissingContextViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    /// The offending call expressions, e.g. `context.TODO()`.
    pub context_calls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MissingContextAnalyzer;

impl MissingContextAnalyzer {
    pub fn new() -> Self {
        MissingContextAnalyzer
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<MissingContextViolation> {
        let mut violations = Vec::new();
        for pkg in ws.packages.values() {
            for file in pkg.all_files() {
                // Root-context calls per enclosing function offset.
                let mut calls: BTreeMap<u32, Vec<String>> = BTreeMap::new();
                inspect(&file.ast, &mut |node, _| {
                    let Node::Expr(Expr::Call { func, args, span }) = node else {
                        return;
                    };
                    if !args.is_empty() {
                        return;
                    }
                    let Expr::Selector { x, sel, .. } = func.as_ref() else {
                        return;
                    };
                    let Some(alias) = x.as_ident() else { return };
                    if !is_context_package(file, &alias.name) {
                        return;
                    }
                    if sel.name != "TODO" && sel.name != "Background" {
                        return;
                    }
                    let Some(enclosing) = enclosing_function(file, span.start) else {
                        return;
                    };
                    calls
                        .entry(enclosing.span.start)
                        .or_default()
                        .push(format!("{}.{}()", alias.name, sel.name));
                });

                for func in file.ast.funcs() {
                    if func.name.name == "main" || func.name.name == "init" {
                        continue;
                    }
                    let Some(context_calls) = calls.remove(&func.span.start) else {
                        continue;
                    };
                    if has_context_param(file, func) {
                        continue;
                    }
                    let (line, col) = line_col(file, func.name.span.start);
                    violations.push(MissingContextViolation {
                        file: file.path.clone(),
                        line,
                        col,
                        function: func.name.name.clone(),
                        context_calls,
                    });
                }
            }
        }
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }
}

/// The alias names the `context` package: either literally `context` or an
/// alias whose import path is `context`.
fn is_context_package(file: &crate::workspace::File, alias: &str) -> bool {
    match file.ast.import_named(alias) {
        Some(import) => import.path == "context",
        None => alias == "context",
    }
}

fn has_context_param(file: &crate::workspace::File, func: &FuncDecl) -> bool {
    func.sig.params.iter().any(|field| {
        let Expr::Selector { x, sel, .. } = field.ty.unwrap_pointer() else {
            return false;
        };
        sel.name == "Context"
            && x.as_ident()
                .map(|id| is_context_package(file, &id.name))
                .unwrap_or(false)
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str) -> Vec<MissingContextViolation> {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        MissingContextAnalyzer::new().analyze(&ws)
    }

    #[test]
    fn todo_without_context_param_reported() {
        let src = "package p\n\nimport \"context\"\n\nfunc doWork() {\n\tctx := context.TODO()\n\t_ = ctx\n}\n";
        let violations = analyze(src);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].function, "doWork");
        assert_eq!(violations[0].context_calls, vec!["context.TODO()"]);
    }

    #[test]
    fn main_and_init_are_exempt() {
        let src = "package main\n\nimport \"context\"\n\nfunc main() {\n\tctx := context.TODO()\n\t_ = ctx\n}\n\nfunc init() {\n\t_ = context.Background()\n}\n";
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn context_param_satisfies() {
        let src = "package p\n\nimport \"context\"\n\nfunc run(ctx context.Context) {\n\tchild := context.Background()\n\t_ = child\n\t_ = ctx\n}\n";
        // Accepting a context makes synthesizing one a caller decision.
        assert!(analyze(src).is_empty());
    }

    #[test]
    fn both_roots_collected() {
        let src = "package p\n\nimport \"context\"\n\nfunc setup() {\n\ta := context.TODO()\n\tb := context.Background()\n\t_ = a\n\t_ = b\n}\n";
        let violations = analyze(src);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].context_calls,
            vec!["context.TODO()", "context.Background()"]
        );
    }

    #[test]
    fn functions_without_context_calls_ignored() {
        let src = "package p\n\nfunc quiet() {}\n";
        assert!(analyze(src).is_empty());
    }
}
