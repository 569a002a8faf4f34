//! Environment-boolean parameter detection.
//!
//! Reports boolean parameters whose lower-cased name matches a fixed list
//! of environment-mode names (`debug`, `prod`, `dryRun`, ...). When the
//! parameter is passed unchanged to `max_depth` or more callees in the same
//! function, the propagation chain is included and the suggestion upgrades:
//! mode-style flags should become interface implementations, `debug` a
//! concrete value.

use std::path::PathBuf;

use serde::Serialize;

use gadfly_go_cst::ast::{Expr, FuncDecl};
use gadfly_go_cst::inspect::{inspect, Node};

use crate::analyzers::{for_each_function, line_col};
use crate::workspace::{File, Workspace};

/// Parameter names treated as environment switches (compared lower-cased).
const ENV_BOOL_NAMES: &[&str] = &[
    "debug",
    "verbose",
    "dev",
    "prod",
    "production",
    "staging",
    "test",
    "testing",
    "dryrun",
    "dry_run",
    "trace",
    "mode",
    "local",
    "sandbox",
];

/// Options for [`EnvBoolAnalyzer`].
#[derive(Debug, Clone, Serialize)]
pub struct EnvBoolOptions {
    /// Propagation chain length at which the finding upgrades.
    pub max_depth: usize,
}

impl Default for EnvBoolOptions {
    fn default() -> Self {
        EnvBoolOptions { max_depth: 1 }
    }
}

/// A boolean environment-mode parameter.
#[derive(Debug, Clone, Serialize)]
pub struct EnvBoolViolation {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
    pub function: String,
    /// The offending parameter name.
    pub param: String,
    /// Callees the flag is forwarded to, in source order.
    pub chain: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Default)]
pub struct EnvBoolAnalyzer {
    pub options: EnvBoolOptions,
}

impl EnvBoolAnalyzer {
    pub fn new(options: EnvBoolOptions) -> Self {
        EnvBoolAnalyzer { options }
    }

    pub fn analyze(&self, ws: &Workspace) -> Vec<EnvBoolViolation> {
        let mut violations = Vec::new();
        for_each_function(ws, |file, func| {
            for field in &func.sig.params {
                if !matches!(field.ty.unwrap_pointer(), Expr::Ident(id) if id.name == "bool")
                {
                    continue;
                }
                for name in &field.names {
                    let lowered = name.name.to_lowercase();
                    if !ENV_BOOL_NAMES.contains(&lowered.as_str()) {
                        continue;
                    }
                    let chain = propagation_chain(file, func, &name.name);
                    let propagated = chain.len() >= self.options.max_depth;
                    let suggestion = suggestion_for(&lowered, propagated);
                    let (line, col) = line_col(file, name.span.start);
                    violations.push(EnvBoolViolation {
                        file: file.path.clone(),
                        line,
                        col,
                        function: func.name.name.clone(),
                        param: name.name.clone(),
                        chain: if propagated { chain } else { Vec::new() },
                        suggestion,
                    });
                }
            }
        });
        violations.sort_by(|a, b| {
            (&a.file, a.line, a.col).cmp(&(&b.file, b.line, b.col))
        });
        violations
    }
}

/// Callees the parameter is forwarded to unchanged, in source order.
fn propagation_chain(file: &File, func: &FuncDecl, param: &str) -> Vec<String> {
    let Some(body) = &func.body else {
        return Vec::new();
    };
    let body_span = body.span;
    let mut chain = Vec::new();
    inspect(&file.ast, &mut |node, _| {
        let Node::Expr(Expr::Call { func: callee, args, span }) = node else {
            return;
        };
        if span.start < body_span.start || span.end > body_span.end {
            return;
        }
        let forwarded = args
            .iter()
            .any(|arg| matches!(arg.as_ident(), Some(id) if id.name == param));
        if !forwarded {
            return;
        }
        let name = match callee.as_ref() {
            Expr::Ident(id) => id.name.clone(),
            Expr::Selector { x, sel, .. } => match x.as_ident() {
                Some(recv) => format!("{}.{}", recv.name, sel.name),
                None => sel.name.clone(),
            },
            _ => return,
        };
        chain.push(name);
    });
    chain
}

fn suggestion_for(lowered: &str, propagated: bool) -> String {
    if !propagated {
        return "carry the mode in a configuration struct instead of a parameter".to_string();
    }
    if lowered == "debug" || lowered == "verbose" || lowered == "trace" {
        "pass a concrete value (logger, sink, level) instead of forwarding a debug flag"
            .to_string()
    } else {
        "model the environments as an interface and pass the implementation".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str, options: EnvBoolOptions) -> Vec<EnvBoolViolation> {
        let ws = Workspace::from_sources("m", &[("p/p.go", src)]).unwrap();
        EnvBoolAnalyzer::new(options).analyze(&ws)
    }

    #[test]
    fn boolean_mode_parameter_reported() {
        let src = "package p\n\nfunc start(prod bool) {\n\tuse(1)\n}\n";
        let violations = analyze(src, EnvBoolOptions { max_depth: 5 });
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].param, "prod");
        assert!(violations[0].chain.is_empty());
        assert!(violations[0].suggestion.contains("configuration"));
    }

    #[test]
    fn propagation_upgrades_suggestion() {
        let src = "package p\n\nfunc start(prod bool) {\n\tconnect(prod)\n\tmigrate(prod)\n}\n";
        let violations = analyze(src, EnvBoolOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].chain, vec!["connect", "migrate"]);
        assert!(violations[0].suggestion.contains("interface"));
    }

    #[test]
    fn debug_flag_suggests_concrete_value() {
        let src = "package p\n\nfunc run(debug bool) {\n\tlogStep(debug)\n}\n";
        let violations = analyze(src, EnvBoolOptions::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0].suggestion.contains("concrete value"));
    }

    #[test]
    fn non_mode_booleans_ignored() {
        let src = "package p\n\nfunc f(recursive bool, prod string) {\n\tuse(recursive, prod)\n}\n";
        assert!(analyze(src, EnvBoolOptions::default()).is_empty());
    }

    #[test]
    fn camel_case_names_match_lowercased() {
        let src = "package p\n\nfunc f(dryRun bool) {\n\tapply(dryRun)\n}\n";
        // `dryRun` lower-cases to `dryrun`, which is on the list.
        let violations = analyze(src, EnvBoolOptions::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].param, "dryRun");
    }
}
