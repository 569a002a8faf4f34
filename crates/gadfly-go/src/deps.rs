//! Package dependency analysis: direct imports, transitive closure, cycles.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::workspace::Workspace;

/// The computed dependency graph of a workspace.
#[derive(Debug, Default, Serialize)]
pub struct DependencyGraph {
    /// Direct imports per package, in declaration order.
    pub direct: BTreeMap<String, Vec<String>>,
    /// Transitive imports per package.
    pub transitive: BTreeMap<String, BTreeSet<String>>,
    /// Import cycles; each cycle is an ordered list starting from its
    /// entry node.
    pub cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Whether `from` depends on `to`, directly or transitively.
    pub fn depends_on(&self, from: &str, to: &str) -> bool {
        self.transitive
            .get(from)
            .map(|set| set.contains(to))
            .unwrap_or(false)
    }
}

/// Build the dependency graph from each file's import list.
pub fn analyze(ws: &Workspace) -> DependencyGraph {
    let mut graph = DependencyGraph::default();

    for (path, pkg) in &ws.packages {
        graph.direct.insert(path.clone(), pkg.imports.clone());
    }

    // Transitive closure by iterative saturation.
    for (path, imports) in &graph.direct {
        graph
            .transitive
            .insert(path.clone(), imports.iter().cloned().collect());
    }
    loop {
        let mut added = false;
        let snapshot: Vec<(String, BTreeSet<String>)> = graph
            .transitive
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (path, reachable) in &snapshot {
            let mut extra = BTreeSet::new();
            for dep in reachable {
                if let Some(indirect) = graph.transitive.get(dep) {
                    for far in indirect {
                        if !reachable.contains(far) {
                            extra.insert(far.clone());
                        }
                    }
                }
            }
            if !extra.is_empty() {
                added = true;
                if let Some(set) = graph.transitive.get_mut(path) {
                    set.extend(extra);
                }
            }
        }
        if !added {
            break;
        }
    }

    graph.cycles = find_cycles(&graph.direct);
    graph
}

/// Depth-first cycle detection with a recursion-stack set. On meeting a
/// node already on the stack, the cycle is the path suffix from its first
/// occurrence.
fn find_cycles(direct: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();

    for start in direct.keys() {
        if visited.contains(start.as_str()) {
            continue;
        }
        let mut stack: Vec<&str> = Vec::new();
        let mut on_stack: HashSet<&str> = HashSet::new();
        dfs(
            start,
            direct,
            &mut visited,
            &mut stack,
            &mut on_stack,
            &mut cycles,
        );
    }
    cycles
}

fn dfs<'a>(
    node: &'a str,
    direct: &'a BTreeMap<String, Vec<String>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node);
    stack.push(node);
    on_stack.insert(node);

    if let Some(deps) = direct.get(node) {
        for dep in deps {
            if on_stack.contains(dep.as_str()) {
                let first = stack
                    .iter()
                    .position(|n| *n == dep.as_str())
                    .unwrap_or(0);
                cycles.push(stack[first..].iter().map(|s| s.to_string()).collect());
            } else if !visited.contains(dep.as_str()) && direct.contains_key(dep.as_str()) {
                dfs(dep, direct, visited, stack, on_stack, cycles);
            }
        }
    }

    stack.pop();
    on_stack.remove(node);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(sources: &[(&str, &str)]) -> std::sync::Arc<Workspace> {
        Workspace::from_sources("m", sources).unwrap()
    }

    #[test]
    fn direct_and_transitive_imports() {
        let ws = ws(&[
            ("a/a.go", "package a\n\nimport \"m/b\"\n\nvar _ = b.X\n"),
            ("b/b.go", "package b\n\nimport \"m/c\"\n\nvar X = c.Y\n"),
            ("c/c.go", "package c\n\nvar Y = 1\n"),
        ]);
        let graph = analyze(&ws);
        assert_eq!(graph.direct["m/a"], vec!["m/b"]);
        assert!(graph.depends_on("m/a", "m/c"));
        assert!(!graph.depends_on("m/c", "m/a"));
        assert!(!graph.has_cycles());
    }

    #[test]
    fn cycle_extraction() {
        let ws = ws(&[
            ("a/a.go", "package a\n\nimport \"m/b\"\n\nvar _ = b.X\n"),
            ("b/b.go", "package b\n\nimport \"m/a\"\n\nvar X = 1\n"),
        ]);
        let graph = analyze(&ws);
        assert!(graph.has_cycles());
        assert_eq!(graph.cycles.len(), 1);
        let cycle = &graph.cycles[0];
        assert_eq!(cycle.len(), 2);
        assert!(cycle.contains(&"m/a".to_string()));
        assert!(cycle.contains(&"m/b".to_string()));
    }

    #[test]
    fn self_import_is_a_unit_cycle() {
        let ws = ws(&[("a/a.go", "package a\n\nimport \"m/a\"\n\nvar _ = 1\n")]);
        let graph = analyze(&ws);
        assert_eq!(graph.cycles, vec![vec!["m/a".to_string()]]);
    }

    #[test]
    fn external_imports_are_leaves() {
        let ws = ws(&[(
            "a/a.go",
            "package a\n\nimport \"fmt\"\n\nvar _ = fmt.Sprint(1)\n",
        )]);
        let graph = analyze(&ws);
        assert_eq!(graph.direct["m/a"], vec!["fmt"]);
        assert!(graph.depends_on("m/a", "fmt"));
        assert!(!graph.has_cycles());
    }
}
