//! Module registry and inter-module dependency graph.

use crate::ast::Module;
use crate::error::{Error, Result};
use crate::source::Span;
use std::collections::HashMap;

/// A registered module: its parsed tree plus where it came from.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub ast: Module,
    pub file_path: Option<String>,
    pub dependencies: Vec<String>,
}

/// Owns every parsed [`Module`] for one compilation, keyed by name.
///
/// A flat map keyed by identity, with mutation routed through narrow
/// methods rather than exposed directly.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleInfo>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ast` under `name`. Fails with [`Error::DuplicateModule`]
    /// (carrying both file paths) if `name` is already registered.
    pub fn register(&mut self, name: impl Into<String>, ast: Module, file_path: Option<String>) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.modules.get(&name) {
            return Err(Error::DuplicateModule {
                name,
                first_path: existing.file_path.clone().unwrap_or_else(|| "<unknown>".to_string()),
                second_path: file_path.unwrap_or_else(|| "<unknown>".to_string()),
            });
        }
        self.modules.insert(
            name.clone(),
            ModuleInfo {
                name,
                ast,
                file_path,
                dependencies: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name).map(|m| &m.ast)
    }

    /// A defensive copy of the module's registration metadata.
    pub fn get_info(&self, name: &str) -> Option<ModuleInfo> {
        self.modules.get(name).cloned()
    }

    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Records that `from` depends on `to`. Idempotent per `(from, to)` pair.
    pub fn add_dependency(&mut self, from: &str, to: impl Into<String>) {
        let to = to.into();
        if let Some(info) = self.modules.get_mut(from) {
            if !info.dependencies.contains(&to) {
                info.dependencies.push(to);
            }
        }
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }
}

/// An import edge, kept for diagnostics even when it duplicates another
/// edge between the same two modules.
#[derive(Debug, Clone)]
struct Edge {
    to: String,
    location: Span,
}

/// Directed multigraph of module names.
///
/// Cycle detection uses DFS node-colouring (white/grey/black) over module
/// names, extended to report every elementary cycle rather than just a
/// visitation order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<Edge>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Gray,
    Black,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge `from -> to` carrying the import's source location.
    /// This is a multigraph: calling this twice for the same pair keeps
    /// both edges, each with its own location, so diagnostics can point at
    /// every offending `import` statement.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>, location: Span) {
        self.edges.entry(from.into()).or_default().push(Edge { to: to.into(), location });
    }

    fn nodes(&self) -> Vec<String> {
        let mut names: std::collections::HashSet<String> = self.edges.keys().cloned().collect();
        for edges in self.edges.values() {
            for e in edges {
                names.insert(e.to.clone());
            }
        }
        let mut names: Vec<_> = names.into_iter().collect();
        names.sort();
        names
    }

    fn successors(&self, name: &str) -> Vec<String> {
        self.edges
            .get(name)
            .map(|edges| edges.iter().map(|e| e.to.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_cycles(&self) -> bool {
        !self.detect_cycles().is_empty()
    }

    /// Every elementary cycle reachable via DFS back edges, as lists of
    /// module names starting and ending at the same node (e.g. `[A, B, A]`
    /// for a 2-cycle).
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut colour: HashMap<String, Colour> = self.nodes().iter().map(|n| (n.clone(), Colour::White)).collect();
        let mut stack: Vec<String> = Vec::new();
        let mut cycles = Vec::new();

        for node in self.nodes() {
            if colour.get(&node).copied().unwrap_or(Colour::White) == Colour::White {
                self.dfs_cycles(&node, &mut colour, &mut stack, &mut cycles);
            }
        }
        cycles
    }

    fn dfs_cycles(&self, node: &str, colour: &mut HashMap<String, Colour>, stack: &mut Vec<String>, cycles: &mut Vec<Vec<String>>) {
        colour.insert(node.to_string(), Colour::Gray);
        stack.push(node.to_string());

        for succ in self.successors(node) {
            match colour.get(&succ).copied().unwrap_or(Colour::White) {
                Colour::White => self.dfs_cycles(&succ, colour, stack, cycles),
                Colour::Gray => {
                    let start = stack.iter().position(|n| n == &succ).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..].to_vec();
                    cycle.push(succ);
                    cycles.push(cycle);
                }
                Colour::Black => {}
            }
        }

        stack.pop();
        colour.insert(node.to_string(), Colour::Black);
    }

    /// Dependencies before dependents (leaves first). Fails with
    /// [`Error::CircularDependency`] listing every cycle if the graph is
    /// not a DAG.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            return Err(Error::CircularDependency { cycles });
        }

        let mut visited: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut order = Vec::new();

        fn visit(graph: &DependencyGraph, node: &str, visited: &mut std::collections::HashSet<String>, order: &mut Vec<String>) {
            if !visited.insert(node.to_string()) {
                return;
            }
            for succ in graph.successors(node) {
                visit(graph, &succ, visited, order);
            }
            order.push(node.to_string());
        }

        for node in self.nodes() {
            visit(self, &node, &mut visited, &mut order);
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    fn loc() -> Span {
        Span::synthetic()
    }

    #[test]
    fn topological_order_puts_leaves_first() {
        let mut g = DependencyGraph::new();
        g.add_edge("A", "B", loc());
        g.add_edge("B", "C", loc());
        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn cycle_is_detected_and_blocks_topo_order() {
        let mut g = DependencyGraph::new();
        g.add_edge("A", "B", loc());
        g.add_edge("B", "A", loc());
        assert!(g.has_cycles());
        assert!(!g.detect_cycles().is_empty());
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn duplicate_edges_are_preserved() {
        let mut g = DependencyGraph::new();
        g.add_edge("A", "B", loc());
        g.add_edge("A", "B", loc());
        assert_eq!(g.edges.get("A").map(Vec::len), Some(2));
    }

    #[test]
    fn registry_rejects_duplicate_module_name() {
        use crate::ast::Module;
        let mut reg = ModuleRegistry::new();
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![],
            span: Span::synthetic(),
        };
        reg.register("M", module.clone(), Some("a.b65".to_string())).unwrap();
        let err = reg.register("M", module, Some("b.b65".to_string())).unwrap_err();
        assert!(matches!(err, Error::DuplicateModule { .. }));
    }
}
