//! Call graph construction and the recursion checker.
//!
//! SFA requires every function's stack frame to live at a fixed compile-time
//! address, which is only sound if the call graph is a DAG. This module
//! builds that graph from a module's function bodies and classifies any
//! cycle it finds as direct, mutual, or indirect recursion — all fatal.

use crate::ast::{Expr, Item, Stmt};
use crate::diagnostics::Diagnostic;
use crate::source::Span;
use std::collections::HashMap;

/// One call site: `caller` invokes `callee` at `location`.
#[derive(Debug, Clone)]
pub struct CallEdge {
    pub callee: String,
    pub location: Span,
}

/// `{functions, edges}`: one entry per function, plus every call site.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub functions: HashMap<String, Span>,
    pub edges: HashMap<String, Vec<CallEdge>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// One pass over every function body in `module`: registers each
    /// function and records a `current_function -> callee` edge for every
    /// call expression encountered.
    pub fn build(module: &crate::ast::Module) -> Self {
        let mut graph = Self::new();
        for item in &module.items {
            if let Item::FunctionDecl { name, span, .. } = item {
                graph.functions.insert(name.clone(), *span);
            }
        }
        for item in &module.items {
            if let Item::FunctionDecl { name, body, .. } = item {
                let mut calls = Vec::new();
                for stmt in body {
                    walk_stmt(stmt, &mut calls);
                }
                graph.edges.entry(name.clone()).or_default().extend(calls);
            }
        }
        graph
    }

    fn successors(&self, name: &str) -> Vec<&CallEdge> {
        self.edges.get(name).map(|v| v.iter().collect()).unwrap_or_default()
    }
}

fn walk_stmt(stmt: &Stmt, out: &mut Vec<CallEdge>) {
    match stmt {
        Stmt::VariableDecl { init, .. } => {
            if let Some(e) = init {
                walk_expr(e, out);
            }
        }
        Stmt::If { condition, then_branch, else_branch, .. } => {
            walk_expr(condition, out);
            for s in then_branch {
                walk_stmt(s, out);
            }
            if let Some(else_branch) = else_branch {
                for s in else_branch {
                    walk_stmt(s, out);
                }
            }
        }
        Stmt::While { condition, body, .. } | Stmt::DoWhile { condition, body, .. } => {
            walk_expr(condition, out);
            for s in body {
                walk_stmt(s, out);
            }
        }
        Stmt::For { start, end, step, body, .. } => {
            walk_expr(start, out);
            walk_expr(end, out);
            if let Some(step) = step {
                walk_expr(step, out);
            }
            for s in body {
                walk_stmt(s, out);
            }
        }
        Stmt::Switch { value, cases, default, .. } => {
            walk_expr(value, out);
            for (case_value, case_body) in cases {
                walk_expr(case_value, out);
                for s in case_body {
                    walk_stmt(s, out);
                }
            }
            if let Some(default) = default {
                for s in default {
                    walk_stmt(s, out);
                }
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                walk_expr(e, out);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Expression { expr, .. } => walk_expr(expr, out),
        Stmt::Block { body, .. } => {
            for s in body {
                walk_stmt(s, out);
            }
        }
    }
}

fn walk_expr(expr: &Expr, out: &mut Vec<CallEdge>) {
    match expr {
        Expr::Literal { .. } | Expr::Identifier { .. } => {}
        Expr::Binary { left, right, .. } => {
            walk_expr(left, out);
            walk_expr(right, out);
        }
        Expr::Unary { operand, .. } => walk_expr(operand, out),
        Expr::Call { callee, args, span } => {
            out.push(CallEdge {
                callee: callee.clone(),
                location: *span,
            });
            for a in args {
                walk_expr(a, out);
            }
        }
        Expr::Member { base, .. } => walk_expr(base, out),
        Expr::Index { base, index, .. } => {
            walk_expr(base, out);
            walk_expr(index, out);
        }
        Expr::Assignment { target, value, .. } => {
            walk_expr(target, out);
            walk_expr(value, out);
        }
        Expr::ArrayLiteral { elements, .. } => {
            for e in elements {
                walk_expr(e, out);
            }
        }
        Expr::Ternary { condition, then_value, else_value, .. } => {
            walk_expr(condition, out);
            walk_expr(then_value, out);
            walk_expr(else_value, out);
        }
    }
}

/// Classification of a recursive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionKind {
    /// A function calls itself directly.
    Direct,
    /// A 2-cycle between two distinct functions.
    Mutual,
    /// A cycle of length 3 or more.
    Indirect,
}

/// One reported cycle.
#[derive(Debug, Clone)]
pub struct RecursionReport {
    pub kind: RecursionKind,
    pub function: String,
    pub function_location: Span,
    pub first_call_site: Span,
    pub cycle_path: Vec<String>,
}

/// Aggregate statistics from one recursion check.
#[derive(Debug, Clone, Default)]
pub struct RecursionStats {
    pub functions_analyzed: usize,
    pub direct_recursion_count: usize,
    pub indirect_cycle_count: usize,
    pub total_recursive_functions: usize,
}

/// Finds every cycle in a [`CallGraph`] via DFS and classifies it.
///
/// Uses the same DFS-colouring shape as
/// [`crate::modgraph::DependencyGraph::detect_cycles`], extended to
/// distinguish self-loops (direct), 2-cycles (mutual), and longer cycles
/// (indirect).
pub struct RecursionChecker;

impl RecursionChecker {
    /// Checks `graph` and returns one [`Diagnostic`] per cycle found, plus
    /// aggregate statistics. An empty diagnostic vec means the graph is a
    /// DAG and SFA is safe.
    pub fn check(graph: &CallGraph, module: &str) -> (Vec<Diagnostic>, RecursionStats) {
        let mut stats = RecursionStats {
            functions_analyzed: graph.functions.len(),
            ..Default::default()
        };

        let mut names: Vec<&String> = graph.functions.keys().collect();
        names.sort();

        let mut diagnostics = Vec::new();
        let mut recursive_functions = std::collections::HashSet::new();

        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Colour {
            White,
            Gray,
            Black,
        }
        let mut colour: HashMap<String, Colour> = names.iter().map(|n| ((*n).clone(), Colour::White)).collect();
        let mut stack: Vec<String> = Vec::new();
        let mut cycles: Vec<Vec<String>> = Vec::new();

        fn dfs(
            graph: &CallGraph,
            node: &str,
            colour: &mut HashMap<String, Colour>,
            stack: &mut Vec<String>,
            cycles: &mut Vec<Vec<String>>,
        ) {
            colour.insert(node.to_string(), Colour::Gray);
            stack.push(node.to_string());
            for edge in graph.successors(node) {
                match colour.get(&edge.callee).copied().unwrap_or(Colour::White) {
                    Colour::White => {
                        if graph.functions.contains_key(&edge.callee) {
                            dfs(graph, &edge.callee, colour, stack, cycles);
                        }
                    }
                    Colour::Gray => {
                        let start = stack.iter().position(|n| n == &edge.callee).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..].to_vec();
                        cycle.push(edge.callee.clone());
                        cycles.push(cycle);
                    }
                    Colour::Black => {}
                }
            }
            stack.pop();
            colour.insert(node.to_string(), Colour::Black);
        }

        for name in &names {
            if colour.get(*name).copied().unwrap_or(Colour::White) == Colour::White {
                dfs(graph, name, &mut colour, &mut stack, &mut cycles);
            }
        }

        for mut cycle in cycles {
            // Canonicalize: rotate so the lexicographically first function leads,
            // except for a direct self-loop (`[f, f]`), which is already canonical.
            let distinct_len = cycle.len() - 1;
            if distinct_len > 1 {
                let min_pos = cycle[..distinct_len]
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, n)| n.as_str())
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                let mut rotated: Vec<String> = cycle[min_pos..distinct_len].to_vec();
                rotated.extend_from_slice(&cycle[..min_pos]);
                rotated.push(rotated[0].clone());
                cycle = rotated;
            }

            let kind = match distinct_len {
                1 => RecursionKind::Direct,
                2 => RecursionKind::Mutual,
                _ => RecursionKind::Indirect,
            };
            let function = cycle[0].clone();
            let function_location = graph.functions.get(&function).copied().unwrap_or_else(Span::synthetic);
            let first_call_site = graph
                .edges
                .get(&function)
                .and_then(|edges| edges.iter().find(|e| e.callee == cycle[1]))
                .map(|e| e.location)
                .unwrap_or_else(Span::synthetic);

            for f in &cycle[..distinct_len] {
                recursive_functions.insert(f.clone());
            }

            match kind {
                RecursionKind::Direct => stats.direct_recursion_count += 1,
                RecursionKind::Mutual | RecursionKind::Indirect => stats.indirect_cycle_count += 1,
            }

            let code = match kind {
                RecursionKind::Direct => "DIRECT_RECURSION",
                RecursionKind::Mutual => "MUTUAL_RECURSION",
                RecursionKind::Indirect => "INDIRECT_RECURSION",
            };
            let message = format!(
                "function `{function}` participates in a recursive cycle ({}); Static Frame Allocation requires the call graph to be a DAG because every stack frame is assigned a fixed address at compile time",
                cycle.join(" -> ")
            );
            diagnostics.push(
                Diagnostic::error(code, message, function_location, module)
                    .with_related("first recursive call site", first_call_site),
            );
        }

        stats.total_recursive_functions = recursive_functions.len();
        (diagnostics, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, BinaryOp, Item, Module};
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    fn function(name: &str, body: Vec<Stmt>) -> Item {
        Item::FunctionDecl {
            name: name.to_string(),
            params: vec![],
            return_type: None,
            is_exported: false,
            is_interrupt: false,
            body,
            span: span(),
        }
    }

    #[test]
    fn direct_recursion_is_reported() {
        let call_f = ast::call("f", vec![], span());
        let body = vec![Stmt::Return {
            value: Some(ast::binary(BinaryOp::Add, call_f, ast::int_lit(1, span()), span())),
            span: span(),
        }];
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![function("f", body)],
            span: span(),
        };
        let graph = CallGraph::build(&module);
        let (diags, stats) = RecursionChecker::check(&graph, "M");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "DIRECT_RECURSION");
        assert!(diags[0].message.contains("Static Frame Allocation"));
        assert_eq!(stats.direct_recursion_count, 1);
        assert_eq!(stats.total_recursive_functions, 1);
    }

    #[test]
    fn mutual_recursion_between_two_functions() {
        let a_body = vec![Stmt::Expression {
            expr: ast::call("b", vec![], span()),
            span: span(),
        }];
        let b_body = vec![Stmt::Expression {
            expr: ast::call("a", vec![], span()),
            span: span(),
        }];
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![function("a", a_body), function("b", b_body)],
            span: span(),
        };
        let graph = CallGraph::build(&module);
        let (diags, stats) = RecursionChecker::check(&graph, "M");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "MUTUAL_RECURSION");
        assert_eq!(stats.total_recursive_functions, 2);
    }

    #[test]
    fn non_recursive_graph_has_no_cycles() {
        let a_body = vec![Stmt::Expression {
            expr: ast::call("b", vec![], span()),
            span: span(),
        }];
        let module = Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![function("a", a_body), function("b", vec![])],
            span: span(),
        };
        let graph = CallGraph::build(&module);
        let (diags, stats) = RecursionChecker::check(&graph, "M");
        assert!(diags.is_empty());
        assert_eq!(stats.total_recursive_functions, 0);
        assert_eq!(stats.functions_analyzed, 2);
    }
}
