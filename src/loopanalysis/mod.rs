//! Control-flow analysis: dominance, natural loops, loop invariants and
//! induction variables. Informational — consumed by
//! diagnostics and future optimization passes, never required for a
//! correct lowering.

pub mod dominators;
pub mod induction;
pub mod invariants;
pub mod natural_loops;

pub use dominators::{compute as compute_dominance, Dominance};
pub use induction::{compute as compute_induction_variables, BasicInductionVar, DerivedInductionVar, InductionVariables};
pub use invariants::compute as compute_invariants;
pub use natural_loops::{find_natural_loops, Loop};

/// Runs every loop analysis in `function` and reports the result per loop,
/// in header-order.
pub struct LoopAnalysisResult {
    pub dominance: Dominance,
    pub loops: Vec<LoopInfo>,
}

pub struct LoopInfo {
    pub loop_: Loop,
    pub invariant_instructions: std::collections::HashSet<u32>,
    pub induction_variables: InductionVariables,
}

pub fn analyze(function: &crate::il::IlFunction) -> LoopAnalysisResult {
    let dominance = compute_dominance(function);
    let loops = find_natural_loops(function, &dominance);
    let loops = loops
        .into_iter()
        .map(|loop_| {
            let invariant_instructions = compute_invariants(function, &loop_);
            let induction_variables = compute_induction_variables(function, &loop_);
            LoopInfo {
                loop_,
                invariant_instructions,
                induction_variables,
            }
        })
        .collect();
    LoopAnalysisResult { dominance, loops }
}
