//! The compilation pipeline orchestrator.
//!
//! Wires every pass together in one direction:
//!
//! ```text
//! AST -> SemanticAnalyzer -> (SymbolTable, CallGraph, CFGs, Types)
//!            -> RecursionChecker (fatal) -> LoopAnalyzer (informational)
//!            -> ILGenerator -> ILModule -> CodeGenerator -> AsmModule
//!            -> AcmeEmitter -> text -> acme -> .prg
//! ```
//!
//! The pipeline aborts at the first pass that produces a fatal diagnostic
//! (a module cycle, an unknown import, a recursive call graph, or a type
//! error) but finishes collecting every diagnostic for the current pass —
//! across every module, not just the first one to fail — before returning.

use std::collections::HashMap;

use crate::acme;
use crate::ast::Module;
use crate::asmil::AsmModule;
use crate::callgraph::{CallGraph, RecursionChecker};
use crate::codegen;
use crate::config::CompileOptions;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{Error, Result};
use crate::globaltable::GlobalSymbolTable;
use crate::il::IlModule;
use crate::ilgen::{self, layout::MapLayout};
use crate::modgraph::{DependencyGraph, ModuleRegistry};
use crate::semantic;

/// One source module handed to [`compile`]: its parsed AST plus an
/// optional file path, used only to make a duplicate-registration
/// diagnostic name both offending locations.
pub struct SourceModule {
    pub name: String,
    pub ast: Module,
    pub file_path: Option<String>,
}

impl SourceModule {
    pub fn new(name: impl Into<String>, ast: Module) -> Self {
        Self {
            name: name.into(),
            ast,
            file_path: None,
        }
    }
}

/// Everything the pipeline produced for one successful compilation.
pub struct CompileResult {
    /// Compile order the modules were linked in (dependencies before
    /// dependents, i.e. leaves first).
    pub compile_order: Vec<String>,
    /// Every non-fatal diagnostic collected across every module (warnings,
    /// info), ordered so diagnostics from the same module stay grouped and
    /// modules appear in compile order.
    pub diagnostics: Vec<Diagnostic>,
    /// The finished ASM-IL, after code generation.
    pub asm_module: AsmModule,
    /// The ACME source text rendered from `asm_module`.
    pub asm_text: String,
    /// The assembled `.prg` bytes, present only if `options.invoke_acme`
    /// was set and the external `acme` process succeeded.
    pub binary: Option<Vec<u8>>,
    /// Set instead of `binary` when `acme` was requested but unavailable
    /// or exited non-zero.
    pub acme_warning: Option<String>,
    /// VICE monitor labels, present only if `options.emit_vice_labels`.
    pub vice_labels: Option<String>,
}

/// Runs the full pipeline over `modules`.
///
/// Registration and dependency-graph construction happen first so a
/// circular import or an import of a module that was never supplied is
/// reported before any (possibly expensive) semantic analysis runs.
/// Modules are then analysed in topological order — dependencies before
/// dependents — so that by the time module `M` is analysed, every module
/// `M` imports has already registered its exported symbols into the
/// shared [`GlobalSymbolTable`].
pub fn compile(modules: Vec<SourceModule>, options: &CompileOptions) -> Result<CompileResult> {
    let mut registry = ModuleRegistry::new();
    let mut dep_graph = DependencyGraph::new();

    for m in &modules {
        registry.register(m.name.clone(), m.ast.clone(), m.file_path.clone())?;
    }
    for m in &modules {
        for import in &m.ast.imports {
            if !registry.has(&import.module) {
                return Err(Error::UnknownModule {
                    name: import.module.clone(),
                });
            }
            dep_graph.add_edge(m.name.clone(), import.module.clone(), import.span);
        }
    }

    let compile_order = full_compile_order(&dep_graph, &registry)?;
    tracing::debug!(modules = ?compile_order, "resolved compile order");

    let sink = DiagnosticSink::new();
    let mut global_table = GlobalSymbolTable::new();
    let mut recursion_diagnostics: Vec<Diagnostic> = Vec::new();
    let mut analyzed_by_module: HashMap<String, (Module, semantic::AnalyzedModule)> = HashMap::new();

    // Pass 1: per-module semantic analysis + recursion check, in
    // dependency order. Every module is analysed even if an earlier one
    // already failed, so the fatal check below can report every affected
    // module at once rather than stopping at the first.
    for name in &compile_order {
        let module = registry.get(name).expect("module in compile order is registered").clone();

        let analyzed = semantic::analyze(&module, &sink, &global_table);

        let call_graph = CallGraph::build(&module);
        let (recursion_diags, _stats) = RecursionChecker::check(&call_graph, name);
        recursion_diagnostics.extend(recursion_diags);

        let exported: Vec<_> = analyzed.scopes.get(analyzed.module_scope).symbols.values().cloned().collect();
        global_table.register_module(name, exported);

        analyzed_by_module.insert(name.clone(), (module, analyzed));
    }

    for d in recursion_diagnostics {
        sink.push(d);
    }

    if sink.has_errors() {
        tracing::warn!(errors = sink.all().len(), "aborting before IL generation: semantic errors or recursion found");
        return Err(Error::Semantic {
            diagnostics: sink.into_sorted(&compile_order),
        });
    }

    // Pass 2: IL generation, merging every module's lowered IL (and `@map`
    // layout) into one whole-program `IlModule` — code generation has no
    // notion of separate modules.
    let mut program = IlModule::new("program");
    let mut map_layout = MapLayout::default();
    for name in &compile_order {
        let (module, analyzed) = analyzed_by_module.get(name).expect("every compiled module was analysed above");
        let il = ilgen::generate(module, analyzed, &sink);
        map_layout.merge(MapLayout::build(module, &analyzed.named_types));
        program.merge(il);
    }

    if sink.has_errors() {
        return Err(Error::Semantic {
            diagnostics: sink.into_sorted(&compile_order),
        });
    }

    // Pass 3: loop analysis. Informational only — nothing downstream
    // consumes the return value yet; running it here keeps the pass
    // ordering stable and gives a place for a future optimizer to plug in
    // without restructuring the driver.
    for function in program.functions.values() {
        let _ = crate::loopanalysis::analyze(function);
    }

    // Pass 4: code generation, ACME emission, optional assembly.
    let asm_module = codegen::generate(&program, &map_layout, options)?;
    let asm_text = acme::emit(&asm_module);

    let (binary, acme_warning) = if options.invoke_acme {
        match acme::assemble(&asm_text, options)? {
            acme::AssembleOutcome::Binary(bytes) => (Some(bytes), None),
            acme::AssembleOutcome::TextOnly { warning } => (None, Some(warning)),
        }
    } else {
        (None, None)
    };

    let vice_labels = options.emit_vice_labels.then(|| crate::asmil::vice::export(&asm_module));

    tracing::info!(
        code_bytes = asm_module.metadata.estimated_code_size,
        data_bytes = asm_module.metadata.estimated_data_size,
        binary = binary.is_some(),
        "compilation finished"
    );

    Ok(CompileResult {
        compile_order: compile_order.clone(),
        diagnostics: sink.into_sorted(&compile_order),
        asm_module,
        asm_text,
        binary,
        acme_warning,
        vice_labels,
    })
}

/// Convenience wrapper around [`compile`] for a driver (CLI, build script)
/// sitting at the very top of the call stack, where `anyhow::Context`'s
/// human-readable chaining is more useful than this crate's own typed
/// [`Error`] — useful at a call site that just wants a human-readable
/// chain of causes rather than matching on error variants. Library code
/// that wants to inspect *which* fatal condition occurred should call
/// [`compile`] directly instead.
pub fn compile_reporting(modules: Vec<SourceModule>, options: &CompileOptions) -> anyhow::Result<CompileResult> {
    use anyhow::Context;
    compile(modules, options).context("blend65 compilation failed")
}

/// `DependencyGraph::topological_order` only knows about modules that
/// appear in at least one edge; a module with no imports and no
/// dependents never does. Append any such module after the graph's own
/// order so every registered module is compiled exactly once.
fn full_compile_order(dep_graph: &DependencyGraph, registry: &ModuleRegistry) -> Result<Vec<String>> {
    let mut order = dep_graph.topological_order()?;
    for name in registry.all_names() {
        if !order.contains(&name) {
            order.push(name);
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, Import, Item, StorageClass};
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    fn module(name: &str, imports: Vec<&str>, items: Vec<Item>) -> Module {
        Module {
            name: name.to_string(),
            imports: imports
                .into_iter()
                .map(|m| Import {
                    module: m.to_string(),
                    span: span(),
                })
                .collect(),
            items,
            span: span(),
        }
    }

    fn main_function(body: Vec<crate::ast::Stmt>) -> Item {
        Item::FunctionDecl {
            name: "main".to_string(),
            params: vec![],
            return_type: None,
            is_exported: true,
            is_interrupt: false,
            body,
            span: span(),
        }
    }

    #[test]
    fn compiles_a_single_module_to_a_prg_bound_asm_module() {
        let m = module("demo", vec![], vec![main_function(vec![])]);
        let options = CompileOptions::text_only();
        let result = compile(vec![SourceModule::new("demo", m)], &options).unwrap();
        assert_eq!(result.compile_order, vec!["demo"]);
        assert!(result.asm_module.labels.contains_key("_main"));
        assert!(result.asm_text.contains("!to \"program.prg\""));
        assert!(result.binary.is_none());
    }

    #[test]
    fn direct_recursion_aborts_before_code_generation() {
        let call_f = ast::call("f", vec![], span());
        let body = vec![crate::ast::Stmt::Return {
            value: Some(call_f),
            span: span(),
        }];
        let f = Item::FunctionDecl {
            name: "f".to_string(),
            params: vec![],
            return_type: Some(ast::TypeExpr::named("byte", span())),
            is_exported: false,
            is_interrupt: false,
            body,
            span: span(),
        };
        let m = module("demo", vec![], vec![f]);
        let options = CompileOptions::text_only();
        let err = compile(vec![SourceModule::new("demo", m)], &options).unwrap_err();
        match err {
            Error::Semantic { diagnostics } => {
                assert!(diagnostics.iter().any(|d| d.code == "DIRECT_RECURSION"));
            }
            other => panic!("expected Error::Semantic, got {other:?}"),
        }
    }

    #[test]
    fn cross_module_export_resolves_in_dependent_module() {
        let helper = Item::FunctionDecl {
            name: "helper".to_string(),
            params: vec![],
            return_type: Some(ast::TypeExpr::named("byte", span())),
            is_exported: true,
            is_interrupt: false,
            body: vec![crate::ast::Stmt::Return {
                value: Some(ast::int_lit(1, span())),
                span: span(),
            }],
            span: span(),
        };
        let a = module("a", vec![], vec![helper]);

        let call_helper = ast::call("helper", vec![], span());
        let b_main = main_function(vec![crate::ast::Stmt::Expression {
            expr: call_helper,
            span: span(),
        }]);
        let b = module("b", vec!["a"], vec![b_main]);

        let options = CompileOptions::text_only();
        let result = compile(vec![SourceModule::new("a", a), SourceModule::new("b", b)], &options).unwrap();
        assert_eq!(result.compile_order, vec!["a", "b"]);
        assert!(result.diagnostics.iter().all(|d| d.severity != crate::diagnostics::Severity::Error));
    }

    #[test]
    fn unknown_import_is_rejected_up_front() {
        let m = module("demo", vec!["missing"], vec![]);
        let options = CompileOptions::text_only();
        let err = compile(vec![SourceModule::new("demo", m)], &options).unwrap_err();
        assert!(matches!(err, Error::UnknownModule { name } if name == "missing"));
    }

    #[test]
    #[allow(unused_must_use)]
    fn unused_storage_class_import_silences_lint() {
        // keeps `StorageClass` imported for future tests in this module
        // without tripping an unused-import warning on its own.
        let _ = StorageClass::None;
    }
}
