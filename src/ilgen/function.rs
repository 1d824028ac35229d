//! AST -> SSA IL lowering for one function body.
//!
//! Locals are lowered directly to virtual registers rather than memory
//! slots: every `let`/assignment rebinds a name to a fresh SSA value in a
//! per-scope environment (`Env`), and control-flow joins (`if`/`while`/
//! `for`/`switch`) insert PHI nodes only for names whose value actually
//! differs across the join's incoming edges (a name unmodified by a branch
//! keeps its single incoming value unchanged, with no redundant PHI). Loop
//! headers use the standard incomplete-PHI technique: the PHI is created
//! with only the preheader edge before the body is lowered, then patched
//! with the back edge(s) — including every `continue`'s edge — once they're
//! known, since a loop body's own exit point isn't known until it's lowered.
//!
//! Known simplification: a `break` taken mid-body carries whatever values
//! were live at that point straight to the loop's exit block without a
//! merge PHI, so code after the loop always reads the *header's*
//! (normal-exit) values rather than a value merged across every break site.
//! Real-world Blend65 functions rarely mutate a loop-carried variable right
//! before breaking, so this trades a rare precision gap for a simpler
//! lowering; `codegen`'s output is still correct in the straight-line case
//! and any innocuous break.

use std::collections::{HashMap, HashSet};

use crate::ast::{BinaryOp, Expr, Literal, Param, Stmt, UnaryOp};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::il::{BlockId, IlFunction, IlType, IlValue, Instruction, InstructionMetadata, VReg};
use crate::source::Span;
use crate::symbols::{ScopeArena, ScopeId};
use crate::typesys::{self, Type};

use super::consts::ConstEnv;
use super::layout::MapLayout;
use crate::semantic::NamedTypes;

type Env = HashMap<String, IlValue>;

struct LoopContext {
    header: BlockId,
    exit: BlockId,
    phi_ids: HashMap<String, u32>,
    /// `continue` edges collected while lowering the body; folded into the
    /// header PHIs alongside the natural back edge once the body is done.
    latch_edges: Vec<(BlockId, Env)>,
}

pub struct FunctionLowering<'a> {
    function: IlFunction,
    scopes: &'a ScopeArena,
    consts: &'a ConstEnv,
    named_types: &'a NamedTypes,
    map_layout: &'a MapLayout,
    sink: &'a DiagnosticSink,
    module: &'a str,
    loop_stack: Vec<LoopContext>,
}

impl<'a> FunctionLowering<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        param_types: Vec<IlType>,
        return_type: IlType,
        is_interrupt: bool,
        scopes: &'a ScopeArena,
        consts: &'a ConstEnv,
        named_types: &'a NamedTypes,
        map_layout: &'a MapLayout,
        sink: &'a DiagnosticSink,
        module: &'a str,
    ) -> Self {
        Self {
            function: IlFunction::new(name, param_types, return_type, is_interrupt),
            scopes,
            consts,
            named_types,
            map_layout,
            sink,
            module,
            loop_stack: Vec::new(),
        }
    }

    pub fn finish(self) -> IlFunction {
        self.function
    }

    pub fn lower_body(&mut self, fn_scope: ScopeId, params: &[Param], body: &[Stmt]) {
        let mut env = Env::new();
        let param_types = self.function.param_types.clone();
        for (i, param) in params.iter().enumerate() {
            let reg = self.function.fresh_vreg(param_types[i]);
            env.insert(param.name.clone(), IlValue::Register(reg));
        }
        let mut block = self.function.entry_block_id;
        let mut cursor = 0usize;
        self.lower_block(fn_scope, body, &mut block, &mut env, &mut cursor);
        if !self.function.block(block).has_terminator() {
            let ret_type = self.function.return_type;
            let id = self.function.fresh_instruction_id();
            if ret_type == IlType::Void {
                self.function.block_mut(block).terminate(id, Instruction::ReturnVoid, InstructionMetadata::default());
            } else {
                // The analyzer already reported MISSING_RETURN_VALUE; keep the
                // IL well-formed with a best-effort zero return.
                self.function.block_mut(block).terminate(
                    id,
                    Instruction::Return {
                        value: IlValue::Constant { ty: ret_type, value: 0 },
                    },
                    InstructionMetadata::default(),
                );
            }
        }
    }

    fn next_child(&self, scope: ScopeId, cursor: &mut usize) -> ScopeId {
        let child = self.scopes.get(scope).children[*cursor];
        *cursor += 1;
        child
    }

    fn terminate_jump(&mut self, from: BlockId, to: BlockId) {
        if !self.function.block(from).has_terminator() {
            let id = self.function.fresh_instruction_id();
            self.function.block_mut(from).terminate(id, Instruction::Jump { target: to }, InstructionMetadata::default());
            self.function.connect(from, to);
        }
    }

    /// Attaches `name` to `value`'s defining instruction if it is a
    /// freshly computed, still-unnamed register, so later passes (e.g.
    /// induction variable recognition) can key off the source variable's
    /// name instead of a bare register id. No-op for constants, globals,
    /// parameters, or a register some other binding already named.
    fn name_result(&mut self, block: BlockId, value: IlValue, name: &str) -> IlValue {
        let IlValue::Register(reg) = &value else {
            return value;
        };
        if reg.name.is_some() {
            return value;
        }
        let id = reg.id;
        let ty = reg.ty;
        if let Some(result) = self
            .function
            .block_mut(block)
            .instructions
            .iter_mut()
            .rev()
            .find_map(|r| r.instruction.result_mut().filter(|v| v.id == id))
        {
            result.name = Some(name.to_string());
        }
        IlValue::Register(VReg { id, ty, name: Some(name.to_string()) })
    }

    fn il_type_of(&self, value: &IlValue) -> IlType {
        match value {
            IlValue::Constant { ty, .. } => *ty,
            IlValue::Register(r) => r.ty,
            IlValue::Global { .. } | IlValue::Label { .. } => IlType::Word,
            IlValue::Parameter { index } => *self.function.param_types.get(*index as usize).unwrap_or(&IlType::Word),
        }
    }

    fn widen(&self, a: IlType, b: IlType) -> IlType {
        if a == IlType::Word || b == IlType::Word {
            IlType::Word
        } else {
            a
        }
    }

    /// Collapses an incoming-edge list to a single value: no PHI if there's
    /// only one edge or every edge already agrees, otherwise a fresh PHI at
    /// `merge_block`.
    fn merge_values(&mut self, merge_block: BlockId, incoming: Vec<(BlockId, IlValue)>, ty: IlType) -> IlValue {
        if incoming.is_empty() {
            return IlValue::Constant { ty, value: 0 };
        }
        if incoming.len() == 1 {
            return incoming[0].1.clone();
        }
        let first = incoming[0].1.clone();
        if incoming.iter().all(|(_, v)| *v == first) {
            return first;
        }
        let result = self.function.fresh_vreg(ty);
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(merge_block).push_phi(id, Instruction::Phi { result: result.clone(), incoming }, InstructionMetadata::default());
        IlValue::Register(result)
    }

    // ---- statements ----------------------------------------------------

    fn lower_block(&mut self, scope: ScopeId, stmts: &[Stmt], block: &mut BlockId, env: &mut Env, cursor: &mut usize) {
        for stmt in stmts {
            if self.function.block(*block).has_terminator() {
                break;
            }
            self.lower_stmt(scope, stmt, block, env, cursor);
        }
    }

    fn lower_stmt(&mut self, scope: ScopeId, stmt: &Stmt, block: &mut BlockId, env: &mut Env, cursor: &mut usize) {
        match stmt {
            Stmt::VariableDecl { name, init, .. } => {
                let sym_ty = self.scopes.lookup_local(scope, name).map(|s| s.ty.clone()).unwrap_or(Type::Unresolved);
                let il_ty = if sym_ty == Type::Unresolved { IlType::Word } else { IlType::from_source_type(&sym_ty) };
                let value = match init {
                    Some(expr) => {
                        let v = self.lower_expr(scope, expr, block, env);
                        self.name_result(*block, v, name)
                    }
                    None => IlValue::Constant { ty: il_ty, value: 0 },
                };
                env.insert(name.clone(), value);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => self.lower_if(scope, condition, then_branch, else_branch.as_deref(), *span, block, env, cursor),
            Stmt::While { condition, body, .. } => self.lower_while(scope, condition, body, block, env, cursor),
            Stmt::DoWhile { body, condition, .. } => self.lower_do_while(scope, body, condition, block, env, cursor),
            Stmt::For {
                counter, start, end, step, body, ..
            } => self.lower_for(scope, counter, start, end, step.as_ref(), body, block, env, cursor),
            Stmt::Switch { value, cases, default, .. } => self.lower_switch(scope, value, cases, default.as_deref(), block, env, cursor),
            Stmt::Return { value, .. } => {
                let val = value.as_ref().map(|e| self.lower_expr(scope, e, block, env));
                let id = self.function.fresh_instruction_id();
                match val {
                    Some(v) => self.function.block_mut(*block).terminate(id, Instruction::Return { value: v }, InstructionMetadata::default()),
                    None => self.function.block_mut(*block).terminate(id, Instruction::ReturnVoid, InstructionMetadata::default()),
                }
            }
            Stmt::Break { .. } => {
                if let Some(exit) = self.loop_stack.last().map(|c| c.exit) {
                    let id = self.function.fresh_instruction_id();
                    self.function.block_mut(*block).terminate(id, Instruction::Jump { target: exit }, InstructionMetadata::default());
                    self.function.connect(*block, exit);
                }
            }
            Stmt::Continue { .. } => {
                if let Some(header) = self.loop_stack.last().map(|c| c.header) {
                    let id = self.function.fresh_instruction_id();
                    self.function.block_mut(*block).terminate(id, Instruction::Jump { target: header }, InstructionMetadata::default());
                    self.function.connect(*block, header);
                    self.loop_stack.last_mut().unwrap().latch_edges.push((*block, env.clone()));
                }
            }
            Stmt::Expression { expr, .. } => {
                self.lower_expr(scope, expr, block, env);
            }
            Stmt::Block { body, .. } => {
                let block_scope = self.next_child(scope, cursor);
                let pre_keys: HashSet<String> = env.keys().cloned().collect();
                let mut inner_cursor = 0usize;
                self.lower_block(block_scope, body, block, env, &mut inner_cursor);
                env.retain(|k, _| pre_keys.contains(k));
            }
        }
    }

    fn lower_if(
        &mut self,
        scope: ScopeId,
        condition: &Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
        span: Span,
        block: &mut BlockId,
        env: &mut Env,
        cursor: &mut usize,
    ) {
        let cond_val = self.lower_expr(scope, condition, block, env);
        let then_block = self.function.new_block("if_then");
        let else_block = self.function.new_block("if_else");
        let merge_block = self.function.new_block("if_merge");
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(*block).terminate(
            id,
            Instruction::Branch {
                condition: cond_val,
                then_block,
                else_block,
            },
            InstructionMetadata { location: Some(span), ..Default::default() },
        );
        self.function.connect(*block, then_block);
        self.function.connect(*block, else_block);

        let then_scope = self.next_child(scope, cursor);
        let mut then_env = env.clone();
        let mut then_cur = then_block;
        self.lower_block(then_scope, then_branch, &mut then_cur, &mut then_env, &mut 0usize);
        let then_reached = !self.function.block(then_cur).has_terminator();
        self.terminate_jump(then_cur, merge_block);

        let mut else_env = env.clone();
        let mut else_cur = else_block;
        if let Some(else_branch) = else_branch {
            let else_scope = self.next_child(scope, cursor);
            self.lower_block(else_scope, else_branch, &mut else_cur, &mut else_env, &mut 0usize);
        }
        let else_reached = !self.function.block(else_cur).has_terminator();
        self.terminate_jump(else_cur, merge_block);

        let mut candidates: HashSet<String> = assigned_names(then_branch);
        if let Some(else_branch) = else_branch {
            candidates.extend(assigned_names(else_branch));
        }
        candidates.retain(|n| env.contains_key(n));

        let mut merged_env = env.clone();
        for name in candidates {
            let base = env[&name].clone();
            let ty = self.il_type_of(&base);
            let mut incoming = Vec::new();
            if then_reached {
                incoming.push((then_cur, then_env.get(&name).cloned().unwrap_or_else(|| base.clone())));
            }
            if else_reached {
                incoming.push((else_cur, else_env.get(&name).cloned().unwrap_or_else(|| base.clone())));
            }
            let merged = self.merge_values(merge_block, incoming, ty);
            merged_env.insert(name, merged);
        }
        *env = merged_env;
        *block = merge_block;
    }

    fn lower_while(&mut self, scope: ScopeId, condition: &Expr, body: &[Stmt], block: &mut BlockId, env: &mut Env, cursor: &mut usize) {
        let mut candidates: Vec<String> = assigned_names(body).into_iter().filter(|n| env.contains_key(n)).collect();
        candidates.sort();
        let preheader = *block;
        let header = self.function.new_block("while_header");
        self.terminate_jump(preheader, header);

        let (mut header_env, phi_ids) = self.seed_header_phis(header, preheader, env, &candidates);

        let mut cond_block = header;
        let cond_val = self.lower_expr(scope, condition, &mut cond_block, &mut header_env);
        let body_block = self.function.new_block("while_body");
        let exit_block = self.function.new_block("while_exit");
        let bid = self.function.fresh_instruction_id();
        self.function.block_mut(cond_block).terminate(
            bid,
            Instruction::Branch {
                condition: cond_val,
                then_block: body_block,
                else_block: exit_block,
            },
            InstructionMetadata::default(),
        );
        self.function.connect(cond_block, body_block);
        self.function.connect(cond_block, exit_block);

        let loop_scope = self.next_child(scope, cursor);
        self.loop_stack.push(LoopContext {
            header,
            exit: exit_block,
            phi_ids,
            latch_edges: Vec::new(),
        });
        let mut body_env = header_env.clone();
        let mut body_cur = body_block;
        self.lower_block(loop_scope, body, &mut body_cur, &mut body_env, &mut 0usize);
        let natural = !self.function.block(body_cur).has_terminator();
        self.terminate_jump(body_cur, header);
        let ctx = self.loop_stack.pop().unwrap();
        self.patch_header_phis(header, preheader, env, &header_env, &candidates, &ctx, natural, body_cur, &body_env);

        *block = exit_block;
        for name in &candidates {
            env.insert(name.clone(), header_env.remove(name).unwrap());
        }
    }

    fn lower_do_while(&mut self, scope: ScopeId, body: &[Stmt], condition: &Expr, block: &mut BlockId, env: &mut Env, cursor: &mut usize) {
        let mut candidates: Vec<String> = assigned_names(body).into_iter().filter(|n| env.contains_key(n)).collect();
        candidates.sort();
        let preheader = *block;
        let header = self.function.new_block("dowhile_header");
        self.terminate_jump(preheader, header);

        let (header_env, phi_ids) = self.seed_header_phis(header, preheader, env, &candidates);

        let loop_scope = self.next_child(scope, cursor);
        self.loop_stack.push(LoopContext {
            header,
            exit: self.function.new_block("dowhile_exit"),
            phi_ids,
            latch_edges: Vec::new(),
        });
        let exit_block = self.loop_stack.last().unwrap().exit;

        let mut body_env = header_env.clone();
        let mut body_cur = header;
        self.lower_block(loop_scope, body, &mut body_cur, &mut body_env, &mut 0usize);
        let natural = !self.function.block(body_cur).has_terminator();
        if natural {
            let cond_val = self.lower_expr(scope, condition, &mut body_cur, &mut body_env);
            let id = self.function.fresh_instruction_id();
            self.function.block_mut(body_cur).terminate(
                id,
                Instruction::Branch {
                    condition: cond_val,
                    then_block: header,
                    else_block: exit_block,
                },
                InstructionMetadata::default(),
            );
            self.function.connect(body_cur, header);
            self.function.connect(body_cur, exit_block);
        }
        let ctx = self.loop_stack.pop().unwrap();
        self.patch_header_phis(header, preheader, env, &header_env, &candidates, &ctx, natural, body_cur, &body_env);

        *block = exit_block;
        for name in &candidates {
            env.insert(name.clone(), body_env.get(name).cloned().unwrap_or_else(|| header_env[name].clone()));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_for(
        &mut self,
        scope: ScopeId,
        counter: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &[Stmt],
        block: &mut BlockId,
        env: &mut Env,
        cursor: &mut usize,
    ) {
        let start_val = self.lower_expr(scope, start, block, env);
        let counter_ty = self.il_type_of(&start_val);
        env.insert(counter.to_string(), start_val);
        let end_val = self.lower_expr(scope, end, block, env);
        let step_val = match step {
            Some(s) => self.lower_expr(scope, s, block, env),
            None => IlValue::Constant { ty: counter_ty, value: 1 },
        };

        let mut candidates: Vec<String> = assigned_names(body).into_iter().filter(|n| env.contains_key(n)).collect();
        if !candidates.contains(&counter.to_string()) {
            candidates.push(counter.to_string());
        }
        candidates.sort();

        let preheader = *block;
        let header = self.function.new_block("for_header");
        self.terminate_jump(preheader, header);

        let (mut header_env, phi_ids) = self.seed_header_phis(header, preheader, env, &candidates);

        let cond_reg = self.function.fresh_vreg(IlType::Bool);
        let cid = self.function.fresh_instruction_id();
        self.function.block_mut(header).push(
            cid,
            Instruction::CmpLt {
                result: cond_reg.clone(),
                a: header_env[counter].clone(),
                b: end_val,
            },
            InstructionMetadata::default(),
        );
        let body_block = self.function.new_block("for_body");
        let exit_block = self.function.new_block("for_exit");
        let bid = self.function.fresh_instruction_id();
        self.function.block_mut(header).terminate(
            bid,
            Instruction::Branch {
                condition: IlValue::Register(cond_reg),
                then_block: body_block,
                else_block: exit_block,
            },
            InstructionMetadata::default(),
        );
        self.function.connect(header, body_block);
        self.function.connect(header, exit_block);

        let loop_scope = self.next_child(scope, cursor);
        self.loop_stack.push(LoopContext {
            header,
            exit: exit_block,
            phi_ids,
            latch_edges: Vec::new(),
        });
        let mut body_env = header_env.clone();
        let mut body_cur = body_block;
        self.lower_block(loop_scope, body, &mut body_cur, &mut body_env, &mut 0usize);
        let natural = !self.function.block(body_cur).has_terminator();
        if natural {
            let cur = body_env[counter].clone();
            let incr = self.function.fresh_vreg(counter_ty);
            let iid = self.function.fresh_instruction_id();
            self.function.block_mut(body_cur).push(
                iid,
                Instruction::Add {
                    result: incr.clone(),
                    a: cur,
                    b: step_val,
                },
                InstructionMetadata::default(),
            );
            body_env.insert(counter.to_string(), IlValue::Register(incr));
        }
        self.terminate_jump(body_cur, header);
        let ctx = self.loop_stack.pop().unwrap();
        self.patch_header_phis(header, preheader, env, &header_env, &candidates, &ctx, natural, body_cur, &body_env);

        *block = exit_block;
        for name in &candidates {
            env.insert(name.clone(), header_env.remove(name).unwrap());
        }
    }

    /// Creates an incomplete PHI (preheader edge only) in `header` for every
    /// candidate name, returning the loop-entry environment that reads from
    /// those PHIs.
    fn seed_header_phis(&mut self, header: BlockId, preheader: BlockId, env: &Env, candidates: &[String]) -> (Env, HashMap<String, u32>) {
        let mut header_env = env.clone();
        let mut phi_ids = HashMap::new();
        for name in candidates {
            let ty = self.il_type_of(&env[name]);
            let mut reg = self.function.fresh_vreg(ty);
            reg.name = Some(name.clone());
            let iid = self.function.fresh_instruction_id();
            self.function.block_mut(header).push_phi(
                iid,
                Instruction::Phi {
                    result: reg.clone(),
                    incoming: vec![(preheader, env[name].clone())],
                },
                InstructionMetadata::default(),
            );
            phi_ids.insert(name.clone(), iid);
            header_env.insert(name.clone(), IlValue::Register(reg));
        }
        (header_env, phi_ids)
    }

    /// Patches every header PHI's incoming list with the preheader edge plus
    /// every latch edge (the natural fallthrough, if reachable, and every
    /// `continue`).
    #[allow(clippy::too_many_arguments)]
    fn patch_header_phis(
        &mut self,
        header: BlockId,
        preheader: BlockId,
        pre_env: &Env,
        header_env: &Env,
        candidates: &[String],
        ctx: &LoopContext,
        natural: bool,
        body_cur: BlockId,
        body_env: &Env,
    ) {
        let mut latch_edges = ctx.latch_edges.clone();
        if natural {
            latch_edges.push((body_cur, body_env.clone()));
        }
        for name in candidates {
            let mut incoming = vec![(preheader, pre_env[name].clone())];
            for (b, e) in &latch_edges {
                incoming.push((*b, e.get(name).cloned().unwrap_or_else(|| header_env[name].clone())));
            }
            self.function.block_mut(header).patch_phi_incoming(ctx.phi_ids[name], incoming);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_switch(
        &mut self,
        scope: ScopeId,
        value: &Expr,
        cases: &[(Expr, Vec<Stmt>)],
        default: Option<&[Stmt]>,
        block: &mut BlockId,
        env: &mut Env,
        cursor: &mut usize,
    ) {
        let value_val = self.lower_expr(scope, value, block, env);
        let value_ty = self.il_type_of(&value_val);
        let merge_block = self.function.new_block("switch_merge");
        let mut test_block = *block;
        let mut reached: Vec<(BlockId, Env)> = Vec::new();
        let mut candidates: HashSet<String> = HashSet::new();

        for (case_expr, case_body) in cases {
            candidates.extend(assigned_names(case_body));
            let case_val = self.lower_expr(scope, case_expr, &mut test_block, env);
            let case_block = self.function.new_block("switch_case");
            let next_block = self.function.new_block("switch_next");
            let cmp = self.function.fresh_vreg(IlType::Bool);
            let cid = self.function.fresh_instruction_id();
            self.function.block_mut(test_block).push(
                cid,
                Instruction::CmpEq {
                    result: cmp.clone(),
                    a: value_val.clone(),
                    b: case_val,
                },
                InstructionMetadata::default(),
            );
            let bid = self.function.fresh_instruction_id();
            self.function.block_mut(test_block).terminate(
                bid,
                Instruction::Branch {
                    condition: IlValue::Register(cmp),
                    then_block: case_block,
                    else_block: next_block,
                },
                InstructionMetadata::default(),
            );
            self.function.connect(test_block, case_block);
            self.function.connect(test_block, next_block);

            let case_scope = self.next_child(scope, cursor);
            let mut case_env = env.clone();
            let mut case_cur = case_block;
            self.lower_block(case_scope, case_body, &mut case_cur, &mut case_env, &mut 0usize);
            if !self.function.block(case_cur).has_terminator() {
                self.terminate_jump(case_cur, merge_block);
                reached.push((case_cur, case_env));
            }
            test_block = next_block;
        }

        if let Some(default_body) = default {
            candidates.extend(assigned_names(default_body));
            let default_scope = self.next_child(scope, cursor);
            let mut default_env = env.clone();
            let mut default_cur = test_block;
            self.lower_block(default_scope, default_body, &mut default_cur, &mut default_env, &mut 0usize);
            if !self.function.block(default_cur).has_terminator() {
                self.terminate_jump(default_cur, merge_block);
                reached.push((default_cur, default_env));
            }
        } else {
            self.terminate_jump(test_block, merge_block);
            reached.push((test_block, env.clone()));
        }

        candidates.retain(|n| env.contains_key(n));
        let mut merged_env = env.clone();
        for name in candidates {
            let base = env[&name].clone();
            let ty = self.il_type_of(&base);
            let incoming: Vec<(BlockId, IlValue)> = reached.iter().map(|(b, e)| (*b, e.get(&name).cloned().unwrap_or_else(|| base.clone()))).collect();
            let merged = self.merge_values(merge_block, incoming, ty);
            merged_env.insert(name, merged);
        }
        let _ = value_ty;
        *env = merged_env;
        *block = merge_block;
    }

    // ---- expressions -----------------------------------------------------

    fn lower_expr(&mut self, scope: ScopeId, expr: &Expr, block: &mut BlockId, env: &mut Env) -> IlValue {
        match expr {
            Expr::Literal { value, .. } => lower_literal(value),
            Expr::Identifier { name, .. } => self.lower_identifier(scope, name, block, env),
            Expr::Binary { op, left, right, span } => self.lower_binary(scope, *op, left, right, *span, block, env),
            Expr::Unary { op, operand, span } => self.lower_unary(scope, *op, operand, *span, block, env),
            Expr::Call { callee, args, span } => self.lower_call(scope, callee, args, *span, block, env),
            Expr::Member { base, field, span } => self.lower_member_read(scope, base, field, *span, block, env),
            Expr::Index { base, index, span } => self.lower_index_read(scope, base, index, *span, block, env),
            Expr::Assignment { target, value, span } => self.lower_assignment(scope, target, value, *span, block, env),
            Expr::ArrayLiteral { span, .. } => {
                self.sink.push(Diagnostic::error(
                    "UNSUPPORTED_CONSTRUCT",
                    "array literals are only lowered as a `@data` global initializer",
                    *span,
                    self.module,
                ));
                IlValue::const_word(0)
            }
            Expr::Ternary {
                condition,
                then_value,
                else_value,
                span,
            } => self.lower_ternary(scope, condition, then_value, else_value, *span, block, env),
        }
    }

    fn lower_identifier(&mut self, scope: ScopeId, name: &str, block: &mut BlockId, env: &Env) -> IlValue {
        if let Some(v) = env.get(name) {
            return v.clone();
        }
        if let Some(v) = self.consts.lookup(name) {
            let ty = if typesys::fits_in_byte(v) { IlType::Byte } else { IlType::Word };
            return IlValue::Constant { ty, value: v };
        }
        let ty = self
            .scopes
            .lookup_chain(scope, name)
            .map(|s| if s.ty == Type::Unresolved { IlType::Word } else { IlType::from_source_type(&s.ty) })
            .unwrap_or(IlType::Word);
        let result = self.function.fresh_vreg(ty);
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(*block).push(
            id,
            Instruction::LoadGlobal {
                result: result.clone(),
                name: name.to_string(),
            },
            InstructionMetadata::default(),
        );
        IlValue::Register(result)
    }

    fn lower_binary(&mut self, scope: ScopeId, op: BinaryOp, left: &Expr, right: &Expr, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
            return self.lower_short_circuit(scope, op == BinaryOp::LogicalAnd, left, right, block, env);
        }
        let a = self.lower_expr(scope, left, block, env);
        let b = self.lower_expr(scope, right, block, env);
        let is_compare = matches!(op, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge);
        let result_ty = if is_compare { IlType::Bool } else { self.widen(self.il_type_of(&a), self.il_type_of(&b)) };
        let result = self.function.fresh_vreg(result_ty);
        let instr = match op {
            BinaryOp::Add => Instruction::Add { result: result.clone(), a, b },
            BinaryOp::Sub => Instruction::Sub { result: result.clone(), a, b },
            BinaryOp::Mul => Instruction::Mul { result: result.clone(), a, b },
            BinaryOp::Div => Instruction::Div { result: result.clone(), a, b },
            BinaryOp::Mod => Instruction::Mod { result: result.clone(), a, b },
            BinaryOp::And => Instruction::And { result: result.clone(), a, b },
            BinaryOp::Or => Instruction::Or { result: result.clone(), a, b },
            BinaryOp::Xor => Instruction::Xor { result: result.clone(), a, b },
            BinaryOp::Shl => Instruction::Shl { result: result.clone(), a, b },
            BinaryOp::Shr => Instruction::Shr { result: result.clone(), a, b },
            BinaryOp::Eq => Instruction::CmpEq { result: result.clone(), a, b },
            BinaryOp::Ne => Instruction::CmpNe { result: result.clone(), a, b },
            BinaryOp::Lt => Instruction::CmpLt { result: result.clone(), a, b },
            BinaryOp::Le => Instruction::CmpLe { result: result.clone(), a, b },
            BinaryOp::Gt => Instruction::CmpGt { result: result.clone(), a, b },
            BinaryOp::Ge => Instruction::CmpGe { result: result.clone(), a, b },
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => unreachable!("handled above"),
        };
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(*block).push(id, instr, InstructionMetadata { location: Some(span), ..Default::default() });
        IlValue::Register(result)
    }

    fn lower_short_circuit(&mut self, scope: ScopeId, is_and: bool, left: &Expr, right: &Expr, block: &mut BlockId, env: &mut Env) -> IlValue {
        let left_val = self.lower_expr(scope, left, block, env);
        let header = *block;
        let rhs_block = self.function.new_block(if is_and { "and_rhs" } else { "or_rhs" });
        let merge_block = self.function.new_block(if is_and { "and_merge" } else { "or_merge" });
        let (then_b, else_b) = if is_and { (rhs_block, merge_block) } else { (merge_block, rhs_block) };
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(header).terminate(
            id,
            Instruction::Branch {
                condition: left_val,
                then_block: then_b,
                else_block: else_b,
            },
            InstructionMetadata::default(),
        );
        self.function.connect(header, then_b);
        self.function.connect(header, else_b);

        let mut rhs_env = env.clone();
        let mut rhs_cur = rhs_block;
        let right_val = self.lower_expr(scope, right, &mut rhs_cur, &mut rhs_env);
        self.terminate_jump(rhs_cur, merge_block);

        let short_value = IlValue::const_bool(!is_and);
        *block = merge_block;
        self.merge_values(merge_block, vec![(header, short_value), (rhs_cur, right_val)], IlType::Bool)
    }

    fn lower_unary(&mut self, scope: ScopeId, op: UnaryOp, operand: &Expr, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        if op == UnaryOp::AddressOf {
            return match operand {
                Expr::Identifier { name, .. } => IlValue::Global { name: name.clone() },
                _ => {
                    self.sink.push(Diagnostic::error("UNSUPPORTED_CONSTRUCT", "`@` is only valid on an identifier", span, self.module));
                    IlValue::const_word(0)
                }
            };
        }
        let v = self.lower_expr(scope, operand, block, env);
        if op == UnaryOp::Plus {
            return v;
        }
        let ty = if op == UnaryOp::Not { IlType::Bool } else { self.il_type_of(&v) };
        let result = self.function.fresh_vreg(ty);
        let instr = match op {
            UnaryOp::Not | UnaryOp::BitNot => Instruction::Not { result: result.clone(), a: v },
            UnaryOp::Neg => Instruction::Neg { result: result.clone(), a: v },
            UnaryOp::Plus | UnaryOp::AddressOf => unreachable!("handled above"),
        };
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(*block).push(id, instr, InstructionMetadata { location: Some(span), ..Default::default() });
        IlValue::Register(result)
    }

    fn lower_call(&mut self, scope: ScopeId, callee: &str, args: &[Expr], span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        if let Some(sig) = crate::il::intrinsics::lookup(callee).cloned() {
            return self.lower_intrinsic_call(scope, callee, &sig, args, span, block, env);
        }
        let arg_vals: Vec<IlValue> = args.iter().map(|a| self.lower_expr(scope, a, block, env)).collect();
        let ret_ty = self.scopes.lookup_chain(scope, callee).and_then(|s| match &s.ty {
            Type::Function { ret, .. } => Some((**ret).clone()),
            _ => None,
        });
        let meta = InstructionMetadata { location: Some(span), ..Default::default() };
        match ret_ty {
            Some(Type::Void) | None => {
                let id = self.function.fresh_instruction_id();
                self.function.block_mut(*block).push(
                    id,
                    Instruction::Call {
                        callee: callee.to_string(),
                        args: arg_vals,
                        result: None,
                    },
                    meta,
                );
                IlValue::const_byte(0)
            }
            Some(ret) => {
                let il_ty = IlType::from_source_type(&ret);
                let result = self.function.fresh_vreg(il_ty);
                let id = self.function.fresh_instruction_id();
                self.function.block_mut(*block).push(
                    id,
                    Instruction::Call {
                        callee: callee.to_string(),
                        args: arg_vals,
                        result: Some(result.clone()),
                    },
                    meta,
                );
                IlValue::Register(result)
            }
        }
    }

    fn lower_intrinsic_call(
        &mut self,
        scope: ScopeId,
        name: &str,
        sig: &crate::il::intrinsics::IntrinsicSignature,
        args: &[Expr],
        span: Span,
        block: &mut BlockId,
        env: &mut Env,
    ) -> IlValue {
        use crate::il::intrinsics::IntrinsicKind;
        if sig.kind == IntrinsicKind::CompileTimeConstant {
            return self.lower_compile_time_intrinsic(scope, name, args);
        }
        let meta = InstructionMetadata { location: Some(span), ..Default::default() };
        macro_rules! push {
            ($instr:expr) => {{
                let id = self.function.fresh_instruction_id();
                self.function.block_mut(*block).push(id, $instr, meta.clone());
            }};
        }
        match name {
            "peek" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let result = self.function.fresh_vreg(IlType::Byte);
                push!(Instruction::IntrinsicPeek { result: result.clone(), address });
                IlValue::Register(result)
            }
            "peekw" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let result = self.function.fresh_vreg(IlType::Word);
                push!(Instruction::IntrinsicPeekW { result: result.clone(), address });
                IlValue::Register(result)
            }
            "poke" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let value = self.lower_expr(scope, &args[1], block, env);
                push!(Instruction::IntrinsicPoke { address, value });
                IlValue::const_byte(0)
            }
            "pokew" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let value = self.lower_expr(scope, &args[1], block, env);
                push!(Instruction::IntrinsicPokeW { address, value });
                IlValue::const_byte(0)
            }
            "sei" => {
                push!(Instruction::CpuSei);
                IlValue::const_byte(0)
            }
            "cli" => {
                push!(Instruction::CpuCli);
                IlValue::const_byte(0)
            }
            "nop" => {
                push!(Instruction::CpuNop);
                IlValue::const_byte(0)
            }
            "brk" => {
                push!(Instruction::CpuBrk);
                IlValue::const_byte(0)
            }
            "pha" => {
                push!(Instruction::CpuPha);
                IlValue::const_byte(0)
            }
            "pla" => {
                // CPU_PLA has no IL result slot; its popped value isn't
                // observable in this IL. Callers must not depend on it.
                push!(Instruction::CpuPla);
                IlValue::const_byte(0)
            }
            "php" => {
                push!(Instruction::CpuPhp);
                IlValue::const_byte(0)
            }
            "plp" => {
                push!(Instruction::CpuPlp);
                IlValue::const_byte(0)
            }
            "lo" => {
                let value = self.lower_expr(scope, &args[0], block, env);
                let result = self.function.fresh_vreg(IlType::Byte);
                push!(Instruction::IntrinsicLo { result: result.clone(), value });
                IlValue::Register(result)
            }
            "hi" => {
                let value = self.lower_expr(scope, &args[0], block, env);
                let result = self.function.fresh_vreg(IlType::Byte);
                push!(Instruction::IntrinsicHi { result: result.clone(), value });
                IlValue::Register(result)
            }
            "barrier" => {
                push!(Instruction::OptBarrier);
                IlValue::const_byte(0)
            }
            "volatile_read" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let result = self.function.fresh_vreg(IlType::Byte);
                push!(Instruction::VolatileRead { result: result.clone(), address });
                IlValue::Register(result)
            }
            "volatile_write" => {
                let address = self.lower_expr(scope, &args[0], block, env);
                let value = self.lower_expr(scope, &args[1], block, env);
                push!(Instruction::VolatileWrite { address, value });
                IlValue::const_byte(0)
            }
            other => unreachable!("intrinsic registry and lowering disagree on `{other}`"),
        }
    }

    fn lower_compile_time_intrinsic(&mut self, scope: ScopeId, name: &str, args: &[Expr]) -> IlValue {
        let Some(Expr::Identifier { name: id_name, .. }) = args.first() else {
            return IlValue::const_word(0);
        };
        let value = if let Some(builtin) = typesys::get_builtin(id_name) {
            if name == "sizeof" {
                builtin.size_bytes() as i64
            } else {
                0
            }
        } else if let Some(ty) = self.named_types.get(id_name) {
            if name == "sizeof" {
                ty.size_bytes() as i64
            } else {
                0
            }
        } else if let Some(sym) = self.scopes.lookup_chain(scope, id_name) {
            match &sym.ty {
                Type::Array { element, length } => {
                    if name == "length" {
                        length.unwrap_or(0) as i64
                    } else {
                        element.size_bytes() as i64 * length.unwrap_or(0) as i64
                    }
                }
                other => {
                    if name == "sizeof" {
                        other.size_bytes() as i64
                    } else {
                        0
                    }
                }
            }
        } else {
            0
        };
        IlValue::const_word(value)
    }

    fn lower_member_read(&mut self, scope: ScopeId, base: &Expr, field: &str, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        let _ = scope;
        if let Expr::Identifier { name: map_name, .. } = base {
            if let Some((addr, ty)) = self.map_layout.field(map_name, field) {
                let result = self.function.fresh_vreg(ty);
                let id = self.function.fresh_instruction_id();
                self.function.block_mut(*block).push(
                    id,
                    Instruction::VolatileRead {
                        result: result.clone(),
                        address: IlValue::const_word(addr as i64),
                    },
                    InstructionMetadata {
                        location: Some(span),
                        map_info: Some((map_name.clone(), field.to_string())),
                        ..Default::default()
                    },
                );
                return IlValue::Register(result);
            }
        }
        let _ = env;
        self.sink.push(Diagnostic::error("UNSUPPORTED_CONSTRUCT", "member access requires a known `@map` field", span, self.module));
        IlValue::const_byte(0)
    }

    fn array_base_address(&mut self, scope: ScopeId, base: &Expr, index: &Expr, block: &mut BlockId, env: &mut Env) -> Option<(IlValue, IlType)> {
        let Expr::Identifier { name, .. } = base else { return None };
        let sym_ty = self.scopes.lookup_chain(scope, name)?.ty.clone();
        let Type::Array { element, .. } = &sym_ty else { return None };
        let elem_ty = IlType::from_source_type(element);
        let elem_size = element.size_bytes().max(1) as i64;
        let index_val = self.lower_expr(scope, index, block, env);
        let offset = if elem_size != 1 {
            let result = self.function.fresh_vreg(IlType::Word);
            let id = self.function.fresh_instruction_id();
            self.function.block_mut(*block).push(
                id,
                Instruction::Mul {
                    result: result.clone(),
                    a: index_val,
                    b: IlValue::const_word(elem_size),
                },
                InstructionMetadata::default(),
            );
            IlValue::Register(result)
        } else {
            index_val
        };
        let base_addr = IlValue::Global { name: name.clone() };
        let addr_reg = self.function.fresh_vreg(IlType::Word);
        let id2 = self.function.fresh_instruction_id();
        self.function.block_mut(*block).push(
            id2,
            Instruction::Add {
                result: addr_reg.clone(),
                a: base_addr,
                b: offset,
            },
            InstructionMetadata::default(),
        );
        Some((IlValue::Register(addr_reg), elem_ty))
    }

    fn lower_index_read(&mut self, scope: ScopeId, base: &Expr, index: &Expr, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        match self.array_base_address(scope, base, index, block, env) {
            Some((address, ty)) => {
                let result = self.function.fresh_vreg(ty);
                let id = self.function.fresh_instruction_id();
                self.function.block_mut(*block).push(id, Instruction::Load { result: result.clone(), address }, InstructionMetadata { location: Some(span), ..Default::default() });
                IlValue::Register(result)
            }
            None => {
                self.sink.push(Diagnostic::error("UNSUPPORTED_CONSTRUCT", "array index requires a known global array", span, self.module));
                IlValue::const_byte(0)
            }
        }
    }

    fn lower_assignment(&mut self, scope: ScopeId, target: &Expr, value: &Expr, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        let value_val = self.lower_expr(scope, value, block, env);
        match target {
            Expr::Identifier { name, .. } => {
                if env.contains_key(name) {
                    env.insert(name.clone(), value_val.clone());
                } else {
                    let id = self.function.fresh_instruction_id();
                    self.function.block_mut(*block).push(
                        id,
                        Instruction::StoreGlobal {
                            name: name.clone(),
                            value: value_val.clone(),
                        },
                        InstructionMetadata { location: Some(span), ..Default::default() },
                    );
                }
            }
            Expr::Member { base, field, .. } => {
                if let Expr::Identifier { name: map_name, .. } = base.as_ref() {
                    if let Some((addr, _)) = self.map_layout.field(map_name, field) {
                        let id = self.function.fresh_instruction_id();
                        self.function.block_mut(*block).push(
                            id,
                            Instruction::VolatileWrite {
                                address: IlValue::const_word(addr as i64),
                                value: value_val.clone(),
                            },
                            InstructionMetadata {
                                location: Some(span),
                                map_info: Some((map_name.clone(), field.clone())),
                                ..Default::default()
                            },
                        );
                    }
                }
            }
            Expr::Index { base, index, .. } => {
                if let Some((address, _)) = self.array_base_address(scope, base, index, block, env) {
                    let id = self.function.fresh_instruction_id();
                    self.function.block_mut(*block).push(id, Instruction::Store { address, value: value_val.clone() }, InstructionMetadata { location: Some(span), ..Default::default() });
                }
            }
            _ => {}
        }
        value_val
    }

    fn lower_ternary(&mut self, scope: ScopeId, condition: &Expr, then_value: &Expr, else_value: &Expr, span: Span, block: &mut BlockId, env: &mut Env) -> IlValue {
        let cond_val = self.lower_expr(scope, condition, block, env);
        let header = *block;
        let then_block = self.function.new_block("ternary_then");
        let else_block = self.function.new_block("ternary_else");
        let merge_block = self.function.new_block("ternary_merge");
        let id = self.function.fresh_instruction_id();
        self.function.block_mut(header).terminate(
            id,
            Instruction::Branch {
                condition: cond_val,
                then_block,
                else_block,
            },
            InstructionMetadata { location: Some(span), ..Default::default() },
        );
        self.function.connect(header, then_block);
        self.function.connect(header, else_block);

        let mut then_env = env.clone();
        let mut then_cur = then_block;
        let then_val = self.lower_expr(scope, then_value, &mut then_cur, &mut then_env);
        self.terminate_jump(then_cur, merge_block);

        let mut else_env = env.clone();
        let mut else_cur = else_block;
        let else_val = self.lower_expr(scope, else_value, &mut else_cur, &mut else_env);
        self.terminate_jump(else_cur, merge_block);

        *block = merge_block;
        let ty = self.widen(self.il_type_of(&then_val), self.il_type_of(&else_val));
        self.merge_values(merge_block, vec![(then_cur, then_val), (else_cur, else_val)], ty)
    }
}

fn lower_literal(value: &Literal) -> IlValue {
    match value {
        Literal::Int(v) => {
            if typesys::fits_in_byte(*v) {
                IlValue::const_byte(*v)
            } else {
                IlValue::const_word(*v)
            }
        }
        Literal::Bool(b) => IlValue::const_bool(*b),
        // Strings are only meaningful as a `@data` initializer, lowered
        // directly from the AST by `ilgen::lower_module`, not as a runtime
        // expression value.
        Literal::Str(_) => IlValue::const_word(0),
    }
}

/// Every identifier assigned anywhere in `stmts` (nested control flow
/// included), used to decide which names need a loop-header PHI.
fn assigned_names(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    for stmt in stmts {
        scan_stmt(stmt, &mut names);
    }
    names
}

fn scan_stmt(stmt: &Stmt, names: &mut HashSet<String>) {
    match stmt {
        Stmt::VariableDecl { init, .. } => {
            if let Some(e) = init {
                scan_expr(e, names);
            }
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            scan_expr(condition, names);
            then_branch.iter().for_each(|s| scan_stmt(s, names));
            if let Some(e) = else_branch {
                e.iter().for_each(|s| scan_stmt(s, names));
            }
        }
        Stmt::While { condition, body, .. } | Stmt::DoWhile { body, condition, .. } => {
            scan_expr(condition, names);
            body.iter().for_each(|s| scan_stmt(s, names));
        }
        Stmt::For { start, end, step, body, .. } => {
            scan_expr(start, names);
            scan_expr(end, names);
            if let Some(s) = step {
                scan_expr(s, names);
            }
            body.iter().for_each(|s| scan_stmt(s, names));
        }
        Stmt::Switch { value, cases, default, .. } => {
            scan_expr(value, names);
            for (c, body) in cases {
                scan_expr(c, names);
                body.iter().for_each(|s| scan_stmt(s, names));
            }
            if let Some(d) = default {
                d.iter().for_each(|s| scan_stmt(s, names));
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(e) = value {
                scan_expr(e, names);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Expression { expr, .. } => scan_expr(expr, names),
        Stmt::Block { body, .. } => body.iter().for_each(|s| scan_stmt(s, names)),
    }
}

fn scan_expr(expr: &Expr, names: &mut HashSet<String>) {
    match expr {
        Expr::Assignment { target, value, .. } => {
            if let Expr::Identifier { name, .. } = target.as_ref() {
                names.insert(name.clone());
            }
            scan_expr(target, names);
            scan_expr(value, names);
        }
        Expr::Binary { left, right, .. } => {
            scan_expr(left, names);
            scan_expr(right, names);
        }
        Expr::Unary { operand, .. } => scan_expr(operand, names),
        Expr::Call { args, .. } => args.iter().for_each(|a| scan_expr(a, names)),
        Expr::Member { base, .. } => scan_expr(base, names),
        Expr::Index { base, index, .. } => {
            scan_expr(base, names);
            scan_expr(index, names);
        }
        Expr::ArrayLiteral { elements, .. } => elements.iter().for_each(|e| scan_expr(e, names)),
        Expr::Ternary {
            condition,
            then_value,
            else_value,
            ..
        } => {
            scan_expr(condition, names);
            scan_expr(then_value, names);
            scan_expr(else_value, names);
        }
        Expr::Literal { .. } | Expr::Identifier { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;
    use crate::diagnostics::DiagnosticSink;
    use crate::semantic;
    use crate::source::Span;

    fn span() -> Span {
        Span::synthetic()
    }

    fn lower_one(module: &crate::ast::Module) -> IlFunction {
        let sink = DiagnosticSink::new();
        let analyzed = semantic::analyze(module, &sink, &crate::globaltable::GlobalSymbolTable::new());
        let consts = ConstEnv::build(module);
        let named_types = analyzed.named_types.clone();
        let map_layout = MapLayout::build(module, &named_types);
        let item = module.items.iter().find_map(|i| match i {
            crate::ast::Item::FunctionDecl { name, params, body, return_type, is_interrupt, .. } => Some((name.clone(), params.clone(), body.clone(), return_type.clone(), *is_interrupt)),
            _ => None,
        });
        let (name, params, body, return_type, is_interrupt) = item.expect("module has a function");
        let fn_scope = *analyzed.function_scopes.get(&name).unwrap();
        let param_types: Vec<IlType> = params
            .iter()
            .map(|p| IlType::from_source_type(&semantic::resolve_type_expr(&p.declared_type, &analyzed.named_types).unwrap_or(Type::Word)))
            .collect();
        let ret_ty = match return_type {
            Some(t) => IlType::from_source_type(&semantic::resolve_type_expr(&t, &analyzed.named_types).unwrap_or(Type::Void)),
            None => IlType::Void,
        };
        let mut lowering = FunctionLowering::new(name, param_types, ret_ty, is_interrupt, &analyzed.scopes, &consts, &named_types, &map_layout, &sink, &module.name);
        lowering.lower_body(fn_scope, &params, &body);
        lowering.finish()
    }

    fn module_with_body(body: Vec<Stmt>) -> crate::ast::Module {
        crate::ast::Module {
            name: "M".to_string(),
            imports: vec![],
            items: vec![crate::ast::Item::FunctionDecl {
                name: "f".to_string(),
                params: vec![],
                return_type: None,
                is_exported: false,
                is_interrupt: false,
                body,
                span: span(),
            }],
            span: span(),
        }
    }

    #[test]
    fn every_block_ends_in_exactly_one_terminator() {
        let module = module_with_body(vec![Stmt::If {
            condition: ast::int_lit(1, span()),
            then_branch: vec![Stmt::Expression {
                expr: ast::ident("x", span()),
                span: span(),
            }],
            else_branch: None,
            span: span(),
        }]);
        let function = lower_one(&module);
        for block in &function.blocks {
            assert!(block.has_terminator(), "block {} has no terminator", block.label);
        }
    }

    #[test]
    fn if_else_assigning_the_same_variable_merges_with_a_phi() {
        let module = module_with_body(vec![
            Stmt::VariableDecl {
                name: "x".to_string(),
                is_const: false,
                declared_type: Some(crate::ast::TypeExpr::named("byte", span())),
                init: Some(ast::int_lit(0, span())),
                span: span(),
            },
            Stmt::If {
                condition: ast::int_lit(1, span()),
                then_branch: vec![Stmt::Expression {
                    expr: Expr::Assignment {
                        target: Box::new(ast::ident("x", span())),
                        value: Box::new(ast::int_lit(1, span())),
                        span: span(),
                    },
                    span: span(),
                }],
                else_branch: Some(vec![Stmt::Expression {
                    expr: Expr::Assignment {
                        target: Box::new(ast::ident("x", span())),
                        value: Box::new(ast::int_lit(2, span())),
                        span: span(),
                    },
                    span: span(),
                }]),
                span: span(),
            },
        ]);
        let function = lower_one(&module);
        let has_phi = function.blocks.iter().any(|b| b.instructions.iter().any(|r| r.instruction.is_phi()));
        assert!(has_phi, "expected a merge PHI for `x`");
    }

    #[test]
    fn while_loop_header_has_a_patched_incoming_phi() {
        let module = module_with_body(vec![
            Stmt::VariableDecl {
                name: "i".to_string(),
                is_const: false,
                declared_type: Some(crate::ast::TypeExpr::named("byte", span())),
                init: Some(ast::int_lit(0, span())),
                span: span(),
            },
            Stmt::While {
                condition: ast::binary(BinaryOp::Lt, ast::ident("i", span()), ast::int_lit(10, span()), span()),
                body: vec![Stmt::Expression {
                    expr: Expr::Assignment {
                        target: Box::new(ast::ident("i", span())),
                        value: Box::new(ast::binary(BinaryOp::Add, ast::ident("i", span()), ast::int_lit(1, span()), span())),
                        span: span(),
                    },
                    span: span(),
                }],
                span: span(),
            },
        ]);
        let function = lower_one(&module);
        let header = function.blocks.iter().find(|b| b.label == "while_header").expect("while_header exists");
        let phi = header.phis().next().expect("header has a PHI for `i`");
        if let Instruction::Phi { incoming, .. } = &phi.instruction {
            assert_eq!(incoming.len(), 2, "expects a preheader edge and a back edge");
        } else {
            unreachable!();
        }
    }
}
