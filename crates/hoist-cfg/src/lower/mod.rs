// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Graph lowering - transform a bound method body into a `MethodGraph`.

mod expr;
mod stmt;

use std::collections::HashSet;

use hoist_ast::{Method, NodeId, Span, VarId};
use thiserror::Error;
use tracing::debug;

use crate::{BlockBuilder, BlockId, HandlerContext, InstrKind, MethodGraph, Terminator};

pub struct GraphLowerer<'m> {
    method: &'m Method,
    builder: BlockBuilder,
    loop_stack: Vec<LoopContext>,
    finally_stack: Vec<FinallyContext>,
    /// Innermost exception-handling construct is last.
    handler_contexts: Vec<HandlerContext>,
    /// Statement and expression ids lowered so far.
    seen_nodes: HashSet<NodeId>,
}

struct LoopContext {
    continue_block: BlockId,
    exit_block: BlockId,
    /// Number of enclosing finally bodies at the loop statement.
    finally_depth: usize,
}

/// A finally body whose exits are still being collected.
struct FinallyContext {
    entry: BlockId,
    /// Jump targets that entered the finally, with the finally depth of
    /// each target.
    pending: Vec<(BlockId, usize)>,
}

/// Build the control-flow graph for one method body.
pub fn build_graph(method: &Method) -> Result<MethodGraph, LoweringError> {
    GraphLowerer::lower_method(method)
}

impl<'m> GraphLowerer<'m> {
    pub fn lower_method(method: &'m Method) -> Result<MethodGraph, LoweringError> {
        let mut lowerer = GraphLowerer {
            method,
            builder: BlockBuilder::new(method.name.clone(), method.variables.len()),
            loop_stack: Vec::new(),
            finally_stack: Vec::new(),
            handler_contexts: Vec::new(),
            seen_nodes: HashSet::new(),
        };

        for (index, variable) in method.variables.iter().enumerate() {
            if variable.id != VarId(index as u32) {
                return Err(LoweringError::MisnumberedVariable {
                    var: variable.id,
                    index,
                    span: variable.span,
                });
            }
        }

        for param in method.params() {
            lowerer
                .builder
                .push(InstrKind::Def(param.id), NodeId::DUMMY, param.span);
        }

        for stmt in &method.body {
            lowerer.lower_stmt(stmt)?;
        }

        // Falling off the end completes normally.
        let exit = lowerer.builder.return_exit();
        lowerer.jump(exit, 0);

        let graph = lowerer.builder.finish();
        debug!(
            method = %graph.method,
            blocks = graph.blocks.len(),
            suspensions = graph.suspensions.len(),
            "lowered method body"
        );
        Ok(graph)
    }

    fn check_var(&self, var: VarId, span: Span) -> Result<(), LoweringError> {
        if self.method.variable(var).is_some() {
            Ok(())
        } else {
            Err(LoweringError::UnknownVariable { var, span })
        }
    }

    /// Node ids identify one statement or expression each.
    fn claim_node(&mut self, node: NodeId, span: Span) -> Result<(), LoweringError> {
        if node == NodeId::DUMMY || self.seen_nodes.insert(node) {
            Ok(())
        } else {
            Err(LoweringError::DuplicateNode { node, span })
        }
    }

    fn use_var(&mut self, var: VarId, node: NodeId, span: Span) -> Result<(), LoweringError> {
        self.check_var(var, span)?;
        self.builder.push(InstrKind::Use(var), node, span);
        Ok(())
    }

    fn def_var(&mut self, var: VarId, node: NodeId, span: Span) -> Result<(), LoweringError> {
        self.check_var(var, span)?;
        self.builder.push(InstrKind::Def(var), node, span);
        Ok(())
    }

    fn handler_context(&self) -> HandlerContext {
        self.handler_contexts
            .last()
            .copied()
            .unwrap_or(HandlerContext::None)
    }

    /// Terminate the current block with a jump to `target`, routing through
    /// the innermost finally body if the target lies outside it. A jump from
    /// an unreachable block is not a way out of the finally.
    fn jump(&mut self, target: BlockId, target_depth: usize) {
        let depth = self.finally_stack.len();
        let live = self.builder.current_block_live();
        match self.finally_stack.last_mut() {
            Some(finally) if live && depth > target_depth => {
                finally.pending.push((target, target_depth));
                let entry = finally.entry;
                self.builder.terminate(Terminator::Goto { target: entry });
            }
            _ => self.builder.terminate(Terminator::Goto { target }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("variable #{} is not declared in this method", .var.0)]
    UnknownVariable { var: VarId, span: Span },
    #[error("`{keyword}` outside of a loop")]
    JumpOutsideLoop { keyword: &'static str, span: Span },
    #[error("node #{} appears more than once in the body", .node.0)]
    DuplicateNode { node: NodeId, span: Span },
    #[error("variable table entry {index} is numbered #{}", .var.0)]
    MisnumberedVariable { var: VarId, index: usize, span: Span },
}

impl LoweringError {
    pub fn span(&self) -> Span {
        match self {
            LoweringError::UnknownVariable { span, .. }
            | LoweringError::JumpOutsideLoop { span, .. }
            | LoweringError::DuplicateNode { span, .. }
            | LoweringError::MisnumberedVariable { span, .. } => *span,
        }
    }
}
