// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Statement lowering.

use hoist_ast::{
    expr::Expr,
    stmt::{CatchClause, Stmt, StmtKind},
    NodeId, Span, VarId,
};

use super::{FinallyContext, GraphLowerer, LoopContext, LoweringError};
use crate::{BlockId, HandlerContext, SuspendKind, Terminator};

/// What runs when control leaves a protected body.
enum FinallyBody<'a> {
    Stmts(&'a [Stmt]),
    /// Implicit disposal at the end of a `using` statement.
    Dispose {
        var: Option<VarId>,
        node: NodeId,
        span: Span,
        is_await: bool,
    },
}

impl<'m> GraphLowerer<'m> {
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LoweringError> {
        self.claim_node(stmt.id, stmt.span)?;
        match &stmt.kind {
            StmtKind::Expr(e) => self.lower_expr(e),

            StmtKind::Local { var, init } => {
                if let Some(init) = init {
                    self.lower_expr(init)?;
                    self.def_var(*var, stmt.id, stmt.span)?;
                } else {
                    self.check_var(*var, stmt.span)?;
                }
                Ok(())
            }

            StmtKind::Block(body) | StmtKind::Unsafe(body) => self.lower_block(body),

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(cond, then_branch, else_branch.as_deref()),

            StmtKind::While { cond, body } => self.lower_while(cond, body),

            StmtKind::DoWhile { body, cond } => self.lower_do_while(body, cond),

            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.lower_for(init, cond.as_ref(), step, body),

            StmtKind::ForEach {
                var,
                collection,
                body,
                is_await,
            } => self.lower_foreach(stmt, *var, collection, body, *is_await),

            StmtKind::Break => {
                let ctx = self.innermost_loop("break", stmt.span)?;
                self.jump(ctx.0, ctx.2);
                self.builder.start_dead_block();
                Ok(())
            }

            StmtKind::Continue => {
                let ctx = self.innermost_loop("continue", stmt.span)?;
                self.jump(ctx.1, ctx.2);
                self.builder.start_dead_block();
                Ok(())
            }

            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.lower_expr(value)?;
                }
                let exit = self.builder.return_exit();
                self.jump(exit, 0);
                self.builder.start_dead_block();
                Ok(())
            }

            StmtKind::YieldReturn(value) => {
                self.lower_expr(value)?;
                let handler = self.handler_context();
                self.builder
                    .suspend(SuspendKind::Yield, stmt.id, stmt.span, handler);
                Ok(())
            }

            StmtKind::YieldBreak => {
                let exit = self.builder.return_exit();
                self.jump(exit, 0);
                self.builder.start_dead_block();
                Ok(())
            }

            StmtKind::Throw(value) => {
                if let Some(value) = value {
                    self.lower_expr(value)?;
                }
                let target = self.builder.current_handler();
                self.builder.terminate(Terminator::Throw { target });
                self.builder.start_dead_block();
                Ok(())
            }

            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.lower_try(body, catches, finally.as_deref().map(FinallyBody::Stmts)),

            StmtKind::Lock { target, body } => {
                self.lower_expr(target)?;
                self.lower_block(body)
            }

            StmtKind::Using {
                var,
                resource,
                body,
                is_await,
            } => {
                self.lower_expr(resource)?;
                if let Some(var) = var {
                    self.def_var(*var, stmt.id, resource.span)?;
                }
                let dispose = FinallyBody::Dispose {
                    var: *var,
                    node: stmt.id,
                    span: resource.span,
                    is_await: *is_await,
                };
                self.lower_try(body, &[], Some(dispose))
            }
        }
    }

    fn lower_block(&mut self, body: &[Stmt]) -> Result<(), LoweringError> {
        for stmt in body {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// (exit, continue, finally depth) of the innermost loop.
    fn innermost_loop(
        &self,
        keyword: &'static str,
        span: Span,
    ) -> Result<(BlockId, BlockId, usize), LoweringError> {
        self.loop_stack
            .last()
            .map(|l| (l.exit_block, l.continue_block, l.finally_depth))
            .ok_or(LoweringError::JumpOutsideLoop { keyword, span })
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_branch: &[Stmt],
        else_branch: Option<&[Stmt]>,
    ) -> Result<(), LoweringError> {
        self.lower_expr(cond)?;

        let then_block = self.builder.create_block();
        let else_block = else_branch.map(|_| self.builder.create_block());
        let merge_block = self.builder.create_block();

        self.builder.terminate(Terminator::Branch {
            then_block,
            else_block: else_block.unwrap_or(merge_block),
        });

        self.builder.switch_to_block(then_block);
        self.lower_block(then_branch)?;
        self.builder.terminate(Terminator::Goto {
            target: merge_block,
        });

        if let (Some(else_block), Some(else_branch)) = (else_block, else_branch) {
            self.builder.switch_to_block(else_block);
            self.lower_block(else_branch)?;
            self.builder.terminate(Terminator::Goto {
                target: merge_block,
            });
        }

        self.builder.switch_to_block(merge_block);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<(), LoweringError> {
        let check_block = self.builder.create_block();
        let body_block = self.builder.create_block();
        let exit_block = self.builder.create_block();

        self.builder.terminate(Terminator::Goto {
            target: check_block,
        });

        self.builder.switch_to_block(check_block);
        self.lower_expr(cond)?;
        self.builder.terminate(Terminator::Branch {
            then_block: body_block,
            else_block: exit_block,
        });

        self.builder.switch_to_block(body_block);
        self.lower_loop_body(check_block, exit_block, body)?;
        self.builder.terminate(Terminator::Goto {
            target: check_block,
        });

        self.builder.switch_to_block(exit_block);
        Ok(())
    }

    fn lower_do_while(&mut self, body: &[Stmt], cond: &Expr) -> Result<(), LoweringError> {
        let body_block = self.builder.create_block();
        let check_block = self.builder.create_block();
        let exit_block = self.builder.create_block();

        self.builder.terminate(Terminator::Goto { target: body_block });

        self.builder.switch_to_block(body_block);
        self.lower_loop_body(check_block, exit_block, body)?;
        self.builder.terminate(Terminator::Goto {
            target: check_block,
        });

        self.builder.switch_to_block(check_block);
        self.lower_expr(cond)?;
        self.builder.terminate(Terminator::Branch {
            then_block: body_block,
            else_block: exit_block,
        });

        self.builder.switch_to_block(exit_block);
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: &[Stmt],
        cond: Option<&Expr>,
        step: &[Expr],
        body: &[Stmt],
    ) -> Result<(), LoweringError> {
        self.lower_block(init)?;

        let check_block = self.builder.create_block();
        let body_block = self.builder.create_block();
        let step_block = self.builder.create_block();
        let exit_block = self.builder.create_block();

        self.builder.terminate(Terminator::Goto {
            target: check_block,
        });

        self.builder.switch_to_block(check_block);
        match cond {
            Some(cond) => {
                self.lower_expr(cond)?;
                self.builder.terminate(Terminator::Branch {
                    then_block: body_block,
                    else_block: exit_block,
                });
            }
            None => self.builder.terminate(Terminator::Goto { target: body_block }),
        }

        self.builder.switch_to_block(body_block);
        self.lower_loop_body(step_block, exit_block, body)?;
        self.builder.terminate(Terminator::Goto { target: step_block });

        self.builder.switch_to_block(step_block);
        for e in step {
            self.lower_expr(e)?;
        }
        self.builder.terminate(Terminator::Goto {
            target: check_block,
        });

        self.builder.switch_to_block(exit_block);
        Ok(())
    }

    fn lower_foreach(
        &mut self,
        stmt: &Stmt,
        var: VarId,
        collection: &Expr,
        body: &[Stmt],
        is_await: bool,
    ) -> Result<(), LoweringError> {
        self.lower_expr(collection)?;

        let header_block = self.builder.create_block();
        let body_block = self.builder.create_block();
        let exit_block = self.builder.create_block();

        self.builder.terminate(Terminator::Goto {
            target: header_block,
        });

        // MoveNext: an async enumerator suspends before every iteration test.
        self.builder.switch_to_block(header_block);
        if is_await {
            let handler = self.handler_context();
            self.builder
                .suspend(SuspendKind::Await, stmt.id, collection.span, handler);
        }
        self.builder.terminate(Terminator::Branch {
            then_block: body_block,
            else_block: exit_block,
        });

        self.builder.switch_to_block(body_block);
        self.def_var(var, stmt.id, collection.span)?;
        self.lower_loop_body(header_block, exit_block, body)?;
        self.builder.terminate(Terminator::Goto {
            target: header_block,
        });

        self.builder.switch_to_block(exit_block);
        Ok(())
    }

    fn lower_loop_body(
        &mut self,
        continue_block: BlockId,
        exit_block: BlockId,
        body: &[Stmt],
    ) -> Result<(), LoweringError> {
        self.loop_stack.push(LoopContext {
            continue_block,
            exit_block,
            finally_depth: self.finally_stack.len(),
        });
        let result = self.lower_block(body);
        self.loop_stack.pop();
        result
    }

    fn lower_try(
        &mut self,
        body: &[Stmt],
        catches: &[CatchClause],
        finally: Option<FinallyBody<'_>>,
    ) -> Result<(), LoweringError> {
        let outer_depth = self.finally_stack.len();

        // Join and finally entry sit outside the protected body.
        let join_block = self.builder.create_block();
        let finally_entry = finally.as_ref().map(|_| self.builder.create_block());

        if let Some(entry) = finally_entry {
            self.builder.push_handler(entry);
            self.finally_stack.push(FinallyContext {
                entry,
                pending: Vec::new(),
            });
        }

        let dispatch_block = (!catches.is_empty()).then(|| self.builder.create_block());

        // Protected body.
        if let Some(dispatch) = dispatch_block {
            self.builder.push_handler(dispatch);
            self.handler_contexts.push(HandlerContext::TryWithCatch);
        }
        let try_block = self.builder.create_block();
        self.builder.terminate(Terminator::Goto { target: try_block });
        self.builder.switch_to_block(try_block);
        self.lower_block(body)?;
        self.jump(join_block, outer_depth);
        if dispatch_block.is_some() {
            self.builder.pop_handler();
            self.handler_contexts.pop();
        }

        // Catch dispatch: each clause in order, falling through to the next
        // clause when its filter rejects.
        if let Some(dispatch) = dispatch_block {
            let propagate = self.builder.current_handler();
            let clause_blocks: Vec<_> = catches.iter().map(|_| self.builder.create_block()).collect();
            let mut targets = clause_blocks.clone();
            targets.push(propagate);
            self.builder.switch_to_block(dispatch);
            self.builder.terminate(Terminator::Switch { targets });

            for (i, (clause, entry)) in catches.iter().zip(&clause_blocks).enumerate() {
                self.builder.switch_to_block(*entry);
                if let Some(var) = clause.var {
                    self.def_var(var, NodeId::DUMMY, clause.span)?;
                }
                if let Some(filter) = &clause.filter {
                    self.lower_expr(filter)?;
                    let body_block = self.builder.create_block();
                    let next = clause_blocks.get(i + 1).copied().unwrap_or(propagate);
                    self.builder.terminate(Terminator::Branch {
                        then_block: body_block,
                        else_block: next,
                    });
                    self.builder.switch_to_block(body_block);
                }
                self.handler_contexts.push(HandlerContext::Catch);
                let lowered = self.lower_block(&clause.body);
                self.handler_contexts.pop();
                lowered?;
                self.jump(join_block, outer_depth);
            }
        }

        // Finally body, lowered once.
        if let (Some(entry), Some(finally)) = (finally_entry, finally) {
            self.builder.pop_handler();
            let pending = self
                .finally_stack
                .pop()
                .map(|f| f.pending)
                .unwrap_or_default();

            self.builder.switch_to_block(entry);
            self.handler_contexts.push(HandlerContext::Finally);
            let lowered = self.lower_finally_body(finally);
            self.handler_contexts.pop();
            lowered?;

            // A finally body that cannot complete resumes none of its exits.
            let pending = if self.builder.current_block_live() {
                pending
            } else {
                Vec::new()
            };
            let mut targets = Vec::new();
            for (target, target_depth) in pending {
                // Jumps past an enclosing finally chain into it next.
                let next = match self.finally_stack.last_mut() {
                    Some(outer) if outer_depth > target_depth => {
                        if !outer.pending.contains(&(target, target_depth)) {
                            outer.pending.push((target, target_depth));
                        }
                        outer.entry
                    }
                    _ => target,
                };
                if !targets.contains(&next) {
                    targets.push(next);
                }
            }
            let unwind = self.builder.current_handler();
            self.builder
                .terminate(Terminator::EndFinally { targets, unwind });
        }

        self.builder.switch_to_block(join_block);
        Ok(())
    }

    fn lower_finally_body(&mut self, finally: FinallyBody<'_>) -> Result<(), LoweringError> {
        match finally {
            FinallyBody::Stmts(body) => self.lower_block(body),
            FinallyBody::Dispose {
                var,
                node,
                span,
                is_await,
            } => {
                if let Some(var) = var {
                    self.use_var(var, node, span)?;
                }
                if is_await {
                    let handler = self.handler_context();
                    self.builder.suspend(SuspendKind::Await, node, span, handler);
                }
                Ok(())
            }
        }
    }
}
