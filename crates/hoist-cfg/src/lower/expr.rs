// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Expression lowering.

use hoist_ast::expr::{Expr, ExprKind, LogicalOp};

use super::{GraphLowerer, LoweringError};
use crate::{SuspendKind, Terminator};

impl<'m> GraphLowerer<'m> {
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Result<(), LoweringError> {
        self.claim_node(expr.id, expr.span)?;
        match &expr.kind {
            ExprKind::Literal(_) => Ok(()),

            ExprKind::Var(var) | ExprKind::Ref(var) => self.use_var(*var, expr.id, expr.span),

            ExprKind::Assign { target, value } => {
                self.lower_expr(value)?;
                self.def_var(*target, expr.id, expr.span)
            }

            ExprKind::Binary { left, right, .. } => {
                self.lower_expr(left)?;
                self.lower_expr(right)
            }

            ExprKind::Unary { operand, .. } => self.lower_expr(operand),

            ExprKind::Logical { op, left, right } => {
                self.lower_expr(left)?;

                let rhs_block = self.builder.create_block();
                let merge_block = self.builder.create_block();
                // `a && b` evaluates b when a holds; `a || b` and `a ?? b`
                // evaluate b when a does not.
                let (then_block, else_block) = match op {
                    LogicalOp::And => (rhs_block, merge_block),
                    LogicalOp::Or | LogicalOp::Coalesce => (merge_block, rhs_block),
                };
                self.builder.terminate(Terminator::Branch {
                    then_block,
                    else_block,
                });

                self.builder.switch_to_block(rhs_block);
                self.lower_expr(right)?;
                self.builder.terminate(Terminator::Goto {
                    target: merge_block,
                });

                self.builder.switch_to_block(merge_block);
                Ok(())
            }

            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.lower_expr(cond)?;

                let then_block = self.builder.create_block();
                let else_block = self.builder.create_block();
                let merge_block = self.builder.create_block();
                self.builder.terminate(Terminator::Branch {
                    then_block,
                    else_block,
                });

                for (block, arm) in [(then_block, then_expr), (else_block, else_expr)] {
                    self.builder.switch_to_block(block);
                    self.lower_expr(arm)?;
                    self.builder.terminate(Terminator::Goto {
                        target: merge_block,
                    });
                }

                self.builder.switch_to_block(merge_block);
                Ok(())
            }

            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.lower_expr(arg)?;
                }
                Ok(())
            }

            ExprKind::MethodCall { receiver, args, .. } => {
                self.lower_expr(receiver)?;
                for arg in args {
                    self.lower_expr(arg)?;
                }
                Ok(())
            }

            ExprKind::Field { object, .. } => self.lower_expr(object),

            ExprKind::Await(operand) => {
                self.lower_expr(operand)?;
                let handler = self.handler_context();
                self.builder
                    .suspend(SuspendKind::Await, expr.id, expr.span, handler);
                Ok(())
            }

            // The body is a separate method; captures are read at creation.
            ExprKind::Lambda { captures, .. } => {
                for var in captures {
                    self.use_var(*var, expr.id, expr.span)?;
                }
                Ok(())
            }
        }
    }
}
