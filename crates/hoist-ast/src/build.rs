// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MethodBuilder - constructs bound trees without a parser.
//!
//! Node ids and spans are allocated from a running cursor, so nodes built
//! in source order get increasing, properly nested spans: every parent span
//! covers the spans of the children it was built from.

use std::cell::{Cell, RefCell};

use crate::expr::{BinOp, Expr, ExprKind, Literal, LogicalOp, UnaryOp};
use crate::stmt::{CatchClause, Stmt, StmtKind};
use crate::{Method, MethodKind, NodeId, Span, StorageClass, VarId, Variable};

pub struct MethodBuilder {
    name: String,
    kind: MethodKind,
    is_unsafe: bool,
    variables: RefCell<Vec<Variable>>,
    next_node: Cell<u32>,
    cursor: Cell<usize>,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_unsafe: false,
            variables: RefCell::new(Vec::new()),
            next_node: Cell::new(0),
            cursor: Cell::new(0),
        }
    }

    /// Mark the method `unsafe`.
    pub fn unsafe_method(mut self) -> Self {
        self.is_unsafe = true;
        self
    }

    pub fn param(&self, name: &str, storage: StorageClass) -> VarId {
        self.declare(name, storage, true)
    }

    pub fn local(&self, name: &str, storage: StorageClass) -> VarId {
        self.declare(name, storage, false)
    }

    fn declare(&self, name: &str, storage: StorageClass, is_param: bool) -> VarId {
        let mut vars = self.variables.borrow_mut();
        let id = VarId(vars.len() as u32);
        let span = self.leaf_span();
        vars.push(Variable { id, name: name.to_string(), storage, span, is_param });
        id
    }

    pub fn finish(self, body: Vec<Stmt>) -> Method {
        let end = self.cursor.get();
        Method {
            name: self.name,
            kind: self.kind,
            is_unsafe: self.is_unsafe,
            variables: self.variables.into_inner(),
            body,
            span: Span::new(0, end),
        }
    }

    // ── Allocation ──────────────────────────────────────────────────

    fn node(&self) -> NodeId {
        let id = self.next_node.get();
        self.next_node.set(id + 1);
        NodeId(id)
    }

    fn leaf_span(&self) -> Span {
        let start = self.cursor.get();
        self.cursor.set(start + 1);
        Span::new(start, start + 1)
    }

    /// A fresh unit of text, widened to cover every child span.
    fn span_over(&self, children: &[Span]) -> Span {
        let own = self.leaf_span();
        children.iter().fold(own, |acc, s| acc.to(*s))
    }

    fn expr(&self, kind: ExprKind, children: &[Span]) -> Expr {
        Expr { id: self.node(), span: self.span_over(children), kind }
    }

    fn stmt(&self, kind: StmtKind, children: &[Span]) -> Stmt {
        Stmt { id: self.node(), span: self.span_over(children), kind }
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)), &[])
    }

    pub fn bool_(&self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)), &[])
    }

    pub fn null(&self) -> Expr {
        self.expr(ExprKind::Literal(Literal::Null), &[])
    }

    pub fn var(&self, var: VarId) -> Expr {
        self.expr(ExprKind::Var(var), &[])
    }

    pub fn ref_(&self, var: VarId) -> Expr {
        self.expr(ExprKind::Ref(var), &[])
    }

    pub fn assign(&self, target: VarId, value: Expr) -> Expr {
        let spans = [value.span];
        self.expr(ExprKind::Assign { target, value: Box::new(value) }, &spans)
    }

    pub fn binary(&self, op: BinOp, left: Expr, right: Expr) -> Expr {
        let spans = [left.span, right.span];
        self.expr(
            ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
            &spans,
        )
    }

    pub fn not(&self, operand: Expr) -> Expr {
        let spans = [operand.span];
        self.expr(ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) }, &spans)
    }

    pub fn logical(&self, op: LogicalOp, left: Expr, right: Expr) -> Expr {
        let spans = [left.span, right.span];
        self.expr(
            ExprKind::Logical { op, left: Box::new(left), right: Box::new(right) },
            &spans,
        )
    }

    pub fn and(&self, left: Expr, right: Expr) -> Expr {
        self.logical(LogicalOp::And, left, right)
    }

    pub fn or(&self, left: Expr, right: Expr) -> Expr {
        self.logical(LogicalOp::Or, left, right)
    }

    pub fn coalesce(&self, left: Expr, right: Expr) -> Expr {
        self.logical(LogicalOp::Coalesce, left, right)
    }

    pub fn conditional(&self, cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        let spans = [cond.span, then_expr.span, else_expr.span];
        self.expr(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            &spans,
        )
    }

    pub fn call(&self, callee: &str, args: Vec<Expr>) -> Expr {
        let spans: Vec<Span> = args.iter().map(|a| a.span).collect();
        self.expr(ExprKind::Call { callee: callee.to_string(), args }, &spans)
    }

    pub fn method_call(&self, receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let spans: Vec<Span> =
            std::iter::once(receiver.span).chain(args.iter().map(|a| a.span)).collect();
        self.expr(
            ExprKind::MethodCall { receiver: Box::new(receiver), method: method.to_string(), args },
            &spans,
        )
    }

    pub fn field(&self, object: Expr, field: &str) -> Expr {
        let spans = [object.span];
        self.expr(ExprKind::Field { object: Box::new(object), field: field.to_string() }, &spans)
    }

    pub fn await_(&self, operand: Expr) -> Expr {
        let spans = [operand.span];
        self.expr(ExprKind::Await(Box::new(operand)), &spans)
    }

    pub fn lambda(&self, captures: Vec<VarId>, is_async: bool) -> Expr {
        self.expr(ExprKind::Lambda { captures, is_async }, &[])
    }

    // ── Statements ──────────────────────────────────────────────────

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        let spans = [expr.span];
        self.stmt(StmtKind::Expr(expr), &spans)
    }

    /// `await <call>();` as a statement.
    pub fn await_call(&self, callee: &str) -> Stmt {
        let call = self.call(callee, vec![]);
        let awaited = self.await_(call);
        self.expr_stmt(awaited)
    }

    pub fn decl(&self, var: VarId, init: Option<Expr>) -> Stmt {
        let spans: Vec<Span> = init.iter().map(|e| e.span).collect();
        self.stmt(StmtKind::Local { var, init }, &spans)
    }

    pub fn block(&self, body: Vec<Stmt>) -> Stmt {
        let spans = stmt_spans(&body);
        self.stmt(StmtKind::Block(body), &spans)
    }

    pub fn if_(&self, cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
        let mut spans = vec![cond.span];
        spans.extend(stmt_spans(&then_branch));
        if let Some(else_branch) = &else_branch {
            spans.extend(stmt_spans(else_branch));
        }
        self.stmt(StmtKind::If { cond, then_branch, else_branch }, &spans)
    }

    pub fn while_(&self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        let mut spans = vec![cond.span];
        spans.extend(stmt_spans(&body));
        self.stmt(StmtKind::While { cond, body }, &spans)
    }

    pub fn do_while(&self, body: Vec<Stmt>, cond: Expr) -> Stmt {
        let mut spans = stmt_spans(&body);
        spans.push(cond.span);
        self.stmt(StmtKind::DoWhile { body, cond }, &spans)
    }

    pub fn for_(
        &self,
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    ) -> Stmt {
        let mut spans = stmt_spans(&init);
        spans.extend(cond.iter().map(|c| c.span));
        spans.extend(step.iter().map(|s| s.span));
        spans.extend(stmt_spans(&body));
        self.stmt(StmtKind::For { init, cond, step, body }, &spans)
    }

    pub fn foreach(&self, var: VarId, collection: Expr, body: Vec<Stmt>) -> Stmt {
        self.foreach_impl(var, collection, body, false)
    }

    pub fn await_foreach(&self, var: VarId, collection: Expr, body: Vec<Stmt>) -> Stmt {
        self.foreach_impl(var, collection, body, true)
    }

    fn foreach_impl(&self, var: VarId, collection: Expr, body: Vec<Stmt>, is_await: bool) -> Stmt {
        let mut spans = vec![collection.span];
        spans.extend(stmt_spans(&body));
        self.stmt(StmtKind::ForEach { var, collection, body, is_await }, &spans)
    }

    pub fn break_(&self) -> Stmt {
        self.stmt(StmtKind::Break, &[])
    }

    pub fn continue_(&self) -> Stmt {
        self.stmt(StmtKind::Continue, &[])
    }

    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        let spans: Vec<Span> = value.iter().map(|e| e.span).collect();
        self.stmt(StmtKind::Return(value), &spans)
    }

    pub fn yield_return(&self, value: Expr) -> Stmt {
        let spans = [value.span];
        self.stmt(StmtKind::YieldReturn(value), &spans)
    }

    pub fn yield_break(&self) -> Stmt {
        self.stmt(StmtKind::YieldBreak, &[])
    }

    pub fn throw(&self, value: Option<Expr>) -> Stmt {
        let spans: Vec<Span> = value.iter().map(|e| e.span).collect();
        self.stmt(StmtKind::Throw(value), &spans)
    }

    pub fn catch(&self, var: Option<VarId>, filter: Option<Expr>, body: Vec<Stmt>) -> CatchClause {
        let mut spans: Vec<Span> = filter.iter().map(|f| f.span).collect();
        spans.extend(stmt_spans(&body));
        let span = self.span_over(&spans);
        CatchClause { var, filter, body, span }
    }

    pub fn try_(
        &self,
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    ) -> Stmt {
        let mut spans = stmt_spans(&body);
        spans.extend(catches.iter().map(|c| c.span));
        if let Some(finally) = &finally {
            spans.extend(stmt_spans(finally));
        }
        self.stmt(StmtKind::Try { body, catches, finally }, &spans)
    }

    pub fn unsafe_(&self, body: Vec<Stmt>) -> Stmt {
        let spans = stmt_spans(&body);
        self.stmt(StmtKind::Unsafe(body), &spans)
    }

    pub fn lock(&self, target: Expr, body: Vec<Stmt>) -> Stmt {
        let mut spans = vec![target.span];
        spans.extend(stmt_spans(&body));
        self.stmt(StmtKind::Lock { target, body }, &spans)
    }

    pub fn using(&self, var: Option<VarId>, resource: Expr, body: Vec<Stmt>) -> Stmt {
        self.using_impl(var, resource, body, false)
    }

    pub fn await_using(&self, var: Option<VarId>, resource: Expr, body: Vec<Stmt>) -> Stmt {
        self.using_impl(var, resource, body, true)
    }

    fn using_impl(&self, var: Option<VarId>, resource: Expr, body: Vec<Stmt>, is_await: bool) -> Stmt {
        let mut spans = vec![resource.span];
        spans.extend(stmt_spans(&body));
        self.stmt(StmtKind::Using { var, resource, body, is_await }, &spans)
    }
}

fn stmt_spans(stmts: &[Stmt]) -> Vec<Span> {
    stmts.iter().map(|s| s.span).collect()
}
