// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Bound statement nodes.

use crate::expr::Expr;
use crate::{NodeId, Span, VarId};

/// A statement in the bound tree.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// Local declaration, optionally initialized
    Local {
        var: VarId,
        init: Option<Expr>,
    },
    /// Nested block `{ ... }`
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `foreach (var in collection)`; `await foreach` suspends at every
    /// iteration test.
    ForEach {
        var: VarId,
        collection: Expr,
        body: Vec<Stmt>,
        #[cfg_attr(feature = "serde", serde(default))]
        is_await: bool,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    /// `yield return value`
    YieldReturn(Expr),
    /// `yield break`
    YieldBreak,
    Throw(Option<Expr>),
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    /// `unsafe { ... }`
    Unsafe(Vec<Stmt>),
    /// `lock (target) { ... }`
    Lock {
        target: Expr,
        body: Vec<Stmt>,
    },
    /// `using (var = resource) { ... }`; `await using` suspends when the
    /// resource is disposed.
    Using {
        var: Option<VarId>,
        resource: Expr,
        body: Vec<Stmt>,
        #[cfg_attr(feature = "serde", serde(default))]
        is_await: bool,
    },
}

/// `catch (var) when (filter) { body }`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatchClause {
    pub var: Option<VarId>,
    pub filter: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}
