// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Region classification for resumable methods.
//!
//! Walks the bound tree and records every lexical construct that constrains
//! suspension: `unsafe` blocks and methods carry `Unsafe`, `lock` statements
//! carry `MutexScope`. Regions nest; the effective constraints at a point are
//! the union over the enclosing chain.

mod constraint;

pub use constraint::{Constraint, ConstraintSet};

use std::collections::HashMap;

use hoist_ast::expr::{Expr, ExprKind};
use hoist_ast::stmt::{Stmt, StmtKind};
use hoist_ast::{Method, NodeId, Span};
use hoist_cfg::{MethodGraph, Position, SuspensionId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

impl RegionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    UnsafeBlock,
    /// The whole body of a method declared `unsafe`.
    UnsafeMethod,
    Lock,
}

impl RegionKind {
    pub fn describe(self) -> &'static str {
        match self {
            RegionKind::UnsafeBlock => "unsafe block",
            RegionKind::UnsafeMethod => "unsafe method",
            RegionKind::Lock => "lock statement",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    pub kind: RegionKind,
    /// Tags this region introduces itself.
    pub tags: ConstraintSet,
    pub parent: Option<RegionId>,
    pub span: Span,
    /// The statement that opened the region (`DUMMY` for an unsafe method).
    pub node: NodeId,
}

/// Classified regions of one method, plus the lookup tables the checker
/// queries.
#[derive(Debug, Clone, Default)]
pub struct RegionTree {
    regions: Vec<Region>,
    /// Innermost region of every node inside at least one region.
    node_regions: HashMap<NodeId, RegionId>,
    /// Region spanning the whole body, if the method is unsafe.
    root: Option<RegionId>,
    /// Innermost region of each suspension point, indexed by id.
    suspension_regions: Vec<Option<RegionId>>,
}

/// Classify the regions of `method`; `graph` must have been built from it.
pub fn classify(method: &Method, graph: &MethodGraph) -> RegionTree {
    let mut classifier = RegionClassifier {
        tree: RegionTree::default(),
        stack: Vec::new(),
    };

    if method.is_unsafe {
        let root = classifier.open(RegionKind::UnsafeMethod, method.span, NodeId::DUMMY);
        classifier.tree.root = Some(root);
    }
    classifier.visit_stmts(&method.body);

    let mut tree = classifier.tree;
    tree.suspension_regions = graph
        .suspensions
        .iter()
        .map(|s| tree.innermost(s.node))
        .collect();

    debug!(
        method = %method.name,
        regions = tree.regions.len(),
        "classified regions"
    );
    tree
}

impl RegionTree {
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Innermost region enclosing `node`.
    pub fn innermost(&self, node: NodeId) -> Option<RegionId> {
        self.node_regions.get(&node).copied().or(self.root)
    }

    /// `id` followed by its ancestors, innermost first.
    pub fn chain(&self, id: Option<RegionId>) -> Vec<RegionId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(region) = current {
            chain.push(region);
            current = self.region(region).parent;
        }
        chain
    }

    /// Union of the tags of `id` and all its ancestors.
    pub fn effective(&self, id: Option<RegionId>) -> ConstraintSet {
        self.chain(id)
            .into_iter()
            .fold(ConstraintSet::EMPTY, |acc, r| acc.union(self.region(r).tags))
    }

    /// Effective constraints at a graph position.
    pub fn effective_at(&self, graph: &MethodGraph, pos: Position) -> ConstraintSet {
        match graph.instr_at(pos) {
            Some(instr) => self.effective(self.innermost(instr.node)),
            None => self.effective(self.root),
        }
    }

    /// Enclosing region chain of a suspension point, innermost first.
    pub fn suspension_chain(&self, id: SuspensionId) -> Vec<RegionId> {
        self.chain(self.suspension_regions.get(id.index()).copied().flatten())
    }

    pub fn suspension_constraints(&self, id: SuspensionId) -> ConstraintSet {
        self.effective(self.suspension_regions.get(id.index()).copied().flatten())
    }

    /// Suspension points lexically inside `region`, at any depth, in id order.
    pub fn suspensions_in(&self, region: RegionId) -> Vec<SuspensionId> {
        (0..self.suspension_regions.len())
            .map(|i| SuspensionId(i as u32))
            .filter(|s| self.suspension_chain(*s).contains(&region))
            .collect()
    }
}

struct RegionClassifier {
    tree: RegionTree,
    /// Open regions, innermost last.
    stack: Vec<RegionId>,
}

impl RegionClassifier {
    fn open(&mut self, kind: RegionKind, span: Span, node: NodeId) -> RegionId {
        let id = RegionId(self.tree.regions.len() as u32);
        let tags = match kind {
            RegionKind::UnsafeBlock | RegionKind::UnsafeMethod => Constraint::Unsafe,
            RegionKind::Lock => Constraint::MutexScope,
        };
        self.tree.regions.push(Region {
            id,
            kind,
            tags: ConstraintSet::of(tags),
            parent: self.stack.last().copied(),
            span,
            node,
        });
        self.stack.push(id);
        id
    }

    fn close(&mut self) {
        self.stack.pop();
    }

    fn mark(&mut self, node: NodeId) {
        if let Some(region) = self.stack.last() {
            self.tree.node_regions.insert(node, *region);
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.mark(stmt.id);
        match &stmt.kind {
            StmtKind::Expr(e) | StmtKind::YieldReturn(e) => self.visit_expr(e),
            StmtKind::Local { init, .. } => {
                if let Some(init) = init {
                    self.visit_expr(init);
                }
            }
            StmtKind::Return(e) | StmtKind::Throw(e) => {
                if let Some(e) = e {
                    self.visit_expr(e);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::YieldBreak => {}
            StmtKind::Block(body) => self.visit_stmts(body),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond);
                self.visit_stmts(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmts(else_branch);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.visit_expr(cond);
                self.visit_stmts(body);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.visit_stmts(init);
                if let Some(cond) = cond {
                    self.visit_expr(cond);
                }
                for e in step {
                    self.visit_expr(e);
                }
                self.visit_stmts(body);
            }
            StmtKind::ForEach {
                collection, body, ..
            } => {
                self.visit_expr(collection);
                self.visit_stmts(body);
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                self.visit_stmts(body);
                for clause in catches {
                    if let Some(filter) = &clause.filter {
                        self.visit_expr(filter);
                    }
                    self.visit_stmts(&clause.body);
                }
                if let Some(finally) = finally {
                    self.visit_stmts(finally);
                }
            }
            StmtKind::Using { resource, body, .. } => {
                self.visit_expr(resource);
                self.visit_stmts(body);
            }
            StmtKind::Unsafe(body) => {
                self.open(RegionKind::UnsafeBlock, stmt.span, stmt.id);
                self.visit_stmts(body);
                self.close();
            }
            // The lock target is evaluated before the lock is taken.
            StmtKind::Lock { target, body } => {
                self.visit_expr(target);
                self.open(RegionKind::Lock, stmt.span, stmt.id);
                self.visit_stmts(body);
                self.close();
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        self.mark(expr.id);
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Var(_) | ExprKind::Ref(_) => {}
            // Lambda bodies are separate methods.
            ExprKind::Lambda { .. } => {}
            ExprKind::Assign { value, .. } => self.visit_expr(value),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Unary { operand, .. } | ExprKind::Await(operand) => self.visit_expr(operand),
            ExprKind::Field { object, .. } => self.visit_expr(object),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.visit_expr(arg);
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.visit_expr(receiver);
                for arg in args {
                    self.visit_expr(arg);
                }
            }
        }
    }
}
