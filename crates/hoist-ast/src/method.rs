// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Bound method bodies and their variables.

use std::fmt;

use crate::stmt::Stmt;
use crate::Span;

/// Index of a variable in its method's variable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a variable's storage may be persisted.
///
/// Generated resumable state cannot hold a reference binding or a stack-only
/// value, so only `Value` variables can always be hoisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageClass {
    /// Ordinary value.
    Value,
    /// `ref` / `ref readonly` local.
    Ref,
    /// Local of a by-ref-capable, stack-only value type.
    RefStruct,
}

impl StorageClass {
    /// True for storage classes that must never cross a suspension point.
    pub fn is_restricted(self) -> bool {
        matches!(self, StorageClass::Ref | StorageClass::RefStruct)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageClass::Value => write!(f, "value"),
            StorageClass::Ref => write!(f, "ref local"),
            StorageClass::RefStruct => write!(f, "ref struct local"),
        }
    }
}

/// A named storage location declared by the method.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    pub id: VarId,
    pub name: String,
    pub storage: StorageClass,
    /// Declaration site.
    pub span: Span,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_param: bool,
}

/// Which suspension constructs a method body may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MethodKind {
    Ordinary,
    /// Generator-style: `yield return` / `yield break`.
    Iterator,
    /// `await` only.
    Async,
    /// Both `await` and `yield`.
    AsyncIterator,
}

impl MethodKind {
    pub fn allows_await(self) -> bool {
        matches!(self, MethodKind::Async | MethodKind::AsyncIterator)
    }

    pub fn allows_yield(self) -> bool {
        matches!(self, MethodKind::Iterator | MethodKind::AsyncIterator)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKind::Ordinary => write!(f, "ordinary method"),
            MethodKind::Iterator => write!(f, "iterator"),
            MethodKind::Async => write!(f, "async method"),
            MethodKind::AsyncIterator => write!(f, "async iterator"),
        }
    }
}

/// A fully bound, type-checked method body.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    /// Declared with the `unsafe` modifier: the whole body is an unsafe context.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_unsafe: bool,
    /// Every parameter and local, indexed by `VarId`.
    pub variables: Vec<Variable>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Method {
    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index()).filter(|v| v.id == id)
    }

    pub fn params(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.is_param)
    }

    /// Span covering the body statements, or the method span if empty.
    pub fn body_span(&self) -> Span {
        match (self.body.first(), self.body.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => self.span,
        }
    }
}
