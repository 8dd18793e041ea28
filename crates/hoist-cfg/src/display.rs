// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Display implementations for graph types.

use std::fmt;

use crate::*;

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

impl fmt::Display for SuspensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl fmt::Display for SuspendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendKind::Yield => write!(f, "yield"),
            SuspendKind::Await => write!(f, "await"),
        }
    }
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrKind::Def(var) => write!(f, "def _{}", var.0),
            InstrKind::Use(var) => write!(f, "use _{}", var.0),
            InstrKind::Suspend(id) => write!(f, "suspend {}", id),
        }
    }
}

fn write_targets(f: &mut fmt::Formatter<'_>, targets: &[BlockId]) -> fmt::Result {
    for (i, t) in targets.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", t)?;
    }
    Ok(())
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Goto { target } => write!(f, "goto {}", target),
            Terminator::Branch {
                then_block,
                else_block,
            } => write!(f, "branch {}, {}", then_block, else_block),
            Terminator::Switch { targets } => {
                write!(f, "switch [")?;
                write_targets(f, targets)?;
                write!(f, "]")
            }
            Terminator::EndFinally { targets, unwind } => {
                write!(f, "endfinally [")?;
                write_targets(f, targets)?;
                write!(f, "] unwind {}", unwind)
            }
            Terminator::Throw { target } => write!(f, "throw -> {}", target),
            Terminator::Return => write!(f, "return"),
            Terminator::Unwind => write!(f, "unwind"),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Display for MethodGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph {} {{", self.method)?;
        for block in &self.blocks {
            write!(f, "  {}:", block.id)?;
            if block.id == self.entry {
                write!(f, " // entry")?;
            } else if block.id == self.return_exit {
                write!(f, " // return exit")?;
            } else if block.id == self.throw_exit {
                write!(f, " // throw exit")?;
            } else if !self.is_reachable(block.id) {
                write!(f, " // unreachable")?;
            }
            writeln!(f)?;
            for instr in &block.instrs {
                writeln!(f, "    {}", instr.kind)?;
            }
            write!(f, "    {}", block.terminator)?;
            if let Some(handler) = block.handler {
                write!(f, "  // catch -> {}", handler)?;
            }
            writeln!(f)?;
        }
        for point in &self.suspensions {
            writeln!(
                f,
                "  {}: {} at {}[{}]",
                point.id, point.kind, point.position.block, point.position.offset
            )?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerContext::None => write!(f, "method body"),
            HandlerContext::TryWithCatch => write!(f, "try block with a catch clause"),
            HandlerContext::Catch => write!(f, "catch clause"),
            HandlerContext::Finally => write!(f, "finally clause"),
        }
    }
}
