// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error code registry.
//!
//! Maps analyzer codes (H0001..H0007) to titles, categories and a short
//! explanation. Used by `hoist explain <code>` and the JSON report.

use std::collections::HashMap;

pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, ErrorCodeInfo>,
}

pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// What may live in the generated state.
    Persistence,
    /// Lexical contexts a suspension may not sit in.
    Context,
    /// Where the method can and cannot resume.
    Resumption,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Persistence => write!(f, "Persistence"),
            ErrorCategory::Context => write!(f, "Context"),
            ErrorCategory::Resumption => write!(f, "Resumption"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

macro_rules! register_codes {
    ($($code:literal => ($title:literal, $cat:expr, $explain:literal)),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
                explanation: $explain,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                "H0001" => ("forbidden cross-suspension persistence", Persistence,
                    "A ref local or a local of a stack-only type is still needed after a \
                     suspension point it was defined before. The resumable state cannot \
                     hold it, so the value would not survive the suspension. Finish using \
                     the local before suspending, or create it again after resuming."),
                "H0002" => ("suspension inside unsafe context", Context,
                    "An unsafe block or unsafe method contains an await or yield. Pointers \
                     taken inside an unsafe context are not tracked across resumption, so \
                     suspending there is rejected whatever the locals involved."),
                "H0003" => ("suspension inside mutual-exclusion scope", Context,
                    "A lock statement contains a suspension point. The method may resume on \
                     another thread, or much later, while the lock is still held."),
                "H0004" => ("suspension not allowed in this method kind", Resumption,
                    "`await` needs an async method or async iterator. `yield` needs an \
                     iterator or async iterator."),
                "H0005" => ("yield inside an exception handler", Resumption,
                    "An iterator cannot resume in a finally clause, a catch clause, or the \
                     protected body of a try statement that has catch clauses."),
                "H0006" => ("unreachable suspension point", Resumption,
                    "No control-flow path from the method entry reaches this suspension \
                     point, so the state machine would never resume there."),
                "H0007" => ("malformed method body", Internal,
                    "The method body could not be turned into a control-flow graph. The \
                     method is left unanalyzed and all of its locals stay on the stack."),
            },
        }
    }
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    /// All registered codes, sorted.
    pub fn all(&self) -> Vec<&ErrorCodeInfo> {
        let mut entries: Vec<_> = self.codes.values().collect();
        entries.sort_by_key(|e| e.code);
        entries
    }
}
