// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON input: bound methods plus the source text their spans index into.

use hoist_ast::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Text the method spans refer to. Only used for rendering.
    #[serde(default)]
    pub source: String,
    pub methods: Vec<Method>,
}

impl SourceFile {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
