// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Error kinds produced by the CORE. Synthesis errors are fatal (propagated
//! with `?`); per-constraint compilation/application errors are isolated by
//! the caller and surfaced as [`Warning`]s instead of aborting the whole run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid node kind `{0}`")]
    InvalidNodeKind(String),

    #[error("node `{node}` is missing required attribute `{attribute}`")]
    MissingAttribute {
        node: String,
        attribute: &'static str,
    },

    #[error("constraint references unresolved variable `{0}`")]
    UnresolvedVar(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML document: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A non-fatal issue raised while compiling or applying a single constraint.
/// Accumulated by [`crate::pipeline::MDDPipeline`] and returned alongside the
/// final cardinality rather than aborting the run, unless
/// [`crate::config::UnresolvedVarPolicy::Fail`] is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A cross-tree constraint named a feature that resolved to none of
    /// `substitutions`, the schema, an enumerated value, or `andLeafs`; the
    /// occurrence was treated as unconstrained (`⊤`).
    UnresolvedVar(String),
    /// The backend reported a recoverable failure while applying one
    /// constraint; that constraint was skipped.
    SkippedConstraint { index: usize, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnresolvedVar(name) => {
                write!(f, "unresolved variable `{}` treated as unconstrained", name)
            }
            Warning::SkippedConstraint { index, reason } => {
                write!(f, "constraint #{} skipped: {}", index, reason)
            }
        }
    }
}
