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

//! # fm-mdd-count
//! Counts the number of valid configurations ("products") of a feature model
//! by compiling its tree structure and cross-tree constraints into a
//! multi-valued decision diagram and reading off the diagram's cardinality.
//!
//! The pipeline is four stages, each depending only on the one before it:
//! - [`model`] parses an XML model file into an owned feature tree and a list
//!   of cross-tree propositional formulas.
//! - [`synth`] walks the feature tree into a [`synth::Schema`]: a flat list of
//!   bounded discrete variables plus the auxiliary tables that encode
//!   mandatory/group/dependency structure.
//! - [`compile`] walks the cross-tree formulas against that schema, producing
//!   one MDD edge per constraint.
//! - [`pipeline`] folds the schema's structural tables and the compiled
//!   constraint edges into a single running edge and reads its cardinality.
//!
//! None of the above commit to a concrete decision-diagram representation;
//! they are written against the [`abstraction::dd::Forest`] trait. This crate
//! ships exactly one implementation of it, [`implementation::dd::ReducedForest`].
pub mod abstraction;
pub mod common;
pub mod compile;
pub mod config;
pub mod error;
pub mod implementation;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod synth;
