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

//! This is the main abstraction that every MDD-consuming stage of this crate
//! (`FeatureSynth` never touches it; `ConstraintCompiler` and `MDDPipeline`
//! depend on nothing else) is written against. It defines the algebra of sets
//! of configurations as a boolean function over `N` bounded discrete
//! variables, without committing to any particular node representation.
//!
//! Implementors provide one concrete node representation (this crate ships
//! `implementation::dd::ReducedForest`) and the CORE stays generic over it.

use crate::common::{Cardinality, VarIndex};

/// An opaque handle to a node (or terminal) in some forest. Cheap to copy,
/// comparable and hashable so it can key a compute-table / memo cache.
pub trait Edge: Copy + Eq + std::hash::Hash + std::fmt::Debug {}
impl<T: Copy + Eq + std::hash::Hash + std::fmt::Debug> Edge for T {}

/// The algebraic contract a DD backend must provide. `E` is the backend's
/// edge handle type. All operations are total: they never panic on a
/// well-formed edge produced by this same forest.
pub trait Forest<E: Edge> {
    /// The constant-true function over all `nb_vars()` variables: the
    /// universal set of configurations.
    fn top(&self) -> E;

    /// The constant-false function: the empty set of configurations.
    fn bottom(&self) -> E;

    /// The number of variables this forest's domain was created with.
    fn nb_vars(&self) -> usize;

    /// The size of `var`'s domain (number of distinct value labels, including
    /// the "none" sentinel).
    fn domain_size(&self, var: VarIndex) -> usize;

    /// The edge representing "`var` equals `value`", every other variable free.
    /// `value` must be `< domain_size(var)`.
    fn pin(&mut self, var: VarIndex, value: usize) -> E;

    /// Set union (`+`).
    fn union(&mut self, a: E, b: E) -> E;

    /// Set intersection (`*`).
    fn intersect(&mut self, a: E, b: E) -> E;

    /// Set difference (`a - b`, i.e. `a` and not `b`).
    fn diff(&mut self, a: E, b: E) -> E;

    /// Boolean equivalence (`a <=> b`) as a set of assignments.
    fn equiv(&mut self, a: E, b: E) -> E;

    /// Complement: `top() - a`.
    fn complement(&mut self, a: E) -> E {
        let top = self.top();
        self.diff(top, a)
    }

    /// Arbitrary-precision count of satisfying assignments.
    fn cardinality(&self, edge: E) -> Cardinality;

    /// Number of distinct internal nodes reachable from `edge`.
    fn node_count(&self, edge: E) -> usize;

    /// Number of edges (node-to-child references) reachable from `edge`.
    fn edge_count(&self, edge: E) -> usize;

    /// An opaque operation that may change the backend's internal variable
    /// order to reduce diagram size. `live` lists every edge the caller still
    /// holds a reference to; each is rewritten in place to an (possibly new)
    /// edge handle denoting the exact same set of configurations under the
    /// backend's new internal order. Edges not listed in `live` are free to
    /// be discarded by the backend.
    fn reorder(&mut self, live: &mut [E]);

    /// Discards memoized apply results. Invoked before `reorder()` and once
    /// at pipeline exit.
    fn flush_cache(&mut self);
}
