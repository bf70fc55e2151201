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

//! `Config` groups every process-wide toggle the original tool kept as
//! module-level statics into one immutable value, built once by the CLI and
//! threaded by reference through `FeatureSynth`, `ConstraintCompiler` and
//! `MDDPipeline`. Nothing in this crate reaches for a global/static instead.

/// What to do when a cross-tree constraint names a feature that cannot be
/// resolved to a schema variable, a substitution, an enumerated value, or an
/// AND-bitmask entry. The original tool always warned-and-ignored; here that
/// is an explicit, documented choice rather than an accident of the
/// implementation.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum UnresolvedVarPolicy {
    /// Treat the occurrence as unconstrained (`⊤`) and record a [`crate::error::Warning`].
    #[default]
    WarnAndIgnore,
    /// Abort compilation with [`crate::error::Error::UnresolvedVar`].
    Fail,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Skip hidden features during synthesis.
    pub ignore_hidden: bool,
    /// Sort cross-tree constraints by node-count, ascending, before applying.
    pub sort_when_applying: bool,
    /// Shuffle cross-tree constraints (seeded by `seed`) before batching.
    pub shuffle_constraints: bool,
    /// Seed for the constraint shuffle; fixed by default so runs reproduce.
    pub seed: u64,
    /// Enable the backend's dynamic variable reordering under growth thresholds.
    pub reorder_variables: bool,
    /// Merge small AND-groups of leaf features into one bitmask variable.
    pub compress_and: bool,
    /// Maximum child count for an AND-group to be eligible for compression.
    pub compress_and_threshold: usize,
    /// Number of consecutive compiled constraint edges intersected together
    /// before being applied to the running MDD (0 or 1 disables batching).
    pub reduction_factor: usize,
    /// Policy for constraints that reference an unresolved variable name.
    pub on_unresolved_var: UnresolvedVarPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ignore_hidden: false,
            sort_when_applying: false,
            shuffle_constraints: false,
            seed: 0x5EED_FEED_CAFE_D00D,
            reorder_variables: false,
            compress_and: false,
            compress_and_threshold: 5,
            reduction_factor: 1,
            on_unresolved_var: UnresolvedVarPolicy::WarnAndIgnore,
        }
    }
}
