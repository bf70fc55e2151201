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

//! This module defines the most basic data types shared by every stage of the
//! pipeline: `VarIndex`/`ValueIndex`, the negated-value overload used by the
//! auxiliary tables, and `Cardinality` (an arbitrary-precision count of
//! satisfying assignments).

pub use num::BigUint;

/// Identifies one of the `N` variables allocated by [`crate::synth::FeatureSynth`].
/// Variables are numbered in synthesis (depth-first allocation) order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VarIndex(pub usize);

impl VarIndex {
    #[inline]
    pub fn id(self) -> usize {
        self.0
    }
}

/// Identifies one label within a variable's domain. Every domain reserves
/// exactly one `ValueIndex` for its "none" sentinel; the rest are "selected"
/// labels (for a boolean variable there is only one such label).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ValueIndex(pub usize);

impl ValueIndex {
    #[inline]
    pub fn id(self) -> usize {
        self.0
    }
}

/// The number of satisfying assignments of an MDD edge. Arbitrary precision:
/// real feature models routinely exceed `u64::MAX` (the `uClibC` and `eshop`
/// benchmark models from the FeatureIDE corpus both do).
pub type Cardinality = BigUint;

/// Auxiliary-table entries may reference "the negation of value `v`" for a
/// variable of domain size `domain_len` by encoding the index `v + domain_len`.
/// These two functions are the single place that encodes/decodes that overload
/// so every consumer agrees on the convention.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueRef {
    /// The variable must equal this value.
    Is(ValueIndex),
    /// The variable must NOT equal this value.
    IsNot(ValueIndex),
}

impl ValueRef {
    pub fn encode(self, domain_len: usize) -> usize {
        match self {
            ValueRef::Is(v) => v.id(),
            ValueRef::IsNot(v) => v.id() + domain_len,
        }
    }

    pub fn decode(raw: usize, domain_len: usize) -> ValueRef {
        if raw >= domain_len {
            ValueRef::IsNot(ValueIndex(raw - domain_len))
        } else {
            ValueRef::Is(ValueIndex(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_ref_roundtrips_through_the_negated_overload() {
        let domain_len = 4;
        assert_eq!(ValueRef::Is(ValueIndex(2)).encode(domain_len), 2);
        assert_eq!(ValueRef::IsNot(ValueIndex(1)).encode(domain_len), 5);
        assert_eq!(ValueRef::decode(2, domain_len), ValueRef::Is(ValueIndex(2)));
        assert_eq!(ValueRef::decode(5, domain_len), ValueRef::IsNot(ValueIndex(1)));
    }
}
