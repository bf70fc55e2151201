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

//! The prelude module is only present to ease your life while driving the
//! whole pipeline from a single call site (as `main.rs` does). That way you
//! don't have to care about manually importing every submodule's types.
//!
//! ```
//! use fm_mdd_count::prelude::*;
//! ```

pub use crate::abstraction::dd::Forest;
pub use crate::common::{BigUint, Cardinality, VarIndex, ValueIndex, ValueRef};
pub use crate::config::{Config, UnresolvedVarPolicy};
pub use crate::error::{Error, Result, Warning};
pub use crate::implementation::dd::{ReducedEdge, ReducedForest};
pub use crate::model::{FeatureModel, FeatureNode, Formula};
pub use crate::pipeline::{Outcome, Watermarks};
pub use crate::synth::Schema;
