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

//! Owned ASTs for a feature tree and its cross-tree constraints, plus the
//! `roxmltree`-backed front-end (`model::xml`) that builds them from a model
//! file. Everything downstream of this module (`synth`, `compile`, `pipeline`)
//! works only with these plain tagged-variant types — a feature-tree visitor
//! is a plain function that matches on `FeatureNode`, not a polymorphic
//! dispatch hierarchy.

pub mod xml;

/// One node of the feature tree. `description` elements from the XML source
/// are dropped while building this tree; they carry no semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeatureNode {
    Feature(FeatureData),
    And(FeatureData, Vec<FeatureNode>),
    Or(FeatureData, Vec<FeatureNode>),
    Alt(FeatureData, Vec<FeatureNode>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureData {
    pub name: String,
    pub mandatory: bool,
    pub hidden: bool,
}

impl FeatureNode {
    pub fn data(&self) -> &FeatureData {
        match self {
            FeatureNode::Feature(d)
            | FeatureNode::And(d, _)
            | FeatureNode::Or(d, _)
            | FeatureNode::Alt(d, _) => d,
        }
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn mandatory(&self) -> bool {
        self.data().mandatory
    }

    pub fn hidden(&self) -> bool {
        self.data().hidden
    }

    pub fn children(&self) -> &[FeatureNode] {
        match self {
            FeatureNode::Feature(_) => &[],
            FeatureNode::And(_, c) | FeatureNode::Or(_, c) | FeatureNode::Alt(_, c) => c,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, FeatureNode::Feature(_))
    }
}

/// A cross-tree propositional formula. `var` carries a raw feature/value name
/// to be resolved against the schema at compile time (see `compile::resolve`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Formula {
    Var(String),
    Not(Box<Formula>),
    Imp(Box<Formula>, Box<Formula>),
    Eq(Box<Formula>, Box<Formula>),
    Disj(Vec<Formula>),
    Conj(Vec<Formula>),
}

/// The fully parsed input: a feature tree plus zero or more cross-tree rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureModel {
    pub root: FeatureNode,
    pub constraints: Vec<Formula>,
}
