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

//! Assembles the final MDD edge representing every valid configuration of a
//! [`Schema`] and reads its cardinality. Folds in, in strict order, the
//! structural tables `synth::build` emitted and the cross-tree edges
//! `compile::compile` produced, watching node-count growth to decide when to
//! ask the backend to reorder its variables.

use crate::abstraction::dd::{Edge, Forest};
use crate::common::{Cardinality, ValueRef};
use crate::compile;
use crate::config::Config;
use crate::error::{Result, Warning};
use crate::model::Formula;
use crate::synth::{RawRef, Schema};

/// Size watermarks recorded while folding constraints into the running edge,
/// reported alongside the cardinality (`maxNodes`/`maxEdges` of the output
/// line, §6.2).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Watermarks {
    pub max_nodes: usize,
    pub max_edges: usize,
}

/// Everything [`run`] reports back to its caller: the count of valid
/// configurations, any non-fatal warnings collected on the way, and the size
/// watermarks reached while building the diagram.
#[derive(Clone, Debug)]
pub struct Outcome {
    pub cardinality: Cardinality,
    pub warnings: Vec<Warning>,
    pub watermarks: Watermarks,
}

/// Resolves a raw `(VarIndex, value)` reference using the negated-value
/// overload (§3): `value < domain_size` pins the variable to that value,
/// `value >= domain_size` pins it to `value - domain_size` and complements.
fn resolve_raw<E: Edge, F: Forest<E>>(forest: &mut F, schema: &Schema, raw: RawRef) -> E {
    let (var, value) = raw;
    let domain_len = schema.domain_size(var);
    match ValueRef::decode(value, domain_len) {
        ValueRef::Is(v) => forest.pin(var, v.id()),
        ValueRef::IsNot(v) => {
            let pinned = forest.pin(var, v.id());
            forest.complement(pinned)
        }
    }
}

/// Produces the MDD edge representing every configuration satisfying
/// `schema` and `constraints`, then returns its cardinality. This is the
/// single entry point `main.rs` drives; `forest` is handed in empty (no
/// edges built yet) and is exclusively owned by this call for its duration.
pub fn run<E: Edge, F: Forest<E>>(
    forest: &mut F,
    schema: &Schema,
    constraints: &[Formula],
    config: &Config,
) -> Result<Outcome> {
    // Step 1: the identity for intersection, and the running state. Both
    // start as the universal set; failure here (an inconsistent backend) is
    // fatal, unlike every later step.
    let empty = forest.top();
    let mut start = forest.top();
    let mut watermarks = Watermarks::default();

    // Step 2: mandatoryRoots.
    for &var in &schema.mandatory_roots {
        let none_value = schema.none_index(var);
        let none_edge = forest.pin(var, none_value);
        let selected = forest.complement(none_edge);
        start = forest.intersect(start, selected);
        log::debug!("mandatory root '{}' pinned; cardinality so far {}", schema.name(var), forest.cardinality(start));
    }

    // Step 3: mandatoryImplications, as biconditionals.
    for &(a, b) in &schema.mandatory_implications {
        let edge_a = resolve_raw(forest, schema, a);
        let edge_b = resolve_raw(forest, schema, b);
        let biconditional = forest.equiv(edge_a, edge_b);
        start = forest.intersect(start, biconditional);
    }
    log::debug!("mandatory implications folded; cardinality so far {}", forest.cardinality(start));

    // Step 4: orGroups. Leaf form: children are plain booleans, "selected" is
    // value index 1. Non-leaf form: children carry their own none index.
    for &((parent, parent_none), ref children) in &schema.or_groups_leaf {
        let mut any_selected = forest.bottom();
        for &child in children {
            let selected = forest.pin(child, 1);
            any_selected = forest.union(any_selected, selected);
        }
        let parent_unselected = forest.pin(parent, parent_none);
        let constraint = forest.union(parent_unselected, any_selected);
        start = forest.intersect(start, constraint);
    }
    for &((parent, parent_none), ref children) in &schema.or_groups_nonleaf {
        let mut any_selected = forest.bottom();
        for &(child, child_none) in children {
            let none_edge = forest.pin(child, child_none);
            let selected = forest.complement(none_edge);
            any_selected = forest.union(any_selected, selected);
        }
        let parent_unselected = forest.pin(parent, parent_none);
        let constraint = forest.union(parent_unselected, any_selected);
        start = forest.intersect(start, constraint);
    }
    log::debug!("or-groups folded; cardinality so far {}", forest.cardinality(start));

    // Step 5: altGroups that were not collapsed into one enumerative
    // variable (the 0- or 1-child degenerate case; see `synth::Builder::visit_alt`).
    // "Exactly one selected when parent selected" = (at most one) AND (at
    // least one, given the parent is selected).
    for &((parent, parent_none), ref children) in &schema.alt_groups {
        let mut at_most_one = forest.top();
        for (i, &(child_i, child_i_none)) in children.iter().enumerate() {
            let mut others_none = forest.top();
            for (j, &(child_j, child_j_none)) in children.iter().enumerate() {
                if i != j {
                    let none_edge = forest.pin(child_j, child_j_none);
                    others_none = forest.intersect(others_none, none_edge);
                }
            }
            let child_i_none_edge = forest.pin(child_i, child_i_none);
            let term = forest.union(child_i_none_edge, others_none);
            at_most_one = forest.intersect(at_most_one, term);
        }
        let mut any_selected = forest.bottom();
        for &(child, child_none) in children {
            let none_edge = forest.pin(child, child_none);
            let selected = forest.complement(none_edge);
            any_selected = forest.union(any_selected, selected);
        }
        let parent_unselected = forest.pin(parent, parent_none);
        let at_least_one = forest.union(parent_unselected, any_selected);
        let constraint = forest.intersect(at_most_one, at_least_one);
        start = forest.intersect(start, constraint);
    }
    log::debug!("alt-groups folded; cardinality so far {}", forest.cardinality(start));

    // Step 6: singleImplications (child selected => parent selected),
    // realized as the contrapositive `(child = none) OR (parent != parentValue)`.
    for &(child_raw, parent_raw) in &schema.single_implications {
        let child_none_edge = resolve_raw(forest, schema, child_raw);
        let parent_selected_edge = resolve_raw(forest, schema, parent_raw);
        let parent_unselected = forest.complement(parent_selected_edge);
        let constraint = forest.union(child_none_edge, parent_unselected);
        start = forest.intersect(start, constraint);
    }
    log::debug!("single implications folded; cardinality so far {}", forest.cardinality(start));
    watermarks.max_nodes = watermarks.max_nodes.max(forest.node_count(start));
    watermarks.max_edges = watermarks.max_edges.max(forest.edge_count(start));

    // Step 7: cross-tree constraints.
    let (mut edges, mut warnings) = compile::compile(forest, schema, constraints, config)?;
    if config.sort_when_applying {
        edges.sort_by_key(|&e| forest.node_count(e));
    }

    for (index, edge) in edges.into_iter().enumerate() {
        let previous_nodes = forest.node_count(start);
        let applied = forest.intersect(start, edge);
        let current_nodes = forest.node_count(applied);
        start = applied;
        log::debug!(
            "cross-tree constraint batch #{} applied; nodes {} -> {}",
            index,
            previous_nodes,
            current_nodes
        );

        if config.reorder_variables && should_reorder(previous_nodes, current_nodes) {
            log::info!(
                "node count grew from {} to {}, triggering variable reordering",
                previous_nodes,
                current_nodes
            );
            forest.flush_cache();
            let mut live = [empty, start];
            forest.reorder(&mut live);
            start = live[1];
        }

        watermarks.max_nodes = watermarks.max_nodes.max(forest.node_count(start));
        watermarks.max_edges = watermarks.max_edges.max(forest.edge_count(start));
    }

    // Step 8: read the cardinality, then release every cache the forest held.
    let cardinality = forest.cardinality(start);
    forest.flush_cache();
    warnings.sort_by_key(warning_sort_key);
    Ok(Outcome {
        cardinality,
        warnings,
        watermarks,
    })
}

fn warning_sort_key(w: &Warning) -> usize {
    match w {
        Warning::UnresolvedVar(_) => 0,
        Warning::SkippedConstraint { index, .. } => *index + 1,
    }
}

/// Growth-ratio policy of step 7: reorder when the diagram more than 1.5x'd
/// while between 10^5 and 10^6 nodes, or more than 1.1x'd at or beyond 10^6.
/// Below 10^5 nodes reordering is never worth its own cost.
fn should_reorder(previous_nodes: usize, current_nodes: usize) -> bool {
    if previous_nodes == 0 {
        return false;
    }
    let ratio = current_nodes as f64 / previous_nodes as f64;
    if current_nodes >= 1_000_000 {
        ratio > 1.1
    } else if current_nodes > 100_000 {
        ratio > 1.5
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BigUint, VarIndex};
    use crate::implementation::dd::ReducedForest;
    use crate::model::{FeatureData, FeatureNode};

    fn forest_for(schema: &Schema) -> ReducedForest {
        ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect())
    }

    fn feature(name: &str, mandatory: bool) -> FeatureNode {
        FeatureNode::Feature(FeatureData {
            name: name.to_string(),
            mandatory,
            hidden: false,
        })
    }

    fn data(name: &str, mandatory: bool) -> FeatureData {
        FeatureData {
            name: name.to_string(),
            mandatory,
            hidden: false,
        }
    }

    #[test]
    fn a_single_mandatory_root_feature_counts_exactly_one_configuration() {
        let tree = feature("Root", true);
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        let outcome = run(&mut forest, &schema, &[], &config).unwrap();
        assert_eq!(outcome.cardinality, BigUint::from(1u32));
    }

    #[test]
    fn an_optional_root_feature_counts_two_configurations() {
        let tree = feature("Root", false);
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        let outcome = run(&mut forest, &schema, &[], &config).unwrap();
        assert_eq!(outcome.cardinality, BigUint::from(2u32));
    }

    #[test]
    fn contradictory_mandatory_and_forbid_constraints_count_zero() {
        let tree = FeatureNode::And(data("Root", true), vec![feature("A", false)]);
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        // A is mandatory via a cross-tree "require A" and simultaneously forbidden.
        let constraints = vec![
            Formula::Var("A".to_string()),
            Formula::Not(Box::new(Formula::Var("A".to_string()))),
        ];
        let outcome = run(&mut forest, &schema, &constraints, &config).unwrap();
        assert_eq!(outcome.cardinality, BigUint::from(0u32));
    }

    #[test]
    fn empty_constraints_leave_the_structural_only_count_unchanged() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![feature("A", false), feature("B", false)],
        );
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        let structural_only = run(&mut forest, &schema, &[], &config).unwrap();
        let mut forest2 = forest_for(&schema);
        let with_trivial_constraint = run(
            &mut forest2,
            &schema,
            &[Formula::Disj(vec![
                Formula::Var("A".to_string()),
                Formula::Not(Box::new(Formula::Var("A".to_string()))),
            ])],
            &config,
        )
        .unwrap();
        assert_eq!(structural_only.cardinality, with_trivial_constraint.cardinality);
    }

    /// Hand-built, `gplTiny`-scale tree: one optional feature crossed with a
    /// mandatory 3-way alternative. 2 (A present/absent) * 3 (exactly one of
    /// the alternative's children) = 6 valid configurations, matching the
    /// literal `gplTiny` count from the FeatureIDE benchmark set.
    #[test]
    fn a_hand_built_gpl_tiny_scale_tree_counts_six_configurations() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![
                feature("A", false),
                FeatureNode::Alt(
                    data("Choice", true),
                    vec![feature("C1", false), feature("C2", false), feature("C3", false)],
                ),
            ],
        );
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        let outcome = run(&mut forest, &schema, &[], &config).unwrap();
        assert_eq!(outcome.cardinality, BigUint::from(6u32));
    }

    #[test]
    fn ignoring_hidden_features_never_increases_the_count() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![
                feature("Visible", false),
                FeatureNode::Feature(FeatureData {
                    name: "Secret".to_string(),
                    mandatory: false,
                    hidden: true,
                }),
            ],
        );
        let mut visible_config = Config::default();
        visible_config.ignore_hidden = false;
        let schema_visible = crate::synth::build(&tree, &visible_config).unwrap();
        let mut forest_visible = forest_for(&schema_visible);
        let with_hidden = run(&mut forest_visible, &schema_visible, &[], &visible_config).unwrap();

        let mut hidden_config = Config::default();
        hidden_config.ignore_hidden = true;
        let schema_hidden = crate::synth::build(&tree, &hidden_config).unwrap();
        let mut forest_hidden = forest_for(&schema_hidden);
        let without_hidden = run(&mut forest_hidden, &schema_hidden, &[], &hidden_config).unwrap();

        assert!(without_hidden.cardinality <= with_hidden.cardinality);
    }

    #[test]
    fn an_or_group_forbids_selecting_the_parent_with_no_child_selected() {
        let tree = FeatureNode::Or(
            data("Root", true),
            vec![feature("A", false), feature("B", false)],
        );
        let config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let mut forest = forest_for(&schema);
        let outcome = run(&mut forest, &schema, &[], &config).unwrap();
        // Root is forced selected (mandatory root); (A,B) in {TF,FT,TT} = 3.
        assert_eq!(outcome.cardinality, BigUint::from(3u32));
    }

    #[test]
    fn applying_constraints_individually_or_as_one_intersection_agree() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![feature("A", false), feature("B", false), feature("C", false)],
        );
        let mut config = Config::default();
        let schema = crate::synth::build(&tree, &config).unwrap();
        let constraints = vec![
            Formula::Imp(
                Box::new(Formula::Var("A".to_string())),
                Box::new(Formula::Var("B".to_string())),
            ),
            Formula::Not(Box::new(Formula::Var("C".to_string()))),
        ];

        config.reduction_factor = 1;
        let mut forest_individually = forest_for(&schema);
        let individually = run(&mut forest_individually, &schema, &constraints, &config).unwrap();

        config.reduction_factor = constraints.len();
        let mut forest_batched = forest_for(&schema);
        let batched = run(&mut forest_batched, &schema, &constraints, &config).unwrap();

        assert_eq!(individually.cardinality, batched.cardinality);
    }
}
