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

//! Compiles cross-tree propositional formulas (§3's `Formula` AST) into MDD
//! edges against a [`Schema`], then optionally batches the result by
//! intersecting consecutive groups together to cut down on the number of
//! `MDDPipeline::apply` calls the caller has to perform.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::abstraction::dd::{Edge, Forest};
use crate::config::{Config, UnresolvedVarPolicy};
use crate::error::{Error, Result, Warning};
use crate::model::Formula;
use crate::synth::Schema;

/// Compiles every constraint in `constraints` to an edge, then batches the
/// result according to `config.reduction_factor`/`shuffle_constraints`.
/// Warnings (unresolved variables, skipped constraints) are returned
/// alongside the edges rather than aborting the whole run, unless
/// `config.on_unresolved_var` is [`UnresolvedVarPolicy::Fail`].
pub fn compile<E: Edge, F: Forest<E>>(
    forest: &mut F,
    schema: &Schema,
    constraints: &[Formula],
    config: &Config,
) -> Result<(Vec<E>, Vec<Warning>)> {
    let mut warnings = Vec::new();
    let mut edges = Vec::with_capacity(constraints.len());
    for (index, formula) in constraints.iter().enumerate() {
        match visit(forest, schema, formula, config, &mut warnings) {
            Ok(edge) => edges.push(edge),
            Err(err) => {
                if matches!(config.on_unresolved_var, UnresolvedVarPolicy::Fail) {
                    return Err(err);
                }
                log::warn!("constraint #{} skipped: {}", index, err);
                warnings.push(Warning::SkippedConstraint {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok((batch(forest, edges, config), warnings))
}

fn visit<E: Edge, F: Forest<E>>(
    forest: &mut F,
    schema: &Schema,
    formula: &Formula,
    config: &Config,
    warnings: &mut Vec<Warning>,
) -> Result<E> {
    match formula {
        Formula::Conj(children) => {
            let mut acc = forest.top();
            for child in children {
                let edge = visit(forest, schema, child, config, warnings)?;
                acc = forest.intersect(acc, edge);
            }
            Ok(acc)
        }
        Formula::Disj(children) => {
            let mut acc = forest.bottom();
            for child in children {
                let edge = visit(forest, schema, child, config, warnings)?;
                acc = forest.union(acc, edge);
            }
            Ok(acc)
        }
        Formula::Not(child) => {
            let edge = visit(forest, schema, child, config, warnings)?;
            Ok(forest.complement(edge))
        }
        Formula::Imp(a, b) => {
            let ea = visit(forest, schema, a, config, warnings)?;
            let eb = visit(forest, schema, b, config, warnings)?;
            let not_a = forest.complement(ea);
            Ok(forest.union(not_a, eb))
        }
        Formula::Eq(a, b) => {
            let ea = visit(forest, schema, a, config, warnings)?;
            let eb = visit(forest, schema, b, config, warnings)?;
            Ok(forest.equiv(ea, eb))
        }
        Formula::Var(name) => resolve_var(forest, schema, name, config, warnings),
    }
}

fn resolve_var<E: Edge, F: Forest<E>>(
    forest: &mut F,
    schema: &Schema,
    name: &str,
    config: &Config,
    warnings: &mut Vec<Warning>,
) -> Result<E> {
    let resolved_name = schema.substitution(name).unwrap_or(name);

    if let Some(var) = schema.var_index(resolved_name) {
        let domain_len = schema.domain_size(var);
        return if domain_len == 2 {
            // boolean feature: the "true" label was allocated at index 1.
            Ok(forest.pin(var, 1))
        } else {
            // enumerative variable representing the feature itself.
            let none_edge = forest.pin(var, schema.none_index(var));
            Ok(forest.complement(none_edge))
        };
    }

    if let Some((var, position)) = schema.value_label(resolved_name) {
        return Ok(forest.pin(var, position));
    }

    if let Some((var, positions)) = schema.and_leaf(resolved_name) {
        let mut acc = forest.bottom();
        for &position in positions {
            let edge = forest.pin(*var, position);
            acc = forest.union(acc, edge);
        }
        return Ok(acc);
    }

    log::warn!("unresolved variable '{}' in a cross-tree constraint", name);
    warnings.push(Warning::UnresolvedVar(name.to_string()));
    match config.on_unresolved_var {
        UnresolvedVarPolicy::Fail => Err(Error::UnresolvedVar(name.to_string())),
        UnresolvedVarPolicy::WarnAndIgnore => Ok(forest.top()),
    }
}

fn batch<E: Edge, F: Forest<E>>(forest: &mut F, mut edges: Vec<E>, config: &Config) -> Vec<E> {
    if edges.len() <= 1 {
        return edges;
    }

    if config.shuffle_constraints {
        let mut rng = StdRng::seed_from_u64(config.seed);
        edges.shuffle(&mut rng);
    } else {
        edges.sort_by_key(|&e| forest.node_count(e));
        edges = interleave_from_both_ends(edges);
    }

    if config.reduction_factor <= 1 {
        return edges;
    }

    let mut batched = Vec::with_capacity(edges.len().div_ceil(config.reduction_factor));
    for group in edges.chunks(config.reduction_factor) {
        let mut acc = forest.top();
        for &edge in group {
            acc = forest.intersect(acc, edge);
        }
        batched.push(acc);
    }
    batched
}

/// Reorders an ascending-by-size list so the largest and smallest remaining
/// elements alternate, keeping any one batching group from being either all
/// tiny or all huge.
fn interleave_from_both_ends<E: Edge>(ascending: Vec<E>) -> Vec<E> {
    let mut out = Vec::with_capacity(ascending.len());
    let mut lo = 0;
    let mut hi = ascending.len();
    let mut take_from_top = true;
    while lo < hi {
        if take_from_top {
            hi -= 1;
            out.push(ascending[hi]);
        } else {
            out.push(ascending[lo]);
            lo += 1;
        }
        take_from_top = !take_from_top;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::VarIndex;
    use crate::implementation::dd::ReducedForest;
    use crate::model::FeatureData;
    use crate::model::FeatureNode;

    fn tiny_schema() -> (Schema, Config) {
        let config = Config::default();
        let tree = FeatureNode::And(
            FeatureData { name: "Root".into(), mandatory: true, hidden: false },
            vec![
                FeatureNode::Feature(FeatureData { name: "A".into(), mandatory: false, hidden: false }),
                FeatureNode::Feature(FeatureData { name: "B".into(), mandatory: false, hidden: false }),
            ],
        );
        (crate::synth::build(&tree, &config).unwrap(), config)
    }

    #[test]
    fn a_direct_boolean_var_resolves_to_pinning_it_true() {
        let (schema, config) = tiny_schema();
        let mut forest = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let formula = Formula::Var("A".to_string());
        let (edges, warnings) = compile(&mut forest, &schema, &[formula], &config).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(edges.len(), 1);
        let a = schema.var_index("A").unwrap();
        assert_eq!(edges[0], forest.pin(a, 1));
    }

    #[test]
    fn not_of_a_var_is_the_full_complement() {
        let (schema, config) = tiny_schema();
        let mut forest = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let formula = Formula::Not(Box::new(Formula::Var("A".to_string())));
        let (edges, _) = compile(&mut forest, &schema, &[formula], &config).unwrap();
        let a = schema.var_index("A").unwrap();
        let a_true = forest.pin(a, 1);
        let expected = forest.complement(a_true);
        assert_eq!(edges[0], expected);
    }

    #[test]
    fn an_unresolved_var_is_treated_as_unconstrained_and_warns() {
        let (schema, config) = tiny_schema();
        let mut forest = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let formula = Formula::Var("DoesNotExist".to_string());
        let (edges, warnings) = compile(&mut forest, &schema, &[formula], &config).unwrap();
        assert_eq!(edges[0], forest.top());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn unresolved_var_aborts_under_the_fail_policy() {
        let (schema, mut config) = tiny_schema();
        config.on_unresolved_var = UnresolvedVarPolicy::Fail;
        let mut forest = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let formula = Formula::Var("DoesNotExist".to_string());
        assert!(compile(&mut forest, &schema, &[formula], &config).is_err());
    }

    #[test]
    fn shuffle_still_applies_when_reduction_factor_is_left_at_its_default_of_one() {
        let (schema, mut config) = tiny_schema();
        config.shuffle_constraints = true;
        let constraints = vec![
            Formula::Var("A".to_string()),
            Formula::Var("B".to_string()),
            Formula::Not(Box::new(Formula::Var("A".to_string()))),
            Formula::Not(Box::new(Formula::Var("B".to_string()))),
        ];

        config.seed = 1;
        let mut forest1 = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let (edges1, _) = compile(&mut forest1, &schema, &constraints, &config).unwrap();

        config.seed = 2;
        let mut forest2 = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let (edges2, _) = compile(&mut forest2, &schema, &constraints, &config).unwrap();

        assert_eq!(edges1.len(), constraints.len(), "reduction_factor == 1 must not batch edges together");
        assert_ne!(
            edges1, edges2,
            "a flag on reduction_factor must not make --shuffle a no-op at the default reduction factor"
        );
    }

    #[test]
    fn batching_intersects_groups_of_reduction_factor_constraints() {
        let (schema, mut config) = tiny_schema();
        config.reduction_factor = 2;
        let mut forest = ReducedForest::new((0..schema.nb_vars()).map(|i| schema.domain_size(VarIndex(i))).collect());
        let constraints = vec![
            Formula::Var("A".to_string()),
            Formula::Var("B".to_string()),
            Formula::Var("A".to_string()),
        ];
        let (edges, _) = compile(&mut forest, &schema, &constraints, &config).unwrap();
        assert_eq!(edges.len(), 2, "3 constraints batched by 2 -> ceil(3/2) groups");
    }
}
