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

//! Translates a feature tree into a [`Schema`]: a flat list of MDD variables
//! plus the auxiliary tables `MDDPipeline` folds into structural constraints.
//! Emits no MDD nodes itself; everything here is pure data.

use std::collections::HashMap;

use crate::common::VarIndex;
use crate::config::Config;
use crate::error::Result;
use crate::model::{FeatureData, FeatureNode};

/// One MDD variable: a name and an ordered domain of value labels. Every
/// domain carries exactly one "none" label (`"false"` for booleans, `"NONE"`
/// for enumeratives).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub domain: Vec<String>,
}

impl Variable {
    pub fn none_index(&self) -> usize {
        self.domain
            .iter()
            .position(|label| label == "NONE" || label == "false")
            .expect("every variable domain carries exactly one none label")
    }
}

/// A reference to a value of some variable, using the negated-value overload:
/// `raw < domain_len` means "equals this value"; `raw >= domain_len` means
/// "does not equal value `raw - domain_len`".
pub type RawRef = (VarIndex, usize);
pub type Implication = (RawRef, RawRef);

/// The variable schema and every auxiliary table `FeatureSynth` emits while
/// walking a feature tree. Built once, read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    variables: Vec<Variable>,
    var_by_name: HashMap<String, usize>,
    /// Reverse lookup for names that occur as a *value label* of some other
    /// variable's domain (currently: an alt group's enumerated children).
    value_label_index: HashMap<String, RawRef>,
    pub mandatory_roots: Vec<VarIndex>,
    pub single_implications: Vec<Implication>,
    pub mandatory_implications: Vec<Implication>,
    pub or_groups_leaf: Vec<(RawRef, Vec<VarIndex>)>,
    pub or_groups_nonleaf: Vec<(RawRef, Vec<RawRef>)>,
    pub alt_groups: Vec<(RawRef, Vec<RawRef>)>,
    pub substitutions: HashMap<String, String>,
    pub and_leafs: HashMap<String, (VarIndex, Vec<usize>)>,
}

impl Schema {
    pub fn nb_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn domain_size(&self, var: VarIndex) -> usize {
        self.variables[var.id()].domain.len()
    }

    pub fn none_index(&self, var: VarIndex) -> usize {
        self.variables[var.id()].none_index()
    }

    pub fn name(&self, var: VarIndex) -> &str {
        &self.variables[var.id()].name
    }

    pub fn label(&self, var: VarIndex, value: usize) -> &str {
        &self.variables[var.id()].domain[value]
    }

    pub fn var_index(&self, name: &str) -> Option<VarIndex> {
        self.var_by_name.get(name).map(|&i| VarIndex(i))
    }

    /// Rule (c) of `ConstraintCompiler::visit`'s `var` resolution: `name` is
    /// one of some other variable's enumerated values.
    pub fn value_label(&self, name: &str) -> Option<RawRef> {
        self.value_label_index.get(name).copied()
    }

    pub fn substitution(&self, name: &str) -> Option<&str> {
        self.substitutions.get(name).map(|s| s.as_str())
    }

    pub fn and_leaf(&self, name: &str) -> Option<&(VarIndex, Vec<usize>)> {
        self.and_leafs.get(name)
    }
}

#[derive(Copy, Clone)]
struct ParentInfo<'a> {
    name: &'a str,
    is_alt: bool,
}

struct Builder<'a> {
    config: &'a Config,
    variables: Vec<Variable>,
    var_by_name: HashMap<String, usize>,
    value_label_index: HashMap<String, RawRef>,
    mandatory_roots: Vec<VarIndex>,
    single_implications: Vec<Implication>,
    mandatory_implications: Vec<Implication>,
    or_groups_leaf: Vec<(RawRef, Vec<VarIndex>)>,
    or_groups_nonleaf: Vec<(RawRef, Vec<RawRef>)>,
    alt_groups: Vec<(RawRef, Vec<RawRef>)>,
    substitutions: HashMap<String, String>,
    and_leafs: HashMap<String, (VarIndex, Vec<usize>)>,
}

impl<'a> Builder<'a> {
    fn alloc(&mut self, name: &str, domain: Vec<String>) -> VarIndex {
        let idx = VarIndex(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            domain,
        });
        self.var_by_name.insert(name.to_string(), idx.id());
        idx
    }

    fn boolean(&mut self, name: &str) -> VarIndex {
        self.alloc(name, vec!["false".to_string(), "true".to_string()])
    }

    fn none_index_of(&self, var: VarIndex) -> usize {
        self.variables[var.id()].none_index()
    }

    fn is_visible(&self, node: &FeatureNode) -> bool {
        !(self.config.ignore_hidden && node.hidden())
    }

    /// Resolves `name` to a value-reference usable on the *parent* side of a
    /// dependency/mandatory table entry: either the plain none-reference of a
    /// directly-named schema variable, or the negated-overload reference of a
    /// value `name` occupies inside some other (alt-collapsed) variable.
    fn resolve_parent_ref(&self, name: &str) -> Option<RawRef> {
        if let Some(&idx) = self.var_by_name.get(name) {
            let var = VarIndex(idx);
            return Some((var, self.none_index_of(var)));
        }
        self.value_label_index.get(name).copied()
    }

    /// Emits the dependency/mandatory table entries for a newly allocated
    /// variable `var`, given the tree node's own `mandatory` flag and its
    /// parent's name (`None` at the structural tree root).
    fn emit_dependency(&mut self, var: VarIndex, mandatory: bool, parent_name: Option<&str>) {
        let none_value = self.none_index_of(var);
        match parent_name {
            None => {
                if mandatory {
                    self.mandatory_roots.push(var);
                }
            }
            Some(pname) => match self.resolve_parent_ref(pname) {
                Some(parent_raw) => {
                    if mandatory {
                        self.mandatory_implications.push(((var, none_value), parent_raw));
                    }
                    self.single_implications.push(((var, none_value), parent_raw));
                }
                None => {
                    log::warn!(
                        "cannot resolve parent '{}' while synthesizing dependency for '{}'; dropped",
                        pname,
                        self.variables[var.id()].name
                    );
                }
            },
        }
    }

    fn visit(&mut self, node: &'a FeatureNode, parent: Option<ParentInfo<'a>>) -> Result<Option<VarIndex>> {
        if self.config.ignore_hidden && node.hidden() {
            return Ok(None);
        }
        match node {
            FeatureNode::Feature(data) => Ok(self.visit_feature(data, parent)),
            FeatureNode::And(data, children) => Ok(Some(self.visit_and(data, children, parent))),
            FeatureNode::Or(data, children) => Ok(Some(self.visit_or(data, children, parent))),
            FeatureNode::Alt(data, children) => Ok(Some(self.visit_alt(data, children, parent)?)),
        }
    }

    fn visit_feature(&mut self, data: &'a FeatureData, parent: Option<ParentInfo<'a>>) -> Option<VarIndex> {
        let parent_is_alt = parent.map(|p| p.is_alt).unwrap_or(false);
        if data.mandatory && !parent_is_alt {
            if let Some(p) = parent {
                self.substitutions.insert(data.name.clone(), p.name.to_string());
                return None;
            }
        }
        let var = self.boolean(&data.name);
        self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
        Some(var)
    }

    fn visit_and(&mut self, data: &'a FeatureData, children: &'a [FeatureNode], parent: Option<ParentInfo<'a>>) -> VarIndex {
        let visible: Vec<&FeatureNode> = children.iter().filter(|c| self.is_visible(c)).collect();
        let all_leaf = !visible.is_empty() && visible.iter().all(|c| c.is_leaf());

        if all_leaf && self.config.compress_and && visible.len() <= self.config.compress_and_threshold {
            let n = visible.len() as u32;
            let mandatory_bits: Vec<u32> = visible
                .iter()
                .enumerate()
                .filter(|(_, c)| c.mandatory())
                .map(|(i, _)| i as u32)
                .collect();

            let mut domain = vec!["NONE".to_string()];
            let mut masks = Vec::new();
            for mask in 0u32..(1u32 << n) {
                if mandatory_bits.is_empty() || mask > 0 {
                    let discard = mandatory_bits.iter().any(|&b| mask & (1 << b) == 0);
                    if !discard {
                        domain.push(mask.to_string());
                        masks.push(mask);
                    }
                }
            }

            let var = self.alloc(&data.name, domain);
            self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
            for (i, child) in visible.iter().enumerate() {
                let positions: Vec<usize> = masks
                    .iter()
                    .enumerate()
                    .filter(|(_, &mask)| mask & (1 << i) != 0)
                    .map(|(pos, _)| pos + 1) // +1: domain index 0 is "NONE"
                    .collect();
                self.and_leafs.insert(child.name().to_string(), (var, positions));
            }
            var
        } else {
            let var = self.boolean(&data.name);
            self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
            let info = ParentInfo { name: &data.name, is_alt: false };
            for child in &visible {
                let _ = self.visit(child, Some(info));
            }
            var
        }
    }

    fn visit_or(&mut self, data: &'a FeatureData, children: &'a [FeatureNode], parent: Option<ParentInfo<'a>>) -> VarIndex {
        let var = self.boolean(&data.name);
        self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
        let visible: Vec<&FeatureNode> = children.iter().filter(|c| self.is_visible(c)).collect();
        let all_leaf = !visible.is_empty() && visible.iter().all(|c| c.is_leaf());
        let info = ParentInfo { name: &data.name, is_alt: false };
        let none_val = self.none_index_of(var);

        if all_leaf {
            let mut idxs = Vec::new();
            for child in &visible {
                if let Ok(Some(cidx)) = self.visit(child, Some(info)) {
                    idxs.push(cidx);
                }
            }
            self.or_groups_leaf.push(((var, none_val), idxs));
        } else {
            let mut pairs = Vec::new();
            for child in &visible {
                if let Ok(Some(cidx)) = self.visit(child, Some(info)) {
                    pairs.push((cidx, self.none_index_of(cidx)));
                }
            }
            self.or_groups_nonleaf.push(((var, none_val), pairs));
        }
        var
    }

    fn visit_alt(&mut self, data: &'a FeatureData, children: &'a [FeatureNode], parent: Option<ParentInfo<'a>>) -> Result<VarIndex> {
        let visible: Vec<&FeatureNode> = children.iter().filter(|c| self.is_visible(c)).collect();
        let info = ParentInfo { name: &data.name, is_alt: true };

        if visible.len() > 1 {
            let mut domain: Vec<String> = visible.iter().map(|c| c.name().to_string()).collect();
            domain.push("NONE".to_string());
            let var = self.alloc(&data.name, domain);
            self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
            let domain_len = self.variables[var.id()].domain.len();

            for (pos, child) in visible.iter().enumerate() {
                self.value_label_index.insert(child.name().to_string(), (var, pos));
            }
            for (pos, child) in visible.iter().enumerate() {
                if !child.is_leaf() {
                    if let Some(child_var) = self.visit(child, Some(info))? {
                        let child_none = self.none_index_of(child_var);
                        self.mandatory_implications
                            .push(((child_var, child_none), (var, pos + domain_len)));
                    }
                }
            }
            Ok(var)
        } else {
            let var = self.boolean(&data.name);
            self.emit_dependency(var, data.mandatory, parent.map(|p| p.name));
            let mut entries = Vec::new();
            if let Some(&only_child) = visible.first() {
                if let Some(cvar) = self.visit(only_child, Some(info))? {
                    entries.push((cvar, self.none_index_of(cvar)));
                }
            }
            let none_val = self.none_index_of(var);
            self.alt_groups.push(((var, none_val), entries));
            Ok(var)
        }
    }
}

/// Builds the variable schema and auxiliary tables for `root`. Fails only if
/// the XML front-end's own validation (node kind, required `name`) was
/// bypassed; in practice every [`FeatureNode`] reaching this function already
/// satisfies the grammar, since `model::xml` enforces it while parsing.
pub fn build(root: &FeatureNode, config: &Config) -> Result<Schema> {
    let mut builder = Builder {
        config,
        variables: Vec::new(),
        var_by_name: HashMap::new(),
        value_label_index: HashMap::new(),
        mandatory_roots: Vec::new(),
        single_implications: Vec::new(),
        mandatory_implications: Vec::new(),
        or_groups_leaf: Vec::new(),
        or_groups_nonleaf: Vec::new(),
        alt_groups: Vec::new(),
        substitutions: HashMap::new(),
        and_leafs: HashMap::new(),
    };
    builder.visit(root, None)?;
    Ok(Schema {
        variables: builder.variables,
        var_by_name: builder.var_by_name,
        value_label_index: builder.value_label_index,
        mandatory_roots: builder.mandatory_roots,
        single_implications: builder.single_implications,
        mandatory_implications: builder.mandatory_implications,
        or_groups_leaf: builder.or_groups_leaf,
        or_groups_nonleaf: builder.or_groups_nonleaf,
        alt_groups: builder.alt_groups,
        substitutions: builder.substitutions,
        and_leafs: builder.and_leafs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureData;

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
    fn a_mandatory_leaf_under_and_is_substituted_not_allocated() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![feature("A", true), feature("B", false)],
        );
        let schema = build(&tree, &Config::default()).unwrap();
        // Root + B: A was substituted away.
        assert_eq!(schema.nb_vars(), 2);
        assert_eq!(schema.substitutions.get("A").map(String::as_str), Some("Root"));
        assert_eq!(schema.mandatory_roots, vec![schema.var_index("Root").unwrap()]);
    }

    #[test]
    fn an_optional_leaf_gets_its_own_boolean_variable_and_depends_on_its_parent() {
        let tree = FeatureNode::And(data("Root", true), vec![feature("B", false)]);
        let schema = build(&tree, &Config::default()).unwrap();
        let root = schema.var_index("Root").unwrap();
        let b = schema.var_index("B").unwrap();
        assert_eq!(schema.domain_size(b), 2);
        assert_eq!(
            schema.single_implications,
            vec![((b, schema.none_index(b)), (root, schema.none_index(root)))]
        );
    }

    #[test]
    fn a_single_child_alt_is_recorded_as_an_alt_group_not_collapsed_enumerative() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![FeatureNode::Alt(data("Choice", false), vec![feature("Only", false)])],
        );
        let schema = build(&tree, &Config::default()).unwrap();
        let choice = schema.var_index("Choice").unwrap();
        assert_eq!(schema.domain_size(choice), 2, "single-child alt falls back to boolean");
        assert_eq!(schema.alt_groups.len(), 1);
        assert_eq!(schema.alt_groups[0].0 .0, choice);
    }

    #[test]
    fn a_multi_child_alt_collapses_into_one_enumerative_variable() {
        let tree = FeatureNode::And(
            data("Root", true),
            vec![FeatureNode::Alt(
                data("Choice", false),
                vec![feature("A", false), feature("B", false), feature("C", false)],
            )],
        );
        let schema = build(&tree, &Config::default()).unwrap();
        let choice = schema.var_index("Choice").unwrap();
        // A, B, C, NONE.
        assert_eq!(schema.domain_size(choice), 4);
        assert_eq!(schema.value_label("A"), Some((choice, 0)));
        assert_eq!(schema.value_label("B"), Some((choice, 1)));
        assert_eq!(schema.value_label("C"), Some((choice, 2)));
        // no separate variables were allocated for the leaf alternatives.
        assert!(schema.var_index("A").is_none());
    }

    #[test]
    fn and_compression_emits_a_bitmask_variable_respecting_mandatory_bits() {
        let mut cfg = Config::default();
        cfg.compress_and = true;
        cfg.compress_and_threshold = 5;
        let tree = FeatureNode::And(
            data("Root", true),
            vec![FeatureNode::And(
                data("Bundle", false),
                vec![feature("X", true), feature("Y", false)],
            )],
        );
        let schema = build(&tree, &cfg).unwrap();
        let bundle = schema.var_index("Bundle").unwrap();
        // X is mandatory (bit 0): masks 1, 3 keep bit0 set, plus NONE => 3 labels.
        assert_eq!(schema.domain_size(bundle), 3);
        let (parent, positions) = schema.and_leaf("X").unwrap();
        assert_eq!(*parent, bundle);
        assert!(!positions.is_empty());
    }

    #[test]
    fn an_or_group_of_leaves_is_recorded_in_leaf_form() {
        let tree = FeatureNode::Or(
            data("Root", true),
            vec![feature("A", false), feature("B", false)],
        );
        let schema = build(&tree, &Config::default()).unwrap();
        assert_eq!(schema.or_groups_leaf.len(), 1);
        assert_eq!(schema.or_groups_leaf[0].1.len(), 2);
        assert!(schema.or_groups_nonleaf.is_empty());
    }

    #[test]
    fn hidden_features_are_skipped_entirely_when_ignore_hidden_is_set() {
        let mut cfg = Config::default();
        cfg.ignore_hidden = true;
        let tree = FeatureNode::And(
            data("Root", true),
            vec![FeatureNode::Feature(FeatureData {
                name: "Secret".to_string(),
                mandatory: false,
                hidden: true,
            })],
        );
        let schema = build(&tree, &cfg).unwrap();
        assert_eq!(schema.nb_vars(), 1);
        assert!(schema.var_index("Secret").is_none());
    }
}
