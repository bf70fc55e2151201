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

//! A reduced, ordered, multi-valued decision diagram.
//!
//! Variables are arranged into `levels`: level `0` sits just above the
//! terminals, level `nb_vars() - 1` is the top. A node's children are indexed
//! by value label; a node whose children are all identical is never created
//! (the reduction rule), and two nodes over the same level with the same
//! children vector are the same node (the unique table). Levels may be
//! skipped on any particular root-to-terminal path; `cardinality` accounts for
//! the free choices this implies with a table of prefix products of domain
//! sizes.

use std::collections::HashMap;

use metrohash::MetroHashMap;

use crate::abstraction::dd::Forest;
use crate::common::{BigUint, Cardinality, VarIndex};

/// A handle into a [`ReducedForest`]. `True`/`False` are the two terminals;
/// `Node` indexes the forest's node arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReducedEdge {
    False,
    True,
    Node(u32),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum Op {
    Union,
    Intersect,
    Diff,
    Equiv,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct NodeData {
    level: u32,
    children: Vec<ReducedEdge>,
}

/// The sole concrete [`Forest`] implementation this crate ships.
pub struct ReducedForest {
    /// `domains[v]` is the domain size of variable `v`, indexed by `VarIndex`.
    domains: Vec<usize>,
    /// `order[level]` is the variable sitting at that level.
    order: Vec<usize>,
    /// `level_of[v]` is the level variable `v` sits at; inverse of `order`.
    level_of: Vec<usize>,
    arena: Vec<NodeData>,
    unique: MetroHashMap<NodeData, u32>,
    memo: MetroHashMap<(Op, ReducedEdge, ReducedEdge), ReducedEdge>,
    prefix_product: Vec<BigUint>,
}

impl ReducedForest {
    /// Builds an empty forest over variables `0..domains.len()`, initially
    /// ordered `0, 1, .., domains.len() - 1` from bottom to top.
    pub fn new(domains: Vec<usize>) -> Self {
        let n = domains.len();
        let order: Vec<usize> = (0..n).collect();
        let level_of = order.clone();
        let mut forest = ReducedForest {
            domains,
            order,
            level_of,
            arena: Vec::new(),
            unique: MetroHashMap::default(),
            memo: MetroHashMap::default(),
            prefix_product: Vec::new(),
        };
        forest.recompute_prefix_products();
        forest
    }

    fn recompute_prefix_products(&mut self) {
        let n = self.order.len();
        let mut v = Vec::with_capacity(n + 1);
        v.push(BigUint::from(1u32));
        for level in 0..n {
            let size = self.domains[self.order[level]];
            let next = &v[level] * BigUint::from(size as u64);
            v.push(next);
        }
        self.prefix_product = v;
    }

    /// Product of domain sizes over levels `[lo, hi)`.
    fn range_product(&self, lo: usize, hi: usize) -> BigUint {
        &self.prefix_product[hi] / &self.prefix_product[lo]
    }

    fn level_of_edge(&self, e: ReducedEdge) -> isize {
        match e {
            ReducedEdge::Node(id) => self.arena[id as usize].level as isize,
            ReducedEdge::True | ReducedEdge::False => -1,
        }
    }

    fn child_at(&self, e: ReducedEdge, value: usize) -> ReducedEdge {
        match e {
            ReducedEdge::Node(id) => self.arena[id as usize].children[value],
            _ => e,
        }
    }

    fn make_node(&mut self, level: u32, children: Vec<ReducedEdge>) -> ReducedEdge {
        if children.iter().all(|c| *c == children[0]) {
            return children[0];
        }
        let key = NodeData { level, children };
        if let Some(&id) = self.unique.get(&key) {
            return ReducedEdge::Node(id);
        }
        let id = self.arena.len() as u32;
        self.arena.push(key.clone());
        self.unique.insert(key, id);
        ReducedEdge::Node(id)
    }

    fn terminal_shortcut(&self, op: Op, a: ReducedEdge, b: ReducedEdge) -> Option<ReducedEdge> {
        use ReducedEdge::*;
        match op {
            Op::Union => match (a, b) {
                (True, _) | (_, True) => Some(True),
                (False, _) => Some(b),
                (_, False) => Some(a),
                _ if a == b => Some(a),
                _ => None,
            },
            Op::Intersect => match (a, b) {
                (False, _) | (_, False) => Some(False),
                (True, _) => Some(b),
                (_, True) => Some(a),
                _ if a == b => Some(a),
                _ => None,
            },
            Op::Diff => match (a, b) {
                (False, _) => Some(False),
                (_, True) => Some(False),
                (_, False) => Some(a),
                _ if a == b => Some(False),
                _ => None,
            },
            Op::Equiv => {
                if a == b {
                    Some(True)
                } else {
                    None
                }
            }
        }
    }

    fn terminal_bool(op: Op, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        let av = matches!(a, ReducedEdge::True);
        let bv = matches!(b, ReducedEdge::True);
        let r = match op {
            Op::Union => av || bv,
            Op::Intersect => av && bv,
            Op::Diff => av && !bv,
            Op::Equiv => av == bv,
        };
        if r {
            ReducedEdge::True
        } else {
            ReducedEdge::False
        }
    }

    fn apply(&mut self, op: Op, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        if let Some(r) = self.terminal_shortcut(op, a, b) {
            return r;
        }
        let key = (op, a, b);
        if let Some(&r) = self.memo.get(&key) {
            return r;
        }
        let la = self.level_of_edge(a);
        let lb = self.level_of_edge(b);
        let lvl = la.max(lb);
        let result = if lvl < 0 {
            Self::terminal_bool(op, a, b)
        } else {
            let lvl = lvl as usize;
            let var = self.order[lvl];
            let dsize = self.domains[var];
            let mut children = Vec::with_capacity(dsize);
            for v in 0..dsize {
                let av = if la == lvl as isize { self.child_at(a, v) } else { a };
                let bv = if lb == lvl as isize { self.child_at(b, v) } else { b };
                children.push(self.apply(op, av, bv));
            }
            self.make_node(lvl as u32, children)
        };
        self.memo.insert(key, result);
        result
    }

    fn intrinsic_cardinality(&self, id: u32, memo: &mut HashMap<u32, BigUint>) -> BigUint {
        if let Some(v) = memo.get(&id) {
            return v.clone();
        }
        let node = self.arena[id as usize].clone();
        let mut total = BigUint::from(0u32);
        for child in &node.children {
            let contribution = match *child {
                ReducedEdge::False => BigUint::from(0u32),
                ReducedEdge::True => self.range_product(0, node.level as usize),
                ReducedEdge::Node(cid) => {
                    let child_level = self.arena[cid as usize].level as usize;
                    let gap = self.range_product(child_level + 1, node.level as usize);
                    gap * self.intrinsic_cardinality(cid, memo)
                }
            };
            total += contribution;
        }
        memo.insert(id, total.clone());
        total
    }

    /// Restricts `edge` (a function over the forest's *current* ordering) to
    /// `var`'s level `== var_level` fixed at `value`, returning an edge over
    /// the remaining variables. Used internally by [`Forest::reorder`].
    fn restrict(&mut self, edge: ReducedEdge, var_level: usize, value: usize) -> ReducedEdge {
        match edge {
            ReducedEdge::True | ReducedEdge::False => edge,
            ReducedEdge::Node(id) => {
                let node = self.arena[id as usize].clone();
                let level = node.level as usize;
                if level == var_level {
                    node.children[value]
                } else if level < var_level {
                    edge
                } else {
                    let children: Vec<ReducedEdge> = node
                        .children
                        .iter()
                        .map(|&c| self.restrict(c, var_level, value))
                        .collect();
                    self.make_node(node.level, children)
                }
            }
        }
    }

    /// Rebuilds `edge` (over the current order) top-down over `new_order`
    /// (given as old level-of-variable, from the new top level downward),
    /// with the variable handled by this call sitting at new level `level`.
    fn rebuild(&mut self, edge: ReducedEdge, new_order_old_levels: &[usize], level: usize) -> ReducedEdge {
        if new_order_old_levels.is_empty() {
            return edge;
        }
        let (&old_level_here, rest) = new_order_old_levels.split_first().unwrap();
        let var = self.order[old_level_here];
        let dsize = self.domains[var];
        let mut children = Vec::with_capacity(dsize);
        for value in 0..dsize {
            let restricted = self.restrict(edge, old_level_here, value);
            children.push(self.rebuild(restricted, rest, level.wrapping_sub(1)));
        }
        self.make_node(level as u32, children)
    }
}

impl Forest<ReducedEdge> for ReducedForest {
    fn top(&self) -> ReducedEdge {
        ReducedEdge::True
    }

    fn bottom(&self) -> ReducedEdge {
        ReducedEdge::False
    }

    fn nb_vars(&self) -> usize {
        self.domains.len()
    }

    fn domain_size(&self, var: VarIndex) -> usize {
        self.domains[var.id()]
    }

    fn pin(&mut self, var: VarIndex, value: usize) -> ReducedEdge {
        let level = self.level_of[var.id()] as u32;
        let dsize = self.domains[var.id()];
        let mut children = vec![ReducedEdge::False; dsize];
        children[value] = ReducedEdge::True;
        self.make_node(level, children)
    }

    fn union(&mut self, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        self.apply(Op::Union, a, b)
    }

    fn intersect(&mut self, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        self.apply(Op::Intersect, a, b)
    }

    fn diff(&mut self, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        self.apply(Op::Diff, a, b)
    }

    fn equiv(&mut self, a: ReducedEdge, b: ReducedEdge) -> ReducedEdge {
        self.apply(Op::Equiv, a, b)
    }

    fn cardinality(&self, edge: ReducedEdge) -> Cardinality {
        let n = self.order.len();
        match edge {
            ReducedEdge::False => BigUint::from(0u32),
            ReducedEdge::True => self.prefix_product[n].clone(),
            ReducedEdge::Node(id) => {
                let level = self.arena[id as usize].level as usize;
                let gap = self.range_product(level + 1, n);
                let mut memo = HashMap::new();
                gap * self.intrinsic_cardinality(id, &mut memo)
            }
        }
    }

    fn node_count(&self, edge: ReducedEdge) -> usize {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![edge];
        while let Some(e) = stack.pop() {
            if let ReducedEdge::Node(id) = e {
                if seen.insert(id) {
                    for &c in &self.arena[id as usize].children {
                        stack.push(c);
                    }
                }
            }
        }
        seen.len()
    }

    fn edge_count(&self, edge: ReducedEdge) -> usize {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![edge];
        let mut edges = 0;
        while let Some(e) = stack.pop() {
            if let ReducedEdge::Node(id) = e {
                if seen.insert(id) {
                    let node = &self.arena[id as usize];
                    edges += node.children.len();
                    for &c in &node.children {
                        stack.push(c);
                    }
                }
            }
        }
        edges
    }

    fn reorder(&mut self, live: &mut [ReducedEdge]) {
        let n = self.order.len();
        if n < 2 {
            return;
        }
        // Greedy single pass: try swapping every adjacent level pair, keep
        // the swap only if it shrinks the total node count over `live`.
        for lvl in 0..n - 1 {
            let old_order = self.order.clone();
            let old_level_of = self.level_of.clone();

            let mut new_order = self.order.clone();
            new_order.swap(lvl, lvl + 1);
            let new_order_old_levels: Vec<usize> = new_order.iter().rev().map(|&v| old_level_of[v]).collect();

            self.flush_cache();
            let rebuilt: Vec<ReducedEdge> = live
                .iter()
                .map(|&e| self.rebuild(e, &new_order_old_levels, n - 1))
                .collect();

            let before: usize = live.iter().map(|&e| self.node_count(e)).sum();

            self.order = new_order;
            for (level, &var) in self.order.iter().enumerate() {
                self.level_of[var] = level;
            }
            self.recompute_prefix_products();

            let after: usize = rebuilt.iter().map(|&e| self.node_count(e)).sum();

            if after <= before {
                live.copy_from_slice(&rebuilt);
            } else {
                self.order = old_order;
                self.level_of = old_level_of;
                self.recompute_prefix_products();
            }
        }
        self.flush_cache();
    }

    fn flush_cache(&mut self) {
        self.memo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest() -> ReducedForest {
        ReducedForest::new(vec![2, 3, 2])
    }

    #[test]
    fn empty_forest_cardinality_matches_the_cross_product_of_all_domains() {
        let f = forest();
        assert_eq!(f.cardinality(f.top()), BigUint::from(2u32 * 3 * 2));
        assert_eq!(f.cardinality(f.bottom()), BigUint::from(0u32));
    }

    #[test]
    fn pin_restricts_exactly_one_variable() {
        let mut f = forest();
        let v0_is_1 = f.pin(VarIndex(0), 1);
        // variable 0 has domain size 2; fixing it to one value halves the count.
        assert_eq!(f.cardinality(v0_is_1), BigUint::from(3u32 * 2));
    }

    #[test]
    fn intersect_of_two_pins_multiplies_down_to_a_single_point() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let b = f.pin(VarIndex(1), 2);
        let both = f.intersect(a, b);
        assert_eq!(f.cardinality(both), BigUint::from(2u32));
    }

    #[test]
    fn union_of_complementary_pins_is_not_the_full_domain_in_general() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let b = f.pin(VarIndex(0), 1);
        let u = f.union(a, b);
        // together they cover every value of variable 0 while leaving the rest free.
        assert_eq!(f.cardinality(u), BigUint::from(2u32 * 3 * 2));
    }

    #[test]
    fn diff_removes_exactly_the_subtracted_set() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let b = f.pin(VarIndex(1), 0);
        let d = f.diff(a, b);
        assert_eq!(f.cardinality(d), BigUint::from(2u32 * 2));
    }

    #[test]
    fn equiv_of_an_edge_with_itself_is_the_top() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let e = f.equiv(a, a);
        assert_eq!(e, f.top());
    }

    #[test]
    fn complement_cardinality_is_the_total_minus_the_original() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let not_a = f.complement(a);
        let total = f.cardinality(f.top());
        assert_eq!(f.cardinality(a) + f.cardinality(not_a), total);
    }

    #[test]
    fn reorder_preserves_cardinality_of_live_edges() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let b = f.pin(VarIndex(2), 1);
        let ab = f.intersect(a, b);
        let before = f.cardinality(ab);
        let mut live = [ab];
        f.reorder(&mut live);
        assert_eq!(f.cardinality(live[0]), before);
    }

    #[test]
    fn node_count_never_counts_a_node_twice() {
        let mut f = forest();
        let a = f.pin(VarIndex(0), 0);
        let b = f.pin(VarIndex(0), 0);
        assert_eq!(a, b);
        assert_eq!(f.node_count(a), 1);
    }
}
