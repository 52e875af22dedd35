//! Property-based tests for the structural invariants of both trees.
//!
//! Random insert/remove sequences are applied to a tree and to a `HashMap`
//! oracle; after every operation the whole tree is walked and checked.

use proptest::prelude::*;
use std::collections::HashMap;
use weighted_autocomplete::{
    Autocompleter, CompressedPrefixTree, Label, SimplePrefixTree, WeightMode,
};

/// Relative tolerance for weight comparisons. Sums are accumulated in
/// different orders by the trees and by the checks.
const TOL: f64 = 1e-9;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOL * a.abs().max(b.abs())
}

// ============================================================================
//  Strategies
// ============================================================================

/// Short keys over a tiny alphabet so prefixes collide often.
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..3, 0..=5)
}

/// Mostly weights spread over eighteen orders of magnitude, so light leaves
/// sit next to heavy ones and sums round; some small halves for exact ties.
fn weight_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        3 => (-9.0f64..9.0).prop_map(|exp| 10f64.powf(exp)),
        1 => (1u8..=10).prop_map(|w| f64::from(w) / 2.0),
    ]
}

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, f64),
    Remove(Vec<u8>),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        4 => (key_strategy(), weight_strategy()).prop_map(|(k, w)| Op::Insert(k, w)),
        1 => key_strategy().prop_map(Op::Remove),
    ];
    prop::collection::vec(op, 0..=120)
}

fn mode_strategy() -> impl Strategy<Value = WeightMode> {
    prop_oneof![Just(WeightMode::Sum), Just(WeightMode::Average)]
}

// ============================================================================
//  Shape checks
// ============================================================================

/// The view of a node that the invariant checks need, shared by both trees.
trait Shape: Sized {
    fn label(&self) -> &Label<u8, Vec<u8>>;
    fn weight(&self) -> f64;
    fn subtrees(&self) -> &[Self];
}

macro_rules! impl_shape {
    ($tree:ident) => {
        impl Shape for $tree<u8, Vec<u8>> {
            fn label(&self) -> &Label<u8, Vec<u8>> {
                $tree::label(self)
            }
            fn weight(&self) -> f64 {
                $tree::weight(self)
            }
            fn subtrees(&self) -> &[Self] {
                $tree::subtrees(self)
            }
        }
    };
}

impl_shape!(SimplePrefixTree);
impl_shape!(CompressedPrefixTree);

/// Walks `node` and returns `(leaf count, leaf weight sum)` of its subtree.
fn check_node<N: Shape>(
    node: &N,
    mode: WeightMode,
    compressed: bool,
    is_root: bool,
) -> (usize, f64) {
    assert!(node.weight() >= 0.0, "negative weight");
    let children = node.subtrees();

    if node.weight() == 0.0 {
        assert!(is_root, "empty node below the root");
        assert_eq!(node.label(), &Label::Prefix(Vec::new()));
        assert!(children.is_empty());
        return (0, 0.0);
    }

    let prefix = match node.label() {
        Label::Value(_) => {
            assert!(children.is_empty(), "leaf with children");
            return (1, node.weight());
        }
        Label::Prefix(prefix) => prefix,
    };
    assert!(!children.is_empty(), "internal node without children");

    for pair in children.windows(2) {
        assert!(pair[0].weight() >= pair[1].weight(), "children out of order");
    }

    let mut internal = 0;
    let mut first_tokens = Vec::new();
    let (mut count, mut sum) = (0, 0.0);
    for child in children {
        assert!(child.weight() > 0.0, "empty child");
        if let Label::Prefix(label) = child.label() {
            internal += 1;
            assert!(label.starts_with(prefix), "child label does not extend parent");
            if compressed {
                assert!(label.len() > prefix.len());
                first_tokens.push(label[prefix.len()]);
            } else {
                assert_eq!(label.len(), prefix.len() + 1, "prefix grew by more than one");
            }
        }
        let (c, s) = check_node(child, mode, compressed, false);
        count += c;
        sum += s;
    }

    if compressed {
        let before = first_tokens.len();
        first_tokens.sort_unstable();
        first_tokens.dedup();
        assert_eq!(before, first_tokens.len(), "two children share a first token");
        if !is_root {
            assert!(!(children.len() == 1 && internal == 1), "compressible node");
        }
    }

    let expected = mode.aggregate(sum, count);
    assert!(
        close(node.weight(), expected),
        "aggregate weight {} != {}",
        node.weight(),
        expected
    );
    (count, sum)
}

fn check_tree<N: Shape>(
    root: &N,
    len: usize,
    all: Vec<(Vec<u8>, f64)>,
    mode: WeightMode,
    compressed: bool,
    oracle: &HashMap<Vec<u8>, f64>,
) {
    let (count, sum) = check_node(root, mode, compressed, true);
    assert_eq!(count, len, "len disagrees with reachable leaves");
    assert_eq!(count, oracle.len());
    let expected: f64 = oracle.values().sum();
    assert!(close(sum, expected), "leaf sum {sum} != {expected}");

    assert_eq!(all.len(), len);
    assert!(all.windows(2).all(|w| w[0].1 >= w[1].1));
    for (value, weight) in all {
        let stored = oracle.get(&value).copied().unwrap_or(f64::NAN);
        assert!(close(weight, stored), "{value:?}: {weight} vs {stored}");
    }
}

fn inserts_only(ops: &[Op]) -> impl Iterator<Item = &Op> {
    ops.iter().filter(|op| matches!(op, Op::Insert(..)))
}

/// Feeds the inserts of `left` to `a`, those of `right` to `b`, and both to
/// `union`. Returns the oracle for `union`.
fn build_union(
    left: &[Op],
    right: &[Op],
    a: &mut dyn Autocompleter<u8, Vec<u8>>,
    b: &mut dyn Autocompleter<u8, Vec<u8>>,
    union: &mut dyn Autocompleter<u8, Vec<u8>>,
) -> HashMap<Vec<u8>, f64> {
    let mut oracle = HashMap::new();
    for op in inserts_only(left) {
        apply(op, a, &mut HashMap::new());
        apply(op, union, &mut oracle);
    }
    for op in inserts_only(right) {
        apply(op, b, &mut HashMap::new());
        apply(op, union, &mut oracle);
    }
    oracle
}

fn assert_same_contents(
    got: &dyn Autocompleter<u8, Vec<u8>>,
    want: &dyn Autocompleter<u8, Vec<u8>>,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(got.len(), want.len());
    let mut got = got.autocomplete(&[], None);
    let mut want = want.autocomplete(&[], None);
    got.sort_by(|x, y| x.0.cmp(&y.0));
    want.sort_by(|x, y| x.0.cmp(&y.0));
    prop_assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(&want) {
        prop_assert_eq!(&g.0, &w.0);
        prop_assert!(close(g.1, w.1), "{:?}: {} vs {}", g.0, g.1, w.1);
    }
    Ok(())
}

fn apply(
    op: &Op,
    tree: &mut dyn Autocompleter<u8, Vec<u8>>,
    oracle: &mut HashMap<Vec<u8>, f64>,
) {
    match op {
        Op::Insert(key, weight) => {
            tree.insert(key.clone(), *weight, key).unwrap();
            *oracle.entry(key.clone()).or_default() += weight;
        }
        Op::Remove(prefix) => {
            tree.remove(prefix);
            oracle.retain(|key, _| !key.starts_with(prefix));
        }
    }
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn simple_tree_keeps_invariants(mode in mode_strategy(), ops in ops_strategy()) {
        let mut tree = SimplePrefixTree::new(mode);
        let mut oracle = HashMap::new();
        for op in &ops {
            apply(op, &mut tree, &mut oracle);
            check_tree(&tree, tree.len(), tree.autocomplete(&[], None), mode, false, &oracle);
        }
    }

    #[test]
    fn compressed_tree_keeps_invariants(mode in mode_strategy(), ops in ops_strategy()) {
        let mut tree = CompressedPrefixTree::new(mode);
        let mut oracle = HashMap::new();
        for op in &ops {
            apply(op, &mut tree, &mut oracle);
            check_tree(&tree, tree.len(), tree.autocomplete(&[], None), mode, true, &oracle);
        }
    }

    #[test]
    fn compression_never_adds_nodes(ops in ops_strategy()) {
        let mut simple = SimplePrefixTree::new(WeightMode::Sum);
        let mut compressed = CompressedPrefixTree::new(WeightMode::Sum);
        let mut oracle = HashMap::new();
        for op in &ops {
            apply(op, &mut simple, &mut oracle);
            apply(op, &mut compressed, &mut HashMap::new());
        }
        prop_assert_eq!(simple.len(), compressed.len());
        prop_assert!(compressed.node_count() <= simple.node_count());
    }

    #[test]
    fn limit_caps_and_keeps_heaviest_first(ops in ops_strategy(), prefix in key_strategy(), limit in 1usize..6) {
        let mut tree = SimplePrefixTree::new(WeightMode::Sum);
        let mut oracle = HashMap::new();
        for op in &ops {
            apply(op, &mut tree, &mut oracle);
        }
        let all = tree.autocomplete(&prefix, None);
        let limited = tree.autocomplete(&prefix, Some(limit));
        prop_assert_eq!(limited.len(), all.len().min(limit));
        prop_assert!(limited.windows(2).all(|w| w[0].1 >= w[1].1));
        for (value, _) in &limited {
            prop_assert!(value.starts_with(&prefix));
        }
    }

    #[test]
    fn simple_merge_equals_inserting_union(
        mode in mode_strategy(),
        left in ops_strategy(),
        right in ops_strategy(),
    ) {
        let mut a = SimplePrefixTree::new(mode);
        let mut b = SimplePrefixTree::new(mode);
        let mut union = SimplePrefixTree::new(mode);
        let oracle = build_union(&left, &right, &mut a, &mut b, &mut union);
        a.merge_from(&b);
        check_tree(&a, a.len(), a.autocomplete(&[], None), mode, false, &oracle);
        assert_same_contents(&a, &union)?;
    }

    #[test]
    fn compressed_merge_equals_inserting_union(
        mode in mode_strategy(),
        left in ops_strategy(),
        right in ops_strategy(),
    ) {
        let mut a = CompressedPrefixTree::new(mode);
        let mut b = CompressedPrefixTree::new(mode);
        let mut union = CompressedPrefixTree::new(mode);
        let oracle = build_union(&left, &right, &mut a, &mut b, &mut union);
        a.merge_from(&b);
        check_tree(&a, a.len(), a.autocomplete(&[], None), mode, true, &oracle);
        assert_same_contents(&a, &union)?;
    }
}
