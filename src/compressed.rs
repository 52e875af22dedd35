//! Weighted prefix tree with compressed labels.
//!
//! Chains of single-child internal nodes are collapsed: a node's label may
//! extend its parent's by any number of tokens. Inserting a prefix that
//! diverges part-way through a label splits that node, and removing a branch
//! merges a node left with a single internal child back into that child. The
//! root is never merged, so its label stays empty.

use tracing::{debug, trace};

use crate::error::{Result, check_weight};
use crate::util::{Weighted, common_prefix_len, insertion_index, rank, resettle, under_limit};
use crate::{Autocompleter, Label, WeightMode};

/// Path-compressed weighted prefix tree.
///
/// Same interface and weight semantics as
/// [`SimplePrefixTree`](crate::SimplePrefixTree), with fewer nodes for sparse
/// prefixes. No internal node other than the root has exactly one child that
/// is itself internal.
#[derive(Clone, Debug)]
pub struct CompressedPrefixTree<T, V> {
    label: Label<T, V>,
    weight: f64,
    weight_sum: f64,
    subtrees: Vec<CompressedPrefixTree<T, V>>,
    count: usize,
    mode: WeightMode,
}

impl<T, V> Default for CompressedPrefixTree<T, V> {
    fn default() -> Self {
        Self::new(WeightMode::default())
    }
}

impl<T, V> Weighted for CompressedPrefixTree<T, V> {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl<T, V> CompressedPrefixTree<T, V> {
    /// Creates an empty tree whose internal weights follow `mode`.
    pub fn new(mode: WeightMode) -> Self {
        Self {
            label: Label::Prefix(Vec::new()),
            weight: 0.0,
            weight_sum: 0.0,
            subtrees: Vec::new(),
            count: 0,
            mode,
        }
    }

    /// Creates an empty tree from a mode name (`"sum"` or `"average"`).
    pub fn with_weight_type(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    fn leaf(value: V, weight: f64, mode: WeightMode) -> Self {
        Self {
            label: Label::Value(value),
            weight,
            weight_sum: weight,
            subtrees: Vec::new(),
            count: 1,
            mode,
        }
    }

    pub fn label(&self) -> &Label<T, V> {
        &self.label
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn weight_mode(&self) -> WeightMode {
        self.mode
    }

    /// Children, heaviest first.
    pub fn subtrees(&self) -> &[Self] {
        &self.subtrees
    }

    pub fn is_leaf(&self) -> bool {
        self.weight > 0.0 && self.subtrees.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::new(self.mode);
    }

    /// Number of non-empty nodes, this one included.
    pub fn node_count(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        1 + self
            .subtrees
            .iter()
            .map(|subtree| subtree.node_count())
            .sum::<usize>()
    }

    fn depth(&self) -> usize {
        self.label.prefix().map_or(0, <[T]>::len)
    }

    fn absorb(&mut self, weight: f64, added: bool) {
        if added {
            self.count += 1;
        }
        self.weight_sum += weight;
        self.weight = self.mode.aggregate(self.weight_sum, self.count);
    }

    /// Drops `removed` leaves and re-derives the weight from the remaining
    /// children.
    fn shrink(&mut self, removed: usize) {
        self.count = self.count.saturating_sub(removed);
        if self.count == 0 {
            self.weight = 0.0;
            self.weight_sum = 0.0;
            self.subtrees.clear();
            return;
        }
        self.weight_sum = self.subtrees.iter().map(|s| s.weight_sum).sum();
        self.weight = self.mode.aggregate(self.weight_sum, self.count);
    }

    fn attach(&mut self, node: Self) {
        let idx = insertion_index(&self.subtrees, node.weight);
        self.subtrees.insert(idx, node);
    }

    fn is_compressible(&self) -> bool {
        matches!(self.subtrees.as_slice(), [only] if matches!(only.label, Label::Prefix(_)))
    }

    /// Replaces this node with its only child. Both cover the same leaves, so
    /// weight and count carry over unchanged.
    fn compress(&mut self) {
        if let Some(only) = self.subtrees.pop() {
            trace!(depth = only.depth(), "merged single-child node");
            *self = only;
        }
    }
}

impl<T: Clone + PartialEq, V: Clone + PartialEq> CompressedPrefixTree<T, V> {
    /// Whether any stored value lies under `prefix`.
    pub fn contains_prefix(&self, prefix: &[T]) -> bool {
        if self.count == 0 {
            return false;
        }
        let mut node = self;
        loop {
            let Some(label) = node.label.prefix() else {
                return false;
            };
            if label.starts_with(prefix) {
                return true;
            }
            if !prefix.starts_with(label) {
                return false;
            }
            let Some((idx, _)) = node.edge_toward(prefix, label.len()) else {
                return false;
            };
            node = &node.subtrees[idx];
        }
    }

    /// Every stored value with its prefix and weight.
    pub fn entries(&self) -> Vec<(Vec<T>, V, f64)> {
        let mut out = Vec::with_capacity(self.count);
        self.collect_entries(&mut out);
        out
    }

    /// Inserts every value stored in `other`; shared values add their weights.
    pub fn merge_from(&mut self, other: &Self) {
        for (prefix, value, weight) in other.entries() {
            self.insert_unchecked(value, weight, &prefix);
        }
    }

    fn collect_entries(&self, out: &mut Vec<(Vec<T>, V, f64)>) {
        for subtree in &self.subtrees {
            match &subtree.label {
                Label::Value(value) => {
                    let prefix = self.label.prefix().unwrap_or_default().to_vec();
                    out.push((prefix, value.clone(), subtree.weight));
                }
                Label::Prefix(_) => subtree.collect_entries(out),
            }
        }
    }

    /// The internal child sharing more than `depth` tokens with `prefix`,
    /// with the shared length. At most one child qualifies.
    fn edge_toward(&self, prefix: &[T], depth: usize) -> Option<(usize, usize)> {
        self.subtrees.iter().enumerate().find_map(|(idx, subtree)| {
            let label = subtree.label.prefix()?;
            let shared = common_prefix_len(label, prefix);
            (shared > depth).then_some((idx, shared))
        })
    }

    fn twig(value: V, weight: f64, prefix: &[T], mode: WeightMode) -> Self {
        Self {
            label: Label::Prefix(prefix.to_vec()),
            weight: mode.aggregate(weight, 1),
            weight_sum: weight,
            subtrees: vec![Self::leaf(value, weight, mode)],
            count: 1,
            mode,
        }
    }

    /// Cuts this node's label after `at` tokens. The head stays here; the
    /// original node becomes its only child.
    fn split(&mut self, at: usize) {
        let Label::Prefix(label) = &self.label else {
            return;
        };
        trace!(at, len = label.len(), "split compressed label");
        let head = Self {
            label: Label::Prefix(label[..at].to_vec()),
            weight: self.weight,
            weight_sum: self.weight_sum,
            subtrees: Vec::new(),
            count: self.count,
            mode: self.mode,
        };
        let tail = std::mem::replace(self, head);
        self.subtrees.push(tail);
    }

    fn insert_unchecked(&mut self, value: V, weight: f64, prefix: &[T]) -> bool {
        let depth = self.depth();
        let added = if depth == prefix.len() {
            match self
                .subtrees
                .iter()
                .position(|subtree| subtree.label.value() == Some(&value))
            {
                Some(idx) => {
                    trace!(weight, "merging into existing leaf");
                    self.subtrees[idx].absorb(weight, false);
                    resettle(&mut self.subtrees, idx);
                    false
                }
                None => {
                    self.attach(Self::leaf(value, weight, self.mode));
                    true
                }
            }
        } else {
            match self.edge_toward(prefix, depth) {
                Some((idx, shared)) => {
                    if shared < self.subtrees[idx].depth() {
                        self.subtrees[idx].split(shared);
                    }
                    let added = self.subtrees[idx].insert_unchecked(value, weight, prefix);
                    resettle(&mut self.subtrees, idx);
                    added
                }
                None => {
                    let twig = Self::twig(value, weight, prefix, self.mode);
                    self.attach(twig);
                    true
                }
            }
        };
        self.absorb(weight, added);
        added
    }

    fn complete(&self, prefix: &[T], limit: Option<usize>, out: &mut Vec<(V, f64)>) {
        if self.count == 0 {
            return;
        }
        let Label::Prefix(label) = &self.label else {
            return;
        };
        if label.starts_with(prefix) {
            self.collect(limit, out);
        } else if prefix.starts_with(label) {
            for subtree in &self.subtrees {
                subtree.complete(prefix, limit, out);
            }
        }
    }

    fn collect(&self, limit: Option<usize>, out: &mut Vec<(V, f64)>) {
        match &self.label {
            Label::Value(value) => out.push((value.clone(), self.weight)),
            Label::Prefix(_) => {
                for subtree in &self.subtrees {
                    if !under_limit(out.len(), limit) {
                        break;
                    }
                    subtree.collect(limit, out);
                }
            }
        }
    }

    /// Detaches the subtree covering `prefix` below this node and returns the
    /// removed weight sum and leaf count. This node's label must be a proper
    /// prefix of `prefix`.
    fn prune(&mut self, prefix: &[T]) -> Option<(f64, usize)> {
        let (idx, _) = self.edge_toward(prefix, self.depth())?;
        let label = self.subtrees[idx].label.prefix()?;
        let removed = if label.starts_with(prefix) {
            let detached = self.subtrees.remove(idx);
            (detached.weight_sum, detached.count)
        } else if prefix.starts_with(label) {
            let child = &mut self.subtrees[idx];
            let removed = child.prune(prefix)?;
            if child.count == 0 {
                self.subtrees.remove(idx);
            } else {
                if child.is_compressible() {
                    child.compress();
                }
                resettle(&mut self.subtrees, idx);
            }
            removed
        } else {
            return None;
        };
        self.shrink(removed.1);
        Some(removed)
    }
}

impl<T: Clone + PartialEq, V: Clone + PartialEq> Autocompleter<T, V>
    for CompressedPrefixTree<T, V>
{
    fn len(&self) -> usize {
        self.count
    }

    fn insert(&mut self, value: V, weight: f64, prefix: &[T]) -> Result<()> {
        check_weight(weight)?;
        self.insert_unchecked(value, weight, prefix);
        Ok(())
    }

    fn autocomplete(&self, prefix: &[T], limit: Option<usize>) -> Vec<(V, f64)> {
        assert!(limit != Some(0), "limit must be positive");
        let mut out = Vec::new();
        self.complete(prefix, limit, &mut out);
        rank(&mut out, limit);
        out
    }

    fn remove(&mut self, prefix: &[T]) {
        if self.count == 0 {
            return;
        }
        if prefix.is_empty() {
            debug!(removed = self.count, weight = self.weight_sum, "removing every value");
            self.clear();
            return;
        }
        match self.prune(prefix) {
            Some((weight, removed)) => debug!(removed, weight, "removing prefix"),
            None => debug!(len = prefix.len(), "remove matched nothing"),
        }
    }
}
