//! One node per token: the uncompressed weighted prefix tree.
//!
//! Every internal node below the root is labelled with its parent's prefix
//! plus exactly one token, so a value stored under `[c, a, t]` hangs off the
//! chain `[] -> [c] -> [c, a] -> [c, a, t]`.

use tracing::{debug, trace};

use crate::error::{Result, check_weight};
use crate::util::{Weighted, insertion_index, rank, resettle, under_limit};
use crate::{Autocompleter, Label, WeightMode};

/// Weighted prefix tree with one node per prefix token.
///
/// The tree and each of its subtrees share this type. A node is *empty*
/// when its weight is `0` (only the root of an empty tree), a *leaf* when it
/// holds a [`Label::Value`], and *internal* otherwise.
///
/// Children are kept sorted by non-increasing weight. Every insert or remove
/// that changes a child's weight moves it back into position.
#[derive(Clone, Debug)]
pub struct SimplePrefixTree<T, V> {
    label: Label<T, V>,
    weight: f64,
    weight_sum: f64,
    subtrees: Vec<SimplePrefixTree<T, V>>,
    count: usize,
    mode: WeightMode,
}

/// Outcome of the locate pass of [`Autocompleter::remove`].
#[derive(Clone, Copy, Debug)]
struct Removal {
    /// Depth (label length) of the last node on the path with more than one
    /// child. The matched subtree is detached there.
    branch: usize,
    weight_sum: f64,
    count: usize,
}

enum Route {
    Descend(usize),
    Merge(usize),
    Branch,
}

impl<T, V> Default for SimplePrefixTree<T, V> {
    fn default() -> Self {
        Self::new(WeightMode::default())
    }
}

impl<T, V> Weighted for SimplePrefixTree<T, V> {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl<T, V> SimplePrefixTree<T, V> {
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

    /// Leaf weight, or the aggregate weight of an internal node.
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

    /// Drops every stored value; the weight mode is kept.
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

    /// Drops `removed` leaves from the count and re-derives the weight from
    /// the children that are left, never by subtracting the detached sum.
    fn release(&mut self, removed: usize) {
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
}

impl<T: Clone + PartialEq, V: Clone + PartialEq> SimplePrefixTree<T, V> {
    /// Whether any stored value lies under `prefix`.
    pub fn contains_prefix(&self, prefix: &[T]) -> bool {
        self.find(prefix).is_some()
    }

    /// Every stored value with its prefix and weight, heaviest subtrees first.
    pub fn entries(&self) -> Vec<(Vec<T>, V, f64)> {
        let mut out = Vec::with_capacity(self.count);
        self.collect_entries(&mut out);
        out
    }

    /// Inserts every value stored in `other`.
    ///
    /// Values present in both trees end up with the sum of their weights, so
    /// both trees must agree on the prefix of any shared value.
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

    /// Follows `prefix` one token at a time down to the node labelled with it.
    fn find(&self, prefix: &[T]) -> Option<&Self> {
        if self.count == 0 {
            return None;
        }
        let mut node = self;
        loop {
            let label = node.label.prefix()?;
            if label.len() == prefix.len() {
                return (label == prefix).then_some(node);
            }
            node = node.subtrees.iter().find(|s| s.routes(prefix))?;
        }
    }

    /// Whether this is an internal node on the path to `prefix`.
    fn routes(&self, prefix: &[T]) -> bool {
        matches!(&self.label, Label::Prefix(label) if prefix.starts_with(label))
    }

    fn route(&self, value: &V, prefix: &[T]) -> Route {
        for (idx, subtree) in self.subtrees.iter().enumerate() {
            match &subtree.label {
                Label::Prefix(label) if prefix.starts_with(label) => return Route::Descend(idx),
                Label::Value(stored) if stored == value => return Route::Merge(idx),
                _ => {}
            }
        }
        Route::Branch
    }

    /// Returns whether a new leaf was created (as opposed to a merge).
    fn insert_unchecked(&mut self, value: V, weight: f64, prefix: &[T]) -> bool {
        let added = match self.route(&value, prefix) {
            Route::Descend(idx) => {
                let added = self.subtrees[idx].insert_unchecked(value, weight, prefix);
                resettle(&mut self.subtrees, idx);
                added
            }
            Route::Merge(idx) => {
                trace!(weight, "merging into existing leaf");
                self.subtrees[idx].absorb(weight, false);
                resettle(&mut self.subtrees, idx);
                false
            }
            Route::Branch => {
                self.grow(value, weight, prefix);
                true
            }
        };
        self.absorb(weight, added);
        added
    }

    /// Hangs a new chain for `prefix` below this node, ending in a leaf.
    fn grow(&mut self, value: V, weight: f64, prefix: &[T]) {
        let depth = self.depth();
        let mut node = Self::leaf(value, weight, self.mode);
        for len in (depth + 1..=prefix.len()).rev() {
            node = Self {
                label: Label::Prefix(prefix[..len].to_vec()),
                weight: self.mode.aggregate(weight, 1),
                weight_sum: weight,
                subtrees: vec![node],
                count: 1,
                mode: self.mode,
            };
        }
        trace!(
            depth,
            created = prefix.len().saturating_sub(depth),
            "materialized branch"
        );
        let idx = insertion_index(&self.subtrees, node.weight);
        self.subtrees.insert(idx, node);
    }

    fn complete(&self, prefix: &[T], limit: Option<usize>, out: &mut Vec<(V, f64)>) {
        if self.count == 0 {
            return;
        }
        let Label::Prefix(label) = &self.label else {
            return;
        };
        if label.as_slice() == prefix {
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

    fn locate(&self, prefix: &[T]) -> Option<Removal> {
        if self.count == 0 {
            return None;
        }
        let mut node = self;
        let mut branch = self.depth();
        loop {
            let label = node.label.prefix()?;
            if label.len() == prefix.len() {
                return (label == prefix).then_some(Removal {
                    branch,
                    weight_sum: node.weight_sum,
                    count: node.count,
                });
            }
            if node.subtrees.len() > 1 {
                branch = label.len();
            }
            node = node.subtrees.iter().find(|s| s.routes(prefix))?;
        }
    }

    fn detach(&mut self, prefix: &[T], removal: &Removal) {
        if let Some(idx) = self.subtrees.iter().position(|s| s.routes(prefix)) {
            if self.depth() == removal.branch {
                self.subtrees.remove(idx);
            } else {
                self.subtrees[idx].detach(prefix, removal);
                resettle(&mut self.subtrees, idx);
            }
        }
        self.release(removal.count);
    }
}

impl<T: Clone + PartialEq, V: Clone + PartialEq> Autocompleter<T, V> for SimplePrefixTree<T, V> {
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
        let Some(removal) = self.locate(prefix) else {
            debug!(len = prefix.len(), "remove matched nothing");
            return;
        };
        debug!(
            removed = removal.count,
            weight = removal.weight_sum,
            branch = removal.branch,
            "removing prefix"
        );
        if prefix.len() == self.depth() {
            self.clear();
            return;
        }
        self.detach(prefix, &removal);
    }
}
