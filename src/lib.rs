//! Weighted prefix trees for ranked autocompletion.
//!
//! Values are stored under a *prefix*, a sequence of caller-supplied tokens,
//! together with a positive weight. Internal nodes aggregate the weights of
//! the leaves below them (see [`WeightMode`]) and every node keeps its
//! children sorted by weight, so the heaviest completions are found first.
//!
//! Two layouts share the [`Autocompleter`] interface:
//!
//! * [`SimplePrefixTree`] materialises one node per token of every prefix.
//! * [`CompressedPrefixTree`] collapses single-child chains into one node
//!   whose label spans several tokens.
//!
//! ```rust
//! use weighted_autocomplete::{Autocompleter, SimplePrefixTree, WeightMode};
//!
//! let mut tree = SimplePrefixTree::new(WeightMode::Sum);
//! tree.insert("car", 3.0, &['c', 'a', 'r']).unwrap();
//! tree.insert("cat", 4.0, &['c', 'a', 't']).unwrap();
//! tree.insert("cut", 1.0, &['c', 'u', 't']).unwrap();
//!
//! assert_eq!(tree.autocomplete(&['c'], Some(2)), [("cat", 4.0), ("car", 3.0)]);
//!
//! tree.remove(&['c', 'a']);
//! assert_eq!(tree.len(), 1);
//! ```
//!
//! Tokens and values are compared with `==` only; how a string is split into
//! tokens is up to the caller.

mod compressed;
mod error;
mod tree;
mod util;
mod weight;

pub use compressed::CompressedPrefixTree;
pub use error::{Error, Result};
pub use tree::SimplePrefixTree;
pub use weight::WeightMode;

/// What a node holds: a prefix for root and internal nodes, the stored value
/// for leaves.
///
/// An empty tree is a root labelled with the empty prefix and weight `0`.
#[derive(Clone, Debug, PartialEq)]
pub enum Label<T, V> {
    /// Tokens shared by every value below this node.
    Prefix(Vec<T>),
    /// A stored value; only leaves carry one.
    Value(V),
}

impl<T, V> Label<T, V> {
    /// The prefix, or `None` for a leaf.
    pub fn prefix(&self) -> Option<&[T]> {
        match self {
            Self::Prefix(prefix) => Some(prefix),
            Self::Value(_) => None,
        }
    }

    /// The stored value, or `None` for a prefix node.
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Prefix(_) => None,
            Self::Value(value) => Some(value),
        }
    }
}

/// Ranked autocompletion over weighted values.
pub trait Autocompleter<T, V> {
    /// Number of values stored.
    fn len(&self) -> usize;

    /// Whether no value is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `value` under `prefix` with `weight`.
    ///
    /// If `value` is already stored, `weight` is added to its existing weight
    /// instead. A value must always be inserted under the same prefix;
    /// re-inserting it under a different one leaves the tree holding two
    /// copies.
    ///
    /// Fails with [`Error::InvalidWeight`] unless `weight` is positive and
    /// finite, in which case the tree is unchanged.
    fn insert(&mut self, value: V, weight: f64, prefix: &[T]) -> Result<()>;

    /// Returns up to `limit` `(value, weight)` matches for `prefix`, ordered
    /// by non-increasing weight. `None` returns every match.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is `Some(0)`.
    fn autocomplete(&self, prefix: &[T], limit: Option<usize>) -> Vec<(V, f64)>;

    /// Removes every value whose prefix starts with `prefix`.
    fn remove(&mut self, prefix: &[T]);
}
