use std::cmp::Ordering;

pub(crate) trait Weighted {
    fn weight(&self) -> f64;
}

/// Position at which a node of weight `weight` keeps `nodes` non-increasing.
///
/// Linear scan from the front; the new node goes before the first existing
/// node whose weight is `<= weight`, or at the end.
pub(crate) fn insertion_index<N: Weighted>(nodes: &[N], weight: f64) -> usize {
    nodes
        .iter()
        .position(|node| node.weight() <= weight)
        .unwrap_or(nodes.len())
}

/// Moves `nodes[idx]` to where its current weight belongs and returns the new
/// index. Everything else must already be sorted non-increasing.
pub(crate) fn resettle<N: Weighted>(nodes: &mut [N], mut idx: usize) -> usize {
    while idx > 0 && nodes[idx - 1].weight() < nodes[idx].weight() {
        nodes.swap(idx - 1, idx);
        idx -= 1;
    }
    while idx + 1 < nodes.len() && nodes[idx + 1].weight() > nodes[idx].weight() {
        nodes.swap(idx, idx + 1);
        idx += 1;
    }
    idx
}

pub(crate) fn common_prefix_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Stable sort by non-increasing weight, then cut to `limit`.
pub(crate) fn rank<V>(matches: &mut Vec<(V, f64)>, limit: Option<usize>) {
    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    if let Some(limit) = limit {
        matches.truncate(limit);
    }
}

pub(crate) fn under_limit(held: usize, limit: Option<usize>) -> bool {
    limit.is_none_or(|limit| held < limit)
}
