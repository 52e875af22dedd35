//! Aggregation of leaf weights into internal-node weights.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How an internal node derives its weight from the leaves below it.
///
/// The mode is fixed when a tree is built. Leaves always carry their own
/// weight; only internal nodes are affected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WeightMode {
    /// Sum of every leaf weight in the subtree.
    #[default]
    Sum,
    /// Arithmetic mean of the leaf weights in the subtree.
    Average,
}

impl WeightMode {
    /// Weight of a node whose leaves add up to `weight_sum` over `count` leaves.
    ///
    /// Returns `0` for an empty subtree in both modes.
    pub fn aggregate(self, weight_sum: f64, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        match self {
            Self::Sum => weight_sum,
            Self::Average => weight_sum / count as f64,
        }
    }

    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
        }
    }
}

impl FromStr for WeightMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Self::Sum),
            "average" => Ok(Self::Average),
            other => Err(Error::UnknownWeightMode(other.to_owned())),
        }
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
