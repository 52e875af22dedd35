use std::fmt;

/// Errors returned by tree construction and insertion.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// The weight mode name is neither `"sum"` nor `"average"`.
    UnknownWeightMode(String),
    /// `insert` was given a weight that is not strictly positive and finite.
    InvalidWeight(f64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWeightMode(name) => {
                write!(f, "unknown weight mode {name:?} (expected \"sum\" or \"average\")")
            }
            Self::InvalidWeight(weight) => {
                write!(f, "weight must be positive and finite, got {weight}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for fallible tree operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidWeight(weight))
    }
}
