use crate::constants::BASIS_POINTS_DENOMINATOR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rate in units of 1/10000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(pub u64);

impl BasisPoints {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(BASIS_POINTS_DENOMINATOR);

    pub fn is_valid(&self) -> bool {
        self.0 <= BASIS_POINTS_DENOMINATOR
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}
