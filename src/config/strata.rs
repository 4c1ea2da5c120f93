//! Strata dimensions and boundary lookups shared by every configuration table.

use serde::{Deserialize, Serialize};

/// Number of absolute CD4 strata
pub const CD4_NUM_STRATA: usize = 6;
/// Number of CD4 percentage strata used for early childhood
pub const CD4_PERC_NUM_STRATA: usize = 6;
/// Number of HIV viral load strata
pub const HVL_NUM_STRATA: usize = 7;
/// Number of genders in gender-keyed tables
pub const GENDER_NUM: usize = 2;
/// Number of TB strains
pub const TB_NUM_STRAINS: usize = 3;
/// Upper limit on configured OI types (history is kept in a `u32` bitset)
pub const MAX_OI_TYPES: usize = 32;

/// Index of the fully suppressed HVL stratum
pub const HVL_SUPPRESSED: usize = 0;
/// Index of the highest HVL stratum
pub const HVL_HIGHEST: usize = HVL_NUM_STRATA - 1;

/// Table keyed by CD4 strata
pub type Cd4Table = [f64; CD4_NUM_STRATA];
/// Table keyed by CD4 percentage strata
pub type Cd4PercTable = [f64; CD4_PERC_NUM_STRATA];
/// Distribution over HVL strata
pub type HvlDistribution = [f64; HVL_NUM_STRATA];

/// Patient gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    /// Column index in gender-keyed tables
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Male => 0,
            Self::Female => 1,
        }
    }
}

/// Find the CD4 stratum for an absolute CD4 count.
///
/// A value belongs to the first stratum whose upper bound it is strictly
/// below; values at or above the last bound fall into the top stratum.
#[must_use]
pub fn cd4_strata(cd4: f64, upper_bounds: &[f64; CD4_NUM_STRATA - 1]) -> usize {
    upper_bounds
        .iter()
        .position(|&bound| cd4 < bound)
        .unwrap_or(CD4_NUM_STRATA - 1)
}

/// Find the CD4 percentage stratum for a CD4 fraction in `[0, 1]`.
#[must_use]
pub fn cd4_perc_strata(perc: f64, upper_bounds: &[f64; CD4_PERC_NUM_STRATA - 1]) -> usize {
    upper_bounds
        .iter()
        .position(|&bound| perc < bound)
        .unwrap_or(CD4_PERC_NUM_STRATA - 1)
}
