//! Population cost accumulators.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category a cost increment is booked under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostCategory {
    RoutineCare,
    ClinicVisit,
    Prep,
    Art,
    ArtToxicity,
    OiTreatment,
    OiProph,
    Cd4Test,
    HvlTest,
    HivTest,
    EidTest,
    InfantProph,
    TbTest,
    TbTreatment,
    TbProph,
    Chrm,
    Death,
}

impl CostCategory {
    pub const COUNT: usize = 17;
    pub const ALL: [Self; Self::COUNT] = [
        Self::RoutineCare,
        Self::ClinicVisit,
        Self::Prep,
        Self::Art,
        Self::ArtToxicity,
        Self::OiTreatment,
        Self::OiProph,
        Self::Cd4Test,
        Self::HvlTest,
        Self::HivTest,
        Self::EidTest,
        Self::InfantProph,
        Self::TbTest,
        Self::TbTreatment,
        Self::TbProph,
        Self::Chrm,
        Self::Death,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Population cost totals by category.
///
/// Every amount arrives already multiplied by the patient's discount factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    pub undiscounted: [f64; CostCategory::COUNT],
    pub discounted: [f64; CostCategory::COUNT],
    /// Totals per secondary discount rate
    pub secondary_discounted: Vec<f64>,
    /// Undiscounted ART cost by line
    pub art_by_line: Vec<f64>,
    /// Undiscounted cost accrued per patient-month by month index
    pub undiscounted_by_month: Vec<f64>,
}

impl CostStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Book one cost increment
    pub fn record_cost(
        &mut self,
        category: CostCategory,
        undiscounted: f64,
        discounted: f64,
        secondary: &[f64],
        month: u32,
    ) {
        self.undiscounted[category.index()] += undiscounted;
        self.discounted[category.index()] += discounted;
        if self.secondary_discounted.len() < secondary.len() {
            self.secondary_discounted.resize(secondary.len(), 0.0);
        }
        for (slot, value) in self.secondary_discounted.iter_mut().zip(secondary) {
            *slot += value;
        }
        let month = month as usize;
        if self.undiscounted_by_month.len() <= month {
            self.undiscounted_by_month.resize(month + 1, 0.0);
        }
        self.undiscounted_by_month[month] += undiscounted;
    }

    /// Attribute an ART cost to its line
    pub fn record_art_line_cost(&mut self, line: usize, undiscounted: f64) {
        if self.art_by_line.len() <= line {
            self.art_by_line.resize(line + 1, 0.0);
        }
        self.art_by_line[line] += undiscounted;
    }

    #[must_use]
    pub fn total_undiscounted(&self) -> f64 {
        self.undiscounted.iter().sum()
    }

    #[must_use]
    pub fn total_discounted(&self) -> f64 {
        self.discounted.iter().sum()
    }

    #[must_use]
    pub const fn undiscounted_for(&self, category: CostCategory) -> f64 {
        self.undiscounted[category.index()]
    }

    /// Fold another worker's costs into this one
    pub fn merge(&mut self, other: &Self) {
        for (slot, value) in self.undiscounted.iter_mut().zip(&other.undiscounted) {
            *slot += value;
        }
        for (slot, value) in self.discounted.iter_mut().zip(&other.discounted) {
            *slot += value;
        }
        merge_vec(&mut self.secondary_discounted, &other.secondary_discounted);
        merge_vec(&mut self.art_by_line, &other.art_by_line);
        merge_vec(&mut self.undiscounted_by_month, &other.undiscounted_by_month);
    }
}

fn merge_vec(values: &mut Vec<f64>, other: &[f64]) {
    if values.len() < other.len() {
        values.resize(other.len(), 0.0);
    }
    for (slot, value) in values.iter_mut().zip(other) {
        *slot += value;
    }
}

impl fmt::Display for CostStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cost Statistics:")?;
        writeln!(f, "  Total (undiscounted): {:.2}", self.total_undiscounted())?;
        writeln!(f, "  Total (discounted): {:.2}", self.total_discounted())?;
        for category in CostCategory::ALL {
            let amount = self.undiscounted_for(category);
            if amount > 0.0 {
                writeln!(f, "  {category:?}: {amount:.2}")?;
            }
        }
        Ok(())
    }
}
