//! Configuration for the simulation engine.
//!
//! `SimContext` is the read-only parameter repository consulted by every
//! updater. It is deserialized from JSON (every section has defaults, so a
//! partial file overrides only what it names) and validated once before a run.

pub mod art;
pub mod costs;
pub mod nat_hist;
pub mod peds;
pub mod run;
pub mod strata;
pub mod tb;
pub mod testing;

use std::fmt;
use std::path::Path;

use itertools::Itertools;
use log::info;
use serde::{Deserialize, Serialize};

use crate::ensure_config;
use crate::error::{Result, SimError};

pub use art::{ArtInputs, ArtLine, ArtToxicity, HeterogeneityInputs, HvlChange, LogitBounds, SlopeStage};
pub use costs::{Chrm, ChrmInputs, CostInputs, DeathCauseTable, QolInputs, RoutineCareCosts};
pub use nat_hist::{Cd4DeclineTable, NatHistInputs, OiInputs, OiType};
pub use peds::{AdolescentInputs, EidInputs, InfantProph, PedsInputs, PerinatalTransmission};
pub use run::{
    CohortInputs, GenericRiskFactor, InitialHivDistribution, MortalityInputs, MortalityModifier,
    QolCalcMode, RunSpecs,
};
pub use strata::Gender;
pub use tb::{TbInputs, TbProph, TbTreatmentLine};
pub use testing::{
    ClinicInputs, ConfirmatoryTest, HivTestingInputs, HvlTestInputs, PrepInputs, ProphInputs,
    ProphLine, ProphPolicy, StiPolicy, TestChainParams,
};

/// Tolerance used when checking that a distribution sums to at most one
const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Read-only parameter repository for a simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimContext {
    pub run: RunSpecs,
    pub cohort: CohortInputs,
    pub mortality: MortalityInputs,
    pub nat_hist: NatHistInputs,
    pub art: ArtInputs,
    pub peds: PedsInputs,
    pub adolescent: AdolescentInputs,
    pub hiv_testing: HivTestingInputs,
    pub clinic: ClinicInputs,
    pub proph: ProphInputs,
    pub hvl_tests: HvlTestInputs,
    pub tb: TbInputs,
    pub costs: CostInputs,
    pub qol: QolInputs,
    pub chrms: ChrmInputs,
}

impl SimContext {
    /// Load and validate a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SimError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let context = Self::from_json_str(&content)?;
        info!("Loaded simulation configuration from {}", path.display());
        Ok(context)
    }

    /// Parse and validate a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let context: Self = serde_json::from_str(json)?;
        context.validate()?;
        Ok(context)
    }

    /// Serialize the configuration, e.g. to record what a run used
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check table shapes and probability ranges.
    ///
    /// Values that the engine clamps at run time (CD4, QOL) are not checked
    /// here; only inputs that would otherwise index out of bounds or describe
    /// an impossible distribution are rejected.
    pub fn validate(&self) -> Result<()> {
        self.validate_run()?;
        self.validate_cohort()?;
        self.validate_art()?;
        self.validate_testing()?;
        self.validate_peds()?;
        self.validate_tb()?;
        self.validate_costs()?;
        Ok(())
    }

    fn validate_run(&self) -> Result<()> {
        let run = &self.run;
        ensure_config!(
            run.discount_rate_annual >= 0.0,
            "run",
            "discount rate must be non-negative, got {}",
            run.discount_rate_annual
        );
        ensure_config!(
            run.secondary_discount_rates.iter().all(|&r| r >= 0.0),
            "run",
            "secondary discount rates must be non-negative"
        );
        ensure_config!(run.cd4_max > 0.0, "run", "cd4_max must be positive");
        ensure_config!(
            run.cd4_percentage_max > 0.0 && run.cd4_percentage_max <= 1.0,
            "run",
            "cd4_percentage_max must be in (0, 1]"
        );
        check_ascending("run", "cd4_strata_upper_bounds", &run.cd4_strata_upper_bounds)?;
        check_ascending(
            "run",
            "cd4_percentage_strata_upper_bounds",
            &run.cd4_percentage_strata_upper_bounds,
        )?;
        for rates in &self.mortality.background_monthly_rate {
            ensure_config!(
                !rates.is_empty(),
                "mortality",
                "background mortality table must have at least one age"
            );
        }
        Ok(())
    }

    fn validate_cohort(&self) -> Result<()> {
        let cohort = &self.cohort;
        check_probability("cohort", "prob_male", cohort.prob_male)?;
        check_distribution("cohort", "risk_category_distribution", &cohort.risk_category_distribution)?;
        ensure_config!(
            !cohort.risk_category_distribution.is_empty(),
            "cohort",
            "at least one risk category is required"
        );
        ensure_config!(
            self.hiv_testing.risk_multipliers.len() >= cohort.risk_category_distribution.len(),
            "cohort",
            "every risk category needs an infection multiplier"
        );
        check_distribution(
            "cohort",
            "initial_hiv_distribution",
            &cohort.initial_hiv_distribution.as_array(),
        )?;
        for row in &cohort.initial_hvl_distribution {
            check_distribution("cohort", "initial_hvl_distribution", row)?;
        }
        for factor in &cohort.generic_risk_factors {
            check_probability("cohort", "generic risk factor prevalence", factor.prevalence)?;
        }
        Ok(())
    }

    fn validate_art(&self) -> Result<()> {
        ensure_config!(!self.art.lines.is_empty(), "art", "at least one ART line is required");
        let het = &self.art.heterogeneity;
        ensure_config!(
            het.propensity_mean_by_age_category.len() > het.age_category_bounds.len(),
            "art",
            "propensity means must cover every heterogeneity age category"
        );
        check_ascending("art", "heterogeneity age bounds", &het.age_category_bounds)?;
        let all_lines = self
            .art
            .lines
            .iter()
            .chain(&self.peds.art_lines)
            .chain(&self.adolescent.art_lines);
        for line in all_lines {
            ensure_config!(
                !line.cd4_slope_stages.is_empty(),
                "art",
                "line '{}' has no CD4 slope stages",
                line.name
            );
            ensure_config!(
                line.cd4_slope_stages.last().is_some_and(|s| s.months_upper.is_none()),
                "art",
                "the last CD4 slope stage of line '{}' must be open ended",
                line.name
            );
            check_probability("art", "prob_suppression_responder", line.prob_suppression_responder)?;
            check_probability("art", "prob_suppression_nonresponder", line.prob_suppression_nonresponder)?;
        }
        Ok(())
    }

    fn validate_testing(&self) -> Result<()> {
        let testing = &self.hiv_testing;
        ensure_config!(
            testing.monthly_infection_prob.len() > testing.infection_age_bounds.len(),
            "hiv_testing",
            "infection probabilities must cover every infection age category"
        );
        check_ascending("hiv_testing", "infection_age_bounds", &testing.infection_age_bounds)?;
        check_distribution("hiv_testing", "acute_hvl_distribution", &testing.acute_hvl_distribution)?;
        check_distribution("hiv_testing", "setpoint_distribution", &testing.setpoint_distribution)?;
        check_chain("hiv_testing", &testing.routine_test)?;
        ensure_config!(
            self.proph.by_oi.len() <= self.nat_hist.oi.types.len(),
            "proph",
            "more prophylaxis policies than OI types"
        );
        ensure_config!(
            self.nat_hist.oi.types.len() <= strata::MAX_OI_TYPES,
            "nat_hist",
            "at most {} OI types are supported",
            strata::MAX_OI_TYPES
        );
        Ok(())
    }

    fn validate_peds(&self) -> Result<()> {
        if !self.peds.enabled {
            return Ok(());
        }
        ensure_config!(
            self.peds.early_childhood_upper_months < self.peds.late_childhood_upper_months,
            "peds",
            "early childhood must end before late childhood"
        );
        ensure_config!(
            !self.peds.art_lines.is_empty(),
            "peds",
            "pediatric model needs at least one pediatric ART line"
        );
        check_distribution("peds", "maternal_art_distribution", &self.peds.maternal_art_distribution)?;
        check_distribution("peds", "setpoint_distribution", &self.peds.setpoint_distribution)?;
        check_chain("peds.eid", &self.peds.eid.chain)?;
        Ok(())
    }

    fn validate_tb(&self) -> Result<()> {
        if !self.tb.enabled {
            return Ok(());
        }
        check_distribution("tb", "strain_distribution", &self.tb.strain_distribution)?;
        ensure_config!(
            !self.tb.treatment_lines.is_empty(),
            "tb",
            "TB model needs at least one treatment line"
        );
        check_chain("tb", &self.tb.testing)?;
        Ok(())
    }

    fn validate_costs(&self) -> Result<()> {
        let categories = self.costs.age_category_bounds.len() + 1;
        check_ascending("costs", "age_category_bounds", &self.costs.age_category_bounds)?;
        let routine = &self.costs.routine_care;
        for (name, table) in [
            ("hiv_negative", &routine.hiv_negative),
            ("undetected", &routine.undetected),
            ("detected_unlinked", &routine.detected_unlinked),
            ("in_care_off_art", &routine.in_care_off_art),
            ("in_care_on_art", &routine.in_care_on_art),
            ("lost", &routine.lost),
            ("death_cost_in_care_by_age", &self.costs.death_cost_in_care_by_age),
        ] {
            ensure_config!(
                table.len() == categories,
                "costs",
                "{name} has {} entries but there are {categories} cost age categories",
                table.len()
            );
        }
        Ok(())
    }

    /// Whether the patient at this age is handled by the pediatric model
    #[must_use]
    pub const fn is_pediatric_age(&self, age_months: u32) -> bool {
        self.peds.enabled && age_months <= self.peds.late_childhood_upper_months
    }

    /// Whether the patient at this age uses the adolescent tables
    #[must_use]
    pub const fn is_adolescent_age(&self, age_months: u32) -> bool {
        self.adolescent.enabled
            && age_months >= self.adolescent.lower_age_months
            && age_months <= self.adolescent.upper_age_months
    }
}

impl fmt::Display for SimContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation Configuration:")?;
        writeln!(f, "  Discount Rate: {}", self.run.discount_rate_annual)?;
        writeln!(f, "  Max Patient Age (months): {}", self.run.max_patient_age_months)?;
        if let Some(horizon) = self.run.max_months {
            writeln!(f, "  Horizon (months): {horizon}")?;
        }
        writeln!(f, "  QOL Mode: {:?}", self.run.qol_calc_mode)?;
        writeln!(f, "  ART Lines: {}", self.art.lines.len())?;
        writeln!(f, "  OI Types: {}", self.nat_hist.oi.types.len())?;
        writeln!(f, "  Pediatric Model: {}", self.peds.enabled)?;
        writeln!(f, "  Adolescent Model: {}", self.adolescent.enabled)?;
        writeln!(f, "  PrEP: {}", self.hiv_testing.prep.enabled)?;
        writeln!(f, "  TB Model: {}", self.tb.enabled)?;
        writeln!(f, "  Comorbidities: {}", self.chrms.chrms.len())?;
        Ok(())
    }
}

fn check_probability(section: &'static str, name: &str, value: f64) -> Result<()> {
    ensure_config!(
        (0.0..=1.0).contains(&value),
        section,
        "{name} must be a probability, got {value}"
    );
    Ok(())
}

fn check_distribution(section: &'static str, name: &str, probs: &[f64]) -> Result<()> {
    ensure_config!(
        probs.iter().all(|p| (0.0..=1.0).contains(p)),
        section,
        "{name} contains a value outside [0, 1]"
    );
    let total: f64 = probs.iter().sum();
    ensure_config!(
        total <= 1.0 + DISTRIBUTION_TOLERANCE,
        section,
        "{name} sums to {total}, more than 1"
    );
    Ok(())
}

fn check_ascending<T: PartialOrd + Copy>(section: &'static str, name: &str, bounds: &[T]) -> Result<()> {
    ensure_config!(
        bounds.iter().tuple_windows().all(|(a, b)| a < b),
        section,
        "{name} must be strictly increasing"
    );
    Ok(())
}

fn check_chain(section: &'static str, chain: &TestChainParams) -> Result<()> {
    ensure_config!(
        chain.confirmatory.len() <= 2,
        section,
        "at most two confirmatory tests are supported"
    );
    for (name, value) in [
        ("prob_offer", chain.prob_offer),
        ("prob_accept", chain.prob_accept),
        ("prob_result_return", chain.prob_result_return),
        ("sensitivity", chain.sensitivity),
        ("specificity", chain.specificity),
        ("prob_link", chain.prob_link),
    ] {
        check_probability(section, name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let context = SimContext::default();
        assert!(context.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_defaults() {
        let json = r#"{ "run": { "discount_rate_annual": 0.05 }, "tb": { "enabled": true } }"#;
        let context = SimContext::from_json_str(json).unwrap();
        assert_eq!(context.run.discount_rate_annual, 0.05);
        assert!(context.tb.enabled);
        assert_eq!(context.art.lines.len(), 2);
    }

    #[test]
    fn test_rejects_bad_distribution() {
        let mut context = SimContext::default();
        context.cohort.initial_hiv_distribution = InitialHivDistribution {
            negative: 0.6,
            acute: 0.3,
            chronic: 0.3,
        };
        let err = context.validate().unwrap_err();
        assert!(err.to_string().contains("initial_hiv_distribution"));
    }

    #[test]
    fn test_rejects_unsorted_bounds() {
        let mut context = SimContext::default();
        context.costs.age_category_bounds = vec![600, 100];
        assert!(context.validate().is_err());
    }

    #[test]
    fn test_round_trip_json() {
        let context = SimContext::default();
        let json = context.to_json_string().unwrap();
        let parsed = SimContext::from_json_str(&json).unwrap();
        assert_eq!(parsed.art.lines, context.art.lines);
    }

    #[test]
    fn test_display_summary() {
        let summary = SimContext::default().to_string();
        assert!(summary.contains("ART Lines: 2"));
        assert!(summary.contains("OI Types: 3"));
    }
}
