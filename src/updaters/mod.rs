//! Monthly updaters.
//!
//! Each updater owns one disease or care axis. The driver calls them in the
//! fixed order of [`PIPELINE`]; in the month a patient dies only
//! [`EndMonthUpdater`] still runs.

pub mod acute_oi;
pub mod cd4_hvl;
pub mod chrms;
pub mod clinic_visit;
pub mod drug_efficacy;
pub mod end_month;
pub mod hiv_infection;
pub mod hiv_test;
pub mod mortality;
pub mod state_updater;
pub mod tb_clinical;
pub mod tb_disease;
pub mod test_chain;

use crate::patient::{MonthScratch, Patient};

pub use acute_oi::AcuteOiUpdater;
pub use cd4_hvl::Cd4HvlUpdater;
pub use chrms::ChrmsUpdater;
pub use clinic_visit::ClinicVisitUpdater;
pub use drug_efficacy::DrugEfficacyUpdater;
pub use end_month::EndMonthUpdater;
pub use hiv_infection::HivInfectionUpdater;
pub use hiv_test::HivTestUpdater;
pub use hvl_test::HvlTestUpdater;
pub use mortality::MortalityUpdater;
pub use state_updater::{Tracer, UpdateContext};
pub use tb_clinical::TbClinicalUpdater;
pub use tb_disease::TbDiseaseUpdater;

/// One axis of the monthly state transition
pub trait Updater: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    /// Draws made once when the patient is created
    fn perform_initial_updates(&self, _patient: &mut Patient, _ctx: &mut UpdateContext<'_>) {}

    /// One month of transitions for a living patient
    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    );
}

/// Updaters in monthly execution order
pub static PIPELINE: [&dyn Updater; 12] = [
    &HivInfectionUpdater,
    &ChrmsUpdater,
    &Cd4HvlUpdater,
    &DrugEfficacyUpdater,
    &AcuteOiUpdater,
    &TbDiseaseUpdater,
    &TbClinicalUpdater,
    &HivTestUpdater,
    &ClinicVisitUpdater,
    &HvlTestUpdater,
    &MortalityUpdater,
    &EndMonthUpdater,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order() {
        let names: Vec<_> = PIPELINE.iter().map(|u| u.name()).collect();
        assert_eq!(names.first(), Some(&"hiv_infection"));
        assert_eq!(names[names.len() - 2], "mortality");
        assert_eq!(names.last(), Some(&"end_month"));
        let cd4 = names.iter().position(|n| *n == "cd4_hvl");
        let drug = names.iter().position(|n| *n == "drug_efficacy");
        let tb = names.iter().position(|n| *n == "tb_disease");
        let hvl = names.iter().position(|n| *n == "hvl_test");
        assert!(cd4 < drug && drug < tb && tb < hvl);
    }
}
