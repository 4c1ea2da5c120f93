//! Chronic comorbidities (CHRMs): prevalence at start, monthly onset and
//! the monthly cost and QOL burden of active conditions.
//!
//! The death rate ratio of an active CHRM is registered by the mortality
//! updater together with the generic risk factors.

use crate::patient::{MonthScratch, Patient};
use crate::random::DrawId;
use crate::stats::CostCategory;

use super::Updater;
use super::state_updater::{UpdateContext, increment_costs};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChrmsUpdater;

impl Updater for ChrmsUpdater {
    fn name(&self) -> &'static str {
        "chrms"
    }

    fn perform_initial_updates(&self, patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
        let config = ctx.config;
        if !config.chrms.enabled {
            return;
        }
        let hiv_index = usize::from(patient.is_hiv_positive());
        let month = patient.general.month_num;
        for (index, chrm) in config.chrms.chrms.iter().enumerate() {
            if ctx.chance(chrm.prevalence[hiv_index], DrawId::InitChrm) {
                if let Some(onset) = patient.disease.chrm_onset_months.get_mut(index) {
                    *onset = Some(month);
                }
            }
        }
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        let config = ctx.config;
        if !config.chrms.enabled {
            return;
        }
        let hiv_index = usize::from(patient.is_hiv_positive());
        let month_num = patient.general.month_num;
        for (index, chrm) in config.chrms.chrms.iter().enumerate() {
            let Some(onset) = patient.disease.chrm_onset_months.get(index).copied() else {
                continue;
            };
            if onset.is_none() {
                if !ctx.chance(chrm.monthly_incidence[hiv_index], DrawId::ChrmIncidence) {
                    continue;
                }
                patient.disease.chrm_onset_months[index] = Some(month_num);
                ctx.run_stats.record_chrm_onset(index);
                ctx.tracer.trace(month_num, format_args!("onset of {}", chrm.name));
            }
            increment_costs(patient, ctx, CostCategory::Chrm, chrm.monthly_cost);
            month.add_qol_modifier(chrm.qol_modifier);
        }
    }
}

/// Indices of comorbidities the patient currently has
pub fn active_chrms(patient: &Patient) -> impl Iterator<Item = usize> + '_ {
    patient
        .disease
        .chrm_onset_months
        .iter()
        .enumerate()
        .filter_map(|(index, onset)| onset.map(|_| index))
}
