//! CD4 and viral load trajectories.
//!
//! One algorithm serves every age branch; the branch only decides which
//! decline table applies and whether the authoritative metric is absolute
//! CD4 or CD4 percentage.

use crate::config::{Cd4DeclineTable, HvlChange, SimContext};
use crate::patient::{ArtEfficacy, MonthScratch, Patient, PedsAgeCategory};
use crate::random::DrawId;

use super::Updater;
use super::state_updater::{
    UpdateContext, adolescent_art_age_category, art_line, authoritative_cd4, current_art_line,
    draw_regimen_cd4_slope, increment_cd4_envelope, set_authoritative_cd4, set_true_hvl_strata,
};

/// Redraws allowed for the patient-specific decline percentage
const MAX_DECLINE_REDRAWS: usize = 100;

/// Natural history table selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cd4Branch {
    Adult,
    Adolescent,
    LateChildhood,
    /// Uses CD4 percentage
    EarlyChildhood,
}

impl Cd4Branch {
    #[must_use]
    pub fn for_patient(patient: &Patient) -> Self {
        if patient.general.is_pediatric {
            match patient.peds.age_category {
                PedsAgeCategory::EarlyChildhood => Self::EarlyChildhood,
                PedsAgeCategory::LateChildhood => Self::LateChildhood,
                PedsAgeCategory::Adult => Self::Adult,
            }
        } else if patient.general.is_adolescent {
            Self::Adolescent
        } else {
            Self::Adult
        }
    }

    fn decline_table(self, config: &SimContext) -> &Cd4DeclineTable {
        match self {
            Self::EarlyChildhood => &config.peds.early_childhood_decline,
            Self::LateChildhood => &config.peds.late_childhood_decline,
            Self::Adolescent => &config.adolescent.cd4_decline,
            Self::Adult => &config.nat_hist.cd4_decline,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cd4HvlUpdater;

impl Updater for Cd4HvlUpdater {
    fn name(&self) -> &'static str {
        "cd4_hvl"
    }

    fn perform_monthly_updates(
        &self,
        patient: &mut Patient,
        _month: &mut MonthScratch,
        ctx: &mut UpdateContext<'_>,
    ) {
        if !patient.is_hiv_positive() {
            return;
        }
        let config = ctx.config;
        let branch = Cd4Branch::for_patient(patient);

        if config.art.envelope_enabled {
            increment_cd4_envelope(patient, config);
        }
        update_hvl(patient, ctx);

        let nat_slope = draw_natural_history_slope(patient, ctx, branch);
        let current = authoritative_cd4(patient);
        let mut new_value = if patient.is_suppressed_on_art() {
            draw_regimen_cd4_slope(patient, ctx);
            let noise_sd = current_art_line(patient, config).map_or(0.0, |line| line.cd4_noise_sd);
            let noise = ctx.gaussian(0.0, noise_sd, DrawId::ArtCd4Noise);
            current + patient.art.regimen_cd4_slope + noise
        } else if patient.art.is_on_art {
            current - nat_slope * failed_art_multiplier(patient, config)
        } else {
            current - nat_slope
        };

        let min_value = if patient.disease.uses_cd4_percentage {
            patient.disease.min_true_cd4_perc
        } else {
            patient.disease.min_true_cd4
        };
        new_value = new_value.max(min_value - nat_slope);
        set_authoritative_cd4(patient, config, new_value, false);

        if patient.is_suppressed_on_art() {
            patient.art.months_suppressed += 1;
        }
        ctx.tracer.trace(
            patient.general.month_num,
            format_args!(
                "CD4 {:.3} -> {:.3} (HVL {}, target {})",
                current,
                authoritative_cd4(patient),
                patient.disease.true_hvl_strata,
                patient.disease.target_hvl_strata
            ),
        );
    }
}

/// Monthly natural-history decline, scaled by the patient-specific percentage
fn draw_natural_history_slope(patient: &mut Patient, ctx: &mut UpdateContext<'_>, branch: Cd4Branch) -> f64 {
    let config = ctx.config;
    let perc = match patient.disease.patient_cd4_decline_perc {
        Some(perc) => perc,
        None => {
            let nat_hist = &config.nat_hist;
            let mut perc = nat_hist.patient_cd4_decline_perc_mean;
            for _ in 0..MAX_DECLINE_REDRAWS {
                perc = ctx.gaussian(
                    nat_hist.patient_cd4_decline_perc_mean,
                    nat_hist.patient_cd4_decline_perc_sd,
                    DrawId::PatientCd4DeclinePerc,
                );
                if perc >= -1.0 {
                    break;
                }
            }
            let perc = perc.max(-1.0);
            patient.disease.patient_cd4_decline_perc = Some(perc);
            perc
        }
    };
    let table = branch.decline_table(config);
    let hvl = patient.disease.true_hvl_strata;
    let cd4 = if patient.disease.uses_cd4_percentage {
        patient.disease.true_cd4_perc_strata
    } else {
        patient.disease.true_cd4_strata
    };
    let slope = ctx.gaussian(table.mean[hvl][cd4], table.sd[hvl][cd4], DrawId::NatHistCd4Slope);
    slope * (1.0 + perc)
}

/// Multiplier on natural decline while failing ART: the value latched when
/// failure began, then the late-stage value once enough months have passed
fn failed_art_multiplier(patient: &Patient, config: &SimContext) -> f64 {
    let Some(line) = current_art_line(patient, config) else {
        return 1.0;
    };
    let latched = patient.art.latched_failed_multiplier.unwrap_or(1.0);
    match patient.art.month_failure_started {
        Some(start)
            if patient.general.month_num.saturating_sub(start) >= line.months_until_late_stage_multiplier =>
        {
            line.late_stage_multiplier
        }
        _ => latched,
    }
}

/// Drift HVL toward its target without overshooting
fn update_hvl(patient: &mut Patient, ctx: &mut UpdateContext<'_>) {
    let current = patient.disease.true_hvl_strata;
    let target = patient.disease.target_hvl_strata;
    if current == target {
        return;
    }
    let change = hvl_change_params(patient, ctx.config);
    let (prob, step) = if !patient.art.is_on_art {
        (change.prob_change_off_art, change.strata_per_month_off_art)
    } else if patient.art.efficacy == ArtEfficacy::Success {
        (change.prob_change_success, change.strata_per_month_success)
    } else {
        (change.prob_change_failure, change.strata_per_month_failure)
    };
    if !ctx.chance(prob, DrawId::HvlChange) {
        return;
    }
    let next = if current < target {
        (current + step).min(target)
    } else {
        current.saturating_sub(step).max(target)
    };
    set_true_hvl_strata(patient, next);
}

/// Drift parameters of the current (or last) line, by adolescent ART age
/// category when the adolescent tables apply
fn hvl_change_params(patient: &Patient, config: &SimContext) -> HvlChange {
    let Some(line) = current_art_line(patient, config)
        .or_else(|| art_line(patient, config, patient.art.prev_line.unwrap_or(0)))
    else {
        return HvlChange::default();
    };
    if patient.general.is_adolescent {
        let category = adolescent_art_age_category(patient.general.age_months, config);
        if let Some(change) = line.hvl_change_by_age_category.get(category) {
            return *change;
        }
    }
    line.hvl_change
}
