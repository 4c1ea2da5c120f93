//! Enumerations describing disease, care and treatment states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// HIV infection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HivState {
    #[default]
    Negative,
    Acute,
    AsymptomaticChronic,
    SymptomaticChronic,
}

impl HivState {
    #[must_use]
    pub const fn is_positive(self) -> bool {
        !matches!(self, Self::Negative)
    }

    /// Index used by exposure statistics
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const COUNT: usize = 4;
}

/// Position in the care cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CareState {
    #[default]
    HivNegative,
    Undetected,
    DetectedUnlinked,
    InCare,
    Lost,
    ReturnedToCare,
}

impl CareState {
    /// In care, including after a return from loss to follow-up
    #[must_use]
    pub const fn is_in_care(self) -> bool {
        matches!(self, Self::InCare | Self::ReturnedToCare)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const COUNT: usize = 6;
}

/// Loss to follow-up state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LtfuState {
    #[default]
    NeverLost,
    Lost,
    Returned,
}

/// How HIV was first detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMethod {
    AtInitialization,
    RoutineTest,
    EarlyInfantDiagnosis,
    OiPresentation,
}

impl DetectionMethod {
    pub const COUNT: usize = 4;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Efficacy of the current ART regimen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ArtEfficacy {
    #[default]
    Success,
    Failure,
}

/// Whether a failure happened from the start of a regimen or after suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    Early,
    Late,
}

/// ART response classification derived from the suppression response factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResponseType {
    NonResponder,
    LowResponder,
    #[default]
    ModerateResponder,
    FullResponder,
}

impl ResponseType {
    pub const COUNT: usize = 4;

    /// Classify a response factor using three increasing thresholds
    #[must_use]
    pub fn from_factor(factor: f64, thresholds: &[f64; 3]) -> Self {
        if factor < thresholds[0] {
            Self::NonResponder
        } else if factor < thresholds[1] {
            Self::LowResponder
        } else if factor < thresholds[2] {
            Self::ModerateResponder
        } else {
            Self::FullResponder
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Outcomes affected by ART response heterogeneity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HetOutcome {
    Suppression,
    LateFailure,
    ArtEffectMortality,
    ArtEffectOi,
    Resuppression,
    Cost,
}

impl HetOutcome {
    pub const COUNT: usize = 6;
    pub const ALL: [Self; Self::COUNT] = [
        Self::Suppression,
        Self::LateFailure,
        Self::ArtEffectMortality,
        Self::ArtEffectOi,
        Self::Resuppression,
        Self::Cost,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Structured treatment interruption state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StiState {
    #[default]
    None,
    Interrupted {
        since_month: u32,
    },
    Restarted,
}

/// Cause of death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CauseOfDeath {
    Background,
    Hiv,
    /// Index of the OI type
    AcuteOi(usize),
    Tb,
    ArtToxicity,
    /// Index of the comorbidity
    Chrm(usize),
    /// Index of the generic risk factor
    RiskFactor(usize),
}

impl CauseOfDeath {
    /// Number of cause families tracked by statistics
    pub const FAMILY_COUNT: usize = 7;

    /// Index of the cause family (specific OI/CHRM/risk factor collapsed)
    #[must_use]
    pub const fn family_index(self) -> usize {
        match self {
            Self::Background => 0,
            Self::Hiv => 1,
            Self::AcuteOi(_) => 2,
            Self::Tb => 3,
            Self::ArtToxicity => 4,
            Self::Chrm(_) => 5,
            Self::RiskFactor(_) => 6,
        }
    }
}

impl fmt::Display for CauseOfDeath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Background => write!(f, "background"),
            Self::Hiv => write!(f, "HIV"),
            Self::AcuteOi(oi) => write!(f, "acute OI {oi}"),
            Self::Tb => write!(f, "TB"),
            Self::ArtToxicity => write!(f, "ART toxicity"),
            Self::Chrm(chrm) => write!(f, "comorbidity {chrm}"),
            Self::RiskFactor(factor) => write!(f, "risk factor {factor}"),
        }
    }
}

/// Severity class of a patient's OI history
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OiHistoryClass {
    #[default]
    None,
    Mild,
    Severe,
}

/// Pediatric age category; early childhood uses CD4 percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum PedsAgeCategory {
    EarlyChildhood,
    LateChildhood,
    #[default]
    Adult,
}

/// Route of pediatric infection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PedsHivType {
    InUtero,
    IntraPartum,
    PostPartum,
}

impl PedsHivType {
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Maternal HIV state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaternalHivState {
    #[default]
    Negative,
    Chronic,
    /// Infected while breastfeeding
    AcuteDuringBreastfeeding,
}

/// Maternal ART status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaternalArt {
    #[default]
    OffArt,
    Suppressed,
    NotSuppressed,
}

impl MaternalArt {
    pub const ALL: [Self; 3] = [Self::OffArt, Self::Suppressed, Self::NotSuppressed];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Maternal viral load tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaternalHvl {
    #[default]
    Low,
    High,
}

impl MaternalHvl {
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// TB disease state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TbStatus {
    #[default]
    Uninfected,
    Latent,
    ActivePulmonary,
    ActiveExtrapulmonary,
    PreviouslyTreated,
    TreatmentDefault,
}

impl TbStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::ActivePulmonary | Self::ActiveExtrapulmonary)
    }

    #[must_use]
    pub const fn is_infected(self) -> bool {
        !matches!(self, Self::Uninfected)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const COUNT: usize = 6;
}

/// TB strain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TbStrain {
    DrugSensitive,
    Mdr,
    Xdr,
}

impl TbStrain {
    pub const ALL: [Self; 3] = [Self::DrugSensitive, Self::Mdr, Self::Xdr];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Diagnostic chains sharing the offer/accept/result/confirm machinery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    RoutineHiv,
    EarlyInfantDiagnosis,
    Tb,
}

impl TestKind {
    pub const COUNT: usize = 3;

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_thresholds() {
        let thresholds = [0.25, 0.5, 0.75];
        assert_eq!(ResponseType::from_factor(0.0, &thresholds), ResponseType::NonResponder);
        assert_eq!(ResponseType::from_factor(0.25, &thresholds), ResponseType::LowResponder);
        assert_eq!(ResponseType::from_factor(0.6, &thresholds), ResponseType::ModerateResponder);
        assert_eq!(ResponseType::from_factor(1.0, &thresholds), ResponseType::FullResponder);
    }

    #[test]
    fn test_cause_families_are_distinct() {
        let causes = [
            CauseOfDeath::Background,
            CauseOfDeath::Hiv,
            CauseOfDeath::AcuteOi(3),
            CauseOfDeath::Tb,
            CauseOfDeath::ArtToxicity,
            CauseOfDeath::Chrm(1),
            CauseOfDeath::RiskFactor(0),
        ];
        for (expected, cause) in causes.iter().enumerate() {
            assert_eq!(cause.family_index(), expected);
        }
    }

    #[test]
    fn test_care_state_in_care() {
        assert!(CareState::InCare.is_in_care());
        assert!(CareState::ReturnedToCare.is_in_care());
        assert!(!CareState::Lost.is_in_care());
    }
}
