//! Pinned stream tags for every random draw site.
//!
//! Each draw site owns a tag; a patient's stream for a tag depends only on
//! the run seed, the patient id and the tag. The numeric values are part of
//! the reproducibility contract and must never be renumbered.

use crate::patient::TestKind;

/// Stage of a diagnostic test chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStage {
    Offer,
    Accept,
    ResultReturn,
    Result,
    ConfirmAccept,
    ConfirmResultReturn,
    ConfirmResult,
    Link,
}

impl TestStage {
    const fn offset(self) -> u32 {
        match self {
            Self::Offer => 10,
            Self::Accept => 20,
            Self::ResultReturn => 30,
            Self::Result => 40,
            Self::ConfirmAccept => 50,
            Self::ConfirmResultReturn => 60,
            Self::ConfirmResult => 70,
            Self::Link => 80,
        }
    }
}

/// Identifier of a random draw site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawId {
    // Patient initialization
    InitAge,
    InitGender,
    InitRiskCategory,
    InitRiskFactor,
    InitPropensity,
    InitHivState,
    InitCd4,
    InitSetpointHvl,
    InitAcuteHvl,
    InitDetected,
    InitLinked,
    InitChrm,
    InitTbLatent,
    InitTbStrain,

    // Pediatric and maternal
    PedsBreastfeeding,
    PedsBreastfeedingStopAge,
    PedsMotherPositive,
    PedsMaternalStatusKnown,
    PedsMaternalArt,
    PedsMaternalHvl,
    PedsPerinatalTransmission,
    PedsInitialCd4Perc,
    PedsSetpointHvl,
    PedsInfantProph,
    PedsMaternalIncidence,
    PedsPostpartumTransmission,
    PedsMaternalArtDropout,
    PedsTransitionCd4,

    // Incident infection and PrEP
    HivInfection,
    InfectionAcuteHvl,
    InfectionSetpointHvl,
    InfectionCd4,
    ChronicSetpointHvl,
    ChronicCd4Shift,
    PrepUptake,
    PrepDropout,

    // CD4 and HVL trajectories
    HvlChange,
    PatientCd4DeclinePerc,
    NatHistCd4Slope,
    RegimenCd4Slope,
    ArtCd4Noise,

    // Drug efficacy
    LateFailure,
    Resuppression,
    ArtToxicity,
    ProphResistance,
    ProphToxicity,
    InitialSuppression,

    // Acute OIs
    OiIncidence,
    OiDetection,
    OiReturnToCare,

    // TB disease
    TbInfection,
    TbStrain,
    TbReactivation,
    TbPulmonary,
    TbRelapse,
    TbSelfCure,
    TbSymptoms,

    // TB clinical
    TbTreatmentDefault,
    TbCure,
    TbProphStart,

    /// A stage of one of the diagnostic test chains
    TestChain(TestKind, TestStage),
    LinkAfterDetection,

    // HVL tests
    HvlObservationError,

    // Clinic
    LossToFollowUp,
    ReturnToCare,
    Cd4TestError,
    Cd4PercTestError,

    // Comorbidities
    ChrmIncidence,

    // Mortality
    Death,
    CauseOfDeath,
}

impl DrawId {
    /// The pinned numeric stream tag
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::InitAge => 13010,
            Self::InitGender => 13020,
            Self::InitRiskCategory => 13030,
            Self::InitRiskFactor => 13040,
            Self::InitPropensity => 13050,
            Self::InitHivState => 13060,
            Self::InitCd4 => 13070,
            Self::InitSetpointHvl => 13080,
            Self::InitAcuteHvl => 13090,
            Self::InitDetected => 13100,
            Self::InitLinked => 13110,
            Self::InitChrm => 13120,
            Self::InitTbLatent => 13130,
            Self::InitTbStrain => 13140,

            Self::PedsBreastfeeding => 14010,
            Self::PedsBreastfeedingStopAge => 14020,
            Self::PedsMotherPositive => 14030,
            Self::PedsMaternalStatusKnown => 14040,
            Self::PedsMaternalArt => 14050,
            Self::PedsMaternalHvl => 14060,
            Self::PedsPerinatalTransmission => 14070,
            Self::PedsInitialCd4Perc => 14080,
            Self::PedsSetpointHvl => 14090,
            Self::PedsInfantProph => 14100,
            Self::PedsMaternalIncidence => 14110,
            Self::PedsPostpartumTransmission => 14120,
            Self::PedsMaternalArtDropout => 14130,
            Self::PedsTransitionCd4 => 14140,

            Self::HivInfection => 15010,
            Self::InfectionAcuteHvl => 15020,
            Self::InfectionSetpointHvl => 15030,
            Self::InfectionCd4 => 15040,
            Self::ChronicSetpointHvl => 15050,
            Self::ChronicCd4Shift => 15060,
            Self::PrepUptake => 15070,
            Self::PrepDropout => 15080,

            Self::HvlChange => 20010,
            Self::PatientCd4DeclinePerc => 20020,
            Self::NatHistCd4Slope => 20030,
            Self::RegimenCd4Slope => 20040,
            Self::ArtCd4Noise => 20050,

            Self::LateFailure => 30010,
            Self::Resuppression => 30020,
            Self::ArtToxicity => 30030,
            Self::ProphResistance => 30040,
            Self::ProphToxicity => 30050,
            Self::InitialSuppression => 30060,

            Self::OiIncidence => 40010,
            Self::OiDetection => 40020,
            Self::OiReturnToCare => 40030,

            Self::TbInfection => 50010,
            Self::TbStrain => 50020,
            Self::TbReactivation => 50030,
            Self::TbPulmonary => 50040,
            Self::TbRelapse => 50050,
            Self::TbSelfCure => 50060,
            Self::TbSymptoms => 50070,

            Self::TbTreatmentDefault => 55010,
            Self::TbCure => 55020,
            Self::TbProphStart => 55030,

            Self::TestChain(kind, stage) => {
                let base = match kind {
                    TestKind::RoutineHiv => 60000,
                    TestKind::EarlyInfantDiagnosis => 65000,
                    TestKind::Tb => 56000,
                };
                base + stage.offset()
            }
            Self::LinkAfterDetection => 60110,

            Self::HvlObservationError => 70010,

            Self::LossToFollowUp => 80010,
            Self::ReturnToCare => 80020,
            Self::Cd4TestError => 80030,
            Self::Cd4PercTestError => 80040,

            Self::ChrmIncidence => 90010,

            Self::Death => 100010,
            Self::CauseOfDeath => 100020,
        }
    }
}
