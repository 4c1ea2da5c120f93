//! Per-patient deterministic random streams.
//!
//! Every draw names its site with a [`DrawId`]. A [`PatientStream`] keeps one
//! ChaCha generator per stream tag, seeded from the run seed, the patient id
//! and the tag, so a draw depends only on those three values and on how many
//! draws that site has already made for the patient. The order in which
//! other sub-models draw, or which thread runs the patient, never matters.

pub mod draw_ids;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rustc_hash::FxHashMap;

pub use draw_ids::{DrawId, TestStage};

/// Source of uniform and Gaussian draws keyed by draw site
pub trait RandomStream {
    /// Uniform draw in `[0, 1)`
    fn uniform(&mut self, id: DrawId) -> f64;

    /// Gaussian draw with the given mean and standard deviation
    fn gaussian(&mut self, mean: f64, sd: f64, id: DrawId) -> f64;

    /// Bernoulli trial: true when a uniform draw falls below `prob`
    fn chance(&mut self, prob: f64, id: DrawId) -> bool {
        self.uniform(id) < prob
    }
}

/// Mix three words into a 64-bit seed (splitmix64 finalizer)
const fn mix_seed(run_seed: u64, patient_id: u64, tag: u32) -> u64 {
    let mut z = run_seed
        ^ patient_id.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (tag as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Random stream for one patient
#[derive(Debug, Clone)]
pub struct PatientStream {
    run_seed: u64,
    patient_id: u64,
    streams: FxHashMap<u32, ChaCha8Rng>,
}

impl PatientStream {
    #[must_use]
    pub fn new(run_seed: u64, patient_id: u64) -> Self {
        Self {
            run_seed,
            patient_id,
            streams: FxHashMap::default(),
        }
    }

    #[must_use]
    pub const fn patient_id(&self) -> u64 {
        self.patient_id
    }

    fn rng(&mut self, id: DrawId) -> &mut ChaCha8Rng {
        let tag = id.tag();
        let (run_seed, patient_id) = (self.run_seed, self.patient_id);
        self.streams
            .entry(tag)
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(mix_seed(run_seed, patient_id, tag)))
    }
}

impl RandomStream for PatientStream {
    fn uniform(&mut self, id: DrawId) -> f64 {
        self.rng(id).random::<f64>()
    }

    fn gaussian(&mut self, mean: f64, sd: f64, id: DrawId) -> f64 {
        let z: f64 = self.rng(id).sample(StandardNormal);
        mean + sd * z
    }
}

/// A stream returning fixed values, for scenario tests and calibration runs.
///
/// Uniform draws return the scripted value for the tag if one is queued,
/// otherwise `default_uniform`. Gaussian draws return the mean plus `sd`
/// times the queued standard score (zero when none is queued).
#[derive(Debug, Clone, Default)]
pub struct ScriptedStream {
    pub default_uniform: f64,
    uniforms: FxHashMap<u32, Vec<f64>>,
    scores: FxHashMap<u32, Vec<f64>>,
    draws: usize,
}

impl ScriptedStream {
    #[must_use]
    pub fn new(default_uniform: f64) -> Self {
        Self {
            default_uniform,
            ..Self::default()
        }
    }

    /// Queue uniform values for a draw site, returned in order
    #[must_use]
    pub fn with_uniforms(mut self, id: DrawId, values: &[f64]) -> Self {
        let queue = self.uniforms.entry(id.tag()).or_default();
        queue.extend(values.iter().rev());
        self
    }

    /// Queue standard scores for a Gaussian draw site, returned in order
    #[must_use]
    pub fn with_scores(mut self, id: DrawId, scores: &[f64]) -> Self {
        let queue = self.scores.entry(id.tag()).or_default();
        queue.extend(scores.iter().rev());
        self
    }

    /// Total draws served so far
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomStream for ScriptedStream {
    fn uniform(&mut self, id: DrawId) -> f64 {
        self.draws += 1;
        self.uniforms
            .get_mut(&id.tag())
            .and_then(Vec::pop)
            .unwrap_or(self.default_uniform)
    }

    fn gaussian(&mut self, mean: f64, sd: f64, id: DrawId) -> f64 {
        self.draws += 1;
        let z = self.scores.get_mut(&id.tag()).and_then(Vec::pop).unwrap_or(0.0);
        mean + sd * z
    }
}
