use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Metadata attached to a hit / truth-particle relation.
///
/// # Description
///
/// Fractions are shares of the hit's total deposited energy and ionization
/// electrons. A hit whose deposits carry zero total energy (or zero electrons)
/// yields non-finite fractions; see [`HitMatchingData::has_finite_fractions`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitMatchingData {
    pub energy_fraction: f64,
    pub electron_fraction: f64,
    pub is_max_energy: bool,
    pub is_max_electrons: bool,
    pub energy: f64,
    pub num_electrons: f64,
}

impl HitMatchingData {
    pub fn has_finite_fractions(&self) -> bool {
        self.energy_fraction.is_finite() && self.electron_fraction.is_finite()
    }
}

/// One emitted relation: hit position, truth-particle position, metadata.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitParticleMatch {
    pub hit_index: usize,
    pub particle_index: usize,
    pub data: HitMatchingData,
}

impl Display for HitParticleMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HitParticleMatch(hit: {}, particle: {}, energy_fraction: {:.4}, electron_fraction: {:.4}, max_e: {}, max_n: {})",
               self.hit_index, self.particle_index, self.data.energy_fraction,
               self.data.electron_fraction, self.data.is_max_energy, self.data.is_max_electrons)
    }
}

/// Append-only collection of hit / truth-particle relations for one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HitParticleAssns {
    matches: Vec<HitParticleMatch>,
}

impl HitParticleAssns {
    pub fn new() -> Self {
        HitParticleAssns { matches: Vec::new() }
    }

    pub fn add_single(&mut self, hit_index: usize, particle_index: usize, data: HitMatchingData) {
        self.matches.push(HitParticleMatch { hit_index, particle_index, data });
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitParticleMatch> {
        self.matches.iter()
    }

    /// All relations recorded for the hit at `hit_index`.
    pub fn for_hit(&self, hit_index: usize) -> impl Iterator<Item = &HitParticleMatch> + '_ {
        self.matches.iter().filter(move |m| m.hit_index == hit_index)
    }

    pub fn into_inner(self) -> Vec<HitParticleMatch> {
        self.matches
    }
}

impl<'a> IntoIterator for &'a HitParticleAssns {
    type Item = &'a HitParticleMatch;
    type IntoIter = std::slice::Iter<'a, HitParticleMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}
