use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Anything carrying a simulator-assigned track id.
pub trait TrackIdentified {
    fn track_id(&self) -> i32;
}

/// A simulated truth particle as saved by the detector simulation.
///
/// # Description
///
/// `track_id` is issued by the simulator and is neither dense nor ordered;
/// `mother` holds the track id of the parent particle (0 for primaries).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthParticle {
    pub track_id: i32,
    pub pdg_code: i32,
    pub mother: i32,
    pub energy: f64,
    pub process: String,
}

impl TruthParticle {
    pub fn new(track_id: i32, pdg_code: i32, mother: i32, energy: f64, process: String) -> Self {
        TruthParticle { track_id, pdg_code, mother, energy, process }
    }

    /// A primary particle straight from the generator.
    pub fn primary(track_id: i32, pdg_code: i32, energy: f64) -> Self {
        TruthParticle::new(track_id, pdg_code, 0, energy, "primary".to_string())
    }

    pub fn is_primary(&self) -> bool {
        self.process == "primary"
    }
}

impl TrackIdentified for TruthParticle {
    fn track_id(&self) -> i32 {
        self.track_id
    }
}

impl Display for TruthParticle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TruthParticle(track_id: {}, pdg: {}, mother: {}, energy: {:.4}, process: {})",
               self.track_id, self.pdg_code, self.mother, self.energy, self.process)
    }
}
