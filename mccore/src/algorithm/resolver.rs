use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use crate::data::particle::TrackIdentified;

/// Maps a simulator track id to the position of its truth particle.
///
/// Implementations keep event-scoped state; call [`ParticleResolver::reset`]
/// (or build a fresh resolver) before switching to another particle collection.
pub trait ParticleResolver {
    /// Position of the first particle in `particles` whose track id equals
    /// `track_id`, or `None` if no such particle exists.
    fn resolve<P: TrackIdentified>(&mut self, track_id: i32, particles: &[P]) -> Option<usize>;

    /// Forget everything learned about the current particle collection.
    fn reset(&mut self);

    /// Number of track ids currently known, resolvable or not.
    fn cached(&self) -> usize;
}

/// Memoized linear scan.
///
/// # Description
///
/// A cache miss scans the particle collection front to back and remembers the
/// outcome, including the absence of a match, so every distinct id costs at
/// most one scan per event.
#[derive(Clone, Debug, Default)]
pub struct LinearScanResolver {
    lookup: HashMap<i32, Option<usize>>,
}

impl LinearScanResolver {
    pub fn new() -> Self {
        LinearScanResolver::default()
    }
}

impl ParticleResolver for LinearScanResolver {
    fn resolve<P: TrackIdentified>(&mut self, track_id: i32, particles: &[P]) -> Option<usize> {
        *self.lookup.entry(track_id).or_insert_with(|| {
            let found = particles.iter().position(|p| p.track_id() == track_id);
            if found.is_none() {
                log::trace!("track id {} has no saved truth particle", track_id);
            }
            found
        })
    }

    fn reset(&mut self) {
        self.lookup.clear();
    }

    fn cached(&self) -> usize {
        self.lookup.len()
    }
}

/// Precomputed track id table, built in one pass on first use.
///
/// Gives the same answers as [`LinearScanResolver`]: with duplicated track ids
/// the first particle wins.
#[derive(Clone, Debug, Default)]
pub struct IndexedResolver {
    table: Option<HashMap<i32, usize>>,
}

impl IndexedResolver {
    pub fn new() -> Self {
        IndexedResolver::default()
    }

    fn build<P: TrackIdentified>(particles: &[P]) -> HashMap<i32, usize> {
        let mut table = HashMap::with_capacity(particles.len());
        for (index, particle) in particles.iter().enumerate() {
            table.entry(particle.track_id()).or_insert(index);
        }
        table
    }
}

impl ParticleResolver for IndexedResolver {
    fn resolve<P: TrackIdentified>(&mut self, track_id: i32, particles: &[P]) -> Option<usize> {
        self.table
            .get_or_insert_with(|| IndexedResolver::build(particles))
            .get(&track_id)
            .copied()
    }

    fn reset(&mut self) {
        self.table = None;
    }

    fn cached(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.len())
    }
}

/// Selects the resolution strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Linear,
    Indexed,
}

impl Display for ResolverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverKind::Linear => write!(f, "linear"),
            ResolverKind::Indexed => write!(f, "indexed"),
        }
    }
}

impl std::str::FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(ResolverKind::Linear),
            "indexed" => Ok(ResolverKind::Indexed),
            other => Err(format!("unknown resolver kind: {}", other)),
        }
    }
}
