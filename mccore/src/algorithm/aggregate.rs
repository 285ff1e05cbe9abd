use std::collections::HashMap;
use crate::data::deposit::Deposit;

/// Summed contribution of one truth particle to one hit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrackAggregate {
    pub energy: f64,
    pub num_electrons: f64,
}

/// Running maximum over cumulative bucket values, remembering its owner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct RunningMax {
    holder: Option<(i32, f64)>,
}

impl RunningMax {
    /// Only a strictly larger value replaces the holder; ties keep the earlier one.
    fn offer(&mut self, track_id: i32, value: f64) {
        match self.holder {
            None => self.holder = Some((track_id, value)),
            Some((_, max)) if value > max => self.holder = Some((track_id, value)),
            _ => {}
        }
    }

    fn track_id(&self) -> Option<i32> {
        self.holder.map(|(id, _)| id)
    }

    fn value(&self) -> Option<f64> {
        self.holder.map(|(_, v)| v)
    }
}

/// Per-hit deposit aggregator.
///
/// # Description
///
/// Buckets deposits by track id, keeping totals over all deposits and the
/// holders of the largest cumulative energy and electron count. The maxima are
/// re-evaluated after every single deposit against the *updated* bucket value,
/// so the result depends on deposit order when cumulative values tie.
///
/// The first deposit always establishes both holders, even when its values
/// are zero or negative; after that only a strictly larger cumulative value
/// takes over. For non-negative deposits this is the same as starting from a
/// maximum of -1.
///
/// The aggregator is meant to be reused across the hits of an event; every
/// call to [`HitAggregator::aggregate`] starts from a cleared state.
#[derive(Clone, Debug, Default)]
pub struct HitAggregator {
    buckets: HashMap<i32, TrackAggregate>,
    total_energy: f64,
    total_electrons: f64,
    max_energy: RunningMax,
    max_electrons: RunningMax,
}

impl HitAggregator {
    pub fn new() -> Self {
        HitAggregator::default()
    }

    /// Drop all per-hit state.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.total_energy = 0.0;
        self.total_electrons = 0.0;
        self.max_energy = RunningMax::default();
        self.max_electrons = RunningMax::default();
    }

    /// Fold one deposit into its bucket, the totals and the running maxima.
    pub fn add(&mut self, deposit: &Deposit) {
        let bucket = self.buckets.entry(deposit.track_id).or_default();

        bucket.energy += deposit.energy;
        self.total_energy += deposit.energy;
        self.max_energy.offer(deposit.track_id, bucket.energy);

        bucket.num_electrons += deposit.num_electrons;
        self.total_electrons += deposit.num_electrons;
        self.max_electrons.offer(deposit.track_id, bucket.num_electrons);
    }

    /// Clear, then scan `deposits` left to right.
    pub fn aggregate(&mut self, deposits: &[Deposit]) -> &Self {
        self.clear();
        for deposit in deposits {
            self.add(deposit);
        }
        self
    }

    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }

    pub fn total_electrons(&self) -> f64 {
        self.total_electrons
    }

    /// Track id holding the largest cumulative energy, `None` without deposits.
    pub fn max_energy_track(&self) -> Option<i32> {
        self.max_energy.track_id()
    }

    /// Track id holding the largest cumulative electron count, `None` without deposits.
    pub fn max_electron_track(&self) -> Option<i32> {
        self.max_electrons.track_id()
    }

    pub fn max_energy(&self) -> Option<f64> {
        self.max_energy.value()
    }

    pub fn max_electrons(&self) -> Option<f64> {
        self.max_electrons.value()
    }

    pub fn get(&self, track_id: i32) -> Option<&TrackAggregate> {
        self.buckets.get(&track_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &TrackAggregate)> + '_ {
        self.buckets.iter().map(|(&id, agg)| (id, agg))
    }

    /// Number of distinct contributing track ids.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
