use itertools::Itertools;
use crate::algorithm::aggregate::{HitAggregator, TrackAggregate};
use crate::algorithm::resolver::ParticleResolver;
use crate::data::deposit::Deposit;
use crate::data::matching::{HitMatchingData, HitParticleAssns};
use crate::data::particle::TrackIdentified;

/// Compute the relation metadata of one aggregated track.
///
/// The fractions divide by the hit totals without guarding against zero, so a
/// hit whose deposits sum to zero produces NaN fractions.
pub fn match_data(track_id: i32, aggregate: &TrackAggregate, aggregator: &HitAggregator) -> HitMatchingData {
    HitMatchingData {
        energy_fraction: aggregate.energy / aggregator.total_energy(),
        electron_fraction: aggregate.num_electrons / aggregator.total_electrons(),
        is_max_energy: aggregator.max_energy_track() == Some(track_id),
        is_max_electrons: aggregator.max_electron_track() == Some(track_id),
        energy: aggregate.energy,
        num_electrons: aggregate.num_electrons,
    }
}

/// Emit one relation per aggregated track that resolves to a truth particle.
///
/// Tracks are visited in ascending track id order; unresolvable tracks are
/// skipped. Returns the number of relations appended to `out`.
pub fn emit_hit_matches<R, P>(
    hit_index: usize,
    aggregator: &HitAggregator,
    resolver: &mut R,
    particles: &[P],
    out: &mut HitParticleAssns,
) -> usize
where
    R: ParticleResolver,
    P: TrackIdentified,
{
    let mut emitted = 0;

    for (track_id, aggregate) in aggregator.iter().sorted_by_key(|(id, _)| *id) {
        let particle_index = match resolver.resolve(track_id, particles) {
            Some(index) => index,
            None => continue,
        };
        out.add_single(hit_index, particle_index, match_data(track_id, aggregate, aggregator));
        emitted += 1;
    }

    emitted
}

/// Aggregate the deposits of one hit and emit its relations.
pub fn match_hit<R, P>(
    hit_index: usize,
    deposits: &[Deposit],
    aggregator: &mut HitAggregator,
    resolver: &mut R,
    particles: &[P],
    out: &mut HitParticleAssns,
) -> usize
where
    R: ParticleResolver,
    P: TrackIdentified,
{
    aggregator.aggregate(deposits);
    emit_hit_matches(hit_index, aggregator, resolver, particles, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::resolver::{IndexedResolver, LinearScanResolver};
    use crate::data::matching::HitParticleMatch;
    use crate::data::particle::TruthParticle;

    const TOLERANCE: f64 = 1e-4;

    fn particles(ids: &[i32]) -> Vec<TruthParticle> {
        ids.iter().map(|&id| TruthParticle::primary(id, 13, 1.0)).collect()
    }

    fn run(deposits: &[Deposit], collection: &[TruthParticle]) -> HitParticleAssns {
        let mut aggregator = HitAggregator::new();
        let mut resolver = LinearScanResolver::new();
        let mut out = HitParticleAssns::new();
        match_hit(0, deposits, &mut aggregator, &mut resolver, collection, &mut out);
        out
    }

    fn find(out: &HitParticleAssns, particle_index: usize) -> &HitParticleMatch {
        out.iter().find(|m| m.particle_index == particle_index).expect("relation missing")
    }

    #[test]
    fn test_reference_hit() {
        let deposits = vec![
            Deposit::new(5, 3.0, 10.0),
            Deposit::new(7, 1.0, 50.0),
            Deposit::new(5, 4.0, 5.0),
        ];
        let out = run(&deposits, &particles(&[5, 7]));
        assert_eq!(out.len(), 2);

        let m5 = find(&out, 0);
        assert_eq!(m5.hit_index, 0);
        assert!((m5.data.energy_fraction - 0.875).abs() < TOLERANCE);
        assert!((m5.data.electron_fraction - 0.2308).abs() < TOLERANCE);
        assert!(m5.data.is_max_energy);
        assert!(!m5.data.is_max_electrons);
        assert_eq!(m5.data.energy, 7.0);
        assert_eq!(m5.data.num_electrons, 15.0);

        let m7 = find(&out, 1);
        assert!((m7.data.energy_fraction - 0.125).abs() < TOLERANCE);
        assert!((m7.data.electron_fraction - 0.7692).abs() < TOLERANCE);
        assert!(!m7.data.is_max_energy);
        assert!(m7.data.is_max_electrons);
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let deposits = vec![
            Deposit::new(1, 0.3, 120.0),
            Deposit::new(2, 1.7, 40.0),
            Deposit::new(3, 0.05, 7.0),
            Deposit::new(1, 0.9, 300.0),
            Deposit::new(4, 2.2, 11.0),
        ];
        let out = run(&deposits, &particles(&[4, 3, 2, 1]));
        assert_eq!(out.len(), 4);

        let energy_sum: f64 = out.iter().map(|m| m.data.energy_fraction).sum();
        let electron_sum: f64 = out.iter().map(|m| m.data.electron_fraction).sum();
        assert!((energy_sum - 1.0).abs() < 1e-9);
        assert!((electron_sum - 1.0).abs() < 1e-9);
        assert_eq!(out.iter().filter(|m| m.data.is_max_energy).count(), 1);
        assert_eq!(out.iter().filter(|m| m.data.is_max_electrons).count(), 1);
    }

    #[test]
    fn test_unresolvable_track_is_dropped() {
        let deposits = vec![Deposit::new(5, 1.0, 1.0), Deposit::new(42, 3.0, 3.0)];
        let out = run(&deposits, &particles(&[5]));
        assert_eq!(out.len(), 1);

        let m = find(&out, 0);
        // fractions still refer to the full hit totals
        assert!((m.data.energy_fraction - 0.25).abs() < TOLERANCE);
        // the maximum belongs to the dropped track, so no relation carries it
        assert!(!m.data.is_max_energy);
        assert!(!m.data.is_max_electrons);
    }

    #[test]
    fn test_empty_hit_emits_nothing() {
        let out = run(&[], &particles(&[1, 2]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_tied_maximum_flags_first_holder_only() {
        let deposits = vec![Deposit::new(8, 2.0, 2.0), Deposit::new(6, 2.0, 2.0)];
        let out = run(&deposits, &particles(&[6, 8]));
        let flagged: Vec<usize> = out.iter().filter(|m| m.data.is_max_energy).map(|m| m.particle_index).collect();
        assert_eq!(flagged, vec![1]);
    }

    #[test]
    fn test_zero_totals_give_non_finite_fractions() {
        let out = run(&[Deposit::new(1, 0.0, 0.0)], &particles(&[1]));
        assert_eq!(out.len(), 1);
        let m = find(&out, 0);
        assert!(m.data.energy_fraction.is_nan());
        assert!(m.data.electron_fraction.is_nan());
        assert!(!m.data.has_finite_fractions());
        assert!(m.data.is_max_energy);
    }

    #[test]
    fn test_resolvers_agree_on_output() {
        let deposits = vec![
            Deposit::new(10, 1.0, 5.0),
            Deposit::new(11, 2.0, 1.0),
            Deposit::new(12, 0.5, 9.0),
        ];
        let collection = particles(&[11, 12, 10, 11]);

        let mut aggregator = HitAggregator::new();
        let mut linear = LinearScanResolver::new();
        let mut indexed = IndexedResolver::new();
        let mut a = HitParticleAssns::new();
        let mut b = HitParticleAssns::new();
        match_hit(3, &deposits, &mut aggregator, &mut linear, &collection, &mut a);
        match_hit(3, &deposits, &mut aggregator, &mut indexed, &collection, &mut b);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let deposits = vec![Deposit::new(2, 1.5, 3.0), Deposit::new(9, 0.5, 6.0)];
        let collection = particles(&[9, 2]);
        assert_eq!(run(&deposits, &collection), run(&deposits, &collection));
    }
}
