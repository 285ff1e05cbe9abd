use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use mccore::algorithm::aggregate::HitAggregator;
use mccore::algorithm::emitter::match_hit;
use mccore::algorithm::resolver::{IndexedResolver, LinearScanResolver, ParticleResolver, ResolverKind};
use mccore::{DepositSource, DepositTable, Hit, HitParticleAssns, TruthParticle};
use crate::data::event::{EventId, SimEvent};
use crate::error::{MatchingError, Result};
use crate::matching::config::MatchingConfig;

/// State needed while matching the hits of a single event.
///
/// A context is built fresh for every event, so neither the per-hit buckets
/// nor the resolver cache can leak from one event into the next.
#[derive(Debug, Default)]
pub struct MatchingContext<R: ParticleResolver> {
    aggregator: HitAggregator,
    resolver: R,
}

impl<R: ParticleResolver + Default> MatchingContext<R> {
    pub fn new() -> Self {
        MatchingContext { aggregator: HitAggregator::new(), resolver: R::default() }
    }
}

impl<R: ParticleResolver> MatchingContext<R> {
    /// Attribute every hit, in collection order, to the particles behind it.
    pub fn match_hits<S: DepositSource>(
        &mut self,
        hits: &[Hit],
        source: &S,
        particles: &[TruthParticle],
    ) -> HitParticleAssns {
        let mut assns = HitParticleAssns::new();
        for (hit_index, hit) in hits.iter().enumerate() {
            let deposits = source.deposits_for(hit_index, hit);
            match_hit(hit_index, &deposits, &mut self.aggregator, &mut self.resolver, particles, &mut assns);
        }
        assns
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

/// Relations produced for one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventMatches {
    pub id: EventId,
    /// Real-data events are skipped and carry no relations.
    pub skipped: bool,
    pub assns: HitParticleAssns,
}

impl EventMatches {
    pub fn skipped(id: EventId) -> Self {
        EventMatches { id, skipped: true, assns: HitParticleAssns::new() }
    }
}

/// Matches reconstructed hits to the simulated truth particles that produced them.
#[derive(Clone, Debug, Default)]
pub struct HitParticleMatcher {
    pub config: MatchingConfig,
}

impl HitParticleMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        HitParticleMatcher { config }
    }

    /// Produce the hit / truth-particle relations of one event.
    ///
    /// # Errors
    ///
    /// A missing particle collection or a missing / inconsistent hit
    /// collection aborts the event.
    pub fn produce(&self, event: &SimEvent) -> Result<EventMatches> {
        if event.is_real_data {
            log::debug!("event {}: real data, skipping", event.id);
            return Ok(EventMatches::skipped(event.id));
        }

        let particle_label = &self.config.particle_label;
        let particles = event.particles(particle_label).ok_or_else(|| {
            log::error!("event {}: truth particle collection {} not found", event.id, particle_label);
            MatchingError::MissingParticles(particle_label.clone())
        })?;

        let hit_label = &self.config.hit_label;
        let (hits, deposits) = match (event.hits(hit_label), event.deposits(hit_label)) {
            (Some(hits), Some(deposits)) if deposits.len() <= hits.len() => (hits, deposits),
            _ => {
                log::error!("event {}: hit collection {} is not valid", event.id, hit_label);
                return Err(MatchingError::InvalidHits(hit_label.clone()));
            }
        };

        let assns = match self.config.resolver {
            ResolverKind::Linear => self.match_event::<LinearScanResolver>(event.id, hits, deposits, particles),
            ResolverKind::Indexed => self.match_event::<IndexedResolver>(event.id, hits, deposits, particles),
        };

        Ok(EventMatches { id: event.id, skipped: false, assns })
    }

    fn match_event<R: ParticleResolver + Default>(
        &self,
        id: EventId,
        hits: &[Hit],
        deposits: &DepositTable,
        particles: &[TruthParticle],
    ) -> HitParticleAssns {
        let mut context = MatchingContext::<R>::new();
        let assns = context.match_hits(hits, deposits, particles);
        log::debug!(
            "event {}: {} hits, {} particles, {} relations, {} track ids resolved",
            id, hits.len(), particles.len(), assns.len(), context.resolver().cached()
        );
        assns
    }

    /// Produce the relations of many events in parallel, keeping input order.
    ///
    /// Every event gets its own context; the first fatal error aborts the run.
    pub fn produce_all(&self, events: &[SimEvent]) -> Result<Vec<EventMatches>> {
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| MatchingError::Config(e.to_string()))?;

        thread_pool.install(|| {
            events.par_iter().map(|event| self.produce(event)).collect()
        })
    }
}
