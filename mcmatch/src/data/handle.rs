use std::collections::BTreeMap;
use std::path::Path;
use rusqlite::{params, Connection, OptionalExtension};
use mccore::{Deposit, DepositTable, Hit, TruthParticle};
use crate::data::event::{EventId, InputTag, SimEvent};
use crate::error::{MatchingError, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS events (
        run INTEGER NOT NULL,
        subrun INTEGER NOT NULL,
        event INTEGER NOT NULL,
        is_real_data INTEGER NOT NULL,
        PRIMARY KEY (run, subrun, event)
    );
    CREATE TABLE IF NOT EXISTS hits (
        run INTEGER NOT NULL,
        subrun INTEGER NOT NULL,
        event INTEGER NOT NULL,
        label TEXT NOT NULL,
        hit_index INTEGER NOT NULL,
        channel INTEGER NOT NULL,
        peak_time REAL NOT NULL,
        integral REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS particles (
        run INTEGER NOT NULL,
        subrun INTEGER NOT NULL,
        event INTEGER NOT NULL,
        label TEXT NOT NULL,
        particle_index INTEGER NOT NULL,
        track_id INTEGER NOT NULL,
        pdg_code INTEGER NOT NULL,
        mother INTEGER NOT NULL,
        energy REAL NOT NULL,
        process TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS deposits (
        run INTEGER NOT NULL,
        subrun INTEGER NOT NULL,
        event INTEGER NOT NULL,
        label TEXT NOT NULL,
        hit_index INTEGER NOT NULL,
        deposit_order INTEGER NOT NULL,
        track_id INTEGER NOT NULL,
        energy REAL NOT NULL,
        num_electrons REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS collections (
        run INTEGER NOT NULL,
        subrun INTEGER NOT NULL,
        event INTEGER NOT NULL,
        label TEXT NOT NULL,
        kind TEXT NOT NULL,
        PRIMARY KEY (run, subrun, event, label, kind)
    );
";

const HITS: &str = "hits";
const PARTICLES: &str = "particles";
const DEPOSITS: &str = "deposits";

/// Simulated events stored in an SQLite database.
#[derive(Debug)]
pub struct EventStoreHandle {
    pub connection: Connection,
}

impl EventStoreHandle {
    pub fn new(path: &Path) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;
        Ok(Self { connection })
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    pub fn create_schema(&self) -> rusqlite::Result<()> {
        self.connection.execute_batch(SCHEMA)
    }

    /// Write one event with all its collections.
    ///
    /// Deposits keep their position within each hit as `deposit_order`.
    pub fn write_event(&self, event: &SimEvent) -> rusqlite::Result<()> {
        let tx = self.connection.unchecked_transaction()?;
        let EventId { run, subrun, event: number } = event.id;

        tx.execute(
            "INSERT INTO events (run, subrun, event, is_real_data) VALUES (?1, ?2, ?3, ?4)",
            params![run, subrun, number, event.is_real_data],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO hits (run, subrun, event, label, hit_index, channel, peak_time, integral)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (tag, hits) in &event.hits {
                for (hit_index, hit) in hits.iter().enumerate() {
                    stmt.execute(params![run, subrun, number, tag.label(), hit_index, hit.channel, hit.peak_time, hit.integral])?;
                }
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO deposits (run, subrun, event, label, hit_index, deposit_order, track_id, energy, num_electrons)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (tag, table) in &event.deposits {
                for (hit_index, deposits) in table.per_hit.iter().enumerate() {
                    for (order, d) in deposits.iter().enumerate() {
                        stmt.execute(params![run, subrun, number, tag.label(), hit_index, order, d.track_id, d.energy, d.num_electrons])?;
                    }
                }
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO particles (run, subrun, event, label, particle_index, track_id, pdg_code, mother, energy, process)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (tag, particles) in &event.particles {
                for (particle_index, p) in particles.iter().enumerate() {
                    stmt.execute(params![run, subrun, number, tag.label(), particle_index, p.track_id, p.pdg_code, p.mother, p.energy, p.process])?;
                }
            }
        }

        {
            // labels are stored on their own so an empty collection stays present
            let mut stmt = tx.prepare(
                "INSERT INTO collections (run, subrun, event, label, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let labels = event.hits.keys().map(|tag| (tag, HITS))
                .chain(event.particles.keys().map(|tag| (tag, PARTICLES)))
                .chain(event.deposits.keys().map(|tag| (tag, DEPOSITS)));
            for (tag, kind) in labels {
                stmt.execute(params![run, subrun, number, tag.label(), kind])?;
            }
        }

        tx.commit()
    }

    pub fn read_event_ids(&self) -> rusqlite::Result<Vec<EventId>> {
        let mut stmt = self.connection.prepare("SELECT run, subrun, event FROM events ORDER BY run, subrun, event")?;
        let ids_iter = stmt.query_map([], |row| {
            Ok(EventId::new(row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut ids = Vec::new();
        for id in ids_iter {
            ids.push(id?);
        }
        Ok(ids)
    }

    pub fn read_event(&self, id: EventId) -> Result<SimEvent> {
        let is_real_data: Option<bool> = self.connection
            .query_row(
                "SELECT is_real_data FROM events WHERE run = ?1 AND subrun = ?2 AND event = ?3",
                params![id.run, id.subrun, id.event],
                |row| row.get(0),
            )
            .optional()?;

        let is_real_data = is_real_data.ok_or_else(|| MatchingError::EventNotFound(id.to_string()))?;

        let mut event = SimEvent::new(id, is_real_data);
        event.hits = self.read_hits(id)?;
        event.deposits = self.read_deposits(id)?;
        event.particles = self.read_particles(id)?;

        for (tag, kind) in self.read_collections(id)? {
            match kind.as_str() {
                HITS => { event.hits.entry(tag).or_default(); }
                PARTICLES => { event.particles.entry(tag).or_default(); }
                DEPOSITS => { event.deposits.entry(tag).or_default(); }
                other => log::warn!("event {}: unknown collection kind {} for {}", id, other, tag),
            }
        }

        // a hit collection without any deposit is still a valid source
        for tag in event.hits.keys() {
            if !event.deposits.contains_key(tag) {
                event.deposits.insert(tag.clone(), DepositTable::default());
            }
        }

        Ok(event)
    }

    pub fn read_events(&self) -> Result<Vec<SimEvent>> {
        let mut events = Vec::new();
        for id in self.read_event_ids()? {
            events.push(self.read_event(id)?);
        }
        Ok(events)
    }

    fn read_collections(&self, id: EventId) -> rusqlite::Result<Vec<(InputTag, String)>> {
        let mut stmt = self.connection.prepare(
            "SELECT label, kind FROM collections WHERE run = ?1 AND subrun = ?2 AND event = ?3",
        )?;
        let labels_iter = stmt.query_map(params![id.run, id.subrun, id.event], |row| {
            let label: String = row.get(0)?;
            Ok((InputTag(label), row.get(1)?))
        })?;
        let mut labels = Vec::new();
        for label in labels_iter {
            labels.push(label?);
        }
        Ok(labels)
    }

    fn read_hits(&self, id: EventId) -> rusqlite::Result<BTreeMap<InputTag, Vec<Hit>>> {
        let mut stmt = self.connection.prepare(
            "SELECT label, channel, peak_time, integral FROM hits
             WHERE run = ?1 AND subrun = ?2 AND event = ?3 ORDER BY label, hit_index",
        )?;
        let hits_iter = stmt.query_map(params![id.run, id.subrun, id.event], |row| {
            let label: String = row.get(0)?;
            Ok((InputTag(label), Hit::new(row.get(1)?, row.get(2)?, row.get(3)?)))
        })?;
        let mut hits: BTreeMap<InputTag, Vec<Hit>> = BTreeMap::new();
        for entry in hits_iter {
            let (tag, hit) = entry?;
            hits.entry(tag).or_default().push(hit);
        }
        Ok(hits)
    }

    fn read_deposits(&self, id: EventId) -> rusqlite::Result<BTreeMap<InputTag, DepositTable>> {
        let mut stmt = self.connection.prepare(
            "SELECT label, hit_index, track_id, energy, num_electrons FROM deposits
             WHERE run = ?1 AND subrun = ?2 AND event = ?3 ORDER BY label, hit_index, deposit_order",
        )?;
        let deposits_iter = stmt.query_map(params![id.run, id.subrun, id.event], |row| {
            let label: String = row.get(0)?;
            let hit_index: usize = row.get(1)?;
            Ok((InputTag(label), hit_index, Deposit::new(row.get(2)?, row.get(3)?, row.get(4)?)))
        })?;
        let mut deposits: BTreeMap<InputTag, DepositTable> = BTreeMap::new();
        for entry in deposits_iter {
            let (tag, hit_index, deposit) = entry?;
            deposits.entry(tag).or_default().push(hit_index, deposit);
        }
        Ok(deposits)
    }

    fn read_particles(&self, id: EventId) -> rusqlite::Result<BTreeMap<InputTag, Vec<TruthParticle>>> {
        let mut stmt = self.connection.prepare(
            "SELECT label, track_id, pdg_code, mother, energy, process FROM particles
             WHERE run = ?1 AND subrun = ?2 AND event = ?3 ORDER BY label, particle_index",
        )?;
        let particles_iter = stmt.query_map(params![id.run, id.subrun, id.event], |row| {
            let label: String = row.get(0)?;
            Ok((
                InputTag(label),
                TruthParticle::new(row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            ))
        })?;
        let mut particles: BTreeMap<InputTag, Vec<TruthParticle>> = BTreeMap::new();
        for entry in particles_iter {
            let (tag, particle) = entry?;
            particles.entry(tag).or_default().push(particle);
        }
        Ok(particles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> EventStoreHandle {
        let handle = EventStoreHandle::in_memory().unwrap();
        handle.create_schema().unwrap();
        handle
    }

    fn event(number: u32) -> SimEvent {
        let mut event = SimEvent::new(EventId::new(7, 1, number), false);
        event.put_hits(
            InputTag::new("gaushit"),
            vec![Hit::new(4, 812.5, 20.25), Hit::new(5, 813.0, 9.5), Hit::new(6, 820.0, 3.0)],
            DepositTable::new(vec![
                vec![Deposit::new(5, 3.0, 10.0), Deposit::new(7, 1.0, 50.0), Deposit::new(5, 4.0, 5.0)],
                vec![],
                vec![Deposit::new(7, 0.25, 900.0)],
            ]),
        );
        event.put_particles(
            InputTag::new("largeant"),
            vec![TruthParticle::primary(7, 2212, 0.94), TruthParticle::new(5, 11, 7, 0.01, "hIoni".to_string())],
        );
        event
    }

    #[test]
    fn test_write_and_read_event() {
        let handle = store();
        let written = event(3);
        handle.write_event(&written).unwrap();

        let read = handle.read_event(EventId::new(7, 1, 3)).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn test_deposit_order_is_preserved() {
        let handle = store();
        handle.write_event(&event(1)).unwrap();
        let read = handle.read_event(EventId::new(7, 1, 1)).unwrap();
        let ids: Vec<i32> = read.deposits(&"gaushit".into()).unwrap().for_hit(0).iter().map(|d| d.track_id).collect();
        assert_eq!(ids, vec![5, 7, 5]);
    }

    #[test]
    fn test_read_events_in_order() {
        let handle = store();
        handle.write_event(&event(9)).unwrap();
        handle.write_event(&event(2)).unwrap();
        let mut real = SimEvent::new(EventId::new(7, 1, 5), true);
        real.put_hits(InputTag::new("gaushit"), vec![Hit::new(1, 1.0, 1.0)], DepositTable::default());
        handle.write_event(&real).unwrap();

        let events = handle.read_events().unwrap();
        let numbers: Vec<u32> = events.iter().map(|e| e.id.event).collect();
        assert_eq!(numbers, vec![2, 5, 9]);
        assert!(events[1].is_real_data);
        assert!(events[1].deposits(&"gaushit".into()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_event() {
        let handle = store();
        assert!(matches!(handle.read_event(EventId::new(1, 1, 1)), Err(MatchingError::EventNotFound(_))));
    }

    #[test]
    fn test_empty_collections_survive_the_store() {
        use crate::matching::producer::HitParticleMatcher;

        let handle = store();
        let mut no_hits = SimEvent::new(EventId::new(7, 1, 1), false);
        no_hits.put_hits(InputTag::new("gaushit"), vec![], DepositTable::default());
        no_hits.put_particles(InputTag::new("largeant"), vec![TruthParticle::primary(1, 13, 1.0)]);
        handle.write_event(&no_hits).unwrap();

        let mut no_particles = SimEvent::new(EventId::new(7, 1, 2), false);
        no_particles.put_hits(
            InputTag::new("gaushit"),
            vec![Hit::new(3, 10.0, 1.0)],
            DepositTable::new(vec![vec![Deposit::new(1, 1.0, 1.0)]]),
        );
        no_particles.put_particles(InputTag::new("largeant"), vec![]);
        handle.write_event(&no_particles).unwrap();

        let events = handle.read_events().unwrap();
        assert_eq!(events, vec![no_hits, no_particles]);
        assert_eq!(events[0].hits(&"gaushit".into()).map(|h| h.len()), Some(0));
        assert_eq!(events[1].particles(&"largeant".into()).map(|p| p.len()), Some(0));

        let matches = HitParticleMatcher::default().produce_all(&events).unwrap();
        assert!(matches.iter().all(|m| !m.skipped && m.assns.is_empty()));
    }
}
