use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use serde::{Deserialize, Deserializer, Serialize};
use mccore::{HitMatchingData, TruthParticle};
use crate::data::event::{EventId, InputTag, SimEvent};
use crate::error::{MatchingError, Result};
use crate::matching::producer::EventMatches;

/// JSON has no NaN and writes non-finite fractions as `null`; read them back as NaN.
fn fraction<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    if deserializer.is_human_readable() {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    } else {
        f64::deserialize(deserializer)
    }
}

/// Flattened hit / truth-particle relation, one per output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub run: u32,
    pub subrun: u32,
    pub event: u32,
    pub hit_index: usize,
    pub particle_index: usize,
    pub track_id: i32,

    #[serde(deserialize_with = "fraction")]
    pub energy_fraction: f64,
    #[serde(deserialize_with = "fraction")]
    pub electron_fraction: f64,
    pub is_max_energy: bool,
    pub is_max_electrons: bool,
    pub energy: f64,
    pub num_electrons: f64,
}

impl MatchRow {
    pub fn event_id(&self) -> EventId {
        EventId::new(self.run, self.subrun, self.event)
    }

    pub fn data(&self) -> HitMatchingData {
        HitMatchingData {
            energy_fraction: self.energy_fraction,
            electron_fraction: self.electron_fraction,
            is_max_energy: self.is_max_energy,
            is_max_electrons: self.is_max_electrons,
            energy: self.energy,
            num_electrons: self.num_electrons,
        }
    }
}

/// Flatten the relations of one event, resolving particle positions back to track ids.
///
/// `particles` must be the collection the relations were produced against.
pub fn to_rows(matches: &EventMatches, particles: &[TruthParticle]) -> Vec<MatchRow> {
    let EventId { run, subrun, event } = matches.id;
    matches.assns.iter().filter_map(|m| {
        let particle = match particles.get(m.particle_index) {
            Some(particle) => particle,
            None => {
                log::warn!(
                    "event {}: relation for hit {} points past the {} truth particles, dropped",
                    matches.id, m.hit_index, particles.len()
                );
                return None;
            }
        };
        let d = &m.data;
        Some(MatchRow {
            run,
            subrun,
            event,
            hit_index: m.hit_index,
            particle_index: m.particle_index,
            track_id: particle.track_id,
            energy_fraction: d.energy_fraction,
            electron_fraction: d.electron_fraction,
            is_max_energy: d.is_max_energy,
            is_max_electrons: d.is_max_electrons,
            energy: d.energy,
            num_electrons: d.num_electrons,
        })
    }).collect()
}

/// Flatten the relations of many events; `matches` and `events` must line up.
///
/// # Errors
///
/// An event with relations but without the particle collection they were
/// produced against yields [`MatchingError::MissingParticles`].
pub fn collect_rows(matches: &[EventMatches], events: &[SimEvent], particle_label: &InputTag) -> Result<Vec<MatchRow>> {
    let mut rows = Vec::new();
    for (m, e) in matches.iter().zip(events.iter()) {
        if m.skipped || m.assns.is_empty() {
            continue;
        }
        let particles = e.particles(particle_label).ok_or_else(|| {
            log::error!("event {}: truth particle collection {} not found", e.id, particle_label);
            MatchingError::MissingParticles(particle_label.clone())
        })?;
        rows.extend(to_rows(m, particles));
    }
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatchFile {
    rows: Vec<MatchRow>,
}

pub fn save_json(path: &Path, rows: &[MatchRow]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Vec<MatchRow>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read a JSON array of events, e.g. as exported by a simulation job.
pub fn load_events_json(path: &Path) -> Result<Vec<SimEvent>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

// --- Bincode + optional zstd compression ---
pub fn save_bincode(path: &Path, rows: &[MatchRow], compress: bool) -> Result<()> {
    let f = File::create(path)?;
    let file = MatchFile { rows: rows.to_vec() };
    if compress {
        let mut zw = zstd::Encoder::new(f, 3)?;
        bincode::serialize_into(&mut zw, &file)?;
        zw.finish()?;
    } else {
        let mut bw = BufWriter::new(f);
        bincode::serialize_into(&mut bw, &file)?;
        bw.flush()?;
    }
    Ok(())
}

pub fn load_bincode(path: &Path) -> Result<Vec<MatchRow>> {
    // Try zstd first, then plain bincode
    let f = BufReader::new(File::open(path)?);
    if let Ok(mut zr) = zstd::Decoder::new(f) {
        if let Ok(file) = bincode::deserialize_from::<_, MatchFile>(&mut zr) {
            return Ok(file.rows);
        }
    }
    let f = BufReader::new(File::open(path)?);
    let file: MatchFile = bincode::deserialize_from(f)?;
    Ok(file.rows)
}
