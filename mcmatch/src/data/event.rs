use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use mccore::{DepositTable, Hit, TruthParticle};

/// Label naming one collection inside an event, e.g. `gaushit` or `largeant`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputTag(pub String);

impl InputTag {
    pub fn new(label: &str) -> Self {
        InputTag(label.to_string())
    }

    pub fn label(&self) -> &str {
        &self.0
    }
}

impl Display for InputTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl From<&str> for InputTag {
    fn from(label: &str) -> Self {
        InputTag::new(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub run: u32,
    pub subrun: u32,
    pub event: u32,
}

impl EventId {
    pub fn new(run: u32, subrun: u32, event: u32) -> Self {
        EventId { run, subrun, event }
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.subrun, self.event)
    }
}

/// One simulated (or real) detector event with its labelled collections.
///
/// Deposits are stored per hit label: the table under a hit label holds the
/// ordered deposits behind each hit of that collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub id: EventId,
    pub is_real_data: bool,
    pub hits: BTreeMap<InputTag, Vec<Hit>>,
    pub particles: BTreeMap<InputTag, Vec<TruthParticle>>,
    pub deposits: BTreeMap<InputTag, DepositTable>,
}

impl Default for EventId {
    fn default() -> Self {
        EventId::new(1, 0, 1)
    }
}

impl SimEvent {
    pub fn new(id: EventId, is_real_data: bool) -> Self {
        SimEvent { id, is_real_data, ..Default::default() }
    }

    pub fn hits(&self, tag: &InputTag) -> Option<&[Hit]> {
        self.hits.get(tag).map(|h| h.as_slice())
    }

    pub fn particles(&self, tag: &InputTag) -> Option<&[TruthParticle]> {
        self.particles.get(tag).map(|p| p.as_slice())
    }

    pub fn deposits(&self, tag: &InputTag) -> Option<&DepositTable> {
        self.deposits.get(tag)
    }

    /// Store a hit collection together with the deposits behind each hit.
    pub fn put_hits(&mut self, tag: InputTag, hits: Vec<Hit>, deposits: DepositTable) {
        self.deposits.insert(tag.clone(), deposits);
        self.hits.insert(tag, hits);
    }

    pub fn put_particles(&mut self, tag: InputTag, particles: Vec<TruthParticle>) {
        self.particles.insert(tag, particles);
    }
}
