use serde::{Deserialize, Serialize};
use crate::data::hit::Hit;

/// A single energy deposit contributed by one truth particle to one hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub track_id: i32,
    pub energy: f64,
    pub num_electrons: f64,
}

impl Deposit {
    pub fn new(track_id: i32, energy: f64, num_electrons: f64) -> Self {
        Deposit { track_id, energy, num_electrons }
    }
}

/// Produces the ordered deposit records behind a hit.
///
/// The order of the returned deposits matters: the max-holder tie-break of the
/// aggregator is positional, so implementations must return a stable order.
pub trait DepositSource {
    fn deposits_for(&self, hit_index: usize, hit: &Hit) -> Vec<Deposit>;
}

/// In-memory deposit source holding one ordered deposit list per hit position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositTable {
    pub per_hit: Vec<Vec<Deposit>>,
}

impl DepositTable {
    pub fn new(per_hit: Vec<Vec<Deposit>>) -> Self {
        DepositTable { per_hit }
    }

    /// Number of hit positions covered by the table.
    pub fn len(&self) -> usize {
        self.per_hit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_hit.is_empty()
    }

    /// Append a deposit to the list of the given hit, growing the table as needed.
    pub fn push(&mut self, hit_index: usize, deposit: Deposit) {
        if self.per_hit.len() <= hit_index {
            self.per_hit.resize_with(hit_index + 1, Vec::new);
        }
        self.per_hit[hit_index].push(deposit);
    }

    pub fn for_hit(&self, hit_index: usize) -> &[Deposit] {
        self.per_hit.get(hit_index).map(|d| d.as_slice()).unwrap_or(&[])
    }
}

impl DepositSource for DepositTable {
    fn deposits_for(&self, hit_index: usize, _hit: &Hit) -> Vec<Deposit> {
        self.for_hit(hit_index).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_grows_table() {
        let mut table = DepositTable::default();
        table.push(2, Deposit::new(5, 1.0, 10.0));
        assert_eq!(table.len(), 3);
        assert!(table.for_hit(0).is_empty());
        assert_eq!(table.for_hit(2), &[Deposit::new(5, 1.0, 10.0)]);
    }

    #[test]
    fn test_missing_hit_yields_no_deposits() {
        let table = DepositTable::new(vec![vec![Deposit::new(1, 0.5, 3.0)]]);
        let hit = Hit::new(0, 0.0, 0.0);
        assert!(table.deposits_for(7, &hit).is_empty());
        assert_eq!(table.deposits_for(0, &hit).len(), 1);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut table = DepositTable::default();
        table.push(0, Deposit::new(5, 3.0, 10.0));
        table.push(0, Deposit::new(7, 1.0, 50.0));
        table.push(0, Deposit::new(5, 4.0, 5.0));
        let ids: Vec<i32> = table.for_hit(0).iter().map(|d| d.track_id).collect();
        assert_eq!(ids, vec![5, 7, 5]);
    }
}
