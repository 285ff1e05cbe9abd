// data module
pub mod data {
    pub mod hit;
    pub mod particle;
    pub mod deposit;
    pub mod matching;
}

// algorithm module
pub mod algorithm {
    pub mod aggregate;
    pub mod resolver;
    pub mod emitter;
}

pub use data::hit::Hit;
pub use data::particle::{TrackIdentified, TruthParticle};
pub use data::deposit::{Deposit, DepositSource, DepositTable};
pub use data::matching::{HitMatchingData, HitParticleAssns, HitParticleMatch};
