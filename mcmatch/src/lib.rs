// src/lib.rs
pub mod error;

pub mod data {
    pub mod event;
    pub mod handle;
    pub mod io;
}

pub mod matching {
    pub mod config;
    pub mod producer;
}

pub use error::{MatchingError, Result};
