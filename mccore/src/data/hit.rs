use serde::{Deserialize, Serialize};

/// A reconstructed detector hit.
///
/// The matching algorithms never look inside a hit; its identity is the
/// position it holds in the ordered hit collection of an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub channel: u32,
    pub peak_time: f32,
    pub integral: f32,
}

impl Hit {
    pub fn new(channel: u32, peak_time: f32, integral: f32) -> Self {
        Hit { channel, peak_time, integral }
    }
}
