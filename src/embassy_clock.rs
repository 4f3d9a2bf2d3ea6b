//! [`crate::clock::Clock`] backend built on `embassy_time::Instant`, for
//! bare-metal targets already running an Embassy executor.

use crate::clock::Clock;
use embassy_time::Instant;

pub struct EmbassyClock {
    origin: Instant,
}

impl EmbassyClock {
    pub fn new() -> Self {
        EmbassyClock {
            origin: Instant::now(),
        }
    }
}

impl Default for EmbassyClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros()
    }
}
