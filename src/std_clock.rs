//! [`crate::clock::Clock`] backend built on `std::time::Instant`, for
//! hosted targets (ESP-IDF via `esp-idf-svc`, Linux BLE HCI bridges,
//! or plain desktop testing).

use crate::clock::Clock;
use std::time::Instant;

pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        StdClock {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_us_is_monotonic() {
        let clock = StdClock::new();
        let a = clock.now_us();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let b = clock.now_us();
        assert!(b > a);
    }
}
