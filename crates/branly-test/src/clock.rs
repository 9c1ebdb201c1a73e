//! Virtual time for node simulations

use std::time::Duration;

use branly_node::PowerControl;

/// Power control that advances a virtual clock instead of sleeping
///
/// With `max_wait` set, long waits end early, as when an interrupt wakes
/// the node before its timer.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    max_wait: Option<Duration>,
    waits: Vec<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut every wait short at `max_wait`
    pub fn waking_every(max_wait: Duration) -> Self {
        VirtualClock {
            max_wait: Some(max_wait),
            ..Default::default()
        }
    }

    /// Time since the start of the simulation
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Requested waits, in order
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }
}

impl PowerControl for VirtualClock {
    fn low_power_wait(&mut self, duration: Duration) -> Duration {
        self.waits.push(duration);
        let elapsed = match self.max_wait {
            Some(max) => duration.min(max),
            None => duration,
        };
        self.now += elapsed;
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advances_by_request() {
        let mut clock = VirtualClock::new();
        assert_eq!(clock.low_power_wait(Duration::from_secs(60)), Duration::from_secs(60));
        clock.low_power_wait(Duration::from_secs(30));
        assert_eq!(clock.now(), Duration::from_secs(90));
        assert_eq!(clock.waits().len(), 2);
    }

    #[test]
    fn test_early_wake() {
        let mut clock = VirtualClock::waking_every(Duration::from_secs(10));
        assert_eq!(clock.low_power_wait(Duration::from_secs(60)), Duration::from_secs(10));
        assert_eq!(clock.low_power_wait(Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(clock.now(), Duration::from_secs(15));
        assert_eq!(clock.waits(), &[Duration::from_secs(60), Duration::from_secs(5)]);
    }
}
