use crate::executor::Tick;

/// Simulated time. Only the engine advances it, one tick per step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimClock {
    now: Tick,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub(crate) fn advance(&mut self) -> Tick {
        self.now += 1;
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_by_one() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.now(), 2);
    }
}
