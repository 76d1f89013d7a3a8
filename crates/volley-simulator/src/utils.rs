/// Rate limiter for periodic progress logs, driven by simulation time.
pub struct IntervalTrigger {
    period: f64,
    last: Option<f64>,
}

impl IntervalTrigger {
    pub fn new(period: f64) -> Self {
        Self { period, last: None }
    }

    /// Whether at least one period of simulation time has passed since the last
    /// accepted call. The first call is always accepted.
    pub fn trigger(&mut self, time: f64) -> bool {
        match self.last {
            Some(last) if time - last < self.period => false,
            _ => {
                self.last = Some(time);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_once_per_period() {
        let mut trigger = IntervalTrigger::new(0.25);

        assert!(trigger.trigger(0.0));
        assert!(!trigger.trigger(0.1));
        assert!(trigger.trigger(0.3));
        assert!(!trigger.trigger(0.5));
        assert!(trigger.trigger(1.2));
        assert!(!trigger.trigger(1.2));
    }
}
