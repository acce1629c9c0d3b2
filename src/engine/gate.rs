/// Admission gate bounding the number of edges resolved at the same time.
///
/// Owned by the coordinator alone. A slot is taken when a worker is spawned
/// and handed back when that worker's result is integrated; every worker posts
/// exactly one result, panics included, so slots never leak.
#[derive(Debug)]
pub(crate) struct Gate {
    capacity: usize,
    in_flight: usize,
    peak: usize,
}

impl Gate {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_flight: 0,
            peak: 0,
        }
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.in_flight < self.capacity
    }

    pub(crate) fn try_acquire(&mut self) -> bool {
        if !self.has_capacity() {
            return false;
        }

        self.in_flight += 1;
        self.peak = self.peak.max(self.in_flight);
        true
    }

    pub(crate) fn release(&mut self) {
        debug_assert!(self.in_flight > 0, "released a slot that was never taken");
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded() {
        let mut gate = Gate::new(2);

        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        assert!(!gate.has_capacity());
        assert_eq!(gate.in_flight(), 2);

        gate.release();
        assert!(gate.has_capacity());
        assert!(gate.try_acquire());
        assert_eq!(gate.peak(), 2);
    }

    #[test]
    fn test_peak_survives_release() {
        let mut gate = Gate::new(3);
        gate.try_acquire();
        gate.try_acquire();
        gate.release();
        gate.release();

        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.peak(), 2);
    }
}
