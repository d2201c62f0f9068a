/// Monotonic time in milliseconds.
///
/// This is the timebase for deterministic timers. It has no epoch; drivers
/// map it onto whatever clock they run on.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn from_millis(ms: u64) -> Self {
        Time(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn after(self, ms: u64) -> Self {
        Time(self.0.saturating_add(ms))
    }

    /// Milliseconds elapsed since `earlier` (zero if `earlier` is later).
    pub fn since(self, earlier: Time) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn arithmetic_saturates() {
        let t = Time::from_millis(100);
        assert_eq!(t.after(50), Time(150));
        assert_eq!(t.since(Time(40)), 60);
        assert_eq!(Time(40).since(t), 0);
        assert_eq!(Time(u64::MAX).after(1), Time(u64::MAX));
    }
}
