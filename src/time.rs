/// Logical time for the topic scheduler.
///
/// Represents an application-supplied integer timeline with no dependency
/// on `std::time`. Time advances only when the caller drains the bus with
/// `run_until` — never from wall-clock observation.

/// A point on the logical timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// The zero-point of the timeline.
    pub const ZERO: LogicalTime = LogicalTime(0);

    /// Create a `LogicalTime` from a raw tick value.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        LogicalTime(ticks)
    }

    /// Return the raw tick value.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Compute the time `delay` ticks after `self`.
    /// Returns `None` on overflow (should never happen in practice).
    #[inline]
    pub fn plus(self, delay: u64) -> Option<LogicalTime> {
        self.0.checked_add(delay).map(LogicalTime)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: LogicalTime) -> bool {
        self.0 < other.0
    }

    /// Returns the duration (in ticks) since `earlier`.
    /// Returns `None` if `earlier` is actually later than `self`.
    #[inline]
    pub fn duration_since(self, earlier: LogicalTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

impl From<u64> for LogicalTime {
    fn from(ticks: u64) -> Self {
        LogicalTime(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(LogicalTime::ZERO.ticks(), 0);
    }

    #[test]
    fn test_ordering() {
        let t1 = LogicalTime::new(10);
        let t2 = LogicalTime::new(20);
        assert!(t1 < t2);
        assert!(t1.is_before(t2));
        assert!(!t2.is_before(t1));
    }

    #[test]
    fn test_plus() {
        let t = LogicalTime::new(100);
        assert_eq!(t.plus(50).unwrap().ticks(), 150);
    }

    #[test]
    fn test_plus_overflow() {
        let t = LogicalTime::new(u64::MAX);
        assert!(t.plus(1).is_none());
    }

    #[test]
    fn test_duration_since() {
        let t1 = LogicalTime::new(10);
        let t2 = LogicalTime::new(30);
        assert_eq!(t2.duration_since(t1), Some(20));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", LogicalTime::new(42)), "T=42");
    }

    #[test]
    fn test_from_u64() {
        let t: LogicalTime = 7u64.into();
        assert_eq!(t.ticks(), 7);
    }
}
