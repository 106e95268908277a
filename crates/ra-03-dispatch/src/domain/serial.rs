//! # Serial Tracking
//!
//! Each originator numbers its requests with a monotonically increasing
//! serial. The tracker remembers the highest serial seen per originator and
//! classifies each new one. It reports anomalies; it never rejects a
//! request, since correlation does not depend on serials.

use shared_types::HostName;
use std::cmp::Ordering;
use std::collections::HashMap;

/// How a request's serial relates to earlier ones from the same originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialObservation {
    /// First request seen from this originator.
    First,
    /// Serial is above every earlier one.
    InOrder,
    /// Serial equals the highest seen so far.
    Duplicate { last: u64 },
    /// Serial is below the highest seen so far.
    Reordered { last: u64 },
}

impl SerialObservation {
    pub fn is_anomaly(self) -> bool {
        matches!(
            self,
            SerialObservation::Duplicate { .. } | SerialObservation::Reordered { .. }
        )
    }
}

/// Highest serial seen per originator.
#[derive(Debug)]
pub struct SerialTracker {
    last: HashMap<HostName, u64>,
    max_originators: usize,
}

impl SerialTracker {
    /// Default bound on remembered originators.
    pub const DEFAULT_MAX_ORIGINATORS: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_ORIGINATORS)
    }

    /// Creates a tracker remembering at most `max_originators` originators.
    pub fn with_capacity(max_originators: usize) -> Self {
        Self {
            last: HashMap::new(),
            max_originators: max_originators.max(1),
        }
    }

    /// Records `serial` from `from` and classifies it.
    pub fn observe(&mut self, from: HostName, serial: u64) -> SerialObservation {
        if let Some(last) = self.last.get_mut(&from) {
            return match serial.cmp(&*last) {
                Ordering::Greater => {
                    *last = serial;
                    SerialObservation::InOrder
                }
                Ordering::Equal => SerialObservation::Duplicate { last: *last },
                Ordering::Less => SerialObservation::Reordered { last: *last },
            };
        }

        if self.last.len() >= self.max_originators {
            // Forgetting everyone is coarse but keeps memory bounded; the
            // next request from each originator reads as First.
            self.last.clear();
        }
        self.last.insert(from, serial);
        SerialObservation::First
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

impl Default for SerialTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> HostName {
        HostName::new(name).unwrap()
    }

    #[test]
    fn test_in_order_sequence() {
        let mut tracker = SerialTracker::new();
        assert_eq!(tracker.observe(host("a"), 1), SerialObservation::First);
        assert_eq!(tracker.observe(host("a"), 2), SerialObservation::InOrder);
        // Gaps are fine; serials only need to increase.
        assert_eq!(tracker.observe(host("a"), 10), SerialObservation::InOrder);
    }

    #[test]
    fn test_duplicate_and_reordered_are_reported() {
        let mut tracker = SerialTracker::new();
        tracker.observe(host("a"), 5);
        assert_eq!(
            tracker.observe(host("a"), 5),
            SerialObservation::Duplicate { last: 5 }
        );
        assert_eq!(
            tracker.observe(host("a"), 3),
            SerialObservation::Reordered { last: 5 }
        );
        // Anomalies do not move the high-water mark.
        assert_eq!(tracker.observe(host("a"), 6), SerialObservation::InOrder);
    }

    #[test]
    fn test_originators_are_independent() {
        let mut tracker = SerialTracker::new();
        tracker.observe(host("a"), 100);
        assert_eq!(tracker.observe(host("b"), 1), SerialObservation::First);
        assert_eq!(tracker.observe(host("b"), 2), SerialObservation::InOrder);
    }

    #[test]
    fn test_memory_is_bounded() {
        let mut tracker = SerialTracker::with_capacity(2);
        tracker.observe(host("a"), 1);
        tracker.observe(host("b"), 1);
        tracker.observe(host("c"), 1);
        assert!(tracker.len() <= 2);
    }
}
