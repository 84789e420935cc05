//! Stack-pointer delta tracking.

use std::collections::BTreeMap;

use crate::Address;

use super::Routine;

/// Per-routine stack change points.
///
/// A change point at `addr` holds the stack-pointer change that takes effect
/// at `addr`; the cumulative delta at an address is the sum of the routine's
/// points at or before it. Writing a point replaces the previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTracker {
    points: BTreeMap<Address, BTreeMap<Address, i64>>,
}

impl StackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change of `delta` taking effect at `at`.
    pub fn add_point(&mut self, routine: &Routine, at: Address, delta: i64) {
        let points = self.points.entry(routine.start).or_default();
        if delta == 0 {
            points.remove(&at);
        } else {
            points.insert(at, delta);
        }
    }

    /// The change recorded at exactly `at`.
    pub fn point(&self, routine: &Routine, at: Address) -> Option<i64> {
        self.points.get(&routine.start)?.get(&at).copied()
    }

    /// Cumulative delta in effect at `at`, relative to routine entry.
    pub fn delta_at(&self, routine: &Routine, at: Address) -> i64 {
        self.points
            .get(&routine.start)
            .map(|points| points.range(..=at).map(|(_, d)| d).sum())
            .unwrap_or(0)
    }

    /// Re-derive the delta at `at` from the instructions that jump to it.
    ///
    /// Used after an instruction that does not fall through: the delta at the
    /// next address cannot be extended from it and is instead made equal to
    /// the delta at the first jump source. Returns whether a point was set.
    pub fn recalc(&mut self, routine: &Routine, at: Address, jump_sources: &[Address]) -> bool {
        let Some(&source) = jump_sources.first() else {
            return false;
        };
        let wanted = self.delta_at(routine, source);
        let before: i64 = self
            .points
            .get(&routine.start)
            .map(|points| points.range(..at).map(|(_, d)| d).sum())
            .unwrap_or(0);
        self.add_point(routine, at, wanted - before);
        true
    }

    /// All change points of a routine, in address order.
    pub fn points(&self, routine: &Routine) -> Vec<(Address, i64)> {
        self.points
            .get(&routine.start)
            .map(|points| points.iter().map(|(a, d)| (*a, *d)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTINE: Routine = Routine {
        start: 0x1000,
        end: None,
    };

    #[test]
    fn test_delta_accumulates() {
        let mut stack = StackTracker::new();
        stack.add_point(&ROUTINE, 0x1002, -2);
        stack.add_point(&ROUTINE, 0x1004, -4);
        assert_eq!(stack.delta_at(&ROUTINE, 0x1000), 0);
        assert_eq!(stack.delta_at(&ROUTINE, 0x1002), -2);
        assert_eq!(stack.delta_at(&ROUTINE, 0x1006), -6);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut stack = StackTracker::new();
        stack.add_point(&ROUTINE, 0x1002, -2);
        stack.add_point(&ROUTINE, 0x1002, -6);
        assert_eq!(stack.point(&ROUTINE, 0x1002), Some(-6));
        stack.add_point(&ROUTINE, 0x1002, 0);
        assert_eq!(stack.point(&ROUTINE, 0x1002), None);
    }

    #[test]
    fn test_routines_are_independent() {
        let other = Routine {
            start: 0x2000,
            end: None,
        };
        let mut stack = StackTracker::new();
        stack.add_point(&ROUTINE, 0x1002, -2);
        assert_eq!(stack.delta_at(&other, 0x2010), 0);
    }

    #[test]
    fn test_recalc_from_jump_source() {
        let mut stack = StackTracker::new();
        // push at 0x1000, conditional jump at 0x1002 to 0x100a,
        // pop at 0x1004, ret at 0x1006
        stack.add_point(&ROUTINE, 0x1002, -2);
        stack.add_point(&ROUTINE, 0x1006, 2);
        assert!(stack.recalc(&ROUTINE, 0x1008, &[0x1002]));
        assert_eq!(stack.delta_at(&ROUTINE, 0x1008), -2);
        assert!(!stack.recalc(&ROUTINE, 0x2000, &[]));
    }
}
