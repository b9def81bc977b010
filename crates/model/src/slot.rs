use std::fmt::Debug;

use chrono::{DateTime, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DayId;

/// Half-open time interval `[start_at, end_at)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Slot {
        Slot { start_at, end_at }
    }

    pub fn is_valid(&self) -> bool {
        self.start_at < self.end_at
    }

    pub fn in_slot(&self, time: DateTime<Local>) -> bool {
        let time = time.with_timezone(&Utc);
        time >= self.start_at && time < self.end_at
    }

    pub fn start_at(&self) -> DateTime<Local> {
        self.start_at.with_timezone(&Local)
    }

    pub fn end_at(&self) -> DateTime<Local> {
        self.end_at.with_timezone(&Local)
    }

    pub fn day_id(&self) -> DayId {
        DayId::from(self.start_at)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_at - self.start_at
    }

    pub fn has_conflict(&self, other: &Slot) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_at().time(),
            end: self.end_at().time(),
        }
    }
}

impl Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let start_at = self.start_at();
        let fmt = "%H:%M";
        write!(
            f,
            "[({}):{}<->{}]",
            start_at.format("%d.%m"),
            start_at.format(fmt),
            self.end_at().format(fmt)
        )
    }
}

/// Local wall-clock range of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn slot(day: u32, hour: u32, min: u32, duration_min: i64) -> Slot {
        let start_at = Utc
            .with_ymd_and_hms(2023, 10, day, hour, min, 0)
            .single()
            .unwrap();
        Slot::new(start_at, start_at + chrono::Duration::minutes(duration_min))
    }

    #[test]
    fn test_conflict_different_days_no_overlap() {
        let slot1 = slot(14, 11, 15, 30);
        let slot2 = slot(13, 11, 0, 30);

        assert!(!slot1.has_conflict(&slot2));
    }

    #[test]
    fn test_conflict_same_day_overlap() {
        let slot1 = slot(14, 11, 15, 30);
        let slot2 = slot(14, 11, 0, 30);

        assert!(slot1.has_conflict(&slot2));
    }

    #[test]
    fn test_slot_creation() {
        let slot = slot(1, 12, 0, 60);

        assert!(slot.is_valid());
        assert_eq!(slot.duration(), chrono::Duration::minutes(60));
    }

    #[test]
    fn test_inverted_slot_is_invalid() {
        let start_at = Utc.with_ymd_and_hms(2023, 10, 1, 12, 0, 0).single().unwrap();
        assert!(!Slot::new(start_at, start_at).is_valid());
        assert!(!Slot::new(start_at, start_at - chrono::Duration::minutes(1)).is_valid());
    }

    #[test]
    fn test_no_conflict() {
        assert!(!slot(1, 12, 0, 60).has_conflict(&slot(1, 14, 0, 60)));
    }

    #[test]
    fn test_conflict_start_overlap() {
        assert!(slot(1, 12, 0, 60).has_conflict(&slot(1, 12, 30, 60)));
    }

    #[test]
    fn test_conflict_end_overlap() {
        assert!(slot(1, 12, 0, 60).has_conflict(&slot(1, 11, 30, 60)));
    }

    #[test]
    fn test_conflict_full_overlap() {
        assert!(slot(1, 12, 0, 60).has_conflict(&slot(1, 12, 0, 30)));
    }

    #[test]
    fn test_conflict_contained_within() {
        assert!(slot(1, 12, 0, 120).has_conflict(&slot(1, 12, 30, 30)));
    }

    #[test]
    fn test_conflict_exact_match() {
        assert!(slot(1, 12, 0, 60).has_conflict(&slot(1, 12, 0, 60)));
    }

    #[test]
    fn test_no_conflict_adjacent_slots() {
        assert!(!slot(1, 12, 0, 60).has_conflict(&slot(1, 13, 0, 60)));
        assert!(!slot(1, 13, 0, 60).has_conflict(&slot(1, 12, 0, 60)));
    }

    #[test]
    fn test_conflict_partial_overlap() {
        assert!(slot(1, 12, 0, 90).has_conflict(&slot(1, 13, 0, 60)));
    }

    #[test]
    fn test_no_conflict_different_days() {
        assert!(!slot(1, 12, 0, 60).has_conflict(&slot(2, 12, 0, 60)));
    }

    #[test]
    fn test_conflict_is_symmetric() {
        let slots = [
            slot(1, 10, 0, 60),
            slot(1, 10, 30, 60),
            slot(1, 11, 0, 60),
            slot(1, 9, 0, 240),
            slot(2, 10, 0, 60),
        ];
        for a in &slots {
            for b in &slots {
                assert_eq!(a.has_conflict(b), b.has_conflict(a), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_in_slot_excludes_end() {
        let slot = slot(1, 12, 0, 60);
        assert!(slot.in_slot(slot.start_at()));
        assert!(!slot.in_slot(slot.end_at()));
    }
}
