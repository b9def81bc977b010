use std::collections::BTreeSet;

use bson::oid::ObjectId;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    class_session::{ClassSession, SessionDraft},
    ids::{local_date_time, WeekId},
};

/// Two years of weekly repeats, the calendar horizon.
pub const MAX_WEEKS_TO_REPEAT: u32 = 104;

/// Weekly pattern expanded into a batch of sessions.
///
/// Weekdays use the `0 = Sunday .. 6 = Saturday` numbering. Weeks run from
/// Monday to Sunday, so Sunday is the last day of its week.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecurrenceRequest {
    pub class: ObjectId,
    pub room: ObjectId,
    pub trainer: ObjectId,
    pub capacity: u32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub weekdays: Vec<u8>,
    pub weeks: u32,
    #[serde(default)]
    pub note: Option<String>,
    /// Any date inside the first week. Defaults to the current week.
    #[serde(default)]
    pub anchor: Option<NaiveDate>,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RequestError {
    #[error("At least one weekday must be selected")]
    NoWeekdays,
    #[error("Unknown weekday: {0}")]
    UnknownWeekday(u8),
    #[error("Weeks to repeat must be at least 1")]
    NoWeeks,
    #[error("Too many weeks to repeat: {0}")]
    TooManyWeeks(u32),
    #[error("Start time must be before end time")]
    InvertedTimeRange,
    #[error("Session must end on the day it starts")]
    CrossesMidnight,
    #[error("Capacity must be positive")]
    ZeroCapacity,
    #[error("Local time does not exist: {0}")]
    NonexistentLocalTime(NaiveDateTime),
}

fn check_weeks(weeks: u32) -> Result<(), RequestError> {
    if weeks < 1 {
        return Err(RequestError::NoWeeks);
    }
    if weeks > MAX_WEEKS_TO_REPEAT {
        return Err(RequestError::TooManyWeeks(weeks));
    }
    Ok(())
}

pub fn weekday_from_index(index: u8) -> Result<Weekday, RequestError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(RequestError::UnknownWeekday(index)),
    }
}

impl RecurrenceRequest {
    /// Selected weekdays as offsets from Monday, deduplicated and ordered.
    pub fn day_offsets(&self) -> Result<BTreeSet<u32>, RequestError> {
        if self.weekdays.is_empty() {
            return Err(RequestError::NoWeekdays);
        }
        self.weekdays
            .iter()
            .map(|index| weekday_from_index(*index).map(|day| day.num_days_from_monday()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        self.day_offsets()?;
        check_weeks(self.weeks)?;
        if self.start_time >= self.end_time {
            return Err(RequestError::InvertedTimeRange);
        }
        if self.capacity == 0 {
            return Err(RequestError::ZeroCapacity);
        }
        Ok(())
    }

    /// Expands the request into candidates in chronological order.
    /// `today` is used when the request has no explicit anchor.
    pub fn expand(&self, today: NaiveDate) -> Result<Vec<ClassSession>, RequestError> {
        self.validate()?;
        let offsets = self.day_offsets()?;
        let first_week = WeekId::from_date(self.anchor.unwrap_or(today));

        let mut candidates = Vec::with_capacity(self.weeks as usize * offsets.len());
        for week in 0..self.weeks {
            let monday = first_week.add_weeks(week).monday();
            for offset in &offsets {
                let date = monday + chrono::Duration::days(*offset as i64);
                candidates.push(ClassSession::new(self.draft(date)?));
            }
        }
        Ok(candidates)
    }

    fn draft(&self, date: NaiveDate) -> Result<SessionDraft, RequestError> {
        let start_at = local_date_time(date, self.start_time)
            .ok_or(RequestError::NonexistentLocalTime(date.and_time(self.start_time)))?;
        let end_at = local_date_time(date, self.end_time)
            .ok_or(RequestError::NonexistentLocalTime(date.and_time(self.end_time)))?;
        if start_at >= end_at {
            return Err(RequestError::InvertedTimeRange);
        }
        Ok(SessionDraft {
            class: self.class,
            room: self.room,
            trainer: self.trainer,
            start_at,
            end_at,
            capacity: self.capacity,
            note: self.note.clone(),
        })
    }
}

/// Repeats one session `weeks` times, each copy seven days after the previous
/// one at the same local wall-clock times.
pub fn repeat_weekly(draft: &SessionDraft, weeks: u32) -> Result<Vec<ClassSession>, RequestError> {
    draft.validate()?;
    check_weeks(weeks)?;

    let start = draft.start_at.with_timezone(&Local).naive_local();
    let end = draft.end_at.with_timezone(&Local).naive_local();
    let resolve = |at: NaiveDateTime| {
        local_date_time(at.date(), at.time()).ok_or(RequestError::NonexistentLocalTime(at))
    };
    let mut copies = Vec::with_capacity(weeks as usize);
    for week in 0..weeks {
        let shift = chrono::Duration::weeks(week as i64);
        let (start, end) = (start + shift, end + shift);
        copies.push(ClassSession::new(SessionDraft {
            start_at: resolve(start)?,
            end_at: resolve(end)?,
            ..draft.clone()
        }));
    }
    Ok(copies)
}

#[cfg(test)]
mod tests {
    use chrono::Datelike as _;

    use super::*;

    fn time(hour: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, min, 0).unwrap()
    }

    fn request(weekdays: Vec<u8>, weeks: u32) -> RecurrenceRequest {
        RecurrenceRequest {
            class: ObjectId::new(),
            room: ObjectId::new(),
            trainer: ObjectId::new(),
            capacity: 10,
            start_time: time(10, 0),
            end_time: time(11, 0),
            weekdays,
            weeks,
            note: Some("bring a mat".to_string()),
            anchor: None,
        }
    }

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    #[test]
    fn test_expands_weeks_times_days() {
        for weeks in 1..=4 {
            for days in [vec![1], vec![1, 3], vec![0, 2, 4, 6], vec![0, 1, 2, 3, 4, 5, 6]] {
                let req = request(days.clone(), weeks);
                let candidates = req.expand(wednesday()).unwrap();
                assert_eq!(candidates.len(), weeks as usize * days.len());
                for candidate in &candidates {
                    assert!(candidate.start_at < candidate.end_at);
                    let weekday = candidate.get_slot().start_at().weekday();
                    assert!(days.contains(&(weekday.num_days_from_sunday() as u8)));
                }
            }
        }
    }

    #[test]
    fn test_candidates_are_chronological() {
        let candidates = request(vec![0, 5, 1, 3], 3).expand(wednesday()).unwrap();
        assert!(candidates.windows(2).all(|w| w[0].start_at < w[1].start_at));
    }

    #[test]
    fn test_anchor_is_monday_of_current_week() {
        let candidates = request(vec![1, 0], 1).expand(wednesday()).unwrap();
        let dates: Vec<_> = candidates.iter().map(|c| c.day_id().date()).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 19).unwrap(),
            ]
        );
    }

    #[test]
    fn test_explicit_anchor_wins() {
        let mut req = request(vec![1], 2);
        req.anchor = NaiveDate::from_ymd_opt(2024, 6, 6);
        let candidates = req.expand(wednesday()).unwrap();
        assert_eq!(
            candidates[0].day_id().date(),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
        );
        assert_eq!(
            candidates[1].day_id().date(),
            NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
        );
    }

    #[test]
    fn test_duplicate_weekdays_count_once() {
        let candidates = request(vec![1, 1, 3], 2).expand(wednesday()).unwrap();
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn test_candidates_copy_request_fields() {
        let req = request(vec![2], 1);
        let candidate = &req.expand(wednesday()).unwrap()[0];
        assert_eq!(candidate.class, req.class);
        assert_eq!(candidate.room, req.room);
        assert_eq!(candidate.trainer, req.trainer);
        assert_eq!(candidate.capacity, 10);
        assert_eq!(candidate.note.as_deref(), Some("bring a mat"));
        assert!(!candidate.is_canceled);
        assert_eq!(candidate.get_slot().time_range().start, time(10, 0));
        assert_eq!(candidate.get_slot().time_range().end, time(11, 0));
    }

    #[test]
    fn test_invalid_requests() {
        assert_eq!(
            request(vec![], 1).expand(wednesday()),
            Err(RequestError::NoWeekdays)
        );
        assert_eq!(
            request(vec![7], 1).expand(wednesday()),
            Err(RequestError::UnknownWeekday(7))
        );
        assert_eq!(
            request(vec![1], 0).expand(wednesday()),
            Err(RequestError::NoWeeks)
        );
        assert_eq!(
            request(vec![1], MAX_WEEKS_TO_REPEAT + 1).expand(wednesday()),
            Err(RequestError::TooManyWeeks(MAX_WEEKS_TO_REPEAT + 1))
        );

        let mut inverted = request(vec![1], 1);
        inverted.end_time = inverted.start_time;
        assert_eq!(
            inverted.expand(wednesday()),
            Err(RequestError::InvertedTimeRange)
        );

        let mut empty = request(vec![1], 1);
        empty.capacity = 0;
        assert_eq!(empty.expand(wednesday()), Err(RequestError::ZeroCapacity));
    }

    #[test]
    fn test_weekday_numbering() {
        assert_eq!(weekday_from_index(0), Ok(Weekday::Sun));
        assert_eq!(weekday_from_index(1), Ok(Weekday::Mon));
        assert_eq!(weekday_from_index(6), Ok(Weekday::Sat));
        assert!(weekday_from_index(8).is_err());
    }

    #[test]
    fn test_repeat_weekly() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let draft = SessionDraft {
            class: ObjectId::new(),
            room: ObjectId::new(),
            trainer: ObjectId::new(),
            start_at: local_date_time(monday, time(18, 30)).unwrap(),
            end_at: local_date_time(monday, time(19, 30)).unwrap(),
            capacity: 8,
            note: None,
        };

        let copies = repeat_weekly(&draft, 3).unwrap();
        let dates: Vec<_> = copies.iter().map(|c| c.day_id().date()).collect();
        assert_eq!(
            dates,
            vec![
                monday,
                NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 27).unwrap(),
            ]
        );
        for copy in &copies {
            assert_eq!(copy.get_slot().time_range().start, time(18, 30));
            assert_eq!(copy.get_slot().time_range().end, time(19, 30));
            assert_eq!(copy.room, draft.room);
        }
        assert_ne!(copies[0].id, copies[1].id);

        assert_eq!(repeat_weekly(&draft, 0), Err(RequestError::NoWeeks));
        assert_eq!(
            repeat_weekly(&draft, MAX_WEEKS_TO_REPEAT + 1),
            Err(RequestError::TooManyWeeks(MAX_WEEKS_TO_REPEAT + 1))
        );
    }
}
