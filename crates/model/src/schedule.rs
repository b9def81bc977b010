use chrono::NaiveDate;
use serde::Serialize;

use crate::{class_session::ClassSession, ids::WeekId};

#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub sessions: Vec<ClassSession>,
}

/// Monday to Sunday view of the calendar.
#[derive(Debug, Clone, Serialize)]
pub struct WeekSchedule {
    pub week: WeekId,
    pub days: Vec<DaySchedule>,
}

impl WeekSchedule {
    /// Spreads sessions over the days of the week, each day ordered by start.
    pub fn new(week: WeekId, mut sessions: Vec<ClassSession>) -> WeekSchedule {
        sessions.sort_by_key(|s| (s.start_at, s.id));
        let days = week
            .days()
            .map(|day| DaySchedule {
                date: day.date(),
                sessions: sessions
                    .iter()
                    .filter(|s| s.day_id() == day)
                    .cloned()
                    .collect(),
            })
            .collect();
        WeekSchedule { week, days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.sessions.is_empty())
    }
}
