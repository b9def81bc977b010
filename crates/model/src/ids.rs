use chrono::{
    DateTime, Datelike as _, Duration, Local, NaiveDate, NaiveTime, TimeZone as _, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

/// Resolves a local wall-clock moment into UTC.
/// Returns `None` when the moment falls into a DST gap.
pub fn local_date_time(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    local_date_time(date, NaiveTime::MIN)
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekId(NaiveDate);

impl WeekId {
    pub fn new(date_time: DateTime<Local>) -> Self {
        WeekId::from_date(date_time.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        WeekId(date.week(Weekday::Mon).first_day())
    }

    pub fn monday(&self) -> NaiveDate {
        self.0
    }

    pub fn next(&self) -> Self {
        WeekId(self.0 + Duration::days(7))
    }

    pub fn prev(&self) -> Self {
        WeekId(self.0 - Duration::days(7))
    }

    /// Shifts the week forward by `weeks`.
    pub fn add_weeks(&self, weeks: u32) -> Self {
        WeekId(self.0 + Duration::weeks(weeks as i64))
    }

    pub fn day(&self, weekday: Weekday) -> DayId {
        DayId::from_date(self.0 + Duration::days(weekday.num_days_from_monday() as i64))
    }

    pub fn days(&self) -> impl Iterator<Item = DayId> {
        let monday = self.0;
        (0..7).map(move |offset| DayId::from_date(monday + Duration::days(offset)))
    }
}

impl Default for WeekId {
    fn default() -> Self {
        WeekId::new(Local::now())
    }
}

impl From<DateTime<Local>> for WeekId {
    fn from(date_time: DateTime<Local>) -> Self {
        WeekId::new(date_time)
    }
}

/// A local calendar day, stored as the UTC instant of its local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayId(DateTime<Utc>);

impl DayId {
    pub fn new(date_time: DateTime<Local>) -> Self {
        DayId::from_date(date_time.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DayId(local_midnight(date))
    }

    pub fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    pub fn date(&self) -> NaiveDate {
        self.local().date_naive()
    }

    pub fn id(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn week_day(&self) -> Weekday {
        self.date().weekday()
    }

    pub fn week_id(&self) -> WeekId {
        WeekId::from_date(self.date())
    }

    pub fn next(&self) -> Self {
        DayId::from_date(self.date() + Duration::days(1))
    }

    pub fn prev(&self) -> Self {
        DayId::from_date(self.date() - Duration::days(1))
    }
}

impl From<DateTime<Local>> for DayId {
    fn from(date_time: DateTime<Local>) -> Self {
        DayId::new(date_time)
    }
}

impl From<DateTime<Utc>> for DayId {
    fn from(date_time: DateTime<Utc>) -> Self {
        DayId::from(date_time.with_timezone(&Local))
    }
}

impl From<NaiveDate> for DayId {
    fn from(date: NaiveDate) -> Self {
        DayId::from_date(date)
    }
}

impl Default for DayId {
    fn default() -> Self {
        DayId::new(Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_starts_on_monday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let week = WeekId::from_date(wednesday);
        assert_eq!(week.monday(), NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(
            week.day(Weekday::Sun).date(),
            NaiveDate::from_ymd_opt(2024, 5, 19).unwrap()
        );
    }

    #[test]
    fn test_sunday_belongs_to_previous_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        assert_eq!(
            WeekId::from_date(sunday).monday(),
            NaiveDate::from_ymd_opt(2024, 5, 13).unwrap()
        );
    }

    #[test]
    fn test_week_days() {
        let week = WeekId::from_date(NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        let days: Vec<_> = week.days().map(|d| d.week_day()).collect();
        assert_eq!(
            days,
            vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun
            ]
        );
        assert_eq!(week.next().prev(), week);
        assert_eq!(
            week.add_weeks(2).monday(),
            NaiveDate::from_ymd_opt(2024, 5, 27).unwrap()
        );
    }

    #[test]
    fn test_day_id_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
        let day = DayId::from_date(date);
        assert_eq!(day.date(), date);
        assert_eq!(day.next().date(), NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        assert_eq!(DayId::from(day.id()), day);
    }
}
