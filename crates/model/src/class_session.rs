use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{ids::DayId, recurrence::RequestError, slot::Slot};

/// A single scheduled occurrence of a class in a room with a trainer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassSession {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub class: ObjectId,
    pub room: ObjectId,
    pub trainer: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub end_at: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default)]
    pub is_canceled: bool,
    #[serde(default)]
    pub note: Option<String>,
}

impl ClassSession {
    pub fn new(draft: SessionDraft) -> ClassSession {
        ClassSession {
            id: ObjectId::new(),
            class: draft.class,
            room: draft.room,
            trainer: draft.trainer,
            start_at: draft.start_at,
            end_at: draft.end_at,
            capacity: draft.capacity,
            is_canceled: false,
            note: draft.note,
        }
    }

    /// Same session identity with new scheduling details.
    pub fn with_draft(&self, draft: SessionDraft) -> ClassSession {
        ClassSession {
            id: self.id,
            is_canceled: self.is_canceled,
            ..ClassSession::new(draft)
        }
    }

    pub fn get_slot(&self) -> Slot {
        Slot::new(self.start_at, self.end_at)
    }

    pub fn day_id(&self) -> DayId {
        DayId::from(self.start_at)
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_canceled {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Scheduled
        }
    }

    pub fn uses(&self, resource: Resource) -> bool {
        match resource {
            Resource::Room(id) => self.room == id,
            Resource::Trainer(id) => self.trainer == id,
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> Resource {
        match kind {
            ResourceKind::Room => Resource::Room(self.room),
            ResourceKind::Trainer => Resource::Trainer(self.trainer),
        }
    }
}

/// Scheduling details of a single session, before it gets an identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionDraft {
    pub class: ObjectId,
    pub room: ObjectId,
    pub trainer: ObjectId,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub capacity: u32,
    #[serde(default)]
    pub note: Option<String>,
}

impl SessionDraft {
    /// A draft must end by the local midnight following its start, so that a
    /// session is always found by the day it starts on.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.start_at >= self.end_at {
            return Err(RequestError::InvertedTimeRange);
        }
        if self.end_at > DayId::from(self.start_at).next().id() {
            return Err(RequestError::CrossesMidnight);
        }
        if self.capacity == 0 {
            return Err(RequestError::ZeroCapacity);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Scheduled,
    Cancelled,
}

impl SessionStatus {
    pub fn can_be_canceled(&self) -> bool {
        matches!(self, SessionStatus::Scheduled)
    }

    pub fn can_be_uncanceled(&self) -> bool {
        matches!(self, SessionStatus::Cancelled)
    }
}

/// Kind of resource that can be double-booked.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Room,
    Trainer,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Room, ResourceKind::Trainer];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Room(ObjectId),
    Trainer(ObjectId),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Room(_) => ResourceKind::Room,
            Resource::Trainer(_) => ResourceKind::Trainer,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Resource::Room(id) | Resource::Trainer(id) => *id,
        }
    }

    /// Document field holding the resource reference.
    pub fn field(&self) -> &'static str {
        match self {
            Resource::Room(_) => "room",
            Resource::Trainer(_) => "trainer",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeZone as _};

    use super::*;
    use crate::ids::local_date_time;

    fn draft() -> SessionDraft {
        let start_at = Utc.with_ymd_and_hms(2024, 5, 13, 10, 0, 0).single().unwrap();
        SessionDraft {
            class: ObjectId::new(),
            room: ObjectId::new(),
            trainer: ObjectId::new(),
            start_at,
            end_at: start_at + chrono::Duration::hours(1),
            capacity: 12,
            note: None,
        }
    }

    #[test]
    fn test_status_follows_cancel_flag() {
        let mut session = ClassSession::new(draft());
        assert_eq!(session.status(), SessionStatus::Scheduled);
        assert!(session.status().can_be_canceled());
        session.is_canceled = true;
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert!(session.status().can_be_uncanceled());
    }

    #[test]
    fn test_with_draft_keeps_identity() {
        let mut session = ClassSession::new(draft());
        session.is_canceled = true;
        let mut moved = draft();
        moved.capacity = 3;
        let updated = session.with_draft(moved.clone());
        assert_eq!(updated.id, session.id);
        assert!(updated.is_canceled);
        assert_eq!(updated.capacity, 3);
        assert_eq!(updated.room, moved.room);
    }

    #[test]
    fn test_draft_validation() {
        assert_eq!(draft().validate(), Ok(()));

        let mut inverted = draft();
        inverted.end_at = inverted.start_at;
        assert_eq!(inverted.validate(), Err(RequestError::InvertedTimeRange));

        let mut empty = draft();
        empty.capacity = 0;
        assert_eq!(empty.validate(), Err(RequestError::ZeroCapacity));
    }

    #[test]
    fn test_draft_must_end_on_start_day() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
        let tuesday = monday.succ_opt().unwrap();
        let at = |date, hour| {
            local_date_time(date, NaiveTime::from_hms_opt(hour, 0, 0).unwrap()).unwrap()
        };
        let mut late = draft();
        late.start_at = at(monday, 23);
        late.end_at = at(tuesday, 1);
        assert_eq!(late.validate(), Err(RequestError::CrossesMidnight));

        late.end_at = at(tuesday, 0);
        assert_eq!(late.validate(), Ok(()));
    }

    #[test]
    fn test_resources() {
        let session = ClassSession::new(draft());
        let room = session.resource(ResourceKind::Room);
        let trainer = session.resource(ResourceKind::Trainer);
        assert!(session.uses(room));
        assert!(session.uses(trainer));
        assert!(!session.uses(Resource::Room(session.trainer)));
        assert_eq!(room.field(), "room");
        assert_eq!(trainer.kind().to_string(), "trainer");
    }
}
