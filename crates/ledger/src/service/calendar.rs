use std::{collections::HashSet, sync::Arc};

use bson::oid::ObjectId;
use chrono::{Local, Weekday};
use log::{info, warn};
use model::{
    class_session::{ClassSession, ResourceKind, SessionDraft},
    conflict::{batch_conflicts, Conflict, ConflictEntry, ConflictReport, Conflicts},
    ids::WeekId,
    recurrence::{repeat_weekly, RecurrenceRequest, RequestError},
    schedule::WeekSchedule,
    session::Transaction as _,
};
use storage::{Catalog, ScheduleStore};
use thiserror::Error;
use tx_macro::tx;

/// Class schedule with room and trainer double-booking prevention.
///
/// Every path that makes a session occupy its slot (batch creation, single
/// creation, reschedule, restore) runs conflict detection inside the same
/// transaction as the write.
///
/// Detection reads do not lock the checked ranges. Two batches committed
/// concurrently for the same room or trainer can both pass detection and
/// both be written.
pub struct Calendar<S, C> {
    store: Arc<S>,
    catalog: Arc<C>,
}

impl<S, C> Clone for Calendar<S, C> {
    fn clone(&self) -> Self {
        Calendar {
            store: self.store.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: ScheduleStore, C: Catalog> Calendar<S, C> {
    pub fn new(store: Arc<S>, catalog: Arc<C>) -> Self {
        Calendar { store, catalog }
    }

    pub async fn get(
        &self,
        session: &mut S::Tx,
        id: ObjectId,
    ) -> Result<Option<ClassSession>, ScheduleError> {
        Ok(self.store.get(session, id).await?)
    }

    /// Expands a weekly request and creates all of its sessions, or none.
    /// Returns the number of sessions created.
    pub async fn schedule_weekly(
        &self,
        session: &mut S::Tx,
        request: &RecurrenceRequest,
    ) -> Result<usize, ScheduleError> {
        let candidates = request.expand(Local::now().date_naive())?;
        self.ensure_references(request.class, request.room, request.trainer)
            .await?;
        info!("Weekly batch of {} by {}", candidates.len(), session.actor());
        self.commit_batch(session, candidates).await
    }

    /// Dry run of [`Calendar::schedule_weekly`]: reports conflicts without writing.
    pub async fn check_weekly(
        &self,
        session: &mut S::Tx,
        request: &RecurrenceRequest,
    ) -> Result<ConflictReport, ScheduleError> {
        let candidates = request.expand(Local::now().date_naive())?;
        self.ensure_references(request.class, request.room, request.trainer)
            .await?;
        let conflicts = self.find_conflicts(session, &candidates).await?;
        self.report(&conflicts).await
    }

    pub async fn schedule_single(
        &self,
        session: &mut S::Tx,
        draft: SessionDraft,
    ) -> Result<ClassSession, ScheduleError> {
        draft.validate()?;
        self.ensure_references(draft.class, draft.room, draft.trainer)
            .await?;
        let class_session = ClassSession::new(draft);
        self.commit_batch(session, vec![class_session.clone()])
            .await?;
        Ok(class_session)
    }

    /// Creates `weeks` copies of one session a week apart, or none of them.
    pub async fn schedule_repeated(
        &self,
        session: &mut S::Tx,
        draft: SessionDraft,
        weeks: u32,
    ) -> Result<usize, ScheduleError> {
        let copies = repeat_weekly(&draft, weeks)?;
        self.ensure_references(draft.class, draft.room, draft.trainer)
            .await?;
        info!("Repeated batch of {} by {}", copies.len(), session.actor());
        self.commit_batch(session, copies).await
    }

    pub async fn reschedule(
        &self,
        session: &mut S::Tx,
        id: ObjectId,
        draft: SessionDraft,
    ) -> Result<ClassSession, ScheduleError> {
        draft.validate()?;
        self.ensure_references(draft.class, draft.room, draft.trainer)
            .await?;
        self.apply_reschedule(session, id, draft).await
    }

    #[tx]
    pub async fn cancel(&self, session: &mut S::Tx, id: ObjectId) -> Result<(), ScheduleError> {
        let class_session = self.existing(session, id).await?;
        if !class_session.status().can_be_canceled() {
            return Err(ScheduleError::AlreadyCancelled(id));
        }
        self.store.set_cancel_flag(session, id, true).await?;
        Ok(())
    }

    /// Puts a cancelled session back on the schedule if its slot is still free.
    #[tx]
    pub async fn restore(&self, session: &mut S::Tx, id: ObjectId) -> Result<(), ScheduleError> {
        let mut class_session = self.existing(session, id).await?;
        if !class_session.status().can_be_uncanceled() {
            return Err(ScheduleError::NotCancelled(id));
        }
        class_session.is_canceled = false;
        self.ensure_free(session, &[class_session]).await?;
        self.store.set_cancel_flag(session, id, false).await?;
        Ok(())
    }

    #[tx]
    pub async fn delete(&self, session: &mut S::Tx, id: ObjectId) -> Result<(), ScheduleError> {
        self.existing(session, id).await?;
        self.store.delete(session, id).await?;
        Ok(())
    }

    pub async fn week_schedule(
        &self,
        session: &mut S::Tx,
        week: WeekId,
    ) -> Result<WeekSchedule, ScheduleError> {
        let from = week.day(Weekday::Mon);
        let to = week.next().day(Weekday::Mon);
        let sessions = self.store.find_range(session, from, to).await?;
        Ok(WeekSchedule::new(week, sessions))
    }

    /// Overlaps of `candidates` with persisted non-cancelled sessions and with
    /// each other. Persisted sessions sharing a candidate's id are ignored.
    pub async fn find_conflicts(
        &self,
        session: &mut S::Tx,
        candidates: &[ClassSession],
    ) -> Result<Vec<Conflict>, ScheduleError> {
        let own: HashSet<ObjectId> = candidates.iter().map(|c| c.id).collect();
        let mut conflicts = Conflicts::default();
        for candidate in candidates {
            let slot = candidate.get_slot();
            for kind in ResourceKind::ALL {
                let booked = self
                    .store
                    .active_on_day(session, candidate.resource(kind), candidate.day_id())
                    .await?;
                for existing in booked.iter().filter(|s| !own.contains(&s.id)) {
                    if existing.get_slot().has_conflict(&slot) {
                        conflicts.push(kind, candidate, existing);
                    }
                }
            }
        }
        batch_conflicts(candidates, &mut conflicts);
        Ok(conflicts.into_vec())
    }

    #[tx]
    async fn commit_batch(
        &self,
        session: &mut S::Tx,
        candidates: Vec<ClassSession>,
    ) -> Result<usize, ScheduleError> {
        self.ensure_free(session, &candidates).await?;
        self.store.insert_many(session, &candidates).await?;
        info!("Scheduled {} sessions", candidates.len());
        Ok(candidates.len())
    }

    #[tx]
    async fn apply_reschedule(
        &self,
        session: &mut S::Tx,
        id: ObjectId,
        draft: SessionDraft,
    ) -> Result<ClassSession, ScheduleError> {
        let updated = self.existing(session, id).await?.with_draft(draft);
        if !updated.is_canceled {
            self.ensure_free(session, &[updated.clone()]).await?;
        }
        self.store.update(session, &updated).await?;
        info!("Rescheduled {}: {:?}", id, updated.get_slot());
        Ok(updated)
    }

    async fn existing(
        &self,
        session: &mut S::Tx,
        id: ObjectId,
    ) -> Result<ClassSession, ScheduleError> {
        self.store
            .get(session, id)
            .await?
            .ok_or(ScheduleError::SessionNotFound(id))
    }

    async fn ensure_free(
        &self,
        session: &mut S::Tx,
        candidates: &[ClassSession],
    ) -> Result<(), ScheduleError> {
        let conflicts = self.find_conflicts(session, candidates).await?;
        if conflicts.is_empty() {
            return Ok(());
        }
        for conflict in &conflicts {
            warn!("{}", conflict.description());
        }
        let report = self.report(&conflicts).await?;
        Err(ScheduleError::SchedulingConflict(report))
    }

    async fn ensure_references(
        &self,
        class: ObjectId,
        room: ObjectId,
        trainer: ObjectId,
    ) -> Result<(), ScheduleError> {
        self.catalog
            .class(class)
            .await?
            .ok_or(ScheduleError::ClassNotFound(class))?;
        self.catalog
            .room(room)
            .await?
            .ok_or(ScheduleError::RoomNotFound(room))?;
        self.catalog
            .trainer(trainer)
            .await?
            .ok_or(ScheduleError::TrainerNotFound(trainer))?;
        Ok(())
    }

    async fn report(&self, conflicts: &[Conflict]) -> Result<ConflictReport, ScheduleError> {
        let mut entries = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            let existing = &conflict.existing;
            let name = match conflict.resource {
                ResourceKind::Room => self.catalog.room(existing.room).await?.map(|r| r.name),
                ResourceKind::Trainer => {
                    let trainer = self.catalog.trainer(existing.trainer).await?;
                    trainer.map(|s| s.full_name())
                }
            };
            let fallback = existing.resource(conflict.resource).id();
            let resource_name = name.unwrap_or_else(|| fallback.to_hex());
            let class_name = match self.catalog.class(existing.class).await? {
                Some(class) => class.name,
                None => existing.class.to_hex(),
            };

            entries.push(ConflictEntry {
                resource: conflict.resource,
                resource_name,
                class_name,
                date: conflict.candidate.day_id().date(),
                time_range: existing.get_slot().time_range(),
                description: conflict.description(),
            });
        }
        Ok(ConflictReport::new(entries))
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("Class not found: {0}")]
    ClassNotFound(ObjectId),
    #[error("Room not found: {0}")]
    RoomNotFound(ObjectId),
    #[error("Trainer not found: {0}")]
    TrainerNotFound(ObjectId),
    #[error("Session not found: {0}")]
    SessionNotFound(ObjectId),
    #[error("Session is not cancelled: {0}")]
    NotCancelled(ObjectId),
    #[error("Session is already cancelled: {0}")]
    AlreadyCancelled(ObjectId),
    #[error("Scheduling conflict: {0}")]
    SchedulingConflict(ConflictReport),
    #[error("Persistence error: {0}")]
    Persistence(#[from] eyre::Error),
}
