//! In-process stores implementing the same traits as the MongoDB ones.
//!
//! Writes made inside a transaction are staged on the [`MemoryTx`] and become
//! visible to other transactions on commit. Concurrent transactions are not
//! isolated from each other: the last commit replaces the whole state.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use bson::oid::ObjectId;
use eyre::{eyre, Result};
use log::info;
use model::{
    catalog::{Class, Room, Staff},
    class_session::{ClassSession, Resource},
    ids::DayId,
    session::Transaction,
};
use parking_lot::Mutex;

use crate::{Catalog, ScheduleStore};

type Sessions = BTreeMap<ObjectId, ClassSession>;

#[derive(Default)]
struct Inner {
    sessions: Sessions,
    reads: usize,
    fail_insert_at: Option<usize>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

pub struct MemoryTx {
    actor: ObjectId,
    inner: Arc<Mutex<Inner>>,
    staged: Option<Sessions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, actor: ObjectId) -> MemoryTx {
        MemoryTx {
            actor,
            inner: self.inner.clone(),
            staged: None,
        }
    }

    /// Committed sessions ordered by start.
    pub fn sessions(&self) -> Vec<ClassSession> {
        let mut sessions: Vec<_> = self.inner.lock().sessions.values().cloned().collect();
        sessions.sort_by_key(|s| (s.start_at, s.id));
        sessions
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of read queries served so far.
    pub fn reads(&self) -> usize {
        self.inner.lock().reads
    }

    /// Makes the next batch insert fail on its `nth` session, after the
    /// preceding ones were written.
    pub fn fail_insert_at(&self, nth: usize) {
        self.inner.lock().fail_insert_at = Some(nth);
    }

    fn read<R>(&self, tx: &MemoryTx, f: impl FnOnce(&Sessions) -> R) -> R {
        let mut inner = self.inner.lock();
        inner.reads += 1;
        match &tx.staged {
            Some(staged) => f(staged),
            None => f(&inner.sessions),
        }
    }

    fn write<R>(&self, tx: &mut MemoryTx, f: impl FnOnce(&mut Sessions) -> Result<R>) -> Result<R> {
        let mut inner = self.inner.lock();
        match &mut tx.staged {
            Some(staged) => f(staged),
            None => f(&mut inner.sessions),
        }
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    fn actor(&self) -> ObjectId {
        self.actor
    }

    async fn begin(&mut self) -> Result<()> {
        if self.staged.is_some() {
            return Err(eyre!("Transaction already in progress"));
        }
        self.staged = Some(self.inner.lock().sessions.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| eyre!("No transaction started"))?;
        self.inner.lock().sessions = staged;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.staged
            .take()
            .ok_or_else(|| eyre!("No transaction started"))?;
        Ok(())
    }
}

fn sorted<'a>(sessions: impl Iterator<Item = &'a ClassSession>) -> Vec<ClassSession> {
    let mut sessions: Vec<_> = sessions.cloned().collect();
    sessions.sort_by_key(|s| (s.start_at, s.id));
    sessions
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    type Tx = MemoryTx;

    async fn get(&self, session: &mut MemoryTx, id: ObjectId) -> Result<Option<ClassSession>> {
        Ok(self.read(session, |sessions| sessions.get(&id).cloned()))
    }

    async fn active_on_day(
        &self,
        session: &mut MemoryTx,
        resource: Resource,
        day: DayId,
    ) -> Result<Vec<ClassSession>> {
        Ok(self.read(session, |sessions| {
            sorted(
                sessions
                    .values()
                    .filter(|s| !s.is_canceled && s.uses(resource) && s.day_id() == day),
            )
        }))
    }

    async fn find_range(
        &self,
        session: &mut MemoryTx,
        from: DayId,
        to: DayId,
    ) -> Result<Vec<ClassSession>> {
        Ok(self.read(session, |sessions| {
            sorted(
                sessions
                    .values()
                    .filter(|s| s.start_at >= from.id() && s.start_at < to.id()),
            )
        }))
    }

    async fn insert_many(&self, session: &mut MemoryTx, batch: &[ClassSession]) -> Result<()> {
        info!("Insert sessions: {}", batch.len());
        let fail_at = self.inner.lock().fail_insert_at.take();
        self.write(session, |sessions| {
            for (idx, class_session) in batch.iter().enumerate() {
                if fail_at == Some(idx) {
                    return Err(eyre!("Failed to insert session {}", class_session.id));
                }
                if sessions.contains_key(&class_session.id) {
                    return Err(eyre!("Duplicate session id {}", class_session.id));
                }
                sessions.insert(class_session.id, class_session.clone());
            }
            Ok(())
        })
    }

    async fn update(&self, session: &mut MemoryTx, class_session: &ClassSession) -> Result<()> {
        info!("Update session: {:?}", class_session);
        self.write(session, |sessions| {
            let stored = sessions
                .get_mut(&class_session.id)
                .ok_or_else(|| eyre!("Session not found:{}", class_session.id))?;
            *stored = class_session.clone();
            Ok(())
        })
    }

    async fn set_cancel_flag(
        &self,
        session: &mut MemoryTx,
        id: ObjectId,
        flag: bool,
    ) -> Result<()> {
        info!("Set cancel flag: {} {}", id, flag);
        self.write(session, |sessions| {
            let stored = sessions
                .get_mut(&id)
                .ok_or_else(|| eyre!("Session not found:{}", id))?;
            stored.is_canceled = flag;
            Ok(())
        })
    }

    async fn delete(&self, session: &mut MemoryTx, id: ObjectId) -> Result<()> {
        info!("Delete session: {}", id);
        self.write(session, |sessions| {
            sessions
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| eyre!("Session not found:{}", id))
        })
    }
}

#[derive(Default)]
struct Directory {
    classes: HashMap<ObjectId, Class>,
    rooms: HashMap<ObjectId, Room>,
    staff: HashMap<ObjectId, Staff>,
}

#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<Mutex<Directory>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, name: &str, duration_min: u32) -> ObjectId {
        let class = Class {
            id: ObjectId::new(),
            name: name.to_string(),
            duration_min,
        };
        let id = class.id;
        self.inner.lock().classes.insert(id, class);
        id
    }

    pub fn add_room(&self, name: &str, capacity: u32) -> ObjectId {
        let room = Room {
            id: ObjectId::new(),
            name: name.to_string(),
            capacity,
        };
        let id = room.id;
        self.inner.lock().rooms.insert(id, room);
        id
    }

    pub fn add_trainer(&self, first_name: &str, last_name: &str) -> ObjectId {
        let staff = Staff {
            id: ObjectId::new(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let id = staff.id;
        self.inner.lock().staff.insert(id, staff);
        id
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn class(&self, id: ObjectId) -> Result<Option<Class>> {
        Ok(self.inner.lock().classes.get(&id).cloned())
    }

    async fn room(&self, id: ObjectId) -> Result<Option<Room>> {
        Ok(self.inner.lock().rooms.get(&id).cloned())
    }

    async fn trainer(&self, id: ObjectId) -> Result<Option<Staff>> {
        Ok(self.inner.lock().staff.get(&id).cloned())
    }
}
