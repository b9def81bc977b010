use async_trait::async_trait;
use eyre::{eyre, Result};
use log::info;
use model::{
    class_session::{ClassSession, Resource},
    ids::DayId,
    session::Session,
};
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::FindOptions,
    Collection, Database, IndexModel, SessionCursor,
};

use crate::ScheduleStore;

const COLLECTION: &str = "sessions";

pub struct CalendarStore {
    pub(crate) store: Collection<ClassSession>,
}

impl CalendarStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let sessions = db.collection(COLLECTION);
        sessions
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "room": 1, "start_at": 1 })
                    .build(),
            )
            .await?;
        sessions
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "trainer": 1, "start_at": 1 })
                    .build(),
            )
            .await?;
        sessions
            .create_index(IndexModel::builder().keys(doc! { "start_at": 1 }).build())
            .await?;

        Ok(CalendarStore { store: sessions })
    }

    async fn collect(
        session: &mut Session,
        mut cursor: SessionCursor<ClassSession>,
    ) -> Result<Vec<ClassSession>> {
        let mut sessions = Vec::new();
        while let Some(class_session) = cursor.next(&mut *session).await {
            sessions.push(class_session?);
        }
        Ok(sessions)
    }

    async fn find_sorted(
        &self,
        session: &mut Session,
        filter: Document,
    ) -> Result<Vec<ClassSession>> {
        let options = FindOptions::builder()
            .sort(doc! { "start_at": 1, "_id": 1 })
            .build();
        let cursor = self
            .store
            .find(filter)
            .with_options(options)
            .session(&mut *session)
            .await?;
        Self::collect(session, cursor).await
    }
}

#[async_trait]
impl ScheduleStore for CalendarStore {
    type Tx = Session;

    async fn get(&self, session: &mut Session, id: ObjectId) -> Result<Option<ClassSession>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    async fn active_on_day(
        &self,
        session: &mut Session,
        resource: Resource,
        day: DayId,
    ) -> Result<Vec<ClassSession>> {
        let mut filter = doc! {
            "is_canceled": { "$ne": true },
            "start_at": {
                "$gte": day.id(),
                "$lt": day.next().id(),
            },
        };
        filter.insert(resource.field(), resource.id());
        self.find_sorted(session, filter).await
    }

    async fn find_range(
        &self,
        session: &mut Session,
        from: DayId,
        to: DayId,
    ) -> Result<Vec<ClassSession>> {
        let filter = doc! {
            "start_at": {
                "$gte": from.id(),
                "$lt": to.id(),
            }
        };
        self.find_sorted(session, filter).await
    }

    async fn insert_many(&self, session: &mut Session, sessions: &[ClassSession]) -> Result<()> {
        if sessions.is_empty() {
            return Ok(());
        }
        info!("Insert sessions: {}", sessions.len());
        let result = self
            .store
            .insert_many(sessions)
            .session(&mut *session)
            .await?;
        if result.inserted_ids.len() != sessions.len() {
            return Err(eyre!(
                "Inserted {} of {} sessions",
                result.inserted_ids.len(),
                sessions.len()
            ));
        }
        Ok(())
    }

    async fn update(&self, session: &mut Session, class_session: &ClassSession) -> Result<()> {
        info!("Update session: {:?}", class_session);
        let result = self
            .store
            .replace_one(doc! { "_id": class_session.id }, class_session)
            .session(&mut *session)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Session not found:{}", class_session.id));
        }
        Ok(())
    }

    async fn set_cancel_flag(&self, session: &mut Session, id: ObjectId, flag: bool) -> Result<()> {
        info!("Set cancel flag: {} {}", id, flag);
        let result = self
            .store
            .update_one(doc! { "_id": id }, doc! { "$set": { "is_canceled": flag } })
            .session(&mut *session)
            .await?;
        if result.matched_count != 1 {
            return Err(eyre!("Session not found:{}", id));
        }
        Ok(())
    }

    async fn delete(&self, session: &mut Session, id: ObjectId) -> Result<()> {
        info!("Delete session: {}", id);
        let result = self
            .store
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await?;
        if result.deleted_count != 1 {
            return Err(eyre!("Session not found:{}", id));
        }
        Ok(())
    }
}
