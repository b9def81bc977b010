pub mod calendar;
pub mod catalog;
pub mod memory;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use calendar::CalendarStore;
use catalog::CatalogStore;
use eyre::Result;
use model::{
    catalog::{Class, Room, Staff},
    class_session::{ClassSession, Resource},
    ids::DayId,
    session::Transaction,
};
use mongodb::bson::oid::ObjectId;
use session::Db;

const DB_NAME: &str = "schedule_db";

/// Persistence of class sessions.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    type Tx: Transaction;

    async fn get(&self, session: &mut Self::Tx, id: ObjectId) -> Result<Option<ClassSession>>;

    /// Non-cancelled sessions holding `resource` that start on `day`, ordered by start.
    async fn active_on_day(
        &self,
        session: &mut Self::Tx,
        resource: Resource,
        day: DayId,
    ) -> Result<Vec<ClassSession>>;

    /// Sessions starting in `[from, to)`, ordered by start.
    async fn find_range(
        &self,
        session: &mut Self::Tx,
        from: DayId,
        to: DayId,
    ) -> Result<Vec<ClassSession>>;

    async fn insert_many(&self, session: &mut Self::Tx, sessions: &[ClassSession]) -> Result<()>;

    async fn update(&self, session: &mut Self::Tx, class_session: &ClassSession) -> Result<()>;

    async fn set_cancel_flag(&self, session: &mut Self::Tx, id: ObjectId, flag: bool)
        -> Result<()>;

    async fn delete(&self, session: &mut Self::Tx, id: ObjectId) -> Result<()>;
}

/// Read-only directory of classes, rooms and trainers.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn class(&self, id: ObjectId) -> Result<Option<Class>>;
    async fn room(&self, id: ObjectId) -> Result<Option<Room>>;
    async fn trainer(&self, id: ObjectId) -> Result<Option<Staff>>;
}

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub calendar: Arc<CalendarStore>,
    pub catalog: Arc<CatalogStore>,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        Self::with_db_name(uri, DB_NAME).await
    }

    pub async fn with_db_name(uri: &str, db_name: &str) -> Result<Self> {
        let db = Db::new(uri, db_name).await?;
        let calendar = CalendarStore::new(&db).await?;
        let catalog = CatalogStore::new(&db);

        Ok(Storage {
            db,
            calendar: Arc::new(calendar),
            catalog: Arc::new(catalog),
        })
    }
}
