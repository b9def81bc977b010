use async_trait::async_trait;
use eyre::Result;
use model::catalog::{Class, Room, Staff};
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection, Database,
};

use crate::Catalog;

/// Read-only view over the club directory collections.
pub struct CatalogStore {
    classes: Collection<Class>,
    rooms: Collection<Room>,
    staff: Collection<Staff>,
}

impl CatalogStore {
    pub(crate) fn new(db: &Database) -> Self {
        CatalogStore {
            classes: db.collection("classes"),
            rooms: db.collection("rooms"),
            staff: db.collection("staff"),
        }
    }
}

#[async_trait]
impl Catalog for CatalogStore {
    async fn class(&self, id: ObjectId) -> Result<Option<Class>> {
        Ok(self.classes.find_one(doc! { "_id": id }).await?)
    }

    async fn room(&self, id: ObjectId) -> Result<Option<Room>> {
        Ok(self.rooms.find_one(doc! { "_id": id }).await?)
    }

    async fn trainer(&self, id: ObjectId) -> Result<Option<Staff>> {
        Ok(self.staff.find_one(doc! { "_id": id }).await?)
    }
}
