use std::ops::Deref;

use bson::{doc, oid::ObjectId};
use eyre::{Context as _, Error};
use model::session::Session;
use mongodb::{Client, Database};

#[derive(Clone)]
pub struct Db {
    client: Client,
    db: Database,
}

impl Db {
    pub(crate) async fn new(uri: &str, db_name: &str) -> Result<Self, Error> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to connect to MongoDB")?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        Ok(Db { client, db })
    }

    /// Opens a client session acting on behalf of `actor`.
    pub async fn start_session(&self, actor: ObjectId) -> Result<Session, Error> {
        let client_session = self
            .client
            .start_session()
            .await
            .context("Failed to start session")?;
        Ok(Session::new(client_session, actor))
    }
}

impl Deref for Db {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}
