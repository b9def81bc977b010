use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use bson::oid::ObjectId;
use eyre::Result;
use mongodb::ClientSession;

/// Transaction boundary used by the `#[tx]` attribute.
#[async_trait]
pub trait Transaction: Send {
    /// The user on whose behalf the transaction runs.
    fn actor(&self) -> ObjectId;
    async fn begin(&mut self) -> Result<()>;
    async fn commit(&mut self) -> Result<()>;
    async fn abort(&mut self) -> Result<()>;
}

pub struct Session {
    client_session: ClientSession,
    actor: ObjectId,
}

impl Session {
    pub fn new(client_session: ClientSession, actor: ObjectId) -> Self {
        Session {
            client_session,
            actor,
        }
    }
}

#[async_trait]
impl Transaction for Session {
    fn actor(&self) -> ObjectId {
        self.actor
    }

    async fn begin(&mut self) -> Result<()> {
        self.client_session.start_transaction().await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.client_session.commit_transaction().await?;
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.client_session.abort_transaction().await?;
        Ok(())
    }
}

impl Deref for Session {
    type Target = ClientSession;

    fn deref(&self) -> &Self::Target {
        &self.client_session
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client_session
    }
}

impl<'a> From<&'a mut Session> for &'a mut ClientSession {
    fn from(session: &'a mut Session) -> &'a mut ClientSession {
        &mut session.client_session
    }
}
