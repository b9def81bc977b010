use std::{env::var, sync::Arc};

use dotenv::dotenv;
use eyre::{ContextCompat as _, Error};
use log::info;

const DEFAULT_MONGO_DB: &str = "schedule_db";
const DEFAULT_RUST_LOG: &str = "info";

#[derive(Clone)]
pub struct Env(Arc<EnvInner>);

#[derive(Clone)]
pub struct EnvInner {
    mongo_url: String,
    mongo_db: String,
    rust_log: String,
}

impl Env {
    pub fn mongo_url(&self) -> &str {
        &self.0.mongo_url
    }

    pub fn mongo_db(&self) -> &str {
        &self.0.mongo_db
    }

    pub fn rust_log(&self) -> &str {
        &self.0.rust_log
    }

    /// Reads `.env` if present, then the process environment.
    ///
    /// `RUST_LOG` is exported with its default so the logger sees it.
    pub fn load() -> Result<Env, Error> {
        if let Err(err) = dotenv() {
            info!("Failed to load .env file: {}", err);
        }
        let env = Self::from_vars(|key| var(key).ok())?;
        if var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", env.rust_log());
        }
        Ok(env)
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Env, Error> {
        Ok(Env(Arc::new(EnvInner {
            mongo_url: lookup("MONGO_URL").context("MONGO_URL is not set")?,
            mongo_db: lookup("MONGO_DB").unwrap_or_else(|| DEFAULT_MONGO_DB.to_string()),
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.to_string()),
        })))
    }
}
