//! SurrealDB connection management.
//!
//! The server hands us the raw `DATABASE_URL` string; it is parsed
//! into host, credentials, and namespace/database selection here.
//! Connecting also brings the schema up to date, so a [`DbManager`]
//! is ready for queries the moment it exists.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Connection parameters for the durable store.
///
/// Built from a `DATABASE_URL` of the form
/// `ws://user:pass@host:port/namespace/database`; every component
/// except the host is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Host and port of the SurrealDB endpoint (e.g. `127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "maxcloud".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Parse a `DATABASE_URL` value.
    ///
    /// Accepted shapes, most specific first:
    /// `ws://user:pass@host:port/namespace/database`,
    /// `ws://host:port`, or a bare `host:port`.
    pub fn from_url(raw: &str) -> Result<Self, DbError> {
        let mut config = DbConfig::default();

        let rest = raw
            .strip_prefix("ws://")
            .or_else(|| raw.strip_prefix("surreal://"))
            .unwrap_or(raw);

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };

        let host = match authority.rsplit_once('@') {
            Some((credentials, host)) => {
                match credentials.split_once(':') {
                    Some((username, password)) => {
                        config.username = username.to_string();
                        config.password = password.to_string();
                    }
                    None => config.username = credentials.to_string(),
                }
                host
            }
            None => authority,
        };
        if host.is_empty() {
            return Err(DbError::BadUrl(raw.to_string()));
        }
        config.url = host.to_string();

        if let Some(path) = path {
            let mut segments = path.split('/').filter(|s| !s.is_empty());
            if let Some(namespace) = segments.next() {
                config.namespace = namespace.to_string();
            }
            if let Some(database) = segments.next() {
                config.database = database.to_string();
            }
            if segments.next().is_some() {
                return Err(DbError::BadUrl(raw.to_string()));
            }
        }

        Ok(config)
    }
}

/// A connected, migrated handle on the durable store.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect, authenticate, select the namespace/database, and apply
    /// any pending schema migrations.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        run_migrations(&db).await?;
        info!("database connected and schema up to date");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
