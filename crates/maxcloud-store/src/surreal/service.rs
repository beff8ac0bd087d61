//! SurrealDB implementation of [`ServiceStore`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maxcloud_core::models::service::{
    DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DeployRequest, Service, ServiceStatus,
};
use maxcloud_core::store::ServiceStore;
use maxcloud_core::{Ctx, Error, Result};
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{SurrealStore, map_index_violation};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ServiceRow {
    org_id: Option<String>,
    name: String,
    image: String,
    status: String,
    url: String,
    port: Option<i64>,
    command: Vec<String>,
    args: Vec<String>,
    env_vars: serde_json::Value,
    min_scale: i64,
    max_scale: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ServiceRowWithId {
    record_id: String,
    org_id: Option<String>,
    name: String,
    image: String,
    status: String,
    url: String,
    port: Option<i64>,
    command: Vec<String>,
    args: Vec<String>,
    env_vars: serde_json::Value,
    min_scale: i64,
    max_scale: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_service(row: ServiceRow, id: Uuid) -> Result<Service> {
    let org_id = row
        .org_id
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| DbError::CorruptRow(format!("invalid org UUID: {e}")))?;
    let status = ServiceStatus::parse(&row.status)
        .ok_or_else(|| DbError::CorruptRow(format!("unknown service status: {}", row.status)))?;
    let port = row
        .port
        .map(u16::try_from)
        .transpose()
        .map_err(|e| DbError::CorruptRow(format!("port out of range: {e}")))?;
    let env_vars: BTreeMap<String, String> = serde_json::from_value(row.env_vars)
        .map_err(|e| DbError::CorruptRow(format!("invalid env_vars: {e}")))?;

    Ok(Service {
        id,
        org_id,
        name: row.name,
        image: row.image,
        status,
        url: row.url,
        port,
        command: row.command,
        args: row.args,
        env_vars,
        min_scale: row.min_scale as i32,
        max_scale: row.max_scale as i32,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl ServiceRowWithId {
    fn try_into_service(self) -> Result<Service> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::CorruptRow(format!("invalid UUID: {e}")))?;
        row_to_service(
            ServiceRow {
                org_id: self.org_id,
                name: self.name,
                image: self.image,
                status: self.status,
                url: self.url,
                port: self.port,
                command: self.command,
                args: self.args,
                env_vars: self.env_vars,
                min_scale: self.min_scale,
                max_scale: self.max_scale,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            id,
        )
    }
}

#[async_trait]
impl<C: Connection> ServiceStore for SurrealStore<C> {
    async fn create(&self, ctx: &Ctx, req: DeployRequest) -> Result<Service> {
        let id = Uuid::new_v4();
        let org_id = ctx.org_id();
        let now = Utc::now();

        // The unique index on (org_id, name) is the backstop; the
        // explicit check keeps the taxonomy clean for the common case.
        let mut existing = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM service WHERE name = $name AND org_id = $org_id")
            .bind(("name", req.name.clone()))
            .bind(("org_id", org_id.map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ServiceRowWithId> = existing.take(0).map_err(DbError::from)?;
        if !rows.is_empty() {
            return Err(Error::DuplicateService);
        }

        let env_json = serde_json::to_value(&req.env_vars)
            .map_err(|e| Error::Internal(format!("encoding env_vars: {e}")))?;

        self.db
            .query(
                "CREATE type::record('service', $id) SET \
                 org_id = $org_id, \
                 name = $name, \
                 image = $image, \
                 status = 'pending', \
                 url = '', \
                 port = $port, \
                 command = $command, \
                 args = $args, \
                 env_vars = $env_vars, \
                 min_scale = $min_scale, \
                 max_scale = $max_scale, \
                 created_at = $now, \
                 updated_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("org_id", org_id.map(|u| u.to_string())))
            .bind(("name", req.name.clone()))
            .bind(("image", req.image.clone()))
            .bind(("port", req.port.map(i64::from)))
            .bind(("command", req.command.clone()))
            .bind(("args", req.args.clone()))
            .bind(("env_vars", env_json))
            .bind(("min_scale", i64::from(DEFAULT_MIN_SCALE)))
            .bind(("max_scale", i64::from(DEFAULT_MAX_SCALE)))
            .bind(("now", now))
            .await
            .map_err(map_index_violation)?
            .check()
            .map_err(map_index_violation)?;

        Ok(Service {
            id,
            org_id,
            name: req.name,
            image: req.image,
            status: ServiceStatus::Pending,
            url: String::new(),
            port: req.port,
            command: req.command,
            args: req.args,
            env_vars: req.env_vars,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get(&self, ctx: &Ctx, id: Uuid) -> Result<Service> {
        let query = match ctx.org_id() {
            Some(_) => "SELECT * FROM type::record('service', $id) WHERE org_id = $org_id",
            None => "SELECT * FROM type::record('service', $id)",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("org_id", ctx.org_id().map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(Error::NotFound)?;
        row_to_service(row, id)
    }

    async fn get_by_name(&self, ctx: &Ctx, name: &str) -> Result<Service> {
        let query = match ctx.org_id() {
            Some(_) => {
                "SELECT meta::id(id) AS record_id, * FROM service \
                 WHERE name = $name AND org_id = $org_id"
            }
            None => "SELECT meta::id(id) AS record_id, * FROM service WHERE name = $name",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("name", name.to_string()))
            .bind(("org_id", ctx.org_id().map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(Error::NotFound)?;
        row.try_into_service()
    }

    async fn list(&self, ctx: &Ctx) -> Result<Vec<Service>> {
        let query = match ctx.org_id() {
            Some(_) => {
                "SELECT meta::id(id) AS record_id, * FROM service \
                 WHERE org_id = $org_id ORDER BY created_at ASC"
            }
            None => "SELECT meta::id(id) AS record_id, * FROM service ORDER BY created_at ASC",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("org_id", ctx.org_id().map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter().map(|r| r.try_into_service()).collect()
    }

    async fn delete(&self, ctx: &Ctx, id: Uuid) -> Result<()> {
        let query = match ctx.org_id() {
            Some(_) => {
                "DELETE type::record('service', $id) \
                 WHERE org_id = $org_id RETURN BEFORE"
            }
            None => "DELETE type::record('service', $id) RETURN BEFORE",
        };

        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("org_id", ctx.org_id().map(|u| u.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn update_status(
        &self,
        _ctx: &Ctx,
        id: Uuid,
        status: ServiceStatus,
        url: &str,
    ) -> Result<()> {
        // Only the reconciler calls this; no tenant filter applies.
        let mut sets = vec!["status = $status", "updated_at = time::now()"];
        if !url.is_empty() {
            sets.push("url = $url");
        }
        let query = format!(
            "UPDATE type::record('service', $id) SET {} RETURN AFTER",
            sets.join(", ")
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str()))
            .bind(("url", url.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
