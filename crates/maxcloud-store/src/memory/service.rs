//! In-memory implementation of [`ServiceStore`].

use async_trait::async_trait;
use chrono::Utc;
use maxcloud_core::models::service::{
    DEFAULT_MAX_SCALE, DEFAULT_MIN_SCALE, DeployRequest, Service, ServiceStatus,
};
use maxcloud_core::store::ServiceStore;
use maxcloud_core::{Ctx, Error, Result};
use uuid::Uuid;

use super::MemoryStore;

#[async_trait]
impl ServiceStore for MemoryStore {
    async fn create(&self, ctx: &Ctx, req: DeployRequest) -> Result<Service> {
        let mut inner = self.inner.write().await;
        let org_id = ctx.org_id();

        // Name uniqueness is scoped to the organization; unscoped
        // services share the null-org namespace.
        if inner
            .services
            .values()
            .any(|svc| svc.name == req.name && svc.org_id == org_id)
        {
            return Err(Error::DuplicateService);
        }

        let now = Utc::now();
        let svc = Service {
            id: Uuid::new_v4(),
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
        };

        inner.services.insert(svc.id, svc.clone());
        Ok(svc)
    }

    async fn get(&self, ctx: &Ctx, id: Uuid) -> Result<Service> {
        let inner = self.inner.read().await;
        let svc = inner.services.get(&id).ok_or(Error::NotFound)?;
        if let Some(org_id) = ctx.org_id()
            && svc.org_id != Some(org_id)
        {
            return Err(Error::NotFound);
        }
        Ok(svc.clone())
    }

    async fn get_by_name(&self, ctx: &Ctx, name: &str) -> Result<Service> {
        let inner = self.inner.read().await;
        for svc in inner.services.values() {
            if svc.name == name {
                if let Some(org_id) = ctx.org_id()
                    && svc.org_id != Some(org_id)
                {
                    continue;
                }
                return Ok(svc.clone());
            }
        }
        Err(Error::NotFound)
    }

    async fn list(&self, ctx: &Ctx) -> Result<Vec<Service>> {
        let inner = self.inner.read().await;
        let mut result: Vec<Service> = inner
            .services
            .values()
            .filter(|svc| match ctx.org_id() {
                Some(org_id) => svc.org_id == Some(org_id),
                None => true,
            })
            .cloned()
            .collect();
        result.sort_by_key(|svc| svc.created_at);
        Ok(result)
    }

    async fn delete(&self, ctx: &Ctx, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        let svc = inner.services.get(&id).ok_or(Error::NotFound)?;
        if let Some(org_id) = ctx.org_id()
            && svc.org_id != Some(org_id)
        {
            return Err(Error::NotFound);
        }
        inner.services.remove(&id);
        Ok(())
    }

    async fn update_status(
        &self,
        _ctx: &Ctx,
        id: Uuid,
        status: ServiceStatus,
        url: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let svc = inner.services.get_mut(&id).ok_or(Error::NotFound)?;
        svc.status = status;
        if !url.is_empty() {
            svc.url = url.to_string();
        }
        svc.updated_at = Utc::now();
        Ok(())
    }
}
