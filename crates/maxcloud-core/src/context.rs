//! Tenant context threaded through every store and orchestrator call.
//!
//! Request handlers construct a tenant-scoped [`Ctx`] from the
//! authenticated API key; the reconciler and other internal callers use
//! the privileged form, which bypasses tenant filtering entirely.

use uuid::Uuid;

/// Identity of the caller for a single operation.
///
/// A `Ctx` with a tenant restricts every store operation to entities of
/// that organization. A `Ctx` without one observes all organizations;
/// this is reserved for the reconciler and startup code, never for
/// request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ctx {
    org_id: Option<Uuid>,
    user_id: Option<Uuid>,
}

impl Ctx {
    /// Context for an authenticated request.
    pub fn tenant(org_id: Uuid, user_id: Uuid) -> Self {
        Self {
            org_id: Some(org_id),
            user_id: Some(user_id),
        }
    }

    /// Context for internal callers (reconciler, startup). No tenant
    /// filter applies.
    pub fn privileged() -> Self {
        Self {
            org_id: None,
            user_id: None,
        }
    }

    pub fn org_id(&self) -> Option<Uuid> {
        self.org_id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_ctx_carries_both_ids() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let ctx = Ctx::tenant(org, user);
        assert_eq!(ctx.org_id(), Some(org));
        assert_eq!(ctx.user_id(), Some(user));
    }

    #[test]
    fn privileged_ctx_has_no_tenant() {
        let ctx = Ctx::privileged();
        assert_eq!(ctx.org_id(), None);
        assert_eq!(ctx.user_id(), None);
    }
}
