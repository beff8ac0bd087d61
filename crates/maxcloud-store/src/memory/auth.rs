//! In-memory implementation of [`AuthStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maxcloud_core::credential::{self, Kind};
use maxcloud_core::models::api_key::ApiKeyInfo;
use maxcloud_core::models::invitation::{InviteStatus, Invitation};
use maxcloud_core::models::membership::{AuthInfo, OrgRole};
use maxcloud_core::models::organization::Organization;
use maxcloud_core::models::user::User;
use maxcloud_core::store::{AcceptedInvite, AuthStore, Registration};
use maxcloud_core::{Ctx, Error, Result};
use uuid::Uuid;

use super::{ApiKeyEntry, InviteTokenEntry, MemoryStore};

#[async_trait]
impl AuthStore for MemoryStore {
    async fn register(&self, _ctx: &Ctx, email: &str, org_name: &str) -> Result<Registration> {
        let mut inner = self.inner.write().await;

        if inner.email_index.contains_key(email) {
            return Err(Error::DuplicateEmail);
        }
        if inner.org_name_index.contains(org_name) {
            return Err(Error::DuplicateOrg);
        }

        let now = Utc::now();

        let organization = Organization {
            id: Uuid::new_v4(),
            name: org_name.to_string(),
            created_at: now,
        };
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: now,
        };

        let key = credential::generate(Kind::ApiKey);
        let info = ApiKeyInfo {
            id: Uuid::new_v4(),
            prefix: key.prefix.clone(),
            name: "default".to_string(),
            org_id: organization.id,
            user_id: user.id,
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };

        inner.orgs.insert(organization.id, organization.clone());
        inner.users.insert(user.id, user.clone());
        inner
            .org_members
            .entry(organization.id)
            .or_default()
            .insert(user.id, OrgRole::Admin);
        inner
            .api_keys
            .entry(key.prefix)
            .or_default()
            .push(ApiKeyEntry {
                info,
                hash: key.hash,
            });
        inner.email_index.insert(email.to_string(), user.id);
        inner.org_name_index.insert(org_name.to_string());

        Ok(Registration {
            user,
            organization,
            raw_api_key: key.raw,
        })
    }

    async fn validate_api_key(&self, _ctx: &Ctx, raw_key: &str) -> Result<ApiKeyInfo> {
        let prefix =
            credential::parse_prefix(Kind::ApiKey, raw_key).map_err(|_| Error::KeyNotFound)?;
        let hash = credential::hash(raw_key);

        let inner = self.inner.read().await;
        let entries = inner.api_keys.get(prefix).ok_or(Error::KeyNotFound)?;

        for entry in entries {
            if credential::verify(&entry.hash, &hash) {
                if let Some(expires_at) = entry.info.expires_at
                    && expires_at < Utc::now()
                {
                    return Err(Error::KeyNotFound);
                }
                return Ok(entry.info.clone());
            }
        }

        Err(Error::KeyNotFound)
    }

    async fn create_api_key(
        &self,
        _ctx: &Ctx,
        org_id: Uuid,
        user_id: Uuid,
        name: &str,
    ) -> Result<(String, ApiKeyInfo)> {
        let key = credential::generate(Kind::ApiKey);

        let mut inner = self.inner.write().await;
        let info = ApiKeyInfo {
            id: Uuid::new_v4(),
            prefix: key.prefix.clone(),
            name: name.to_string(),
            org_id,
            user_id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        inner
            .api_keys
            .entry(key.prefix)
            .or_default()
            .push(ApiKeyEntry {
                info: info.clone(),
                hash: key.hash,
            });

        Ok((key.raw, info))
    }

    async fn list_api_keys(&self, _ctx: &Ctx, org_id: Uuid) -> Result<Vec<ApiKeyInfo>> {
        let inner = self.inner.read().await;
        let mut result: Vec<ApiKeyInfo> = inner
            .api_keys
            .values()
            .flatten()
            .filter(|entry| entry.info.org_id == org_id)
            .map(|entry| entry.info.clone())
            .collect();
        result.sort_by_key(|info| info.created_at);
        Ok(result)
    }

    async fn delete_api_key(&self, _ctx: &Ctx, org_id: Uuid, key_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;

        for entries in inner.api_keys.values_mut() {
            if let Some(idx) = entries
                .iter()
                .position(|e| e.info.id == key_id && e.info.org_id == org_id)
            {
                entries.remove(idx);
                return Ok(());
            }
        }

        // Absent and wrong-owner are indistinguishable by design.
        Err(Error::KeyNotFound)
    }

    async fn update_api_key_last_used(&self, _ctx: &Ctx, key_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;

        for entries in inner.api_keys.values_mut() {
            if let Some(entry) = entries.iter_mut().find(|e| e.info.id == key_id) {
                entry.info.last_used_at = Some(Utc::now());
                return Ok(());
            }
        }

        Err(Error::KeyNotFound)
    }

    async fn get_auth_info(&self, _ctx: &Ctx, org_id: Uuid, user_id: Uuid) -> Result<AuthInfo> {
        let inner = self.inner.read().await;

        let organization = inner.orgs.get(&org_id).ok_or(Error::NotFound)?;
        let user = inner.users.get(&user_id).ok_or(Error::NotFound)?;
        let role = inner
            .org_members
            .get(&org_id)
            .and_then(|members| members.get(&user_id))
            .ok_or(Error::NotFound)?;

        Ok(AuthInfo {
            user: user.clone(),
            organization: organization.clone(),
            role: *role,
        })
    }

    async fn create_invite(
        &self,
        _ctx: &Ctx,
        org_id: Uuid,
        email: &str,
        role: OrgRole,
        invited_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(Invitation, String)> {
        let mut inner = self.inner.write().await;

        if let Some(user_id) = inner.email_index.get(email)
            && inner
                .org_members
                .get(&org_id)
                .is_some_and(|members| members.contains_key(user_id))
        {
            return Err(Error::AlreadyMember);
        }

        let organization = inner.orgs.get(&org_id).ok_or(Error::NotFound)?.clone();

        let token = credential::generate(Kind::InviteToken);
        let invitation = Invitation {
            id: Uuid::new_v4(),
            org_id,
            org_name: organization.name,
            email: email.to_string(),
            role,
            status: InviteStatus::Pending,
            invited_by,
            expires_at,
            created_at: Utc::now(),
        };

        inner.invitations.insert(invitation.id, invitation.clone());
        inner
            .invite_tokens
            .entry(token.prefix)
            .or_default()
            .push(InviteTokenEntry {
                invite_id: invitation.id,
                hash: token.hash,
            });

        Ok((invitation, token.raw))
    }

    async fn accept_invite(&self, _ctx: &Ctx, raw_token: &str) -> Result<AcceptedInvite> {
        let prefix = credential::parse_prefix(Kind::InviteToken, raw_token)
            .map_err(|_| Error::InviteNotFound)?;
        let token_hash = credential::hash(raw_token);

        let mut inner = self.inner.write().await;

        let entries = inner.invite_tokens.get(prefix).ok_or(Error::InviteNotFound)?;
        let invite_id = entries
            .iter()
            .find(|entry| credential::verify(&entry.hash, &token_hash))
            .map(|entry| entry.invite_id)
            .ok_or(Error::InviteNotFound)?;

        let invite = inner
            .invitations
            .get(&invite_id)
            .cloned()
            .ok_or(Error::InviteNotFound)?;

        if invite.status != InviteStatus::Pending {
            return Err(Error::InviteNotFound);
        }

        if Utc::now() > invite.expires_at {
            if let Some(stored) = inner.invitations.get_mut(&invite_id) {
                stored.status = InviteStatus::Expired;
            }
            return Err(Error::InviteExpired);
        }

        // Find or create the user.
        let user = match inner.email_index.get(&invite.email) {
            Some(user_id) => inner.users[user_id].clone(),
            None => {
                let user = User {
                    id: Uuid::new_v4(),
                    email: invite.email.clone(),
                    created_at: Utc::now(),
                };
                inner.users.insert(user.id, user.clone());
                inner.email_index.insert(user.email.clone(), user.id);
                user
            }
        };

        inner
            .org_members
            .entry(invite.org_id)
            .or_default()
            .insert(user.id, invite.role);

        let key = credential::generate(Kind::ApiKey);
        let info = ApiKeyInfo {
            id: Uuid::new_v4(),
            prefix: key.prefix.clone(),
            name: "default".to_string(),
            org_id: invite.org_id,
            user_id: user.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        inner
            .api_keys
            .entry(key.prefix)
            .or_default()
            .push(ApiKeyEntry {
                info,
                hash: key.hash,
            });

        if let Some(stored) = inner.invitations.get_mut(&invite_id) {
            stored.status = InviteStatus::Accepted;
        }

        let organization = inner
            .orgs
            .get(&invite.org_id)
            .cloned()
            .ok_or(Error::NotFound)?;

        Ok(AcceptedInvite {
            user,
            organization,
            role: invite.role,
            raw_api_key: key.raw,
        })
    }

    async fn list_invites(&self, _ctx: &Ctx, org_id: Uuid) -> Result<Vec<Invitation>> {
        let inner = self.inner.read().await;
        let mut result: Vec<Invitation> = inner
            .invitations
            .values()
            .filter(|inv| inv.org_id == org_id && inv.status == InviteStatus::Pending)
            .cloned()
            .collect();
        result.sort_by_key(|inv| inv.created_at);
        Ok(result)
    }

    async fn revoke_invite(&self, _ctx: &Ctx, org_id: Uuid, invite_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;

        let invite = inner
            .invitations
            .get_mut(&invite_id)
            .ok_or(Error::InviteNotFound)?;
        if invite.org_id != org_id || invite.status != InviteStatus::Pending {
            // Wrong org and already-terminal are indistinguishable.
            return Err(Error::InviteNotFound);
        }

        invite.status = InviteStatus::Revoked;
        Ok(())
    }

    async fn get_user_by_email(&self, _ctx: &Ctx, email: &str) -> Result<User> {
        let inner = self.inner.read().await;
        let user_id = inner.email_index.get(email).ok_or(Error::NotFound)?;
        Ok(inner.users[user_id].clone())
    }

    async fn ensure_dev_org(&self, _ctx: &Ctx, org_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orgs.contains_key(&org_id) {
            return Ok(());
        }
        inner.orgs.insert(
            org_id,
            Organization {
                id: org_id,
                name: "dev-org".to_string(),
                created_at: Utc::now(),
            },
        );
        inner.org_name_index.insert("dev-org".to_string());
        Ok(())
    }
}
