//! SurrealDB implementation of [`AuthStore`].
//!
//! Multi-entity writes (`register`, `accept_invite`) run as single
//! BEGIN/COMMIT TRANSACTION scripts so their effects commit together.
//! Credential lookups go through the non-secret prefix index and a
//! constant-time hash comparison over every candidate.

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
use surrealdb::Connection;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{SurrealStore, map_index_violation};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OrgRow {
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct MemberRow {
    role: String,
}

#[derive(Debug, SurrealValue)]
struct ApiKeyRow {
    key_hash: String,
    prefix: String,
    name: String,
    org_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct ApiKeyRowWithId {
    record_id: String,
    key_hash: String,
    prefix: String,
    name: String,
    org_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct InvitationRow {
    org_id: String,
    email: String,
    role: String,
    status: String,
    token_hash: String,
    token_prefix: String,
    invited_by: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct InvitationRowWithId {
    record_id: String,
    org_id: String,
    email: String,
    role: String,
    status: String,
    token_hash: String,
    token_prefix: String,
    invited_by: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::CorruptRow(format!("invalid {what} UUID: {e}")).into())
}

impl ApiKeyRowWithId {
    fn try_into_info(self) -> Result<ApiKeyInfo> {
        Ok(ApiKeyInfo {
            id: parse_uuid(&self.record_id, "key")?,
            prefix: self.prefix,
            name: self.name,
            org_id: parse_uuid(&self.org_id, "org")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            created_at: self.created_at,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
        })
    }
}

impl InvitationRowWithId {
    fn try_into_invitation(self, org_name: String) -> Result<Invitation> {
        let role = OrgRole::parse(&self.role)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown role: {}", self.role)))?;
        let status = InviteStatus::parse(&self.status)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown invite status: {}", self.status)))?;
        Ok(Invitation {
            id: parse_uuid(&self.record_id, "invite")?,
            org_id: parse_uuid(&self.org_id, "org")?,
            org_name,
            email: self.email,
            role,
            status,
            invited_by: parse_uuid(&self.invited_by, "inviter")?,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

impl<C: Connection> SurrealStore<C> {
    async fn get_organization(&self, org_id: Uuid) -> Result<Organization> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('organization', $id)")
            .bind(("id", org_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<OrgRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or(Error::NotFound)?;
        Ok(Organization {
            id: org_id,
            name: row.name,
            created_at: row.created_at,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(User {
                id: parse_uuid(&row.record_id, "user")?,
                email: row.email,
                created_at: row.created_at,
            })),
            None => Ok(None),
        }
    }

    async fn membership_role(&self, org_id: Uuid, user_id: Uuid) -> Result<Option<OrgRole>> {
        let mut result = self
            .db
            .query("SELECT role FROM org_member WHERE org_id = $org_id AND user_id = $user_id")
            .bind(("org_id", org_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => {
                let role = OrgRole::parse(&row.role)
                    .ok_or_else(|| DbError::CorruptRow(format!("unknown role: {}", row.role)))?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<C: Connection> AuthStore for SurrealStore<C> {
    async fn register(&self, _ctx: &Ctx, email: &str, org_name: &str) -> Result<Registration> {
        // The explicit pre-checks keep the taxonomy exact; the unique
        // indexes inside the transaction are the backstop under races.
        if self.find_user_by_email(email).await?.is_some() {
            return Err(Error::DuplicateEmail);
        }

        let now = Utc::now();
        let org_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();
        let key_id = Uuid::new_v4();
        let key = credential::generate(Kind::ApiKey);

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('organization', $org_id) SET \
                     name = $org_name, created_at = $now; \
                 CREATE type::record('user', $user_id) SET \
                     email = $email, created_at = $now; \
                 CREATE type::record('org_member', $member_id) SET \
                     org_id = $org_id, user_id = $user_id, \
                     role = 'admin', created_at = $now; \
                 CREATE type::record('api_key', $key_id) SET \
                     key_hash = $key_hash, prefix = $key_prefix, \
                     name = 'default', org_id = $org_id, \
                     user_id = $user_id, created_at = $now; \
                 COMMIT TRANSACTION;",
            )
            .bind(("org_id", org_id.to_string()))
            .bind(("org_name", org_name.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("email", email.to_string()))
            .bind(("member_id", member_id.to_string()))
            .bind(("key_id", key_id.to_string()))
            .bind(("key_hash", key.hash))
            .bind(("key_prefix", key.prefix))
            .bind(("now", now))
            .await
            .map_err(map_index_violation)?
            .check()
            .map_err(map_index_violation)?;

        Ok(Registration {
            user: User {
                id: user_id,
                email: email.to_string(),
                created_at: now,
            },
            organization: Organization {
                id: org_id,
                name: org_name.to_string(),
                created_at: now,
            },
            raw_api_key: key.raw,
        })
    }

    async fn validate_api_key(&self, _ctx: &Ctx, raw_key: &str) -> Result<ApiKeyInfo> {
        let prefix =
            credential::parse_prefix(Kind::ApiKey, raw_key).map_err(|_| Error::KeyNotFound)?;
        let hash = credential::hash(raw_key);

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM api_key WHERE prefix = $prefix")
            .bind(("prefix", prefix.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ApiKeyRowWithId> = result.take(0).map_err(DbError::from)?;

        for row in rows {
            if credential::verify(&row.key_hash, &hash) {
                if let Some(expires_at) = row.expires_at
                    && expires_at < Utc::now()
                {
                    return Err(Error::KeyNotFound);
                }
                return row.try_into_info();
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
        let now = Utc::now();
        let id = Uuid::new_v4();
        let key = credential::generate(Kind::ApiKey);

        self.db
            .query(
                "CREATE type::record('api_key', $id) SET \
                 key_hash = $key_hash, prefix = $prefix, name = $name, \
                 org_id = $org_id, user_id = $user_id, created_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("key_hash", key.hash))
            .bind(("prefix", key.prefix.clone()))
            .bind(("name", name.to_string()))
            .bind(("org_id", org_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let info = ApiKeyInfo {
            id,
            prefix: key.prefix,
            name: name.to_string(),
            org_id,
            user_id,
            created_at: now,
            expires_at: None,
            last_used_at: None,
        };
        Ok((key.raw, info))
    }

    async fn list_api_keys(&self, _ctx: &Ctx, org_id: Uuid) -> Result<Vec<ApiKeyInfo>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM api_key \
                 WHERE org_id = $org_id ORDER BY created_at ASC",
            )
            .bind(("org_id", org_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<ApiKeyRowWithId> = result.take(0).map_err(DbError::from)?;
        rows.into_iter().map(|r| r.try_into_info()).collect()
    }

    async fn delete_api_key(&self, _ctx: &Ctx, org_id: Uuid, key_id: Uuid) -> Result<()> {
        let mut result = self
            .db
            .query(
                "DELETE type::record('api_key', $id) \
                 WHERE org_id = $org_id RETURN BEFORE",
            )
            .bind(("id", key_id.to_string()))
            .bind(("org_id", org_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            // Absent and wrong-owner are indistinguishable by design.
            return Err(Error::KeyNotFound);
        }
        Ok(())
    }

    async fn update_api_key_last_used(&self, _ctx: &Ctx, key_id: Uuid) -> Result<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('api_key', $id) \
                 SET last_used_at = time::now() RETURN AFTER",
            )
            .bind(("id", key_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(Error::KeyNotFound);
        }
        Ok(())
    }

    async fn get_auth_info(&self, _ctx: &Ctx, org_id: Uuid, user_id: Uuid) -> Result<AuthInfo> {
        let organization = self.get_organization(org_id).await?;

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let user_row = rows.into_iter().next().ok_or(Error::NotFound)?;

        let role = self
            .membership_role(org_id, user_id)
            .await?
            .ok_or(Error::NotFound)?;

        Ok(AuthInfo {
            user: User {
                id: user_id,
                email: user_row.email,
                created_at: user_row.created_at,
            },
            organization,
            role,
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
        if let Some(user) = self.find_user_by_email(email).await?
            && self.membership_role(org_id, user.id).await?.is_some()
        {
            return Err(Error::AlreadyMember);
        }

        let organization = self.get_organization(org_id).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let token = credential::generate(Kind::InviteToken);

        self.db
            .query(
                "CREATE type::record('invitation', $id) SET \
                 org_id = $org_id, email = $email, role = $role, \
                 status = 'pending', token_hash = $token_hash, \
                 token_prefix = $token_prefix, invited_by = $invited_by, \
                 expires_at = $expires_at, created_at = $now",
            )
            .bind(("id", id.to_string()))
            .bind(("org_id", org_id.to_string()))
            .bind(("email", email.to_string()))
            .bind(("role", role.as_str()))
            .bind(("token_hash", token.hash))
            .bind(("token_prefix", token.prefix))
            .bind(("invited_by", invited_by.to_string()))
            .bind(("expires_at", expires_at))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let invitation = Invitation {
            id,
            org_id,
            org_name: organization.name,
            email: email.to_string(),
            role,
            status: InviteStatus::Pending,
            invited_by,
            expires_at,
            created_at: now,
        };
        Ok((invitation, token.raw))
    }

    async fn accept_invite(&self, _ctx: &Ctx, raw_token: &str) -> Result<AcceptedInvite> {
        let prefix = credential::parse_prefix(Kind::InviteToken, raw_token)
            .map_err(|_| Error::InviteNotFound)?;
        let token_hash = credential::hash(raw_token);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 WHERE token_prefix = $prefix",
            )
            .bind(("prefix", prefix.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;

        let row = rows
            .into_iter()
            .find(|row| credential::verify(&row.token_hash, &token_hash))
            .ok_or(Error::InviteNotFound)?;

        if row.status != InviteStatus::Pending.as_str() {
            return Err(Error::InviteNotFound);
        }

        let invite_id = parse_uuid(&row.record_id, "invite")?;
        let org_id = parse_uuid(&row.org_id, "org")?;
        let role = OrgRole::parse(&row.role)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown role: {}", row.role)))?;

        if Utc::now() > row.expires_at {
            self.db
                .query("UPDATE type::record('invitation', $id) SET status = 'expired'")
                .bind(("id", invite_id.to_string()))
                .await
                .map_err(DbError::from)?;
            return Err(Error::InviteExpired);
        }

        let now = Utc::now();
        let member_id = Uuid::new_v4();
        let key_id = Uuid::new_v4();
        let key = credential::generate(Kind::ApiKey);

        // Find-or-create the user, then commit membership + key +
        // status flip together. The unique indexes backstop races
        // between the lookup and the transaction.
        let user = match self.find_user_by_email(&row.email).await? {
            Some(user) => {
                self.db
                    .query(
                        "BEGIN TRANSACTION; \
                         CREATE type::record('org_member', $member_id) SET \
                             org_id = $org_id, user_id = $user_id, \
                             role = $role, created_at = $now; \
                         CREATE type::record('api_key', $key_id) SET \
                             key_hash = $key_hash, prefix = $key_prefix, \
                             name = 'default', org_id = $org_id, \
                             user_id = $user_id, created_at = $now; \
                         UPDATE type::record('invitation', $invite_id) SET \
                             status = 'accepted'; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("member_id", member_id.to_string()))
                    .bind(("org_id", org_id.to_string()))
                    .bind(("user_id", user.id.to_string()))
                    .bind(("role", role.as_str()))
                    .bind(("key_id", key_id.to_string()))
                    .bind(("key_hash", key.hash))
                    .bind(("key_prefix", key.prefix))
                    .bind(("invite_id", invite_id.to_string()))
                    .bind(("now", now))
                    .await
                    .map_err(map_index_violation)?
                    .check()
                    .map_err(map_index_violation)?;
                user
            }
            None => {
                let user_id = Uuid::new_v4();
                self.db
                    .query(
                        "BEGIN TRANSACTION; \
                         CREATE type::record('user', $user_id) SET \
                             email = $email, created_at = $now; \
                         CREATE type::record('org_member', $member_id) SET \
                             org_id = $org_id, user_id = $user_id, \
                             role = $role, created_at = $now; \
                         CREATE type::record('api_key', $key_id) SET \
                             key_hash = $key_hash, prefix = $key_prefix, \
                             name = 'default', org_id = $org_id, \
                             user_id = $user_id, created_at = $now; \
                         UPDATE type::record('invitation', $invite_id) SET \
                             status = 'accepted'; \
                         COMMIT TRANSACTION;",
                    )
                    .bind(("user_id", user_id.to_string()))
                    .bind(("email", row.email.clone()))
                    .bind(("member_id", member_id.to_string()))
                    .bind(("org_id", org_id.to_string()))
                    .bind(("role", role.as_str()))
                    .bind(("key_id", key_id.to_string()))
                    .bind(("key_hash", key.hash))
                    .bind(("key_prefix", key.prefix))
                    .bind(("invite_id", invite_id.to_string()))
                    .bind(("now", now))
                    .await
                    .map_err(map_index_violation)?
                    .check()
                    .map_err(map_index_violation)?;
                User {
                    id: user_id,
                    email: row.email.clone(),
                    created_at: now,
                }
            }
        };

        let organization = self.get_organization(org_id).await?;

        Ok(AcceptedInvite {
            user,
            organization,
            role,
            raw_api_key: key.raw,
        })
    }

    async fn list_invites(&self, _ctx: &Ctx, org_id: Uuid) -> Result<Vec<Invitation>> {
        let organization = self.get_organization(org_id).await?;

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM invitation \
                 WHERE org_id = $org_id AND status = 'pending' \
                 ORDER BY created_at ASC",
            )
            .bind(("org_id", org_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<InvitationRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|r| r.try_into_invitation(organization.name.clone()))
            .collect()
    }

    async fn revoke_invite(&self, _ctx: &Ctx, org_id: Uuid, invite_id: Uuid) -> Result<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('invitation', $id) SET status = 'revoked' \
                 WHERE org_id = $org_id AND status = 'pending' RETURN AFTER",
            )
            .bind(("id", invite_id.to_string()))
            .bind(("org_id", org_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InvitationRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            // Absent, wrong org, and already terminal are indistinguishable.
            return Err(Error::InviteNotFound);
        }
        Ok(())
    }

    async fn get_user_by_email(&self, _ctx: &Ctx, email: &str) -> Result<User> {
        self.find_user_by_email(email).await?.ok_or(Error::NotFound)
    }

    async fn ensure_dev_org(&self, _ctx: &Ctx, org_id: Uuid) -> Result<()> {
        if self.get_organization(org_id).await.is_ok() {
            return Ok(());
        }

        let created = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = 'dev-org', created_at = time::now()",
            )
            .bind(("id", org_id.to_string()))
            .await
            .map_err(map_index_violation)
            .and_then(|r| r.check().map_err(map_index_violation));

        match created {
            Ok(_) | Err(Error::DuplicateOrg) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
