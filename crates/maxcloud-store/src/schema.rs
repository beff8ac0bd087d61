//! Schema definitions and the migration runner.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.
//!
//! Applied versions are recorded in `schema_migrations`; on startup
//! every migration whose version is not yet recorded is executed, and
//! the DDL plus its bookkeeping row go to the server as one request so
//! a migration is never applied without being recorded.

use std::collections::HashSet;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

/// Ordered list of `(version, name, ddl)` migrations. Append-only;
/// never renumber a shipped entry.
const MIGRATIONS: &[(u32, &str, &str)] = &[(1, "initial_schema", SCHEMA_V1)];

const SCHEMA_MIGRATIONS_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS schema_migrations SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE schema_migrations TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE schema_migrations TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE schema_migrations \
    TYPE datetime DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_schema_migrations_version \
    ON TABLE schema_migrations COLUMNS version UNIQUE;
";

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (tenancy root)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_name ON TABLE organization \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Users (global scope; linked to organizations via org_member)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Memberships (org <-> user with role)
-- =======================================================================
DEFINE TABLE org_member SCHEMAFULL;
DEFINE FIELD org_id ON TABLE org_member TYPE string;
DEFINE FIELD user_id ON TABLE org_member TYPE string;
DEFINE FIELD role ON TABLE org_member TYPE string \
    ASSERT $value IN ['admin', 'member'];
DEFINE FIELD created_at ON TABLE org_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_org_member_org_user ON TABLE org_member \
    COLUMNS org_id, user_id UNIQUE;

-- =======================================================================
-- API keys (hash + non-secret lookup prefix; raw key never stored)
-- =======================================================================
DEFINE TABLE api_key SCHEMAFULL;
DEFINE FIELD key_hash ON TABLE api_key TYPE string;
DEFINE FIELD prefix ON TABLE api_key TYPE string;
DEFINE FIELD name ON TABLE api_key TYPE string;
DEFINE FIELD org_id ON TABLE api_key TYPE string;
DEFINE FIELD user_id ON TABLE api_key TYPE string;
DEFINE FIELD created_at ON TABLE api_key TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD expires_at ON TABLE api_key TYPE option<datetime>;
DEFINE FIELD last_used_at ON TABLE api_key TYPE option<datetime>;
DEFINE INDEX idx_api_key_prefix ON TABLE api_key COLUMNS prefix;
DEFINE INDEX idx_api_key_prefix_hash ON TABLE api_key \
    COLUMNS prefix, key_hash UNIQUE;
DEFINE INDEX idx_api_key_org ON TABLE api_key COLUMNS org_id;

-- =======================================================================
-- Invitations (token follows the api_key hash/prefix shape)
-- =======================================================================
DEFINE TABLE invitation SCHEMAFULL;
DEFINE FIELD org_id ON TABLE invitation TYPE string;
DEFINE FIELD email ON TABLE invitation TYPE string;
DEFINE FIELD role ON TABLE invitation TYPE string \
    ASSERT $value IN ['admin', 'member'];
DEFINE FIELD status ON TABLE invitation TYPE string \
    ASSERT $value IN ['pending', 'accepted', 'expired', 'revoked'] \
    DEFAULT 'pending';
DEFINE FIELD token_hash ON TABLE invitation TYPE string;
DEFINE FIELD token_prefix ON TABLE invitation TYPE string;
DEFINE FIELD invited_by ON TABLE invitation TYPE string;
DEFINE FIELD expires_at ON TABLE invitation TYPE datetime;
DEFINE FIELD created_at ON TABLE invitation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invitation_prefix ON TABLE invitation \
    COLUMNS token_prefix;
DEFINE INDEX idx_invitation_prefix_hash ON TABLE invitation \
    COLUMNS token_prefix, token_hash UNIQUE;
DEFINE INDEX idx_invitation_org ON TABLE invitation COLUMNS org_id;

-- =======================================================================
-- Services (desired state; org_id NONE = unscoped namespace)
-- =======================================================================
DEFINE TABLE service SCHEMAFULL;
DEFINE FIELD org_id ON TABLE service TYPE option<string>;
DEFINE FIELD name ON TABLE service TYPE string;
DEFINE FIELD image ON TABLE service TYPE string;
DEFINE FIELD status ON TABLE service TYPE string \
    ASSERT $value IN ['pending', 'ready', 'failed', 'deleting'];
DEFINE FIELD url ON TABLE service TYPE string DEFAULT '';
DEFINE FIELD port ON TABLE service TYPE option<int>;
DEFINE FIELD command ON TABLE service TYPE array DEFAULT [];
DEFINE FIELD command.* ON TABLE service TYPE string;
DEFINE FIELD args ON TABLE service TYPE array DEFAULT [];
DEFINE FIELD args.* ON TABLE service TYPE string;
DEFINE FIELD env_vars ON TABLE service TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD min_scale ON TABLE service TYPE int DEFAULT 0;
DEFINE FIELD max_scale ON TABLE service TYPE int DEFAULT 10;
DEFINE FIELD created_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_org_name ON TABLE service \
    COLUMNS org_id, name UNIQUE;
";

// -----------------------------------------------------------------------
// Runner
// -----------------------------------------------------------------------

#[derive(Debug, SurrealValue)]
struct AppliedRow {
    version: u32,
}

/// Bring the schema up to date.
///
/// Ensures the `schema_migrations` ledger exists, then applies every
/// migration whose version it does not yet contain, in list order.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(SCHEMA_MIGRATIONS_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("creating schema_migrations: {e}")))?;

    let applied = applied_versions(db).await?;

    for &(version, name, ddl) in MIGRATIONS {
        if applied.contains(&version) {
            continue;
        }

        // DDL and bookkeeping row travel together; a partial apply
        // surfaces as an error here and is retried on next startup.
        db.query(ddl)
            .query(
                "CREATE schema_migrations SET version = $version, \
                 name = $name",
            )
            .bind(("version", version))
            .bind(("name", name))
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("applying '{name}' (v{version}): {e}")))?;

        info!(version, name, "schema migration applied");
    }

    Ok(())
}

async fn applied_versions<C: Connection>(db: &Surreal<C>) -> Result<HashSet<u32>, DbError> {
    let mut result = db.query("SELECT version FROM schema_migrations").await?;
    let rows: Vec<AppliedRow> = result.take(0)?;
    Ok(rows.into_iter().map(|row| row.version).collect())
}
