//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings and enums as strings with ASSERT constraints. Per-tenant
//! uniqueness (idea number, idea slug, user email) is enforced by
//! composite UNIQUE indexes that lead with `tenant_id`.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD subdomain ON TABLE tenant TYPE string;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_subdomain ON TABLE tenant \
    COLUMNS subdomain UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['Visitor', 'Member', 'Administrator'];
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;

-- =======================================================================
-- Ideas (tenant scope)
-- =======================================================================
DEFINE TABLE idea SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE idea TYPE string;
DEFINE FIELD number ON TABLE idea TYPE int ASSERT $value > 0;
DEFINE FIELD title ON TABLE idea TYPE string;
DEFINE FIELD slug ON TABLE idea TYPE string;
DEFINE FIELD description ON TABLE idea TYPE string;
DEFINE FIELD user_id ON TABLE idea TYPE string;
DEFINE FIELD status ON TABLE idea TYPE string \
    ASSERT $value IN ['New', 'Started', 'Completed', 'Declined'];
DEFINE FIELD supporters ON TABLE idea TYPE int DEFAULT 0;
DEFINE FIELD response_text ON TABLE idea TYPE option<string>;
DEFINE FIELD response_user_id ON TABLE idea TYPE option<string>;
DEFINE FIELD responded_at ON TABLE idea TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE idea TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE idea TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_idea_tenant_number ON TABLE idea \
    COLUMNS tenant_id, number UNIQUE;
DEFINE INDEX idx_idea_tenant_slug ON TABLE idea \
    COLUMNS tenant_id, slug UNIQUE;

-- =======================================================================
-- Comments (tenant scope, per idea)
-- =======================================================================
DEFINE TABLE comment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE comment TYPE string;
DEFINE FIELD idea_id ON TABLE comment TYPE string;
DEFINE FIELD user_id ON TABLE comment TYPE string;
DEFINE FIELD content ON TABLE comment TYPE string;
DEFINE FIELD created_at ON TABLE comment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_comment_tenant_idea ON TABLE comment \
    COLUMNS tenant_id, idea_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Idea support (one edge per pair)
DEFINE TABLE supports TYPE RELATION SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE supports TYPE string;
DEFINE FIELD created_at ON TABLE supports TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_supports_pair ON TABLE supports \
    COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Highest applied migration version, or 0 on a fresh database.
///
/// Creates the `_migration` tracking table if it does not exist yet.
pub async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;

    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

/// Apply every migration newer than [`current_version`].
///
/// Each migration runs in one transaction together with the `_migration`
/// record that marks it applied.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    let current = current_version(db).await?;

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        debug!(version = current, "Schema is up to date");
        return Ok(());
    }

    for migration in pending {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let query = format!(
            "BEGIN TRANSACTION;\n{}\n\
             CREATE _migration SET version = $version, name = $name;\n\
             COMMIT TRANSACTION;",
            migration.sql
        );

        db.query(query)
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "v{} '{}': {e}",
                    migration.version, migration.name
                ))
            })?;
    }

    info!(version = latest_version(), "Migrations applied");

    Ok(())
}

/// Version the schema reaches once every migration is applied.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_table() {
        for table in ["tenant", "user", "idea", "comment", "supports"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} ")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn tenant_scoped_unique_indexes_lead_with_tenant_id() {
        assert!(SCHEMA_V1.contains("COLUMNS tenant_id, number UNIQUE"));
        assert!(SCHEMA_V1.contains("COLUMNS tenant_id, slug UNIQUE"));
        assert!(SCHEMA_V1.contains("COLUMNS tenant_id, email UNIQUE"));
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
