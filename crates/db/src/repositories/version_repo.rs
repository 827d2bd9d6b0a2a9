//! Repository for the `versions` table.
//!
//! Rows are append-only: there is no update, and deletion happens only when
//! an entity's whole history is purged.

use sqlx::PgPool;
use versionable_core::types::DbId;
use versionable_core::{EntityRef, NewVersion, Version};

use crate::models::version::VersionRow;

/// Column list for `versions` SELECT queries.
const COLUMNS: &str = "\
    id, entity_type, entity_id, action, user_id, reason, url, \
    ip_address, user_agent, model_data, additional_data, created_at, updated_at";

/// Provides insert, lookup, and purge operations for version records.
pub struct VersionRepo;

impl VersionRepo {
    /// Insert a new version, returning the stored row.
    pub async fn create(pool: &PgPool, input: &NewVersion) -> Result<Version, sqlx::Error> {
        let query = format!(
            "INSERT INTO versions \
                (entity_type, entity_id, action, user_id, reason, url, \
                 ip_address, user_agent, model_data, additional_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&input.entity.entity_type)
            .bind(input.entity.entity_id)
            .bind(input.action.as_str())
            .bind(input.user_id)
            .bind(&input.reason)
            .bind(&input.url)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(&input.model_data)
            .bind(&input.additional_data)
            .fetch_one(pool)
            .await?
            .try_into()
    }

    /// Find the newest version of an entity.
    pub async fn find_current(
        pool: &PgPool,
        entity: &EntityRef,
    ) -> Result<Option<Version>, sqlx::Error> {
        Self::find_nth_newest(pool, entity, 0).await
    }

    /// Find the version written just before the newest one.
    pub async fn find_previous(
        pool: &PgPool,
        entity: &EntityRef,
    ) -> Result<Option<Version>, sqlx::Error> {
        Self::find_nth_newest(pool, entity, 1).await
    }

    /// Find a version by id, scoped to its entity.
    pub async fn find_by_id(
        pool: &PgPool,
        entity: &EntityRef,
        id: DbId,
    ) -> Result<Option<Version>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE id = $1 AND entity_type = $2 AND entity_id = $3"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(id)
            .bind(&entity.entity_type)
            .bind(entity.entity_id)
            .fetch_optional(pool)
            .await?
            .map(Version::try_from)
            .transpose()
    }

    /// List versions of an entity, newest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Version>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&entity.entity_type)
            .bind(entity.entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(Version::try_from)
            .collect()
    }

    /// Count versions of an entity.
    pub async fn count_for_entity(pool: &PgPool, entity: &EntityRef) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM versions WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(&entity.entity_type)
        .bind(entity.entity_id)
        .fetch_one(pool)
        .await
    }

    /// Delete every version of an entity. Returns the number of rows removed.
    pub async fn delete_for_entity(pool: &PgPool, entity: &EntityRef) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM versions WHERE entity_type = $1 AND entity_id = $2")
                .bind(&entity.entity_type)
                .bind(entity.entity_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn find_nth_newest(
        pool: &PgPool,
        entity: &EntityRef,
        skip: i64,
    ) -> Result<Option<Version>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY id DESC \
             LIMIT 1 OFFSET $3"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&entity.entity_type)
            .bind(entity.entity_id)
            .bind(skip)
            .fetch_optional(pool)
            .await?
            .map(Version::try_from)
            .transpose()
    }
}
