//! Repository for the `accounts` table.

use shiftline_core::types::DbId;
use sqlx::PgPool;

use crate::models::Account;

pub struct AccountRepo;

impl AccountRepo {
    pub async fn create(pool: &PgPool, name: &str) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT id, name, created_at FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
