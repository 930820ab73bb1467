// src/db/inventory_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::store::{InventoryLedger, StoreError},
    models::inventory::Ingredient,
};

const INGREDIENT_COLUMNS: &str =
    "id, name, unit, warning_level, unit_symbol, created_at, updated_at";

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryLedger for InventoryRepository {
    async fn conditional_decrement(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError> {
        // A guarda `unit >= $2` e o decremento acontecem no MESMO UPDATE.
        // O Postgres serializa os UPDATEs concorrentes na mesma linha, então dois
        // pedidos nunca conseguem consumir o mesmo saldo.
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            UPDATE ingredients
            SET unit = unit - $2, updated_at = now()
            WHERE id = $1 AND unit >= $2
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(ingredient_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    async fn restore(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            UPDATE ingredients
            SET unit = unit + $2, updated_at = now()
            WHERE id = $1
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(ingredient_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    async fn find_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>, StoreError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1"
        ))
        .bind(ingredient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }
}
