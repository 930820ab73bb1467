// src/db/menu_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    db::store::{MenuCatalog, StoreError},
    models::inventory::{MenuItem, MenuItemRow, RecipeLine},
};

// Linha de receita com o ID do prato (só usada para agrupar)
#[derive(Debug, FromRow)]
struct RecipeRow {
    menu_item_id: Uuid,
    ingredient_id: Uuid,
    required_unit: Decimal,
    unit_symbol: String,
}

#[derive(Clone)]
pub struct MenuRepository {
    pool: PgPool,
}

impl MenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenuCatalog for MenuRepository {
    async fn find_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, description, price FROM menu_items WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let recipe_rows = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT menu_item_id, ingredient_id, required_unit, unit_symbol
            FROM menu_item_ingredients
            WHERE menu_item_id = ANY($1)
            ORDER BY menu_item_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut recipes: HashMap<Uuid, Vec<RecipeLine>> = HashMap::new();
        for r in recipe_rows {
            recipes.entry(r.menu_item_id).or_default().push(RecipeLine {
                ingredient_id: r.ingredient_id,
                required_unit: r.required_unit,
                unit_symbol: r.unit_symbol,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let recipe = recipes.remove(&row.id).unwrap_or_default();
                row.with_recipe(recipe)
            })
            .collect())
    }

    async fn find_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StoreError> {
        let mut items = self.find_menu_items(&[id]).await?;
        Ok(items.pop())
    }
}
