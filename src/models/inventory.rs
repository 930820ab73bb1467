// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Nível de estoque de um ingrediente ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    #[schema(example = 12.5)]
    pub unit: Decimal, // Nunca fica negativo: garantido no próprio decremento
    #[schema(example = 2)]
    pub warning_level: Decimal,
    #[schema(example = "kg")]
    pub unit_symbol: String,
}

// --- 2. Ingrediente (o recurso disputado pelos pedidos) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    #[schema(example = "Queijo")]
    pub name: String,
    #[sqlx(flatten)]
    pub stock_level: StockLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn is_below_warning(&self) -> bool {
        self.stock_level.unit <= self.stock_level.warning_level
    }
}

// --- 3. Linha da receita de um item do cardápio ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    #[schema(example = 0.2)]
    pub required_unit: Decimal, // Quanto do ingrediente uma unidade do prato consome
    #[schema(example = "kg")]
    pub unit_symbol: String,
}

// --- 4. Item do cardápio ---
// Pedidos guardam só o ID: o preço é lido no momento do pedido.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    #[schema(example = "Pizza Margherita")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 250)]
    pub price: Decimal,
    pub ingredients: Vec<RecipeLine>,
}

// Linha crua da tabela menu_items (sem a receita)
#[derive(Debug, Clone, FromRow)]
pub struct MenuItemRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

impl MenuItemRow {
    pub fn with_recipe(self, ingredients: Vec<RecipeLine>) -> MenuItem {
        MenuItem {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            ingredients,
        }
    }
}
