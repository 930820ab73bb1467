// src/db/memory_repo.rs

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::store::{InventoryLedger, LineRemoval, MenuCatalog, OrderStore, StoreError},
    models::{
        inventory::{Ingredient, MenuItem, RecipeLine, StockLevel},
        order::{Order, OrderFilter, OrderLineItem, StatusChange},
    },
};

#[derive(Default)]
struct Collections {
    ingredients: HashMap<Uuid, Ingredient>,
    menu_items: HashMap<Uuid, MenuItem>,
    orders: HashMap<Uuid, Order>,
}

/// Armazenamento em memória com a mesma semântica do Postgres: cada
/// operação roda inteira dentro de um único lock, então o decremento
/// condicional continua sendo atômico.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Collections>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedIngredient {
    id: Uuid,
    name: String,
    stock_level: StockLevel,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedFile {
    #[serde(default)]
    ingredients: Vec<SeedIngredient>,
    #[serde(default)]
    menu_items: Vec<MenuItem>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carrega ingredientes e cardápio de um arquivo JSON.
    pub async fn seed_from_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let seed: SeedFile = serde_json::from_str(&raw)?;

        let (n_ingredients, n_items) = (seed.ingredients.len(), seed.menu_items.len());
        for i in seed.ingredients {
            self.put_ingredient(i.id, &i.name, i.stock_level).await;
        }
        let mut inner = self.inner.lock().await;
        for item in seed.menu_items {
            inner.menu_items.insert(item.id, item);
        }

        tracing::info!("🌱 Seed carregado: {} ingredientes, {} itens do cardápio", n_ingredients, n_items);
        Ok(())
    }

    pub async fn put_ingredient(&self, id: Uuid, name: &str, stock_level: StockLevel) -> Ingredient {
        let now = Utc::now();
        let ingredient = Ingredient {
            id,
            name: name.to_string(),
            stock_level,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.ingredients.insert(id, ingredient.clone());
        ingredient
    }

    pub async fn put_menu_item(
        &self,
        name: &str,
        price: Decimal,
        ingredients: Vec<RecipeLine>,
    ) -> MenuItem {
        let item = MenuItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            price,
            ingredients,
        };
        self.inner.lock().await.menu_items.insert(item.id, item.clone());
        item
    }

    /// Troca o preço de um item (o pedido não guarda cópia do preço).
    pub async fn set_menu_price(&self, id: Uuid, price: Decimal) -> bool {
        match self.inner.lock().await.menu_items.get_mut(&id) {
            Some(item) => {
                item.price = price;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl InventoryLedger for InMemoryStore {
    async fn conditional_decrement(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(ingredient) = inner.ingredients.get_mut(&ingredient_id) else {
            return Ok(None);
        };
        if ingredient.stock_level.unit < amount {
            return Ok(None);
        }
        ingredient.stock_level.unit -= amount;
        ingredient.updated_at = Utc::now();
        Ok(Some(ingredient.clone()))
    }

    async fn restore(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.ingredients.get_mut(&ingredient_id).map(|ingredient| {
            ingredient.stock_level.unit += amount;
            ingredient.updated_at = Utc::now();
            ingredient.clone()
        }))
    }

    async fn find_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>, StoreError> {
        Ok(self.inner.lock().await.ingredients.get(&ingredient_id).cloned())
    }
}

#[async_trait]
impl MenuCatalog for InMemoryStore {
    async fn find_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(ids.iter().filter_map(|id| inner.menu_items.get(id).cloned()).collect())
    }

    async fn find_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StoreError> {
        Ok(self.inner.lock().await.menu_items.get(&id).cloned())
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<Order, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.orders.contains_key(&order.id) {
            return Err(StoreError::Unavailable(format!("pedido {} já existe", order.id)));
        }
        inner.orders.insert(order.id, order.clone());
        Ok(order.clone())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;
        let orders = inner.orders.values().filter(|o| filter.matches(o)).cloned().collect();
        Ok(newest_first(orders))
    }

    async fn find_active_orders(&self) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.lock().await;
        let orders = inner.orders.values().filter(|o| !o.status.is_terminal()).cloned().collect();
        Ok(newest_first(orders))
    }

    async fn push_line_item(
        &self,
        id: Uuid,
        line: &OrderLineItem,
        amount: Decimal,
    ) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.orders.get_mut(&id).map(|order| {
            order.line_items.push(line.clone());
            order.subtotal += amount;
            order.total += amount;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn pull_line_item(
        &self,
        id: Uuid,
        menu_item_id: Uuid,
        amount: Decimal,
    ) -> Result<LineRemoval, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&id) else {
            return Ok(LineRemoval::OrderMissing);
        };
        let Some(index) = order.line_items.iter().position(|l| l.menu_item_id == menu_item_id) else {
            return Ok(LineRemoval::LineMissing);
        };
        if order.total < amount {
            return Ok(LineRemoval::WouldGoNegative);
        }
        order.line_items.remove(index);
        order.subtotal -= amount;
        order.total -= amount;
        order.updated_at = Utc::now();
        Ok(LineRemoval::Removed(order.clone()))
    }

    async fn update_status(&self, id: Uuid, change: StatusChange) -> Result<Option<Order>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.orders.get_mut(&id).map(|order| {
            if let Some(status) = change.status {
                order.status = status;
            }
            if let Some(status_kitchen) = change.status_kitchen {
                order.status_kitchen = status_kitchen;
            }
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stock(unit: Decimal) -> StockLevel {
        StockLevel { unit, warning_level: dec!(1), unit_symbol: "kg".into() }
    }

    #[tokio::test]
    async fn conditional_decrement_refuses_to_go_below_zero() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store.put_ingredient(id, "Farinha", stock(dec!(3))).await;

        let first = store.conditional_decrement(id, dec!(2)).await.unwrap();
        assert_eq!(first.unwrap().stock_level.unit, dec!(1));

        let second = store.conditional_decrement(id, dec!(2)).await.unwrap();
        assert!(second.is_none());
        assert_eq!(store.find_ingredient(id).await.unwrap().unwrap().stock_level.unit, dec!(1));
    }

    #[tokio::test]
    async fn conditional_decrement_on_missing_ingredient_is_none() {
        let store = InMemoryStore::new();
        assert!(store.conditional_decrement(Uuid::new_v4(), dec!(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn seed_file_loads_ingredients_and_menu() {
        let ingredient_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let json = serde_json::json!({
            "ingredients": [
                { "id": ingredient_id, "name": "Tomate", "stockLevel": { "unit": 10, "warningLevel": 2, "unitSymbol": "kg" } }
            ],
            "menuItems": [
                { "id": item_id, "name": "Salada", "description": null, "price": 150,
                  "ingredients": [ { "ingredientId": ingredient_id, "requiredUnit": 0.5, "unitSymbol": "kg" } ] }
            ]
        });
        let path = std::env::temp_dir().join(format!("tos-seed-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, json.to_string()).await.unwrap();

        let store = InMemoryStore::new();
        store.seed_from_file(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        let item = store.find_menu_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.price, dec!(150));
        assert_eq!(item.ingredients[0].required_unit, dec!(0.5));
        assert!(store.find_ingredient(ingredient_id).await.unwrap().is_some());
    }
}
