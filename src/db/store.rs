// src/db/store.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    inventory::{Ingredient, MenuItem},
    order::{Order, OrderFilter, OrderLineItem, StatusChange},
};

/// Resultado de `pull_line_item`, decidido dentro da mesma atualização.
#[derive(Debug, Clone)]
pub enum LineRemoval {
    Removed(Order),
    OrderMissing,
    LineMissing,
    // O total ficaria negativo: nada foi alterado
    WouldGoNegative,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Erro de banco de dados: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Armazenamento indisponível: {0}")]
    Unavailable(String),
}

/// Acesso ao estoque de ingredientes.
///
/// `conditional_decrement` é UMA operação atômica no armazenamento
/// (nunca leitura seguida de escrita na aplicação): decrementa `unit` em
/// `amount` somente se `unit >= amount`. `None` cobre tanto "ingrediente não
/// existe" quanto "estoque insuficiente".
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn conditional_decrement(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError>;

    /// Compensação: devolve ao estoque o que foi decrementado.
    async fn restore(
        &self,
        ingredient_id: Uuid,
        amount: Decimal,
    ) -> Result<Option<Ingredient>, StoreError>;

    async fn find_ingredient(&self, ingredient_id: Uuid) -> Result<Option<Ingredient>, StoreError>;
}

#[async_trait]
pub trait MenuCatalog: Send + Sync {
    /// Retorna apenas os itens encontrados (quem chama compara os IDs).
    async fn find_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StoreError>;

    async fn find_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StoreError>;
}

/// Pedidos são "documentos": cada método abaixo é uma atualização atômica de
/// um único pedido.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<Order, StoreError>;

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Pedidos cujo status não é terminal, do mais recente para o mais antigo.
    async fn find_active_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Acrescenta a linha e soma `amount` ao subtotal e ao total.
    async fn push_line_item(
        &self,
        id: Uuid,
        line: &OrderLineItem,
        amount: Decimal,
    ) -> Result<Option<Order>, StoreError>;

    /// Remove a primeira ocorrência do item e subtrai `amount` do subtotal e
    /// do total, somente se `total >= amount` no momento da escrita.
    async fn pull_line_item(
        &self,
        id: Uuid,
        menu_item_id: Uuid,
        amount: Decimal,
    ) -> Result<LineRemoval, StoreError>;

    async fn update_status(&self, id: Uuid, change: StatusChange) -> Result<Option<Order>, StoreError>;

    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>, StoreError>;
}
