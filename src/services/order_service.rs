// src/services/order_service.rs

use std::{collections::HashMap, str::FromStr, sync::Arc};

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db::{InventoryLedger, LineRemoval, MenuCatalog, OrderStore, StoreError},
    models::{
        inventory::MenuItem,
        order::{
            KitchenStatus, NewOrder, Order, OrderFilter, OrderLineItem, OrderStatus, Payment,
            StatusChange,
        },
    },
};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("o pedido precisa de pelo menos um item")]
    EmptyOrder,

    #[error("itens do cardápio inexistentes: {0:?}")]
    UnknownMenuItem(Vec<Uuid>),

    #[error("quantidade inválida ({quantity}) para o item {menu_item_id}")]
    InvalidQuantity { menu_item_id: Uuid, quantity: i32 },

    #[error("desconto inválido: negativo ou maior que o subtotal")]
    InvalidDiscount,

    #[error("a remoção deixaria o total do pedido negativo")]
    NegativeTotal,

    #[error("estoque insuficiente do ingrediente {0}")]
    InsufficientStock(Uuid),

    #[error("pedido {0} não encontrado")]
    OrderNotFound(Uuid),

    #[error("item do cardápio {0} não encontrado")]
    MenuItemNotFound(Uuid),

    #[error("item {0} não está no pedido")]
    MenuItemNotInOrder(Uuid),

    #[error("informe status e/ou statusKitchen")]
    EmptyStatusChange,

    #[error("falha de persistência: {0}")]
    Persistence(#[from] StoreError),
}

/// Quais receitas são reservadas no estoque ao fechar um pedido.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReservationScope {
    /// Só a receita do primeiro item do pedido, uma vez, sem multiplicar pela
    /// quantidade. É o comportamento histórico do sistema.
    #[default]
    FirstItem,
    /// Todas as linhas, `requiredUnit × quantidade`, somadas por ingrediente.
    AllItems,
}

impl FromStr for ReservationScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_item" => Ok(Self::FirstItem),
            "all_items" => Ok(Self::AllItems),
            other => Err(anyhow::anyhow!("RESERVATION_SCOPE inválido: '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    menu: Arc<dyn MenuCatalog>,
    ledger: Arc<dyn InventoryLedger>,
    scope: ReservationScope,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        menu: Arc<dyn MenuCatalog>,
        ledger: Arc<dyn InventoryLedger>,
        scope: ReservationScope,
    ) -> Self {
        Self { orders, menu, ledger, scope }
    }

    // --- PLACE ORDER ---
    // Quem chama já autorizou o usuário; aqui não há checagem de papel.
    pub async fn place_order(&self, new_order: NewOrder, acting_user: Uuid) -> Result<Order, OrderError> {
        if new_order.line_items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        // 1. Resolve os itens (somente leitura, nada foi tocado ainda)
        let menu_items = self.resolve_menu_items(&new_order.line_items).await?;

        // 2. Preço com Decimal exato
        let subtotal = price_lines(&new_order.line_items, &menu_items)?;
        if new_order.discount.is_sign_negative() {
            return Err(OrderError::InvalidDiscount);
        }
        let total = subtotal - new_order.discount;
        if total < Decimal::ZERO {
            return Err(OrderError::InvalidDiscount);
        }

        // 3. Reserva de estoque (tudo ou nada)
        let plan = self.reservation_plan(&new_order.line_items, &menu_items);
        let reserved = self.reserve(&plan).await?;

        // 4. Persiste
        let now = Utc::now();
        let payment = Payment {
            is_paid: new_order.payment.is_paid,
            method: new_order.payment.method,
            time: new_order.payment.time,
            payer_ref: new_order.payment.is_paid.then_some(acting_user),
        };
        let order = Order {
            id: Uuid::new_v4(),
            customer_number: new_order.customer_number,
            customer_name: new_order.customer_name,
            status: new_order.status.unwrap_or(OrderStatus::Pending),
            status_kitchen: new_order.status_kitchen.unwrap_or(KitchenStatus::Queued),
            add_user: acting_user,
            subtotal,
            total,
            discount: new_order.discount,
            line_items: new_order.line_items,
            payment,
            created_at: now,
            updated_at: now,
        };

        match self.orders.insert_order(&order).await {
            Ok(saved) => {
                tracing::info!(
                    order_id = %saved.id,
                    total = %saved.total,
                    reservations = reserved.len(),
                    "🧾 Pedido criado"
                );
                Ok(saved)
            }
            Err(e) => {
                tracing::error!(error = %e, "Falha ao salvar pedido, devolvendo estoque reservado");
                self.compensate(&reserved).await;
                Err(OrderError::Persistence(e))
            }
        }
    }

    async fn resolve_menu_items(
        &self,
        lines: &[OrderLineItem],
    ) -> Result<HashMap<Uuid, MenuItem>, OrderError> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(lines.len());
        for line in lines {
            if !ids.contains(&line.menu_item_id) {
                ids.push(line.menu_item_id);
            }
        }

        let found: HashMap<Uuid, MenuItem> = self
            .menu
            .find_menu_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let missing: Vec<Uuid> = ids.into_iter().filter(|id| !found.contains_key(id)).collect();
        if !missing.is_empty() {
            return Err(OrderError::UnknownMenuItem(missing));
        }
        Ok(found)
    }

    fn reservation_plan(
        &self,
        lines: &[OrderLineItem],
        menu_items: &HashMap<Uuid, MenuItem>,
    ) -> Vec<(Uuid, Decimal)> {
        match self.scope {
            ReservationScope::FirstItem => lines
                .first()
                .and_then(|line| menu_items.get(&line.menu_item_id))
                .map(|item| {
                    item.ingredients
                        .iter()
                        .map(|r| (r.ingredient_id, r.required_unit))
                        .collect()
                })
                .unwrap_or_default(),
            ReservationScope::AllItems => {
                let mut plan: Vec<(Uuid, Decimal)> = Vec::new();
                for line in lines {
                    let Some(item) = menu_items.get(&line.menu_item_id) else { continue };
                    for recipe in &item.ingredients {
                        let amount = recipe.required_unit * Decimal::from(line.quantity);
                        match plan.iter_mut().find(|(id, _)| *id == recipe.ingredient_id) {
                            Some((_, acc)) => *acc += amount,
                            None => plan.push((recipe.ingredient_id, amount)),
                        }
                    }
                }
                plan
            }
        }
    }

    /// Decrementa em sequência. Se algum falhar, devolve o que já foi
    /// decrementado antes de retornar o erro.
    async fn reserve(&self, plan: &[(Uuid, Decimal)]) -> Result<Vec<(Uuid, Decimal)>, OrderError> {
        let mut applied: Vec<(Uuid, Decimal)> = Vec::with_capacity(plan.len());

        for &(ingredient_id, amount) in plan {
            match self.ledger.conditional_decrement(ingredient_id, amount).await {
                Ok(Some(ingredient)) => {
                    if ingredient.is_below_warning() {
                        tracing::warn!(
                            ingredient_id = %ingredient.id,
                            unit = %ingredient.stock_level.unit,
                            "⚠️ Estoque de '{}' abaixo do nível de alerta",
                            ingredient.name
                        );
                    }
                    applied.push((ingredient_id, amount));
                }
                Ok(None) => {
                    tracing::info!(%ingredient_id, %amount, "Estoque insuficiente, desfazendo reserva");
                    self.compensate(&applied).await;
                    return Err(OrderError::InsufficientStock(ingredient_id));
                }
                Err(e) => {
                    tracing::error!(%ingredient_id, error = %e, "Falha no decremento de estoque");
                    self.compensate(&applied).await;
                    return Err(OrderError::Persistence(e));
                }
            }
        }

        Ok(applied)
    }

    async fn compensate(&self, applied: &[(Uuid, Decimal)]) {
        for &(ingredient_id, amount) in applied.iter().rev() {
            match self.ledger.restore(ingredient_id, amount).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::error!(%ingredient_id, %amount, "Compensação: ingrediente sumiu antes da devolução")
                }
                Err(e) => {
                    tracing::error!(%ingredient_id, %amount, error = %e, "Compensação falhou, estoque precisa de ajuste manual")
                }
            }
        }
    }

    // --- LINE ITEMS ---

    /// Acrescenta um item a um pedido existente. Não reserva estoque.
    pub async fn add_line_item(
        &self,
        order_id: Uuid,
        menu_item_id: Uuid,
        quantity: i32,
    ) -> Result<Order, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity { menu_item_id, quantity });
        }

        self.orders
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        let item = self
            .menu
            .find_menu_item(menu_item_id)
            .await?
            .ok_or(OrderError::MenuItemNotFound(menu_item_id))?;

        let amount = item.price * Decimal::from(quantity);
        let line = OrderLineItem { menu_item_id, quantity };

        self.orders
            .push_line_item(order_id, &line, amount)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Remove a primeira ocorrência do item. Subtrai o preço ATUAL do cardápio
    /// (uma unidade), não o preço cobrado quando o pedido foi feito.
    pub async fn remove_line_item(&self, order_id: Uuid, menu_item_id: Uuid) -> Result<Order, OrderError> {
        let order = self
            .orders
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !order.line_items.iter().any(|l| l.menu_item_id == menu_item_id) {
            return Err(OrderError::MenuItemNotInOrder(menu_item_id));
        }

        let item = self
            .menu
            .find_menu_item(menu_item_id)
            .await?
            .ok_or(OrderError::MenuItemNotFound(menu_item_id))?;

        // A checagem do total acontece dentro da própria escrita: duas
        // remoções concorrentes não conseguem deixar o total negativo.
        match self.orders.pull_line_item(order_id, menu_item_id, item.price).await? {
            LineRemoval::Removed(order) => Ok(order),
            LineRemoval::OrderMissing => Err(OrderError::OrderNotFound(order_id)),
            LineRemoval::LineMissing => Err(OrderError::MenuItemNotInOrder(menu_item_id)),
            LineRemoval::WouldGoNegative => Err(OrderError::NegativeTotal),
        }
    }

    // --- STATUS & LEITURAS ---

    pub async fn update_status(&self, order_id: Uuid, change: StatusChange) -> Result<Order, OrderError> {
        if change.is_empty() {
            return Err(OrderError::EmptyStatusChange);
        }
        self.orders
            .update_status(order_id, change)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    pub async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_orders(filter).await?)
    }

    pub async fn active_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.find_active_orders().await?)
    }

    pub async fn delete_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .delete_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }
}

fn price_lines(lines: &[OrderLineItem], menu_items: &HashMap<Uuid, MenuItem>) -> Result<Decimal, OrderError> {
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        if line.quantity <= 0 {
            return Err(OrderError::InvalidQuantity {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
            });
        }
        let item = menu_items
            .get(&line.menu_item_id)
            .ok_or_else(|| OrderError::UnknownMenuItem(vec![line.menu_item_id]))?;
        subtotal += item.price * Decimal::from(line.quantity);
    }
    Ok(subtotal)
}
