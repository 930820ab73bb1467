// src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

// Status da cozinha: evolui de forma independente do status do pedido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "kitchen_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KitchenStatus {
    Queued,
    Preparing,
    Ready,
    Served,
}

// --- Structs do pedido ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub menu_item_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub is_paid: bool,
    #[schema(example = "cash")]
    pub method: Option<String>,
    pub time: Option<DateTime<Utc>>,
    pub payer_ref: Option<Uuid>, // Só existe quando is_paid = true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "0771234567")]
    pub customer_number: String,
    #[schema(example = "Maria")]
    pub customer_name: String,
    pub status: OrderStatus,
    pub status_kitchen: KitchenStatus,
    pub add_user: Uuid,
    #[schema(example = 900)]
    pub subtotal: Decimal,
    #[schema(example = 800)]
    pub total: Decimal, // subtotal - discount
    #[schema(example = 100)]
    pub discount: Decimal,
    pub line_items: Vec<OrderLineItem>,
    pub payment: Payment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que sai do banco (tabela orders). Os itens ficam num JSONB para que o
// pedido seja um único "documento" atualizado atomicamente.
#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub status_kitchen: KitchenStatus,
    pub add_user: Uuid,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub discount: Decimal,
    pub line_items: Json<Vec<OrderLineItem>>,
    pub is_paid: bool,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payer_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_number: row.customer_number,
            customer_name: row.customer_name,
            status: row.status,
            status_kitchen: row.status_kitchen,
            add_user: row.add_user,
            subtotal: row.subtotal,
            total: row.total,
            discount: row.discount,
            line_items: row.line_items.0,
            payment: Payment {
                is_paid: row.is_paid,
                method: row.payment_method,
                time: row.paid_at,
                payer_ref: row.payer_ref,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// --- Entradas do motor de pedidos ---

#[derive(Debug, Clone, Default)]
pub struct PaymentInfo {
    pub is_paid: bool,
    pub method: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_number: String,
    pub customer_name: String,
    pub line_items: Vec<OrderLineItem>,
    pub discount: Decimal,
    pub status: Option<OrderStatus>,
    pub status_kitchen: Option<KitchenStatus>,
    pub payment: PaymentInfo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub status_kitchen: Option<KitchenStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.is_none_or(|s| s == order.status)
            && self.status_kitchen.is_none_or(|s| s == order.status_kitchen)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: Option<OrderStatus>,
    pub status_kitchen: Option<KitchenStatus>,
}

impl StatusChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.status_kitchen.is_none()
    }

    // Mudanças que o cliente "vê" (o caixa precisa saber)
    pub fn is_customer_facing(&self) -> bool {
        self.status.is_some()
            || matches!(self.status_kitchen, Some(KitchenStatus::Ready | KitchenStatus::Served))
    }
}
