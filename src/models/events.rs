// src/models/events.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::order::{KitchenStatus, OrderStatus, StatusChange};

// Tipos de evento enviados pelo barramento
pub const EVENT_NOTIFICATION: &str = "notification";
pub const EVENT_ORDER_CREATED: &str = "order_created";
pub const EVENT_ORDER_UPDATED: &str = "order_updated";
pub const EVENT_ORDER_STATUS: &str = "order_status";
pub const EVENT_REFRESH_ORDERS: &str = "refresh_orders";

/// Envelope de saída: `{ "type": ..., "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

/// Mensagem recebida de um cliente conectado: `{ "msgType": ..., "payload": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub msg_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusPayload {
    pub order_id: Uuid,
    pub status: Option<OrderStatus>,
    pub status_kitchen: Option<KitchenStatus>,
}

impl OrderStatusPayload {
    pub fn change(&self) -> StatusChange {
        StatusChange {
            status: self.status,
            status_kitchen: self.status_kitchen,
        }
    }
}
