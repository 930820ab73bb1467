// src/services/event_dispatch.rs

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::{
    models::{
        auth::Principal,
        events::{
            EVENT_ORDER_CREATED, EVENT_ORDER_STATUS, EVENT_ORDER_UPDATED, EVENT_REFRESH_ORDERS,
            InboundMessage, OrderStatusPayload,
        },
        order::{Order, StatusChange},
        rbac::{Section, can_act},
    },
    services::{
        connection_registry::{self, ConnectionRegistry},
        order_service::{OrderError, OrderService},
    },
};

const MSG_REFRESH_ORDERS: &str = "refresh_orders";
const MSG_ORDER_STATUS: &str = "order_status";

const STAFF: [Section; 2] = [Section::Kitchen, Section::Admin];
const STAFF_AND_CASHIER: [Section; 3] = [Section::Kitchen, Section::Admin, Section::Cashier];

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("payload inválido: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("usuário sem permissão para esta ação")]
    Forbidden,

    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Trata as mensagens vindas das conexões e publica os eventos de pedidos.
#[derive(Clone)]
pub struct EventDispatcher {
    orders: OrderService,
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    pub fn new(orders: OrderService, registry: Arc<ConnectionRegistry>) -> Self {
        Self { orders, registry }
    }

    /// Entrada do loop de leitura do socket. Frames ilegíveis são ignorados.
    pub async fn handle_text(&self, sender: &Principal, text: &str) {
        let message: InboundMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(subject_id = %sender.subject_id, error = %e, "Mensagem WS ilegível ignorada");
                return;
            }
        };

        if let Err(e) = self.dispatch(sender, message).await {
            tracing::warn!(subject_id = %sender.subject_id, error = %e, "Falha ao tratar mensagem WS");
        }
    }

    pub async fn dispatch(&self, sender: &Principal, message: InboundMessage) -> Result<(), DispatchError> {
        match message.msg_type.as_str() {
            MSG_REFRESH_ORDERS => {
                let orders = self.orders.active_orders().await?;
                self.registry
                    .broadcast(&STAFF, EVENT_REFRESH_ORDERS, json!(orders))
                    .await;
            }
            MSG_ORDER_STATUS => {
                if !can_act(sender.role, sender.section, &[]) {
                    return Err(DispatchError::Forbidden);
                }
                let payload: OrderStatusPayload = serde_json::from_value(message.payload)?;
                let change = payload.change();
                let order = self.orders.update_status(payload.order_id, change).await?;
                self.announce_status_change(&order, change).await;
            }
            other => {
                tracing::debug!(msg_type = other, "msgType desconhecido, ignorado");
            }
        }
        Ok(())
    }

    pub async fn announce_order_created(&self, order: &Order) {
        self.registry.broadcast(&STAFF, EVENT_ORDER_CREATED, json!(order)).await;
    }

    pub async fn announce_order_updated(&self, order: &Order) {
        self.registry.broadcast(&STAFF, EVENT_ORDER_UPDATED, json!(order)).await;
    }

    pub async fn announce_status_change(&self, order: &Order, change: StatusChange) {
        let audience: &[Section] = if change.is_customer_facing() { &STAFF_AND_CASHIER } else { &STAFF };
        self.registry.broadcast(audience, EVENT_ORDER_STATUS, json!(order)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::InMemoryStore,
        models::{
            events::EventEnvelope,
            order::{KitchenStatus, NewOrder, OrderLineItem, OrderStatus, PaymentInfo},
            rbac::Role,
        },
        services::order_service::ReservationScope,
    };
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc::Receiver;
    use uuid::Uuid;

    struct Harness {
        store: Arc<InMemoryStore>,
        orders: OrderService,
        registry: Arc<ConnectionRegistry>,
        dispatcher: EventDispatcher,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let orders = OrderService::new(store.clone(), store.clone(), store.clone(), ReservationScope::FirstItem);
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = EventDispatcher::new(orders.clone(), registry.clone());
        Harness { store, orders, registry, dispatcher }
    }

    fn principal(role: Role, section: Section) -> Principal {
        Principal { subject_id: Uuid::new_v4(), role, section, issued_at: 0, expiry: 0 }
    }

    async fn connect(registry: &ConnectionRegistry, section: Section) -> Receiver<String> {
        let (tx, rx) = connection_registry::outbound_channel();
        registry.register(Uuid::new_v4(), section, tx).await;
        rx
    }

    fn drain(rx: &mut Receiver<String>) -> Vec<EventEnvelope> {
        let mut out = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            out.push(serde_json::from_str(&raw).unwrap());
        }
        out
    }

    async fn place(h: &Harness) -> Order {
        let item = h.store.put_menu_item(&format!("Prato {}", Uuid::new_v4()), dec!(100), vec![]).await;
        h.orders
            .place_order(
                NewOrder {
                    customer_number: "1".into(),
                    customer_name: "Ana".into(),
                    line_items: vec![OrderLineItem { menu_item_id: item.id, quantity: 1 }],
                    discount: dec!(0),
                    status: None,
                    status_kitchen: None,
                    payment: PaymentInfo::default(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap()
    }

    fn inbound(raw: serde_json::Value) -> InboundMessage {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn refresh_orders_broadcasts_active_orders_to_staff() {
        let h = harness();
        let open = place(&h).await;
        let done = place(&h).await;
        h.orders
            .update_status(done.id, StatusChange { status: Some(OrderStatus::Completed), status_kitchen: None })
            .await
            .unwrap();

        let mut kitchen = connect(&h.registry, Section::Kitchen).await;
        let mut cashier = connect(&h.registry, Section::Cashier).await;
        drain(&mut kitchen);

        h.dispatcher
            .dispatch(&principal(Role::Chef, Section::Kitchen), inbound(json!({ "msgType": "refresh_orders" })))
            .await
            .unwrap();

        let got = drain(&mut kitchen);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].event_type, EVENT_REFRESH_ORDERS);
        let ids: Vec<String> = got[0].data.as_array().unwrap().iter().map(|o| o["id"].as_str().unwrap().to_string()).collect();
        assert_eq!(ids, vec![open.id.to_string()]);
        assert!(drain(&mut cashier).is_empty());
    }

    #[tokio::test]
    async fn kitchen_progress_reaches_staff_but_not_cashier() {
        let h = harness();
        let order = place(&h).await;
        let mut kitchen = connect(&h.registry, Section::Kitchen).await;
        let mut cashier = connect(&h.registry, Section::Cashier).await;
        drain(&mut kitchen);

        let msg = inbound(json!({
            "msgType": "order_status",
            "payload": { "orderId": order.id, "statusKitchen": "preparing" }
        }));
        h.dispatcher.dispatch(&principal(Role::Chef, Section::Kitchen), msg).await.unwrap();

        let got = drain(&mut kitchen);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].event_type, EVENT_ORDER_STATUS);
        assert_eq!(got[0].data["statusKitchen"], "preparing");
        assert!(drain(&mut cashier).is_empty());
        assert_eq!(h.orders.get_order(order.id).await.unwrap().status_kitchen, KitchenStatus::Preparing);
    }

    #[tokio::test]
    async fn ready_order_also_notifies_cashier() {
        let h = harness();
        let order = place(&h).await;
        let mut cashier = connect(&h.registry, Section::Cashier).await;

        let msg = inbound(json!({
            "msgType": "order_status",
            "payload": { "orderId": order.id, "statusKitchen": "ready" }
        }));
        h.dispatcher.dispatch(&principal(Role::Chef, Section::Kitchen), msg).await.unwrap();

        assert_eq!(drain(&mut cashier).len(), 1);
    }

    #[tokio::test]
    async fn unknown_msg_type_is_a_no_op() {
        let h = harness();
        let mut kitchen = connect(&h.registry, Section::Kitchen).await;
        drain(&mut kitchen);

        h.dispatcher
            .dispatch(&principal(Role::Chef, Section::Kitchen), inbound(json!({ "msgType": "dance", "payload": 1 })))
            .await
            .unwrap();
        h.dispatcher.handle_text(&principal(Role::Chef, Section::Kitchen), "{ nem json").await;

        assert!(drain(&mut kitchen).is_empty());
    }

    #[tokio::test]
    async fn status_change_requires_matrix_permission() {
        let h = harness();
        let order = place(&h).await;
        let msg = inbound(json!({
            "msgType": "order_status",
            "payload": { "orderId": order.id, "status": "cancelled" }
        }));

        let err = h.dispatcher.dispatch(&principal(Role::User, Section::Kitchen), msg).await;
        assert!(matches!(err, Err(DispatchError::Forbidden)));
        assert_eq!(h.orders.get_order(order.id).await.unwrap().status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn malformed_status_payload_is_reported() {
        let h = harness();
        let msg = inbound(json!({ "msgType": "order_status", "payload": { "orderId": "nope" } }));
        let err = h.dispatcher.dispatch(&principal(Role::Admin, Section::Admin), msg).await;
        assert!(matches!(err, Err(DispatchError::InvalidPayload(_))));
    }
}
