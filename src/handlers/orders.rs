// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, AdminRoute, OrderDesk, RequireAccess},
    },
    models::order::{
        KitchenStatus, NewOrder, Order, OrderFilter, OrderLineItem, OrderStatus, PaymentInfo,
        StatusChange,
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderMenuItemPayload {
    #[serde(alias = "menuItemId")]
    pub id: Uuid,

    // Clientes antigos enviam "quntity". Sem quantidade a linha é recusada.
    #[serde(alias = "quntity")]
    #[schema(example = 2)]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddOrderPayload {
    #[validate(length(min = 1, message = "Número do cliente é obrigatório"))]
    #[schema(example = "0771234567")]
    pub customer_number: String,

    #[validate(length(min = 2, message = "Nome do cliente precisa de pelo menos 2 caracteres"))]
    #[schema(example = "Maria")]
    pub customer_name: String,

    #[serde(alias = "lineItems")]
    #[validate(length(min = 1, message = "Pelo menos um item do cardápio é obrigatório"))]
    pub menu_item: Vec<OrderMenuItemPayload>,

    #[serde(default)]
    #[schema(example = 100)]
    pub discount: Decimal,

    pub status: Option<OrderStatus>,
    pub status_kitchen: Option<KitchenStatus>,

    #[serde(default)]
    pub is_paid: bool,
    #[schema(example = "cash")]
    pub payment_method: Option<String>,
    pub time: Option<DateTime<Utc>>,
}

impl AddOrderPayload {
    fn into_new_order(self) -> NewOrder {
        NewOrder {
            customer_number: self.customer_number,
            customer_name: self.customer_name,
            line_items: self
                .menu_item
                .into_iter()
                .map(|i| OrderLineItem { menu_item_id: i.id, quantity: i.quantity.unwrap_or(0) })
                .collect(),
            discount: self.discount,
            status: self.status,
            status_kitchen: self.status_kitchen,
            payment: PaymentInfo {
                is_paid: self.is_paid,
                method: self.payment_method,
                time: self.time,
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    pub menu_item_id: Uuid,

    #[validate(range(min = 1, message = "Quantidade deve ser um inteiro positivo"))]
    #[schema(example = 1)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemPayload {
    pub menu_item_id: Uuid,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /orders/add
#[utoipa::path(
    post,
    path = "/orders/add",
    tag = "Orders",
    request_body = AddOrderPayload,
    responses(
        (status = 201, description = "Pedido criado e estoque reservado", body = Order),
        (status = 400, description = "Payload inválido ou item inexistente"),
        (status = 409, description = "Estoque insuficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    _access: RequireAccess<OrderDesk>,
    Json(payload): Json<AddOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .place_order(payload.into_new_order(), principal.subject_id)
        .await?;

    tracing::info!(order_id = %order.id, add_user = %principal.subject_id, "Pedido criado");
    app_state.dispatcher.announce_order_created(&order).await;

    Ok((StatusCode::CREATED, Json(order)))
}

// PUT /orders/addItem/{id}
#[utoipa::path(
    put,
    path = "/orders/addItem/{id}",
    tag = "Orders",
    request_body = AddItemPayload,
    responses(
        (status = 200, description = "Item adicionado", body = Order),
        (status = 400, description = "Quantidade inválida"),
        (status = 404, description = "Pedido ou item do cardápio não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AddItemPayload>,
) -> Result<Json<Order>, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .add_line_item(order_id, payload.menu_item_id, payload.quantity)
        .await?;

    app_state.dispatcher.announce_order_updated(&order).await;
    Ok(Json(order))
}

// PUT /orders/removeItem/{id}
#[utoipa::path(
    put,
    path = "/orders/removeItem/{id}",
    tag = "Orders",
    request_body = RemoveItemPayload,
    responses(
        (status = 200, description = "Item removido", body = Order),
        (status = 404, description = "Pedido ou item não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RemoveItemPayload>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .remove_line_item(order_id, payload.menu_item_id)
        .await?;

    app_state.dispatcher.announce_order_updated(&order).await;
    Ok(Json(order))
}

// PUT /orders/status/{id}
#[utoipa::path(
    put,
    path = "/orders/status/{id}",
    tag = "Orders",
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status atualizado", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido")),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
    Path(order_id): Path<Uuid>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Order>, AppError> {
    let order = app_state.order_service.update_status(order_id, change).await?;

    app_state.dispatcher.announce_status_change(&order, change).await;
    Ok(Json(order))
}

// GET /orders/all
#[utoipa::path(
    get,
    path = "/orders/all",
    tag = "Orders",
    responses((status = 200, description = "Todos os pedidos", body = Vec<Order>)),
    security(("api_jwt" = []))
)]
pub async fn get_all(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state.order_service.list_orders(OrderFilter::default()).await?;
    Ok(Json(orders))
}

// GET /orders/status?status=&statusKitchen=
#[utoipa::path(
    get,
    path = "/orders/status",
    tag = "Orders",
    params(
        ("status" = Option<OrderStatus>, Query, description = "Status do pedido"),
        ("statusKitchen" = Option<KitchenStatus>, Query, description = "Status da cozinha")
    ),
    responses((status = 200, description = "Pedidos filtrados", body = Vec<Order>)),
    security(("api_jwt" = []))
)]
pub async fn get_by_status(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state.order_service.list_orders(filter).await?;
    Ok(Json(orders))
}

// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do Pedido")),
    responses(
        (status = 200, description = "Pedido", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_by_id(
    State(app_state): State<AppState>,
    _access: RequireAccess<OrderDesk>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(app_state.order_service.get_order(order_id).await?))
}

// DELETE /orders/{id}
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    tag = "Orders",
    params(("id" = Uuid, Path, description = "ID do Pedido")),
    responses(
        (status = 200, description = "Pedido excluído", body = Order),
        (status = 403, description = "Apenas admin"),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    _access: RequireAccess<AdminOnly>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = app_state.order_service.delete_order(order_id).await?;
    tracing::info!(%order_id, by = %principal.subject_id, "Pedido excluído");
    Ok(Json(order))
}

// GET /ping
#[utoipa::path(
    get,
    path = "/ping",
    tag = "Orders",
    responses((status = 200, description = "pong")),
    security(("api_jwt" = []))
)]
pub async fn ping(_access: RequireAccess<AdminRoute>) -> impl IntoResponse {
    Json(json!({ "msg": "pong" }))
}
