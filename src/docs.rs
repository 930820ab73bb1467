// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- ORDERS ---
        handlers::orders::add_order,
        handlers::orders::add_item,
        handlers::orders::remove_item,
        handlers::orders::update_status,
        handlers::orders::get_all,
        handlers::orders::get_by_status,
        handlers::orders::get_by_id,
        handlers::orders::delete_order,
        handlers::orders::ping,
    ),
    components(
        schemas(
            // --- Orders ---
            models::order::OrderStatus,
            models::order::KitchenStatus,
            models::order::OrderLineItem,
            models::order::Payment,
            models::order::Order,
            models::order::StatusChange,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Section,

            // --- Payloads ---
            handlers::orders::OrderMenuItemPayload,
            handlers::orders::AddOrderPayload,
            handlers::orders::AddItemPayload,
            handlers::orders::RemoveItemPayload,
        )
    ),
    tags(
        (name = "Orders", description = "Pedidos, itens e status da cozinha")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
