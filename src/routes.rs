// src/routes.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers::{orders, ws},
    middleware::auth::{auth_guard, upgrade_gate},
};

pub fn app_router(app_state: AppState) -> Router {
    // Rotas de pedidos (protegidas pelo middleware)
    let order_routes = Router::new()
        .route("/add", post(orders::add_order))
        .route("/addItem/{id}", put(orders::add_item))
        .route("/removeItem/{id}", put(orders::remove_item))
        .route("/status/{id}", put(orders::update_status))
        .route("/status", get(orders::get_by_status))
        .route("/all", get(orders::get_all))
        .route("/{id}"
               ,get(orders::get_by_id)
               .delete(orders::delete_order)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/ping", get(orders::ping))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // O portão do upgrade roda antes do extractor do WebSocket
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            upgrade_gate,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/orders", order_routes)
        .merge(admin_routes)
        .merge(ws_routes)
        .with_state(app_state)
}
