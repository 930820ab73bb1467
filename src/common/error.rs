use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{services::auth::AuthError, services::order_service::OrderError};

// Nosso tipo de erro da camada HTTP, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Credencial ausente")]
    MissingCredential,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Pedido {0} não encontrado")]
    OrderNotFound(Uuid),

    #[error("Itens do cardápio inexistentes: {0:?}")]
    UnknownMenuItem(Vec<Uuid>),

    #[error("Item do cardápio {0} não encontrado")]
    MenuItemNotFound(Uuid),

    #[error("Item {0} não está no pedido")]
    MenuItemNotInOrder(Uuid),

    #[error("Estoque insuficiente")]
    InsufficientStock(Uuid),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => AppError::MissingCredential,
            // Não vazamos o motivo exato (expirado, assinatura...) para o cliente
            other => {
                tracing::debug!("Falha na verificação do token: {}", other);
                AppError::InvalidToken
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::UnknownMenuItem(ids) => AppError::UnknownMenuItem(ids),
            OrderError::OrderNotFound(id) => AppError::OrderNotFound(id),
            OrderError::MenuItemNotFound(id) => AppError::MenuItemNotFound(id),
            OrderError::MenuItemNotInOrder(id) => AppError::MenuItemNotInOrder(id),
            OrderError::InsufficientStock(id) => AppError::InsufficientStock(id),
            OrderError::Persistence(e) => AppError::InternalServerError(e.into()),
            e @ (OrderError::EmptyOrder
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidDiscount
            | OrderError::NegativeTotal
            | OrderError::EmptyStatusChange) => AppError::InvalidInput(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::UnknownMenuItem(ids) => {
                let body = Json(json!({
                    "error": "Alguns itens do cardápio não existem.",
                    "details": { "menuItemIds": ids },
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InsufficientStock(ingredient_id) => {
                let body = Json(json!({
                    "error": "Estoque insuficiente ou modificado concorrentemente.",
                    "details": { "ingredientId": ingredient_id },
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InvalidInput(msg) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response();
            }
            AppError::MissingCredential => (StatusCode::UNAUTHORIZED, "Autorização negada."),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Token de autenticação inválido."),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Acesso não autorizado a esta rota."),
            AppError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "Pedido não encontrado."),
            AppError::MenuItemNotFound(_) => (StatusCode::NOT_FOUND, "Item do cardápio não encontrado."),
            AppError::MenuItemNotInOrder(_) => (StatusCode::NOT_FOUND, "Item do cardápio não está no pedido."),

            // O restante (InternalServerError) vira 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe uma genérica.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;

    fn status_of(err: OrderError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn store_failures_become_generic_500() {
        let err = OrderError::Persistence(StoreError::Unavailable("pool esgotado".into()));
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_entities_are_404_and_unknown_placement_items_400() {
        assert_eq!(status_of(OrderError::MenuItemNotFound(Uuid::new_v4())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(OrderError::MenuItemNotInOrder(Uuid::new_v4())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(OrderError::OrderNotFound(Uuid::new_v4())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(OrderError::UnknownMenuItem(vec![Uuid::new_v4()])), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OrderError::NegativeTotal), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(OrderError::InsufficientStock(Uuid::new_v4())), StatusCode::CONFLICT);
    }
}
