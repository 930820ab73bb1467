// src/handlers/ws.rs

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

use crate::{
    config::AppState, middleware::auth::AuthenticatedUser, models::auth::Principal,
    services::connection_registry::outbound_channel,
};

// GET /ws (o upgrade_gate já validou o token antes de chegar aqui)
pub async fn ws_handler(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(app_state, principal, socket))
}

async fn handle_socket(app_state: AppState, principal: Principal, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = outbound_channel();

    let connection_id = app_state
        .registry
        .register(principal.subject_id, principal.section, tx)
        .await;

    tracing::info!(
        subject_id = %principal.subject_id,
        section = %principal.section,
        connection_id,
        "Conexão WS registrada"
    );

    // Encaminha o que o registro publica para o socket
    let forwarder = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                app_state.dispatcher.handle_text(&principal, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(subject_id = %principal.subject_id, error = %e, "Erro de leitura no WS");
                break;
            }
        }
    }

    // Só remove se ainda for esta conexão (o usuário pode ter reconectado)
    app_state.registry.release(principal.subject_id, connection_id).await;
    forwarder.abort();

    tracing::info!(subject_id = %principal.subject_id, connection_id, "Conexão WS encerrada");
}
