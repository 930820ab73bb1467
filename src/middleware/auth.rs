// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::Principal,
    services::auth::AuthError,
};

// Cookie gravado pelo login
pub const ACCESS_COOKIE: &str = "tos_access";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Credencial de uma requisição HTTP: cookie primeiro, depois o header.
pub fn http_credential(headers: &HeaderMap) -> Result<String, AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Ok(cookie.value().to_string());
    }
    bearer_token(headers)
        .map(str::to_string)
        .ok_or(AuthError::MissingCredential)
}

/// No upgrade do WebSocket só o header conta (sem cookie).
pub fn upgrade_credential(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers)
}

// O middleware das rotas HTTP protegidas
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = http_credential(request.headers())?;
    let principal = app_state.auth_service.validate_token(&token)?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

/// Portão do upgrade: roda antes de o WebSocket ser aceito. Sem principal
/// válido a resposta é 401 e o registro de conexões nem é consultado.
pub async fn upgrade_gate(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = upgrade_credential(request.headers())
        .and_then(|token| app_state.auth_service.validate_token(token).ok());

    match principal {
        Some(principal) => {
            request.extensions_mut().insert(AuthenticatedUser(principal));
            next.run(request).await
        }
        None => {
            tracing::warn!("Upgrade de WebSocket recusado: credencial ausente ou inválida");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn cookie_wins_over_header() {
        let h = headers(&[
            (header::COOKIE, "tema=escuro; tos_access=do-cookie"),
            (header::AUTHORIZATION, "Bearer do-header"),
        ]);
        assert_eq!(http_credential(&h).unwrap(), "do-cookie");
    }

    #[test]
    fn header_is_used_without_cookie() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc.def.ghi")]);
        assert_eq!(http_credential(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn absent_or_non_bearer_credential_is_missing() {
        assert_eq!(http_credential(&HeaderMap::new()), Err(AuthError::MissingCredential));
        let basic = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(http_credential(&basic), Err(AuthError::MissingCredential));
        let empty = headers(&[(header::AUTHORIZATION, "Bearer ")]);
        assert_eq!(http_credential(&empty), Err(AuthError::MissingCredential));
    }

    #[test]
    fn upgrade_ignores_cookie() {
        let h = headers(&[(header::COOKIE, "tos_access=do-cookie")]);
        assert_eq!(upgrade_credential(&h), None);
        let h = headers(&[(header::AUTHORIZATION, "Bearer tok")]);
        assert_eq!(upgrade_credential(&h), Some("tok"));
    }
}
