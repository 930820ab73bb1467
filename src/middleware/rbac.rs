// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::Principal,
        rbac::{Role, can_act},
    },
};

/// 1. O Trait que define quem pode usar uma rota
pub trait AccessPolicy: Send + Sync + 'static {
    /// Papéis liberados explicitamente pela rota (além do admin e da matriz)
    fn roles() -> &'static [Role];

    fn allows(principal: &Principal) -> bool {
        can_act(principal.role, principal.section, Self::roles())
    }
}

/// 2. O Extractor (Guardião)
pub struct RequireAccess<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireAccess<T>
where
    T: AccessPolicy,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai Usuário (colocado pelo auth_guard)
        let AuthenticatedUser(principal) = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::MissingCredential)?;

        // B. Verifica papel/seção
        if !T::allows(&principal) {
            tracing::info!(
                subject_id = %principal.subject_id,
                role = %principal.role,
                section = %principal.section,
                "Acesso negado"
            );
            return Err(AppError::Forbidden);
        }

        Ok(RequireAccess(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS POLÍTICAS (TIPOS)
// ---

/// Operações de pedido: admin ou papel aceito pela matriz na própria seção.
pub struct OrderDesk;
impl AccessPolicy for OrderDesk {
    fn roles() -> &'static [Role] { &[] }
}

/// Equivalente ao antigo `authMiddleware("admin")`.
pub struct AdminRoute;
impl AccessPolicy for AdminRoute {
    fn roles() -> &'static [Role] { &[Role::Admin] }
}

/// Só admin, sem passar pela matriz (exclusão de pedidos).
pub struct AdminOnly;
impl AccessPolicy for AdminOnly {
    fn roles() -> &'static [Role] { &[Role::Admin] }

    fn allows(principal: &Principal) -> bool {
        principal.role == Role::Admin
    }
}
