// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::rbac::{Role, Section};

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(alias = "id")]
    pub sub: Uuid,       // Subject (ID do usuário). Tokens antigos usam "id".
    pub role: Role,
    pub section: Section, // Seção escolhida no login
    pub iat: usize,      // Issued At
    pub exp: usize,      // Expiration time
}

/// Identidade verificada de uma requisição (ou conexão). Reconstruída do token
/// a cada requisição, nunca guardada no servidor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub subject_id: Uuid,
    pub role: Role,
    pub section: Section,
    pub issued_at: usize,
    pub expiry: usize,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub,
            role: claims.role,
            section: claims.section,
            issued_at: claims.iat,
            expiry: claims.exp,
        }
    }
}
