// src/models/rbac.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// Classe de permissão do usuário (vem do token)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Chef,
}

// Área de trabalho: serve tanto como audiência do broadcast quanto como escopo de autorização
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Cashier,
    Kitchen,
    Admin,
    Menu,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Cashier => "cashier",
            Section::Kitchen => "kitchen",
            Section::Admin => "admin",
            Section::Menu => "menu",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Chef => "chef",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tabela estática seção -> papéis permitidos.
///
/// O "admin" como superusuário NÃO está aqui: quem chama verifica isso antes
/// de consultar a matriz.
const PERMISSION_MATRIX: &[(Section, &[Role])] = &[
    (Section::Cashier, &[Role::User, Role::Admin]),
    (Section::Kitchen, &[Role::Chef]),
    (Section::Admin, &[Role::Admin]),
    (Section::Menu, &[Role::User, Role::Admin]),
];

pub fn is_allowed(role: Role, section: Section) -> bool {
    PERMISSION_MATRIX
        .iter()
        .find(|(s, _)| *s == section)
        .map(|(_, roles)| roles.contains(&role))
        .unwrap_or(false)
}

/// Regra usada pelas rotas HTTP e pelo WebSocket: admin passa direto; senão o
/// papel precisa estar listado pela rota ou ser aceito pela matriz na seção
/// do próprio usuário.
pub fn can_act(role: Role, section: Section, route_roles: &[Role]) -> bool {
    role == Role::Admin || route_roles.contains(&role) || is_allowed(role, section)
}
