// src/services/auth.rs

use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use thiserror::Error;

use crate::models::auth::{Claims, Principal};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    // Nem cookie nem "Authorization: Bearer" na requisição
    #[error("credencial ausente")]
    MissingCredential,

    #[error("token malformado")]
    Malformed,

    #[error("token expirado")]
    Expired,

    #[error("assinatura do token não confere")]
    SignatureMismatch,
}

/// Verifica tokens de acesso. A emissão (login) fica fora deste serviço.
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::SignatureMismatch,
                _ => AuthError::Malformed,
            })?;

        Ok(token_data.claims.into())
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use crate::models::rbac::{Role, Section};
    use uuid::Uuid;

    #[test]
    fn valid_token_yields_principal() {
        let service = AuthService::new(SECRET);
        let sub = Uuid::new_v4();
        let principal = service.validate_token(&sign(sub, Role::Chef, Section::Kitchen)).unwrap();

        assert_eq!(principal.subject_id, sub);
        assert_eq!(principal.role, Role::Chef);
        assert_eq!(principal.section, Section::Kitchen);
        assert!(principal.expiry > principal.issued_at);
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = AuthService::new(SECRET);
        // bem além da tolerância padrão de 60s
        let token = sign_with(SECRET, Uuid::new_v4(), Role::User, Section::Cashier, -3600);
        assert_eq!(service.validate_token(&token), Err(AuthError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let service = AuthService::new(SECRET);
        let token = sign_with("outro-segredo", Uuid::new_v4(), Role::User, Section::Cashier, 3600);
        assert_eq!(service.validate_token(&token), Err(AuthError::SignatureMismatch));
    }

    #[test]
    fn garbage_is_malformed() {
        let service = AuthService::new(SECRET);
        assert_eq!(service.validate_token("nao.e.jwt"), Err(AuthError::Malformed));
        assert_eq!(service.validate_token(""), Err(AuthError::Malformed));
    }

    #[test]
    fn legacy_id_claim_is_accepted() {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let sub = Uuid::new_v4();
        let now = chrono::Utc::now().timestamp();
        let legacy = serde_json::json!({
            "id": sub, "role": "admin", "section": "admin", "iat": now, "exp": now + 600
        });
        let token = encode(&Header::default(), &legacy, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap();

        let principal = AuthService::new(SECRET).validate_token(&token).unwrap();
        assert_eq!(principal.subject_id, sub);
        assert_eq!(principal.role, Role::Admin);
    }
}
