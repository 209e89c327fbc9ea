//! Authentication utilities: JWT validation and principal extraction
//!
//! Tokens are issued by the account service; this worker only validates
//! them and resolves the calling principal.

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Request;

/// Calling principal role. A closed mapping — never constructed from
/// untrusted input without going through `parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Technician,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Technician => "technician",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Self::Client),
            "technician" => Some(Self::Technician),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (principal ID, canonical UUID text)
    pub sub: String,
    /// Principal email
    pub email: String,
    /// Principal role (client, technician, admin)
    pub role: String,
    /// Issued at (unix timestamp)
    pub iat: usize,
    /// Expiration (unix timestamp)
    pub exp: usize,
}

/// Authenticated principal extracted from a request token.
///
/// `id` is a parsed `Uuid`; every ownership check downstream compares
/// `Uuid` values directly, so there is no textual normalization anywhere.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    pub fn is_technician(&self) -> bool {
        self.role == Role::Technician
    }
}

/// Validate a JWT token and return claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("Invalid token: {}", e))?;

    Ok(token_data.claims)
}

/// Extract the authenticated principal from a request envelope
pub fn extract_auth<T>(request: &Request<T>, secret: &str) -> Result<Principal> {
    let token = request
        .token
        .as_deref()
        .ok_or_else(|| anyhow!("Missing token"))?;

    let claims = validate_token(token, secret)?;

    let id = Uuid::parse_str(&claims.sub).map_err(|e| anyhow!("Invalid subject: {}", e))?;
    let role = Role::parse(&claims.role).ok_or_else(|| anyhow!("Unknown role: {}", claims.role))?;

    Ok(Principal { id, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmptyPayload;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-which-is-long-enough!!";

    fn generate_token(user_id: Uuid, email: &str, role: Role, secret: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp: now + 8 * 60 * 60,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn token_roundtrip_yields_principal() {
        let id = Uuid::new_v4();
        let token = generate_token(id, "tech@example.com", Role::Technician, SECRET);

        let request = Request::with_token(token, EmptyPayload::default());
        let principal = extract_auth(&request, SECRET).unwrap();

        assert_eq!(principal.id, id);
        assert_eq!(principal.role, Role::Technician);
    }

    #[test]
    fn missing_token_is_rejected() {
        let request: Request<EmptyPayload> = Request {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            token: None,
            payload: EmptyPayload::default(),
        };
        assert!(extract_auth(&request, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(Uuid::new_v4(), "c@example.com", Role::Client, SECRET);
        let request = Request::with_token(token, EmptyPayload::default());
        assert!(extract_auth(&request, "another-secret-also-long-enough!!").is_err());
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("client"), Some(Role::Client));
    }
}
