//! Bearer-token authentication middleware.
//!
//! Identity issuance is an external collaborator; this layer only verifies
//! the HS256 token the auth provider minted and attaches the caller to the
//! request. Handlers decide what the caller may do: partner routes need a
//! subject, admin routes the `admin` role, webhook routes the `service`
//! role.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use bloom_types::anyhow;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

/// Verification key for inbound bearer tokens, built once at startup and
/// held in state.
#[derive(Clone)]
pub struct JwtKey {
    decoding_key: DecodingKey,
}

impl JwtKey {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_env() -> bloom_types::Result<Self> {
        let secret =
            std::env::var("AUTH_JWT_SECRET").map_err(|_| anyhow!("AUTH_JWT_SECRET must be set"))?;
        Ok(Self::from_secret(&secret))
    }

    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default()).map(|data| data.claims)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub enum AppUser {
    Authenticated(Claims),
    Unauthorized,
}

impl AppUser {
    pub fn sub(&self) -> Result<String, ApiError> {
        match self {
            AppUser::Authenticated(claims) => Ok(claims.sub.clone()),
            AppUser::Unauthorized => Err(ApiError::unauthorized("Authentication required")),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AppUser::Authenticated(claims) => claims.roles.iter().any(|r| r == role),
            AppUser::Unauthorized => false,
        }
    }

    pub fn require_role(&self, role: &str) -> Result<(), ApiError> {
        // Surface missing auth as 401 and missing role as 403.
        self.sub()?;
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("Requires the {} role", role)))
        }
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    // An absent token is an anonymous caller; a present-but-invalid one is
    // worth a log line.
    let user = match bearer {
        None => AppUser::Unauthorized,
        Some(token) => match state.jwt.decode(token) {
            Ok(claims) => AppUser::Authenticated(claims),
            Err(err) => {
                tracing::warn!("Rejected bearer token: {}", err);
                AppUser::Unauthorized
            }
        },
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_roles(roles: &[&str]) -> AppUser {
        AppUser::Authenticated(Claims {
            sub: "user_1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: i64::MAX,
        })
    }

    #[test]
    fn test_require_role_accepts_matching_role() {
        assert!(user_with_roles(&["admin"]).require_role("admin").is_ok());
    }

    #[test]
    fn test_require_role_rejects_missing_role() {
        assert!(user_with_roles(&["partner"]).require_role("admin").is_err());
    }

    #[test]
    fn test_unauthorized_user_has_no_sub() {
        assert!(AppUser::Unauthorized.sub().is_err());
        assert!(!AppUser::Unauthorized.has_role("admin"));
    }

    fn sign(secret: &str) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({ "sub": "user_1", "roles": ["admin"], "exp": i64::MAX }),
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_jwt_key_accepts_tokens_signed_with_the_shared_secret() {
        let key = JwtKey::from_secret("test-secret");
        let claims = key.decode(&sign("test-secret")).unwrap();
        assert_eq!(claims.sub, "user_1");
        assert!(claims.roles.contains(&"admin".to_string()));
    }

    #[test]
    fn test_jwt_key_rejects_foreign_signatures() {
        let key = JwtKey::from_secret("test-secret");
        assert!(key.decode(&sign("other-secret")).is_err());
    }
}
