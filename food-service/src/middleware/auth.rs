//! Bearer-token authentication.
//!
//! Tokens are JWTs signed either with a shared HS256 secret or with an RS256
//! key (e.g. a Firebase/Google signing certificate). When authentication is
//! disabled every request runs as [`ANONYMOUS_USER`].

use crate::config::AuthConfig;
use crate::startup::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;
use std::fs;

pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    /// Firebase carries the uid here as well as in `sub`.
    #[serde(default)]
    user_id: Option<String>,
}

pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        let (decoding_key, algorithm) = if let Some(path) = &config.public_key_path {
            let pem = fs::read_to_string(path).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Failed to read public key from {}: {}",
                    path,
                    e
                ))
            })?;
            let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to parse public key: {}", e))
            })?;
            (key, Algorithm::RS256)
        } else if let Some(secret) = &config.jwt_secret {
            (
                DecodingKey::from_secret(secret.expose_secret().as_bytes()),
                Algorithm::HS256,
            )
        } else {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "No JWT secret or public key configured"
            )));
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        tracing::info!(algorithm = ?algorithm, "Token verification enabled");
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify the token and return the caller's user id.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        data.claims
            .sub
            .or(data.claims.user_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Token has no subject")))
    }
}

fn missing_credentials() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!("Authorization header missing or invalid"))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(verifier) = state.token_verifier.as_deref() else {
            return Ok(AuthUser {
                user_id: ANONYMOUS_USER.to_string(),
            });
        };

        let token = bearer_token(parts).ok_or_else(missing_credentials)?;
        let user_id = verifier.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected bearer token");
            e
        })?;

        tracing::Span::current().record("user_id", user_id.as_str());
        Ok(AuthUser { user_id })
    }
}
