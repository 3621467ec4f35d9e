//! GraphQL authentication and context extraction
//!
//! Provides helpers for:
//! - Issuing and verifying HS256 bearer tokens
//! - Hashing and checking passwords with argon2
//! - Resolving the `Authorization` header to a [`Viewer`]
//! - Reading the viewer back inside resolvers

use std::time::{SystemTime, UNIX_EPOCH};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_graphql::{Context, ErrorExtensions};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::models::User;
use crate::store::{RecordId, StoreResult, Stores};
use crate::ApiError;

/// Token claims. `sub` is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated user of a request.
#[derive(Debug, Clone)]
pub struct Viewer(pub User);

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Signs a token for `user_id`.
pub fn issue_token(user_id: &RecordId, config: &AuthConfig) -> crate::Result<String> {
    let iat = unix_now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat,
        exp: iat + config.token_ttl.as_secs(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?)
}

/// Checks signature and expiry and returns the claims.
pub fn verify_token(token: &str, config: &AuthConfig) -> crate::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> crate::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// `true` when `password` matches the stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the request's bearer token to a user.
///
/// A missing, invalid or expired token, or one whose user no longer
/// exists, yields `Ok(None)`; the request then runs anonymously. Only a
/// failing user lookup is an error.
pub async fn authenticate(
    headers: &HeaderMap,
    stores: &Stores,
    config: &AuthConfig,
) -> StoreResult<Option<User>> {
    let Some(token) = extract_bearer(headers) else {
        return Ok(None);
    };
    let claims = match verify_token(token, config) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "Rejected bearer token");
            return Ok(None);
        }
    };

    let user = stores.users.find_by_id(&RecordId::from(claims.sub)).await?;
    match &user {
        Some(user) => debug!(user = %user.username, "Authenticated request"),
        None => warn!("Token subject no longer exists"),
    }
    Ok(user)
}

/// Get the viewer from GraphQL context
pub fn viewer<'a>(ctx: &Context<'a>) -> Option<&'a User> {
    ctx.data_opt::<Viewer>().map(|viewer| &viewer.0)
}

/// Get the viewer, failing with `UNAUTHENTICATED` when there is none
pub fn require_viewer<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a User> {
    viewer(ctx).ok_or_else(|| ApiError::Unauthenticated.extend())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".into(),
            token_ttl: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let id = RecordId::generate();
        let token = issue_token(&id, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_token_with_other_secret_is_rejected() {
        let token = issue_token(&RecordId::generate(), &config()).unwrap();
        let other = AuthConfig {
            secret: "other".into(),
            ..config()
        };
        assert!(matches!(verify_token(&token, &other), Err(ApiError::Token(_))));
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-hash"));
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_user() {
        let stores = Stores::in_memory();
        let user = crate::fixtures::user("octocat");
        stores.users.insert(&user).await.unwrap();

        let token = issue_token(&user.id, &config()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let found = authenticate(&headers, &stores, &config()).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        headers.insert("Authorization", HeaderValue::from_static("Bearer garbage"));
        assert!(authenticate(&headers, &stores, &config()).await.unwrap().is_none());

        assert!(authenticate(&HeaderMap::new(), &stores, &config()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_anonymous() {
        let stores = Stores::in_memory();
        let token = issue_token(&RecordId::generate(), &config()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert!(authenticate(&headers, &stores, &config()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_user_lookup_is_an_error() {
        let mut stores = Stores::in_memory();
        stores.users = std::sync::Arc::new(crate::fixtures::FailingStore);
        let token = issue_token(&RecordId::generate(), &config()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let err = authenticate(&headers, &stores, &config()).await.unwrap_err();
        assert!(matches!(err, crate::store::StoreError::Backend(_)));

        // No token means no lookup.
        assert!(authenticate(&HeaderMap::new(), &stores, &config()).await.unwrap().is_none());
    }
}
