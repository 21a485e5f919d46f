//! Clerk session-token verification against a JWKS endpoint (RS256).

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::server::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid token")]
    MissingToken,

    #[error("Invalid signing key")]
    UnknownKey,

    #[error("JWT Error: {0}")]
    Invalid(String),

    #[error("Signing keys unavailable: {0}")]
    Jwks(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::Invalid(_) => ApiError::Unauthorized(err.to_string()),
            AuthError::UnknownKey => ApiError::Forbidden(err.to_string()),
            AuthError::Jwks(_) => ApiError::Unavailable(err.to_string()),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Shortest time between two JWKS fetches.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    /// Last fetch attempt, successful or not
    fetched_at: Option<Instant>,
}

pub struct JwksVerifier {
    jwks_url: Option<String>,
    http: reqwest::Client,
    cache: RwLock<KeyCache>,
    min_refresh: Duration,
}

impl JwksVerifier {
    /// Keys are fetched from `jwks_url` on first use and again when a token
    /// names a key that is not cached, at most once per [`MIN_REFRESH_INTERVAL`].
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: Some(jwks_url.into()),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            cache: RwLock::new(KeyCache::default()),
            min_refresh: MIN_REFRESH_INTERVAL,
        }
    }

    /// Fixed key set, never refreshed.
    pub fn from_jwk_set(keys: JwkSet) -> Self {
        Self {
            jwks_url: None,
            http: reqwest::Client::new(),
            cache: RwLock::new(KeyCache {
                keys: Some(keys),
                fetched_at: None,
            }),
            min_refresh: MIN_REFRESH_INTERVAL,
        }
    }

    pub fn with_min_refresh(mut self, interval: Duration) -> Self {
        self.min_refresh = interval;
        self
    }

    pub async fn verify(&self, token: &str) -> Result<ClerkClaims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Invalid("token header has no kid".to_string()))?;

        let jwk = self.key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::Invalid(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;

        let data = decode::<ClerkClaims>(token, &key, &validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        debug!(user_id = %data.claims.sub, "Session token verified");
        Ok(data.claims)
    }

    async fn key(&self, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(jwk) = self.cached(kid).await {
            return Ok(jwk);
        }
        let Some(url) = &self.jwks_url else {
            return Err(AuthError::UnknownKey);
        };

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(jwk) = cache.keys.as_ref().and_then(|keys| keys.find(kid)) {
            return Ok(jwk.clone());
        }
        if cache
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.min_refresh)
        {
            debug!(kid = %kid, "Signing keys refreshed recently, not refetching");
            return Err(match cache.keys {
                Some(_) => AuthError::UnknownKey,
                None => AuthError::Jwks("refresh throttled after a failed fetch".to_string()),
            });
        }

        info!(kid = %kid, "Refreshing signing keys");
        cache.fetched_at = Some(Instant::now());
        let keys = self.fetch(url).await?;
        let jwk = keys.find(kid).cloned();
        cache.keys = Some(keys);

        jwk.ok_or_else(|| {
            warn!(kid = %kid, "Token signed with unknown key");
            AuthError::UnknownKey
        })
    }

    async fn cached(&self, kid: &str) -> Option<Jwk> {
        self.cache.read().await.keys.as_ref()?.find(kid).cloned()
    }

    async fn fetch(&self, url: &str) -> Result<JwkSet, AuthError> {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Jwks(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(bearer_token(Some("abc.def")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(Some("Bearer ")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
    }

    fn token_with_kid(kid: &str) -> String {
        let mut header = jsonwebtoken::Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        let claims = ClerkClaims {
            sub: "user_1".to_string(),
            email: None,
            exp: 4_102_444_800,
        };
        jsonwebtoken::encode(&header, &claims, &jsonwebtoken::EncodingKey::from_secret(b"k")).unwrap()
    }

    /// Local JWKS endpoint serving an empty key set. Returns its URL and a hit counter.
    async fn jwks_server() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/jwks",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({ "keys": [] }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/jwks", addr), hits)
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_at_most_once_per_interval() {
        let (url, hits) = jwks_server().await;
        let verifier = JwksVerifier::new(url);

        for kid in ["rotated-1", "rotated-2", "rotated-1"] {
            let result = verifier.verify(&token_with_kid(kid)).await;
            assert!(matches!(result, Err(AuthError::UnknownKey)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_after_interval() {
        let (url, hits) = jwks_server().await;
        let verifier = JwksVerifier::new(url).with_min_refresh(Duration::ZERO);

        for _ in 0..2 {
            let result = verifier.verify(&token_with_kid("rotated")).await;
            assert!(matches!(result, Err(AuthError::UnknownKey)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_retried_immediately() {
        let verifier = JwksVerifier::new("http://127.0.0.1:9/jwks");

        let first = verifier.verify(&token_with_kid("any")).await;
        assert!(matches!(first, Err(AuthError::Jwks(_))));

        let second = verifier.verify(&token_with_kid("any")).await;
        match second {
            Err(AuthError::Jwks(message)) => assert!(message.contains("throttled")),
            other => panic!("expected throttled fetch, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let verifier = JwksVerifier::from_jwk_set(JwkSet { keys: Vec::new() });
        assert!(matches!(verifier.verify("not-a-jwt").await, Err(AuthError::Invalid(_))));
    }
}
