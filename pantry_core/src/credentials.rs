//! Bearer credential lifecycle for the primary catalog provider.
//!
//! ```text
//! absent --issue()--> valid --(time passes | issue() fails)--> expired --issue()--> valid
//! ```
//!
//! There is no automatic refresh. A 401 from any call surfaces as
//! [`CatalogError::Authentication`] and needs a manual re-issue.

use crate::auth_store::{CredentialStore, StoredCredential};
use crate::error::{CatalogError, Result};
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A bearer credential as issued by the token endpoint.
///
/// Never mutated; a new `issue()` replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        let token = token.into();
        let expires_at = decode_expiry(&token);
        Self {
            token,
            issued_at,
            expires_at,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Locally recorded issuance time.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Expiry from the token's own claims, if they decode.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl From<StoredCredential> for BearerToken {
    fn from(stored: StoredCredential) -> Self {
        BearerToken::new(stored.token, stored.issued_at)
    }
}

/// Decode the claims object carried in the middle segment of a signed token.
pub fn decode_claims(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || payload.is_empty() {
        return None;
    }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.is_object().then_some(claims)
}

fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(token)?;
    let exp = claims.get("exp")?;
    let secs = exp
        .as_i64()
        .or_else(|| exp.as_f64().map(|f| f as i64))
        .or_else(|| exp.as_str().and_then(|s| s.trim().parse::<i64>().ok()))?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Fail-closed expiry check: expired unless the claims decode to a future `exp`.
pub fn is_expired_at(token: &BearerToken, now: DateTime<Utc>) -> bool {
    match token.expires_at {
        Some(exp) => exp <= now,
        None => true,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Issues, persists, and expiry-checks the primary provider's credential.
///
/// One instance is created at startup and shared (`Arc`) with every adapter
/// that needs it.
pub struct CredentialManager {
    client: Client,
    token_endpoint: String,
    store: Arc<dyn CredentialStore>,
    issue_lock: Mutex<()>,
}

impl CredentialManager {
    pub fn new(
        client: Client,
        token_endpoint: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            token_endpoint: token_endpoint.into(),
            store,
            issue_lock: Mutex::new(()),
        }
    }

    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Exchange username/password for a bearer token and persist it.
    ///
    /// Calls are serialized: a second caller waits for the first to finish.
    pub async fn issue(&self, username: &str, password: &str) -> Result<BearerToken> {
        let _guard = self.issue_lock.lock().await;

        if username.trim().is_empty() || password.is_empty() {
            return Err(CatalogError::InvalidInput(
                "username and password are required".into(),
            ));
        }

        debug!(endpoint = %self.token_endpoint, "requesting bearer credential");
        let form = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401 | 403) {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "credential rejected by token endpoint");
            return Err(CatalogError::Authentication(format!(
                "credentials rejected ({}): {}",
                status,
                body.trim()
            )));
        }
        if status.as_u16() == 429 {
            return Err(CatalogError::RateLimit {
                retry_after: crate::connectors::retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            return Err(CatalogError::network(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::MalformedResponse(format!("token response: {}", e)))?;
        let access_token = body
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CatalogError::Authentication("token endpoint returned no access_token".into())
            })?;
        if let Some(kind) = body.token_type.as_deref() {
            if !kind.eq_ignore_ascii_case("bearer") {
                debug!(token_type = kind, "unexpected token type; using as bearer anyway");
            }
        }

        let issued_at = Utc::now();
        let token = BearerToken::new(access_token, issued_at);
        self.store
            .save(&StoredCredential {
                token: token.as_str().to_string(),
                issued_at,
            })
            .map_err(|e| CatalogError::Store(e.to_string()))?;

        info!(
            expires_at = ?token.expires_at(),
            expires_in = ?body.expires_in,
            "bearer credential issued"
        );
        Ok(token)
    }

    /// The persisted token, if any. Expired tokens are still returned.
    pub fn current_token(&self) -> Option<BearerToken> {
        self.store.load().map(BearerToken::from)
    }

    pub fn is_expired(&self, token: &BearerToken) -> bool {
        is_expired_at(token, Utc::now())
    }

    /// The current token if it is present and not known to be stale.
    pub fn valid_token(&self) -> Result<BearerToken> {
        let token = self.current_token().ok_or_else(|| {
            CatalogError::Authentication("no credential issued; run `pantry login`".into())
        })?;
        if self.is_expired(&token) {
            return Err(CatalogError::Authentication(
                "credential expired; run `pantry login` to re-issue".into(),
            ));
        }
        Ok(token)
    }

    /// Whole days since the local issuance time. Independent of the server expiry.
    pub fn age_in_days(&self, token: &BearerToken) -> i64 {
        age_in_days_at(token, Utc::now())
    }

    /// Discard the persisted credential (logout or an observed 401).
    pub fn invalidate(&self) -> Result<()> {
        self.store
            .clear()
            .map_err(|e| CatalogError::Store(e.to_string()))
    }
}

pub fn age_in_days_at(token: &BearerToken, now: DateTime<Utc>) -> i64 {
    (now - token.issued_at).num_days().max(0)
}

/// Build a signed-token-shaped string carrying the given claims. Test helper.
#[cfg(test)]
pub(crate) fn token_with_claims(claims: &Value) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.{}",
        engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        engine.encode(claims.to_string()),
        engine.encode(b"signature")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_store::MemoryCredentialStore;
    use chrono::Duration;
    use serde_json::json;

    fn manager(store: Arc<dyn CredentialStore>) -> CredentialManager {
        CredentialManager::new(Client::new(), "http://127.0.0.1:9/token", store)
    }

    #[test]
    fn test_past_exp_is_expired() {
        let token = BearerToken::new(token_with_claims(&json!({"exp": 1_000_000_000})), Utc::now());
        assert!(token.expires_at().is_some());
        assert!(is_expired_at(&token, Utc::now()));
    }

    #[test]
    fn test_future_exp_is_valid() {
        let exp = (Utc::now() + Duration::hours(2)).timestamp();
        let token = BearerToken::new(token_with_claims(&json!({"exp": exp, "sub": "ops"})), Utc::now());
        assert!(!is_expired_at(&token, Utc::now()));
    }

    #[test]
    fn test_structurally_invalid_tokens_are_expired() {
        let now = Utc::now();
        let future = (now + Duration::hours(2)).timestamp();
        let cases = vec![
            "".to_string(),
            "opaque-token".to_string(),
            "a.b".to_string(),
            "a.!!!notbase64.c".to_string(),
            format!("a.{}.c", base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("not json")),
            token_with_claims(&json!({"sub": "no-exp"})),
            token_with_claims(&json!({"exp": "soon"})),
            format!("{}.extra", token_with_claims(&json!({"exp": future}))),
        ];
        for raw in cases {
            let token = BearerToken::new(raw.clone(), now);
            assert!(is_expired_at(&token, now), "expected '{}' to be expired", raw);
        }
    }

    #[test]
    fn test_padded_payload_decodes() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let payload = base64::engine::general_purpose::URL_SAFE.encode(json!({"exp": exp}).to_string());
        let token = BearerToken::new(format!("h.{}.s", payload), Utc::now());
        assert!(!is_expired_at(&token, Utc::now()));
    }

    #[test]
    fn test_age_is_local_and_independent_of_exp() {
        let issued = Utc::now() - Duration::days(3) - Duration::hours(1);
        let token = BearerToken::new(token_with_claims(&json!({"exp": 1})), issued);
        assert_eq!(age_in_days_at(&token, Utc::now()), 3);
        let fresh = BearerToken::new("x", Utc::now() + Duration::minutes(5));
        assert_eq!(age_in_days_at(&fresh, Utc::now()), 0);
    }

    #[test]
    fn test_valid_token_fails_closed() {
        let store = Arc::new(MemoryCredentialStore::new());
        let creds = manager(store.clone());
        assert!(matches!(creds.valid_token(), Err(CatalogError::Authentication(_))));

        store
            .save(&StoredCredential {
                token: token_with_claims(&json!({"exp": 1_000})),
                issued_at: Utc::now(),
            })
            .unwrap();
        assert!(creds.current_token().is_some());
        assert!(matches!(creds.valid_token(), Err(CatalogError::Authentication(_))));

        creds.invalidate().unwrap();
        assert!(creds.current_token().is_none());
    }

    #[tokio::test]
    async fn test_issue_requires_credentials() {
        let creds = manager(Arc::new(MemoryCredentialStore::new()));
        let err = creds.issue("  ", "secret").await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_issue_unreachable_endpoint_is_network_error() {
        let creds = manager(Arc::new(MemoryCredentialStore::new()));
        let err = creds.issue("ops", "secret").await.unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }), "got {:?}", err);
    }
}
