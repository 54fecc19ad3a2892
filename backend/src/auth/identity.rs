//! Dashboard session verification against Firebase Authentication.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header,
    errors::ErrorKind,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const ACCOUNTS_LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

/// Verified dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("id token expired")]
    Expired,

    #[error("id token revoked")]
    Revoked,

    #[error("invalid id token argument: {0}")]
    InvalidArgument(String),

    #[error("identity provider error: {0}")]
    Other(String),
}

impl IdentityError {
    pub fn cause(&self) -> &'static str {
        match self {
            IdentityError::Expired => "expired",
            IdentityError::Revoked => "revoked",
            IdentityError::InvalidArgument(_) => "invalid argument",
            IdentityError::Other(_) => "provider error",
        }
    }
}

/// External identity provider for dashboard sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(
        &self,
        token: &str,
        check_revoked: bool,
    ) -> Result<SessionIdentity, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    auth_time: i64,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    valid_since: Option<String>,
    #[serde(default)]
    disabled: bool,
}

/// Verifies Firebase ID tokens.
///
/// Signatures are checked against Google's published signing keys, cached
/// in-process and refreshed when a token names an unknown `kid`. Revocation
/// is checked by comparing the token's `auth_time` with the account's
/// `validSince` from the Identity Toolkit.
#[derive(Clone)]
pub struct FirebaseAuth {
    project_id: String,
    api_key: String,
    http: reqwest::Client,
    keys: Arc<RwLock<HashMap<String, Jwk>>>,
}

impl FirebaseAuth {
    pub fn new(project_id: String, api_key: String, http: reqwest::Client) -> Self {
        Self {
            project_id,
            api_key,
            http,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk, IdentityError> {
        if let Some(jwk) = self.keys.read().await.get(kid) {
            return Ok(jwk.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidArgument(format!("unknown key id {kid}")))
    }

    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        tracing::info!("Refreshing Firebase signing keys");

        let set: JwkSet = self
            .http
            .get(JWKS_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityError::Other(format!("fetching signing keys: {e}")))?
            .json()
            .await
            .map_err(|e| IdentityError::Other(format!("parsing signing keys: {e}")))?;

        let fresh: HashMap<String, Jwk> = set
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect();

        tracing::debug!("Cached {} Firebase signing keys", fresh.len());
        *self.keys.write().await = fresh;
        Ok(())
    }

    async fn check_revoked(&self, token: &str, claims: &FirebaseClaims) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(ACCOUNTS_LOOKUP_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| IdentityError::Other(format!("account lookup: {e}")))?;

        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            return Err(if body.contains("TOKEN_EXPIRED") {
                IdentityError::Expired
            } else if body.contains("USER_NOT_FOUND") {
                IdentityError::Revoked
            } else {
                IdentityError::InvalidArgument(body)
            });
        }

        let lookup: LookupResponse = resp
            .error_for_status()
            .map_err(|e| IdentityError::Other(format!("account lookup: {e}")))?
            .json()
            .await
            .map_err(|e| IdentityError::Other(format!("account lookup response: {e}")))?;

        let user = lookup
            .users
            .into_iter()
            .find(|u| u.local_id == claims.sub)
            .ok_or(IdentityError::Revoked)?;

        if user.disabled {
            return Err(IdentityError::Other("user disabled".into()));
        }

        let valid_since = user
            .valid_since
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        if claims.auth_time < valid_since {
            return Err(IdentityError::Revoked);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn verify_id_token(
        &self,
        token: &str,
        check_revoked: bool,
    ) -> Result<SessionIdentity, IdentityError> {
        let header =
            decode_header(token).map_err(|e| IdentityError::InvalidArgument(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidArgument(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidArgument("missing kid".into()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdentityError::Other(format!("unusable signing key: {e}")))?;

        let claims = decode::<FirebaseClaims>(token, &key, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::InvalidArgument(e.to_string()),
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(IdentityError::InvalidArgument("empty subject".into()));
        }

        if check_revoked {
            self.check_revoked(token, &claims).await?;
        }

        Ok(SessionIdentity {
            uid: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
        })
    }
}
