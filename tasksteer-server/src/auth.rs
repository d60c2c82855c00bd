//! Bearer-token gate.
//!
//! The server never inspects tokens itself. A [`TokenVerifier`] turns a
//! token into an [`Identity`]; [`require_auth`] runs it for every protected
//! route and stores the identity as a request extension.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::config::StaticIdentity;
use crate::error::ApiError;
use crate::server::AppState;

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Identity-provider user id.
    pub uid: String,
    /// Verified email, when the provider reports one.
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            uid: uid.into(),
            email: email.map(str::to_string),
        }
    }

    /// Key used in list membership sets: lowercased email, else the uid.
    #[must_use]
    pub fn member_key(&self) -> String {
        self.email
            .as_deref()
            .map_or_else(|| self.uid.clone(), str::to_lowercase)
    }
}

/// Token verification failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider rejected the token.
    #[error("invalid ID token")]
    InvalidToken,
    /// The provider could not be asked.
    #[error("token verification unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token to the caller's identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Fixed token table, for local development and tests.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    /// Builds the table from `[auth.tokens]`.
    #[must_use]
    pub fn from_config(tokens: &BTreeMap<String, StaticIdentity>) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(token, id)| (token.clone(), Identity::new(&id.uid, id.email.as_deref())))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let identity = self.tokens.get(token).ok_or(AuthError::InvalidToken)?;
        Ok(identity.clone())
    }
}

/// Verifies ID tokens with the identity provider's `accounts:lookup` REST call.
pub struct IdentityToolkitVerifier {
    client: reqwest::Client,
    lookup_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl IdentityToolkitVerifier {
    /// Creates a verifier against `base_url` (normally
    /// `https://identitytoolkit.googleapis.com`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            lookup_url: format!("{}/v1/accounts:lookup", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .post(&self.lookup_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            return Err(AuthError::Unavailable(format!("lookup returned {status}")));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        let Some(user) = body.users.into_iter().next() else {
            return Err(AuthError::InvalidToken);
        };
        Ok(Identity {
            uid: user.local_id,
            email: user.email,
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

const MISSING_TOKEN: &str = "Missing or invalid authorization token";

/// Middleware that rejects requests without a valid bearer token.
///
/// On success the caller's [`Identity`] is available to handlers as
/// `Extension<Identity>`.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for a missing, malformed, rejected or
/// unverifiable token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or(ApiError::Unauthorized(MISSING_TOKEN))?;

    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(AuthError::InvalidToken) => return Err(ApiError::Unauthorized("Invalid ID token")),
        Err(AuthError::Unavailable(detail)) => {
            tracing::warn!(error = %detail, "token verification error");
            return Err(ApiError::Unauthorized("Could not verify token"));
        }
    };

    tracing::debug!(user_id = %identity.uid, path = %request.uri().path(), "request authenticated");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
