//! HTTP client for the PayPal REST API.

use std::time::{Duration, Instant};

use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::PayPalConfig;
use crate::gateway::ApiError;

/// HTTP request timeout when none is configured.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the access token this long before PayPal expires it.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const TOKEN_ENDPOINT: &str = "/v1/oauth2/token";

/// Header PayPal uses to deduplicate retried requests.
const REQUEST_ID_HEADER: &str = "PayPal-Request-Id";

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Configuration for creating a new Client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_config(config: &PayPalConfig) -> Self {
        Self {
            base_url: config.api_url().trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout: if config.timeout.is_zero() {
                DEFAULT_REQUEST_TIMEOUT
            } else {
                config.timeout
            },
        }
    }
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// HTTP client for the PayPal REST API.
/// Handles OAuth token exchange, idempotency headers and error decoding.
pub struct Client {
    config: ClientConfig,
    http_client: HttpClient,
    token: Mutex<Option<CachedToken>>,
}

impl Client {
    /// Creates a new PayPal API client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            http_client,
            token: Mutex::new(None),
        })
    }

    /// Creates a new PayPal API client from the gateway config.
    pub fn from_config(config: &PayPalConfig) -> Result<Self> {
        Self::new(ClientConfig::from_config(config))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Builds the HTTP Basic credential for the token endpoint.
    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }

    /// Returns a valid access token, exchanging credentials when the cached
    /// one is missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(ref cached) = *guard {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(ClientError::Auth(
                "PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET are not set".to_string(),
            ));
        }

        let url = format!("{}{}", self.config.base_url, TOKEN_ENDPOINT);
        debug!(endpoint = TOKEN_ENDPOINT, "requesting access token");

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, self.basic_auth())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = parse_error_response(status, &body);
            warn!(status = status.as_u16(), error = %err, "token request rejected");
            return Err(ClientError::Auth(err.to_string()));
        }

        let token: TokenResponse = serde_json::from_slice(&body)?;

        *guard = match token_refresh_at(Instant::now(), token.expires_in) {
            Some(refresh_at) => Some(CachedToken {
                access_token: token.access_token.clone(),
                refresh_at,
            }),
            None => {
                warn!(expires_in = token.expires_in, "token lifetime out of range, not caching");
                None
            }
        };

        debug!(expires_in = token.expires_in, "access token refreshed");
        Ok(token.access_token)
    }

    /// Drops the cached token so the next request authenticates again.
    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Sends an authenticated request to the PayPal API.
    /// When `request_id` is set PayPal treats repeats of the call as one.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        request_id: Option<&str>,
    ) -> Result<Vec<u8>> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.config.base_url, endpoint);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(token);

        if let Some(body) = body {
            request = request.json(body);
        }

        if let Some(id) = request_id {
            request = request.header(REQUEST_ID_HEADER, id);
        }

        debug!(
            method = %method,
            endpoint = %endpoint,
            idempotent = request_id.is_some(),
            "sending request"
        );

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
        }

        if status.is_client_error() || status.is_server_error() {
            let err = parse_error_response(status, &body);
            warn!(
                status = err.status,
                name = %err.name,
                message = %err.message,
                debug_id = err.debug_id.as_deref().unwrap_or(""),
                "api error"
            );
            return Err(ClientError::Api(err));
        }

        Ok(body.to_vec())
    }
}

/// When a token issued at `now` should be replaced, or None if the lifetime
/// cannot be represented.
pub(crate) fn token_refresh_at(now: Instant, expires_in: u64) -> Option<Instant> {
    let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
    now.checked_add(lifetime)
}

/// Decodes a PayPal error body.
///
/// Handles both the REST shape (`name`, `message`, `details`) and the OAuth
/// shape (`error`, `error_description`), falling back to the raw body.
pub(crate) fn parse_error_response(status: StatusCode, body: &[u8]) -> ApiError {
    #[derive(Deserialize)]
    struct ErrorResponse {
        name: Option<String>,
        message: Option<String>,
        debug_id: Option<String>,
        #[serde(default)]
        details: serde_json::Value,
        error: Option<String>,
        error_description: Option<String>,
    }

    let fallback_name = status
        .canonical_reason()
        .unwrap_or("UNKNOWN_ERROR")
        .to_uppercase()
        .replace(' ', "_");

    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(resp) => ApiError {
            status: status.as_u16(),
            name: resp.name.or(resp.error).unwrap_or(fallback_name),
            message: resp
                .message
                .or(resp.error_description)
                .unwrap_or_else(|| String::from_utf8_lossy(body).to_string()),
            debug_id: resp.debug_id,
            details: resp.details,
        },
        Err(_) => ApiError {
            status: status.as_u16(),
            name: fallback_name,
            message: String::from_utf8_lossy(body).to_string(),
            debug_id: None,
            details: serde_json::Value::Null,
        },
    }
}
