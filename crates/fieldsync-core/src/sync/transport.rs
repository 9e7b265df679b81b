//! Push transport: the trait the sync service calls and its HTTP client.

use std::future::Future;

use reqwest::StatusCode;
use serde::Deserialize;

use super::user_data::{UserDataPushInput, UserDataPushResponse};
use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Sends a combined user data push and returns the server's per-entity
/// results.
///
/// `Err` is a whole-batch failure: nothing in it has been applied.
pub trait UserDataTransport: Send + Sync + 'static {
    fn push_user_data(
        &self,
        input: &UserDataPushInput,
    ) -> impl Future<Output = Result<UserDataPushResponse>> + Send;
}

#[derive(Clone)]
pub struct HttpUserDataTransport {
    endpoint: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpUserDataTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpUserDataTransport")
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpUserDataTransport {
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            access_token: normalize_text_option(access_token),
            client: reqwest::Client::builder().build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl UserDataTransport for HttpUserDataTransport {
    async fn push_user_data(&self, input: &UserDataPushInput) -> Result<UserDataPushResponse> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(input);
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        let body = response.text().await?;
        parse_push_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    data: Option<UserDataPushResponse>,
    #[serde(default)]
    errors: Vec<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Accepts either a bare response or one wrapped in `{"data": ...}`.
///
/// A body with no usable payload is a transport failure.
fn parse_push_response(body: &str) -> Result<UserDataPushResponse> {
    let response = match serde_json::from_str::<PushEnvelope>(body) {
        Ok(PushEnvelope { data: Some(data), .. }) => data,
        Ok(envelope) => {
            if let Some(message) = envelope
                .errors
                .into_iter()
                .find_map(|error| error.message.or(error.error))
            {
                return Err(Error::Transport(message.trim().to_string()));
            }
            parse_bare_response(body)?
        }
        Err(_) => parse_bare_response(body)?,
    };

    if !response.has_results() {
        return Err(Error::Transport(
            "push response did not include results".to_string(),
        ));
    }
    Ok(response)
}

fn parse_bare_response(body: &str) -> Result<UserDataPushResponse> {
    serde_json::from_str(body).map_err(|_| {
        Error::Transport(format!("unreadable push response: {}", compact_text(body)))
    })
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("push endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "push endpoint must include http:// or https://".to_string(),
        ))
    }
}
