//! Remote state client.
//!
//! Two operations: read the current state, and submit the edit form to get the
//! recomputed state back. The service is the only source of derived values;
//! nothing here recomputes the spectrum. No retries: the reconciliation loop
//! decides when to ask again.
//!
//! ```text
//! GET  {base}/api/v1/string-theory/        -> { status, data }
//! POST {base}/api/v1/string-theory/update  -> { status, data }
//! ```

use std::future::Future;

use serde_json::Value;

use crate::config::PanelConfig;
use crate::error::NetworkError;
use crate::state::{FormValues, SystemState};

/// Path prefix of the string-theory API.
pub const API_PREFIX: &str = "/api/v1/string-theory";

/// The two network operations the panel needs.
///
/// Implemented over HTTP by [`HttpStateClient`]; tests substitute scripted
/// services.
pub trait StateService {
    fn fetch_state(&self) -> impl Future<Output = Result<SystemState, NetworkError>>;

    fn submit_state(
        &self,
        form: &FormValues,
    ) -> impl Future<Output = Result<SystemState, NetworkError>>;
}

/// [`StateService`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpStateClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStateClient {
    pub fn new(config: &PanelConfig) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| NetworkError::NetworkFailure(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn state_url(&self) -> String {
        format!("{}{API_PREFIX}/", self.base_url)
    }

    pub fn update_url(&self) -> String {
        format!("{}{API_PREFIX}/update", self.base_url)
    }

    async fn read(response: reqwest::Response) -> Result<SystemState, NetworkError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

impl StateService for HttpStateClient {
    async fn fetch_state(&self) -> Result<SystemState, NetworkError> {
        let response = self.http.get(self.state_url()).send().await?;
        Self::read(response).await
    }

    async fn submit_state(&self, form: &FormValues) -> Result<SystemState, NetworkError> {
        let response = self
            .http
            .post(self.update_url())
            .json(form)
            .send()
            .await?;
        Self::read(response).await
    }
}

/// Turn an HTTP status and body into a state or a classified error.
///
/// - non-2xx: application error carrying the body
/// - `status != "success"`: application error carrying the body
/// - anything unparseable or incomplete: malformed response
pub fn decode_response(http_status: u16, body: &str) -> Result<SystemState, NetworkError> {
    if !(200..300).contains(&http_status) {
        return Err(NetworkError::ApplicationError {
            http_status: Some(http_status),
            payload: body.to_string(),
        });
    }

    let envelope: Value = serde_json::from_str(body)
        .map_err(|e| NetworkError::malformed(format!("body is not JSON: {e}"), body))?;

    match envelope.get("status").and_then(Value::as_str) {
        Some("success") => {}
        Some(_) => {
            return Err(NetworkError::ApplicationError {
                http_status: None,
                payload: body.to_string(),
            });
        }
        None => return Err(NetworkError::malformed("missing status", body)),
    }

    let data = envelope
        .get("data")
        .ok_or_else(|| NetworkError::malformed("missing data", body))?;
    SystemState::from_data(data).map_err(|reason| NetworkError::malformed(reason, body))
}
