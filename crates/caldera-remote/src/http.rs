use crate::{ApiConfig, ApiError, RemoteApi};
use caldera_schema::Args;
use serde_json::Value;
use std::io::Read;
use tracing::debug;

/// HTTP control-plane client.
///
/// Operations are invoked as `POST {base}/{service}/{operation}` with the
/// coerced arguments as a JSON body and the response document as a JSON
/// body. A bare HTTP 404 maps to [`ApiError::NotFound`]; failure bodies of
/// the form `{"code": "...", "message": "..."}` map to [`ApiError::Api`].
pub struct HttpApi {
    config: ApiConfig,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> Self {
        // Statuses are handled below so failure bodies stay readable.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    fn url(&self, service: &str, operation: &str) -> String {
        format!("{}/{}/{}", self.config.url, service, operation)
    }
}

impl RemoteApi for HttpApi {
    fn invoke(&self, service: &str, operation: &str, args: &Args) -> Result<Value, ApiError> {
        let url = self.url(service, operation);
        let body = serde_json::to_vec(args).map_err(|e| ApiError::Serialization(e.to_string()))?;
        debug!("POST {url} ({} bytes)", body.len());

        let mut req = self.agent.post(&url).header("Content-Type", "application/json");
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = req
            .send(&body[..])
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let mut reader = resp.into_body().into_reader();
        let mut raw = Vec::new();
        reader
            .read_to_end(&mut raw)
            .map_err(|e| ApiError::Http(e.to_string()))?;

        if status >= 400 {
            if let Some((code, message)) = decode_error_body(&raw) {
                return Err(ApiError::Api { code, message });
            }
            if status == 404 {
                return Err(ApiError::NotFound(url));
            }
            return Err(ApiError::Http(format!("HTTP {status} for {url}")));
        }

        if raw.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&raw).map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

/// Decode a structured failure body, tolerating bodies that are not JSON.
fn decode_error_body(raw: &[u8]) -> Option<(String, String)> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    let code = value.get("code")?.as_str()?.to_owned();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some((code, message))
}
