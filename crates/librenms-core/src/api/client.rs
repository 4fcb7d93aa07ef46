//! API client for the LibreNMS REST API v0.
//!
//! The client attaches the `X-Auth-Token` header to every request and
//! verifies connectivity once, when it is constructed. After that it is a
//! thin passthrough: `get` surfaces failed statuses as errors, while `put`
//! hands the status back to the caller.

use std::time::Duration;

use reqwest::{header, Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds, applied to every request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header LibreNMS reads the API token from (`X-Auth-Token`)
const AUTH_HEADER: &str = "x-auth-token";

/// Endpoint used to verify connectivity at construction time
const SYSTEM_PATH: &str = "/api/v0/system";

/// Reported when the system endpoint does not include a version
const UNKNOWN_VERSION: &str = "unknown";

/// Body of a PUT response: parsed JSON when possible, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }
}

/// Authenticated client bound to one LibreNMS instance.
#[derive(Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    version: String,
}

impl ApiClient {
    /// Build a client for `url` and verify it by fetching `/api/v0/system`.
    ///
    /// Fails if the URL or token is unusable, the server is unreachable, or
    /// the system endpoint answers with a non-success status.
    pub async fn connect(url: &str, token: &str) -> Result<Self, ApiError> {
        let base_url = url.strip_suffix('/').unwrap_or(url).to_string();
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(Self::auth_headers(token)?)
            .build()?;

        let mut api = Self {
            client,
            base_url,
            version: UNKNOWN_VERSION.to_string(),
        };

        let info = api.get(SYSTEM_PATH, None).await?;
        api.version = Self::extract_version(&info);
        info!(url = %api.base_url, version = %api.version, "Connected to LibreNMS");

        Ok(api)
    }

    fn auth_headers(token: &str) -> Result<header::HeaderMap, ApiError> {
        let mut value =
            header::HeaderValue::from_str(token).map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::HeaderName::from_static(AUTH_HEADER), value);
        Ok(headers)
    }

    /// Pull `system[0].local_ver` out of the system endpoint's response.
    fn extract_version(info: &Value) -> String {
        info.get("system")
            .and_then(|system| system.get(0))
            .and_then(|entry| entry.get("local_ver"))
            .map(|ver| match ver {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
    }

    /// Base URL with any single trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// LibreNMS version reported when the client connected
    pub fn version(&self) -> &str {
        &self.version
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` (e.g. `/api/v0/devices`) and return the parsed JSON body.
    ///
    /// Any non-success status is returned as an error.
    pub async fn get(&self, path: &str, params: Option<&[(&str, &str)]>) -> Result<Value, ApiError> {
        let mut request = self.client.get(self.url(path));
        if let Some(params) = params {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(path = path, status = %status, "GET");

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} did not return JSON: {}", path, e)))
    }

    /// PUT a JSON payload (an empty object when `data` is `None`).
    ///
    /// The status is returned rather than checked; only transport failures
    /// produce an error.
    pub async fn put(
        &self,
        path: &str,
        data: Option<&Value>,
    ) -> Result<(StatusCode, ResponseBody), ApiError> {
        let empty = Value::Object(Default::default());
        let payload = data.unwrap_or(&empty);

        let response = self.client.put(self.url(path)).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(path = path, status = %status, "PUT");

        Ok((status, ResponseBody::from_text(body)))
    }

    /// Release the underlying connection pool.
    pub fn close(self) {
        debug!(url = %self.base_url, "Closing LibreNMS client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const TOKEN: &str = "test-token";

    fn mock_system<'a>(server: &'a MockServer, version: &str) -> httpmock::Mock<'a> {
        let body = json!({"status": "ok", "system": [{"local_ver": version}], "count": 1});
        server.mock(|when, then| {
            when.method(GET)
                .path(SYSTEM_PATH)
                .header(AUTH_HEADER, TOKEN);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        })
    }

    #[tokio::test]
    async fn test_connect_probes_system_and_records_version() {
        let server = MockServer::start();
        let probe = mock_system(&server, "24.1.0");

        let client = ApiClient::connect(&server.base_url(), TOKEN)
            .await
            .expect("connect should succeed");

        probe.assert();
        assert_eq!(client.version(), "24.1.0");
        assert_eq!(client.base_url(), server.base_url());
        client.close();
    }

    #[tokio::test]
    async fn test_connect_strips_one_trailing_slash() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");

        let url = format!("{}/", server.base_url());
        let client = ApiClient::connect(&url, TOKEN).await.unwrap();
        assert_eq!(client.base_url(), server.base_url());
    }

    #[tokio::test]
    async fn test_connect_without_version_reports_unknown() {
        let server = MockServer::start();
        let _probe = server.mock(|when, then| {
            when.method(GET).path(SYSTEM_PATH);
            then.status(200).json_body(json!({"status": "ok"}));
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        assert_eq!(client.version(), "unknown");
    }

    #[tokio::test]
    async fn test_connect_fails_on_rejected_probe() {
        let server = MockServer::start();
        let _probe = server.mock(|when, then| {
            when.method(GET).path(SYSTEM_PATH);
            then.status(401).body("Unauthenticated.");
        });

        let err = ApiClient::connect(&server.base_url(), "bad-token")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized), "got: {err}");
    }

    #[tokio::test]
    async fn test_connect_fails_on_server_error() {
        let server = MockServer::start();
        let _probe = server.mock(|when, then| {
            when.method(GET).path(SYSTEM_PATH);
            then.status(500).body("oops");
        });

        let err = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_url() {
        let err = ApiClient::connect("", TOKEN).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_connect_rejects_token_with_newline() {
        let err = ApiClient::connect("http://127.0.0.1:1", "abc\ndef")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken), "got: {err}");
    }

    #[tokio::test]
    async fn test_get_returns_json_and_forwards_params() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let devices = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v0/devices")
                .query_param("type", "down")
                .header(AUTH_HEADER, TOKEN);
            then.status(200)
                .json_body(json!({"status": "ok", "devices": [{"device_id": 1}], "count": 1}));
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        let body = client
            .get("/api/v0/devices", Some(&[("type", "down")][..]))
            .await
            .unwrap();

        devices.assert();
        assert_eq!(body["devices"][0]["device_id"], 1);
    }

    #[tokio::test]
    async fn test_get_errors_on_failure_status() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let _missing = server.mock(|when, then| {
            when.method(GET).path("/api/v0/devices/nope");
            then.status(404)
                .json_body(json!({"status": "error", "message": "Device nope does not exist"}));
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        let err = client.get("/api/v0/devices/nope", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_get_errors_on_non_json_body() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let _html = server.mock(|when, then| {
            when.method(GET).path("/api/v0/ports");
            then.status(200).body("<html>login</html>");
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        let err = client.get("/api/v0/ports", None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)), "got: {err}");
    }

    #[tokio::test]
    async fn test_put_sends_payload_and_returns_status() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v0/devices/1/maintenance")
                .json_body(json!({"duration": "2:00"}));
            then.status(201).json_body(json!({"status": "ok"}));
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        let payload = json!({"duration": "2:00"});
        let (status, body) = client
            .put("/api/v0/devices/1/maintenance", Some(&payload))
            .await
            .unwrap();

        update.assert();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, ResponseBody::Json(json!({"status": "ok"})));
    }

    #[tokio::test]
    async fn test_put_defaults_to_empty_object() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let update = server.mock(|when, then| {
            when.method(PUT).path("/api/v0/alerts/7").json_body(json!({}));
            then.status(200).json_body(json!({"status": "ok"}));
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();
        let (status, _) = client.put("/api/v0/alerts/7", None).await.unwrap();

        update.assert();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_put_reports_failure_statuses_without_error() {
        let server = MockServer::start();
        let _probe = mock_system(&server, "24.1.0");
        let _missing = server.mock(|when, then| {
            when.method(PUT).path("/api/v0/devices/99");
            then.status(404)
                .json_body(json!({"status": "error", "message": "not found"}));
        });
        let _broken = server.mock(|when, then| {
            when.method(PUT).path("/api/v0/devices/1");
            then.status(500).body("Internal Server Error");
        });

        let client = ApiClient::connect(&server.base_url(), TOKEN).await.unwrap();

        let (status, body) = client.put("/api/v0/devices/99", None).await.unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let ResponseBody::Json(value) = body else {
            panic!("expected a JSON body");
        };
        assert_eq!(value["message"], "not found");

        let (status, body) = client.put("/api/v0/devices/1", None).await.unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, ResponseBody::Text("Internal Server Error".to_string()));
    }
}
