// # HTTPS Transport
//
// `Transport` implementation that posts User-ID messages to the device XML API.
//
// ## Behaviour
//
// - One POST per `send`, body form-encoded (`key`, `type`, `cmd`)
// - Request timeout from `DeviceConfig::timeout_secs`
// - Self-signed device certificates accepted only when configured
// - No retries; the caller decides what to do with a failure
//
// ## Error Mapping
//
// - Connection, TLS or timeout failure: `Error::Http`
// - Any HTTP reply, whatever its status: `Ok(ApiReply)` (classified later by
//   `uid_core::payload::validate`)
//
// ## Security
//
// - The API key travels in the form body, never in the URL
// - The API key never appears in logs or `Debug` output

use std::time::Duration;

use async_trait::async_trait;
use uid_core::{ApiReply, ApiRequest, DeviceConfig, Error, Result, Transport};

/// Reply returned by a dry-run transport
const DRY_RUN_BODY: &str = r#"<response status="success"/>"#;

/// HTTPS transport for the device XML API
///
/// # Dry-Run Mode
///
/// When the device config has `dry_run` set, the transport logs the request
/// it would have sent and returns a bare success reply without touching
/// the network.
pub struct HttpTransport {
    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, log requests instead of sending them
    dry_run: bool,
}

// Custom Debug implementation; the client carries no secrets but is noisy
impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport for the given device
    ///
    /// # Returns
    ///
    /// - `Ok(HttpTransport)`: Ready to send
    /// - `Err(Error::Config)`: Device configuration is invalid
    /// - `Err(Error::Http)`: HTTP client could not be built (e.g. TLS backend failure)
    pub fn new(device: &DeviceConfig) -> Result<Self> {
        device.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(device.timeout_secs))
            .danger_accept_invalid_certs(device.accept_invalid_certs)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        if device.accept_invalid_certs {
            tracing::warn!(host = %device.host, "Accepting invalid TLS certificates");
        }

        Ok(Self {
            client,
            dry_run: device.dry_run,
        })
    }

    /// Whether requests are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiReply> {
        if self.dry_run {
            tracing::info!(
                url = %request.url,
                cmd = request.field("cmd").unwrap_or_default(),
                "DRY-RUN: would POST User-ID message"
            );
            return Ok(ApiReply::new(200, DRY_RUN_BODY));
        }

        tracing::debug!(url = %request.url, "POST User-ID message");

        let response = self
            .client
            .post(&request.url)
            .form(&request.form)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body: {}", e)))?;

        tracing::debug!(status, bytes = body.len(), "Device replied");
        Ok(ApiReply::new(status, body))
    }

    fn transport_name(&self) -> &'static str {
        "https"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceConfig {
        DeviceConfig::new("10.1.1.1", "secret_key_12345")
    }

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(&device()).unwrap();
        assert!(!transport.is_dry_run());
        assert_eq!(transport.transport_name(), "https");
    }

    #[test]
    fn test_invalid_device_rejected() {
        let result = HttpTransport::new(&DeviceConfig::new("10.1.1.1", ""));
        assert!(matches!(result, Err(Error::Config(_))));

        let result = HttpTransport::new(&device().with_timeout_secs(0));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_self_signed_allowed_when_configured() {
        let transport = HttpTransport::new(&device().with_accept_invalid_certs(true));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let transport = HttpTransport::new(&device()).unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(!debug_str.contains("secret_key"));
        assert!(debug_str.contains("HttpTransport"));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_touch_network() {
        // Unroutable documentation address: a real send would time out
        let device = DeviceConfig::new("192.0.2.1", "secret_key_12345")
            .with_timeout_secs(1)
            .with_dry_run(true);
        let transport = HttpTransport::new(&device).unwrap();
        assert!(transport.is_dry_run());

        let request = ApiRequest::user_id(device.endpoint(), &device.api_key, "<uid-message/>");
        let reply = transport.send(request).await.unwrap();
        assert_eq!(reply.status, 200);
        assert!(uid_core::payload::validate(&reply).unwrap().is_success());
    }

    #[tokio::test]
    async fn test_push_in_dry_run() {
        let device = DeviceConfig::new("192.0.2.1", "secret_key_12345").with_dry_run(true);
        let transport = HttpTransport::new(&device).unwrap();

        let response = uid_core::UidBuilder::new()
            .register_ip("1.1.1.1", "windows", Some(60))
            .push(&transport, &device, None)
            .await
            .unwrap();
        assert!(response.is_success());
    }
}
