// # Transport Trait
//
// Defines the interface for delivering an encoded User-ID message to the device.
//
// ## Implementations
//
// - HTTPS: `uid-transport-http` crate
// - Tests: scripted transports that return canned replies
//
// ## Usage
//
// ```rust,ignore
// use uid_core::{DeviceConfig, UidBuilder};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let transport = /* Transport implementation */;
//     let device = DeviceConfig::new("10.1.1.1:443", "<api-key>");
//
//     let response = UidBuilder::new()
//         .register_ip("1.1.1.1", "windows", Some(60))
//         .push(&transport, &device, None)
//         .await?;
//
//     println!("{}", response.status);
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A form-encoded POST to the device XML API
#[derive(Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Target URL (e.g. `https://10.1.1.1/api/`)
    pub url: String,
    /// Form fields, in order
    pub form: Vec<(String, String)>,
}

impl ApiRequest {
    /// Build a User-ID API request carrying `cmd`
    pub fn user_id(url: impl Into<String>, api_key: &str, cmd: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            form: vec![
                ("key".to_string(), api_key.to_string()),
                ("type".to_string(), "user-id".to_string()),
                ("cmd".to_string(), cmd.into()),
            ],
        }
    }

    /// Look up a form field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let form: Vec<(&str, &str)> = self
            .form
            .iter()
            .map(|(k, v)| {
                if k == "key" {
                    (k.as_str(), "<REDACTED>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("ApiRequest")
            .field("url", &self.url)
            .field("form", &form)
            .finish()
    }
}

/// Raw reply from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl ApiReply {
    /// Create a new reply
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for transport implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - One request per call, no retries: callers own retry policy
/// - Connection-level failures map to `Error::Http`
/// - Any HTTP reply (including non-200) is returned as `Ok(ApiReply)`;
///   status interpretation happens in `payload::validate`
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw reply
    async fn send(&self, request: ApiRequest) -> Result<ApiReply, crate::Error>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
