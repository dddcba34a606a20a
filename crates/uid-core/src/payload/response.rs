// # Device Response
//
// Model and validation of the XML API reply:
//
// ```xml
// <response status="success">
//   <result>
//     <uid-response>
//       <version>2.0</version>
//       <payload>
//         <unregister></unregister>
//         <register>
//           <entry ip="10.10.10.10" message="tag10 already exists, ignore"/>
//         </register>
//       </payload>
//     </uid-response>
//   </result>
// </response>
// ```
//
// Failure categories are kept distinct:
// - non-200 HTTP status → `Error::Status`
// - body that is not a `<response>` document → `Error::Decode`
// - `status` attribute other than "success" → `Error::Api`

use serde::{Deserialize, Serialize};

use crate::traits::ApiReply;
use crate::{Error, Result};

/// Status value of a successful reply
pub const STATUS_SUCCESS: &str = "success";

/// Top-level XML API response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "response")]
pub struct ApiResponse {
    /// "success" or "error"
    #[serde(rename = "@status")]
    pub status: String,

    /// PAN-OS error code, present on failures
    #[serde(rename = "@code", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Result body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ApiResult>,

    /// Device messages (error text, or a `uid-response` on partial failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<ApiMsg>,
}

impl ApiResponse {
    /// Whether the device reported success
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// The User-ID specific part of the reply, if any
    ///
    /// Looks in `<result>` first, then in the `<msg><line>` elements.
    pub fn uid_response(&self) -> Option<&UidResponse> {
        self.result
            .as_ref()
            .and_then(|r| r.uid_response.as_ref())
            .or_else(|| {
                self.msg
                    .iter()
                    .flat_map(|m| m.line.iter())
                    .find_map(|l| l.uid_response.as_ref())
            })
    }

    /// Human-readable device message, if any
    ///
    /// Text of every `<msg>` line, then the per-entry messages of the
    /// `uid-response`, joined with "; ".
    pub fn message(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(msg) = &self.msg {
            parts.extend(msg.text.iter().map(|t| t.trim().to_string()));
            parts.extend(
                msg.line
                    .iter()
                    .filter_map(|l| l.text.as_deref())
                    .map(|t| t.trim().to_string()),
            );
        }
        if let Some(uid) = self.uid_response() {
            let entries = uid
                .payload
                .register
                .iter()
                .chain(uid.payload.unregister.iter())
                .flat_map(|s| s.entry.iter());
            parts.extend(entries.map(|e| format!("{}: {}", e.ip, e.message)));
        }
        parts.retain(|p| !p.is_empty());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// `<msg>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMsg {
    /// Bare text directly under `<msg>`
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Message lines
    #[serde(default)]
    pub line: Vec<ApiLine>,
}

/// `<line>` element of a `<msg>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLine {
    /// Line text
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// User-ID reply carried in the line
    #[serde(rename = "uid-response", default, skip_serializing_if = "Option::is_none")]
    pub uid_response: Option<UidResponse>,
}

/// `<result>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult {
    /// User-ID reply
    #[serde(rename = "uid-response", default, skip_serializing_if = "Option::is_none")]
    pub uid_response: Option<UidResponse>,
}

/// `<uid-response>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidResponse {
    /// Protocol version echoed by the device
    #[serde(default)]
    pub version: String,

    /// Per-entry messages
    #[serde(default)]
    pub payload: UidResponsePayload,
}

/// Per-section messages of a `<uid-response>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidResponsePayload {
    /// Messages for unregister entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unregister: Option<UidResponseSection>,

    /// Messages for register entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<UidResponseSection>,
}

/// A list of per-entry messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidResponseSection {
    /// Entries
    #[serde(default)]
    pub entry: Vec<UidResponseEntry>,
}

/// Device message about a single IP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UidResponseEntry {
    /// IP the message refers to
    #[serde(rename = "@ip", default)]
    pub ip: String,

    /// Device message
    #[serde(rename = "@message", default)]
    pub message: String,
}

/// Decode a `<response>` document
pub fn decode_response(xml: &str) -> Result<ApiResponse> {
    quick_xml::de::from_str(xml)
        .map_err(|e| Error::decode(format!("Failed to parse XML response body: {}", e)))
}

/// Validate a raw device reply
///
/// # Returns
///
/// - `Ok(ApiResponse)`: HTTP 200 with `status="success"`
/// - `Err(Error::Status)`: Any other HTTP status
/// - `Err(Error::Decode)`: Body is not a valid response document
/// - `Err(Error::Api)`: Device replied with a non-success status
pub fn validate(reply: &ApiReply) -> Result<ApiResponse> {
    if reply.status != 200 {
        return Err(Error::status(reply.status));
    }

    let response = decode_response(&reply.body)?;

    if !response.is_success() {
        let message = response.message();
        return Err(Error::api(response.status, response.code, message));
    }

    if let Some(uid) = response.uid_response() {
        let messages = uid
            .payload
            .register
            .iter()
            .chain(uid.payload.unregister.iter())
            .flat_map(|s| s.entry.iter());
        for entry in messages {
            tracing::debug!(ip = %entry.ip, message = %entry.message, "Device entry message");
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_BODY: &str = r#"<response status="success">
        <result>
            <uid-response>
                <version>2.0</version>
                <payload>
                    <unregister></unregister>
                    <register>
                        <entry ip="10.10.10.10" message="tag10 already exists, ignore"/>
                    </register>
                </payload>
            </uid-response>
        </result>
    </response>"#;

    #[test]
    fn test_validate_success() {
        let response = validate(&ApiReply::new(200, SUCCESS_BODY)).unwrap();
        assert!(response.is_success());

        let uid = response.uid_response().unwrap();
        assert_eq!(uid.version, "2.0");
        let register = uid.payload.register.as_ref().unwrap();
        assert_eq!(register.entry.len(), 1);
        assert_eq!(register.entry[0].ip, "10.10.10.10");
        assert_eq!(register.entry[0].message, "tag10 already exists, ignore");
        assert!(uid.payload.unregister.as_ref().unwrap().entry.is_empty());
    }

    #[test]
    fn test_validate_bare_success() {
        let response = validate(&ApiReply::new(200, r#"<response status="success"/>"#)).unwrap();
        assert!(response.uid_response().is_none());
    }

    #[test]
    fn test_validate_http_status() {
        let err = validate(&ApiReply::new(403, "Forbidden")).unwrap_err();
        assert!(matches!(err, Error::Status { code: 403 }));
    }

    #[test]
    fn test_validate_api_error() {
        let body = r#"<response status="error" code="403"><result><msg>Invalid credentials.</msg></result></response>"#;
        let err = validate(&ApiReply::new(200, body)).unwrap_err();
        match err {
            Error::Api { status, code, .. } => {
                assert_eq!(status, "error");
                assert_eq!(code.as_deref(), Some("403"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_msg_line_text() {
        let body = r#"<response status="error" code="403"><msg><line>Invalid credentials.</line></msg></response>"#;
        let err = validate(&ApiReply::new(200, body)).unwrap_err();
        match err {
            Error::Api { message, .. } => {
                assert_eq!(message.as_deref(), Some("Invalid credentials."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_msg_line_uid_response() {
        let body = r#"<response status="error">
            <msg>
                <line>
                    <uid-response>
                        <version>2.0</version>
                        <payload>
                            <register>
                                <entry ip="1.1.1.1" message="bad tag"/>
                            </register>
                        </payload>
                    </uid-response>
                </line>
            </msg>
        </response>"#;

        let response = decode_response(body).unwrap();
        let uid = response.uid_response().unwrap();
        assert_eq!(uid.payload.register.as_ref().unwrap().entry[0].message, "bad tag");

        let err = validate(&ApiReply::new(200, body)).unwrap_err();
        match err {
            Error::Api { status, code, message } => {
                assert_eq!(status, "error");
                assert_eq!(code, None);
                assert_eq!(message.as_deref(), Some("1.1.1.1: bad tag"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bare_msg_text() {
        let body = r#"<response status="error"><msg>Missing cmd</msg></response>"#;
        let response = decode_response(body).unwrap();
        assert_eq!(response.message().as_deref(), Some("Missing cmd"));
        assert!(response.uid_response().is_none());
    }

    #[test]
    fn test_validate_unparsable_body() {
        let err = validate(&ApiReply::new(200, "this is not xml")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
