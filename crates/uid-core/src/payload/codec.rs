//! XML codec for User-ID messages
//!
//! Thin layer over `quick-xml`'s serde support. Every failure is reported as
//! [`Error::Codec`](crate::Error::Codec).
//!
//! Decoding trims leading and trailing whitespace from element text, so a
//! tag or group name like `" web "` comes back as `"web"`. Interior
//! whitespace is kept. Attribute values (IPs, user names, timeouts) are
//! never trimmed.

use crate::payload::{UidMessage, UidPayload};
use crate::{Error, Result};

/// Encode a full `<uid-message>`
pub fn encode_message(message: &UidMessage) -> Result<String> {
    quick_xml::se::to_string(message)
        .map_err(|e| Error::codec(format!("Failed to encode uid-message: {}", e)))
}

/// Encode a bare `<payload>`
pub fn encode_payload(payload: &UidPayload) -> Result<String> {
    quick_xml::se::to_string(payload)
        .map_err(|e| Error::codec(format!("Failed to encode payload: {}", e)))
}

/// Decode a full `<uid-message>`
pub fn decode_message(xml: &str) -> Result<UidMessage> {
    quick_xml::de::from_str(xml)
        .map_err(|e| Error::codec(format!("Failed to decode uid-message: {}", e)))
}

/// Decode a bare `<payload>`
pub fn decode_payload(xml: &str) -> Result<UidPayload> {
    quick_xml::de::from_str(xml)
        .map_err(|e| Error::codec(format!("Failed to decode payload: {}", e)))
}
