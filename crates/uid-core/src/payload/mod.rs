// # User-ID Payload Model
//
// Typed model of the XML User-ID message exchanged with the device.
//
// ## Message Shape
//
// ```xml
// <uid-message>
//   <type>update</type>
//   <payload>
//     <login>
//       <entry name="foo@test.local" ip="1.1.1.1" timeout="60"/>
//     </login>
//     <register-user>
//       <entry user="foo@test.local">
//         <tag><member timeout="60">admin</member></tag>
//       </entry>
//     </register-user>
//     <register>
//       <entry ip="1.1.1.1">
//         <tag><member timeout="10">windows</member></tag>
//       </entry>
//     </register>
//   </payload>
//   <version>2.0</version>
// </uid-message>
// ```
//
// Timeouts are carried as strings (minute counts) because that is how they
// appear on the wire; conversion from/to `u32` happens in the builder.

pub mod codec;
pub mod response;

use serde::{Deserialize, Serialize};

pub use codec::{decode_message, decode_payload, encode_message, encode_payload};
pub use response::{
    ApiLine, ApiMsg, ApiResponse, ApiResult, UidResponse, UidResponseEntry, UidResponsePayload,
    UidResponseSection, decode_response, validate,
};

/// Message type sent for every User-ID update
pub const MESSAGE_TYPE: &str = "update";

/// User-ID API protocol version
pub const PROTOCOL_VERSION: &str = "2.0";

/// Envelope around a [`UidPayload`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "uid-message")]
pub struct UidMessage {
    /// Message type (always "update" for messages built here)
    #[serde(rename = "type")]
    pub kind: String,

    /// The relation changes
    #[serde(default)]
    pub payload: UidPayload,

    /// Protocol version
    pub version: String,
}

impl UidMessage {
    /// Wrap a payload in an update envelope
    pub fn update(payload: UidPayload) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            payload,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Encode as XML
    pub fn to_xml(&self) -> crate::Result<String> {
        encode_message(self)
    }
}

/// Canonical set of relation changes, one optional section per operation group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "payload")]
pub struct UidPayload {
    /// IP-to-tag registrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<DagSection>,

    /// IP-to-tag removals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unregister: Option<DagSection>,

    /// User-to-group registrations
    #[serde(
        rename = "register-user",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub register_user: Option<DugSection>,

    /// User-to-group removals
    #[serde(
        rename = "unregister-user",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unregister_user: Option<DugSection>,

    /// User-to-IP logins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LogSection>,

    /// User-to-IP logouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logout: Option<LogSection>,
}

impl UidPayload {
    /// Whether no section is present
    pub fn is_empty(&self) -> bool {
        self.register.is_none()
            && self.unregister.is_none()
            && self.register_user.is_none()
            && self.unregister_user.is_none()
            && self.login.is_none()
            && self.logout.is_none()
    }

    /// Total number of (primary, secondary) pairs across all sections
    pub fn relation_count(&self) -> usize {
        let dag = |s: &Option<DagSection>| {
            s.as_ref()
                .map_or(0, |s| s.entry.iter().map(|e| e.tag.member.len()).sum())
        };
        let dug = |s: &Option<DugSection>| {
            s.as_ref()
                .map_or(0, |s| s.entry.iter().map(|e| e.tag.member.len()).sum())
        };
        let log = |s: &Option<LogSection>| s.as_ref().map_or(0, |s| s.entry.len());

        dag(&self.register)
            + dag(&self.unregister)
            + dug(&self.register_user)
            + dug(&self.unregister_user)
            + log(&self.login)
            + log(&self.logout)
    }

    /// Encode as XML
    pub fn to_xml(&self) -> crate::Result<String> {
        encode_payload(self)
    }
}

/// Dynamic Address Group section (register / unregister)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagSection {
    /// One entry per IP
    #[serde(default)]
    pub entry: Vec<DagEntry>,
}

/// Tags for a single IP
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEntry {
    /// IP address
    #[serde(rename = "@ip")]
    pub ip: String,

    /// Device-side persistence flag, passed through untouched
    #[serde(rename = "@persistent", default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<String>,

    /// Tags attached to the IP
    #[serde(default)]
    pub tag: TagList,
}

/// Dynamic User Group section (register-user / unregister-user)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DugSection {
    /// One entry per user
    #[serde(default)]
    pub entry: Vec<DugEntry>,
}

/// Groups for a single user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DugEntry {
    /// User name
    #[serde(rename = "@user")]
    pub user: String,

    /// Groups the user is added to / removed from
    #[serde(default)]
    pub tag: TagList,
}

/// Member list shared by DAG and DUG entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    /// Tag or group members
    #[serde(default)]
    pub member: Vec<TagMember>,
}

/// A tag (or group) with optional timeout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMember {
    /// Timeout in minutes, as text
    #[serde(rename = "@timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Tag or group name
    #[serde(rename = "$text", default)]
    pub name: String,
}

/// Login / logout section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSection {
    /// One entry per (user, IP)
    #[serde(default)]
    pub entry: Vec<LogEntry>,
}

/// A single user-to-IP mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// User name
    #[serde(rename = "@name")]
    pub name: String,

    /// IP address
    #[serde(rename = "@ip")]
    pub ip: String,

    /// Timeout in minutes, as text
    #[serde(rename = "@timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}
