// # Change Log Trait
//
// Defines the sink that observes finalized relation changes.
//
// ## Purpose
//
// When a `UidBuilder` is finalized with a sink, it emits one event for every
// (primary, secondary) pair present in the canonical payload, in the fixed
// group order:
//
//   Unregister > Ungroup > Logout > Login > Group > Register
//
// Duplicate or overridden requests are merged before emission, so the sink
// only sees the final state of each pair.
//
// ## Implementations
//
// - `Monitor`: maintains the expiring relation stores
// - `TracingChangeLog`: writes each event to the tracing log
// - `Vec<ChangeEvent>`: records events in order (handy for tests and audits)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of relation change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// user-to-IP mapping added
    Login,
    /// user-to-IP mapping removed
    Logout,
    /// user-to-group mapping added
    Group,
    /// user-to-group mapping removed
    Ungroup,
    /// IP-to-tag mapping added
    Register,
    /// IP-to-tag mapping removed
    Unregister,
}

impl Operation {
    /// Operation name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Logout => "logout",
            Operation::Group => "group",
            Operation::Ungroup => "ungroup",
            Operation::Register => "register",
            Operation::Unregister => "unregister",
        }
    }

    /// Whether the operation adds a relation (and may carry a TTL)
    pub fn is_upsert(&self) -> bool {
        matches!(
            self,
            Operation::Login | Operation::Group | Operation::Register
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change-log event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Kind of change
    pub op: Operation,
    /// Primary identifier (IP for register/unregister, user otherwise)
    pub subject: String,
    /// Secondary identifier (tag, IP or group)
    pub value: String,
    /// TTL in minutes, `None` meaning "no timeout"
    pub ttl: Option<u32>,
}

impl ChangeEvent {
    /// Create a new change event
    pub fn new(
        op: Operation,
        subject: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<u32>,
    ) -> Self {
        Self {
            op,
            subject: subject.into(),
            value: value.into(),
            ttl,
        }
    }
}

/// Trait for change-log sinks
///
/// Sinks are driven from a single thread of control: `log` takes `&mut self`
/// and implementations need no internal synchronization.
pub trait ChangeLog {
    /// Observe one finalized relation change
    ///
    /// # Parameters
    ///
    /// - `op`: Kind of change
    /// - `subject`: IP for register/unregister, user for everything else
    /// - `value`: Tag, IP or group depending on `op`
    /// - `ttl`: Timeout in minutes, `None` for "no timeout"
    fn log(&mut self, op: Operation, subject: &str, value: &str, ttl: Option<u32>);
}

impl ChangeLog for Vec<ChangeEvent> {
    fn log(&mut self, op: Operation, subject: &str, value: &str, ttl: Option<u32>) {
        self.push(ChangeEvent::new(op, subject, value, ttl));
    }
}

/// Change-log sink that writes every event to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingChangeLog;

impl ChangeLog for TracingChangeLog {
    fn log(&mut self, op: Operation, subject: &str, value: &str, ttl: Option<u32>) {
        match ttl {
            Some(minutes) => tracing::info!(
                op = %op,
                subject,
                value,
                ttl_minutes = minutes,
                "User-ID change"
            ),
            None => tracing::info!(op = %op, subject, value, "User-ID change"),
        }
    }
}
