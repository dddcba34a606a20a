//! Test doubles and common utilities for contract tests
//!
//! This module provides a scripted transport that records what it was asked
//! to send and replies with a canned answer.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use uid_core::error::Result;
use uid_core::{ApiReply, ApiRequest, DeviceConfig, Error, Transport};

/// Body of a bare successful reply
pub const SUCCESS_BODY: &str = r#"<response status="success"/>"#;

/// Body of a successful reply carrying per-entry messages
pub const SUCCESS_WITH_MESSAGES_BODY: &str = r#"<response status="success">
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

/// Body of an API-level rejection
pub const ERROR_BODY: &str = r#"<response status="error" code="403"><msg><line>Invalid credentials.</line></msg></response>"#;

/// What the scripted transport answers with
#[derive(Debug, Clone)]
pub enum Script {
    /// Return this reply
    Reply(u16, String),
    /// Fail at connection level
    ConnectionError(String),
}

/// A transport that replays a fixed answer and records every request
pub struct ScriptedTransport {
    script: Script,
    send_call_count: Arc<AtomicUsize>,
    requests: Arc<std::sync::Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    /// Reply with HTTP 200 and `body`
    pub fn ok(body: &str) -> Self {
        Self::new(Script::Reply(200, body.to_string()))
    }

    /// Reply with the given status and body
    pub fn reply(status: u16, body: &str) -> Self {
        Self::new(Script::Reply(status, body.to_string()))
    }

    /// Fail every request with a connection error
    pub fn unreachable(msg: &str) -> Self {
        Self::new(Script::ConnectionError(msg.to_string()))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            send_call_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Get the number of times send() was called
    pub fn send_call_count(&self) -> usize {
        self.send_call_count.load(Ordering::SeqCst)
    }

    /// Get a copy of every request seen so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The last request seen
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiReply> {
        self.send_call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        match &self.script {
            Script::Reply(status, body) => Ok(ApiReply::new(*status, body.clone())),
            Script::ConnectionError(msg) => Err(Error::http(msg.clone())),
        }
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// A device configuration that passes validation
pub fn test_device() -> DeviceConfig {
    DeviceConfig::new("10.1.1.1", "secret-key")
}

/// Fixed reference time
pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Operations of recorded change events, in order
pub fn ops(events: &[uid_core::ChangeEvent]) -> Vec<uid_core::Operation> {
    events.iter().map(|e| e.op).collect()
}
