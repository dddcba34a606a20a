// # User-ID Transaction Builder
//
// Accumulates relation-change requests and finalizes them into one canonical
// User-ID payload.
//
// ## Chaining
//
// Every request method consumes the builder and returns the combined one, so
// a chain reads top to bottom with no intermediate error checks:
//
// ```rust
// use uid_core::UidBuilder;
//
// let payload = UidBuilder::new()
//     .login_user("foo@test.local", "1.1.1.1", Some(60))
//     .group_user("foo@test.local", "admin", None)
//     .register_ip("1.1.1.1", "windows", Some(60))
//     .payload(None)
//     .unwrap();
//
// assert_eq!(payload.relation_count(), 3);
// ```
//
// Branching a chain is an explicit `clone()`; nothing a branch does can be
// observed through another branch.
//
// ## Sticky Errors
//
// A builder created from a failed upstream step (e.g. an unparsable message)
// carries that error. Every request method on it is a no-op, and finalizing
// returns the error without emitting any change event.
//
// ## Finalize
//
// - `payload()`: canonical payload
// - `message()`: payload wrapped in the update envelope
// - `push()`: message encoded and sent through a `Transport`
//
// All three accept an optional `ChangeLog` sink that receives one event per
// pair in the canonical payload.

mod entry;
mod merge;

use crate::config::DeviceConfig;
use crate::error::{BuildError, Error, Result};
use crate::payload::{self, ApiResponse, UidMessage, UidPayload};
use crate::traits::{ApiRequest, ChangeLog, Transport};

pub use entry::{IpTag, PendingEntry, UserGroup, UserMap};

use merge::Merged;

/// Fluent builder for User-ID payloads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidBuilder {
    entries: Vec<PendingEntry>,
    error: Option<BuildError>,
}

impl UidBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder carrying a sticky error
    pub fn from_error(error: BuildError) -> Self {
        Self {
            entries: Vec::new(),
            error: Some(error),
        }
    }

    /// Rebuild the pending entries of an existing payload
    ///
    /// Sections are walked in the order Logout, Login, Ungroup, Group,
    /// Unregister, Register, producing one entry per (primary, secondary)
    /// pair with its original timeout. Finalizing the result without further
    /// additions yields an equal payload.
    ///
    /// Entries whose timeout is not a valid minute count are skipped; the
    /// rest of the payload is still imported.
    pub fn from_payload(payload: &UidPayload) -> Self {
        let mut entries = Vec::with_capacity(payload.relation_count());

        if let Some(logout) = &payload.logout {
            for e in &logout.entry {
                entries.push(PendingEntry::Logout {
                    user: e.name.clone(),
                    ip: e.ip.clone(),
                });
            }
        }
        if let Some(login) = &payload.login {
            for e in &login.entry {
                if let Some(ttl) = import_ttl("login", &e.name, &e.ip, e.timeout.as_deref()) {
                    entries.push(PendingEntry::Login {
                        user: e.name.clone(),
                        ip: e.ip.clone(),
                        ttl,
                    });
                }
            }
        }
        if let Some(ungroup) = &payload.unregister_user {
            for e in &ungroup.entry {
                for m in &e.tag.member {
                    entries.push(PendingEntry::Ungroup {
                        user: e.user.clone(),
                        group: m.name.clone(),
                    });
                }
            }
        }
        if let Some(group) = &payload.register_user {
            for e in &group.entry {
                for m in &e.tag.member {
                    if let Some(ttl) = import_ttl("group", &e.user, &m.name, m.timeout.as_deref())
                    {
                        entries.push(PendingEntry::Group {
                            user: e.user.clone(),
                            group: m.name.clone(),
                            ttl,
                        });
                    }
                }
            }
        }
        if let Some(unregister) = &payload.unregister {
            for e in &unregister.entry {
                for m in &e.tag.member {
                    entries.push(PendingEntry::Unregister {
                        ip: e.ip.clone(),
                        tag: m.name.clone(),
                    });
                }
            }
        }
        if let Some(register) = &payload.register {
            for e in &register.entry {
                for m in &e.tag.member {
                    if let Some(ttl) =
                        import_ttl("register", &e.ip, &m.name, m.timeout.as_deref())
                    {
                        entries.push(PendingEntry::Register {
                            ip: e.ip.clone(),
                            tag: m.name.clone(),
                            ttl,
                        });
                    }
                }
            }
        }

        Self {
            entries,
            error: None,
        }
    }

    /// Rebuild the pending entries of an XML `<uid-message>`
    ///
    /// A message that cannot be decoded yields a builder carrying the
    /// decoding failure as its sticky error.
    pub fn from_message_xml(xml: &str) -> Self {
        match payload::decode_message(xml) {
            Ok(message) => Self::from_payload(&message.payload),
            Err(e) => Self::from_error(BuildError::new(e.to_string())),
        }
    }

    /// The sticky error, if any
    pub fn error(&self) -> Option<&BuildError> {
        self.error.as_ref()
    }

    /// Pending entries in the order they were added
    pub fn entries(&self) -> &[PendingEntry] {
        &self.entries
    }

    /// Number of pending entries (before merging)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no pending entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append arbitrary pending entries
    pub fn extend<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = PendingEntry>,
    {
        if self.error.is_none() {
            self.entries.extend(entries);
        }
        self
    }

    /// Append the entries of another builder
    ///
    /// If `other` carries a sticky error, the result carries it too.
    pub fn add(self, other: UidBuilder) -> Self {
        if self.error.is_some() {
            return self;
        }
        match other.error {
            Some(error) => Self::from_error(error),
            None => self.extend(other.entries),
        }
    }

    /// Add a list of IP-to-tag registrations
    pub fn register<I>(self, dag: I) -> Self
    where
        I: IntoIterator<Item = IpTag>,
    {
        self.extend(dag.into_iter().map(PendingEntry::from))
    }

    /// Add a single IP-to-tag registration
    pub fn register_ip(self, ip: impl Into<String>, tag: impl Into<String>, ttl: Option<u32>) -> Self {
        self.extend([PendingEntry::Register {
            ip: ip.into(),
            tag: tag.into(),
            ttl,
        }])
    }

    /// Add a list of IP-to-tag removals (timeouts are ignored)
    pub fn unregister<I>(self, dag: I) -> Self
    where
        I: IntoIterator<Item = IpTag>,
    {
        self.extend(dag.into_iter().map(IpTag::into_unregister))
    }

    /// Add a single IP-to-tag removal
    pub fn unregister_ip(self, ip: impl Into<String>, tag: impl Into<String>) -> Self {
        self.extend([PendingEntry::Unregister {
            ip: ip.into(),
            tag: tag.into(),
        }])
    }

    /// Add a list of user-to-IP logins
    pub fn login<I>(self, uid: I) -> Self
    where
        I: IntoIterator<Item = UserMap>,
    {
        self.extend(uid.into_iter().map(PendingEntry::from))
    }

    /// Add a single user-to-IP login
    pub fn login_user(self, user: impl Into<String>, ip: impl Into<String>, ttl: Option<u32>) -> Self {
        self.extend([PendingEntry::Login {
            user: user.into(),
            ip: ip.into(),
            ttl,
        }])
    }

    /// Add a list of user-to-IP logouts (timeouts are ignored)
    pub fn logout<I>(self, uid: I) -> Self
    where
        I: IntoIterator<Item = UserMap>,
    {
        self.extend(uid.into_iter().map(UserMap::into_logout))
    }

    /// Add a single user-to-IP logout
    pub fn logout_user(self, user: impl Into<String>, ip: impl Into<String>) -> Self {
        self.extend([PendingEntry::Logout {
            user: user.into(),
            ip: ip.into(),
        }])
    }

    /// Add a list of user-to-group memberships
    pub fn group<I>(self, dug: I) -> Self
    where
        I: IntoIterator<Item = UserGroup>,
    {
        self.extend(dug.into_iter().map(PendingEntry::from))
    }

    /// Add a single user-to-group membership
    pub fn group_user(self, user: impl Into<String>, group: impl Into<String>, ttl: Option<u32>) -> Self {
        self.extend([PendingEntry::Group {
            user: user.into(),
            group: group.into(),
            ttl,
        }])
    }

    /// Add a list of user-to-group removals (timeouts are ignored)
    pub fn ungroup<I>(self, dug: I) -> Self
    where
        I: IntoIterator<Item = UserGroup>,
    {
        self.extend(dug.into_iter().map(UserGroup::into_ungroup))
    }

    /// Add a single user-to-group removal
    pub fn ungroup_user(self, user: impl Into<String>, group: impl Into<String>) -> Self {
        self.extend([PendingEntry::Ungroup {
            user: user.into(),
            group: group.into(),
        }])
    }

    /// Merge all pending entries into the canonical payload
    ///
    /// When `sink` is given it receives one event per pair in the payload,
    /// in the order Unregister > Ungroup > Logout > Login > Group > Register.
    ///
    /// # Returns
    ///
    /// - `Ok(UidPayload)`: The canonical payload
    /// - `Err(Error::Build)`: The builder carries a sticky error (no events emitted)
    pub fn payload(&self, sink: Option<&mut dyn ChangeLog>) -> Result<UidPayload> {
        if let Some(error) = &self.error {
            return Err(Error::Build(error.clone()));
        }

        let merged = Merged::from_entries(&self.entries);
        if let Some(sink) = sink {
            let emitted = merged.emit(sink);
            tracing::debug!(
                pending = self.entries.len(),
                emitted,
                "Emitted User-ID change events"
            );
        }
        Ok(merged.into_payload())
    }

    /// Merge all pending entries into an update message
    ///
    /// Same contract as [`UidBuilder::payload`].
    pub fn message(&self, sink: Option<&mut dyn ChangeLog>) -> Result<UidMessage> {
        self.payload(sink).map(UidMessage::update)
    }

    /// Finalize, encode and send the message to the device
    ///
    /// Finalization (and change-log emission) happens before this returns;
    /// the returned future only performs the request and validates the reply.
    /// An invalid `device` configuration fails before anything is emitted.
    ///
    /// # Returns
    ///
    /// - `Ok(ApiResponse)`: The device accepted the message
    /// - `Err(Error::Build | Error::Config | Error::Codec)`: Nothing was sent
    /// - `Err(Error::Http | Error::Status | Error::Decode | Error::Api)`: See `payload::validate`
    pub fn push<'t, T>(
        &self,
        transport: &'t T,
        device: &DeviceConfig,
        sink: Option<&mut dyn ChangeLog>,
    ) -> impl Future<Output = Result<ApiResponse>> + Send + use<'t, T>
    where
        T: Transport + ?Sized,
    {
        let prepared = self.prepare_request(device, sink);
        async move {
            let request = prepared?;
            tracing::info!(
                url = %request.url,
                transport = transport.transport_name(),
                "Pushing User-ID message"
            );
            let reply = transport.send(request).await?;
            payload::validate(&reply)
        }
    }

    fn prepare_request(
        &self,
        device: &DeviceConfig,
        sink: Option<&mut dyn ChangeLog>,
    ) -> Result<ApiRequest> {
        if let Some(error) = &self.error {
            return Err(Error::Build(error.clone()));
        }
        device.validate()?;
        let message = self.message(sink)?;
        let cmd = message.to_xml()?;
        Ok(ApiRequest::user_id(device.endpoint(), &device.api_key, cmd))
    }
}

/// Parse an optional minute count, logging and rejecting malformed text
///
/// Outer `None` means "skip this entry"; inner `None` means "no timeout".
fn import_ttl(section: &str, primary: &str, secondary: &str, raw: Option<&str>) -> Option<Option<u32>> {
    match raw.map(parse_minutes).transpose() {
        Ok(ttl) => Some(ttl),
        Err(reason) => {
            tracing::warn!(
                section,
                primary,
                secondary,
                timeout = raw.unwrap_or_default(),
                reason = %reason,
                "Skipping entry with malformed timeout"
            );
            None
        }
    }
}

/// Decimal digits only; signs and whitespace are rejected
fn parse_minutes(raw: &str) -> std::result::Result<u32, String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err("not an unsigned decimal number".to_string());
    }
    raw.parse::<u32>().map_err(|e| e.to_string())
}
