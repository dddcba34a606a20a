//! Pending relation-change requests
//!
//! [`IpTag`], [`UserMap`] and [`UserGroup`] are convenience records for the
//! list-taking builder methods; every request ends up as a [`PendingEntry`].

/// An IP-to-tag mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpTag {
    /// IP address
    pub ip: String,
    /// Tag name
    pub tag: String,
    /// Timeout in minutes (ignored by unregister)
    pub ttl: Option<u32>,
}

impl IpTag {
    /// Create a mapping without timeout
    pub fn new(ip: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            tag: tag.into(),
            ttl: None,
        }
    }

    /// Set the timeout
    pub fn with_ttl(mut self, minutes: u32) -> Self {
        self.ttl = Some(minutes);
        self
    }
}

/// A user-to-IP mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMap {
    /// User name
    pub user: String,
    /// IP address
    pub ip: String,
    /// Timeout in minutes (ignored by logout)
    pub ttl: Option<u32>,
}

impl UserMap {
    /// Create a mapping without timeout
    pub fn new(user: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ip: ip.into(),
            ttl: None,
        }
    }

    /// Set the timeout
    pub fn with_ttl(mut self, minutes: u32) -> Self {
        self.ttl = Some(minutes);
        self
    }
}

/// A user-to-group mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroup {
    /// User name
    pub user: String,
    /// Group name
    pub group: String,
    /// Timeout in minutes (ignored by ungroup)
    pub ttl: Option<u32>,
}

impl UserGroup {
    /// Create a mapping without timeout
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
            ttl: None,
        }
    }

    /// Set the timeout
    pub fn with_ttl(mut self, minutes: u32) -> Self {
        self.ttl = Some(minutes);
        self
    }
}

/// One requested relation change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEntry {
    /// Attach a tag to an IP
    Register {
        ip: String,
        tag: String,
        ttl: Option<u32>,
    },
    /// Detach a tag from an IP
    Unregister { ip: String, tag: String },
    /// Map a user to an IP
    Login {
        user: String,
        ip: String,
        ttl: Option<u32>,
    },
    /// Unmap a user from an IP
    Logout { user: String, ip: String },
    /// Add a user to a group
    Group {
        user: String,
        group: String,
        ttl: Option<u32>,
    },
    /// Remove a user from a group
    Ungroup { user: String, group: String },
}

impl From<IpTag> for PendingEntry {
    fn from(m: IpTag) -> Self {
        PendingEntry::Register {
            ip: m.ip,
            tag: m.tag,
            ttl: m.ttl,
        }
    }
}

impl From<UserMap> for PendingEntry {
    fn from(m: UserMap) -> Self {
        PendingEntry::Login {
            user: m.user,
            ip: m.ip,
            ttl: m.ttl,
        }
    }
}

impl From<UserGroup> for PendingEntry {
    fn from(m: UserGroup) -> Self {
        PendingEntry::Group {
            user: m.user,
            group: m.group,
            ttl: m.ttl,
        }
    }
}

impl IpTag {
    pub(crate) fn into_unregister(self) -> PendingEntry {
        PendingEntry::Unregister {
            ip: self.ip,
            tag: self.tag,
        }
    }
}

impl UserMap {
    pub(crate) fn into_logout(self) -> PendingEntry {
        PendingEntry::Logout {
            user: self.user,
            ip: self.ip,
        }
    }
}

impl UserGroup {
    pub(crate) fn into_ungroup(self) -> PendingEntry {
        PendingEntry::Ungroup {
            user: self.user,
            group: self.group,
        }
    }
}
