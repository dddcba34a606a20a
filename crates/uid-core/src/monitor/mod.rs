// # Relation Monitor
//
// In-memory simulation of how the device keeps User-ID relations.
//
// ## Purpose
//
// Fed with the change log of finalized builders, the monitor tracks three
// expiring relations:
//
// - user → IP (login / logout)
// - user → group (group / ungroup)
// - IP → tag (register / unregister)
//
// and answers "which IPs belong to this user / group / tag" queries.
//
// ## Accuracy
//
// Expiry is driven by the local clock, not by the device. Relations without a
// TTL get the configured maximum lifetime, so long-lived mappings eventually
// drift from the device state. Expired relations are only dropped when
// `garbage_collect` runs.
//
// ## Concurrency
//
// No internal locking. Share it behind a single `Mutex` if several tasks
// record or query concurrently.

pub mod ttl_map;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::MonitorConfig;
use crate::traits::{ChangeLog, Operation};

pub use ttl_map::{RelationItem, TtlMap};

/// Key → subject → expiry dump of one relation store
pub type IndexView = BTreeMap<String, BTreeMap<String, DateTime<Utc>>>;

/// Diagnostic dump of all three relation stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSnapshot {
    /// user → IP → expiry
    pub user_ip: IndexView,
    /// group → user → expiry
    pub group_user: IndexView,
    /// tag → IP → expiry
    pub tag_ip: IndexView,
}

/// Expiring user/group/tag relation monitor
///
/// # Example
///
/// ```rust
/// use uid_core::{Monitor, MonitorConfig, UidBuilder};
///
/// let mut monitor = Monitor::new(MonitorConfig::default()).unwrap();
///
/// UidBuilder::new()
///     .login_user("foo@test.local", "1.1.1.1", None)
///     .group_user("foo@test.local", "admin", None)
///     .payload(Some(&mut monitor))
///     .unwrap();
///
/// assert!(monitor.ips_for_group("admin").contains("1.1.1.1"));
/// ```
#[derive(Debug, Clone)]
pub struct Monitor {
    max_lifetime: Duration,
    user_ip: TtlMap,
    user_group: TtlMap,
    ip_tag: TtlMap,
}

impl Monitor {
    /// Create a monitor from configuration
    pub fn new(config: MonitorConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(&config))
    }

    fn from_validated(config: &MonitorConfig) -> Self {
        Self {
            max_lifetime: config.max_lifetime(),
            user_ip: TtlMap::with_capacity(config.capacity_hint),
            user_group: TtlMap::with_capacity(config.capacity_hint),
            ip_tag: TtlMap::with_capacity(config.capacity_hint),
        }
    }

    /// Record a relation change, with expiry computed from the current time
    pub fn record(&mut self, op: Operation, subject: &str, value: &str, ttl: Option<u32>) {
        self.record_at(op, subject, value, ttl, Utc::now());
    }

    /// Record a relation change as if it happened at `now`
    ///
    /// # Parameters
    ///
    /// - `subject`: IP for register/unregister, user otherwise
    /// - `value`: tag, IP or group depending on `op`
    /// - `ttl`: minutes until expiry; `None` uses the configured maximum lifetime
    pub fn record_at(
        &mut self,
        op: Operation,
        subject: &str,
        value: &str,
        ttl: Option<u32>,
        now: DateTime<Utc>,
    ) {
        let expiry = self.expiry_for(ttl, now);
        match op {
            // user → IP is keyed by user so that lookups by user are direct
            Operation::Login => {
                self.user_ip.upsert(value, subject, expiry);
            }
            Operation::Logout => {
                self.user_ip.remove(value, subject);
            }
            Operation::Group => {
                self.user_group.upsert(subject, value, expiry);
            }
            Operation::Ungroup => {
                self.user_group.remove(subject, value);
            }
            Operation::Register => {
                self.ip_tag.upsert(subject, value, expiry);
            }
            Operation::Unregister => {
                self.ip_tag.remove(subject, value);
            }
        }
    }

    fn expiry_for(&self, ttl: Option<u32>, now: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = match ttl {
            Some(minutes) => Duration::minutes(i64::from(minutes)),
            None => self.max_lifetime,
        };
        now.checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// IPs the user is logged in from
    pub fn ips_for_user(&self, user: &str) -> BTreeSet<String> {
        self.user_ip.list_subjects(user)
    }

    /// IPs carrying the tag
    pub fn ips_for_tag(&self, tag: &str) -> BTreeSet<String> {
        self.ip_tag.list_subjects(tag)
    }

    /// Users that are members of the group
    pub fn users_in_group(&self, group: &str) -> BTreeSet<String> {
        self.user_group.list_subjects(group)
    }

    /// IPs of every user in the group
    ///
    /// Recomputed on each call.
    pub fn ips_for_group(&self, group: &str) -> BTreeSet<String> {
        self.user_group
            .list_subjects(group)
            .iter()
            .flat_map(|user| self.user_ip.list_subjects(user))
            .collect()
    }

    /// Drop every relation that expired strictly before `at`
    ///
    /// # Returns
    ///
    /// Total number of relations removed across the three stores
    pub fn garbage_collect(&mut self, at: DateTime<Utc>) -> usize {
        let user_ip = self.user_ip.garbage_collect(at);
        let user_group = self.user_group.garbage_collect(at);
        let ip_tag = self.ip_tag.garbage_collect(at);

        tracing::debug!(
            %at,
            user_ip,
            user_group,
            ip_tag,
            "Monitor garbage collection complete"
        );
        user_ip + user_group + ip_tag
    }

    /// Structural dump of all three stores
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            user_ip: self.user_ip.index_view(),
            group_user: self.user_group.index_view(),
            tag_ip: self.ip_tag.index_view(),
        }
    }

    /// Pretty-printed JSON of [`Monitor::snapshot`], for troubleshooting
    pub fn dump(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

impl Default for Monitor {
    fn default() -> Self {
        // Defaults always pass validation
        Self::from_validated(&MonitorConfig::default())
    }
}

impl ChangeLog for Monitor {
    fn log(&mut self, op: Operation, subject: &str, value: &str, ttl: Option<u32>) {
        self.record(op, subject, value, ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_login_refresh_keeps_single_relation() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Login, "a", "1.1.1.1", Some(5), t0());
        monitor.record_at(Operation::Login, "a", "1.1.1.1", Some(60), t0());

        let snapshot = monitor.snapshot();
        let user = &snapshot.user_ip["a"];
        assert_eq!(user.len(), 1);
        assert_eq!(user["1.1.1.1"], t0() + Duration::minutes(60));
    }

    #[test]
    fn test_refresh_recomputes_from_now() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Register, "1.1.1.1", "foo", Some(60), t0());
        monitor.record_at(
            Operation::Register,
            "1.1.1.1",
            "foo",
            Some(5),
            t0() + Duration::minutes(1),
        );

        // Shorter TTL wins: expiry is recomputed, never accumulated
        assert_eq!(
            monitor.snapshot().tag_ip["foo"]["1.1.1.1"],
            t0() + Duration::minutes(6)
        );
    }

    #[test]
    fn test_missing_ttl_uses_max_lifetime() {
        let config = MonitorConfig::new().with_max_lifetime_minutes(90);
        let mut monitor = Monitor::new(config).unwrap();
        monitor.record_at(Operation::Group, "a", "admins", None, t0());

        assert_eq!(
            monitor.snapshot().group_user["admins"]["a"],
            t0() + Duration::minutes(90)
        );
    }

    #[test]
    fn test_default_lifetime_is_720_hours() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Register, "1.1.1.1", "foo", None, t0());
        assert_eq!(
            monitor.snapshot().tag_ip["foo"]["1.1.1.1"],
            t0() + Duration::hours(720)
        );
    }

    #[test]
    fn test_default_matches_default_config() {
        let mut from_default = Monitor::default();
        let mut from_config = Monitor::new(MonitorConfig::default()).unwrap();
        for monitor in [&mut from_default, &mut from_config] {
            monitor.record_at(Operation::Login, "u", "1.1.1.1", None, t0());
        }
        assert_eq!(from_default.snapshot(), from_config.snapshot());
    }

    #[test]
    fn test_unregister_removes_before_expiry() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Register, "ip", "tag", Some(60), t0());
        monitor.record_at(Operation::Unregister, "ip", "tag", None, t0());
        assert!(monitor.ips_for_tag("tag").is_empty());
    }

    #[test]
    fn test_group_ips_are_transitive() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Login, "u1", "ip1", None, t0());
        monitor.record_at(Operation::Login, "u2", "ip2", None, t0());
        monitor.record_at(Operation::Login, "u3", "ip3", None, t0());
        monitor.record_at(Operation::Group, "u1", "g", None, t0());
        monitor.record_at(Operation::Group, "u2", "g", None, t0());

        assert_eq!(monitor.ips_for_group("g"), set(&["ip1", "ip2"]));
        assert_eq!(monitor.users_in_group("g"), set(&["u1", "u2"]));
        assert!(monitor.ips_for_group("nobody").is_empty());
    }

    #[test]
    fn test_stores_are_independent() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Login, "x", "1.1.1.1", None, t0());
        monitor.record_at(Operation::Register, "1.1.1.1", "x", None, t0());

        // Logout must not touch the IP→tag store even with overlapping names
        monitor.record_at(Operation::Logout, "x", "1.1.1.1", None, t0());
        assert!(monitor.ips_for_user("x").is_empty());
        assert_eq!(monitor.ips_for_tag("x"), set(&["1.1.1.1"]));
    }

    #[test]
    fn test_gc_sweeps_all_stores() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Login, "u", "ip", Some(5), t0());
        monitor.record_at(Operation::Group, "u", "g", Some(5), t0());
        monitor.record_at(Operation::Register, "ip", "t", Some(5), t0());
        monitor.record_at(Operation::Register, "ip", "keep", Some(30), t0());

        assert_eq!(monitor.garbage_collect(t0() + Duration::minutes(10)), 3);
        assert!(monitor.ips_for_user("u").is_empty());
        assert!(monitor.users_in_group("g").is_empty());
        assert!(monitor.ips_for_tag("t").is_empty());
        assert_eq!(monitor.ips_for_tag("keep"), set(&["ip"]));
    }

    #[test]
    fn test_dump_is_json() {
        let mut monitor = Monitor::default();
        monitor.record_at(Operation::Register, "1.1.1.1", "good", Some(60), t0());
        monitor.record_at(Operation::Login, "foo@test.local", "1.1.1.1", Some(60), t0());

        let dump = monitor.dump().unwrap();
        let value: serde_json::Value = serde_json::from_str(&dump).unwrap();
        assert!(value["tag_ip"]["good"]["1.1.1.1"].is_string());
        assert!(value["user_ip"]["foo@test.local"]["1.1.1.1"].is_string());
        assert!(value["group_user"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MonitorConfig::new().with_max_lifetime_minutes(0);
        assert!(Monitor::new(config).is_err());
    }
}
