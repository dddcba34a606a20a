//! Core traits for the User-ID sync system
//!
//! This module defines the abstract interfaces the core exposes and consumes.
//!
//! - [`ChangeLog`]: Receives one event per finalized relation change
//! - [`Transport`]: Sends an encoded User-ID request to the device

pub mod change_log;
pub mod transport;

pub use change_log::{ChangeEvent, ChangeLog, Operation, TracingChangeLog};
pub use transport::{ApiReply, ApiRequest, Transport};
