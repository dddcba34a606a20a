// # uid-core
//
// Core library for keeping a firewall's User-ID relations in sync.
//
// ## Architecture Overview
//
// - **UidBuilder**: Accumulates register/unregister, login/logout and
//   group/ungroup requests and merges them into one canonical payload
// - **UidPayload / UidMessage**: The XML User-ID message model and its codec
// - **ChangeLog**: Sink that receives one event per finalized relation change
// - **Monitor**: Three expiring relation stores (user→IP, user→group, IP→tag)
//   fed by the change log, answering point and transitive queries
// - **Transport**: Injected capability that posts an encoded message to the device
//
// ## Design Principles
//
// 1. **Pure core**: Building, merging and relation tracking never block or do I/O
// 2. **Fail closed**: A builder carrying an error never produces output or events
// 3. **Explicit configuration**: No process-wide defaults, everything goes through config structs
// 4. **Single-threaded state**: The monitor performs no internal locking;
//    callers that share it wrap it in one coarse lock

pub mod builder;
pub mod config;
pub mod error;
pub mod monitor;
pub mod payload;
pub mod traits;

// Re-export core types for convenience
pub use builder::{IpTag, PendingEntry, UidBuilder, UserGroup, UserMap};
pub use config::{DeviceConfig, MonitorConfig};
pub use error::{BuildError, Error, Result};
pub use monitor::{Monitor, MonitorSnapshot, RelationItem, TtlMap};
pub use payload::{ApiResponse, UidMessage, UidPayload};
pub use traits::{ApiReply, ApiRequest, ChangeEvent, ChangeLog, Operation, Transport, TracingChangeLog};
