//! Core datastore implementation

pub mod accessor;
pub mod clock;
pub mod config;
pub mod datastore;
pub mod diagnostics;
pub mod error;
pub(crate) mod index;
pub mod notify;
pub mod parse;
pub mod resource;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, InitialValue, Layout, ResourceSpec};
pub use datastore::Datastore;
pub use diagnostics::{DumpEntry, RamUsage};
pub use error::{DatastoreError, Rejected, Result, Status};
pub use notify::SetCallback;
pub use resource::{Buffer, Resource};
pub use types::{InstanceId, ResourceId, ResourceType, Scalar, Value};
