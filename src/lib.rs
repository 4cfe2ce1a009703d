//! # Datastore - Typed Resource Store
//!
//! `datastore-rs` is an in-process table of named, typed resources shared by
//! the threads of one program. Each resource is an array of instances of a
//! single type, addressed by a small integer id:
//!
//! - **Typed accessors** with id, type, instance and size checks on every call
//! - **Change notification**: subscribers run after each successful write,
//!   with no lock held, and may call back into the store
//! - **Age tracking** per resource from a monotonic clock
//! - **Diagnostics**: textual rendering, a tabular dump and memory accounting
//! - **Declarative layouts** loaded from TOML or JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use datastore_rs::{Datastore, ResourceType, Result};
//!
//! # fn main() -> Result<()> {
//! let store = Datastore::new();
//! store.add_fixed_length_resource(5, ResourceType::Uint32, 10)?;
//! store.add_string_resource(2, 1, 8)?;
//! store.set_name(5, Some("counters"))?;
//!
//! store.set_uint32(5, 3, 42)?;
//! store.increment(5, 3)?;
//! assert_eq!(store.get_uint32(5, 3)?, 43);
//!
//! store.set_string(2, 0, "abcdefg")?;
//! assert!(store.set_string(2, 0, "abcdefgh").is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Builder
//!
//! ```rust
//! use datastore_rs::{DatastoreBuilder, Layout, ManualClock};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), datastore_rs::ConfigError> {
//! let layout = Layout::from_toml_str(r#"
//!     [[resource]]
//!     id = 0
//!     name = "enabled"
//!     type = "bool"
//!     instances = 2
//!     initial = [true]
//! "#)?;
//!
//! let store = DatastoreBuilder::new()
//!     .clock(Arc::new(ManualClock::new(0)))
//!     .max_resources(64)
//!     .layout(layout)
//!     .build()?;
//!
//! assert!(store.get_bool(0, 0)?);
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    parse, Buffer, Clock, ConfigError, Datastore, DatastoreError, DumpEntry, InitialValue,
    InstanceId, Layout, ManualClock, MonotonicClock, RamUsage, Rejected, Resource, ResourceId,
    ResourceSpec, ResourceType, Result, Scalar, SetCallback, Status, Value,
};

use std::sync::Arc;
use tracing::info;

/// Builder for creating a [`Datastore`] with custom configuration
///
/// # Examples
///
/// ```rust
/// use datastore_rs::DatastoreBuilder;
///
/// # fn main() -> Result<(), datastore_rs::ConfigError> {
/// let store = DatastoreBuilder::new()
///     .max_resources(128)
///     .build()?;
/// assert_eq!(store.resource_count(), 0);
/// # Ok(())
/// # }
/// ```
pub struct DatastoreBuilder {
    clock: Option<Arc<dyn Clock>>,
    max_resources: Option<usize>,
    layout: Option<Layout>,
}

impl DatastoreBuilder {
    /// Create a new DatastoreBuilder with default settings
    pub fn new() -> Self {
        DatastoreBuilder {
            clock: None,
            max_resources: None,
            layout: None,
        }
    }

    /// Stamp writes with `clock` instead of a [`MonotonicClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Cap the index at `max` rows; registering an id at or past it fails with `OutOfMemory`
    pub fn max_resources(mut self, max: usize) -> Self {
        self.max_resources = Some(max);
        self
    }

    /// Resources to register when the store is built
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Build the Datastore instance
    pub fn build<'a>(self) -> std::result::Result<Datastore<'a>, ConfigError> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let store = Datastore::with_options(clock, self.max_resources);

        if let Some(layout) = self.layout {
            info!("Building datastore with {} declared resources", layout.resources.len());
            layout.apply(&store)?;
        }

        Ok(store)
    }
}

impl Default for DatastoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Commonly used items, for glob import
pub mod prelude {
    pub use crate::{
        Datastore, DatastoreBuilder, DatastoreError, InstanceId, Layout, ResourceId, ResourceType,
        Result, Scalar, Status, Value,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let store: Datastore<'static> = DatastoreBuilder::new().build().unwrap();
        assert_eq!(store.resource_count(), 0);
        assert!(!store.is_freed());
    }

    #[test]
    fn test_builder_limit_applies_to_layout() {
        let layout = Layout::new().with_resource(ResourceSpec::new(10, ResourceType::Uint8, 1));
        let err = DatastoreBuilder::new()
            .max_resources(4)
            .layout(layout)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Store(DatastoreError::OutOfMemory(_))
        ));
    }

    #[test]
    fn test_builder_uses_clock() {
        let clock = Arc::new(ManualClock::new(0));
        let store = DatastoreBuilder::new().clock(clock.clone()).build().unwrap();
        store
            .add_fixed_length_resource(0, ResourceType::Int32, 1)
            .unwrap();
        store.set_int32(0, 0, -1).unwrap();
        clock.advance(99);
        assert_eq!(
            store.get_age(0, 0).unwrap(),
            Some(std::time::Duration::from_micros(99))
        );
    }
}
