//! Rendering, dump, age and memory accounting

use crate::core::datastore::Datastore;
use crate::core::error::{DatastoreError, Result};
use crate::core::types::{InstanceId, ResourceId};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

/// One line of [`Datastore::dump`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DumpEntry {
    pub id: ResourceId,
    pub name: Option<String>,
    pub instance: InstanceId,
    /// Slot width in bytes
    pub size: usize,
    /// Rendered value, `None` while the resource has never been written
    pub value: Option<String>,
    pub age_us: Option<u64>,
}

impl fmt::Display for DumpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("-");
        write!(f, "{:2} {:<40} {:3} {:4} ", self.id, name, self.instance, self.size)?;
        match (&self.value, self.age_us) {
            (Some(value), Some(age)) => write!(f, "[{}] ({})", value, age),
            _ => f.write_str("[]"),
        }
    }
}

/// Memory held by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RamUsage {
    /// Allocated capacity of the row tables
    pub index_bytes: usize,
    /// Sum of every registered resource's buffer, owned or borrowed
    pub buffer_bytes: usize,
}

impl RamUsage {
    pub fn total(&self) -> usize {
        self.index_bytes + self.buffer_bytes
    }
}

impl<'a> Datastore<'a> {
    /// Render one instance as text
    ///
    /// Bools print as `true`/`false`, integers in decimal, floats in their
    /// shortest round-trip form and strings verbatim.
    pub fn get_as_string(&self, id: ResourceId, instance: InstanceId) -> Result<String> {
        self.instance_type(id, instance)?;
        self.get_value(id, instance).map(|value| value.to_string())
    }

    /// Render one instance into `out`, truncating as needed
    ///
    /// The output is always terminated, so at most `out.len() - 1` bytes of
    /// text are written. Returns the number of text bytes written.
    pub fn get_as_string_into(
        &self,
        id: ResourceId,
        instance: InstanceId,
        out: &mut [u8],
    ) -> Result<usize> {
        let text = self.get_as_string(id, instance)?;
        let Some(capacity) = out.len().checked_sub(1) else {
            error!("resource {}: output buffer is empty", id);
            return Err(DatastoreError::NullPointer("output buffer is empty"));
        };
        let n = text.len().min(capacity);
        out[..n].copy_from_slice(&text.as_bytes()[..n]);
        out[n] = 0;
        Ok(n)
    }

    /// Time since the last successful write to any instance of resource `id`
    ///
    /// Age is kept per resource, not per instance: writing instance 3 also
    /// resets the age reported for instance 0. `None` means the resource has
    /// never been written.
    ///
    /// ```
    /// use datastore_rs::{Datastore, ManualClock, ResourceType};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # fn main() -> datastore_rs::Result<()> {
    /// let clock = Arc::new(ManualClock::new(0));
    /// let store = Datastore::with_clock(clock.clone());
    /// store.add_fixed_length_resource(0, ResourceType::Bool, 4)?;
    /// assert_eq!(store.get_age(0, 0)?, None);
    ///
    /// store.set_bool(0, 3, true)?;
    /// clock.advance(1_500);
    /// assert_eq!(store.get_age(0, 0)?, Some(Duration::from_micros(1_500)));
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_age(&self, id: ResourceId, instance: InstanceId) -> Result<Option<Duration>> {
        let Some(stamp) = self.last_write(id, instance)? else {
            return Ok(None);
        };
        let now = self.now_us();
        Ok(Some(Duration::from_micros(now.saturating_sub(stamp))))
    }

    /// Every registered instance, in id then instance order
    ///
    /// Stops at the first instance that fails to render.
    pub fn dump_entries(&self) -> Result<Vec<DumpEntry>> {
        let mut entries = Vec::new();
        self.for_each_entry(|entry| entries.push(entry))?;
        Ok(entries)
    }

    /// Log every registered instance at info level
    pub fn dump(&self) -> Result<()> {
        self.for_each_entry(|entry| info!("{}", entry)).map_err(|e| {
            error!("dump failed: {}", e);
            e
        })
    }

    fn for_each_entry(&self, mut f: impl FnMut(DumpEntry)) -> Result<()> {
        for row in self.row_infos()? {
            let count = InstanceId::try_from(row.num_instances).unwrap_or(InstanceId::MAX);
            for instance in 0..count {
                let value = self.get_as_string(row.id, instance)?;
                let age = self.get_age(row.id, instance)?;
                let age_us = age.map(|age| u64::try_from(age.as_micros()).unwrap_or(u64::MAX));
                f(DumpEntry {
                    id: row.id,
                    name: row.name.clone(),
                    instance,
                    size: row.size,
                    value: age_us.map(|_| value),
                    age_us,
                });
            }
        }
        Ok(())
    }

    /// Bytes held by the row tables plus every registered buffer
    pub fn ram_usage(&self) -> RamUsage {
        let (index_bytes, buffer_bytes) = self.memory_footprint();
        RamUsage {
            index_bytes,
            buffer_bytes,
        }
    }
}
