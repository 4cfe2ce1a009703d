//! The datastore: lifecycle, registration and resource metadata
//!
//! Typed reads and writes live in [`accessor`](crate::core::accessor) and
//! diagnostics in [`diagnostics`](crate::core::diagnostics); both are further
//! `impl` blocks on [`Datastore`].
//!
//! # Locking
//!
//! Row metadata sits behind a read/write lock that registration, naming and
//! subscription take for writing. The backing buffers and write timestamps
//! sit behind the store mutex, which is held only for the raw copy (and the
//! timestamp stamp on writes). Locks are always taken in that order, and
//! neither is held while subscribers run.

use crate::core::clock::{Clock, MonotonicClock};
use crate::core::error::{DatastoreError, Rejected, Result};
use crate::core::index::{Index, Row, Slot, Slots};
use crate::core::notify::{SetCallback, Subscribers};
use crate::core::resource::Resource;
use crate::core::types::{InstanceId, ResourceId, ResourceType};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Shared table of named, typed resources
///
/// `'a` bounds embedder-owned buffers registered with
/// [`Resource::borrowed`]; a store that only holds its own buffers can be
/// `Datastore<'static>`.
///
/// # Examples
///
/// ```
/// use datastore_rs::{Datastore, ResourceType};
///
/// # fn main() -> datastore_rs::Result<()> {
/// let store = Datastore::new();
/// store.add_fixed_length_resource(5, ResourceType::Uint32, 10)?;
///
/// store.set_uint32(5, 3, u32::MAX)?;
/// assert_eq!(store.get_uint32(5, 3)?, u32::MAX);
/// assert_eq!(store.get_uint32(5, 4)?, 0);
/// assert!(store.set_uint32(5, 10, 1).is_err());
/// # Ok(())
/// # }
/// ```
pub struct Datastore<'a> {
    /// `None` once the store has been freed
    index: RwLock<Option<Index<'a>>>,
    slots: Mutex<Slots<'a>>,
    clock: Arc<dyn Clock>,
}

/// Shape of a row, copied out so callers can work without holding locks
#[derive(Debug, Clone)]
pub(crate) struct RowInfo {
    pub id: ResourceId,
    pub name: Option<String>,
    pub num_instances: u32,
    pub size: usize,
}

impl<'a> Datastore<'a> {
    /// Create an empty store stamping writes with a [`MonotonicClock`]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_options(clock, None)
    }

    pub(crate) fn with_options(clock: Arc<dyn Clock>, max_resources: Option<usize>) -> Self {
        debug!("create datastore (max resources {:?})", max_resources);
        Datastore {
            index: RwLock::new(Some(Index::new(max_resources))),
            slots: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// Release every resource, name and subscriber
    ///
    /// Owned buffers are freed, borrowed ones are let go. Safe to call more
    /// than once; afterwards every fallible call reports `NullPointer`.
    pub fn free(&self) {
        let mut index = self.index.write();
        let Some(mut inner) = index.take() else {
            debug!("datastore already freed");
            return;
        };
        let mut slots = self.slots.lock();
        let (rows, owned_bytes) = inner.teardown(&mut slots);
        debug!("freed {} resources, {} owned bytes", rows, owned_bytes);
    }

    pub fn is_freed(&self) -> bool {
        self.index.read().is_none()
    }
}

impl<'a> Datastore<'a> {
    /// Register a prepared resource under `id`
    ///
    /// On failure the resource is dropped (owned buffers freed, borrowed ones
    /// released). Use [`Datastore::try_add_resource`] to get it back instead.
    ///
    /// # Errors
    ///
    /// In check order: `InvalidId` for a negative id, `InvalidInstanceCount`
    /// for zero instances, `InvalidWidth` for a zero-width string,
    /// `NullPointer` for an empty buffer, `InvalidType` or
    /// `ShapeMismatch` when the buffer does not fit the declared shape,
    /// `OutOfMemory` if the index cannot grow, and `DuplicateId` if `id` is
    /// already registered.
    pub fn add_resource(&self, id: ResourceId, resource: Resource<'a>) -> Result<()> {
        self.try_add_resource(id, resource).map_err(DatastoreError::from)
    }

    /// Register a prepared resource, handing it back if the store refuses it
    ///
    /// The resource comes back in [`Rejected::resource`] on a duplicate id and
    /// on every check that runs before the index grows. If growing the index
    /// fails, the buffer has been released and nothing comes back.
    pub fn try_add_resource(
        &self,
        id: ResourceId,
        resource: Resource<'a>,
    ) -> std::result::Result<(), Rejected<'a>> {
        let mut guard = self.index.write();
        let Some(index) = guard.as_mut() else {
            error!("datastore is freed");
            return Err(Rejected::returned(
                DatastoreError::NullPointer("datastore is freed"),
                resource,
            ));
        };
        let mut slots = self.slots.lock();
        index.register(&mut slots, id, resource)
    }

    /// Allocate and register a zeroed scalar resource
    pub fn add_fixed_length_resource(
        &self,
        id: ResourceId,
        resource_type: ResourceType,
        num_instances: u32,
    ) -> Result<()> {
        let resource = Resource::new(resource_type, num_instances)?;
        self.add_resource(id, resource)
    }

    /// Allocate and register a string resource of `width` bytes per instance
    ///
    /// `width` includes the terminator, so the longest storable string is
    /// `width - 1` bytes.
    pub fn add_string_resource(&self, id: ResourceId, num_instances: u32, width: usize) -> Result<()> {
        let resource = Resource::string(width, num_instances)?;
        self.add_resource(id, resource)
    }

    /// Subscribe to successful writes of resource `id`
    ///
    /// Subscribers run after the value is stored, in the order they were
    /// added, with no store lock held. They live as long as the store.
    pub fn add_set_callback<F>(&self, id: ResourceId, callback: F) -> Result<()>
    where
        F: Fn(&Datastore<'a>, ResourceId, InstanceId) + Send + Sync + 'a,
    {
        let callback: Arc<SetCallback<'a>> = Arc::new(callback);
        let mut guard = self.index.write();
        let row = Self::index_mut(&mut guard)?.row_mut(id)?;
        row.subscribers.push(callback);
        debug!("resource {}: {} subscribers", id, row.subscribers.len());
        Ok(())
    }
}

impl<'a> Datastore<'a> {
    /// Set or clear the display name of resource `id`
    pub fn set_name(&self, id: ResourceId, name: Option<&str>) -> Result<()> {
        let mut guard = self.index.write();
        let row = Self::index_mut(&mut guard)?.row_mut(id)?;
        row.name = name.map(str::to_owned);
        Ok(())
    }

    pub fn get_name(&self, id: ResourceId) -> Result<Option<String>> {
        self.with_row(id, |row| row.name.clone())
    }

    pub fn num_instances(&self, id: ResourceId) -> Result<u32> {
        self.with_row(id, |row| row.num_instances)
    }

    pub fn resource_type(&self, id: ResourceId) -> Result<ResourceType> {
        self.with_row(id, |row| row.resource_type)
    }

    /// Per-instance slot width of resource `id` in bytes
    pub fn resource_size(&self, id: ResourceId) -> Result<usize> {
        self.with_row(id, |row| row.size)
    }

    /// Highest id the index spans, registered or not
    pub fn max_resource_id(&self) -> Option<ResourceId> {
        let guard = self.index.read();
        let len = guard.as_ref().map_or(0, Index::len);
        len.checked_sub(1).and_then(|max| ResourceId::try_from(max).ok())
    }

    /// Number of registered resources
    pub fn resource_count(&self) -> usize {
        self.index
            .read()
            .as_ref()
            .map_or(0, |index| index.registered().count())
    }
}

impl<'a> Datastore<'a> {
    fn index_ref<'g>(guard: &'g Option<Index<'a>>) -> Result<&'g Index<'a>> {
        guard.as_ref().ok_or_else(|| {
            error!("datastore is freed");
            DatastoreError::NullPointer("datastore is freed")
        })
    }

    fn index_mut<'g>(guard: &'g mut Option<Index<'a>>) -> Result<&'g mut Index<'a>> {
        guard.as_mut().ok_or_else(|| {
            error!("datastore is freed");
            DatastoreError::NullPointer("datastore is freed")
        })
    }

    pub(crate) fn with_row<R>(&self, id: ResourceId, f: impl FnOnce(&Row<'a>) -> R) -> Result<R> {
        let guard = self.index.read();
        let row = Self::index_ref(&guard)?.row(id)?;
        Ok(f(row))
    }

    /// Shapes of every registered row, in id order
    pub(crate) fn row_infos(&self) -> Result<Vec<RowInfo>> {
        let guard = self.index.read();
        Ok(Self::index_ref(&guard)?
            .registered()
            .map(|row| RowInfo {
                id: row.id,
                name: row.name.clone(),
                num_instances: row.num_instances,
                size: row.size,
            })
            .collect())
    }

    /// Validate `id` and `instance` and report the resource's type
    pub(crate) fn instance_type(&self, id: ResourceId, instance: InstanceId) -> Result<ResourceType> {
        self.with_row(id, |row| row.offset(instance).map(|_| row.resource_type))?
    }

    /// Copy out of one instance under the store mutex
    ///
    /// Checks id, type and instance (in that order) before taking the mutex;
    /// `f` sees exactly the instance's slot.
    pub(crate) fn read_slot<R>(
        &self,
        id: ResourceId,
        instance: InstanceId,
        expected: ResourceType,
        f: impl FnOnce(&[u8]) -> Result<R>,
    ) -> Result<R> {
        debug!("get id {}, instance {}, type {}", id, instance, expected);
        let guard = self.index.read();
        let row = Self::index_ref(&guard)?.row(id)?;
        row.check_type(expected)?;
        let offset = row.offset(instance)?;

        let slots = self.slots.lock();
        let slot = Self::slot(&slots, id)?;
        f(&slot.buffer.as_slice()[offset..offset + row.size])
    }

    /// Write one instance under the store mutex, then notify subscribers
    ///
    /// `encoded_len` is checked against the slot width before anything is
    /// touched, so a rejected write leaves the slot as it was. Subscribers
    /// run after both locks are released.
    pub(crate) fn write_slot(
        &self,
        id: ResourceId,
        instance: InstanceId,
        expected: ResourceType,
        encoded_len: usize,
        f: impl FnOnce(&mut [u8]),
    ) -> Result<()> {
        debug!(
            "set id {}, instance {}, {} bytes, type {}",
            id, instance, encoded_len, expected
        );
        let subscribers: Option<Subscribers<'a>> = {
            let guard = self.index.read();
            let row = Self::index_ref(&guard)?.row(id)?;
            row.check_type(expected)?;
            let offset = row.offset(instance)?;
            if encoded_len > row.size {
                error!(
                    "resource {}: value size {} exceeds allocated size {}",
                    id, encoded_len, row.size
                );
                return Err(DatastoreError::TooLarge {
                    size: encoded_len,
                    width: row.size,
                });
            }

            {
                let mut slots = self.slots.lock();
                let slot = Self::slot_mut(&mut slots, id)?;
                let dest = &mut slot.buffer.as_mut_slice()[offset..offset + row.size];
                f(&mut *dest);
                slot.timestamp = Some(self.clock.now_us());
                trace!("resource {}[{}] = {:02x?}", id, instance, dest);
            }

            (!row.subscribers.is_empty()).then(|| row.subscribers.snapshot())
        };

        if let Some(subscribers) = subscribers {
            subscribers.notify(self, id, instance);
        }
        Ok(())
    }

    /// Timestamp of the last write to resource `id`, after validating `instance`
    pub(crate) fn last_write(&self, id: ResourceId, instance: InstanceId) -> Result<Option<u64>> {
        let guard = self.index.read();
        let row = Self::index_ref(&guard)?.row(id)?;
        row.offset(instance)?;

        let slots = self.slots.lock();
        Ok(Self::slot(&slots, id)?.timestamp)
    }

    pub(crate) fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    /// (row table bytes, backing buffer bytes)
    pub(crate) fn memory_footprint(&self) -> (usize, usize) {
        let guard = self.index.read();
        let Some(index) = guard.as_ref() else {
            return (0, 0);
        };
        let buffers = index.registered().map(Row::buffer_len).sum();
        let slots = self.slots.lock();
        (index.table_bytes(&slots), buffers)
    }

    fn slot<'s>(slots: &'s Slots<'a>, id: ResourceId) -> Result<&'s Slot<'a>> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| slots.get(idx))
            .and_then(Option::as_ref)
            .ok_or(DatastoreError::InvalidId(id))
    }

    fn slot_mut<'s>(slots: &'s mut Slots<'a>, id: ResourceId) -> Result<&'s mut Slot<'a>> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| slots.get_mut(idx))
            .and_then(Option::as_mut)
            .ok_or(DatastoreError::InvalidId(id))
    }
}

impl Default for Datastore<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Datastore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("resources", &self.resource_count())
            .field("max_resource_id", &self.max_resource_id())
            .field("freed", &self.is_freed())
            .finish()
    }
}
