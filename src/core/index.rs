//! Resource index: dense, id-addressed table of resource rows
//!
//! The index physically spans `[0, max_id]`. Registering an id past the end
//! extends the table to `id + 1` rows, leaving every new row unregistered, so
//! callers are expected to pick small dense ids.
//!
//! Row metadata lives in [`Index`]; the bytes and write timestamps live in a
//! parallel table of [`Slot`]s that the store keeps behind its mutex. Both
//! tables always have the same length.

use crate::core::error::{DatastoreError, Rejected, Result};
use crate::core::notify::SubscriberList;
use crate::core::resource::{Buffer, Resource};
use crate::core::types::{InstanceId, ResourceId, ResourceType};
use std::mem;
use tracing::{debug, error};

/// Descriptor of one registered resource
#[derive(Debug)]
pub(crate) struct Row<'a> {
    /// Echoes the row's own slot in the index
    pub id: ResourceId,
    pub name: Option<String>,
    pub resource_type: ResourceType,
    pub num_instances: u32,
    /// Per-instance width in bytes
    pub size: usize,
    pub owned: bool,
    pub subscribers: SubscriberList<'a>,
}

impl Row<'_> {
    pub fn check_type(&self, expected: ResourceType) -> Result<()> {
        if self.resource_type == expected {
            Ok(())
        } else {
            error!(
                "resource {}: bad type {} (expected {})",
                self.id, self.resource_type, expected
            );
            Err(DatastoreError::TypeMismatch {
                id: self.id,
                expected,
                actual: self.resource_type,
            })
        }
    }

    /// Byte offset of `instance` within the row's buffer
    pub fn offset(&self, instance: InstanceId) -> Result<usize> {
        match u32::try_from(instance) {
            Ok(i) if i < self.num_instances => Ok(i as usize * self.size),
            _ => {
                error!("resource {}: instance {} is invalid", self.id, instance);
                Err(DatastoreError::InvalidInstance {
                    instance,
                    num_instances: self.num_instances,
                })
            }
        }
    }

    pub fn buffer_len(&self) -> usize {
        self.num_instances as usize * self.size
    }
}

/// Backing bytes and last-write timestamp of one registered resource
#[derive(Debug)]
pub(crate) struct Slot<'a> {
    pub buffer: Buffer<'a>,
    /// `None` until the first successful write
    pub timestamp: Option<u64>,
}

pub(crate) type Slots<'a> = Vec<Option<Slot<'a>>>;

/// Growable table of rows keyed by resource id
#[derive(Debug)]
pub(crate) struct Index<'a> {
    rows: Vec<Option<Row<'a>>>,
    /// Upper bound on the number of rows, if any
    max_rows: Option<usize>,
}

impl<'a> Index<'a> {
    pub fn new(max_rows: Option<usize>) -> Self {
        Index {
            rows: Vec::new(),
            max_rows,
        }
    }

    /// Number of rows the table spans, registered or not
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn registered(&self) -> impl Iterator<Item = &Row<'a>> {
        self.rows.iter().flatten()
    }

    pub fn row(&self, id: ResourceId) -> Result<&Row<'a>> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.rows.get(idx))
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                error!("resource ID {} is invalid", id);
                DatastoreError::InvalidId(id)
            })
    }

    pub fn row_mut(&mut self, id: ResourceId) -> Result<&mut Row<'a>> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.rows.get_mut(idx))
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                error!("resource ID {} is invalid", id);
                DatastoreError::InvalidId(id)
            })
    }

    /// Grow both tables so that `idx` is addressable
    ///
    /// Existing rows are moved untouched; only the new rows start out
    /// unregistered.
    fn extend(&mut self, slots: &mut Slots<'a>, idx: usize) -> Result<()> {
        let old_len = self.rows.len();
        if idx < old_len {
            return Ok(());
        }

        let new_len = idx + 1;
        if self.max_rows.is_some_and(|max| new_len > max) {
            error!("extending to {} rows exceeds the limit of {:?}", new_len, self.max_rows);
            return Err(DatastoreError::OutOfMemory(format!(
                "resource ID {} exceeds the configured limit",
                idx
            )));
        }

        debug!(
            "extend from {} to {} rows, {} to {} bytes",
            old_len,
            new_len,
            old_len * mem::size_of::<Option<Row<'a>>>(),
            new_len * mem::size_of::<Option<Row<'a>>>()
        );

        let additional = new_len - old_len;
        self.rows
            .try_reserve_exact(additional)
            .and_then(|()| slots.try_reserve_exact(new_len - slots.len()))
            .map_err(|e| {
                error!("extending index to {} rows failed: {}", new_len, e);
                DatastoreError::OutOfMemory(format!("cannot extend index to {} rows", new_len))
            })?;

        self.rows.resize_with(new_len, || None);
        slots.resize_with(new_len, || None);
        Ok(())
    }

    /// Register `resource` under `id`
    ///
    /// Checks run in a fixed order and the first failure wins: id, instance
    /// count, buffer, buffer length, then scalar width. Up to that point the resource is handed
    /// back untouched. If the tables cannot grow, the resource is dropped
    /// here. A duplicate id hands the resource back as well; the existing
    /// registration is left alone.
    pub fn register(
        &mut self,
        slots: &mut Slots<'a>,
        id: ResourceId,
        resource: Resource<'a>,
    ) -> std::result::Result<(), Rejected<'a>> {
        let Ok(idx) = usize::try_from(id) else {
            error!("resource ID {} is invalid", id);
            return Err(Rejected::returned(DatastoreError::InvalidId(id), resource));
        };

        if let Err(err) = validate_shape(&resource) {
            return Err(Rejected::returned(err, resource));
        }

        if let Err(err) = self.extend(slots, idx) {
            // The index owns the buffer from here on; release it.
            drop(resource);
            return Err(Rejected::consumed(err));
        }

        if self.rows[idx].is_some() {
            error!("resource {} already defined", id);
            return Err(Rejected::returned(DatastoreError::DuplicateId(id), resource));
        }

        let resource_type = resource.resource_type();
        let num_instances = resource.num_instances();
        let size = resource.size();
        let buffer = resource.into_buffer();
        let owned = buffer.is_owned();

        debug!(
            "register id {}, type {}, {} x {} bytes, owned {}",
            id, resource_type, num_instances, size, owned
        );

        self.rows[idx] = Some(Row {
            id,
            name: None,
            resource_type,
            num_instances,
            size,
            owned,
            subscribers: SubscriberList::new(),
        });
        slots[idx] = Some(Slot {
            buffer,
            timestamp: None,
        });
        Ok(())
    }

    /// Release every row, buffer and subscriber; returns (rows, owned bytes) freed
    pub fn teardown(&mut self, slots: &mut Slots<'a>) -> (usize, usize) {
        let rows = self.registered().count();
        let owned_bytes = self
            .registered()
            .filter(|row| row.owned)
            .map(Row::buffer_len)
            .sum();

        self.rows = Vec::new();
        *slots = Vec::new();
        (rows, owned_bytes)
    }

    /// Bytes held by the row table itself (allocated capacity, both tables)
    pub fn table_bytes(&self, slots: &Slots<'a>) -> usize {
        self.rows.capacity() * mem::size_of::<Option<Row<'a>>>()
            + slots.capacity() * mem::size_of::<Option<Slot<'a>>>()
    }
}

fn validate_shape(resource: &Resource<'_>) -> Result<()> {
    let resource_type = resource.resource_type();
    let num_instances = resource.num_instances();

    if num_instances == 0 {
        error!("{} instances is invalid", num_instances);
        return Err(DatastoreError::InvalidInstanceCount(num_instances));
    }

    if resource_type == ResourceType::String && resource.size() == 0 {
        error!("string resources need a non-zero width");
        return Err(DatastoreError::InvalidWidth(0));
    }

    if resource.buffer().is_empty() {
        error!("resource buffer is empty");
        return Err(DatastoreError::NullPointer("resource buffer is empty"));
    }

    let needed = num_instances as usize * resource.size();
    let available = resource.buffer().len();
    if available < needed {
        error!("resource needs {} bytes, buffer holds {}", needed, available);
        return Err(DatastoreError::ShapeMismatch { needed, available });
    }

    if let Some(width) = resource_type.width() {
        if resource.size() != width {
            error!(
                "{} resources are {} bytes wide, got {}",
                resource_type,
                width,
                resource.size()
            );
            return Err(DatastoreError::InvalidType(format!(
                "{} resources are {} bytes wide, got {}",
                resource_type,
                width,
                resource.size()
            )));
        }
    }

    Ok(())
}
