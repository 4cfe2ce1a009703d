//! Resource value objects handed to registration
//!
//! A [`Resource`] describes the shape of a resource (type, instance count,
//! slot width) together with the buffer that will back it. Registration
//! consumes it exactly once.

use crate::core::error::{DatastoreError, Result};
use crate::core::types::ResourceType;
use std::fmt;
use tracing::error;

/// Backing memory for a resource
///
/// `Owned` buffers are allocated by the store (or handed over by the caller)
/// and freed with it. `Borrowed` buffers belong to the embedder, for example
/// a field inside a larger struct; the store only ever reads and writes them
/// and the borrow keeps them alive for as long as the store is.
pub enum Buffer<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
}

impl Buffer<'_> {
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Buffer::Owned(_))
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Buffer::Owned(data) => data,
            Buffer::Borrowed(data) => data,
        }
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "Borrowed" };
        write!(f, "{}({} bytes)", kind, self.len())
    }
}

/// Allocate a zero-filled buffer, reporting allocation failure instead of aborting
pub(crate) fn zeroed(len: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        error!("allocation of {} bytes failed: {}", len, e);
        DatastoreError::OutOfMemory(format!("cannot allocate {} bytes", len))
    })?;
    data.resize(len, 0);
    Ok(data)
}

fn total_len(num_instances: u32, size: usize) -> Result<usize> {
    (num_instances as usize).checked_mul(size).ok_or_else(|| {
        DatastoreError::OutOfMemory(format!("{} instances of {} bytes overflows", num_instances, size))
    })
}

/// A resource ready to be registered
#[derive(Debug)]
pub struct Resource<'a> {
    buffer: Buffer<'a>,
    size: usize,
    resource_type: ResourceType,
    num_instances: u32,
}

impl Resource<'static> {
    /// Zero-initialised scalar resource with a store-owned buffer
    ///
    /// # Errors
    ///
    /// `InvalidType` for [`ResourceType::String`], which needs a slot width
    /// (see [`Resource::string`]); `OutOfMemory` if the buffer cannot be
    /// allocated.
    pub fn new(resource_type: ResourceType, num_instances: u32) -> Result<Self> {
        let size = resource_type.width().ok_or_else(|| {
            error!("resource type {} needs an explicit width", resource_type);
            DatastoreError::InvalidType(format!("{} resources need an explicit width", resource_type))
        })?;
        let data = zeroed(total_len(num_instances, size)?)?;
        Ok(Resource {
            buffer: Buffer::Owned(data),
            size,
            resource_type,
            num_instances,
        })
    }

    /// String resource whose instances each occupy `width` bytes, terminator included
    ///
    /// # Errors
    ///
    /// `InvalidWidth` if `width` is zero.
    pub fn string(width: usize, num_instances: u32) -> Result<Self> {
        if width == 0 {
            error!("string resources need a non-zero width");
            return Err(DatastoreError::InvalidWidth(width));
        }
        let data = zeroed(total_len(num_instances, width)?)?;
        Ok(Resource {
            buffer: Buffer::Owned(data),
            size: width,
            resource_type: ResourceType::String,
            num_instances,
        })
    }

    /// Resource over a caller-prepared buffer that the store takes ownership of
    pub fn from_vec(
        resource_type: ResourceType,
        num_instances: u32,
        size: usize,
        data: Vec<u8>,
    ) -> Self {
        Resource {
            buffer: Buffer::Owned(data),
            size,
            resource_type,
            num_instances,
        }
    }
}

impl<'a> Resource<'a> {
    /// Resource over embedder-owned memory
    ///
    /// The store never frees `data`; the borrow ends when the store is dropped.
    /// Shape is checked at registration.
    pub fn borrowed(
        resource_type: ResourceType,
        num_instances: u32,
        size: usize,
        data: &'a mut [u8],
    ) -> Self {
        Resource {
            buffer: Buffer::Borrowed(data),
            size,
            resource_type,
            num_instances,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn num_instances(&self) -> u32 {
        self.num_instances
    }

    /// Per-instance slot width in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_owned(&self) -> bool {
        self.buffer.is_owned()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub(crate) fn buffer(&self) -> &Buffer<'a> {
        &self.buffer
    }

    pub(crate) fn into_buffer(self) -> Buffer<'a> {
        self.buffer
    }
}
