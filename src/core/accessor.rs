//! Typed reads and writes
//!
//! Every accessor validates, in order, the id, the resource's type and the
//! instance before touching any bytes. Writes also check the value's encoded
//! size against the slot width, stamp the write time and then notify the
//! resource's subscribers.

use crate::core::datastore::Datastore;
use crate::core::error::{DatastoreError, Result};
use crate::core::parse::parse_value;
use crate::core::types::{InstanceId, ResourceId, ResourceType, Scalar, Value};
use tracing::error;

/// Bytes of a string slot up to (not including) the first terminator
pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

impl<'a> Datastore<'a> {
    /// Read one instance of a scalar resource
    ///
    /// ```
    /// use datastore_rs::{Datastore, ResourceType};
    ///
    /// # fn main() -> datastore_rs::Result<()> {
    /// let store = Datastore::new();
    /// store.add_fixed_length_resource(0, ResourceType::Double, 1)?;
    /// store.set(0, 0, 2.5f64)?;
    /// assert_eq!(store.get::<f64>(0, 0)?, 2.5);
    /// # Ok(())
    /// # }
    /// ```
    pub fn get<T: Scalar>(&self, id: ResourceId, instance: InstanceId) -> Result<T> {
        self.read_slot(id, instance, T::TYPE, |bytes| Ok(T::read_bytes(bytes)))
    }

    /// Write one instance of a scalar resource and notify its subscribers
    pub fn set<T: Scalar>(&self, id: ResourceId, instance: InstanceId, value: T) -> Result<()> {
        self.write_slot(id, instance, T::TYPE, T::WIDTH, |dest| value.write_bytes(dest))
    }

    /// Read, then write back `f(current)` as a separate call
    ///
    /// The store mutex is released between the two, so concurrent updates of
    /// the same instance can overwrite each other.
    fn update<T: Scalar>(
        &self,
        id: ResourceId,
        instance: InstanceId,
        f: impl FnOnce(T) -> T,
    ) -> Result<()> {
        let current = self.get::<T>(id, instance)?;
        self.set(id, instance, f(current))
    }

    pub fn get_bool(&self, id: ResourceId, instance: InstanceId) -> Result<bool> {
        self.get(id, instance)
    }

    pub fn get_uint8(&self, id: ResourceId, instance: InstanceId) -> Result<u8> {
        self.get(id, instance)
    }

    pub fn get_uint32(&self, id: ResourceId, instance: InstanceId) -> Result<u32> {
        self.get(id, instance)
    }

    pub fn get_int8(&self, id: ResourceId, instance: InstanceId) -> Result<i8> {
        self.get(id, instance)
    }

    pub fn get_int32(&self, id: ResourceId, instance: InstanceId) -> Result<i32> {
        self.get(id, instance)
    }

    pub fn get_float(&self, id: ResourceId, instance: InstanceId) -> Result<f32> {
        self.get(id, instance)
    }

    pub fn get_double(&self, id: ResourceId, instance: InstanceId) -> Result<f64> {
        self.get(id, instance)
    }

    pub fn set_bool(&self, id: ResourceId, instance: InstanceId, value: bool) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_uint8(&self, id: ResourceId, instance: InstanceId, value: u8) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_uint32(&self, id: ResourceId, instance: InstanceId, value: u32) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_int8(&self, id: ResourceId, instance: InstanceId, value: i8) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_int32(&self, id: ResourceId, instance: InstanceId, value: i32) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_float(&self, id: ResourceId, instance: InstanceId, value: f32) -> Result<()> {
        self.set(id, instance, value)
    }

    pub fn set_double(&self, id: ResourceId, instance: InstanceId, value: f64) -> Result<()> {
        self.set(id, instance, value)
    }

    /// Store a string, terminator included
    ///
    /// The stored text ends at the first NUL in `value`, if any. Its length
    /// plus the terminator must fit the slot width, otherwise `TooLarge` is
    /// returned and the slot is left untouched. Bytes after the terminator are
    /// zeroed.
    pub fn set_string(&self, id: ResourceId, instance: InstanceId, value: &str) -> Result<()> {
        let bytes = until_nul(value.as_bytes());
        self.write_slot(id, instance, ResourceType::String, bytes.len() + 1, |dest| {
            dest[..bytes.len()].copy_from_slice(bytes);
            dest[bytes.len()..].fill(0);
        })
    }

    /// Copy a string instance into `out`
    ///
    /// Copies `min(out.len(), width)` bytes and forces the last copied byte to
    /// the terminator, so a short `out` receives a truncated string. Returns
    /// the length of the string now in `out`.
    ///
    /// # Errors
    ///
    /// After the id, type and instance checks, `NullPointer` if `out` is empty.
    pub fn get_string_into(
        &self,
        id: ResourceId,
        instance: InstanceId,
        out: &mut [u8],
    ) -> Result<usize> {
        self.read_slot(id, instance, ResourceType::String, |slot| {
            if out.is_empty() {
                error!("resource {}: output buffer is empty", id);
                return Err(DatastoreError::NullPointer("output buffer is empty"));
            }
            let n = out.len().min(slot.len());
            out[..n].copy_from_slice(&slot[..n]);
            out[n - 1] = 0;
            Ok(until_nul(&out[..n]).len())
        })
    }

    /// Read a string instance in full
    ///
    /// Bytes that are not valid UTF-8 are replaced, see
    /// [`String::from_utf8_lossy`].
    pub fn get_string(&self, id: ResourceId, instance: InstanceId) -> Result<String> {
        self.read_slot(id, instance, ResourceType::String, |slot| {
            Ok(String::from_utf8_lossy(until_nul(slot)).into_owned())
        })
    }

    /// Read one instance of any type
    pub fn get_value(&self, id: ResourceId, instance: InstanceId) -> Result<Value> {
        let resource_type = self.resource_type(id)?;
        match resource_type {
            ResourceType::Bool => self.get::<bool>(id, instance).map(Value::Bool),
            ResourceType::Uint8 => self.get::<u8>(id, instance).map(Value::Uint8),
            ResourceType::Uint32 => self.get::<u32>(id, instance).map(Value::Uint32),
            ResourceType::Int8 => self.get::<i8>(id, instance).map(Value::Int8),
            ResourceType::Int32 => self.get::<i32>(id, instance).map(Value::Int32),
            ResourceType::Float => self.get::<f32>(id, instance).map(Value::Float),
            ResourceType::Double => self.get::<f64>(id, instance).map(Value::Double),
            ResourceType::String => self.get_string(id, instance).map(Value::String),
        }
    }

    /// Write one instance from a [`Value`]; the value's type must match the resource's
    pub fn set_value(&self, id: ResourceId, instance: InstanceId, value: &Value) -> Result<()> {
        match value {
            Value::Bool(v) => self.set(id, instance, *v),
            Value::Uint8(v) => self.set(id, instance, *v),
            Value::Uint32(v) => self.set(id, instance, *v),
            Value::Int8(v) => self.set(id, instance, *v),
            Value::Int32(v) => self.set(id, instance, *v),
            Value::Float(v) => self.set(id, instance, *v),
            Value::Double(v) => self.set(id, instance, *v),
            Value::String(v) => self.set_string(id, instance, v),
        }
    }

    /// Parse `text` according to the resource's type and store it
    ///
    /// ```
    /// use datastore_rs::{Datastore, ResourceType};
    ///
    /// # fn main() -> datastore_rs::Result<()> {
    /// let store = Datastore::new();
    /// store.add_fixed_length_resource(1, ResourceType::Uint8, 1)?;
    /// store.set_from_string(1, 0, "255")?;
    /// assert_eq!(store.get_uint8(1, 0)?, 255);
    /// assert!(store.set_from_string(1, 0, "256").is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_from_string(&self, id: ResourceId, instance: InstanceId, text: &str) -> Result<()> {
        let resource_type = self.instance_type(id, instance)?;
        let value = parse_value(resource_type, text)?;
        self.set_value(id, instance, &value)
    }

    /// Increase an integer instance by one, or toggle a bool
    ///
    /// Integers wrap on overflow. This is a plain get followed by a set: the
    /// write goes through every check and notification of [`Datastore::set`],
    /// and two concurrent increments of one instance may lose an update.
    ///
    /// # Errors
    ///
    /// `InvalidId`, then `InvalidInstance`, then `InvalidType` for float,
    /// double and string resources.
    pub fn increment(&self, id: ResourceId, instance: InstanceId) -> Result<()> {
        match self.instance_type(id, instance)? {
            ResourceType::Uint8 => self.update(id, instance, |v: u8| v.wrapping_add(1)),
            ResourceType::Uint32 => self.update(id, instance, |v: u32| v.wrapping_add(1)),
            ResourceType::Int8 => self.update(id, instance, |v: i8| v.wrapping_add(1)),
            ResourceType::Int32 => self.update(id, instance, |v: i32| v.wrapping_add(1)),
            ResourceType::Bool => self.update(id, instance, |v: bool| !v),
            other => {
                error!("cannot increment resource {} of type {}", id, other);
                Err(DatastoreError::InvalidType(format!("cannot increment {}", other)))
            }
        }
    }

    /// Add `addend` to an integer instance, wrapping in the resource's type
    ///
    /// The addend is reduced modulo the type's range first, so adding `-1`
    /// to a `uint8` holding 0 yields 255.
    pub fn add(&self, id: ResourceId, instance: InstanceId, addend: i64) -> Result<()> {
        match self.instance_type(id, instance)? {
            ResourceType::Uint8 => self.update(id, instance, |v: u8| v.wrapping_add(addend as u8)),
            ResourceType::Uint32 => {
                self.update(id, instance, |v: u32| v.wrapping_add(addend as u32))
            }
            ResourceType::Int8 => self.update(id, instance, |v: i8| v.wrapping_add(addend as i8)),
            ResourceType::Int32 => {
                self.update(id, instance, |v: i32| v.wrapping_add(addend as i32))
            }
            other => {
                error!("cannot add to resource {} of type {}", id, other);
                Err(DatastoreError::InvalidType(format!("cannot add to {}", other)))
            }
        }
    }
}
