use crate::core::resource::Resource;
use crate::core::types::ResourceType;
use thiserror::Error;

/// Errors reported by the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatastoreError {
    /// Allocation failed or the index limit was reached
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Store already freed, or an empty buffer where one is required
    #[error("Null pointer: {0}")]
    NullPointer(&'static str),

    /// Accessor type does not match the registered type
    #[error("Invalid type: resource {id} is {actual}, expected {expected}")]
    TypeMismatch {
        id: i32,
        expected: ResourceType,
        actual: ResourceType,
    },

    /// Operation not supported for this type
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Resource ID is negative, out of range or unregistered
    #[error("Invalid resource ID: {0}")]
    InvalidId(i32),

    /// Resource ID is already taken
    #[error("Resource ID {0} is already registered")]
    DuplicateId(i32),

    /// Instance index out of range
    #[error("Invalid instance {instance} (resource has {num_instances})")]
    InvalidInstance { instance: i32, num_instances: u32 },

    /// Resource registered with zero instances
    #[error("Invalid number of instances: {0}")]
    InvalidInstanceCount(u32),

    /// Encoded value does not fit the slot
    #[error("Value of {size} bytes exceeds slot width of {width} bytes")]
    TooLarge { size: usize, width: usize },

    /// Buffer too small for the declared shape
    #[error("Resource needs {needed} bytes but its buffer holds {available}")]
    ShapeMismatch { needed: usize, available: usize },

    /// String slot width of zero
    #[error("Invalid slot width: {0}")]
    InvalidWidth(usize),

    /// Text does not parse as the resource type
    #[error("Invalid representation for {ty}: {text:?}")]
    InvalidRepresentation { ty: ResourceType, text: String },
}

impl DatastoreError {
    /// Flat status code for this error
    ///
    /// Several variants collapse onto one code: a type mismatch and an
    /// unsupported type are both `InvalidType`, an out-of-range id and a
    /// duplicate registration are both `InvalidId`, and the registration-time
    /// shape errors share codes with their accessor-time counterparts.
    pub fn status(&self) -> Status {
        match self {
            DatastoreError::OutOfMemory(_) => Status::OutOfMemory,
            DatastoreError::NullPointer(_) => Status::NullPointer,
            DatastoreError::TypeMismatch { .. } | DatastoreError::InvalidType(_) => {
                Status::InvalidType
            }
            DatastoreError::InvalidId(_) | DatastoreError::DuplicateId(_) => Status::InvalidId,
            DatastoreError::InvalidInstance { .. } | DatastoreError::InvalidInstanceCount(_) => {
                Status::InvalidInstance
            }
            DatastoreError::TooLarge { .. }
            | DatastoreError::ShapeMismatch { .. }
            | DatastoreError::InvalidWidth(_) => Status::TooLarge,
            DatastoreError::InvalidRepresentation { .. } => Status::InvalidRepresentation,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatastoreError>;

/// Status codes for callers bridging to a status-code API
///
/// Discriminants are stable: `Ok` is zero and the error codes follow in
/// declaration order.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 0,
    OutOfMemory = 1,
    NullPointer = 2,
    InvalidType = 3,
    InvalidId = 4,
    InvalidInstance = 5,
    TooLarge = 6,
    InvalidRepresentation = 7,
}

impl Status {
    /// Collapse any datastore result into its status code
    pub fn from_result<T>(result: &Result<T>) -> Status {
        match result {
            Ok(_) => Status::Ok,
            Err(err) => err.status(),
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&DatastoreError> for Status {
    fn from(err: &DatastoreError) -> Self {
        err.status()
    }
}

/// A registration that did not take
///
/// When the index refuses a resource without having consumed it (a duplicate
/// id, or a validation failure caught before the index was touched), the
/// resource comes back to the caller in `resource`. When the index itself
/// failed to grow, the buffer has already been released and `resource` is
/// `None`.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct Rejected<'a> {
    pub error: DatastoreError,
    pub resource: Option<Resource<'a>>,
}

impl<'a> Rejected<'a> {
    pub(crate) fn returned(error: DatastoreError, resource: Resource<'a>) -> Self {
        Rejected {
            error,
            resource: Some(resource),
        }
    }

    pub(crate) fn consumed(error: DatastoreError) -> Self {
        Rejected {
            error,
            resource: None,
        }
    }

    /// Take back the rejected resource, if the store handed it back
    pub fn into_resource(self) -> Option<Resource<'a>> {
        self.resource
    }
}

impl From<Rejected<'_>> for DatastoreError {
    fn from(rejected: Rejected<'_>) -> Self {
        rejected.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::OutOfMemory.code(), 1);
        assert_eq!(Status::NullPointer.code(), 2);
        assert_eq!(Status::InvalidType.code(), 3);
        assert_eq!(Status::InvalidId.code(), 4);
        assert_eq!(Status::InvalidInstance.code(), 5);
        assert_eq!(Status::TooLarge.code(), 6);
        assert_eq!(Status::InvalidRepresentation.code(), 7);
    }

    #[test]
    fn test_duplicate_and_range_share_invalid_id() {
        assert_eq!(DatastoreError::InvalidId(-1).status(), Status::InvalidId);
        assert_eq!(DatastoreError::DuplicateId(3).status(), Status::InvalidId);
    }

    #[test]
    fn test_shape_errors_share_too_large() {
        let mismatch = DatastoreError::ShapeMismatch { needed: 8, available: 4 };
        assert_eq!(mismatch.status(), Status::TooLarge);
        assert_eq!(DatastoreError::InvalidWidth(0).status(), Status::TooLarge);
    }

    #[test]
    fn test_from_result() {
        let ok: Result<u8> = Ok(1);
        let err: Result<u8> = Err(DatastoreError::TooLarge { size: 9, width: 8 });
        assert!(Status::from_result(&ok).is_ok());
        assert_eq!(Status::from_result(&err), Status::TooLarge);
    }

    #[test]
    fn test_messages_carry_context() {
        let err = DatastoreError::TypeMismatch {
            id: 4,
            expected: ResourceType::Uint8,
            actual: ResourceType::Float,
        };
        assert_eq!(
            err.to_string(),
            "Invalid type: resource 4 is float, expected uint8"
        );
    }
}
