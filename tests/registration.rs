//! Registration, index growth and buffer ownership

use datastore_rs::{Datastore, DatastoreError, Resource, ResourceType, Result, Status};

#[test]
fn test_register_scalar_and_string() -> Result<()> {
    let store = Datastore::new();
    store.add_fixed_length_resource(5, ResourceType::Uint32, 10)?;
    store.add_string_resource(2, 1, 8)?;

    assert_eq!(store.resource_count(), 2);
    assert_eq!(store.max_resource_id(), Some(5));
    assert_eq!(store.num_instances(5)?, 10);
    assert_eq!(store.resource_size(5)?, 4);
    assert_eq!(store.resource_type(2)?, ResourceType::String);
    assert_eq!(store.resource_size(2)?, 8);
    Ok(())
}

#[test]
fn test_negative_id_rejected() {
    let store = Datastore::new();
    let err = store
        .add_fixed_length_resource(-1, ResourceType::Bool, 1)
        .unwrap_err();
    assert_eq!(err, DatastoreError::InvalidId(-1));
    assert_eq!(err.status(), Status::InvalidId);
    assert_eq!(store.max_resource_id(), None);
}

#[test]
fn test_zero_instances_rejected() {
    let store = Datastore::new();
    let err = store
        .add_fixed_length_resource(0, ResourceType::Int8, 0)
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidInstance);
    assert_eq!(store.resource_count(), 0);
}

#[test]
fn test_duplicate_hands_resource_back() -> Result<()> {
    let store = Datastore::new();
    store.add_fixed_length_resource(1, ResourceType::Uint8, 2)?;
    store.set_uint8(1, 1, 7)?;

    let replacement = Resource::from_vec(ResourceType::Uint8, 4, 1, vec![1, 2, 3, 4]);
    let rejected = store.try_add_resource(1, replacement).unwrap_err();
    assert_eq!(rejected.error, DatastoreError::DuplicateId(1));
    assert_eq!(rejected.error.status(), Status::InvalidId);

    let back = rejected.into_resource().expect("duplicate hands the resource back");
    assert_eq!(back.as_bytes(), &[1, 2, 3, 4]);

    // First registration untouched
    assert_eq!(store.num_instances(1)?, 2);
    assert_eq!(store.get_uint8(1, 1)?, 7);
    Ok(())
}

#[test]
fn test_duplicate_through_add_resource_is_an_error() -> Result<()> {
    let store = Datastore::new();
    store.add_string_resource(0, 1, 4)?;
    let err = store.add_string_resource(0, 2, 16).unwrap_err();
    assert_eq!(err, DatastoreError::DuplicateId(0));
    assert_eq!(store.resource_size(0)?, 4);
    Ok(())
}

#[test]
fn test_short_buffer_rejected() {
    let store = Datastore::new();
    let resource = Resource::from_vec(ResourceType::Int32, 3, 4, vec![0; 8]);
    let rejected = store.try_add_resource(0, resource).unwrap_err();
    assert_eq!(rejected.error.status(), Status::TooLarge);
    assert!(rejected.resource.is_some());
}

#[test]
fn test_wrong_scalar_width_rejected() {
    let store = Datastore::new();
    let resource = Resource::from_vec(ResourceType::Double, 1, 4, vec![0; 4]);
    let err = store.add_resource(0, resource).unwrap_err();
    assert_eq!(err.status(), Status::InvalidType);
}

#[test]
fn test_empty_buffer_is_null_pointer() {
    let store = Datastore::new();
    let resource = Resource::from_vec(ResourceType::Uint8, 1, 1, Vec::new());
    let err = store.add_resource(0, resource).unwrap_err();
    assert_eq!(err.status(), Status::NullPointer);
}

#[test]
fn test_holes_are_invalid_ids() -> Result<()> {
    let store = Datastore::new();
    store.add_fixed_length_resource(0, ResourceType::Bool, 1)?;
    store.add_fixed_length_resource(10, ResourceType::Bool, 1)?;

    for hole in 1..10 {
        assert_eq!(store.get_bool(hole, 0), Err(DatastoreError::InvalidId(hole)));
        assert_eq!(store.get_name(hole), Err(DatastoreError::InvalidId(hole)));
        assert!(store.add_set_callback(hole, |_, _, _| {}).is_err());
    }
    // A hole can still be filled later
    store.add_fixed_length_resource(4, ResourceType::Int32, 2)?;
    assert_eq!(store.resource_count(), 3);
    assert_eq!(store.max_resource_id(), Some(10));
    Ok(())
}

#[test]
fn test_growth_preserves_existing_rows() -> Result<()> {
    let store = Datastore::new();
    for id in 0..32 {
        store.add_fixed_length_resource(id, ResourceType::Int32, 1)?;
        store.set_int32(id, 0, id * 100)?;
        store.set_name(id, Some(format!("r{}", id).as_str()))?;
    }
    store.add_fixed_length_resource(4096, ResourceType::Bool, 1)?;

    for id in 0..32 {
        assert_eq!(store.get_int32(id, 0)?, id * 100);
        assert_eq!(store.get_name(id)?, Some(format!("r{}", id)));
    }
    Ok(())
}

#[test]
fn test_borrowed_buffer_writes_through() -> Result<()> {
    let mut backing = [0u8; 8];
    {
        let store = Datastore::new();
        store.add_resource(
            3,
            Resource::borrowed(ResourceType::Uint32, 2, 4, &mut backing),
        )?;
        store.set_uint32(3, 1, 0xdead_beef)?;
        assert_eq!(store.ram_usage().buffer_bytes, 8);
        store.free();
    }
    assert_eq!(&backing[4..], &0xdead_beefu32.to_le_bytes());
    Ok(())
}

#[test]
fn test_max_resources_limit() -> Result<()> {
    let store = datastore_rs::DatastoreBuilder::new()
        .max_resources(16)
        .build()
        .unwrap();
    store.add_fixed_length_resource(15, ResourceType::Uint8, 1)?;

    let rejected = store
        .try_add_resource(16, Resource::new(ResourceType::Uint8, 1)?)
        .unwrap_err();
    assert_eq!(rejected.error.status(), Status::OutOfMemory);
    assert!(rejected.resource.is_none());
    assert_eq!(store.max_resource_id(), Some(15));
    Ok(())
}

#[test]
fn test_zero_width_string_rejected() {
    let mut backing = [7u8; 4];
    let store = Datastore::new();

    let err = store.add_string_resource(0, 1, 0).unwrap_err();
    assert_eq!(err, DatastoreError::InvalidWidth(0));
    assert_eq!(err.status(), Status::TooLarge);

    let resource = Resource::from_vec(ResourceType::String, 1, 0, vec![7; 4]);
    let rejected = store.try_add_resource(0, resource).unwrap_err();
    assert_eq!(rejected.error, DatastoreError::InvalidWidth(0));
    assert!(rejected.resource.is_some());

    let resource = Resource::borrowed(ResourceType::String, 1, 0, &mut backing);
    let err = store.add_resource(0, resource).unwrap_err();
    assert_eq!(err, DatastoreError::InvalidWidth(0));

    assert_eq!(store.resource_count(), 0);
    let mut out = [0u8; 8];
    assert!(matches!(
        store.get_string_into(0, 0, &mut out),
        Err(DatastoreError::InvalidId(0))
    ));
}
