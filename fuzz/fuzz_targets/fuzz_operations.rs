#![no_main]
use datastore_rs::{Datastore, Resource, ResourceType};
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};

#[derive(Debug, Arbitrary)]
enum Op {
    AddScalar { id: i16, type_code: u8, instances: u8 },
    AddString { id: i16, instances: u8, width: u8 },
    AddFromVec { id: i16, type_code: u8, instances: u8, size: u8, len: u8 },
    AddBorrowed { id: i16, type_code: u8, instances: u8, size: u8, len: u8 },
    SetU32 { id: i16, instance: i16, value: u32 },
    SetString { id: i16, instance: i16, text: String },
    GetString { id: i16, instance: i16, capacity: u8 },
    Increment { id: i16, instance: i16 },
    Add { id: i16, instance: i16, addend: i64 },
    SetFromString { id: i16, instance: i16, text: String },
    Render { id: i16, instance: i16, capacity: u8 },
    Subscribe { id: i16 },
    Name { id: i16, name: Option<String> },
    Age { id: i16, instance: i16 },
    Dump,
    Free,
}

// Random operation sequences must never panic
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let ops: Vec<Op> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    // Caller-owned memory for borrowed resources, carved off one chunk at a time
    let mut arena = [0u8; 4096];
    let mut chunks = arena.chunks_mut(256);

    let store = Datastore::new();
    for op in ops.iter().take(256) {
        match op {
            Op::AddScalar { id, type_code, instances } => {
                if let Ok(ty) = ResourceType::try_from(i32::from(*type_code % 9)) {
                    let _ = store.add_fixed_length_resource(i32::from(*id), ty, u32::from(*instances));
                }
            }
            Op::AddString { id, instances, width } => {
                let _ = store.add_string_resource(i32::from(*id), u32::from(*instances), usize::from(*width));
            }
            Op::AddFromVec { id, type_code, instances, size, len } => {
                if let Ok(ty) = ResourceType::try_from(i32::from(*type_code % 9)) {
                    let data = vec![0xa5; usize::from(*len)];
                    let resource = Resource::from_vec(ty, u32::from(*instances), usize::from(*size), data);
                    let _ = store.add_resource(i32::from(*id), resource);
                }
            }
            Op::AddBorrowed { id, type_code, instances, size, len } => {
                let Ok(ty) = ResourceType::try_from(i32::from(*type_code % 9)) else {
                    continue;
                };
                if let Some(chunk) = chunks.next() {
                    let len = usize::from(*len).min(chunk.len());
                    let (data, _) = chunk.split_at_mut(len);
                    data.fill(0x5a);
                    let resource = Resource::borrowed(ty, u32::from(*instances), usize::from(*size), data);
                    let _ = store.add_resource(i32::from(*id), resource);
                }
            }
            Op::SetU32 { id, instance, value } => {
                let _ = store.set_uint32(i32::from(*id), i32::from(*instance), *value);
            }
            Op::SetString { id, instance, text } => {
                let _ = store.set_string(i32::from(*id), i32::from(*instance), text);
            }
            Op::GetString { id, instance, capacity } => {
                let mut out = vec![0u8; usize::from(*capacity)];
                let _ = store.get_string_into(i32::from(*id), i32::from(*instance), &mut out);
            }
            Op::Increment { id, instance } => {
                let _ = store.increment(i32::from(*id), i32::from(*instance));
            }
            Op::Add { id, instance, addend } => {
                let _ = store.add(i32::from(*id), i32::from(*instance), *addend);
            }
            Op::SetFromString { id, instance, text } => {
                let _ = store.set_from_string(i32::from(*id), i32::from(*instance), text);
            }
            Op::Render { id, instance, capacity } => {
                let mut out = vec![0u8; usize::from(*capacity)];
                let _ = store.get_as_string_into(i32::from(*id), i32::from(*instance), &mut out);
            }
            Op::Subscribe { id } => {
                let _ = store.add_set_callback(i32::from(*id), |store, id, instance| {
                    let _ = store.get_as_string(id, instance);
                });
            }
            Op::Name { id, name } => {
                let _ = store.set_name(i32::from(*id), name.as_deref());
            }
            Op::Age { id, instance } => {
                let _ = store.get_age(i32::from(*id), i32::from(*instance));
            }
            Op::Dump => {
                let _ = store.dump_entries();
            }
            Op::Free => store.free(),
        }
    }
});
