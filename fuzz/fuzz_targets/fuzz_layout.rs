#![no_main]
use datastore_rs::{Datastore, Layout};
use libfuzzer_sys::fuzz_target;

// Arbitrary layout text must either be rejected or apply cleanly
fuzz_target!(|input: &[u8]| {
    let Ok(text) = std::str::from_utf8(input) else {
        return;
    };

    for layout in [Layout::from_toml_str(text), Layout::from_json_str(text)]
        .into_iter()
        .flatten()
    {
        // Keep the index small enough to allocate
        if layout.resources.iter().any(|r| r.id > 4096 || r.instances > 4096) {
            continue;
        }
        if layout.resources.iter().any(|r| r.width.is_some_and(|w| w > 4096)) {
            continue;
        }
        let store = Datastore::new();
        let _ = layout.apply(&store);
        let _ = store.dump_entries();
    }
});
