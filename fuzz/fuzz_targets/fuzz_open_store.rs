#![no_main]

use itemidx::index::ItemIndexStore;
use itemidx::utils::SharedBytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Opening a store validates its header and offset table
    let Ok(store) = ItemIndexStore::from_bytes(SharedBytes::copy_from_slice(data)) else {
        return;
    };
    for id in 0..store.size().min(64) {
        if let Ok(index) = store.get(id) {
            let _ = index.iter().take(1024).count();
        }
    }
    assert!(store.get(store.size()).is_err());
});
