#![no_main]

use itemidx::index::ItemIndex;
use itemidx::utils::SharedBytes;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must fail with an error, never panic
    let Ok(index) = ItemIndex::from_bytes(SharedBytes::copy_from_slice(data)) else {
        return;
    };
    let size = index.size();
    let mut prev = None;
    for (pos, value) in index.iter().take(4096).enumerate() {
        assert!(prev < Some(value), "decoded values must strictly ascend");
        assert_eq!(index.at(pos as u32).ok(), Some(value));
        assert_eq!(index.find(value), Some(pos as u32));
        prev = Some(value);
    }
    assert!(index.at(size).is_err());
    let _ = index.serialized_size();
    let _ = index.bpn();
});
