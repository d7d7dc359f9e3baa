#![no_main]
use libfuzzer_sys::fuzz_target;
use ppm_stream::{compress_slice, decompress_to_vec, Model, ModelConfig};

// Compress arbitrary bytes and make sure they come back unchanged.
fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }
    let symbols: Vec<u32> = data.iter().map(|&b| u32::from(b)).collect();
    let config = ModelConfig::default();

    let packed = compress_slice(&mut Model::new(config), &symbols).expect("compress");
    let unpacked = decompress_to_vec(&mut Model::new(config), &packed).expect("decompress");
    assert_eq!(unpacked, symbols);
});
