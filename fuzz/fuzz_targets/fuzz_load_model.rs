#![no_main]
use libfuzzer_sys::fuzz_target;
use ppm_stream::{compress_slice, Model};

// Fuzz model loading. Anything that loads must be internally consistent
// and usable for coding.
fuzz_target!(|data: &[u8]| {
    let Ok(mut model) = Model::from_bytes(data) else {
        return;
    };
    assert!(model.tree().check_invariants().is_ok());

    // whatever loaded survives a save/load cycle unchanged
    let saved = model.to_bytes();
    let reloaded = Model::from_bytes(&saved).expect("reload");
    assert_eq!(reloaded.to_bytes(), saved);

    let alphabet = model.config().alphabet_size();
    let symbols: Vec<u32> = (0..64).map(|i| i % alphabet).collect();
    let _ = compress_slice(&mut model, &symbols);
});
