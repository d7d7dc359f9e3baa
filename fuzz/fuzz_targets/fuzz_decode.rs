#![no_main]
use libfuzzer_sys::fuzz_target;
use ppm_stream::{decode, Model, ModelConfig, NoProgress, PpmError, StreamOptions, SymbolSink};

/// Stops garbage that decodes as an endless run of near-certain symbols.
struct Capped(usize);

impl SymbolSink for Capped {
    fn put_symbol(&mut self, _symbol: u32) -> ppm_stream::Result<()> {
        if self.0 == 0 {
            return Err(PpmError::CorruptStream("output cap reached".to_string()));
        }
        self.0 -= 1;
        Ok(())
    }
}

// Fuzz the decoder with arbitrary compressed input. The first byte picks
// the model configuration so every escape method gets exercised.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, packed)) = data.split_first() else {
        return;
    };
    let method = ["A", "B", "C", "D"][usize::from(selector & 3)];
    let order = i64::from((selector >> 2) & 7);
    let Ok(config) = ModelConfig::try_new(256, order, method) else {
        return;
    };
    let config = config
        .with_full_exclusions(selector & 0x40 == 0)
        .with_update_exclusions(selector & 0x80 == 0);

    let mut model = Model::new(config);
    let _ = decode(
        &mut model,
        packed,
        Capped(1 << 16),
        &StreamOptions::default(),
        &mut NoProgress,
    );
    assert!(model.tree().check_invariants().is_ok());
});
