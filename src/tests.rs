//! End-to-end stream tests.
//!
//! Symbols go through a source, the driver, the model and the coder, and
//! come back out through a sink.

use proptest::prelude::*;

use crate::*;

fn bytes_to_symbols(data: &[u8]) -> Vec<u32> {
    data.iter().map(|&b| u32::from(b)).collect()
}

fn encode_bytes(config: ModelConfig, data: &[u8]) -> (Vec<u8>, StreamStats) {
    let mut packed = Vec::new();
    let stats = encode(
        &mut Model::new(config),
        ByteSource::new(data),
        &mut packed,
        &StreamOptions::default(),
        &mut NoProgress,
    )
    .unwrap();
    (packed, stats)
}

fn decode_bytes(config: ModelConfig, packed: &[u8]) -> Result<Vec<u8>> {
    let mut sink = ByteSink::new(Vec::new());
    decode(
        &mut Model::new(config),
        packed,
        &mut sink,
        &StreamOptions::default(),
        &mut NoProgress,
    )?;
    Ok(sink.into_inner())
}

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. \
Duis aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat \
nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in culpa qui \
officia deserunt mollit anim id est laborum.";

#[test]
fn test_text_round_trip() {
    let data = LOREM.repeat(4);
    let config = ModelConfig::default();
    let (packed, stats) = encode_bytes(config, data.as_bytes());

    assert_eq!(stats.symbols, data.len() as u64);
    assert_eq!(stats.compressed_bytes, packed.len() as u64);
    // repeated text compresses well past what an order-0 coder could do
    assert!(stats.bpc() < 3.0, "bpc {}", stats.bpc());

    assert_eq!(decode_bytes(config, &packed).unwrap(), data.as_bytes());
}

#[test]
fn test_binary_round_trip() {
    let data: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).cycle().take(3000).collect();
    for method in ["A", "B", "C", "D"] {
        let config = ModelConfig::try_new(256, 3, method).unwrap();
        let (packed, _) = encode_bytes(config, &data);
        assert_eq!(decode_bytes(config, &packed).unwrap(), data, "method {method}");
    }
}

#[test]
fn test_adaptivity_on_binary_alphabet() {
    let config = ModelConfig::try_new(2, 5, "D").unwrap();
    let bpc_after = |repeats: usize| {
        let symbols: Vec<u32> = [0, 1].repeat(repeats);
        let mut packed = Vec::new();
        let stats = encode(
            &mut Model::new(config),
            SliceSource::new(&symbols),
            &mut packed,
            &StreamOptions::default(),
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(decompress_to_vec(&mut Model::new(config), &packed).unwrap(), symbols);
        stats.bpc()
    };

    let short = bpc_after(50);
    let long = bpc_after(1000);
    assert!(long < short);
    assert!(long < 0.1, "bpc {long}");
}

#[test]
fn test_adaptivity_on_repeated_symbol() {
    let config = ModelConfig::try_new(2, 5, "D").unwrap();
    let bpc_after = |length: usize| {
        let symbols = vec![0u32; length];
        let packed = compress_slice(&mut Model::new(config), &symbols).unwrap();
        assert_eq!(decompress_to_vec(&mut Model::new(config), &packed).unwrap(), symbols);
        8.0 * packed.len() as f64 / length as f64
    };

    let rates: Vec<f64> = [10, 100, 1000].into_iter().map(bpc_after).collect();
    assert!(rates[1] < rates[0], "{rates:?}");
    assert!(rates[2] < rates[1], "{rates:?}");
    assert!(rates[2] < 0.1, "{rates:?}");
}

#[test]
fn test_escape_method_changes_output() {
    let data = LOREM.repeat(2);
    let with = |method: &str| {
        let config = ModelConfig::try_new(256, 3, method).unwrap();
        let (packed, _) = encode_bytes(config, data.as_bytes());
        assert_eq!(decode_bytes(config, &packed).unwrap(), data.as_bytes());
        packed.len()
    };
    assert_ne!(with("A"), with("D"));
}

#[test]
fn test_exclusion_switches_round_trip() {
    let data = LOREM.as_bytes();
    for (full, update) in [(true, true), (true, false), (false, true), (false, false)] {
        let config = ModelConfig::default()
            .with_full_exclusions(full)
            .with_update_exclusions(update);
        let (packed, _) = encode_bytes(config, data);
        assert_eq!(decode_bytes(config, &packed).unwrap(), data);
    }
}

#[test]
fn test_numeric_mode_round_trip() {
    let config = ModelConfig::try_new(256, 5, "D").unwrap();
    let options = StreamOptions {
        symbol_mode: SymbolMode::Numbers,
        ..StreamOptions::default()
    };

    let mut packed = Vec::new();
    let source = options.symbol_mode.source("3\n10\n255\n".as_bytes());
    let stats = encode(&mut Model::new(config), source, &mut packed, &options, &mut NoProgress)
        .unwrap();
    assert_eq!(stats.symbols, 3);

    let mut out = Vec::new();
    decode(
        &mut Model::new(config),
        &packed[..],
        options.symbol_mode.sink(&mut out),
        &options,
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(out, b"3\n10\n255\n");
}

#[test]
fn test_numeric_symbol_outside_alphabet() {
    let config = ModelConfig::try_new(100, 2, "C").unwrap();
    let err = encode(
        &mut Model::new(config),
        NumberSource::new("5\n99\n100\n".as_bytes()),
        Vec::new(),
        &StreamOptions::default(),
        &mut NoProgress,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PpmError::SymbolOutOfRange {
            symbol: 100,
            alphabet_size: 100
        }
    ));
}

#[test]
fn test_numeric_format_error_aborts() {
    let err = encode(
        &mut Model::new(ModelConfig::default()),
        NumberSource::new("1\n2\n3x\n".as_bytes()),
        Vec::new(),
        &StreamOptions::default(),
        &mut NoProgress,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "formatting error on line 3: \"3x\" is not an unsigned integer"
    );
}

#[test]
fn test_byte_sink_rejects_wide_alphabet_output() {
    let config = ModelConfig::try_new(1000, 1, "B").unwrap();
    let packed = compress_slice(&mut Model::new(config), &[7, 700]).unwrap();
    assert!(matches!(
        decode_bytes(config, &packed),
        Err(PpmError::SymbolOutOfRange { symbol: 700, .. })
    ));
}

#[test]
fn test_empty_compressed_input() {
    // 32 invented bits prime the register; the first symbol needs more
    assert!(matches!(
        decode_bytes(ModelConfig::default(), &[]),
        Err(PpmError::CorruptStream(_))
    ));
}

#[test]
fn test_truncated_stream_is_not_silently_accepted() {
    let data = LOREM.as_bytes();
    let config = ModelConfig::default();
    let (packed, _) = encode_bytes(config, data);

    match decode_bytes(config, &packed[..packed.len() / 2]) {
        Err(PpmError::CorruptStream(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(out) => assert_ne!(out, data),
    }
}

#[test]
fn test_model_continues_across_streams() {
    let config = ModelConfig::default();
    let mut encoder_model = Model::new(config);
    let mut decoder_model = Model::new(config);

    let mut sizes = Vec::new();
    for _ in 0..3 {
        let symbols = bytes_to_symbols(LOREM.as_bytes());
        let packed = compress_slice(&mut encoder_model, &symbols).unwrap();
        assert_eq!(decompress_to_vec(&mut decoder_model, &packed).unwrap(), symbols);
        sizes.push(packed.len());
    }
    assert!(sizes[1] < sizes[0]);
    assert!(sizes[2] <= sizes[1]);
}

#[test]
fn test_saved_model_primes_decoder() {
    let config = ModelConfig::try_new(256, 3, "C").unwrap();
    let mut trained = Model::new(config).with_title("lorem");
    compress_slice(&mut trained, &bytes_to_symbols(LOREM.as_bytes())).unwrap();

    let mut saved = Vec::new();
    trained.save(&mut saved).unwrap();

    let message = bytes_to_symbols(b"dolor sit amet, ut labore et dolore");
    let packed = compress_slice(&mut trained, &message).unwrap();

    let mut loaded = Model::load(&saved[..]).unwrap();
    assert_eq!(loaded.title(), "lorem");
    assert_eq!(decompress_to_vec(&mut loaded, &packed).unwrap(), message);
}

#[test]
fn test_dump_and_progress_do_not_change_output() {
    let data = LOREM.as_bytes();
    let config = ModelConfig::default();
    let (plain, _) = encode_bytes(config, data);

    let options = StreamOptions {
        progress_interval: 64,
        dump_model: true,
        symbol_mode: SymbolMode::Bytes,
    };
    let mut packed = Vec::new();
    encode(
        &mut Model::new(config),
        ByteSource::new(data),
        &mut packed,
        &options,
        &mut LogProgress,
    )
    .unwrap();
    assert_eq!(packed, plain);
}

#[test]
fn test_invalid_config_rejected_up_front() {
    assert!(matches!(
        ModelConfig::try_new(0, 5, "D"),
        Err(PpmError::Config(ConfigError::NonPositiveAlphabet(0)))
    ));
    assert!(matches!(
        ModelConfig::try_new(256, -1, "D"),
        Err(PpmError::Config(ConfigError::NegativeOrder(-1)))
    ));
    assert!(matches!(
        ModelConfig::try_new(256, 5, "Z"),
        Err(PpmError::Config(ConfigError::UnknownEscapeMethod(_)))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn proptest_bytes_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        order in 0i64..6,
        method in prop::sample::select(vec!["A", "B", "C", "D"]),
    ) {
        let config = ModelConfig::try_new(256, order, method).unwrap();
        let (packed, stats) = encode_bytes(config, &data);
        prop_assert_eq!(stats.symbols, data.len() as u64);
        prop_assert_eq!(decode_bytes(config, &packed).unwrap(), data);
    }

    #[test]
    fn proptest_numbers_round_trip(values in proptest::collection::vec(0u32..5000, 0..128)) {
        let config = ModelConfig::try_new(5000, 2, "D").unwrap();
        let text: String = values.iter().map(|v| format!("{v}\n")).collect();

        let mut packed = Vec::new();
        encode(
            &mut Model::new(config),
            NumberSource::new(text.as_bytes()),
            &mut packed,
            &StreamOptions::default(),
            &mut NoProgress,
        )
        .unwrap();

        let mut sink = NumberSink::new(Vec::new());
        decode(
            &mut Model::new(config),
            &packed[..],
            &mut sink,
            &StreamOptions::default(),
            &mut NoProgress,
        )
        .unwrap();
        prop_assert_eq!(sink.into_inner(), text.into_bytes());
    }
}
