//! Model-level coding tests.
//!
//! Drive the [`Predictor`] directly against an [`ArithmeticEncoder`] /
//! [`ArithmeticDecoder`] pair, without the stream driver on top.

use proptest::prelude::*;

use super::*;
use crate::coder::{ArithmeticDecoder, ArithmeticEncoder};
use crate::config::EscapeMethod;

const METHODS: [EscapeMethod; 4] = [
    EscapeMethod::A,
    EscapeMethod::B,
    EscapeMethod::C,
    EscapeMethod::D,
];

/// Every escape method with every exclusion combination.
fn all_configs(alphabet: i64, order: i64) -> Vec<ModelConfig> {
    let mut configs = Vec::new();
    for method in METHODS {
        for full in [true, false] {
            for update in [true, false] {
                configs.push(
                    ModelConfig::try_new(alphabet, order, "A")
                        .unwrap()
                        .with_escape_method(method)
                        .with_full_exclusions(full)
                        .with_update_exclusions(update),
                );
            }
        }
    }
    configs
}

fn encode_all(model: &mut Model, symbols: &[u32]) -> Vec<u8> {
    let mut predictor = Predictor::new();
    let mut context = Context::new();
    let mut encoder = ArithmeticEncoder::new(Vec::new());
    for &symbol in symbols {
        predictor
            .encode(model, &context, Token::Symbol(symbol), &mut encoder)
            .unwrap();
        model.tree().escalate(&mut context, symbol);
    }
    predictor
        .encode(model, &context, Token::EndOfStream, &mut encoder)
        .unwrap();
    encoder.finish().unwrap()
}

fn decode_all(model: &mut Model, data: &[u8]) -> crate::error::Result<Vec<u32>> {
    decode_at_most(model, data, usize::MAX)
}

/// Decode until the sentinel or until `limit` symbols came out. Garbage can
/// decode as a very long run of near-certain symbols before running dry.
fn decode_at_most(model: &mut Model, data: &[u8], limit: usize) -> crate::error::Result<Vec<u32>> {
    let mut predictor = Predictor::new();
    let mut context = Context::new();
    let mut decoder = ArithmeticDecoder::new(data)?;
    let mut out = Vec::new();
    while out.len() < limit {
        let Token::Symbol(symbol) = predictor.decode(model, &context, &mut decoder)? else {
            break;
        };
        out.push(symbol);
        model.tree().escalate(&mut context, symbol);
    }
    Ok(out)
}

fn text(s: &str) -> Vec<u32> {
    s.bytes().map(u32::from).collect()
}

#[test]
fn test_round_trip_every_config() {
    let input = text("she sells sea shells by the sea shore; the shells she sells are sea shells");
    for config in all_configs(256, 3) {
        let packed = encode_all(&mut Model::new(config), &input);
        let mut decoder_model = Model::new(config);
        assert_eq!(
            decode_all(&mut decoder_model, &packed).unwrap(),
            input,
            "config {config:?}"
        );
        decoder_model.tree().check_invariants().unwrap();
    }
}

#[test]
fn test_encoder_and_decoder_models_agree() {
    let input = text("abracadabra abracadabra");
    let config = ModelConfig::try_new(256, 2, "C").unwrap();
    let mut encoder_model = Model::new(config);
    let packed = encode_all(&mut encoder_model, &input);
    let mut decoder_model = Model::new(config);
    decode_all(&mut decoder_model, &packed).unwrap();

    assert_eq!(encoder_model.to_string(), decoder_model.to_string());
}

#[test]
fn test_order_zero_model() {
    let config = ModelConfig::try_new(3, 0, "B").unwrap();
    let input = [0, 1, 2, 2, 2, 1, 0, 2, 2];
    let mut model = Model::new(config);
    let packed = encode_all(&mut model, &input);

    // only the root exists without context orders
    assert_eq!(model.tree().len(), 1);
    assert_eq!(decode_all(&mut Model::new(config), &packed).unwrap(), input);
}

#[test]
fn test_single_symbol_alphabet() {
    let config = ModelConfig::try_new(1, 3, "D").unwrap();
    let input = [0; 50];
    let packed = encode_all(&mut Model::new(config), &input);
    assert_eq!(decode_all(&mut Model::new(config), &packed).unwrap(), input);
}

#[test]
fn test_large_alphabet_sparse_symbols() {
    let config = ModelConfig::try_new(1 << 20, 2, "D").unwrap();
    let input = [999_999, 0, 123_456, 999_999, 0, 123_456, (1 << 20) - 1];
    let packed = encode_all(&mut Model::new(config), &input);
    assert_eq!(decode_all(&mut Model::new(config), &packed).unwrap(), input);
}

#[test]
fn test_out_of_range_symbol_rejected() {
    let config = ModelConfig::try_new(10, 2, "A").unwrap();
    let mut model = Model::new(config);
    let mut encoder = ArithmeticEncoder::new(Vec::new());
    let err = Predictor::new()
        .encode(&mut model, &Context::new(), Token::Symbol(10), &mut encoder)
        .unwrap_err();
    assert!(matches!(
        err,
        crate::error::PpmError::SymbolOutOfRange {
            symbol: 10,
            alphabet_size: 10
        }
    ));
    // nothing was learned
    assert!(model.tree().node(NodeId::ROOT).stats().is_empty());
}

#[test]
fn test_sentinel_leaves_model_untouched() {
    let config = ModelConfig::default();
    let mut model = Model::new(config);
    encode_all(&mut model, &[]);
    assert_eq!(model.tree().len(), 1);
    assert_eq!(model.tree().node(NodeId::ROOT).total(), 0);
}

#[test]
fn test_rescale_while_coding() {
    // order 0: every symbol lands on the root, which must rescale
    let config = ModelConfig::try_new(2, 0, "D").unwrap();
    let input: Vec<u32> = (0..40_000).map(|i| u32::from(i % 7 == 0)).collect();

    let mut model = Model::new(config);
    let packed = encode_all(&mut model, &input);
    let root = model.tree().node(NodeId::ROOT);
    assert!(root.total() <= RESCALE_THRESHOLD);
    assert!(root.count_of(0) > root.count_of(1));
    assert!(root.count_of(1) > 0);
    model.tree().check_invariants().unwrap();

    assert_eq!(decode_all(&mut Model::new(config), &packed).unwrap(), input);
}

#[test]
fn test_model_reused_across_streams() {
    let config = ModelConfig::default();
    let first = text("to be or not to be");
    let second = text("that is the question, to be or not to be");

    let mut encoder_model = Model::new(config);
    let packed_first = encode_all(&mut encoder_model, &first);
    let packed_second = encode_all(&mut encoder_model, &second);

    // the second stream benefits from what the first taught
    let fresh = encode_all(&mut Model::new(config), &second);
    assert!(packed_second.len() < fresh.len());

    let mut decoder_model = Model::new(config);
    assert_eq!(decode_all(&mut decoder_model, &packed_first).unwrap(), first);
    assert_eq!(decode_all(&mut decoder_model, &packed_second).unwrap(), second);
}

#[test]
fn test_reloaded_model_codes_identically() {
    let config = ModelConfig::try_new(256, 4, "C")
        .unwrap()
        .with_update_exclusions(false);
    let mut model = Model::new(config).with_title("warm");
    encode_all(&mut model, &text("the quick brown fox jumps over the lazy dog"));

    let mut reloaded = Model::from_bytes(&model.to_bytes()).unwrap();
    assert_eq!(reloaded.title(), "warm");

    let next = text("the lazy dog sleeps; the quick fox jumps");
    let packed = encode_all(&mut model, &next);
    assert_eq!(encode_all(&mut reloaded, &next), packed);
    assert_eq!(model.to_bytes(), reloaded.to_bytes());
}

#[test]
fn test_reload_node_wider_than_rescale_threshold() {
    // more distinct symbols at the root than halving can ever bring under
    // the threshold
    let config = ModelConfig::try_new(1 << 17, 0, "A").unwrap();
    let mut model = Model::new(config);
    for symbol in 0..70_000 {
        model.tree.push_entry(NodeId::ROOT, symbol, 1);
    }
    model.tree.increment(NodeId::ROOT, 9, 1);
    assert!(model.tree().node(NodeId::ROOT).total() > RESCALE_THRESHOLD);

    let saved = model.to_bytes();
    let mut reloaded = Model::from_bytes(&saved).unwrap();
    reloaded.tree().check_invariants().unwrap();
    assert_eq!(reloaded.tree().node(NodeId::ROOT).total(), 70_001);
    assert_eq!(reloaded.tree().node(NodeId::ROOT).count_of(9), 2);

    let next = [9, 69_999, 100_000, 9];
    let packed = encode_all(&mut model, &next);
    assert_eq!(encode_all(&mut reloaded, &next), packed);
    assert_eq!(model.to_bytes(), reloaded.to_bytes());

    let mut decoder_model = Model::from_bytes(&saved).unwrap();
    assert_eq!(decode_all(&mut decoder_model, &packed).unwrap(), next);
}

#[test]
fn test_wrong_model_does_not_decode() {
    let input = text("mississippi mississippi mississippi");
    let packed = encode_all(&mut Model::new(ModelConfig::default()), &input);

    let other = ModelConfig::default().with_escape_method(EscapeMethod::A);
    let decoded = decode_at_most(&mut Model::new(other), &packed, 4096);
    assert!(decoded.map_or(true, |symbols| symbols != input));
}

#[test]
fn test_reset_forgets_statistics() {
    let mut model = Model::new(ModelConfig::default()).with_title("kept");
    encode_all(&mut model, &text("hello"));
    assert!(model.tree().len() > 1);

    model.reset();
    assert_eq!(model.tree().len(), 1);
    assert_eq!(model.title(), "kept");
}

#[test]
fn test_dump_header() {
    let model = Model::new(ModelConfig::try_new(4, 1, "b").unwrap());
    let dump = model.to_string();
    assert!(dump.starts_with(
        "model \"Sample PPMD model\": alphabet 4 order 1 escape B full exclusions true update exclusions true nodes 1\n"
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_round_trip(
        symbols in proptest::collection::vec(0u32..12, 0..300),
        method in 0usize..4,
        order in 0i64..5,
        full in any::<bool>(),
        update in any::<bool>(),
    ) {
        let config = ModelConfig::try_new(12, order, "A")
            .unwrap()
            .with_escape_method(METHODS[method])
            .with_full_exclusions(full)
            .with_update_exclusions(update);
        let packed = encode_all(&mut Model::new(config), &symbols);
        prop_assert_eq!(decode_all(&mut Model::new(config), &packed).unwrap(), symbols);
    }

    #[test]
    fn proptest_count_invariant(
        symbols in proptest::collection::vec(0u32..6, 0..400),
        method in 0usize..4,
        update in any::<bool>(),
    ) {
        let config = ModelConfig::try_new(6, 3, "A")
            .unwrap()
            .with_escape_method(METHODS[method])
            .with_update_exclusions(update);
        let mut model = Model::new(config);
        encode_all(&mut model, &symbols);

        prop_assert!(model.tree().check_invariants().is_ok());
        for (_, node) in model.tree().nodes() {
            let sum: u32 = node.stats().iter().map(|entry| entry.count).sum();
            prop_assert_eq!(node.total(), sum);
            prop_assert!(node.total() <= RESCALE_THRESHOLD);
            prop_assert!(node.order() <= 3);
        }
    }

    #[test]
    fn proptest_garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let config = ModelConfig::try_new(16, 2, "D").unwrap();
        let mut model = Model::new(config);
        if let Ok(symbols) = decode_at_most(&mut model, &data, 4096) {
            prop_assert!(symbols.iter().all(|&s| s < 16));
        }
    }
}
