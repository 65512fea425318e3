use std::cell::RefCell;
use wasm_bindgen::prelude::*;

pub mod build;
pub mod encode;
pub mod error;
pub mod eval;
pub mod parse;
pub mod prep;
pub mod rank;
pub mod types;

pub use build::Vocabulary;
pub use encode::PhraseEncoder;
pub use error::{Error, Result};
pub use rank::DocFrequencyTable;
pub use types::PipelineConfig;

/// Encoding state loaded once per session
struct FeatureEngine {
    vocab: Vocabulary,
    flat: PhraseEncoder,
    grid: PhraseEncoder,
}

impl FeatureEngine {
    /// Create an engine from vocabulary file text and a config
    fn from_vocab(vocab_text: &str, config: &PipelineConfig) -> Self {
        FeatureEngine {
            vocab: Vocabulary::from_lines(vocab_text),
            flat: PhraseEncoder::flat(config),
            grid: PhraseEncoder::grid(config),
        }
    }

    fn encode(&self, encoder: PhraseEncoder, phrase: &str) -> String {
        encode::join_ids(&encoder.encode(phrase, &self.vocab))
    }
}

// Use thread_local with RefCell for lazy initialization from JS
thread_local! {
    static ENGINE: RefCell<Option<FeatureEngine>> = const { RefCell::new(None) };
}

#[cfg(target_arch = "wasm32")]
fn perf_log(msg: &str) {
    web_sys::console::log_1(&msg.into());
}

#[cfg(not(target_arch = "wasm32"))]
fn perf_log(msg: &str) {
    tracing::debug!("{}", msg);
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

fn with_engine<T>(f: impl FnOnce(&FeatureEngine) -> T) -> std::result::Result<T, JsError> {
    ENGINE.with(|engine| match engine.borrow().as_ref() {
        Some(eng) => Ok(f(eng)),
        None => Err(JsError::new(
            "Vocabulary not initialized. Call init_vocab(vocab_text, config_json) first.",
        )),
    })
}

/// Initialize the encoders from JavaScript
/// vocab_text: vocabulary file contents, one n-gram per line (line N -> id N)
/// config_json: JSON PipelineConfig, or "" for defaults
#[wasm_bindgen]
pub fn init_vocab(vocab_text: &str, config_json: &str) -> std::result::Result<(), JsError> {
    let start = now_ms();
    let config = PipelineConfig::from_json(config_json)
        .map_err(|e| JsError::new(&format!("Failed to parse config: {}", e)))?;

    let engine = FeatureEngine::from_vocab(vocab_text, &config);
    let size = engine.vocab.len();
    ENGINE.with(|slot| {
        *slot.borrow_mut() = Some(engine);
    });

    perf_log(&format!(
        "[perf] vocab={} | load={:.1}ms",
        size,
        now_ms() - start
    ));
    Ok(())
}

/// Check if the vocabulary has been loaded
#[wasm_bindgen]
pub fn is_vocab_ready() -> bool {
    ENGINE.with(|engine| engine.borrow().is_some())
}

/// Flat-encode a phrase into tab-joined ids
#[wasm_bindgen]
pub fn encode_flat(phrase: &str) -> std::result::Result<String, JsError> {
    with_engine(|eng| eng.encode(eng.flat, phrase))
}

/// Grid-encode a phrase into tab-joined ids (row-major)
#[wasm_bindgen]
pub fn encode_grid(phrase: &str) -> std::result::Result<String, JsError> {
    with_engine(|eng| eng.encode(eng.grid, phrase))
}

/// Mean NDCG@k over contiguous groups.
/// Each argument is whitespace/newline separated text.
#[wasm_bindgen]
pub fn evaluate_ndcg(
    marks: &str,
    predictions: &str,
    groups: &str,
    k: usize,
) -> std::result::Result<f64, JsError> {
    let start = now_ms();
    let result = ndcg_from_text(marks, predictions, groups, k)
        .map_err(|e| JsError::new(&format!("NDCG evaluation failed: {}", e)))?;
    perf_log(&format!(
        "[perf] ndcg@{}={:.5} | eval={:.1}ms",
        k,
        result,
        now_ms() - start
    ));
    Ok(result)
}

/// Score a (query, title) pair against a serialized document-frequency model
#[wasm_bindgen]
pub fn idf_score(model_text: &str, query: &str, title: &str) -> std::result::Result<f64, JsError> {
    let table = DocFrequencyTable::from_model_text(model_text)
        .map_err(|e| JsError::new(&format!("Failed to load model: {}", e)))?;
    Ok(table.predict(query, title))
}

/// Parse the three evaluator inputs and compute mean NDCG@k
pub fn ndcg_from_text(marks: &str, predictions: &str, groups: &str, k: usize) -> Result<f64> {
    let marks = parse::parse_numbers(marks)?;
    let predictions = parse::parse_numbers(predictions)?;
    let groups = parse::parse_tokens(groups);
    eval::evaluate(&marks, &predictions, &groups, k)
}
