use serde::Deserialize;
use std::collections::HashMap;

/// Vocabulary id of an n-gram. 0 is reserved for "unknown".
pub type NgramId = u32;

/// Id returned for any n-gram absent from the vocabulary
pub const UNKNOWN_ID: NgramId = 0;

/// N-gram counts: ngram -> occurrences across the corpus
pub type NgramCountMap = HashMap<String, u64>;

/// Document frequencies: term -> number of documents containing it
pub type DocFrequencies = HashMap<String, u64>;

/// Training/encoding record: `mark<TAB>query<TAB>document`
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub mark: String,
    pub query: String,
    pub document: String,
}

/// Predict-time record: `query<TAB>title`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTitle {
    pub query: String,
    pub title: String,
}

/// Pipeline parameters, loadable from JSON. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trigrams must occur strictly more often than this to be kept
    pub trigram_threshold: u64,
    /// Slots in a flat-encoded phrase
    pub flat_capacity: usize,
    /// Rows in a grid-encoded phrase
    pub grid_max_words: usize,
    /// Columns in a grid-encoded phrase
    pub grid_max_ngrams_per_word: usize,
    /// Rank cutoff for NDCG
    pub ndcg_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            trigram_threshold: 10,
            flat_capacity: 100,
            grid_max_words: 30,
            grid_max_ngrams_per_word: 20,
            ndcg_k: 5,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON config. An empty or all-whitespace string yields the defaults.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}
