//! Fixed-shape phrase encoding.
//!
//! Both encoders turn a phrase into vocabulary ids of its `#word#` trigrams.
//! They differ only in how the id budget is shared between words:
//!
//! - [`encode_flat`]: one sequence of `capacity` slots filled word after word,
//!   cut off as soon as it is full, even in the middle of a word.
//! - [`encode_grid`]: one row per word (at most `max_words`), each row holding
//!   at most `max_ngrams_per_word` ids. Rows never borrow slots from each other.
//!
//! Training-time and inference-time features must be produced by the same
//! encoder with the same shape, or ids silently shift position.

use crate::build::Vocabulary;
use crate::error::Result;
use crate::parse::{parse_example, tokenize, word_to_ngrams};
use crate::types::{NgramId, PipelineConfig, UNKNOWN_ID};

#[cfg(feature = "native")]
use rayon::prelude::*;

/// Encode a phrase into exactly `capacity` ids, zero padded
pub fn encode_flat(phrase: &str, vocab: &Vocabulary, capacity: usize) -> Vec<NgramId> {
    let mut ids = vec![UNKNOWN_ID; capacity];
    let ngrams = tokenize(phrase).flat_map(word_to_ngrams);
    for (slot, ngram) in ids.iter_mut().zip(ngrams) {
        *slot = vocab.lookup(&ngram);
    }
    ids
}

/// Encode a phrase into a `max_words x max_ngrams_per_word` grid, flattened row-major
pub fn encode_grid(
    phrase: &str,
    vocab: &Vocabulary,
    max_words: usize,
    max_ngrams_per_word: usize,
) -> Vec<NgramId> {
    let mut ids = vec![UNKNOWN_ID; max_words * max_ngrams_per_word];
    if max_ngrams_per_word == 0 {
        return ids;
    }
    for (row, word) in ids
        .chunks_mut(max_ngrams_per_word)
        .zip(tokenize(phrase))
    {
        for (slot, ngram) in row.iter_mut().zip(word_to_ngrams(word)) {
            *slot = vocab.lookup(&ngram);
        }
    }
    ids
}

/// Encoder variant and its output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseEncoder {
    Flat {
        capacity: usize,
    },
    Grid {
        max_words: usize,
        max_ngrams_per_word: usize,
    },
}

impl PhraseEncoder {
    pub fn flat(config: &PipelineConfig) -> Self {
        PhraseEncoder::Flat {
            capacity: config.flat_capacity,
        }
    }

    pub fn grid(config: &PipelineConfig) -> Self {
        PhraseEncoder::Grid {
            max_words: config.grid_max_words,
            max_ngrams_per_word: config.grid_max_ngrams_per_word,
        }
    }

    /// Number of ids produced per phrase
    pub fn width(&self) -> usize {
        match *self {
            PhraseEncoder::Flat { capacity } => capacity,
            PhraseEncoder::Grid {
                max_words,
                max_ngrams_per_word,
            } => max_words * max_ngrams_per_word,
        }
    }

    pub fn encode(&self, phrase: &str, vocab: &Vocabulary) -> Vec<NgramId> {
        match *self {
            PhraseEncoder::Flat { capacity } => encode_flat(phrase, vocab, capacity),
            PhraseEncoder::Grid {
                max_words,
                max_ngrams_per_word,
            } => encode_grid(phrase, vocab, max_words, max_ngrams_per_word),
        }
    }

    /// Encode one `mark<TAB>query<TAB>document` line into query ids then
    /// document ids, tab-joined
    pub fn encode_line(&self, line: &str, line_no: usize, vocab: &Vocabulary) -> Result<String> {
        let example = parse_example(line, line_no)?;
        let mut ids = self.encode(&example.query, vocab);
        ids.extend(self.encode(&example.document, vocab));
        Ok(join_ids(&ids))
    }

    /// Encode many lines, preserving input order. Fails if any row is malformed.
    pub fn encode_lines(&self, lines: &[&str], vocab: &Vocabulary) -> Result<Vec<String>> {
        #[cfg(feature = "native")]
        let iter = lines.par_iter().enumerate();
        #[cfg(not(feature = "native"))]
        let iter = lines.iter().enumerate();

        iter.map(|(i, line)| self.encode_line(line, i + 1, vocab))
            .collect()
    }
}

/// Tab-join ids for transport
pub fn join_ids(ids: &[NgramId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}
