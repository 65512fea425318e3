use crate::parse::{tokenize, word_to_ngrams};
use crate::types::{NgramCountMap, NgramId, UNKNOWN_ID};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[cfg(feature = "native")]
use rayon::prelude::*;

/// Running trigram counts over a corpus shard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NgramCounts {
    counts: NgramCountMap,
}

impl NgramCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the trigrams of every token on a line except the first (label/id column)
    pub fn add_line(&mut self, line: &str) {
        for word in tokenize(line).skip(1) {
            for ngram in word_to_ngrams(word) {
                *self.counts.entry(ngram).or_insert(0) += 1;
            }
        }
    }

    /// Sum another shard's counts into this one
    pub fn merge(mut self, other: NgramCounts) -> NgramCounts {
        for (ngram, count) in other.counts {
            *self.counts.entry(ngram).or_insert(0) += count;
        }
        self
    }

    pub fn count(&self, ngram: &str) -> u64 {
        self.counts.get(ngram).copied().unwrap_or(0)
    }

    /// Trigrams whose count is strictly greater than `threshold`
    pub fn accepted(&self, threshold: u64) -> HashSet<String> {
        self.counts
            .iter()
            .filter(|(_, count)| **count > threshold)
            .map(|(ngram, _)| ngram.clone())
            .collect()
    }
}

/// Count trigrams over all lines
pub fn count_ngrams(lines: &[&str]) -> NgramCounts {
    #[cfg(feature = "native")]
    {
        lines
            .par_iter()
            .fold(NgramCounts::new, |mut acc, line| {
                acc.add_line(line);
                acc
            })
            .reduce(NgramCounts::new, NgramCounts::merge)
    }
    #[cfg(not(feature = "native"))]
    {
        lines.iter().fold(NgramCounts::new(), |mut acc, line| {
            acc.add_line(line);
            acc
        })
    }
}

/// Extract the set of frequent trigrams from a corpus
pub fn extract_trigrams(lines: &[&str], threshold: u64) -> HashSet<String> {
    let counts = count_ngrams(lines);
    let accepted = counts.accepted(threshold);
    debug!(
        lines = lines.len(),
        distinct = counts.counts.len(),
        accepted = accepted.len(),
        threshold,
        "extracted trigrams"
    );
    accepted
}

/// Fixed ordering for persisting an extracted trigram set
pub fn sorted_ngrams(ngrams: HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = ngrams.into_iter().collect();
    list.sort();
    list
}

/// N-gram -> id mapping. Ids are 1-based positions in the source list.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    ids: HashMap<String, NgramId>,
    size: usize,
}

impl Vocabulary {
    /// Build from an ordered n-gram list: entry i gets id i + 1
    pub fn build<S: AsRef<str>>(ngrams: &[S]) -> Self {
        let mut ids = HashMap::with_capacity(ngrams.len());
        for (i, ngram) in ngrams.iter().enumerate() {
            // A repeated entry takes its later position
            ids.insert(ngram.as_ref().to_string(), (i + 1) as NgramId);
        }
        Vocabulary {
            ids,
            size: ngrams.len(),
        }
    }

    /// Load from vocabulary file text: line N -> id N
    pub fn from_lines(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        Self::build(&lines)
    }

    pub fn get(&self, ngram: &str) -> Option<NgramId> {
        self.ids.get(ngram).copied()
    }

    /// Id of `ngram`, or `UNKNOWN_ID` if absent
    pub fn lookup(&self, ngram: &str) -> NgramId {
        self.get(ngram).unwrap_or(UNKNOWN_ID)
    }

    /// Number of lines the vocabulary was built from (highest assignable id)
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}
