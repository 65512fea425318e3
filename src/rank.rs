use crate::error::{Error, Result};
use crate::parse::{parse_example, split_fields, tokenize};
use crate::types::{DocFrequencies, Example};
use std::collections::HashSet;
use tracing::debug;

#[cfg(feature = "native")]
use rayon::prelude::*;

/// Key holding the number of fitted rows in a serialized model
pub const TOTAL_DOCS_KEY: &str = "TOTAL_DOCS";

/// Document frequency used for terms the model has never seen
const UNSEEN_DF: u64 = 1;

/// IDF weight of one matching term: ln(total_docs / doc_freq)
pub fn idf_term(doc_freq: u64, total_docs: u64) -> f64 {
    (total_docs as f64 / doc_freq as f64).ln()
}

/// Term -> document frequency table plus the number of rows it was fitted on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocFrequencyTable {
    doc_freqs: DocFrequencies,
    total_docs: u64,
}

impl DocFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row. Only the document field contributes terms,
    /// each distinct word once. The word `TOTAL_DOCS` is reserved for the
    /// row count and is not counted as a term.
    pub fn add_example(&mut self, example: &Example) {
        self.total_docs += 1;
        let words: HashSet<&str> = tokenize(&example.document)
            .filter(|w| *w != TOTAL_DOCS_KEY)
            .collect();
        for word in words {
            *self.doc_freqs.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    /// Sum another shard's counts into this one
    pub fn merge(mut self, other: DocFrequencyTable) -> DocFrequencyTable {
        self.total_docs += other.total_docs;
        for (term, df) in other.doc_freqs {
            *self.doc_freqs.entry(term).or_insert(0) += df;
        }
        self
    }

    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    pub fn doc_freq(&self, term: &str) -> Option<u64> {
        self.doc_freqs.get(term).copied()
    }

    pub fn num_terms(&self) -> usize {
        self.doc_freqs.len()
    }

    /// Relevance of `title` for `query`.
    ///
    /// Every query token (repeats included) that also appears in the title
    /// adds its IDF weight. Title membership is a presence test, not a count.
    pub fn predict(&self, query: &str, title: &str) -> f64 {
        let title_words: Vec<&str> = tokenize(title).collect();
        tokenize(query)
            .filter(|w| title_words.contains(w))
            .map(|w| idf_term(self.doc_freq(w).unwrap_or(UNSEEN_DF), self.total_docs))
            .sum()
    }

    /// Serialize as `term<TAB>count` lines, `TOTAL_DOCS` included. Order is unspecified.
    pub fn to_lines(&self) -> Vec<String> {
        std::iter::once(format!("{}\t{}", TOTAL_DOCS_KEY, self.total_docs))
            .chain(
                self.doc_freqs
                    .iter()
                    .map(|(term, df)| format!("{}\t{}", term, df)),
            )
            .collect()
    }

    /// Parse a serialized model. Fails if any line is malformed or
    /// `TOTAL_DOCS` is absent or repeated.
    pub fn from_model_text(text: &str) -> Result<Self> {
        let mut doc_freqs = DocFrequencies::new();
        let mut total_docs = None;

        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(line, 2, i + 1)?;
            let count: u64 = fields[1].trim().parse().map_err(|_| Error::InvalidNumber {
                line: i + 1,
                value: fields[1].to_string(),
            })?;
            if fields[0] == TOTAL_DOCS_KEY {
                if total_docs.is_some() {
                    return Err(Error::DuplicateKey {
                        line: i + 1,
                        key: TOTAL_DOCS_KEY.to_string(),
                    });
                }
                total_docs = Some(count);
            } else {
                doc_freqs.insert(fields[0].to_string(), count);
            }
        }

        let total_docs = total_docs.ok_or_else(|| Error::MissingKey(TOTAL_DOCS_KEY.to_string()))?;
        Ok(DocFrequencyTable {
            doc_freqs,
            total_docs,
        })
    }
}

/// Fit a table over parsed examples
pub fn fit(examples: &[Example]) -> DocFrequencyTable {
    #[cfg(feature = "native")]
    let table = examples
        .par_iter()
        .fold(DocFrequencyTable::new, |mut acc, ex| {
            acc.add_example(ex);
            acc
        })
        .reduce(DocFrequencyTable::new, DocFrequencyTable::merge);
    #[cfg(not(feature = "native"))]
    let table = examples
        .iter()
        .fold(DocFrequencyTable::new(), |mut acc, ex| {
            acc.add_example(ex);
            acc
        });

    debug!(
        rows = table.total_docs,
        terms = table.doc_freqs.len(),
        "fitted document frequencies"
    );
    table
}

/// Fit a table over `mark<TAB>query<TAB>document` lines
pub fn fit_lines(lines: &[&str]) -> Result<DocFrequencyTable> {
    let examples = lines
        .iter()
        .enumerate()
        .map(|(i, line)| parse_example(line, i + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(fit(&examples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(mark: &str, query: &str, document: &str) -> Example {
        Example {
            mark: mark.to_string(),
            query: query.to_string(),
            document: document.to_string(),
        }
    }

    fn small_table() -> DocFrequencyTable {
        fit(&[example("1", "a b", "a b c"), example("0", "a", "c d")])
    }

    #[test]
    fn test_fit_counts_document_field_only() {
        let table = small_table();
        assert_eq!(table.total_docs(), 2);
        // "a" appears in both queries but only the first document
        assert_eq!(table.doc_freq("a"), Some(1));
        assert_eq!(table.doc_freq("b"), Some(1));
        assert_eq!(table.doc_freq("c"), Some(2));
        assert_eq!(table.doc_freq("d"), Some(1));
        assert_eq!(table.num_terms(), 4);
    }

    #[test]
    fn test_fit_collapses_repeated_words() {
        let table = fit(&[example("1", "q", "x x x y")]);
        assert_eq!(table.doc_freq("x"), Some(1));
        assert_eq!(table.total_docs(), 1);
    }

    #[test]
    fn test_fit_is_case_sensitive() {
        let table = fit(&[example("1", "q", "Word word")]);
        assert_eq!(table.doc_freq("Word"), Some(1));
        assert_eq!(table.doc_freq("word"), Some(1));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let mut left = DocFrequencyTable::new();
        left.add_example(&example("1", "a b", "a b c"));
        let mut right = DocFrequencyTable::new();
        right.add_example(&example("0", "a", "c d"));
        assert_eq!(left.merge(right), small_table());
    }

    #[test]
    fn test_predict_matching_terms() {
        let table = small_table();
        // c: ln(2/2) = 0, d: ln(2/1)
        let score = table.predict("c d", "c d e");
        assert!((score - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_predict_repeated_query_token_counts_twice() {
        let table = small_table();
        let once = table.predict("d", "d");
        let twice = table.predict("d d", "d");
        assert!((twice - 2.0 * once).abs() < 1e-12);
    }

    #[test]
    fn test_predict_unknown_term_uses_df_one() {
        let table = small_table();
        let score = table.predict("zzz", "zzz");
        assert!((score - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_predict_no_overlap_is_zero() {
        let table = small_table();
        assert_eq!(table.predict("a b", "c d"), 0.0);
        assert_eq!(table.predict("", "a"), 0.0);
    }

    #[test]
    fn test_predict_uses_title_not_fitted_document() {
        // The fitted documents never contain "q", yet a query/title match still scores
        let table = fit(&[example("1", "q", "a"), example("1", "q", "b")]);
        assert!(table.predict("q", "q") > 0.0);
    }

    #[test]
    fn test_model_text_round_trip() {
        let table = small_table();
        let text = table.to_lines().join("\n");
        let loaded = DocFrequencyTable::from_model_text(&text).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_model_missing_total_docs() {
        let err = DocFrequencyTable::from_model_text("a\t1\nb\t2\n").unwrap_err();
        assert!(matches!(err, Error::MissingKey(ref k) if k == TOTAL_DOCS_KEY));
    }

    #[test]
    fn test_reserved_word_in_document_keeps_row_count() {
        let table = fit_lines(&["1\tq\tTOTAL_DOCS a", "1\tq\tb", "1\tq\tc"]).unwrap();
        assert_eq!(table.total_docs(), 3);
        assert_eq!(table.doc_freq(TOTAL_DOCS_KEY), None);

        let lines = table.to_lines();
        let header = format!("{}\t", TOTAL_DOCS_KEY);
        assert_eq!(lines.iter().filter(|l| l.starts_with(&header)).count(), 1);

        let loaded = DocFrequencyTable::from_model_text(&lines.join("\n")).unwrap();
        assert_eq!(loaded.total_docs(), 3);
        assert!((loaded.predict("b", "b") - 3f64.ln()).abs() < 1e-12);
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_model_repeated_total_docs() {
        let err = DocFrequencyTable::from_model_text("TOTAL_DOCS\t3\na\t1\nTOTAL_DOCS\t1\n")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { line: 3, .. }));
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_parallel_fit_matches_sequential() {
        let examples: Vec<Example> = (0..2000)
            .map(|i| example("0", "q", &format!("w{} w{} shared", i % 37, i % 11)))
            .collect();
        let mut sequential = DocFrequencyTable::new();
        for ex in &examples {
            sequential.add_example(ex);
        }
        assert_eq!(fit(&examples), sequential);
    }

    #[test]
    fn test_model_malformed_line() {
        let err = DocFrequencyTable::from_model_text("TOTAL_DOCS\t2\nbroken\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_fit_lines_rejects_short_row() {
        assert!(fit_lines(&["1\ta b\ta b c", "0\ta"]).is_err());
    }
}
