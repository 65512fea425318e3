use crate::error::{Error, Result};
use crate::types::{Example, QueryTitle};

/// N-gram width
pub const N: usize = 3;

/// Boundary marker placed around each word before slicing
const BOUNDARY: char = '#';

/// Generate trigrams from a word (e.g., "cat" -> ["#ca", "cat", "at#"])
///
/// A word of L characters yields exactly L trigrams; the empty word yields none.
pub fn word_to_ngrams(word: &str) -> Vec<String> {
    let mut chars: Vec<char> = Vec::with_capacity(word.len() + 2);
    chars.push(BOUNDARY);
    chars.extend(word.chars());
    chars.push(BOUNDARY);

    if chars.len() < N {
        return Vec::new();
    }
    chars.windows(N).map(|w| w.iter().collect()).collect()
}

/// Split a phrase into whitespace-delimited tokens
pub fn tokenize(phrase: &str) -> impl Iterator<Item = &str> {
    phrase.split_whitespace()
}

/// Split a line on tabs, requiring exactly `expected` fields.
/// `line_no` is 1-based and only used for the error message.
pub fn split_fields(line: &str, expected: usize, line_no: usize) -> Result<Vec<&str>> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != expected {
        return Err(Error::MalformedRow {
            line: line_no,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Parse a `mark<TAB>query<TAB>document` row
pub fn parse_example(line: &str, line_no: usize) -> Result<Example> {
    let fields = split_fields(line, 3, line_no)?;
    Ok(Example {
        mark: fields[0].to_string(),
        query: fields[1].to_string(),
        document: fields[2].to_string(),
    })
}

/// Parse a `query<TAB>title` row
pub fn parse_query_title(line: &str, line_no: usize) -> Result<QueryTitle> {
    let fields = split_fields(line, 2, line_no)?;
    Ok(QueryTitle {
        query: fields[0].to_string(),
        title: fields[1].to_string(),
    })
}

/// Parse whitespace/newline separated numbers
pub fn parse_numbers(text: &str) -> Result<Vec<f64>> {
    text.lines()
        .enumerate()
        .flat_map(|(i, line)| line.split_whitespace().map(move |v| (i + 1, v)))
        .map(|(line, value)| {
            value.parse::<f64>().map_err(|_| Error::InvalidNumber {
                line,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Parse whitespace/newline separated tokens (group ids)
pub fn parse_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
