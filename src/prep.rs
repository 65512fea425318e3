//! Row-wise preparation steps run before feature extraction: id join,
//! relevance binarization, train/test split and query group tagging.

use crate::error::{Error, Result};
use crate::parse::{parse_example, split_fields};
use std::collections::HashMap;
use tracing::{info, warn};

/// Marks at or above this become label 1
pub const RELEVANT_MARK: i64 = 3;

/// Rows with `qid % SPLIT_MODULUS < TEST_BUCKETS` go to the test set
const SPLIT_MODULUS: i64 = 10;
const TEST_BUCKETS: i64 = 2;

/// Id -> lower-cased text, from `id<TAB>text` lines
pub type IdLookup = HashMap<i64, String>;

fn parse_id(value: &str, line: usize) -> Result<i64> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

/// Load an `id<TAB>text` file. Text is trimmed and lower-cased.
pub fn load_lookup(text: &str) -> Result<IdLookup> {
    let mut lookup = IdLookup::new();
    for (i, line) in text.lines().enumerate() {
        let fields = split_fields(line.trim(), 2, i + 1)?;
        let id = parse_id(fields[0], i + 1)?;
        lookup.insert(id, fields[1].trim().to_lowercase());
    }
    Ok(lookup)
}

/// Result of joining judgement rows against the query and document lookups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Joined {
    /// `query<TAB>title<TAB>mark` rows
    pub rows: Vec<String>,
    /// Rows skipped because the qid or docid was not found
    pub missed: usize,
}

/// Replace ids in `qid<TAB>docid<TAB>mark` rows with query and title text.
/// Unknown ids are counted and skipped; malformed rows are fatal.
pub fn join(lines: &[&str], queries: &IdLookup, docs: &IdLookup) -> Result<Joined> {
    let mut joined = Joined::default();
    for (i, line) in lines.iter().enumerate() {
        let fields = split_fields(line.trim(), 3, i + 1)?;
        let qid = parse_id(fields[0], i + 1)?;
        let docid = parse_id(fields[1], i + 1)?;
        match (queries.get(&qid), docs.get(&docid)) {
            (Some(query), Some(title)) => {
                joined
                    .rows
                    .push(format!("{}\t{}\t{}", query, title, fields[2]));
            }
            _ => joined.missed += 1,
        }
    }
    if joined.missed > 0 {
        warn!(missed = joined.missed, "skipped rows with unknown ids");
    }
    info!(joined = joined.rows.len(), missed = joined.missed, "join complete");
    Ok(joined)
}

/// `query<TAB>doc<TAB>mark` -> `label<TAB>query<TAB>doc`, label 1 iff mark >= 3
pub fn binarize_line(line: &str, line_no: usize) -> Result<String> {
    let fields = split_fields(line.trim(), 3, line_no)?;
    let mark = parse_id(fields[2], line_no)?;
    let label = if mark >= RELEVANT_MARK { 1 } else { 0 };
    Ok(format!("{}\t{}\t{}", label, fields[0], fields[1]))
}

pub fn binarize(lines: &[&str]) -> Result<Vec<String>> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| binarize_line(line, i + 1))
        .collect()
}

/// Train and test partitions of `qid<TAB>docid<TAB>mark` rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split<'a> {
    pub train: Vec<&'a str>,
    pub test: Vec<&'a str>,
}

/// Partition rows by query id so all rows of a query land on the same side
pub fn split<'a>(lines: &[&'a str]) -> Result<Split<'a>> {
    let mut out = Split::default();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        let fields = split_fields(line, 3, i + 1)?;
        let qid = parse_id(fields[0], i + 1)?;
        if qid.rem_euclid(SPLIT_MODULUS) < TEST_BUCKETS {
            out.test.push(line);
        } else {
            out.train.push(line);
        }
    }
    Ok(out)
}

/// Group id per `mark<TAB>query<TAB>doc` row: starts at 0, bumps whenever the
/// query differs from the previous row's
pub fn assign_groups(lines: &[&str]) -> Result<Vec<usize>> {
    let mut groups = Vec::with_capacity(lines.len());
    let mut prev_query: Option<String> = None;
    let mut group = 0;
    for (i, line) in lines.iter().enumerate() {
        let example = parse_example(line, i + 1)?;
        if let Some(prev) = &prev_query {
            if *prev != example.query {
                group += 1;
            }
        }
        prev_query = Some(example.query);
        groups.push(group);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookups() -> (IdLookup, IdLookup) {
        let queries = load_lookup("1\tCheap Flights\n2\tWeather\n").unwrap();
        let docs = load_lookup("10\tBest FLIGHTS deals \n20\tForecast\n").unwrap();
        (queries, docs)
    }

    #[test]
    fn test_load_lookup_lowercases() {
        let (queries, docs) = lookups();
        assert_eq!(queries[&1], "cheap flights");
        assert_eq!(docs[&10], "best flights deals");
    }

    #[test]
    fn test_join_skips_and_counts_misses() {
        let (queries, docs) = lookups();
        let joined = join(&["1\t10\t4", "3\t10\t1", "2\t99\t0", "2\t20\t2"], &queries, &docs).unwrap();
        assert_eq!(
            joined.rows,
            vec!["cheap flights\tbest flights deals\t4", "weather\tforecast\t2"]
        );
        assert_eq!(joined.missed, 2);
    }

    #[test]
    fn test_join_malformed_is_fatal() {
        let (queries, docs) = lookups();
        assert!(join(&["1\t10"], &queries, &docs).is_err());
        assert!(join(&["x\t10\t1"], &queries, &docs).is_err());
    }

    #[test]
    fn test_binarize_threshold() {
        let rows = binarize(&["q\td\t3", "q\td\t2", "q\td\t4\n"]).unwrap();
        assert_eq!(rows, vec!["1\tq\td", "0\tq\td", "1\tq\td"]);
    }

    #[test]
    fn test_split_by_qid() {
        let lines = ["10\t1\t0", "11\t1\t0", "12\t1\t0", "25\t1\t0", "31\t2\t1"];
        let parts = split(&lines).unwrap();
        assert_eq!(parts.test, vec!["10\t1\t0", "11\t1\t0", "31\t2\t1"]);
        assert_eq!(parts.train, vec!["12\t1\t0", "25\t1\t0"]);
    }

    #[test]
    fn test_assign_groups_contiguous() {
        let lines = ["1\ta\tx", "0\ta\ty", "1\tb\tx", "0\ta\tz"];
        assert_eq!(assign_groups(&lines).unwrap(), vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_assign_groups_empty() {
        assert!(assign_groups(&[]).unwrap().is_empty());
    }
}
