//! End-to-end runs over the on-disk record formats.

use rankprep::{build, encode, eval, parse, prep, rank, PhraseEncoder, PipelineConfig, Vocabulary};
use std::fs;
use tempfile::TempDir;

const TRAIN: &str = "1\tcheap flights\tcheap flights to paris\n\
0\tcheap flights\tweather in paris\n\
1\tparis weather\tweather in paris today\n";

#[test]
fn test_vocabulary_file_drives_encoding() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<&str> = TRAIN.lines().collect();

    let accepted = build::extract_trigrams(&lines, 0);
    let ngrams = build::sorted_ngrams(accepted);
    let vocab_path = dir.path().join("trigrams.txt");
    fs::write(&vocab_path, ngrams.join("\n")).unwrap();

    let vocab = Vocabulary::from_lines(&fs::read_to_string(&vocab_path).unwrap());
    assert_eq!(vocab.len(), ngrams.len());
    for (i, ngram) in ngrams.iter().enumerate() {
        assert_eq!(vocab.lookup(ngram), (i + 1) as u32);
    }

    let config = PipelineConfig::default();
    let flat = PhraseEncoder::flat(&config).encode_lines(&lines, &vocab).unwrap();
    let grid = PhraseEncoder::grid(&config).encode_lines(&lines, &vocab).unwrap();
    assert_eq!(flat.len(), 3);
    for row in &flat {
        assert_eq!(row.split('\t').count(), 2 * config.flat_capacity);
    }
    for row in &grid {
        assert_eq!(
            row.split('\t').count(),
            2 * config.grid_max_words * config.grid_max_ngrams_per_word
        );
    }

    // Every trigram of the corpus is known, so "cheap" encodes without zeros
    let ids = encode::encode_flat("cheap", &vocab, 5);
    assert!(ids.iter().all(|&id| id > 0));
}

#[test]
fn test_idf_model_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<&str> = TRAIN.lines().collect();
    let table = rank::fit_lines(&lines).unwrap();
    assert_eq!(table.total_docs(), 3);
    assert_eq!(table.doc_freq("paris"), Some(3));
    assert_eq!(table.doc_freq("weather"), Some(2));
    assert_eq!(table.doc_freq("cheap"), Some(1));

    let model_path = dir.path().join("idf.model");
    fs::write(&model_path, table.to_lines().join("\n")).unwrap();
    let loaded = rank::DocFrequencyTable::from_model_text(&fs::read_to_string(&model_path).unwrap())
        .unwrap();

    let pair = parse::parse_query_title("cheap paris\tcheap hotels paris\n", 1).unwrap();
    let score = loaded.predict(&pair.query, &pair.title);
    // cheap: ln(3/1), paris: ln(3/3) = 0
    assert!((score - 3f64.ln()).abs() < 1e-12);
}

#[test]
fn test_prepared_rows_evaluate() {
    let (queries, docs) = (
        prep::load_lookup("1\tCats\n2\tDogs\n").unwrap(),
        prep::load_lookup("10\tcats care\n11\tcat food\n20\tdog walks\n").unwrap(),
    );
    let joined = prep::join(&["1\t10\t4", "1\t11\t1", "2\t20\t3", "2\t99\t2"], &queries, &docs).unwrap();
    assert_eq!(joined.missed, 1);

    let joined_rows: Vec<&str> = joined.rows.iter().map(String::as_str).collect();
    let labelled = prep::binarize(&joined_rows).unwrap();
    assert_eq!(labelled[0], "1\tcats\tcats care");
    assert_eq!(labelled[1], "0\tcats\tcat food");

    let labelled_rows: Vec<&str> = labelled.iter().map(String::as_str).collect();
    let groups = prep::assign_groups(&labelled_rows).unwrap();
    assert_eq!(groups, vec![0, 0, 1]);

    let marks = [4.0, 1.0, 3.0];
    let predictions = [0.2, 0.8, 0.5];
    let ndcg = eval::evaluate(&marks, &predictions, &groups, 5).unwrap();
    assert!(ndcg > 0.0 && ndcg < 1.0);
}

#[test]
fn test_ndcg_text_inputs() {
    let ndcg = rankprep::ndcg_from_text("3\n2\n1\n", "0.1\n0.9\n0.5\n", "7\n7\n7\n", 5).unwrap();
    let dcg = 3.0 / 2f64.log2() + 1.0 / 3f64.log2() + 7.0 / 4f64.log2();
    let idcg = 7.0 / 2f64.log2() + 3.0 / 3f64.log2() + 1.0 / 4f64.log2();
    assert!((ndcg - dcg / (idcg + eval::NDCG_EPSILON)).abs() < 1e-12);
}
