//! rankprep - feature extraction and evaluation for learning-to-rank data.
//!
//! Every subcommand reads tab-separated rows from stdin (or `--input`) and
//! writes to stdout.
//!
//! ```bash
//! rankprep trigrams < corpus.tsv > trigrams.txt
//! rankprep encode-flat trigrams.txt < train.tsv > train.flat
//! rankprep idf-fit < train.tsv > idf.model
//! rankprep idf-predict idf.model < test_pairs.tsv > preds.txt
//! rankprep ndcg marks.txt preds.txt groups.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rankprep::{build, encode::PhraseEncoder, eval, parse, prep, rank, PipelineConfig, Vocabulary};
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rankprep", version, about)]
struct Cli {
    /// JSON config file (PipelineConfig); flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read rows from this file instead of stdin
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract frequent character trigrams from a corpus
    Trigrams {
        /// Keep trigrams occurring strictly more often than this
        #[arg(long)]
        threshold: Option<u64>,
    },
    /// Fit document frequencies over mark/query/document rows
    IdfFit,
    /// Score query/title rows against a fitted model
    IdfPredict {
        /// Model file written by idf-fit
        model: PathBuf,
    },
    /// Encode mark/query/document rows as fixed-length trigram id sequences
    EncodeFlat {
        /// Vocabulary file, one trigram per line
        vocab: PathBuf,
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Encode mark/query/document rows as per-word trigram id grids
    EncodeGrid {
        /// Vocabulary file, one trigram per line
        vocab: PathBuf,
        #[arg(long)]
        max_words: Option<usize>,
        #[arg(long)]
        max_ngrams_per_word: Option<usize>,
    },
    /// Mean NDCG@k over contiguous groups
    Ndcg {
        marks: PathBuf,
        predictions: PathBuf,
        groups: PathBuf,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Replace query/document ids with their text
    Join {
        /// `qid<TAB>query` file
        queries: PathBuf,
        /// `docid<TAB>title` file
        docs: PathBuf,
    },
    /// Turn graded marks into 0/1 labels
    Binarize,
    /// Split judgement rows by query id; test rows go to the given file
    Split {
        test_output: PathBuf,
    },
    /// Tag each row with the id of its contiguous query group
    Group,
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_input(input: Option<&PathBuf>) -> Result<String> {
    match input {
        Some(path) => read_file(path),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn write_lines<I, S>(out: &mut impl Write, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let text = read_file(path)?;
            PipelineConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn load_vocab(path: &Path) -> Result<Vocabulary> {
    let vocab = Vocabulary::from_lines(&read_file(path)?);
    info!(size = vocab.len(), path = %path.display(), "loaded vocabulary");
    Ok(vocab)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    // ndcg takes its three inputs as files
    let input = match cli.command {
        Command::Ndcg { .. } => String::new(),
        _ => read_input(cli.input.as_ref())?,
    };
    let lines: Vec<&str> = input.lines().collect();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Trigrams { threshold } => {
            if let Some(threshold) = threshold {
                config.trigram_threshold = threshold;
            }
            let accepted = build::extract_trigrams(&lines, config.trigram_threshold);
            write_lines(&mut out, build::sorted_ngrams(accepted))?;
        }
        Command::IdfFit => {
            let table = rank::fit_lines(&lines)?;
            write_lines(&mut out, table.to_lines())?;
        }
        Command::IdfPredict { model } => {
            let table = rank::DocFrequencyTable::from_model_text(&read_file(&model)?)
                .with_context(|| format!("Invalid model {}", model.display()))?;
            for (i, line) in lines.iter().enumerate() {
                let pair = parse::parse_query_title(line, i + 1)?;
                writeln!(out, "{}", table.predict(&pair.query, &pair.title))?;
            }
        }
        Command::EncodeFlat { vocab, capacity } => {
            if let Some(capacity) = capacity {
                config.flat_capacity = capacity;
            }
            let vocab = load_vocab(&vocab)?;
            let rows = PhraseEncoder::flat(&config).encode_lines(&lines, &vocab)?;
            write_lines(&mut out, rows)?;
        }
        Command::EncodeGrid {
            vocab,
            max_words,
            max_ngrams_per_word,
        } => {
            if let Some(max_words) = max_words {
                config.grid_max_words = max_words;
            }
            if let Some(max_ngrams_per_word) = max_ngrams_per_word {
                config.grid_max_ngrams_per_word = max_ngrams_per_word;
            }
            let vocab = load_vocab(&vocab)?;
            let rows = PhraseEncoder::grid(&config).encode_lines(&lines, &vocab)?;
            write_lines(&mut out, rows)?;
        }
        Command::Ndcg {
            marks,
            predictions,
            groups,
            k,
        } => {
            let k = k.unwrap_or(config.ndcg_k);
            let marks = parse::parse_numbers(&read_file(&marks)?)?;
            let predictions = parse::parse_numbers(&read_file(&predictions)?)?;
            let groups_text = read_file(&groups)?;
            let groups = parse::parse_tokens(&groups_text);
            let ndcg = eval::evaluate(&marks, &predictions, &groups, k)?;
            writeln!(out, "{}", ndcg)?;
        }
        Command::Join { queries, docs } => {
            let queries = prep::load_lookup(&read_file(&queries)?)?;
            let docs = prep::load_lookup(&read_file(&docs)?)?;
            let joined = prep::join(&lines, &queries, &docs)?;
            write_lines(&mut out, joined.rows)?;
            eprintln!("Errors: {}", joined.missed);
        }
        Command::Binarize => {
            write_lines(&mut out, prep::binarize(&lines)?)?;
        }
        Command::Split { test_output } => {
            let parts = prep::split(&lines)?;
            let mut test = BufWriter::new(
                fs::File::create(&test_output)
                    .with_context(|| format!("Failed to create {}", test_output.display()))?,
            );
            write_lines(&mut test, parts.test)?;
            test.flush()?;
            write_lines(&mut out, parts.train)?;
        }
        Command::Group => {
            write_lines(&mut out, prep::assign_groups(&lines)?)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    run(cli)
}
