use std::{fs::File, io::{self, BufRead}, path::{Path, PathBuf}};
use anyhow::Context;
use clap::{Parser, Subcommand};
use lda_probs::{composite_key, init_tracing, LdaError, ProbabilityIndex, Run};
use tracing::warn;


// some lookups over a loaded model, separate from the main executable so it
// can be pointed at any config:
// probabilities of given words under every topic
// the most likely topic of given documents, with its probability

#[derive(Parser)]
#[command(name = "query", version, about = "Query word and document probabilities of an LDA model")]
struct Cli {
    /// JSON file with the model locations
    #[arg(long)]
    config: PathBuf,

    /// Ignore the inference section of the config and load the estimated model
    #[arg(long)]
    estimator_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// P(word | topic) for every topic, one word per input line
    Words {
        #[arg(long)]
        input: PathBuf,
    },
    /// Most likely topic and its probability, one document id per input line
    Docs {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {

    init_tracing();
    let cli = Cli::parse();
    let index = Run::load_index(&cli.config, cli.estimator_only)?;

    match &cli.command {
        Commands::Words { input } => run_words(&read_inputs(input)?, &index),
        Commands::Docs { input } => run_docs(&read_inputs(input)?, &index),
    }
}

fn read_inputs(path: &Path) -> anyhow::Result<Vec<String>> {
    let f = File::open(path).with_context(|| format!("could not open input file {}", path.display()))?;
    let lines = io::BufReader::new(f)
        .lines()
        .collect::<Result<Vec<String>, io::Error>>()?;

    Ok(lines
        .iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn run_words(words: &[String], index: &ProbabilityIndex) -> anyhow::Result<()> {

    for word in words {
        for topic in 0..index.topic_count() {
            match index.word_topic_probability(word, topic) {
                Ok(prob) => println!("{} = {}", composite_key(word, &topic.to_string()), prob),
                Err(LdaError::UnknownWord(word)) => {
                    warn!("'{}' is not in the vocabulary", word);
                    break;
                },
                Err(e) => return Err(e.into()),
            }
        }
        println!();
    }
    Ok(())
}

fn run_docs(documents: &[String], index: &ProbabilityIndex) -> anyhow::Result<()> {

    for doc in documents {
        match index.most_likely_topic(doc) {
            Some(topic) => {
                let prob = index.topic_document_probability(topic, doc);
                println!("{} = {}", composite_key(&topic.to_string(), doc), prob);
            },
            None => println!("{}: no topic", doc),
        }
    }
    Ok(())
}
