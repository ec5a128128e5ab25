
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::LdaConfig;
use crate::error::LdaResult;
use crate::index::ProbabilityIndex;
use crate::reader;

pub const WORD_TOPIC_SUFFIX: &str = ".phi";
pub const TOPIC_DOC_SUFFIX: &str = ".theta";
pub const WORDMAP: &str = "wordmap.txt";
pub const DOCMAP: &str = "docmap.txt";

// the estimator names the final model of an inference run after its data file
const INFERENCE_MODEL: &str = ".model-final";


/// Paths of the four files one load reads.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelFiles {
    pub wordmap: PathBuf,
    pub docmap: PathBuf,
    pub word_topic: PathBuf,
    pub topic_doc: PathBuf,
}

impl ModelFiles {

    /// An estimated model: every file lives in `model_dir`.
    pub fn estimation(model_dir: &Path, model: &str) -> ModelFiles {
        ModelFiles {
            wordmap: model_dir.join(WORDMAP),
            docmap: model_dir.join(DOCMAP),
            word_topic: model_dir.join(format!("{}{}", model, WORD_TOPIC_SUFFIX)),
            topic_doc: model_dir.join(format!("{}{}", model, TOPIC_DOC_SUFFIX)),
        }
    }

    /// Inference over new documents: the vocabulary comes from the estimated model,
    /// everything else from the inference directory.
    pub fn inference(model_dir: &Path, inference_dir: &Path, data_file: &str) -> ModelFiles {
        ModelFiles {
            wordmap: model_dir.join(WORDMAP),
            docmap: inference_dir.join(DOCMAP),
            word_topic: inference_dir.join(format!("{}{}{}", data_file, INFERENCE_MODEL, WORD_TOPIC_SUFFIX)),
            topic_doc: inference_dir.join(format!("{}{}{}", data_file, INFERENCE_MODEL, TOPIC_DOC_SUFFIX)),
        }
    }

    pub fn from_config(config: &LdaConfig, use_inference: bool) -> ModelFiles {
        match (&config.inference, use_inference) {
            (Some(inference), true) => ModelFiles::inference(&config.estimator.model_dir, &inference.model_dir, &inference.data_file),
            _ => ModelFiles::estimation(&config.estimator.model_dir, &config.estimator.model),
        }
    }

}


// falls back to a gzipped sibling when the plain file is absent
fn locate(path: &Path) -> PathBuf {
    if !path.exists() {
        let mut gz = path.as_os_str().to_owned();
        gz.push(".gz");
        let gz = PathBuf::from(gz);
        if gz.exists() {
            return gz
        }
    }
    path.to_path_buf()
}


/// Reads the vocabulary, documents, word-topic and topic-document files in that
/// order and builds a fresh index from them.
pub fn load(files: &ModelFiles) -> LdaResult<ProbabilityIndex> {

    let timer = Instant::now();

    let vocabulary = reader::read_vocabulary(&locate(&files.wordmap))?;
    info!(words = vocabulary.len(), elapsed_ms = timer.elapsed().as_millis() as u64, "loaded vocabulary");

    let documents = reader::read_document_list(&locate(&files.docmap))?;
    info!(documents = documents.len(), elapsed_ms = timer.elapsed().as_millis() as u64, "loaded document list");

    // the topic count is whatever the word-topic file holds
    let word_topic = reader::read_word_topic_matrix(&locate(&files.word_topic), vocabulary.len())?;
    info!(topics = word_topic.nrows(), elapsed_ms = timer.elapsed().as_millis() as u64, "loaded word-topic probabilities");

    let topic_doc = reader::read_topic_doc_matrix(&locate(&files.topic_doc), word_topic.nrows())?;
    info!(rows = topic_doc.nrows(), elapsed_ms = timer.elapsed().as_millis() as u64, "loaded topic-document probabilities");

    let index = ProbabilityIndex::build(vocabulary, documents, &word_topic, &topic_doc)?;
    info!(elapsed_ms = timer.elapsed().as_millis() as u64, "built probability index");

    Ok(index)
}


#[cfg(test)]
mod tests {

    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use flate2::{write::GzEncoder, Compression};
    use ndarray::Axis;
    use ndarray_stats::QuantileExt;

    use super::{load, ModelFiles};
    use crate::config::LdaConfig;
    use crate::error::LdaError;
    use crate::reader;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    fn base_files() -> ModelFiles {
        ModelFiles::estimation(&fixtures().join("base"), "model-final")
    }

    #[test]
    fn estimation_paths() {
        let files = ModelFiles::estimation(Path::new("models/base"), "model-00500");
        assert_eq!(files.wordmap, Path::new("models/base/wordmap.txt"));
        assert_eq!(files.docmap, Path::new("models/base/docmap.txt"));
        assert_eq!(files.word_topic, Path::new("models/base/model-00500.phi"));
        assert_eq!(files.topic_doc, Path::new("models/base/model-00500.theta"));
    }

    #[test]
    fn inference_paths() {
        let files = ModelFiles::inference(Path::new("models/base"), Path::new("models/new"), "newdocs.dat");
        assert_eq!(files.wordmap, Path::new("models/base/wordmap.txt"));
        assert_eq!(files.docmap, Path::new("models/new/docmap.txt"));
        assert_eq!(files.word_topic, Path::new("models/new/newdocs.dat.model-final.phi"));
        assert_eq!(files.topic_doc, Path::new("models/new/newdocs.dat.model-final.theta"));
    }

    #[test]
    fn config_selects_variant() {
        let json = r#"{
            "estimator": { "model_dir": "m" },
            "inference": { "model_dir": "n", "data_file": "new.dat" }
        }"#;
        let config = LdaConfig::from_reader(json.as_bytes()).unwrap();
        assert_eq!(ModelFiles::from_config(&config, true).docmap, Path::new("n/docmap.txt"));
        assert_eq!(ModelFiles::from_config(&config, false).docmap, Path::new("m/docmap.txt"));
    }

    #[test]
    fn fixture_probabilities_are_distributions() {
        let files = base_files();
        let words = reader::read_vocabulary(&files.wordmap).unwrap();
        let phi = reader::read_word_topic_matrix(&files.word_topic, words.len()).unwrap();
        let theta = reader::read_topic_doc_matrix(&files.topic_doc, phi.nrows()).unwrap();

        for matrix in [&phi, &theta] {
            assert!(*matrix.min().unwrap() >= 0.0);
            assert!(*matrix.max().unwrap() <= 1.0);
            for sum in matrix.sum_axis(Axis(1)).iter() {
                assert!((sum - 1.0).abs() < 1e-9, "row sums to {}", sum);
            }
        }
    }

    #[test]
    fn loads_estimated_model() {
        let index = load(&base_files()).unwrap();

        assert_eq!(index.vocabulary(), ["market", "stock", "team", "game"]);
        assert_eq!(index.documents(), ["news-001", "news-002", "news-003"]);
        assert_eq!(index.topic_count(), 2);

        assert_eq!(index.word_topic_probability("stock", 0).unwrap(), 0.35);
        assert_eq!(index.word_topic_probability("game", 1).unwrap(), 0.4);
        assert_eq!(index.topic_document_probability(1, "news-002"), 0.75);

        assert_eq!(index.most_likely_topic("news-001"), Some(0));
        assert_eq!(index.most_likely_topic("news-002"), Some(1));
        // 0.5 / 0.5
        assert_eq!(index.most_likely_topic("news-003"), Some(0));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn every_load_step_logs_elapsed_time() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || load(&base_files()).unwrap());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        for step in ["loaded vocabulary", "loaded document list", "loaded word-topic probabilities",
            "loaded topic-document probabilities", "built probability index"] {
            let line = logs.lines().find(|line| line.contains(step)).unwrap();
            assert!(line.contains("elapsed_ms="), "{}", line);
        }
    }

    #[test]
    fn loads_inference_model() {
        let files = ModelFiles::inference(&fixtures().join("base"), &fixtures().join("infer"), "newdocs.dat");
        let index = load(&files).unwrap();

        assert_eq!(index.vocabulary().len(), 4);
        assert_eq!(index.documents(), ["new-001", "new-002"]);
        assert_eq!(index.word_topic_probability("market", 0).unwrap(), 0.3);
        assert_eq!(index.most_likely_topic("new-001"), Some(1));
        assert_eq!(index.most_likely_topic("new-002"), Some(0));
        assert_eq!(index.most_likely_topic("news-001"), None);
    }

    #[test]
    fn reads_gzipped_matrices() {
        let dir = tempfile::tempdir().unwrap();
        let base = fixtures().join("base");
        for name in ["wordmap.txt", "docmap.txt", "model-final.theta"] {
            fs::copy(base.join(name), dir.path().join(name)).unwrap();
        }
        let phi = fs::read(base.join("model-final.phi")).unwrap();
        let mut encoder = GzEncoder::new(fs::File::create(dir.path().join("model-final.phi.gz")).unwrap(), Compression::default());
        encoder.write_all(&phi).unwrap();
        encoder.finish().unwrap();

        let index = load(&ModelFiles::estimation(dir.path(), "model-final")).unwrap();
        assert_eq!(index.word_topic_probability("team", 1).unwrap(), 0.45);
    }

    #[test]
    fn missing_model_file() {
        let files = ModelFiles::estimation(&fixtures().join("base"), "model-00001");
        match load(&files) {
            Err(LdaError::FileNotFound { path }) => assert!(path.ends_with("model-00001.phi")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn theta_must_match_phi_topics() {
        let dir = tempfile::tempdir().unwrap();
        let base = fixtures().join("base");
        for name in ["wordmap.txt", "docmap.txt", "model-final.phi"] {
            fs::copy(base.join(name), dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("model-final.theta"), "0.2 0.3 0.5\n0.1 0.1 0.8\n0.3 0.3 0.4\n").unwrap();

        let res = load(&ModelFiles::estimation(dir.path(), "model-final"));
        assert!(matches!(res, Err(LdaError::MatrixShapeMismatch { expected: 2, found: 3, .. })));
    }

}
