use std::path::PathBuf;
use thiserror::Error;

pub type LdaResult<T> = Result<T, LdaError>;

#[derive(Error, Debug)]
pub enum LdaError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed vocabulary file {}:{line}: {reason}", path.display())]
    MalformedVocabularyFile { path: PathBuf, line: usize, reason: String },

    #[error("malformed document file {}:{line}: {reason}", path.display())]
    MalformedDocumentFile { path: PathBuf, line: usize, reason: String },

    #[error("malformed matrix file {}:{line}: {reason}", path.display())]
    MalformedMatrixFile { path: PathBuf, line: usize, reason: String },

    #[error("matrix shape mismatch ({context}): expected {expected}, found {found}")]
    MatrixShapeMismatch { context: String, expected: usize, found: usize },

    #[error("unknown word: {0}")]
    UnknownWord(String),

    #[error("unknown topic {topic}, model has {topic_count} topics")]
    UnknownTopic { topic: usize, topic_count: usize },

    #[error("'{entry}' contains the reserved key separator ({context})")]
    KeySeparatorCollision { entry: String, context: String },

    #[error("duplicate entry '{entry}' ({context})")]
    DuplicateEntry { entry: String, context: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl LdaError {
    /// Maps an open/read failure on `path`, keeping `NotFound` distinct.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => LdaError::FileNotFound { path },
            _ => LdaError::Io { path, source },
        }
    }
}
