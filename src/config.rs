
use serde::Deserialize;
use std::{fmt::Display, fs::File, io::BufReader, path::{Path, PathBuf}};
use crate::error::{LdaError, LdaResult};

pub const DEFAULT_MODEL: &str = "model-final";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Location of an estimated model: `wordmap.txt`, `docmap.txt`, `<model>.phi`, `<model>.theta`.
#[derive(Clone, Debug, Deserialize)]
pub struct EstimatorConfig {
    pub model_dir: PathBuf,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Location of an inference run over new documents, relative to an estimated model.
#[derive(Clone, Debug, Deserialize)]
pub struct InferenceConfig {
    pub model_dir: PathBuf,
    pub data_file: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LdaConfig {
    pub estimator: EstimatorConfig,
    pub inference: Option<InferenceConfig>,
    pub num_threads: Option<usize>,
}

impl Display for LdaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "using model parameters:
        model_dir: {}
        model: {}",
        self.estimator.model_dir.display(), self.estimator.model)?;

        if let Some(inference) = &self.inference {
            write!(f, "
        inference_dir: {}
        data_file: {}",
            inference.model_dir.display(), inference.data_file)?;
        }

        write!(f, "
        num_threads: {:?}", self.num_threads)
    }
}

impl LdaConfig {

    pub fn load(path: &Path) -> LdaResult<LdaConfig> {
        let f = File::open(path).map_err(|e| LdaError::io(path, e))?;
        let config = LdaConfig::from_reader(BufReader::new(f))?;
        Ok(config)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> LdaResult<LdaConfig> {
        let config: LdaConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> LdaResult<()> {
        if self.estimator.model.trim().is_empty() {
            return Err(LdaError::Config("estimator.model must not be empty".into()));
        }
        if let Some(inference) = &self.inference {
            if inference.data_file.trim().is_empty() {
                return Err(LdaError::Config("inference.data_file must not be empty".into()));
            }
        }
        if self.num_threads == Some(0) {
            return Err(LdaError::Config("num_threads must be positive".into()));
        }
        Ok(())
    }

}
