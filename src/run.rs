
use std::io::{self, BufWriter, Write};
use std::path::Path;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info};

use crate::config::LdaConfig;
use crate::error::{LdaError, LdaResult};
use crate::index::ProbabilityIndex;
use crate::loader::{self, ModelFiles};


/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `lda_probs=info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lda_probs=info")),
        )
        .with_writer(io::stderr)
        .init();
}


pub struct Run {}

impl Run {

    /// Loads the configured model and prints `<document>: <topic>` for every document.
    pub fn run(config_path: &Path, estimator_only: bool) -> LdaResult<()> {

        info!("building parameters...");
        let index = Run::load_index(config_path, estimator_only)?;

        for (topic, cluster) in index.cluster_documents().iter().enumerate() {
            debug!("cluster {} has {} documents", topic, cluster.len());
        }

        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        Run::write_assignments(&index, &mut out).map_err(|e| LdaError::io("<stdout>", e))?;
        Ok(())
    }

    pub fn load_index(config_path: &Path, estimator_only: bool) -> LdaResult<ProbabilityIndex> {

        let config = LdaConfig::load(config_path)?;
        info!("{}", config);

        if let Some(num_threads) = config.num_threads {
            ThreadPoolBuilder::new().num_threads(num_threads).build_global()?;
        }

        let files = ModelFiles::from_config(&config, !estimator_only);
        loader::load(&files)
    }

    // documents without a topic print -1
    fn write_assignments<W: Write>(index: &ProbabilityIndex, out: &mut W) -> io::Result<()> {
        for doc in index.documents() {
            match index.most_likely_topic(doc) {
                Some(topic) => writeln!(out, "{}: {}", doc, topic)?,
                None => writeln!(out, "{}: -1", doc)?,
            }
        }
        out.flush()
    }

}
