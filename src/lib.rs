
mod error;
mod config;
mod index;
pub mod reader;
pub mod loader;
mod run;

/// Joins the two halves of a rendered lookup key; never valid inside a word or document id.
pub const KEY_SEPARATOR: char = ':';

pub use error::{LdaError, LdaResult};
pub use config::{EstimatorConfig, InferenceConfig, LdaConfig};
pub use index::{composite_key, ProbabilityIndex};
pub use loader::ModelFiles;
pub use run::{init_tracing, Run};
