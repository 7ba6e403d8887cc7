pub mod error;
pub mod eval;
pub mod merged;
pub mod model;
pub mod settings;
pub mod smoothing;
pub mod trie;
pub mod unicode;
pub mod vocab;

pub use error::LmError;
pub use model::{DynamicLanguageModel, LanguageModel, Prediction};
pub use smoothing::Smoothing;
pub use vocab::PredictOptions;
