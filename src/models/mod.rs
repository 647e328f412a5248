pub mod prediction;
pub mod well;

pub use prediction::{ClassificationResult, FlipDecision, Prediction};
pub use well::WellId;
