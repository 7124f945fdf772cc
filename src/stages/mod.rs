//! The fixed stage sequence: identify → relate → order → write → combine.

pub mod combine;
pub mod identify;
pub mod order;
pub mod relations;
pub mod write;

pub use combine::CombineTutorial;
pub use identify::IdentifyAbstractions;
pub use order::OrderChapters;
pub use relations::AnalyzeRelationships;
pub use write::WriteChapters;

use crate::error::TutorialError;

/// Shorthand for a fatal schema violation in a stage's `finalize`.
pub(crate) fn validation(stage: &'static str, message: impl std::fmt::Display) -> TutorialError {
    TutorialError::Validation {
        stage,
        message: message.to_string(),
    }
}
