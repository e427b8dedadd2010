pub mod interaction;
pub mod scenario;
pub mod verdict;

pub use interaction::{InteractionRecord, Metadata, NewInteraction, NewRecord};
pub use scenario::{ActionKind, ScenarioDefinition};
pub use verdict::{ValidationResult, VerdictStatus};
