pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod protocol;
pub mod store;
pub mod validation;

pub use catalog::ScenarioCatalog;
pub use config::QalabConfig;
pub use error::{QalabError, ScenarioError, StoreError};
pub use models::{
    ActionKind, InteractionRecord, NewInteraction, ScenarioDefinition, ValidationResult,
    VerdictStatus,
};
pub use store::{InteractionStore, MemoryInteractionStore, PgInteractionStore};
pub use validation::ValidationService;
