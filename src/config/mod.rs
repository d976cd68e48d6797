pub mod loader;
pub mod messages;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use messages::MessageTable;
pub use schema::{
    CleanupConfig, DetectorOptions, DriverSettings, ValidationError, ValidationIssue, FALSE, TRUE,
};
