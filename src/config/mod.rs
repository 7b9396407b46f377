//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → consumed once at startup by the route table and HTTP server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
