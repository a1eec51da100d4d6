//! Core configuration types
//!
//! - `CoreConfig` - where the database and legacy file live, how the
//!   encryption key is derived, and which defaults apply
//! - `CoreConfigBuilder` - fluent construction with `~` expansion

mod types;

pub use types::{
    CoreConfig, CoreConfigBuilder, DATABASE_PATH_VAR, DEFAULT_DATABASE_PATH, DEFAULT_ENV_FILE,
};
