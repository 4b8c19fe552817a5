//! Domain types, configuration and persistence shared by every dnalens crate.

pub mod app_config;
pub mod config;
pub mod creative;
pub mod dataset;
pub mod insight;
pub mod json_extract;
pub mod profile;
pub mod prompts;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use creative::CreativeRef;
pub use dataset::{
    parse_dataset, parse_impression_share, read_dataset, select_top, CompetitorRow, DatasetError,
};
pub use insight::{InsightFields, VideoInsight};
pub use json_extract::{extract_json, ParseError};
pub use profile::{ProfileError, ProfileStore, WinningDna};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
