//! Shared types, error model, and configuration for the horoscope pipeline.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`HoroscopeError`]: the unified error type
//! - Domain types ([`SourceFile`], [`Record`], [`CellValue`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GenerationConfig, PromptConfig, RunConfig, RunSection, config_dir,
    config_file_path, init_config, load_config, load_config_from, record_limit,
    resolve_api_key, resolve_base_url,
};
pub use error::{HoroscopeError, Result};
pub use types::{CellValue, Record, SourceFile};
