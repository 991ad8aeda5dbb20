//! Shared types, error model, and configuration for copyforge.
//!
//! This crate is the foundation depended on by all other copyforge crates.
//! It provides:
//! - [`CopyforgeError`]: the unified error type
//! - Domain types ([`Article`], [`ExtractedDocument`], [`RewriteRequest`], [`RewriteResult`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, HttpConfig, ListingConfig, ProviderConfig, ProvidersConfig, RewriteConfig,
    SearchConfig, StorageConfig, config_dir, config_file_path, init_config, is_placeholder,
    load_config, load_config_from, resolve_credential, usable_credential,
};
pub use error::{CopyforgeError, Result};
pub use types::{
    Article, ArticleId, CompetitorExcerpt, ExtractedDocument, MAX_COMPETITORS, MAX_REFERENCES,
    ProviderUsed, RewriteRequest, RewriteResult,
};
