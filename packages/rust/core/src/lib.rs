//! Core pipelines and domain logic for copyforge.
//!
//! This crate ties discovery, crawling, storage, and language-model rewriting
//! together into the two end-to-end workflows: [`seed::Seeder`] and
//! [`pipeline::PipelineRunner`].

pub mod pipeline;
pub mod providers;
pub mod rewrite;
pub mod seed;

pub use pipeline::{
    ArticleStore, PipelineRunner, ProgressReporter, ProviderCounts, RunReport, SilentProgress,
};
pub use providers::{LlmProvider, ProviderError, ProviderRequest};
pub use rewrite::{MOCK_REWRITE_MARKER, RewriteOrchestrator};
pub use seed::{SeedReport, Seeder};
