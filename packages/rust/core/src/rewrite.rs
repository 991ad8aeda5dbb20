//! Article rewriting with provider fallback.
//!
//! The orchestrator is a small state machine:
//!
//! ```text
//! SelectPrimary ─ready─▶ CallPrimary ─ok─▶ Finished(primary)
//!       │                    │ 429
//!       │                    ▼
//!       │              CallSecondary ─ok─▶ Finished(secondary)
//!       ▼                    │ missing / error
//!  Passthrough ◀─────────────┘   (also: any non-429 primary failure)
//! ```
//!
//! [`transition`] is pure. [`RewriteOrchestrator::rewrite`] only executes the
//! side effect belonging to the current state and feeds the outcome back in.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use copyforge_shared::{
    AppConfig, HttpConfig, ProviderUsed, ProvidersConfig, Result, RewriteConfig, RewriteRequest,
    RewriteResult, resolve_credential, usable_credential,
};

use crate::providers::{
    AnthropicProvider, LlmProvider, OpenAiProvider, ProviderError, ProviderRequest,
};

/// Appended to passthrough output when the primary credential is missing.
pub const MOCK_REWRITE_MARKER: &str = "\n\n[MOCK REWRITE: Active OpenAI Key Required]";

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Why a rewrite ended in passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// No usable primary credential; no call was attempted.
    MissingCredentials,
    /// The primary failed with something other than a rate limit.
    PrimaryFailed,
    /// The primary was rate limited and no secondary is configured.
    SecondaryUnavailable,
    /// The secondary was tried and failed.
    SecondaryFailed,
}

/// Orchestrator states. `Finished` and `Passthrough` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteState {
    SelectPrimary,
    CallPrimary,
    CallSecondary,
    Finished { text: String, provider: ProviderUsed },
    Passthrough(PassthroughReason),
}

impl RewriteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Passthrough(_))
    }
}

/// Result of running the side effect of a non-terminal state.
#[derive(Debug)]
pub enum Outcome {
    /// The provider for this state has a usable credential.
    ProviderReady,
    /// The provider for this state has no usable credential.
    ProviderMissing,
    Succeeded(String),
    Failed(ProviderError),
}

/// Next state given the current state and what happened in it.
pub fn transition(state: RewriteState, outcome: Outcome) -> RewriteState {
    use RewriteState::*;

    match (state, outcome) {
        (SelectPrimary, Outcome::ProviderReady) => CallPrimary,
        (SelectPrimary, _) => Passthrough(PassthroughReason::MissingCredentials),

        (CallPrimary, Outcome::Succeeded(text)) => Finished {
            text,
            provider: ProviderUsed::Primary,
        },
        (CallPrimary, Outcome::Failed(ProviderError::RateLimited)) => CallSecondary,
        (CallPrimary, Outcome::ProviderMissing) => {
            Passthrough(PassthroughReason::MissingCredentials)
        }
        (CallPrimary, _) => Passthrough(PassthroughReason::PrimaryFailed),

        (CallSecondary, Outcome::Succeeded(text)) => Finished {
            text,
            provider: ProviderUsed::Secondary,
        },
        (CallSecondary, Outcome::ProviderMissing) => {
            Passthrough(PassthroughReason::SecondaryUnavailable)
        }
        (CallSecondary, _) => Passthrough(PassthroughReason::SecondaryFailed),

        (terminal, _) => terminal,
    }
}

/// Map a terminal state to the result handed back to the caller.
pub fn finish(state: RewriteState, original_text: &str) -> RewriteResult {
    match state {
        RewriteState::Finished { text, provider } => RewriteResult {
            text,
            provider_used: provider,
        },
        RewriteState::Passthrough(PassthroughReason::MissingCredentials) => RewriteResult {
            text: format!("{original_text}{MOCK_REWRITE_MARKER}"),
            provider_used: ProviderUsed::Passthrough,
        },
        _ => RewriteResult {
            text: original_text.to_string(),
            provider_used: ProviderUsed::Passthrough,
        },
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Build the synthesis prompt. Each excerpt is cut to `excerpt_chars` characters.
pub fn build_prompt(request: &RewriteRequest, excerpt_chars: usize) -> String {
    let mut prompt = String::from("You are an expert SEO content writer.\n\n");

    prompt.push_str("Original article:\n\"\"\"\n");
    prompt.push_str(request.original_text.trim());
    prompt.push_str("\n\"\"\"\n\n");

    prompt.push_str("Competitor insights:\n");
    if request.competitor_excerpts.is_empty() {
        prompt.push_str("(no competitor content was available)\n");
    }
    for (i, excerpt) in request.competitor_excerpts.iter().enumerate() {
        let cut: String = excerpt.text.chars().take(excerpt_chars).collect();
        let ellipsis = if cut.len() < excerpt.text.len() { "..." } else { "" };
        prompt.push_str(&format!(
            "Competitor {} ({}):\n{cut}{ellipsis}\n\n",
            i + 1,
            excerpt.source_url
        ));
    }

    prompt.push_str(
        "\nTask: Rewrite the original article to be more engaging and comprehensive, \
         matching the depth and quality of the competitors. Keep the original meaning \
         and improve flow and SEO.\n\n\
         Requirements:\n\
         - Format the article in Markdown with a clear heading structure: \
         `##` for sections and `###` for subsections.\n\
         - End with a `## Key Takeaways` section of 3-5 bullet points.\n\
         - Use a professional, friendly tone. Avoid hype and do not mention competitors.\n\
         - Do not copy competitor sentences verbatim.\n\
         - Return only the rewritten article.\n",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Rewrites articles with a primary provider, a rate-limit fallback, and a passthrough.
#[derive(Clone)]
pub struct RewriteOrchestrator {
    primary: Option<Arc<dyn LlmProvider>>,
    secondary: Option<Arc<dyn LlmProvider>>,
    config: RewriteConfig,
}

impl RewriteOrchestrator {
    /// `None` marks a provider whose credential is absent or a placeholder.
    pub fn new(
        primary: Option<Arc<dyn LlmProvider>>,
        secondary: Option<Arc<dyn LlmProvider>>,
        config: RewriteConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Build the configured providers from explicit credentials.
    pub fn with_credentials(
        providers: &ProvidersConfig,
        rewrite: &RewriteConfig,
        http: &HttpConfig,
        primary_key: Option<String>,
        secondary_key: Option<String>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(http.provider_timeout_secs);

        let primary = match usable_credential(primary_key) {
            Some(key) => Some(Arc::new(OpenAiProvider::new(&key, &providers.primary, timeout)?)
                as Arc<dyn LlmProvider>),
            None => None,
        };
        let secondary = match usable_credential(secondary_key) {
            Some(key) => Some(Arc::new(AnthropicProvider::new(
                &key,
                &providers.secondary,
                timeout,
            )?) as Arc<dyn LlmProvider>),
            None => None,
        };

        Ok(Self::new(primary, secondary, rewrite.clone()))
    }

    /// Build from config, reading credentials from the configured env vars.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_credentials(
            &config.providers,
            &config.rewrite,
            &config.http,
            resolve_credential(&config.providers.primary.api_key_env),
            resolve_credential(&config.providers.secondary.api_key_env),
        )
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Rewrite `request.original_text`. Never fails: the worst case is the
    /// original text with `provider_used = passthrough`.
    #[instrument(skip_all, fields(excerpts = request.competitor_excerpts.len()))]
    pub async fn rewrite(&self, request: &RewriteRequest) -> RewriteResult {
        let prompt = build_prompt(request, self.config.excerpt_chars);
        let provider_request = ProviderRequest {
            prompt: &prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        };

        let mut state = RewriteState::SelectPrimary;
        while !state.is_terminal() {
            let outcome = match &state {
                RewriteState::SelectPrimary => {
                    if self.primary.is_some() {
                        Outcome::ProviderReady
                    } else {
                        Outcome::ProviderMissing
                    }
                }
                RewriteState::CallPrimary => {
                    call(self.primary.as_deref(), &provider_request).await
                }
                RewriteState::CallSecondary => {
                    call(self.secondary.as_deref(), &provider_request).await
                }
                RewriteState::Finished { .. } | RewriteState::Passthrough(_) => break,
            };
            log_outcome(&state, &outcome);
            state = transition(state, outcome);
        }

        let result = finish(state, &request.original_text);
        info!(provider = %result.provider_used, chars = result.text.len(), "rewrite complete");
        result
    }
}

async fn call(provider: Option<&dyn LlmProvider>, request: &ProviderRequest<'_>) -> Outcome {
    match provider {
        None => Outcome::ProviderMissing,
        Some(p) => match p.complete(request).await {
            Ok(text) => Outcome::Succeeded(text),
            Err(e) => Outcome::Failed(e),
        },
    }
}

fn log_outcome(state: &RewriteState, outcome: &Outcome) {
    match (state, outcome) {
        (RewriteState::SelectPrimary, Outcome::ProviderMissing) => {
            info!("no primary credential configured, returning mock rewrite");
        }
        (RewriteState::CallPrimary, Outcome::Failed(ProviderError::RateLimited)) => {
            info!("primary provider rate limited, trying secondary");
        }
        (RewriteState::CallSecondary, Outcome::ProviderMissing) => {
            info!("no secondary credential configured, returning original text");
        }
        (_, Outcome::Failed(e)) => {
            warn!(state = ?state, error = %e, "provider call failed, returning original text");
        }
        _ => {}
    }
}
