//! Application configuration for copyforge.
//!
//! User config lives at `~/.copyforge/copyforge.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file, only the name of the env var holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CopyforgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "copyforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".copyforge";

/// Browser-like client identity sent with article and competitor fetches.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Exact values (lowercased) that mark a credential as an unfilled example.
const PLACEHOLDER_VALUES: &[&str] = &["changeme", "placeholder", "xxx", "todo", "none"];

// ---------------------------------------------------------------------------
// Config structs (matching copyforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External blog listing to discover articles from.
    #[serde(default)]
    pub listing: ListingConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Language-model providers.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Rewrite prompt settings.
    #[serde(default)]
    pub rewrite: RewriteConfig,

    /// Record store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[listing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Root URL of the paginated blog index (page 1).
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Selector matching pagination controls.
    #[serde(default = "default_pagination_selector")]
    pub pagination_selector: String,

    /// Selector matching article links on a listing page.
    #[serde(default = "default_article_link_selector")]
    pub article_link_selector: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            pagination_selector: default_pagination_selector(),
            article_link_selector: default_article_link_selector(),
        }
    }
}

fn default_root_url() -> String {
    "https://beyondchats.com/blogs/".into()
}
fn default_pagination_selector() -> String {
    ".page-numbers".into()
}
fn default_article_link_selector() -> String {
    ".elementor-post__title a, article h2 a, .entry-title a".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout for listing and article fetches.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Per-call timeout for competitor fetches.
    #[serde(default = "default_competitor_timeout_secs")]
    pub competitor_timeout_secs: u64,

    /// Per-call timeout for language-model completions.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Client identity header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Language preference header.
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            competitor_timeout_secs: default_competitor_timeout_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_competitor_timeout_secs() -> u64 {
    5
}
fn default_provider_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.9".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Value of the `engine` query parameter.
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Number of competitor links to keep (never more than 2).
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            engine: default_engine(),
            api_key_env: default_search_key_env(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://serpapi.com/search".into()
}
fn default_engine() -> String {
    "google".into()
}
fn default_search_key_env() -> String {
    "SERPAPI_KEY".into()
}
fn default_max_results() -> usize {
    2
}

/// `[providers]` section with a primary and a secondary language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderConfig,

    #[serde(default = "default_secondary")]
    pub secondary: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
        }
    }
}

/// `[providers.primary]` / `[providers.secondary]` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    pub api_key_env: String,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Completion endpoint.
    pub endpoint: String,
}

fn default_primary() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "OPENAI_API_KEY".into(),
        model: "gpt-3.5-turbo".into(),
        endpoint: "https://api.openai.com/v1/chat/completions".into(),
    }
}

fn default_secondary() -> ProviderConfig {
    ProviderConfig {
        api_key_env: "ANTHROPIC_API_KEY".into(),
        model: "claude-3-5-haiku-latest".into(),
        endpoint: "https://api.anthropic.com/v1/messages".into(),
    }
}

/// `[rewrite]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Characters of each competitor excerpt included in the prompt.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_max_output_tokens() -> u32 {
    1500
}
fn default_temperature() -> f32 {
    0.7
}
fn default_excerpt_chars() -> usize {
    500
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "var/copyforge.db".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.copyforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CopyforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.copyforge/copyforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CopyforgeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CopyforgeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    url::Url::parse(&config.listing.root_url).map_err(|e| {
        CopyforgeError::config(format!(
            "listing.root_url '{}' is not a valid URL: {e}",
            config.listing.root_url
        ))
    })?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CopyforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CopyforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CopyforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Whether a credential value follows a known "unset/example" pattern.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    v.is_empty()
        || v.starts_with("your_")
        || v.starts_with("your-")
        || (v.starts_with('<') && v.ends_with('>'))
        || PLACEHOLDER_VALUES.contains(&v.as_str())
}

/// Filter a raw credential: absent and placeholder values both become `None`.
pub fn usable_credential(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !is_placeholder(v))
}

/// Read the credential stored in `var_name`, treating placeholders as absent.
pub fn resolve_credential(var_name: &str) -> Option<String> {
    usable_credential(std::env::var(var_name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("root_url"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("SERPAPI_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.http.timeout_secs, 10);
        assert_eq!(parsed.http.provider_timeout_secs, 60);
        assert_eq!(parsed.search.max_results, 2);
        assert_eq!(parsed.providers.secondary.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[listing]
root_url = "https://blog.example.com/"

[providers.primary]
api_key_env = "MY_OPENAI"
model = "gpt-4o-mini"
endpoint = "http://localhost:9999/v1/chat/completions"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.listing.root_url, "https://blog.example.com/");
        assert_eq!(config.listing.pagination_selector, ".page-numbers");
        assert_eq!(config.providers.primary.model, "gpt-4o-mini");
        assert_eq!(config.providers.secondary.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.rewrite.excerpt_chars, 500);
    }

    #[test]
    fn load_rejects_bad_root_url() {
        let path = std::env::temp_dir().join(format!("cf_config_{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, "[listing]\nroot_url = \"not a url\"\n").unwrap();
        let result = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.unwrap_err().to_string().contains("not a valid URL"));
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("   "));
        assert!(is_placeholder("your_openai_key_here"));
        assert!(is_placeholder("YOUR-API-KEY"));
        assert!(is_placeholder("<serpapi key>"));
        assert!(is_placeholder("changeme"));
        assert!(!is_placeholder("sk-live-4f8a9c"));
        assert!(!is_placeholder("yourself-is-not-a-prefix"));
    }

    #[test]
    fn usable_credential_filters() {
        assert_eq!(usable_credential(None), None);
        assert_eq!(usable_credential(Some("your_key".into())), None);
        assert_eq!(
            usable_credential(Some("  sk-abc \n".into())),
            Some("sk-abc".into())
        );
    }

    #[test]
    fn unset_env_var_is_absent() {
        // Use a unique env var name to avoid interfering with other tests
        assert_eq!(resolve_credential("CF_TEST_NONEXISTENT_KEY_12345"), None);
    }
}
