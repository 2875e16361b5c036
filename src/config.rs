//! Credential and endpoint configuration.
//!
//! Values load with priority: config.toml > environment (after `.env`) >
//! built-in defaults. Only the LLM base URL and model have defaults; store
//! credentials and table ids must be provided.

use serde::Deserialize;

use crate::error::ConfigError;

/// Default chat-completions endpoint (Zhipu).
pub const DEFAULT_LLM_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Default generation model; multimodal-capable for photographed questions.
pub const DEFAULT_LLM_MODEL: &str = "glm-4.6v";

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    feishu: Option<FeishuSection>,
    llm: Option<LlmSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FeishuSection {
    app_id: Option<String>,
    app_secret: Option<String>,
    app_token: Option<String>,
    question_table: Option<String>,
    practice_table: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmSection {
    api_key: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
}

/// Feishu Bitable access: app credentials plus the base and table ids.
#[derive(Debug, Clone)]
pub struct FeishuConfig {
    pub app_id: String,
    pub app_secret: String,
    pub app_token: String,
    pub question_table: String,
    /// Table holding practice records. Optional: without it the engine can
    /// still browse questions, but answers cannot be persisted.
    pub practice_table: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feishu: FeishuConfig,
    pub llm: LlmConfig,
}

/// Load configuration from config.toml and the environment.
pub fn load() -> Result<AppConfig, ConfigError> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let file: FileConfig = std::fs::read_to_string("config.toml")
        .ok()
        .and_then(|contents| match toml::from_str(&contents) {
            Ok(parsed) => {
                tracing::info!("loaded config.toml");
                Some(parsed)
            }
            Err(e) => {
                tracing::warn!("ignoring unparsable config.toml: {}", e);
                None
            }
        })
        .unwrap_or_default();

    let feishu_file = file.feishu.unwrap_or_default();
    let llm_file = file.llm.unwrap_or_default();

    Ok(AppConfig {
        feishu: FeishuConfig {
            app_id: require(feishu_file.app_id, "FEISHU_APP_ID")?,
            app_secret: require(feishu_file.app_secret, "FEISHU_APP_SECRET")?,
            app_token: require(feishu_file.app_token, "FEISHU_APP_TOKEN")?,
            question_table: require(feishu_file.question_table, "FEISHU_TABLE_ID")?,
            practice_table: optional(feishu_file.practice_table, "FEISHU_PRACTICE_TABLE_ID"),
        },
        llm: LlmConfig {
            api_key: require(llm_file.api_key, "LLM_API_KEY")?,
            api_base: optional(llm_file.api_base, "LLM_API_BASE")
                .unwrap_or_else(|| DEFAULT_LLM_API_BASE.to_string()),
            model: optional(llm_file.model, "LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        },
    })
}

fn optional(file_value: Option<String>, env_key: &'static str) -> Option<String> {
    file_value
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env_key).ok().filter(|v| !v.is_empty()))
}

fn require(file_value: Option<String>, env_key: &'static str) -> Result<String, ConfigError> {
    optional(file_value, env_key).ok_or(ConfigError(env_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_value_beats_env() {
        assert_eq!(
            optional(Some("from-file".to_string()), "WRONGBOOK_TEST_UNSET"),
            Some("from-file".to_string())
        );
    }

    #[test]
    fn test_empty_file_value_is_missing() {
        assert_eq!(optional(Some(String::new()), "WRONGBOOK_TEST_UNSET"), None);
        assert!(require(Some(String::new()), "WRONGBOOK_TEST_UNSET").is_err());
    }

    #[test]
    fn test_require_reports_key_name() {
        let err = require(None, "WRONGBOOK_TEST_UNSET").unwrap_err();
        assert!(err.to_string().contains("WRONGBOOK_TEST_UNSET"));
    }
}
