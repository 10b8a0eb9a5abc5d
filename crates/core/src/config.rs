use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub webhook_secret: SecretString,
    pub api_base_url: String,
    pub admin_ids: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub queue_capacity: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub webhook_secret: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                webhook_secret: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                admin_ids: Vec::new(),
            },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                timeout_secs: 90,
                max_tokens: 1500,
            },
            storage: StorageConfig { data_dir: PathBuf::from("data") },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                queue_capacity: 256,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("numera.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(webhook_secret_value) = telegram.webhook_secret {
                self.telegram.webhook_secret = secret_value(webhook_secret_value);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(admin_ids) = telegram.admin_ids {
                self.telegram.admin_ids = admin_ids;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(llm_api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(queue_capacity) = server.queue_capacity {
                self.server.queue_capacity = queue_capacity;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("NUMERA_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("NUMERA_TELEGRAM_WEBHOOK_SECRET") {
            self.telegram.webhook_secret = secret_value(value);
        }
        if let Some(value) = read_env("NUMERA_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("NUMERA_TELEGRAM_ADMIN_IDS") {
            self.telegram.admin_ids = parse_admin_ids("NUMERA_TELEGRAM_ADMIN_IDS", &value)?;
        }

        if let Some(value) = read_env("NUMERA_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("NUMERA_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("NUMERA_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("NUMERA_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("NUMERA_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("NUMERA_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("NUMERA_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("NUMERA_STORAGE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("NUMERA_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("NUMERA_SERVER_PORT") {
            self.server.port = parse_u16("NUMERA_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("NUMERA_SERVER_QUEUE_CAPACITY") {
            self.server.queue_capacity =
                parse_u64("NUMERA_SERVER_QUEUE_CAPACITY", &value)? as usize;
        }

        let log_level = read_env("NUMERA_LOGGING_LEVEL").or_else(|| read_env("NUMERA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("NUMERA_LOGGING_FORMAT").or_else(|| read_env("NUMERA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.telegram.webhook_secret = secret_value(webhook_secret);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(data_dir) = overrides.data_dir {
            self.storage.data_dir = data_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("numera.toml"), PathBuf::from("config/numera.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get it from @BotFather".to_string(),
        ));
    }
    if !bot_token.contains(':') {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot-id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if telegram.webhook_secret.expose_secret().is_empty() {
        return Err(ConfigError::Validation(
            "telegram.webhook_secret is required; it must match the secret_token passed to setWebhook"
                .to_string(),
        ));
    }

    if !telegram.api_base_url.starts_with("http://")
        && !telegram.api_base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_key is required".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.queue_capacity == 0 {
        return Err(ConfigError::Validation(
            "server.queue_capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_admin_ids(key: &str, value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    storage: Option<StoragePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    webhook_secret: Option<String>,
    api_base_url: Option<String>,
    admin_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    queue_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn required_tokens() -> ConfigOverrides {
        ConfigOverrides {
            bot_token: Some("12345:test-token".to_string()),
            webhook_secret: Some("hook-secret".to_string()),
            llm_api_key: Some("gsk-test".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_NUMERA_BOT_TOKEN", "98765:from-env");
        env::set_var("TEST_NUMERA_HOOK_SECRET", "hook-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("numera.toml");
            fs::write(
                &path,
                r#"
[telegram]
bot_token = "${TEST_NUMERA_BOT_TOKEN}"
webhook_secret = "${TEST_NUMERA_HOOK_SECRET}"

[llm]
api_key = "gsk-file"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.telegram.bot_token.expose_secret() == "98765:from-env",
                "bot token should be loaded from environment",
            )?;
            ensure(
                config.telegram.webhook_secret.expose_secret() == "hook-from-env",
                "webhook secret should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_NUMERA_BOT_TOKEN", "TEST_NUMERA_HOOK_SECRET"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("NUMERA_LLM_MODEL", "model-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("numera.toml");
            fs::write(
                &path,
                r#"
[telegram]
bot_token = "12345:from-file"
webhook_secret = "hook-from-file"

[llm]
api_key = "gsk-from-file"
model = "model-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.model == "model-from-env", "env model should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(
                config.telegram.bot_token.expose_secret() == "12345:from-file",
                "file bot token should win over defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["NUMERA_LLM_MODEL"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("token-without-colon".to_string()),
                webhook_secret: Some("hook".to_string()),
                llm_api_key: Some("gsk-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("telegram.bot_token")
        );
        ensure(has_message, "validation failure should mention telegram.bot_token")
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("12345:very-secret".to_string()),
                webhook_secret: Some("hook-very-secret".to_string()),
                llm_api_key: Some("gsk-very-secret".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        let debug = format!("{config:?}");
        ensure(!debug.contains("very-secret"), "debug output should not contain secrets")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn defaults_match_the_documented_collaborator() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: required_tokens(),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.llm.base_url == "https://api.groq.com/openai/v1",
            "default llm base url should target the chat-completions API",
        )?;
        ensure(config.llm.timeout_secs == 90, "default llm timeout should be 90s")?;
        ensure(config.server.queue_capacity == 256, "default queue capacity should be 256")
    }
}
