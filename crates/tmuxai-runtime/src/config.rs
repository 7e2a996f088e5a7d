//! TOML configuration with environment overrides and typed per-session
//! overrides.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: ConfigKey,
        value: String,
        expected: &'static str,
    },

    #[error("HOME is not set")]
    NoHome,
}

// ─── Schema ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub max_capture_lines: u32,
    pub max_context_size: usize,
    pub wait_interval: u64,
    pub send_keys_confirm: bool,
    pub paste_multiline_confirm: bool,
    pub exec_confirm: bool,
    pub whitelist_patterns: Vec<String>,
    pub blacklist_patterns: Vec<String>,
    pub max_turns: usize,
    pub max_corrections: usize,
    pub openrouter: OpenRouterConfig,
    pub prompts: PromptsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            max_capture_lines: 200,
            max_context_size: 20_000,
            wait_interval: 5,
            send_keys_confirm: true,
            paste_multiline_confirm: true,
            exec_confirm: true,
            whitelist_patterns: Vec::new(),
            blacklist_patterns: Vec::new(),
            max_turns: 30,
            max_corrections: 5,
            openrouter: OpenRouterConfig::default(),
            prompts: PromptsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "google/gemini-2.5-flash-preview".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        }
    }
}

/// Custom prompt text. An empty field keeps the built-in prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub base_system: String,
    pub chat_assistant: String,
    pub chat_assistant_prepared: String,
    pub watch: String,
}

// ─── Loading ──────────────────────────────────────────────────────

/// `~/.config/tmuxai`, where the user config, log and debug dumps live.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config").join("tmuxai"))
}

impl Config {
    /// Load `./config.toml`, else `~/.config/tmuxai/config.toml`, else
    /// defaults; then apply `TMUXAI_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut candidates = vec![PathBuf::from("config.toml")];
        if let Ok(dir) = config_dir() {
            candidates.push(dir.join("config.toml"));
        }
        let mut config = match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("TMUXAI_OPENROUTER_API_KEY") {
            self.openrouter.api_key = key;
        }
        if let Some(model) = lookup("TMUXAI_OPENROUTER_MODEL") {
            self.openrouter.model = model;
        }
        if let Some(url) = lookup("TMUXAI_OPENROUTER_BASE_URL") {
            self.openrouter.base_url = url;
        }
        if let Some(debug) = lookup("TMUXAI_DEBUG") {
            self.debug = matches!(debug.trim(), "1" | "true" | "TRUE" | "True");
        }
    }

    pub fn confirm_for(&self, kind: tmuxai_core::ActionKind) -> bool {
        use tmuxai_core::ActionKind;
        match kind {
            ActionKind::ExecCommand | ActionKind::ExecAndWait => self.exec_confirm,
            ActionKind::SendKeys => self.send_keys_confirm,
            ActionKind::PasteMultiline => self.paste_multiline_confirm,
        }
    }
}

// ─── Session overrides ────────────────────────────────────────────

/// Keys `/config set` may change for the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MaxCaptureLines,
    MaxContextSize,
    WaitInterval,
    SendKeysConfirm,
    PasteMultilineConfirm,
    ExecConfirm,
    MaxTurns,
    MaxCorrections,
    OpenRouterModel,
}

impl ConfigKey {
    pub const ALL: [Self; 9] = [
        Self::MaxCaptureLines,
        Self::MaxContextSize,
        Self::WaitInterval,
        Self::SendKeysConfirm,
        Self::PasteMultilineConfirm,
        Self::ExecConfirm,
        Self::MaxTurns,
        Self::MaxCorrections,
        Self::OpenRouterModel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MaxCaptureLines => "max_capture_lines",
            Self::MaxContextSize => "max_context_size",
            Self::WaitInterval => "wait_interval",
            Self::SendKeysConfirm => "send_keys_confirm",
            Self::PasteMultilineConfirm => "paste_multiline_confirm",
            Self::ExecConfirm => "exec_confirm",
            Self::MaxTurns => "max_turns",
            Self::MaxCorrections => "max_corrections",
            Self::OpenRouterModel => "openrouter.model",
        }
    }

    /// Current value rendered as text.
    pub fn get(self, config: &Config) -> String {
        match self {
            Self::MaxCaptureLines => config.max_capture_lines.to_string(),
            Self::MaxContextSize => config.max_context_size.to_string(),
            Self::WaitInterval => config.wait_interval.to_string(),
            Self::SendKeysConfirm => config.send_keys_confirm.to_string(),
            Self::PasteMultilineConfirm => config.paste_multiline_confirm.to_string(),
            Self::ExecConfirm => config.exec_confirm.to_string(),
            Self::MaxTurns => config.max_turns.to_string(),
            Self::MaxCorrections => config.max_corrections.to_string(),
            Self::OpenRouterModel => config.openrouter.model.clone(),
        }
    }

    /// Parse `value` with this key's type and store it.
    pub fn set(self, config: &mut Config, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::MaxCaptureLines => config.max_capture_lines = self.parse_positive(value)?,
            Self::MaxContextSize => config.max_context_size = self.parse_positive(value)?,
            Self::WaitInterval => config.wait_interval = self.parse(value, "seconds")?,
            Self::SendKeysConfirm => config.send_keys_confirm = self.parse_bool(value)?,
            Self::PasteMultilineConfirm => config.paste_multiline_confirm = self.parse_bool(value)?,
            Self::ExecConfirm => config.exec_confirm = self.parse_bool(value)?,
            Self::MaxTurns => config.max_turns = self.parse_positive(value)?,
            Self::MaxCorrections => config.max_corrections = self.parse_positive(value)?,
            Self::OpenRouterModel => {
                if value.is_empty() {
                    return Err(self.invalid(value, "a model name"));
                }
                config.openrouter.model = value.to_string();
            }
        }
        Ok(())
    }

    fn parse<T: FromStr>(self, value: &str, expected: &'static str) -> Result<T, ConfigError> {
        value.parse().map_err(|_| self.invalid(value, expected))
    }

    fn parse_positive<T: FromStr + PartialOrd + Default>(self, value: &str) -> Result<T, ConfigError> {
        let n: T = self.parse(value, "a positive integer")?;
        if n > T::default() {
            Ok(n)
        } else {
            Err(self.invalid(value, "a positive integer"))
        }
    }

    fn parse_bool(self, value: &str) -> Result<bool, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(self.invalid(value, "true or false")),
        }
    }

    fn invalid(self, value: &str, expected: &'static str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self,
            value: value.to_string(),
            expected,
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.max_capture_lines, 200);
        assert_eq!(c.max_context_size, 20_000);
        assert_eq!(c.wait_interval, 5);
        assert!(c.exec_confirm && c.send_keys_confirm && c.paste_multiline_confirm);
        assert_eq!(c.max_turns, 30);
        assert_eq!(c.max_corrections, 5);
        assert_eq!(c.openrouter.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "wait_interval = 9\nwhitelist_patterns = [\"^ls\"]\n\n[openrouter]\nmodel = \"x/y\"\n"
        )
        .expect("write");
        let c = Config::from_file(file.path()).expect("should parse");
        assert_eq!(c.wait_interval, 9);
        assert_eq!(c.whitelist_patterns, vec!["^ls"]);
        assert_eq!(c.openrouter.model, "x/y");
        assert_eq!(c.openrouter.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(c.max_capture_lines, 200);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "wait_interval = \"soon\"").expect("write");
        let err = Config::from_file(file.path()).expect_err("bad type");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides() {
        let mut c = Config::default();
        c.apply_env(|k| match k {
            "TMUXAI_OPENROUTER_API_KEY" => Some("sk-test".into()),
            "TMUXAI_DEBUG" => Some("true".into()),
            _ => None,
        });
        assert_eq!(c.openrouter.api_key, "sk-test");
        assert!(c.debug);
        assert_eq!(c.openrouter.model, "google/gemini-2.5-flash-preview");
    }

    #[test]
    fn typed_setters() {
        let mut c = Config::default();
        ConfigKey::MaxCaptureLines.set(&mut c, "500").expect("int");
        ConfigKey::ExecConfirm.set(&mut c, "false").expect("bool");
        ConfigKey::OpenRouterModel.set(&mut c, "anthropic/claude").expect("str");
        assert_eq!(c.max_capture_lines, 500);
        assert!(!c.exec_confirm);
        assert_eq!(ConfigKey::OpenRouterModel.get(&c), "anthropic/claude");
    }

    #[test]
    fn unknown_key_rejected() {
        let err = "openrouter.api_key".parse::<ConfigKey>().expect_err("not settable");
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn badly_typed_value_rejected() {
        let mut c = Config::default();
        let err = ConfigKey::WaitInterval.set(&mut c, "-3").expect_err("negative");
        assert!(err.to_string().contains("wait_interval"));
        assert!(ConfigKey::SendKeysConfirm.set(&mut c, "maybe").is_err());
        assert_eq!(c, Config::default());
    }

    #[test]
    fn zero_limits_rejected() {
        let mut c = Config::default();
        for key in [
            ConfigKey::MaxTurns,
            ConfigKey::MaxCorrections,
            ConfigKey::MaxCaptureLines,
            ConfigKey::MaxContextSize,
        ] {
            let err = key.set(&mut c, "0").expect_err("zero");
            assert!(err.to_string().contains("a positive integer"), "{key}: {err}");
        }
        assert_eq!(c, Config::default());
        ConfigKey::MaxTurns.set(&mut c, "1").expect("one is fine");
        assert_eq!(c.max_turns, 1);
    }

    #[test]
    fn key_names_roundtrip() {
        for key in ConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ConfigKey>().expect("known"), key);
        }
    }
}
