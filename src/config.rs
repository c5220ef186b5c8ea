use crate::error::{LeadError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const CONFIG_DIR_NAME: &str = "maps-lead-finder";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub map_grounding: bool,
    pub request_timeout: u64,
    pub export_dir: PathBuf,
    pub debug_enabled: bool,
    pub log_level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = env_opt("LEADS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        validate_url(&api_url)?;

        let api_key = env_opt("GEMINI_API_KEY")
            .or_else(|| env_opt("API_KEY"))
            .ok_or_else(missing_key)?
            .trim()
            .to_string();

        let persisted = read_persisted_config();

        let model = persisted.model.clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env_opt("LEADS_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.into());

        Ok(Self {
            api_url: api_url.trim().trim_end_matches('/').to_string(),
            api_key,
            model,
            map_grounding: env_bool_or("LEADS_MAP_GROUNDING", true),
            request_timeout: env_u64_range("LEADS_REQUEST_TIMEOUT", 120, 5, 600)?,
            export_dir: env_opt("LEADS_EXPORT_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            debug_enabled: env_bool_or("LEADS_DEBUG", false),
            log_level: log_level(),
        })
    }

    pub fn save_model(model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(LeadError::ConfigInvalid("Model name cannot be empty".into()));
        }
        let mut cfg = read_persisted_config();
        cfg.model = Some(model.into());
        write_config_atomic(&cfg)
    }

    pub fn mask_api_key(&self) -> String {
        mask_key(&self.api_key)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    pub fn config_file_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }
}

/// Log level from `LEADS_LOG_LEVEL`, upper-cased; `INFO` when unset.
pub fn log_level() -> String {
    env_opt("LEADS_LOG_LEVEL").unwrap_or_else(|| "INFO".into()).to_uppercase()
}

fn missing_key() -> LeadError {
    LeadError::ConfigMissing(
        "GEMINI_API_KEY not configured.\nPlease configure with:\nclaude mcp add-json maps-lead-finder --scope user \
        '{\"type\":\"stdio\",\"command\":\"maps-lead-finder\",\"env\":{\"GEMINI_API_KEY\":\"your-key\"}}'"
            .into(),
    )
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_bool_or(name: &str, default: bool) -> bool {
    env_opt(name).map(|v| parse_bool(&v)).unwrap_or(default)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn env_u64_range(name: &str, default: u64, min: u64, max: u64) -> Result<u64> {
    let Some(raw) = env_opt(name) else { return Ok(default) };
    parse_u64_range(name, &raw, min, max)
}

fn parse_u64_range(name: &str, raw: &str, min: u64, max: u64) -> Result<u64> {
    let err = || LeadError::ConfigInvalid(format!("{name} must be an integer between {min} and {max}"));
    let val: u64 = raw.trim().parse().map_err(|_| err())?;
    if !(min..=max).contains(&val) {
        return Err(err());
    }
    Ok(val)
}

fn validate_url(url: &str) -> Result<()> {
    let url = url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(LeadError::ConfigInvalid("LEADS_API_URL must be a valid http or https URL".into()));
    }
    Ok(())
}

fn read_persisted_config() -> PersistedConfig {
    let path = Config::config_file_path();
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn write_config_atomic(cfg: &PersistedConfig) -> Result<()> {
    let path = Config::config_file_path();
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    std::fs::create_dir_all(&dir).map_err(|e| LeadError::ConfigFile {
        path: dir.clone(),
        message: e.to_string(),
    })?;

    let tmp = dir.join(format!(".config.tmp.{}", std::process::id()));
    let data = serde_json::to_string_pretty(cfg)?;

    std::fs::write(&tmp, format!("{data}\n")).map_err(|e| LeadError::ConfigFile {
        path: tmp.clone(),
        message: e.to_string(),
    })?;

    std::fs::rename(&tmp, &path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        LeadError::ConfigFile { path, message: e.to_string() }
    })
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 8 {
        return "********".into();
    }
    let first: String = chars[..4].iter().collect();
    let last: String = chars[chars.len()-4..].iter().collect();
    format!("{first}********{last}")
}
