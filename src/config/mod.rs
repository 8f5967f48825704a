use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const PROJECT_CONFIG_DIR: &str = ".smart-task";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_COMPLEXITY_THRESHOLD: u32 = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Scores at or above this are decomposed
    pub complexity_threshold: u32,
    pub ai_enabled: bool,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
    pub respect_retry_after: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            max_retries: 0,
            retry_base_ms: 500,
            retry_jitter_ms: 250,
            respect_retry_after: true,
            temperature: 0.3,
            max_tokens: 800,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            complexity_threshold: DEFAULT_COMPLEXITY_THRESHOLD,
            ai_enabled: true,
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub complexity_threshold: Option<u32>,
    pub ai_enabled: Option<bool>,
    pub llm: Option<PartialLlmConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLlmConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_ms: Option<u64>,
    pub retry_jitter_ms: Option<u64>,
    pub respect_retry_after: Option<bool>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl PartialLlmConfig {
    /// Fields set in `self` win over `other`.
    fn or(self, other: PartialLlmConfig) -> PartialLlmConfig {
        PartialLlmConfig {
            connect_timeout_ms: self.connect_timeout_ms.or(other.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.or(other.request_timeout_ms),
            max_retries: self.max_retries.or(other.max_retries),
            retry_base_ms: self.retry_base_ms.or(other.retry_base_ms),
            retry_jitter_ms: self.retry_jitter_ms.or(other.retry_jitter_ms),
            respect_retry_after: self.respect_retry_after.or(other.respect_retry_after),
            temperature: self.temperature.or(other.temperature),
            max_tokens: self.max_tokens.or(other.max_tokens),
        }
    }

    fn resolve(self) -> LlmConfig {
        let d = LlmConfig::default();
        LlmConfig {
            connect_timeout_ms: self.connect_timeout_ms.unwrap_or(d.connect_timeout_ms),
            request_timeout_ms: self.request_timeout_ms.unwrap_or(d.request_timeout_ms),
            max_retries: self.max_retries.unwrap_or(d.max_retries),
            retry_base_ms: self.retry_base_ms.unwrap_or(d.retry_base_ms),
            retry_jitter_ms: self.retry_jitter_ms.unwrap_or(d.retry_jitter_ms),
            respect_retry_after: self.respect_retry_after.unwrap_or(d.respect_retry_after),
            temperature: self.temperature.unwrap_or(d.temperature),
            max_tokens: self.max_tokens.unwrap_or(d.max_tokens),
        }
    }
}

/// Values taken from the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub complexity_threshold: Option<u32>,
    pub no_ai: bool,
}

/// Environment lookup, injectable so tests need not touch the process env.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_cli(cli: CliOverrides) -> Result<Self> {
        let project_root = std::env::current_dir().context("resolve current dir")?;
        let project_cfg = load_project_config(&project_root).unwrap_or_default();
        let file_cfg = load_file_config().unwrap_or_default();
        Ok(Self::resolve(cli, &process_env, project_cfg, file_cfg))
    }

    /// Merges CLI > env > project file > global file > defaults.
    pub fn resolve(
        cli: CliOverrides,
        env: EnvLookup<'_>,
        project_cfg: FileConfig,
        file_cfg: FileConfig,
    ) -> Self {
        let api_key = cli
            .api_key
            .or_else(|| env("SMART_TASK_API_KEY"))
            .or_else(|| env("OPENAI_API_KEY"))
            .or(project_cfg.api_key)
            .or(file_cfg.api_key);
        let base_url = cli
            .base_url
            .or_else(|| env("SMART_TASK_BASE_URL"))
            .or(project_cfg.base_url)
            .or(file_cfg.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = cli
            .model
            .or_else(|| env("SMART_TASK_MODEL"))
            .or(project_cfg.model)
            .or(file_cfg.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let complexity_threshold = cli
            .complexity_threshold
            .or_else(|| {
                env("SMART_TASK_THRESHOLD").and_then(|v| match v.trim().parse::<u32>() {
                    Ok(n) => Some(n),
                    Err(e) => {
                        warn!(value=%v, error=%e, "ignoring invalid SMART_TASK_THRESHOLD");
                        None
                    }
                })
            })
            .or(project_cfg.complexity_threshold)
            .or(file_cfg.complexity_threshold)
            .unwrap_or(DEFAULT_COMPLEXITY_THRESHOLD);

        let ai_enabled = if cli.no_ai {
            false
        } else {
            env("SMART_TASK_AI")
                .and_then(|v| parse_bool(&v))
                .or(project_cfg.ai_enabled)
                .or(file_cfg.ai_enabled)
                .unwrap_or(true)
        };

        let llm = project_cfg
            .llm
            .unwrap_or_default()
            .or(file_cfg.llm.unwrap_or_default())
            .resolve();

        Self {
            base_url,
            model,
            api_key,
            complexity_threshold,
            ai_enabled,
            llm,
        }
    }
}

pub fn load_file_config() -> Result<FileConfig> {
    use std::env;

    fn candidate_paths() -> Vec<PathBuf> {
        let mut v = Vec::new();
        if let Ok(p) = env::var("SMART_TASK_CONFIG") {
            v.push(PathBuf::from(p));
        }
        if let Ok(xdg_home) = env::var("XDG_CONFIG_HOME") {
            v.push(Path::new(&xdg_home).join("smart-task/config.toml"));
        } else if let Ok(home) = env::var("HOME") {
            v.push(Path::new(&home).join(".config/smart-task/config.toml"));
        }
        if let Ok(dirs) = env::var("XDG_CONFIG_DIRS") {
            for d in dirs.split(':') {
                if !d.is_empty() {
                    v.push(Path::new(d).join("smart-task/config.toml"));
                }
            }
        }
        v
    }

    for p in candidate_paths() {
        if let Some(cfg) = read_config_file(&p)? {
            return Ok(cfg);
        }
    }
    Ok(FileConfig::default())
}

/// Load project-specific configuration from .smart-task/config.toml
pub fn load_project_config(project_root: &Path) -> Result<FileConfig> {
    let path = project_root.join(PROJECT_CONFIG_DIR).join("config.toml");
    Ok(read_config_file(&path)?.unwrap_or_default())
}

/// `Ok(None)` when the file is missing or does not parse.
fn read_config_file(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("read config file: {}", path.display()))?;
    match toml::from_str::<FileConfig>(&s) {
        Ok(cfg) => {
            info!(path=%path.display(), "loaded config file");
            Ok(Some(cfg))
        }
        Err(e) => {
            warn!(path=%path.display(), error=%e.to_string(), "parse config failed");
            Ok(None)
        }
    }
}
