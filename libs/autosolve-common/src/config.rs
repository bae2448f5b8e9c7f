// Solver configuration
// Loaded from config/solver.json with environment overrides on top
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/solver.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Language named in the prompt
    pub language: String,
    pub max_attempts: u32,
    pub default_retry_after_secs: u64,
    pub max_retry_after_secs: u64,
    pub request_timeout_secs: u64,
    /// Never serialized; comes from API_KEY only
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hyperbolic.xyz/v1/chat/completions".to_string(),
            model: "meta-llama/Llama-3.3-70B-Instruct".to_string(),
            max_tokens: 512,
            language: "Python".to_string(),
            max_attempts: 5,
            default_retry_after_secs: 1,
            max_retry_after_secs: 60,
            request_timeout_secs: 60,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxBackend {
    Docker,
    Process,
}

impl FromStr for SandboxBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "docker" => Ok(SandboxBackend::Docker),
            "process" => Ok(SandboxBackend::Process),
            other => bail!("Invalid sandbox backend '{}' (expected docker or process)", other),
        }
    }
}

impl fmt::Display for SandboxBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SandboxBackend::Docker => write!(f, "docker"),
            SandboxBackend::Process => write!(f, "process"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub backend: SandboxBackend,
    /// Container image for the docker backend
    pub image: String,
    /// Interpreter command; the program file path is appended as the last argument
    pub interpreter: Vec<String>,
    pub file_name: String,
    pub timeout_ms: u64,
    pub memory_limit_mb: u32,
    pub cpu_limit: f32,
    pub max_output_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            backend: SandboxBackend::Docker,
            image: "python:3.12-slim".to_string(),
            interpreter: vec!["python3".to_string(), "-u".to_string()],
            file_name: "main.py".to_string(),
            timeout_ms: 10_000,
            memory_limit_mb: 256,
            cpu_limit: 0.5,
            max_output_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub batch_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            batch_timeout_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub generation: GenerationConfig,
    pub sandbox: SandboxConfig,
    pub server: ServerConfig,
}

impl SolverConfig {
    /// Load configuration from a JSON file. A missing file yields defaults.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            warn!(
                path = %config_path.display(),
                "Solver config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: SolverConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        info!(path = %config_path.display(), "Loaded solver config");
        Ok(config)
    }

    /// Load from SOLVER_CONFIG or config/solver.json, apply env overrides, validate
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("SOLVER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY").filter(|k| !k.trim().is_empty()) {
            self.generation.api_key = Some(key);
        }
        if let Some(url) = lookup("GENERATION_BASE_URL") {
            self.generation.base_url = url;
        }
        if let Some(model) = lookup("GENERATION_MODEL") {
            self.generation.model = model;
        }
        if let Some(backend) = lookup("SANDBOX_BACKEND") {
            self.sandbox.backend = backend.parse()?;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.max_attempts == 0 {
            bail!("generation.max_attempts must be at least 1");
        }
        if self.generation.base_url.trim().is_empty() {
            bail!("generation.base_url must not be empty");
        }
        if self.sandbox.timeout_ms == 0 {
            bail!("sandbox.timeout_ms must be greater than zero");
        }
        if self.sandbox.interpreter.is_empty() || self.sandbox.interpreter[0].trim().is_empty() {
            bail!("sandbox.interpreter must name a command");
        }
        if self.sandbox.file_name.trim().is_empty() || self.sandbox.file_name.contains('/') {
            bail!("sandbox.file_name must be a plain file name");
        }
        if self.sandbox.memory_limit_mb == 0 {
            bail!("sandbox.memory_limit_mb must be greater than zero");
        }
        Ok(())
    }

    /// Write this configuration as pretty JSON, creating parent directories
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize solver config")?;
        fs::write(config_path, json)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SolverConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.generation.max_attempts, 5);
        assert_eq!(config.generation.max_tokens, 512);
        assert_eq!(config.sandbox.backend, SandboxBackend::Docker);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        fs::write(&path, r#"{"sandbox": {"backend": "process", "timeout_ms": 2000}}"#).unwrap();

        let config = SolverConfig::load(&path).unwrap();
        assert_eq!(config.sandbox.backend, SandboxBackend::Process);
        assert_eq!(config.sandbox.timeout_ms, 2000);
        assert_eq!(config.sandbox.file_name, "main.py");
        assert_eq!(config.generation.model, "meta-llama/Llama-3.3-70B-Instruct");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(SolverConfig::load(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("API_KEY", "secret"),
            ("GENERATION_MODEL", "tiny-model"),
            ("SANDBOX_BACKEND", "Process"),
        ]
        .into_iter()
        .collect();

        let mut config = SolverConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
        assert_eq!(config.generation.model, "tiny-model");
        assert_eq!(config.sandbox.backend, SandboxBackend::Process);
    }

    #[test]
    fn test_bad_backend_override_rejected() {
        let mut config = SolverConfig::default();
        let result = config.apply_overrides(|key| (key == "SANDBOX_BACKEND").then(|| "vm".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = SolverConfig::default();
        assert!(config.validate().is_ok());

        config.generation.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.sandbox.interpreter.clear();
        assert!(config.validate().is_err());

        let mut config = SolverConfig::default();
        config.sandbox.file_name = "../escape.py".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_round_trip_skips_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("solver.json");

        let mut config = SolverConfig::default();
        config.generation.api_key = Some("secret".to_string());
        config.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("secret"));

        let loaded = SolverConfig::load(&path).unwrap();
        assert!(loaded.generation.api_key.is_none());
    }
}
