use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LANGUAGE: &str = "ja";
pub const DEFAULT_SILENCE_DURATION_SEC: u32 = 10; // silencedetect d=
pub const DEFAULT_SILENCE_NOISE_DB: i32 = -10; // silencedetect n=
pub const DEFAULT_LOOP_DURATION_SEC: u32 = 30;

/// Top-level config (scribe.toml + SCRIBE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub patch: PatchConfig,
}

/// Where per-video working directories live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

/// Read-only video catalog (SQLite file owned by the crawler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

/// Execution record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Idle back-off between polls when nothing is runnable.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Bypass the idempotency filter and re-run every scheduled job once.
    #[serde(default)]
    pub force_execute: bool,
    /// Stop each video's pipeline after audio extraction.
    #[serde(default)]
    pub download_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            force_execute: false,
            download_only: false,
        }
    }
}

/// External binaries and their fixed arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// whisper.cpp `main` binary. Defaults to `$WHISPER_ROOT/main`.
    #[serde(default = "default_whisper_bin")]
    pub whisper_bin: String,
    /// Defaults to `$WHISPER_ROOT/models/ggml-large.bin`.
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_silence_duration_sec")]
    pub silence_duration_sec: u32,
    #[serde(default = "default_silence_noise_db")]
    pub silence_noise_db: i32,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            whisper_bin: default_whisper_bin(),
            whisper_model: default_whisper_model(),
            language: default_language(),
            silence_duration_sec: DEFAULT_SILENCE_DURATION_SEC,
            silence_noise_db: DEFAULT_SILENCE_NOISE_DB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Minimum span of a repeated-text run before it is flagged as a loop.
    #[serde(default = "default_loop_duration_sec")]
    pub loop_duration_sec: u32,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            loop_duration_sec: DEFAULT_LOOP_DURATION_SEC,
        }
    }
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}
fn whisper_root() -> String {
    std::env::var("WHISPER_ROOT").unwrap_or_else(|_| "./whisper.cpp".to_string())
}
fn default_workspace_root() -> String {
    "./out/transcript".to_string()
}
fn default_catalog_path() -> String {
    format!("{}/.scribe/catalog.db", home_dir())
}
fn default_db_path() -> String {
    format!("{}/.scribe/scribe.db", home_dir())
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}
fn default_whisper_bin() -> String {
    format!("{}/main", whisper_root())
}
fn default_whisper_model() -> String {
    format!("{}/models/ggml-large.bin", whisper_root())
}
fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
fn default_silence_duration_sec() -> u32 {
    DEFAULT_SILENCE_DURATION_SEC
}
fn default_silence_noise_db() -> i32 {
    DEFAULT_SILENCE_NOISE_DB
}
fn default_loop_duration_sec() -> u32 {
    DEFAULT_LOOP_DURATION_SEC
}

impl ScribeConfig {
    /// Load config from a TOML file with SCRIBE_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SCRIBE_ENGINE__POLL_INTERVAL_SECS=60`. A missing file is not an error;
    /// every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ScribeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SCRIBE_").split("__"))
            .extract()
            .map_err(|e| crate::error::ScribeError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/.scribe/scribe.toml", home_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        let config = ScribeConfig::load(path.to_str()).expect("load");
        assert_eq!(config.engine.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(!config.engine.force_execute);
        assert_eq!(config.tools.language, "ja");
        assert_eq!(config.patch.loop_duration_sec, 30);
    }

    #[test]
    fn toml_sections_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scribe.toml");
        fs::write(
            &path,
            r#"
            [workspace]
            root = "/data/transcripts"

            [engine]
            poll_interval_secs = 60
            download_only = true

            [tools]
            ffmpeg = "/opt/ffmpeg/bin/ffmpeg"
            silence_noise_db = -30
            "#,
        )
        .expect("write");

        let config = ScribeConfig::load(path.to_str()).expect("load");
        assert_eq!(config.workspace.root, "/data/transcripts");
        assert_eq!(config.engine.poll_interval_secs, 60);
        assert!(config.engine.download_only);
        assert_eq!(config.tools.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tools.silence_noise_db, -30);
        assert_eq!(config.tools.silence_duration_sec, 10);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scribe.toml");
        fs::write(&path, "[engine]\npoll_interval_secs = \"soon\"\n").expect("write");

        let err = ScribeConfig::load(path.to_str()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
