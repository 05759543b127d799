//! Configuration management for Annota Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

use crate::export::StrokeMode;
use crate::session::DEFAULT_IDLE_MINUTES;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub export: ExportConfig,
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted document, in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// TrueType/OpenType font to embed; standard Helvetica when unset
    pub font_path: Option<PathBuf>,
    /// Download name of the exported file
    pub file_name: String,
    pub stroke_mode: StrokeMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub idle_minutes: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_mb: 100,
            },
            export: ExportConfig {
                font_path: None,
                file_name: "edited.pdf".to_string(),
                stroke_mode: StrokeMode::Dots,
            },
            sessions: SessionConfig { idle_minutes: DEFAULT_IDLE_MINUTES },
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 3000)?,
                max_upload_mb: parse_var("MAX_UPLOAD_MB", 100)?,
            },
            export: ExportConfig {
                font_path: env::var("FONT_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
                file_name: env::var("EXPORT_FILE_NAME")
                    .ok()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "edited.pdf".to_string()),
                stroke_mode: parse_var("EXPORT_STROKE_MODE", StrokeMode::Dots)?,
            },
            sessions: SessionConfig {
                idle_minutes: parse_var("SESSION_IDLE_MINUTES", DEFAULT_IDLE_MINUTES)?,
            },
        })
    }
}
