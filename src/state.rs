//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::export::{ExportOptions, FileFontSource, FontSource, StandardFontSource};
use crate::session::SessionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pub config: Config,
    pub sessions: SessionManager,
    pub fonts: Arc<dyn FontSource>,
}

impl AppState {
    /// Create application state, picking the font source from the config
    pub fn new(config: Config) -> Self {
        let fonts: Arc<dyn FontSource> = match &config.export.font_path {
            Some(path) => Arc::new(FileFontSource::new(path)),
            None => Arc::new(StandardFontSource),
        };
        Self::with_font_source(config, fonts)
    }

    /// Create application state with an explicit font source
    pub fn with_font_source(config: Config, fonts: Arc<dyn FontSource>) -> Self {
        let sessions = SessionManager::with_idle_minutes(config.sessions.idle_minutes);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                fonts,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get the export font source
    pub fn fonts(&self) -> Arc<dyn FontSource> {
        Arc::clone(&self.inner.fonts)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            stroke_mode: self.inner.config.export.stroke_mode,
        }
    }
}
