//! Editor Session Manager
//!
//! Manages editor sessions with:
//! - In-memory session storage behind a tokio `RwLock`
//! - Idle session expiry with a background cleanup task
//! - Export orchestration (busy flag, blocking compositor, notifications)

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::editor::{EditorSession, ExportJob};
use super::types::{SessionError, SessionSummary};
use crate::export::{composite, ExportError, ExportOptions, FontSource};
use crate::geometry::RenderedLayout;
use crate::overlay::RenderError;

/// Default idle time before a session is purged: 2 hours
pub const DEFAULT_IDLE_MINUTES: i64 = 120;

/// How often the cleanup task runs
const CLEANUP_INTERVAL_SECS: u64 = 300;

// ============================================================================
// Session Manager
// ============================================================================

/// Owns every editor session
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

struct SessionManagerInner {
    /// Active sessions indexed by ID
    sessions: RwLock<HashMap<Uuid, EditorSession>>,

    /// Sessions untouched for longer than this are purged
    idle_ttl: chrono::Duration,
}

impl SessionManager {
    /// Create a new session manager with the default idle timeout
    pub fn new() -> Self {
        Self::with_idle_minutes(DEFAULT_IDLE_MINUTES)
    }

    /// Create a new session manager with a custom idle timeout
    pub fn with_idle_minutes(minutes: i64) -> Self {
        Self {
            inner: Arc::new(SessionManagerInner {
                sessions: RwLock::new(HashMap::new()),
                idle_ttl: chrono::Duration::minutes(minutes.max(1)),
            }),
        }
    }

    // ========================================================================
    // Session Lifecycle
    // ========================================================================

    /// Create a new, empty session
    pub async fn create_session(&self) -> SessionSummary {
        let session = EditorSession::new();
        let summary = session.summary();

        let mut sessions = self.inner.sessions.write().await;
        sessions.insert(session.id(), session);

        tracing::info!(session_id = %summary.id, "Created editor session");
        summary
    }

    /// Remove a session and everything in it
    pub async fn remove_session(&self, id: Uuid) -> Result<(), SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        sessions
            .remove(&id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        tracing::info!(session_id = %id, "Removed editor session");
        Ok(())
    }

    /// Run `f` against a session, marking it active
    pub async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut EditorSession) -> T,
    ) -> Result<T, SessionError> {
        let mut sessions = self.inner.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.touch();
        Ok(f(session))
    }

    /// Read from a session without marking it active
    pub async fn read_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&EditorSession) -> T,
    ) -> Result<T, SessionError> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .get(&id)
            .map(f)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        let sessions = self.inner.sessions.read().await;
        sessions.len()
    }

    // ========================================================================
    // Overlay
    // ========================================================================

    /// Render the session's ink overlay as PNG.
    ///
    /// Strokes are copied under the read lock; rasterizing and encoding run
    /// on a blocking thread with no lock held.
    pub async fn render_overlay(&self, id: Uuid) -> Result<Vec<u8>, SessionError> {
        let frame = self.read_session(id, |s| s.overlay_frame()).await??;
        let png = tokio::task::spawn_blocking(move || frame.to_png())
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;
        Ok(png)
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Composite the session's annotations into its document.
    ///
    /// The session lock is held only to claim the export slot and to record
    /// the result; the PDF work runs on a blocking thread against a snapshot.
    /// The export runs in its own task, so a client that disconnects midway
    /// cannot leave the slot claimed. Every export that starts ends with
    /// exactly one notification.
    pub async fn export(
        &self,
        id: Uuid,
        layout: Option<RenderedLayout>,
        fonts: Arc<dyn FontSource>,
        options: ExportOptions,
    ) -> Result<Vec<u8>, SessionError> {
        let job = self.with_session(id, |s| s.begin_export(layout)).await??;

        tracing::debug!(
            session_id = %id,
            annotations = job.snapshot.len(),
            font = %fonts.describe(),
            "Starting export"
        );

        let manager = self.clone();
        let task = tokio::spawn(async move {
            let result = run_export(job, fonts.as_ref(), options).await;
            match &result {
                Ok(bytes) => tracing::info!(session_id = %id, size = bytes.len(), "Export complete"),
                Err(e) => tracing::error!(session_id = %id, error = %e, "Export failed"),
            }
            if manager
                .with_session(id, |s| s.finish_export(&result))
                .await
                .is_err()
            {
                tracing::warn!(session_id = %id, "Session removed during export");
            }
            result
        });

        let result = task
            .await
            .map_err(|e| SessionError::Export(ExportError::Task(e.to_string())))?;
        Ok(result?)
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Clean up idle sessions
    ///
    /// Returns the number of sessions cleaned up
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = self.inner.idle_ttl;

        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = session.is_idle(ttl, now);
            if idle {
                tracing::debug!(session_id = %id, "Cleaned up idle session");
            }
            !idle
        });
        let count = before - sessions.len();

        if count > 0 {
            tracing::info!(count = count, "Cleaned up idle editor sessions");
        }

        count
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_export(
    job: ExportJob,
    fonts: &dyn FontSource,
    options: ExportOptions,
) -> Result<Vec<u8>, ExportError> {
    let font = fonts.fetch().await?;
    tokio::task::spawn_blocking(move || {
        composite(&job.pdf, &job.snapshot, job.layout, font, &options)
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))?
}

// ============================================================================
// Tests
// ============================================================================
