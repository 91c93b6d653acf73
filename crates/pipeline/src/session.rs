//! Session context
//!
//! One session owns one output directory tree and everything written
//! into it. The context travels by reference through every stage and
//! carries the cancellation flag; artifact paths are derived from
//! `(session, stage, index)` so re-issued requests land on the same
//! files.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use vidforge_core::{Language, Platform, Result};

/// Handle for cancelling a running session from outside
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation; pending fan-out work is aborted and
    /// partial artifacts removed.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Session-scoped state and output layout
pub struct SessionContext {
    pub session_id: String,
    /// This session's private output directory
    pub output_root: PathBuf,
    pub language: Language,
    pub platform: Platform,
    pub target_duration: f64,
    pub created_at: DateTime<Utc>,
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
}

impl SessionContext {
    /// Create a session under `outputs_root`, building the directory
    /// layout up front.
    pub fn new(
        outputs_root: &Path,
        language: Language,
        platform: Platform,
        target_duration: f64,
    ) -> Result<Self> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let output_root = outputs_root.join(&session_id);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let session = Self {
            session_id,
            output_root,
            language,
            platform,
            target_duration,
            created_at: Utc::now(),
            cancel_tx,
            cancel_rx,
        };
        for dir in [
            session.audio_dir(),
            session.clips_dir(),
            session.images_dir(),
            session.overlays_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        tracing::info!(
            session_id = %session.session_id,
            output = %session.output_root.display(),
            "session created"
        );
        Ok(session)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.output_root.join("audio")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.output_root.join("clips")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_root.join("images")
    }

    pub fn overlays_dir(&self) -> PathBuf {
        self.output_root.join("overlays")
    }

    /// Stable path for audio segment `i`
    pub fn audio_segment_path(&self, index: usize) -> PathBuf {
        self.audio_dir().join(format!("audio_segment_{index}.wav"))
    }

    /// Stable path for video clip `i`
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.clips_dir().join(format!("clip_{index}.mp4"))
    }

    /// Stable path for image `i`
    pub fn image_path(&self, index: usize) -> PathBuf {
        self.images_dir().join(format!("image_{index}.png"))
    }

    pub fn combined_audio_path(&self) -> PathBuf {
        self.audio_dir().join("combined.wav")
    }

    pub fn final_asset_path(&self) -> PathBuf {
        self.output_root.join("final.mp4")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_root.join("metadata.json")
    }

    /// Handle that cancels this session
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    /// Receiver that resolves when cancellation is requested
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Delete everything this session wrote
    pub fn remove_artifacts(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.output_root) {
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "failed to remove session artifacts"
            );
        }
    }
}
