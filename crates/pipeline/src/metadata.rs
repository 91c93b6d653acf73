//! Session metadata dump
//!
//! `metadata.json` mirrors the session's intermediate artifacts
//! field-for-field so a run can be inspected or replayed.

use serde::{Deserialize, Serialize};
use std::path::Path;

use vidforge_audio::{AudioDurationAnalysis, SyncPlan};
use vidforge_core::Result;
use vidforge_script::{ParsedMission, ProcessedScript};

/// Everything worth keeping about a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub parsed_mission: ParsedMission,
    pub processed_script: ProcessedScript,
    pub audio_analysis: AudioDurationAnalysis,
    pub sync_plan: SyncPlan,
}

impl SessionMetadata {
    /// Write as pretty JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
