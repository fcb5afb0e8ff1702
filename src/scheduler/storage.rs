use chrono::{DateTime, Utc};
use log::error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::scheduler::approval::{promote, ApprovalError, CommittedRecord, ProposedRecord};
use crate::scheduler::runner::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    Committed,
    Proposed,
}

impl ScheduleState {
    pub fn folder_name(&self) -> &'static str {
        match self {
            ScheduleState::Committed => "Committed",
            ScheduleState::Proposed => "Proposed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ScheduleSummary {
    pub id: String,
    pub state: ScheduleState,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: usize,
    /// Committed revision, or the revision a proposal was computed against.
    pub revision: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_delta: Option<f64>,
}

impl From<&CommittedRecord> for ScheduleSummary {
    fn from(record: &CommittedRecord) -> Self {
        ScheduleSummary {
            id: record.id.clone(),
            state: ScheduleState::Committed,
            start: record.schedule.horizon_start,
            end: record.schedule.horizon_end,
            entries: record.schedule.len(),
            revision: record.revision,
            score_delta: None,
        }
    }
}

impl From<&ProposedRecord> for ScheduleSummary {
    fn from(record: &ProposedRecord) -> Self {
        let schedule = &record.proposal.schedule;
        ScheduleSummary {
            id: record.id.clone(),
            state: ScheduleState::Proposed,
            start: schedule.horizon_start,
            end: schedule.horizon_end,
            entries: schedule.len(),
            revision: record.base_revision,
            score_delta: Some(record.proposal.score_delta),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SavedRun {
    pub committed: ScheduleSummary,
    pub proposed: Option<ScheduleSummary>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Schedule not found: {0}")]
    NotFound(String),
    #[error("Schedule overlap detected")]
    Overlap,
    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

/// File-backed two-phase store: `Committed/<id>.yaml` holds the schedule
/// in force, `Proposed/<id>.yaml` an optimizer proposal awaiting review.
pub struct Storage {
    base: PathBuf,
}

impl Storage {
    pub fn new(base: PathBuf) -> Self {
        Storage { base }
    }

    fn state_path(&self, state: ScheduleState) -> PathBuf {
        self.base.join(state.folder_name())
    }

    fn schedule_path(&self, state: ScheduleState, id: &str) -> PathBuf {
        self.state_path(state).join(format!("{}.yaml", id))
    }

    pub fn list(&self, state: ScheduleState) -> Result<Vec<ScheduleSummary>, StorageError> {
        let mut entries = match state {
            ScheduleState::Committed => self
                .read_all::<CommittedRecord>(state)?
                .iter()
                .map(ScheduleSummary::from)
                .collect::<Vec<_>>(),
            ScheduleState::Proposed => self
                .read_all::<ProposedRecord>(state)?
                .iter()
                .map(ScheduleSummary::from)
                .collect(),
        };
        entries.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    pub fn committed(&self, id: &str) -> Result<CommittedRecord, StorageError> {
        self.read(ScheduleState::Committed, id)
    }

    pub fn proposed(&self, id: &str) -> Result<ProposedRecord, StorageError> {
        self.read(ScheduleState::Proposed, id)
    }

    /// Persist a run: the committed baseline at revision 1 and, when the
    /// optimizer ran, its proposal under the same ID.
    pub fn save_run(&self, report: &RunReport) -> Result<SavedRun, StorageError> {
        if self.check_overlap(report.horizon_start, report.horizon_end)? {
            return Err(StorageError::Overlap);
        }

        let now = Utc::now();
        let id = self.generate_id(report.horizon_start);
        let committed = CommittedRecord {
            id: id.clone(),
            revision: 1,
            saved_at: now,
            schedule: report.committed.clone(),
            unmet: report.unmet.clone(),
            metrics: report.metrics.clone(),
            promoted_from: None,
        };
        self.write(ScheduleState::Committed, &id, &committed)?;

        let proposed = match &report.proposal {
            Some(proposal) => {
                let record = ProposedRecord {
                    id: id.clone(),
                    base_revision: committed.revision,
                    saved_at: now,
                    proposal: proposal.clone(),
                };
                self.write(ScheduleState::Proposed, &id, &record)?;
                Some(ScheduleSummary::from(&record))
            }
            None => None,
        };

        log::info!("Saved run {}", id);
        Ok(SavedRun {
            committed: ScheduleSummary::from(&committed),
            proposed,
        })
    }

    /// Promote the pending proposal for `id` over its committed schedule.
    pub fn approve(&self, id: &str) -> Result<CommittedRecord, StorageError> {
        let committed = self.committed(id)?;
        let proposed = self.proposed(id)?;
        let promoted = promote(&committed, &proposed, Utc::now())?;

        self.write(ScheduleState::Committed, id, &promoted)?;
        std::fs::remove_file(self.schedule_path(ScheduleState::Proposed, id))?;
        log::info!("Approved proposal for {} (revision {})", id, promoted.revision);
        Ok(promoted)
    }

    /// Drop the pending proposal; the committed schedule stays as it is.
    pub fn reject(&self, id: &str) -> Result<(), StorageError> {
        let path = self.schedule_path(ScheduleState::Proposed, id);

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        std::fs::remove_file(path)?;
        log::info!("Rejected proposal for {}", id);
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, state: ScheduleState, id: &str) -> Result<T, StorageError> {
        let path = self.schedule_path(state, id);

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn read_all<T: DeserializeOwned>(&self, state: ScheduleState) -> Result<Vec<T>, StorageError> {
        let path = self.state_path(state);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in path.read_dir()? {
            let entry_path = entry?.path();

            if !entry_path.is_file() {
                continue;
            }

            let content = match std::fs::read_to_string(&entry_path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read schedule file {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            match serde_yaml::from_str(&content) {
                Ok(record) => records.push(record),
                Err(e) => error!("Failed to parse schedule {}: {}", entry_path.display(), e),
            }
        }
        Ok(records)
    }

    fn write<T: Serialize>(&self, state: ScheduleState, id: &str, record: &T) -> Result<(), StorageError> {
        let folder = self.state_path(state);
        std::fs::create_dir_all(&folder)?;

        let path = self.schedule_path(state, id);
        std::fs::write(path, serde_yaml::to_string(record)?)?;
        Ok(())
    }

    fn check_overlap(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<bool, StorageError> {
        let committed = self.list(ScheduleState::Committed)?;

        // Two ranges [a, b) and [c, d) overlap if a < d && c < b
        Ok(committed
            .iter()
            .any(|entry| start < entry.end && entry.start < end))
    }

    fn generate_id(&self, start: DateTime<Utc>) -> String {
        let uuid = uuid::Uuid::new_v4();
        let timestamp = start.format("%Y%m%dT%H%M%SZ");
        format!("{}_{}", timestamp, uuid)
    }
}
