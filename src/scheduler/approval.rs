use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::scheduler::optimizer::Proposal;
use crate::scheduler::types::{InfeasibleDemand, Schedule, ScheduleMetrics};

/// The schedule in force for a run. `revision` starts at 1 and is bumped
/// every time a proposal is promoted over it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CommittedRecord {
    pub id: String,
    pub revision: u32,
    pub saved_at: DateTime<Utc>,
    pub schedule: Schedule,
    pub unmet: Vec<InfeasibleDemand>,
    pub metrics: ScheduleMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_from: Option<String>,
}

/// An optimizer proposal waiting for a human decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ProposedRecord {
    pub id: String,
    /// Revision of the committed record the proposal was computed against.
    pub base_revision: u32,
    pub saved_at: DateTime<Utc>,
    pub proposal: Proposal,
}

#[derive(Debug, Error, PartialEq)]
pub enum ApprovalError {
    #[error("proposal {proposed} does not belong to run {committed}")]
    RunMismatch { committed: String, proposed: String },
    #[error(
        "proposal was computed against revision {base_revision}, committed schedule is at revision {revision}"
    )]
    StaleProposal { base_revision: u32, revision: u32 },
}

/// Build the committed record that replaces `committed` once `proposed`
/// is approved. Refuses proposals computed against an older revision.
pub fn promote(
    committed: &CommittedRecord,
    proposed: &ProposedRecord,
    now: DateTime<Utc>,
) -> Result<CommittedRecord, ApprovalError> {
    if committed.id != proposed.id {
        return Err(ApprovalError::RunMismatch {
            committed: committed.id.clone(),
            proposed: proposed.id.clone(),
        });
    }
    if committed.revision != proposed.base_revision {
        return Err(ApprovalError::StaleProposal {
            base_revision: proposed.base_revision,
            revision: committed.revision,
        });
    }

    let proposal = &proposed.proposal;
    Ok(CommittedRecord {
        id: committed.id.clone(),
        revision: committed.revision + 1,
        saved_at: now,
        schedule: proposal.schedule.clone(),
        unmet: proposal.unmet.clone(),
        metrics: proposal.metrics.clone(),
        promoted_from: Some(proposal.id.clone()),
    })
}
