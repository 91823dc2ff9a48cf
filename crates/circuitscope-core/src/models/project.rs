use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Preview processing status persisted on the project record.
///
/// A run moves `queued -> processing -> completed | failed`. A terminal state only goes
/// back to `queued` when a new run is scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    /// States a project may be in immediately before entering `self`.
    pub fn allowed_predecessors(&self) -> &'static [ProcessingStatus] {
        match self {
            ProcessingStatus::Queued => &[
                ProcessingStatus::Queued,
                ProcessingStatus::Completed,
                ProcessingStatus::Failed,
            ],
            ProcessingStatus::Processing => &[ProcessingStatus::Queued],
            ProcessingStatus::Completed | ProcessingStatus::Failed => {
                &[ProcessingStatus::Processing]
            }
        }
    }

    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingStatus::Queued => write!(f, "queued"),
            ProcessingStatus::Processing => write!(f, "processing"),
            ProcessingStatus::Completed => write!(f, "completed"),
            ProcessingStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ProcessingStatus::Queued),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid processing status: {}", s)),
        }
    }
}

/// Status plus the error message recorded by a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub status: ProcessingStatus,
    pub error: Option<String>,
}

impl ProcessingState {
    pub fn new(status: ProcessingStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }
}
