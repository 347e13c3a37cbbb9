use serde::{Deserialize, Serialize};

/// Pipeline status (lifecycle state)
///
/// - Active: pipeline is in use and shows up in listings
/// - Inactive: pipeline is kept for reference but hidden by default
/// - Deleted: soft-deleted, never shown (ledger rows are retained)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Active,
    Inactive,
    Deleted,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Active => "active",
            PipelineStatus::Inactive => "inactive",
            PipelineStatus::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PipelineStatus::Active),
            "inactive" => Some(PipelineStatus::Inactive),
            "deleted" => Some(PipelineStatus::Deleted),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// Pipeline model
///
/// A named recruiting funnel definition. The funnel itself is the set of
/// `Stage` rows attached to it; the pipeline record carries identity and
/// bookkeeping fields only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub status: PipelineStatus,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Pipeline {
    /// Create a new active pipeline
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            name,
            client: None,
            description: None,
            status: PipelineStatus::Active,
            created_ts: now,
            modified_ts: now,
        }
    }
}
