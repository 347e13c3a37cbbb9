use serde::{Deserialize, Serialize};

/// Sentinel order for special stages (Dropped, On Hold, ...).
/// Special stages are reachable from anywhere in the funnel and carry no
/// position in the sequential advancement chain.
pub const SPECIAL_STAGE_ORDER: i64 = -1;

/// Stage model
///
/// One step of a recruiting funnel. Chain stages (`is_special == false`)
/// form a strictly ordered sequence from the entry stage (minimal
/// `stage_order`) to the terminal stage (maximal `stage_order`). The
/// conversion rate expresses what percentage of a stage's entrants advance
/// to the next stage; TAT is the calendar days the stage is expected to
/// take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Option<i64>,
    pub pipeline_id: Option<i64>,
    pub name: String,
    pub stage_order: i64,
    /// Percent in (0, 100] for chain stages. Special stages keep 0.
    pub conversion_rate: f64,
    pub tat_days: i64,
    /// Candidate-tracking status label this stage reconciles against.
    /// Display/reporting only; the plan arithmetic never reads it.
    pub maps_to_status: Option<String>,
    pub is_special: bool,
}

impl Stage {
    /// Create a new chain stage
    pub fn new(name: String, stage_order: i64, conversion_rate: f64, tat_days: i64) -> Self {
        Self {
            id: None,
            pipeline_id: None,
            name,
            stage_order,
            conversion_rate,
            tat_days,
            maps_to_status: None,
            is_special: false,
        }
    }

    /// Create a special stage (funnel exit/hold, e.g. Dropped or On Hold)
    pub fn special(name: String) -> Self {
        Self {
            id: None,
            pipeline_id: None,
            name,
            stage_order: SPECIAL_STAGE_ORDER,
            conversion_rate: 0.0,
            tat_days: 0,
            maps_to_status: None,
            is_special: true,
        }
    }

    /// Attach a candidate status label
    pub fn with_status(mut self, status: &str) -> Self {
        self.maps_to_status = Some(status.to_string());
        self
    }
}

/// The standard funnel shipped as the `standard` template.
///
/// Rates and TATs come from the house hiring funnel; the status labels
/// match the candidate-tracking vocabulary used by reporting.
pub fn standard_template() -> Vec<Stage> {
    vec![
        Stage::new("Sourcing".to_string(), 1, 50.0, 2),
        Stage::new("Screening".to_string(), 2, 60.0, 3).with_status("Screening"),
        Stage::new("Tech Round".to_string(), 3, 70.0, 5).with_status("Tech Round"),
        Stage::new("Client Interview".to_string(), 4, 80.0, 7).with_status("Selected"),
        Stage::new("On Boarded".to_string(), 5, 100.0, 1).with_status("On Boarded"),
        Stage::special("Dropped".to_string()).with_status("Dropped"),
        Stage::special("On Hold".to_string()).with_status("On Hold"),
    ]
}
