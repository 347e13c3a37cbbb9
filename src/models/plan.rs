use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Stage;

/// Inputs for a reverse plan computation.
///
/// `stages` is the full funnel (chain and special stages together);
/// `target_count` is the headcount required at the terminal stage.
/// When `target_date` is present the plan also back-schedules a
/// needed-by date per stage.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub stages: Vec<Stage>,
    pub target_count: i64,
    pub target_date: Option<NaiveDate>,
}

impl PlanRequest {
    pub fn new(stages: Vec<Stage>, target_count: i64) -> Self {
        Self {
            stages,
            target_count,
            target_date: None,
        }
    }

    pub fn with_target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }
}

/// One computed row of a plan.
///
/// Chain stages carry a required candidate count (and a needed-by date
/// when the request had a target date). Special stages are echoed for
/// display with both left as `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePlan {
    pub stage_name: String,
    pub stage_order: i64,
    pub conversion_rate: f64,
    pub tat_days: i64,
    pub maps_to_status: Option<String>,
    pub is_special: bool,
    pub required_count: Option<i64>,
    pub needed_by: Option<NaiveDate>,
}

/// A computed reverse plan: chain stages ordered entry -> terminal,
/// followed by any special stages from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub target_count: i64,
    pub target_date: Option<NaiveDate>,
    pub stages: Vec<StagePlan>,
}

impl Plan {
    /// The chain rows only (special stages filtered out)
    pub fn chain(&self) -> impl Iterator<Item = &StagePlan> {
        self.stages.iter().filter(|s| !s.is_special)
    }

    /// Required count at the entry stage (the widest point of the funnel)
    pub fn entry_count(&self) -> Option<i64> {
        self.chain().next().and_then(|s| s.required_count)
    }
}

/// One row of a forward requirements computation (safety-buffered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRequirement {
    pub stage_name: String,
    pub stage_order: i64,
    pub conversion_rate: f64,
    pub tat_days: i64,
    pub required_candidates: i64,
    pub milestone_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::standard_template;

    #[test]
    fn test_plan_request_builder() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let request = PlanRequest::new(standard_template(), 4).with_target_date(date);
        assert_eq!(request.target_count, 4);
        assert_eq!(request.target_date, Some(date));
        assert_eq!(request.stages.len(), 7);
    }

    #[test]
    fn test_plan_chain_filters_special() {
        let plan = Plan {
            target_count: 1,
            target_date: None,
            stages: vec![
                StagePlan {
                    stage_name: "Sourcing".to_string(),
                    stage_order: 1,
                    conversion_rate: 50.0,
                    tat_days: 2,
                    maps_to_status: None,
                    is_special: false,
                    required_count: Some(2),
                    needed_by: None,
                },
                StagePlan {
                    stage_name: "Dropped".to_string(),
                    stage_order: -1,
                    conversion_rate: 0.0,
                    tat_days: 0,
                    maps_to_status: None,
                    is_special: true,
                    required_count: None,
                    needed_by: None,
                },
            ],
        };
        assert_eq!(plan.chain().count(), 1);
        assert_eq!(plan.entry_count(), Some(2));
    }
}
