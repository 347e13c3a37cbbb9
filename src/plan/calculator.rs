use chrono::Duration;
use thiserror::Error;

use crate::models::{Plan, PlanRequest, Stage, StagePlan};

/// Plan computation error.
///
/// The computation is atomic: either a complete plan is produced or the
/// request is rejected. Invalid values are never clamped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Validate the chain stages of a request.
///
/// Returns the chain stages sorted by ascending order. Special stages are
/// not validated; they carry no chain arithmetic.
pub(crate) fn validate_chain<'a>(
    stages: &'a [Stage],
    target_count: i64,
) -> Result<Vec<&'a Stage>, PlanError> {
    if target_count <= 0 {
        return Err(PlanError::InvalidInput(format!(
            "target count must be positive, got {}",
            target_count
        )));
    }

    let mut chain: Vec<&Stage> = stages.iter().filter(|s| !s.is_special).collect();
    if chain.is_empty() {
        return Err(PlanError::InvalidInput(
            "pipeline has no chain stages".to_string(),
        ));
    }

    for stage in &chain {
        if stage.conversion_rate <= 0.0 || stage.conversion_rate > 100.0 {
            return Err(PlanError::InvalidInput(format!(
                "stage '{}' has conversion rate {}%, expected a value in (0, 100]",
                stage.name, stage.conversion_rate
            )));
        }
        if stage.tat_days < 0 {
            return Err(PlanError::InvalidInput(format!(
                "stage '{}' has negative TAT {}",
                stage.name, stage.tat_days
            )));
        }
    }

    chain.sort_by_key(|s| s.stage_order);
    for pair in chain.windows(2) {
        if pair[0].stage_order >= pair[1].stage_order {
            return Err(PlanError::InvalidInput(format!(
                "stages '{}' and '{}' share order {}",
                pair[0].name, pair[1].name, pair[1].stage_order
            )));
        }
    }

    Ok(chain)
}

/// Candidates that must enter a stage to yield `needed` conversions out of it.
///
/// The stage's conversion rate is the fraction of its entrants that
/// advance, so entrants = needed / (rate / 100), rounded up to the next
/// whole person. Fractional candidates are meaningless; rounding is up at
/// every stage, matching the planning totals users reconcile against.
fn entrants_for(needed: i64, conversion_rate: f64) -> i64 {
    (needed as f64 / (conversion_rate / 100.0)).ceil() as i64
}

/// Compute a reverse pipeline plan.
///
/// Walks the chain from the terminal stage back to the entry stage. The
/// terminal stage is seeded with the target count (and target date, when
/// present); each upstream stage needs enough entrants to produce the
/// count already known for the stage below it, and must complete its TAT
/// before that stage's needed-by date. Pure calendar-day arithmetic, no
/// business-day calendar.
///
/// Special stages are excluded from the walk and echoed at the end of the
/// result with no computed values.
pub fn compute(request: &PlanRequest) -> Result<Plan, PlanError> {
    let chain = validate_chain(&request.stages, request.target_count)?;

    let mut rows: Vec<StagePlan> = Vec::with_capacity(request.stages.len());
    let mut needed = request.target_count;
    let mut needed_by = request.target_date;

    // Terminal first, entry last; reversed into display order below.
    for (idx, stage) in chain.iter().rev().enumerate() {
        if idx > 0 {
            needed = entrants_for(needed, stage.conversion_rate);
            needed_by = needed_by.map(|d| d - Duration::days(stage.tat_days));
        }
        log::debug!(
            "stage '{}': {} candidates needed{}",
            stage.name,
            needed,
            needed_by.map(|d| format!(" by {}", d)).unwrap_or_default()
        );
        rows.push(StagePlan {
            stage_name: stage.name.clone(),
            stage_order: stage.stage_order,
            conversion_rate: stage.conversion_rate,
            tat_days: stage.tat_days,
            maps_to_status: stage.maps_to_status.clone(),
            is_special: false,
            required_count: Some(needed),
            needed_by,
        });
    }
    rows.reverse();

    for stage in request.stages.iter().filter(|s| s.is_special) {
        rows.push(StagePlan {
            stage_name: stage.name.clone(),
            stage_order: stage.stage_order,
            conversion_rate: stage.conversion_rate,
            tat_days: stage.tat_days,
            maps_to_status: stage.maps_to_status.clone(),
            is_special: true,
            required_count: None,
            needed_by: None,
        });
    }

    Ok(Plan {
        target_count: request.target_count,
        target_date: request.target_date,
        stages: rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::standard_template;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn counts(plan: &Plan) -> Vec<i64> {
        plan.chain().map(|s| s.required_count.unwrap()).collect()
    }

    #[test]
    fn test_standard_funnel_counts() {
        // 4 hires through 50/60/70/80/100: 28 -> 14 -> 8 -> 5 -> 4
        let plan = compute(&PlanRequest::new(standard_template(), 4)).unwrap();
        assert_eq!(counts(&plan), vec![28, 14, 8, 5, 4]);
    }

    #[test]
    fn test_terminal_stage_equals_target() {
        let plan = compute(&PlanRequest::new(standard_template(), 17)).unwrap();
        let terminal = plan.chain().last().unwrap();
        assert_eq!(terminal.stage_name, "On Boarded");
        assert_eq!(terminal.required_count, Some(17));
    }

    #[test]
    fn test_counts_non_increasing_entry_to_terminal() {
        let plan = compute(&PlanRequest::new(standard_template(), 9)).unwrap();
        let counts = counts(&plan);
        for pair in counts.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "upstream stage needs fewer candidates than downstream: {:?}",
                counts
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let request = PlanRequest::new(standard_template(), 12)
            .with_target_date(date(2025, 6, 30));
        let a = compute(&request).unwrap();
        let b = compute(&request).unwrap();
        assert_eq!(counts(&a), counts(&b));
        let dates_a: Vec<_> = a.chain().map(|s| s.needed_by).collect();
        let dates_b: Vec<_> = b.chain().map(|s| s.needed_by).collect();
        assert_eq!(dates_a, dates_b);
    }

    #[test]
    fn test_full_conversion_passes_count_through() {
        let stages = vec![
            Stage::new("Offer".to_string(), 1, 100.0, 3),
            Stage::new("Hired".to_string(), 2, 100.0, 1),
        ];
        let plan = compute(&PlanRequest::new(stages, 6)).unwrap();
        assert_eq!(counts(&plan), vec![6, 6]);
    }

    #[test]
    fn test_rounding_is_ceiling() {
        // 10 hires through a 33% stage: 10 / 0.33 = 30.30..., so 31 people
        let stages = vec![
            Stage::new("Sourced".to_string(), 1, 33.0, 5),
            Stage::new("Hired".to_string(), 2, 100.0, 0),
        ];
        let plan = compute(&PlanRequest::new(stages, 10)).unwrap();
        assert_eq!(counts(&plan), vec![31, 10]);
    }

    #[test]
    fn test_special_stages_passed_through() {
        let plan = compute(&PlanRequest::new(standard_template(), 4)).unwrap();
        let special: Vec<&StagePlan> =
            plan.stages.iter().filter(|s| s.is_special).collect();
        assert_eq!(special.len(), 2);
        for stage in special {
            assert_eq!(stage.required_count, None);
            assert_eq!(stage.needed_by, None);
        }
        // Every chain stage got a computed count
        assert!(plan.chain().all(|s| s.required_count.is_some()));
    }

    #[test]
    fn test_date_scheduling() {
        // Terminal date 2025-03-31, single upstream stage with 10-day TAT:
        // upstream must be filled by 2025-03-21.
        let stages = vec![
            Stage::new("Sourced".to_string(), 1, 50.0, 10),
            Stage::new("Hired".to_string(), 2, 100.0, 1),
        ];
        let request = PlanRequest::new(stages, 5).with_target_date(date(2025, 3, 31));
        let plan = compute(&request).unwrap();

        let rows: Vec<&StagePlan> = plan.chain().collect();
        assert_eq!(rows[1].needed_by, Some(date(2025, 3, 31)));
        assert_eq!(rows[0].needed_by, Some(date(2025, 3, 21)));
    }

    #[test]
    fn test_no_target_date_means_no_schedule() {
        let plan = compute(&PlanRequest::new(standard_template(), 4)).unwrap();
        assert!(plan.chain().all(|s| s.needed_by.is_none()));
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_order() {
        let stages = vec![
            Stage::new("Hired".to_string(), 3, 100.0, 1),
            Stage::new("Sourced".to_string(), 1, 50.0, 2),
            Stage::new("Screen".to_string(), 2, 50.0, 3),
        ];
        let plan = compute(&PlanRequest::new(stages, 2)).unwrap();
        let names: Vec<&str> = plan.chain().map(|s| s.stage_name.as_str()).collect();
        assert_eq!(names, vec!["Sourced", "Screen", "Hired"]);
        assert_eq!(counts(&plan), vec![8, 4, 2]);
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let err = compute(&PlanRequest::new(standard_template(), 0)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
        let err = compute(&PlanRequest::new(standard_template(), -3)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_out_of_range_rates() {
        let zero = vec![Stage::new("Bad".to_string(), 1, 0.0, 1)];
        assert!(compute(&PlanRequest::new(zero, 1)).is_err());

        let over = vec![Stage::new("Bad".to_string(), 1, 120.0, 1)];
        assert!(compute(&PlanRequest::new(over, 1)).is_err());
    }

    #[test]
    fn test_rejects_empty_chain() {
        assert!(compute(&PlanRequest::new(vec![], 1)).is_err());

        // Only special stages is still an empty chain
        let specials = vec![Stage::special("Dropped".to_string())];
        assert!(compute(&PlanRequest::new(specials, 1)).is_err());
    }

    #[test]
    fn test_rejects_duplicate_orders() {
        let stages = vec![
            Stage::new("A".to_string(), 1, 50.0, 1),
            Stage::new("B".to_string(), 1, 60.0, 1),
        ];
        let err = compute(&PlanRequest::new(stages, 1)).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_negative_tat() {
        let stages = vec![Stage::new("A".to_string(), 1, 50.0, -2)];
        assert!(compute(&PlanRequest::new(stages, 1)).is_err());
    }
}
