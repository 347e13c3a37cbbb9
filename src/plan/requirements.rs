use chrono::{Duration, NaiveDate};

use crate::models::{Stage, StageRequirement};
use crate::plan::calculator::{validate_chain, PlanError};

/// Compute forward stage requirements with a safety buffer.
///
/// A sibling of [`crate::plan::compute`] used for capacity planning rather
/// than target reconciliation: the hiring target is padded by
/// `safety_buffer` percent before back-solving, the division applies at
/// every stage including the terminal one, and milestone dates subtract
/// the cumulative TAT of the stage and everything downstream of it from
/// the target date.
pub fn requirements(
    stages: &[Stage],
    target_count: i64,
    target_date: Option<NaiveDate>,
    safety_buffer: f64,
) -> Result<Vec<StageRequirement>, PlanError> {
    if safety_buffer < 0.0 {
        return Err(PlanError::InvalidInput(format!(
            "safety buffer must be non-negative, got {}",
            safety_buffer
        )));
    }

    let chain = validate_chain(stages, target_count)?;

    let mut rows: Vec<StageRequirement> = Vec::with_capacity(chain.len());
    let mut current = target_count as f64 * (1.0 + safety_buffer / 100.0);
    let mut cumulative_tat: i64 = 0;

    for stage in chain.iter().rev() {
        let required = (current / (stage.conversion_rate / 100.0)).ceil() as i64;
        cumulative_tat += stage.tat_days;
        let milestone_date = target_date.map(|d| d - Duration::days(cumulative_tat));

        rows.push(StageRequirement {
            stage_name: stage.name.clone(),
            stage_order: stage.stage_order,
            conversion_rate: stage.conversion_rate,
            tat_days: stage.tat_days,
            required_candidates: required,
            milestone_date,
        });

        current = required as f64;
    }

    rows.reverse();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stage::standard_template;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_buffer_matches_reverse_chain() {
        // Terminal divides by its own 100% rate, so a zero buffer
        // reproduces the reverse plan counts.
        let rows = requirements(&standard_template(), 4, None, 0.0).unwrap();
        let counts: Vec<i64> = rows.iter().map(|r| r.required_candidates).collect();
        assert_eq!(counts, vec![28, 14, 8, 5, 4]);
    }

    #[test]
    fn test_buffer_pads_target() {
        // 20% buffer on 10 hires: terminal needs ceil(12 / 1.0) = 12
        let rows = requirements(&standard_template(), 10, None, 20.0).unwrap();
        assert_eq!(rows.last().unwrap().required_candidates, 12);
    }

    #[test]
    fn test_milestones_use_cumulative_tat() {
        // TATs 2/3/5/7/1 from a 2025-06-30 target:
        // On Boarded 1 day out, Client Interview 8, Tech Round 13,
        // Screening 16, Sourcing 18.
        let target = date(2025, 6, 30);
        let rows = requirements(&standard_template(), 4, Some(target), 0.0).unwrap();
        let milestones: Vec<NaiveDate> =
            rows.iter().map(|r| r.milestone_date.unwrap()).collect();
        assert_eq!(
            milestones,
            vec![
                date(2025, 6, 12),
                date(2025, 6, 14),
                date(2025, 6, 17),
                date(2025, 6, 22),
                date(2025, 6, 29),
            ]
        );
    }

    #[test]
    fn test_no_target_date_means_no_milestones() {
        let rows = requirements(&standard_template(), 4, None, 10.0).unwrap();
        assert!(rows.iter().all(|r| r.milestone_date.is_none()));
    }

    #[test]
    fn test_rejects_negative_buffer() {
        let err = requirements(&standard_template(), 4, None, -5.0).unwrap_err();
        assert!(matches!(err, PlanError::InvalidInput(_)));
    }

    #[test]
    fn test_shares_chain_validation() {
        assert!(requirements(&standard_template(), 0, None, 0.0).is_err());
        let bad = vec![Stage::new("Bad".to_string(), 1, 0.0, 1)];
        assert!(requirements(&bad, 1, None, 0.0).is_err());
    }
}
