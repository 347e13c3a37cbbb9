use rusqlite::{Connection, OptionalExtension};
use chrono::NaiveDate;
use crate::models::{Plan, StagePlan};
use anyhow::{Context, Result};

/// A saved plan header row
#[derive(Debug, Clone, serde::Serialize)]
pub struct SavedPlan {
    pub id: i64,
    pub pipeline_id: i64,
    pub target_count: i64,
    pub target_date: Option<NaiveDate>,
    pub created_ts: i64,
}

/// Saved plan repository
///
/// Computed plans are immutable snapshots: the header row records the
/// request, the stage rows record the computed counts and dates at the
/// time of the computation. Re-running a plan after editing stages
/// produces a new snapshot rather than mutating an old one.
pub struct PlanRepo;

impl PlanRepo {
    /// Persist a computed plan. Header and rows are written in one
    /// transaction; a failed save leaves nothing behind.
    pub fn save(conn: &Connection, pipeline_id: i64, plan: &Plan) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO plans (pipeline_id, target_count, target_date, created_ts)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                pipeline_id,
                plan.target_count,
                plan.target_date.map(|d| d.to_string()),
                now
            ],
        )
        .context("Failed to save plan")?;

        let plan_id = tx.last_insert_rowid();

        for stage in &plan.stages {
            tx.execute(
                "INSERT INTO plan_stages
                 (plan_id, stage_name, stage_order, conversion_rate, tat_days, is_special, required_count, needed_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    plan_id,
                    stage.stage_name,
                    stage.stage_order,
                    stage.conversion_rate,
                    stage.tat_days,
                    stage.is_special as i64,
                    stage.required_count,
                    stage.needed_by.map(|d| d.to_string())
                ],
            )
            .with_context(|| format!("Failed to save plan row for '{}'", stage.stage_name))?;
        }

        tx.commit()?;
        log::info!("saved plan {} for pipeline {}", plan_id, pipeline_id);
        Ok(plan_id)
    }

    /// List saved plan headers for a pipeline, newest first
    pub fn list_for_pipeline(conn: &Connection, pipeline_id: i64) -> Result<Vec<SavedPlan>> {
        let mut stmt = conn.prepare(
            "SELECT id, pipeline_id, target_count, target_date, created_ts
             FROM plans WHERE pipeline_id = ?1 ORDER BY created_ts DESC, id DESC",
        )?;

        let rows = stmt.query_map([pipeline_id], |row| {
            let date_str: Option<String> = row.get(3)?;
            Ok(SavedPlan {
                id: row.get(0)?,
                pipeline_id: row.get(1)?,
                target_count: row.get(2)?,
                target_date: date_str.and_then(|s| s.parse().ok()),
                created_ts: row.get(4)?,
            })
        })?;

        let mut plans = Vec::new();
        for row in rows {
            plans.push(row?);
        }
        Ok(plans)
    }

    /// Load a saved plan with its stage rows
    pub fn get(conn: &Connection, plan_id: i64) -> Result<Option<(SavedPlan, Plan)>> {
        let mut stmt = conn.prepare(
            "SELECT id, pipeline_id, target_count, target_date, created_ts
             FROM plans WHERE id = ?1",
        )?;

        let header = stmt
            .query_row([plan_id], |row| {
                let date_str: Option<String> = row.get(3)?;
                Ok(SavedPlan {
                    id: row.get(0)?,
                    pipeline_id: row.get(1)?,
                    target_count: row.get(2)?,
                    target_date: date_str.and_then(|s| s.parse().ok()),
                    created_ts: row.get(4)?,
                })
            })
            .optional()?;

        let header = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT stage_name, stage_order, conversion_rate, tat_days, is_special, required_count, needed_by
             FROM plan_stages WHERE plan_id = ?1 ORDER BY is_special, stage_order, id",
        )?;

        let rows = stmt.query_map([plan_id], |row| {
            let needed_by: Option<String> = row.get(6)?;
            Ok(StagePlan {
                stage_name: row.get(0)?,
                stage_order: row.get(1)?,
                conversion_rate: row.get(2)?,
                tat_days: row.get(3)?,
                maps_to_status: None,
                is_special: row.get::<_, i64>(4)? != 0,
                required_count: row.get(5)?,
                needed_by: needed_by.and_then(|s| s.parse().ok()),
            })
        })?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }

        let plan = Plan {
            target_count: header.target_count,
            target_date: header.target_date,
            stages,
        };
        Ok(Some((header, plan)))
    }
}
