use rusqlite::{Connection, OptionalExtension};
use crate::models::Stage;
use anyhow::{Context, Result};

/// Stage repository for database operations
///
/// Stages belong to a pipeline. Chain stages are ordered by `stage_order`;
/// special stages (Dropped, On Hold, ...) sort after the chain in listings.
pub struct StageRepo;

fn row_to_stage(row: &rusqlite::Row) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: Some(row.get(0)?),
        pipeline_id: Some(row.get(1)?),
        name: row.get(2)?,
        stage_order: row.get(3)?,
        conversion_rate: row.get(4)?,
        tat_days: row.get(5)?,
        maps_to_status: row.get(6)?,
        is_special: row.get::<_, i64>(7)? != 0,
    })
}

const STAGE_COLS: &str =
    "id, pipeline_id, name, stage_order, conversion_rate, tat_days, maps_to_status, is_special";

impl StageRepo {
    /// Add a stage to a pipeline
    pub fn add(conn: &Connection, pipeline_id: i64, stage: &Stage) -> Result<Stage> {
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO stages
             (pipeline_id, name, stage_order, conversion_rate, tat_days, maps_to_status, is_special, created_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                pipeline_id,
                stage.name,
                stage.stage_order,
                stage.conversion_rate,
                stage.tat_days,
                stage.maps_to_status,
                stage.is_special as i64,
                now
            ],
        )
        .with_context(|| format!("Failed to add stage '{}'", stage.name))?;

        let id = conn.last_insert_rowid();
        log::info!(
            "added stage '{}' to pipeline {} (order {})",
            stage.name,
            pipeline_id,
            stage.stage_order
        );
        Ok(Stage {
            id: Some(id),
            pipeline_id: Some(pipeline_id),
            ..stage.clone()
        })
    }

    /// List all stages for a pipeline: chain stages by order, specials last
    pub fn list_for_pipeline(conn: &Connection, pipeline_id: i64) -> Result<Vec<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages WHERE pipeline_id = ?1
             ORDER BY is_special, stage_order, id",
            STAGE_COLS
        ))?;

        let rows = stmt.query_map([pipeline_id], row_to_stage)?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    /// Get a stage by name within a pipeline
    pub fn get_by_name(conn: &Connection, pipeline_id: i64, name: &str) -> Result<Option<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages WHERE pipeline_id = ?1 AND name = ?2",
            STAGE_COLS
        ))?;
        let stage = stmt
            .query_row(rusqlite::params![pipeline_id, name], row_to_stage)
            .optional()?;
        Ok(stage)
    }

    /// Update a stage's configurable fields. `None` leaves a field unchanged;
    /// the status mapping uses a nested Option so it can be cleared.
    pub fn update(
        conn: &Connection,
        stage_id: i64,
        conversion_rate: Option<f64>,
        tat_days: Option<i64>,
        stage_order: Option<i64>,
        maps_to_status: Option<Option<&str>>,
    ) -> Result<()> {
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(rate) = conversion_rate {
            sets.push("conversion_rate = ?");
            params.push(Box::new(rate));
        }
        if let Some(tat) = tat_days {
            sets.push("tat_days = ?");
            params.push(Box::new(tat));
        }
        if let Some(order) = stage_order {
            sets.push("stage_order = ?");
            params.push(Box::new(order));
        }
        if let Some(status) = maps_to_status {
            sets.push("maps_to_status = ?");
            params.push(Box::new(status.map(|s| s.to_string())));
        }

        if sets.is_empty() {
            return Ok(());
        }

        // Number the parameters
        let mut numbered_sets = Vec::new();
        for (i, set) in sets.iter().enumerate() {
            numbered_sets.push(set.replace('?', &format!("?{}", i + 1)));
        }
        let id_param = params.len() + 1;
        let sql = format!(
            "UPDATE stages SET {} WHERE id = ?{}",
            numbered_sets.join(", "),
            id_param
        );
        params.push(Box::new(stage_id));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let updated = conn
            .execute(&sql, param_refs.as_slice())
            .with_context(|| format!("Failed to update stage id={}", stage_id))?;

        if updated == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        log::info!("updated stage id={}", stage_id);
        Ok(())
    }

    /// Remove a stage
    pub fn remove(conn: &Connection, stage_id: i64) -> Result<()> {
        let removed = conn.execute("DELETE FROM stages WHERE id = ?1", [stage_id])?;
        if removed == 0 {
            anyhow::bail!("No stage found with id={}", stage_id);
        }
        log::info!("removed stage id={}", stage_id);
        Ok(())
    }

    /// Remove all stages for a pipeline
    pub fn clear_for_pipeline(conn: &Connection, pipeline_id: i64) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM stages WHERE pipeline_id = ?1",
            [pipeline_id],
        )?;
        log::info!("cleared {} stages from pipeline {}", removed, pipeline_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::models::stage::standard_template;
    use crate::repo::PipelineRepo;

    fn setup(conn: &Connection) -> i64 {
        let pipeline = PipelineRepo::create(conn, "Test", None, None).unwrap();
        pipeline.id.unwrap()
    }

    #[test]
    fn test_add_and_list_stages() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);

        for stage in standard_template() {
            StageRepo::add(&conn, pipeline_id, &stage).unwrap();
        }

        let stages = StageRepo::list_for_pipeline(&conn, pipeline_id).unwrap();
        assert_eq!(stages.len(), 7);

        // Chain first in order, specials last
        assert_eq!(stages[0].name, "Sourcing");
        assert_eq!(stages[4].name, "On Boarded");
        assert!(stages[5].is_special);
        assert!(stages[6].is_special);
    }

    #[test]
    fn test_duplicate_stage_name_rejected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);

        let stage = Stage::new("Screening".to_string(), 1, 50.0, 2);
        StageRepo::add(&conn, pipeline_id, &stage).unwrap();

        let dup = Stage::new("Screening".to_string(), 2, 60.0, 3);
        assert!(StageRepo::add(&conn, pipeline_id, &dup).is_err());
    }

    #[test]
    fn test_get_by_name() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);
        StageRepo::add(&conn, pipeline_id, &Stage::new("Screening".to_string(), 1, 50.0, 2))
            .unwrap();

        let found = StageRepo::get_by_name(&conn, pipeline_id, "Screening").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().conversion_rate, 50.0);

        let missing = StageRepo::get_by_name(&conn, pipeline_id, "Offer").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_update_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);
        let stage = StageRepo::add(
            &conn,
            pipeline_id,
            &Stage::new("Screening".to_string(), 1, 50.0, 2),
        )
        .unwrap();

        StageRepo::update(
            &conn,
            stage.id.unwrap(),
            Some(65.0),
            Some(4),
            None,
            Some(Some("Screening")),
        )
        .unwrap();

        let updated = StageRepo::get_by_name(&conn, pipeline_id, "Screening")
            .unwrap()
            .unwrap();
        assert_eq!(updated.conversion_rate, 65.0);
        assert_eq!(updated.tat_days, 4);
        assert_eq!(updated.stage_order, 1);
        assert_eq!(updated.maps_to_status.as_deref(), Some("Screening"));
    }

    #[test]
    fn test_update_no_fields_is_noop() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);
        let stage = StageRepo::add(
            &conn,
            pipeline_id,
            &Stage::new("Screening".to_string(), 1, 50.0, 2),
        )
        .unwrap();

        StageRepo::update(&conn, stage.id.unwrap(), None, None, None, None).unwrap();
        let unchanged = StageRepo::get_by_name(&conn, pipeline_id, "Screening")
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.conversion_rate, 50.0);
    }

    #[test]
    fn test_remove_and_clear() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline_id = setup(&conn);
        for stage in standard_template() {
            StageRepo::add(&conn, pipeline_id, &stage).unwrap();
        }

        let screening = StageRepo::get_by_name(&conn, pipeline_id, "Screening")
            .unwrap()
            .unwrap();
        StageRepo::remove(&conn, screening.id.unwrap()).unwrap();
        assert_eq!(StageRepo::list_for_pipeline(&conn, pipeline_id).unwrap().len(), 6);

        let cleared = StageRepo::clear_for_pipeline(&conn, pipeline_id).unwrap();
        assert_eq!(cleared, 6);
        assert!(StageRepo::list_for_pipeline(&conn, pipeline_id).unwrap().is_empty());
    }
}
