use rusqlite::{Connection, OptionalExtension};
use crate::models::{Pipeline, PipelineStatus};
use anyhow::{Context, Result};

/// Pipeline repository for database operations
///
/// Manages pipeline records with support for:
/// - Creating pipelines (optionally seeded from a stage template)
/// - Querying pipelines by name or ID
/// - Renaming and activating/deactivating pipelines
/// - Soft deletion (rows are retained with status 'deleted')
///
/// # Example
///
/// ```no_run
/// use pipeplan::db::DbConnection;
/// use pipeplan::repo::PipelineRepo;
///
/// let conn = DbConnection::connect().unwrap();
/// let pipeline = PipelineRepo::create(&conn, "Q3 Engineering", None, None).unwrap();
/// ```
pub struct PipelineRepo;

fn row_to_pipeline(row: &rusqlite::Row) -> rusqlite::Result<Pipeline> {
    let status_str: String = row.get(5)?;
    Ok(Pipeline {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        name: row.get(2)?,
        client: row.get(3)?,
        description: row.get(4)?,
        status: PipelineStatus::from_str(&status_str).unwrap_or(PipelineStatus::Inactive),
        created_ts: row.get(6)?,
        modified_ts: row.get(7)?,
    })
}

const PIPELINE_COLS: &str = "id, uuid, name, client, description, status, created_ts, modified_ts";

impl PipelineRepo {
    /// Create a new pipeline
    pub fn create(
        conn: &Connection,
        name: &str,
        client: Option<&str>,
        description: Option<&str>,
    ) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(name.to_string());
        pipeline.client = client.map(|s| s.to_string());
        pipeline.description = description.map(|s| s.to_string());

        conn.execute(
            "INSERT INTO pipelines (uuid, name, client, description, status, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                pipeline.uuid,
                pipeline.name,
                pipeline.client,
                pipeline.description,
                pipeline.status.as_str(),
                pipeline.created_ts,
                pipeline.modified_ts
            ],
        )
        .with_context(|| format!("Failed to create pipeline: {}", name))?;

        let id = conn.last_insert_rowid();
        log::info!("created pipeline '{}' (id {})", name, id);
        Ok(Pipeline {
            id: Some(id),
            ..pipeline
        })
    }

    /// Get pipeline by ID (any status)
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Pipeline>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pipelines WHERE id = ?1",
            PIPELINE_COLS
        ))?;
        let pipeline = stmt.query_row([id], row_to_pipeline).optional()?;
        Ok(pipeline)
    }

    /// Get a non-deleted pipeline by name
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Pipeline>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pipelines WHERE name = ?1 AND status != 'deleted'",
            PIPELINE_COLS
        ))?;
        let pipeline = stmt.query_row([name], row_to_pipeline).optional()?;
        Ok(pipeline)
    }

    /// List pipelines (active only, or all non-deleted)
    pub fn list(conn: &Connection, include_inactive: bool) -> Result<Vec<Pipeline>> {
        let query = if include_inactive {
            format!(
                "SELECT {} FROM pipelines WHERE status != 'deleted' ORDER BY name",
                PIPELINE_COLS
            )
        } else {
            format!(
                "SELECT {} FROM pipelines WHERE status = 'active' ORDER BY name",
                PIPELINE_COLS
            )
        };

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([], row_to_pipeline)?;

        let mut pipelines = Vec::new();
        for row in rows {
            pipelines.push(row?);
        }

        Ok(pipelines)
    }

    /// Rename a pipeline
    pub fn rename(conn: &Connection, old_name: &str, new_name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let updated = conn
            .execute(
                "UPDATE pipelines SET name = ?1, modified_ts = ?2
                 WHERE name = ?3 AND status != 'deleted'",
                rusqlite::params![new_name, now, old_name],
            )
            .with_context(|| {
                format!("Failed to rename pipeline from {} to {}", old_name, new_name)
            })?;

        if updated == 0 {
            anyhow::bail!("Pipeline '{}' not found", old_name);
        }
        log::info!("renamed pipeline '{}' to '{}'", old_name, new_name);
        Ok(())
    }

    /// Set pipeline status (activate/deactivate)
    pub fn set_status(conn: &Connection, name: &str, status: PipelineStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let updated = conn.execute(
            "UPDATE pipelines SET status = ?1, modified_ts = ?2
             WHERE name = ?3 AND status != 'deleted'",
            rusqlite::params![status.as_str(), now, name],
        )?;

        if updated == 0 {
            anyhow::bail!("Pipeline '{}' not found", name);
        }
        log::info!("pipeline '{}' is now {}", name, status.as_str());
        Ok(())
    }

    /// Soft-delete a pipeline; its stages and saved plans are retained
    pub fn delete(conn: &Connection, name: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let updated = conn.execute(
            "UPDATE pipelines SET status = 'deleted', modified_ts = ?1
             WHERE name = ?2 AND status != 'deleted'",
            rusqlite::params![now, name],
        )?;

        if updated == 0 {
            anyhow::bail!("Pipeline '{}' not found", name);
        }
        log::info!("deleted pipeline '{}'", name);
        Ok(())
    }

    /// Update client and description
    pub fn update_details(
        conn: &Connection,
        name: &str,
        client: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let updated = conn.execute(
            "UPDATE pipelines SET client = ?1, description = ?2, modified_ts = ?3
             WHERE name = ?4 AND status != 'deleted'",
            rusqlite::params![client, description, now, name],
        )?;

        if updated == 0 {
            anyhow::bail!("Pipeline '{}' not found", name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;

    #[test]
    fn test_create_pipeline() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline = PipelineRepo::create(&conn, "Q3 Engineering", Some("Acme"), None).unwrap();

        assert_eq!(pipeline.name, "Q3 Engineering");
        assert_eq!(pipeline.client.as_deref(), Some("Acme"));
        assert_eq!(pipeline.status, PipelineStatus::Active);
        assert!(pipeline.id.is_some());
    }

    #[test]
    fn test_create_duplicate_pipeline() {
        let conn = DbConnection::connect_in_memory().unwrap();
        PipelineRepo::create(&conn, "Q3 Engineering", None, None).unwrap();

        // Should fail due to unique constraint
        let result = PipelineRepo::create(&conn, "Q3 Engineering", None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_by_name() {
        let conn = DbConnection::connect_in_memory().unwrap();
        PipelineRepo::create(&conn, "Q3 Engineering", None, None).unwrap();

        let pipeline = PipelineRepo::get_by_name(&conn, "Q3 Engineering").unwrap();
        assert!(pipeline.is_some());
        assert_eq!(pipeline.unwrap().name, "Q3 Engineering");

        let missing = PipelineRepo::get_by_name(&conn, "nonexistent").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_list_pipelines() {
        let conn = DbConnection::connect_in_memory().unwrap();
        PipelineRepo::create(&conn, "Sales", None, None).unwrap();
        PipelineRepo::create(&conn, "Engineering", None, None).unwrap();

        let pipelines = PipelineRepo::list(&conn, false).unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].name, "Engineering");
        assert_eq!(pipelines[1].name, "Sales");
    }

    #[test]
    fn test_list_excludes_inactive_by_default() {
        let conn = DbConnection::connect_in_memory().unwrap();
        PipelineRepo::create(&conn, "Sales", None, None).unwrap();
        PipelineRepo::create(&conn, "Old", None, None).unwrap();
        PipelineRepo::set_status(&conn, "Old", PipelineStatus::Inactive).unwrap();

        let active = PipelineRepo::list(&conn, false).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Sales");

        let all = PipelineRepo::list(&conn, true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_rename_pipeline() {
        let conn = DbConnection::connect_in_memory().unwrap();
        PipelineRepo::create(&conn, "Sales", None, None).unwrap();
        PipelineRepo::rename(&conn, "Sales", "Sales EMEA").unwrap();

        assert!(PipelineRepo::get_by_name(&conn, "Sales EMEA").unwrap().is_some());
        assert!(PipelineRepo::get_by_name(&conn, "Sales").unwrap().is_none());
    }

    #[test]
    fn test_soft_delete_hides_pipeline() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let created = PipelineRepo::create(&conn, "Sales", None, None).unwrap();
        PipelineRepo::delete(&conn, "Sales").unwrap();

        // Hidden from name lookup and listings
        assert!(PipelineRepo::get_by_name(&conn, "Sales").unwrap().is_none());
        assert!(PipelineRepo::list(&conn, true).unwrap().is_empty());

        // Row is retained
        let by_id = PipelineRepo::get_by_id(&conn, created.id.unwrap()).unwrap();
        assert_eq!(by_id.unwrap().status, PipelineStatus::Deleted);
    }

    #[test]
    fn test_delete_missing_pipeline() {
        let conn = DbConnection::connect_in_memory().unwrap();
        assert!(PipelineRepo::delete(&conn, "nope").is_err());
    }
}
