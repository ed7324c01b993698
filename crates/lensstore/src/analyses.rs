// Analysis job and stage result persistence

use crate::error::{Result, StoreError};
use crate::schema::{decode_list, encode_list, from_micros, to_micros, Storage};
use chrono::Utc;
use lenscore::{AnalysisJob, AnalysisKind, AnalysisResults, AnalysisStatus, StageOutcome};
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

const COLUMNS: &str = "id, project_id, analysis_types, status, progress, created_at, updated_at, \
     completed_at, error, project_name, file_count, languages";

/// Analysis store for jobs and their stage outcomes
pub struct AnalysisStore<'a> {
    storage: &'a mut Storage,
}

struct AnalysisRow {
    id: String,
    project_id: String,
    analysis_types: String,
    status: String,
    progress: i64,
    created_at: i64,
    updated_at: i64,
    completed_at: Option<i64>,
    error: Option<String>,
    project_name: String,
    file_count: i64,
    languages: String,
}

impl AnalysisRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            analysis_types: row.get(2)?,
            status: row.get(3)?,
            progress: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            completed_at: row.get(7)?,
            error: row.get(8)?,
            project_name: row.get(9)?,
            file_count: row.get(10)?,
            languages: row.get(11)?,
        })
    }

    fn into_job(self) -> Result<AnalysisJob> {
        let status =
            AnalysisStatus::from_str_name(&self.status).ok_or_else(|| StoreError::Corrupt {
                column: "analyses.status",
                value: self.status.clone(),
            })?;

        let mut analysis_types = Vec::new();
        for name in decode_list("analyses.analysis_types", &self.analysis_types)? {
            match AnalysisKind::from_str_name(&name) {
                Some(kind) => analysis_types.push(kind),
                None => warn!("Skipping unknown analysis type {} on job {}", name, self.id),
            }
        }

        Ok(AnalysisJob {
            id: self.id,
            project_id: self.project_id,
            analysis_types,
            status,
            progress: self.progress.clamp(0, 100) as u8,
            created_at: from_micros(self.created_at),
            updated_at: from_micros(self.updated_at),
            completed_at: self.completed_at.map(from_micros),
            error: self.error,
            project_name: self.project_name,
            file_count: self.file_count.max(0) as u64,
            languages: decode_list("analyses.languages", &self.languages)?,
        })
    }
}

fn kind_names(kinds: &[AnalysisKind]) -> Vec<String> {
    kinds.iter().map(|k| k.as_str().to_string()).collect()
}

impl<'a> AnalysisStore<'a> {
    /// Create a new analysis store
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    /// Insert a job
    pub fn insert(&mut self, job: &AnalysisJob) -> Result<()> {
        self.storage.conn().execute(
            &format!(
                "INSERT INTO analyses ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                job.id,
                job.project_id,
                encode_list(&kind_names(&job.analysis_types))?,
                job.status.as_str(),
                job.progress as i64,
                to_micros(job.created_at),
                to_micros(job.updated_at),
                job.completed_at.map(to_micros),
                job.error,
                job.project_name,
                job.file_count as i64,
                encode_list(&job.languages)?,
            ],
        )?;
        Ok(())
    }

    /// Get a job by ID
    pub fn get(&self, id: &str) -> Result<Option<AnalysisJob>> {
        let row = self
            .storage
            .conn()
            .query_row(
                &format!("SELECT {COLUMNS} FROM analyses WHERE id = ?1"),
                params![id],
                AnalysisRow::from_row,
            )
            .optional()?;
        row.map(AnalysisRow::into_job).transpose()
    }

    /// Get a job by ID, failing when absent
    pub fn require(&self, id: &str) -> Result<AnalysisJob> {
        self.get(id)?.ok_or_else(|| StoreError::not_found("Analysis", id))
    }

    /// Jobs of a project, newest first
    pub fn list_for_project(&self, project_id: &str) -> Result<Vec<AnalysisJob>> {
        let mut stmt = self.storage.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM analyses WHERE project_id = ?1 ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
            .query_map(params![project_id], AnalysisRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(AnalysisRow::into_job).collect()
    }

    /// Persist the mutable fields of a job.
    ///
    /// A job already stored in a terminal status is never rewritten.
    pub fn update(&mut self, job: &AnalysisJob) -> Result<()> {
        let stored = self.require(&job.id)?;
        if stored.status.is_terminal() {
            return Err(lenscore::CoreError::invalid_transition(stored.status, job.status).into());
        }
        self.storage.conn().execute(
            "UPDATE analyses SET status = ?1, progress = ?2, updated_at = ?3, completed_at = ?4, error = ?5
             WHERE id = ?6",
            params![
                job.status.as_str(),
                job.progress as i64,
                to_micros(job.updated_at),
                job.completed_at.map(to_micros),
                job.error,
                job.id
            ],
        )?;
        Ok(())
    }

    /// Store the outcome of one stage, replacing any earlier outcome.
    pub fn save_result(
        &mut self,
        job_id: &str,
        kind: AnalysisKind,
        outcome: &StageOutcome,
    ) -> Result<()> {
        let payload = serde_json::to_string(outcome)?;
        self.storage.conn().execute(
            "INSERT OR REPLACE INTO analysis_results (analysis_id, analysis_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![job_id, kind.as_str(), payload, to_micros(Utc::now())],
        )?;
        Ok(())
    }

    /// All stage outcomes of a job
    pub fn results(&self, job_id: &str) -> Result<AnalysisResults> {
        let mut stmt = self.storage.conn().prepare(
            "SELECT analysis_type, payload FROM analysis_results WHERE analysis_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![job_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut results = AnalysisResults::new();
        for (name, payload) in rows {
            let Some(kind) = AnalysisKind::from_str_name(&name) else {
                warn!("Skipping stored result of unknown type {} on job {}", name, job_id);
                continue;
            };
            let value: serde_json::Value = serde_json::from_str(&payload)?;
            results.insert(kind, StageOutcome::from_value(kind, value)?);
        }
        Ok(results)
    }

    /// Whether a job holds an outcome for `kind`
    pub fn has_result(&self, job_id: &str, kind: AnalysisKind) -> Result<bool> {
        let found = self
            .storage
            .conn()
            .query_row(
                "SELECT 1 FROM analysis_results WHERE analysis_id = ?1 AND analysis_type = ?2",
                params![job_id, kind.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Newest completed job of a project.
    ///
    /// With a kind, the job must have requested it and hold a result for it.
    pub fn latest_completed(
        &self,
        project_id: &str,
        kind: Option<AnalysisKind>,
    ) -> Result<Option<AnalysisJob>> {
        let mut stmt = self.storage.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM analyses WHERE project_id = ?1 AND status = ?2
             ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
            .query_map(
                params![project_id, AnalysisStatus::Completed.as_str()],
                AnalysisRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for row in rows {
            let job = row.into_job()?;
            match kind {
                None => return Ok(Some(job)),
                Some(kind) => {
                    if job.analysis_types.contains(&kind) && self.has_result(&job.id, kind)? {
                        return Ok(Some(job));
                    }
                }
            }
        }
        Ok(None)
    }
}
