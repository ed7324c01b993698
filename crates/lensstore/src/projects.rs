// Project persistence operations

use crate::error::{Result, StoreError};
use crate::schema::{decode_list, encode_list, from_micros, to_micros, Storage};
use crate::workspace::DirectoryScan;
use chrono::Utc;
use lenscore::{ProjectFile, ProjectRecord, ProjectStatus};
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str =
    "id, name, description, status, file_count, languages, size_kb, created_at, updated_at";

/// Project store for CRUD operations
pub struct ProjectStore<'a> {
    storage: &'a mut Storage,
}

struct ProjectRow {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    file_count: i64,
    languages: String,
    size_kb: i64,
    created_at: i64,
    updated_at: i64,
}

impl ProjectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            file_count: row.get(4)?,
            languages: row.get(5)?,
            size_kb: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<ProjectRecord> {
        let status =
            ProjectStatus::from_str_name(&self.status).ok_or_else(|| StoreError::Corrupt {
                column: "projects.status",
                value: self.status.clone(),
            })?;
        Ok(ProjectRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            status,
            file_count: self.file_count.max(0) as u64,
            languages: decode_list("projects.languages", &self.languages)?,
            size_kb: self.size_kb.max(0) as u64,
            created_at: from_micros(self.created_at),
            updated_at: from_micros(self.updated_at),
        })
    }
}

impl<'a> ProjectStore<'a> {
    /// Create a new project store
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    /// Insert a project record
    pub fn insert(&mut self, record: &ProjectRecord) -> Result<()> {
        self.storage.conn().execute(
            &format!("INSERT INTO projects ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                record.id,
                record.name,
                record.description,
                record.status.as_str(),
                record.file_count as i64,
                encode_list(&record.languages)?,
                record.size_kb as i64,
                to_micros(record.created_at),
                to_micros(record.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Get a project by ID
    pub fn get(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let row = self
            .storage
            .conn()
            .query_row(
                &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                ProjectRow::from_row,
            )
            .optional()?;
        row.map(ProjectRow::into_record).transpose()
    }

    /// Get a project by ID, failing when absent
    pub fn require(&self, id: &str) -> Result<ProjectRecord> {
        self.get(id)?.ok_or_else(|| StoreError::not_found("Project", id))
    }

    /// List projects, newest first
    pub fn list(&self) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self.storage.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM projects ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
            .query_map([], ProjectRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ProjectRow::into_record).collect()
    }

    /// Move a project to `status`, enforcing the lifecycle
    pub fn update_status(&mut self, id: &str, status: ProjectStatus) -> Result<()> {
        let current = self.require(id)?;
        if !current.status.can_transition_to(status) {
            return Err(lenscore::CoreError::invalid_transition(current.status, status).into());
        }
        self.storage.conn().execute(
            "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), to_micros(Utc::now()), id],
        )?;
        Ok(())
    }

    /// Replace the file list from a directory scan and mark the project ready
    pub fn mark_ready(&mut self, id: &str, scan: &DirectoryScan) -> Result<()> {
        let current = self.require(id)?;
        if !current.status.can_transition_to(ProjectStatus::Ready) {
            return Err(
                lenscore::CoreError::invalid_transition(current.status, ProjectStatus::Ready)
                    .into(),
            );
        }

        let tx = self.storage.conn_mut().transaction()?;
        tx.execute(
            "UPDATE projects SET status = ?1, file_count = ?2, languages = ?3, size_kb = ?4, updated_at = ?5 WHERE id = ?6",
            params![
                ProjectStatus::Ready.as_str(),
                scan.file_count() as i64,
                encode_list(&scan.languages)?,
                scan.size_kb() as i64,
                to_micros(Utc::now()),
                id
            ],
        )?;
        tx.execute("DELETE FROM project_files WHERE project_id = ?1", params![id])?;
        for (position, file) in scan.files.iter().enumerate() {
            tx.execute(
                "INSERT INTO project_files (project_id, path, size_bytes, language, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    file.path,
                    file.size_bytes as i64,
                    file.language,
                    position as i64
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Files of a project in scan order
    pub fn files(&self, id: &str) -> Result<Vec<ProjectFile>> {
        let mut stmt = self.storage.conn().prepare(
            "SELECT path, size_bytes, language FROM project_files WHERE project_id = ?1 ORDER BY position",
        )?;
        let files = stmt
            .query_map(params![id], |row| {
                Ok(ProjectFile {
                    path: row.get(0)?,
                    size_bytes: row.get::<_, i64>(1)?.max(0) as u64,
                    language: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Delete a project and its file list. Returns false when absent.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let changed = self
            .storage
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
