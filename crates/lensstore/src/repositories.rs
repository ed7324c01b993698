// Repository persistence operations

use crate::error::{Result, StoreError};
use crate::schema::{decode_list, encode_list, from_micros, to_micros, Storage};
use chrono::Utc;
use lenscore::{RepositoryRecord, RepositoryStatus};
use rusqlite::{params, OptionalExtension, Row};

const COLUMNS: &str =
    "id, owner, repo, url, branch, status, file_count, languages, size_kb, created_at, updated_at";

/// Repository store for CRUD operations
pub struct RepositoryStore<'a> {
    storage: &'a mut Storage,
}

/// Raw row before column decoding
struct RepositoryRow {
    id: String,
    owner: String,
    repo: String,
    url: String,
    branch: String,
    status: String,
    file_count: Option<i64>,
    languages: String,
    size_kb: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl RepositoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            repo: row.get(2)?,
            url: row.get(3)?,
            branch: row.get(4)?,
            status: row.get(5)?,
            file_count: row.get(6)?,
            languages: row.get(7)?,
            size_kb: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<RepositoryRecord> {
        let status =
            RepositoryStatus::from_str_name(&self.status).ok_or_else(|| StoreError::Corrupt {
                column: "repositories.status",
                value: self.status.clone(),
            })?;
        Ok(RepositoryRecord {
            id: self.id,
            owner: self.owner,
            repo: self.repo,
            url: self.url,
            branch: self.branch,
            status,
            file_count: self.file_count.map(|v| v as u64),
            languages: decode_list("repositories.languages", &self.languages)?,
            size_kb: self.size_kb.map(|v| v as u64),
            created_at: from_micros(self.created_at),
            updated_at: from_micros(self.updated_at),
        })
    }
}

impl<'a> RepositoryStore<'a> {
    /// Create a new repository store
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    /// Insert a repository record
    pub fn insert(&mut self, record: &RepositoryRecord) -> Result<()> {
        self.storage.conn().execute(
            &format!("INSERT INTO repositories ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                record.id,
                record.owner,
                record.repo,
                record.url,
                record.branch,
                record.status.as_str(),
                record.file_count.map(|v| v as i64),
                encode_list(&record.languages)?,
                record.size_kb.map(|v| v as i64),
                to_micros(record.created_at),
                to_micros(record.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Get a repository by ID
    pub fn get(&self, id: &str) -> Result<Option<RepositoryRecord>> {
        let row = self
            .storage
            .conn()
            .query_row(
                &format!("SELECT {COLUMNS} FROM repositories WHERE id = ?1"),
                params![id],
                RepositoryRow::from_row,
            )
            .optional()?;
        row.map(RepositoryRow::into_record).transpose()
    }

    /// Get a repository by ID, failing when absent
    pub fn require(&self, id: &str) -> Result<RepositoryRecord> {
        self.get(id)?
            .ok_or_else(|| StoreError::not_found("Repository", id))
    }

    /// List repositories, newest first
    pub fn list(&self) -> Result<Vec<RepositoryRecord>> {
        let mut stmt = self.storage.conn().prepare(&format!(
            "SELECT {COLUMNS} FROM repositories ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
            .query_map([], RepositoryRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RepositoryRow::into_record).collect()
    }

    /// Move a repository to `status`, enforcing the lifecycle
    pub fn update_status(&mut self, id: &str, status: RepositoryStatus) -> Result<()> {
        let current = self.require(id)?;
        if !current.status.can_transition_to(status) {
            return Err(lenscore::CoreError::invalid_transition(current.status, status).into());
        }
        self.storage.conn().execute(
            "UPDATE repositories SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), to_micros(Utc::now()), id],
        )?;
        Ok(())
    }

    /// Record clone metadata and mark the repository ready
    pub fn mark_ready(
        &mut self,
        id: &str,
        file_count: u64,
        languages: &[String],
        size_kb: u64,
    ) -> Result<()> {
        self.update_status(id, RepositoryStatus::Ready)?;
        self.storage.conn().execute(
            "UPDATE repositories SET file_count = ?1, languages = ?2, size_kb = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                file_count as i64,
                encode_list(languages)?,
                size_kb as i64,
                to_micros(Utc::now()),
                id
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn storage() -> (NamedTempFile, Storage) {
        let file = NamedTempFile::new().expect("temp file");
        let storage = Storage::open(file.path()).expect("open");
        (file, storage)
    }

    #[test]
    fn insert_and_get_repository() {
        let (_file, mut storage) = storage();
        let mut store = RepositoryStore::new(&mut storage);
        let record = RepositoryRecord::new("acme", "shop", "https://github.com/acme/shop", "main");
        store.insert(&record).expect("insert");

        let loaded = store.get(&record.id).expect("get").expect("present");
        assert_eq!(loaded.full_name(), "acme/shop");
        assert_eq!(loaded.status, RepositoryStatus::Pending);
        assert_eq!(loaded.file_count, None);
        assert!(store.get("missing").expect("get").is_none());
        assert!(store.require("missing").expect_err("missing").is_not_found());
    }

    #[test]
    fn lifecycle_is_enforced() {
        let (_file, mut storage) = storage();
        let mut store = RepositoryStore::new(&mut storage);
        let record = RepositoryRecord::new("acme", "shop", "https://github.com/acme/shop", "main");
        store.insert(&record).expect("insert");

        assert!(store.mark_ready(&record.id, 3, &[], 1).is_err());

        store
            .update_status(&record.id, RepositoryStatus::Cloning)
            .expect("cloning");
        store
            .mark_ready(&record.id, 12, &["Rust".to_string()], 40)
            .expect("ready");

        let loaded = store.require(&record.id).expect("present");
        assert_eq!(loaded.status, RepositoryStatus::Ready);
        assert_eq!(loaded.file_count, Some(12));
        assert_eq!(loaded.languages, vec!["Rust"]);
        assert_eq!(loaded.size_kb, Some(40));
    }

    #[test]
    fn list_returns_all_repositories() {
        let (_file, mut storage) = storage();
        let mut store = RepositoryStore::new(&mut storage);
        for name in ["a", "b", "c"] {
            let record = RepositoryRecord::new("acme", name, "https://github.com/acme/x", "main");
            store.insert(&record).expect("insert");
        }
        assert_eq!(store.list().expect("list").len(), 3);
    }
}
