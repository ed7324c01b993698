//! Repository cloning, repository import, and upload ingestion
//!
//! Every operation records its progress through the repository or project
//! lifecycle. Filesystem and git work runs on the blocking pool; the storage
//! lock is only taken between awaits.

use crate::error::{PipelineError, Result};
use crate::SharedStorage;
use lenscore::{
    ProjectFile, ProjectRecord, ProjectStatus, RepositoryRecord, RepositoryStatus,
};
use lensstore::{DirectoryScan, ProjectStore, RepositoryStore, Storage, StoreError, Workspace};
use std::path::{Path, PathBuf};
use std::sync::MutexGuard;
use tracing::{error, info, warn};

/// A file received through an upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied relative path
    pub filename: String,
    /// Raw bytes
    pub contents: Vec<u8>,
}

/// Owner and repository name from a repository URL.
///
/// Takes the first two path segments; a trailing `.git` is dropped.
pub fn extract_owner_repo(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim();
    let rest = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let path = rest.split_once('/').map(|(_, path)| path).unwrap_or("");
    let path = path.split(['?', '#']).next().unwrap_or("");
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if parts.len() < 2 {
        return Err(PipelineError::InvalidUrl(url.to_string()));
    }
    let owner = parts[0];
    let repo = parts[1].strip_suffix(".git").unwrap_or(parts[1]);
    if repo.is_empty() {
        return Err(PipelineError::InvalidUrl(url.to_string()));
    }
    Ok((owner.to_string(), repo.to_string()))
}

/// Clone URL carrying `token` as userinfo. Only github.com URLs are rewritten.
pub fn authenticated_url(url: &str, token: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) if url.contains("github.com") && !token.is_empty() => {
            format!("{scheme}://{token}@{rest}")
        }
        _ => url.to_string(),
    }
}

/// Reject upload names that would land outside the project directory.
pub fn validate_upload_name(name: &str) -> Result<()> {
    Workspace::resolve(Path::new(""), name)?;
    Ok(())
}

fn clone_and_scan(url: &str, branch: &str, dir: &Path) -> Result<(u64, DirectoryScan)> {
    if let Some(parent) = dir.parent() {
        std::fs::create_dir_all(parent).map_err(StoreError::from)?;
    }
    let mut fetch = git2::FetchOptions::new();
    fetch.depth(1);
    let repo = git2::build::RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch)
        .clone(url, dir)?;
    let file_count = repo.index()?.len() as u64;
    let scan = Workspace::scan_directory(dir)?;
    Ok((file_count, scan))
}

/// Repository and project ingestion over shared storage
#[derive(Clone)]
pub struct Sources {
    storage: SharedStorage,
    workspace: Workspace,
}

impl Sources {
    /// Create sources over `storage` and `workspace`.
    pub fn new(storage: SharedStorage, workspace: Workspace) -> Self {
        Self { storage, workspace }
    }

    /// Directory layout used for clones and project files.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn lock(&self) -> Result<MutexGuard<'_, Storage>> {
        self.storage.lock().map_err(|_| PipelineError::LockPoisoned)
    }

    /// Register a repository for cloning. The clone itself is [`Sources::clone_repository`].
    pub fn start_clone(&self, url: &str, branch: &str) -> Result<RepositoryRecord> {
        let (owner, repo) = extract_owner_repo(url)?;
        let record = RepositoryRecord::new(&owner, &repo, url, branch);
        {
            let mut storage = self.lock()?;
            RepositoryStore::new(&mut storage).insert(&record)?;
        }
        info!("Registered repository {} as {}", record.full_name(), record.id);
        Ok(record)
    }

    /// Shallow-clone a registered repository and record what it holds.
    ///
    /// On failure the repository is marked failed and its directory removed.
    pub async fn clone_repository(
        &self,
        repository_id: &str,
        access_token: Option<String>,
    ) -> Result<RepositoryRecord> {
        let record = {
            let mut storage = self.lock()?;
            let mut store = RepositoryStore::new(&mut storage);
            store.update_status(repository_id, RepositoryStatus::Cloning)?;
            store.require(repository_id)?
        };

        let url = match access_token.as_deref() {
            Some(token) => authenticated_url(&record.url, token),
            None => record.url.clone(),
        };
        let branch = record.branch.clone();
        let dir = self.workspace.clone_dir(repository_id);
        info!(
            "Cloning repository {} (branch: {}) to {}",
            record.url,
            branch,
            dir.display()
        );

        let outcome = tokio::task::spawn_blocking(move || clone_and_scan(&url, &branch, &dir))
            .await
            .map_err(PipelineError::from)
            .and_then(|r| r);

        match outcome {
            Ok((file_count, scan)) => {
                let mut storage = self.lock()?;
                let mut store = RepositoryStore::new(&mut storage);
                store.mark_ready(repository_id, file_count, &scan.languages, scan.size_kb())?;
                info!("Repository cloned successfully: {}", repository_id);
                Ok(store.require(repository_id)?)
            }
            Err(e) => {
                error!("Failed to clone repository {}: {}", repository_id, e);
                {
                    let mut storage = self.lock()?;
                    if let Err(status_err) = RepositoryStore::new(&mut storage)
                        .update_status(repository_id, RepositoryStatus::Failed)
                    {
                        warn!("Could not mark repository {} failed: {}", repository_id, status_err);
                    }
                }
                if let Err(rm_err) = self.workspace.remove_clone_dir(repository_id) {
                    warn!("Could not remove clone of {}: {}", repository_id, rm_err);
                }
                Err(e)
            }
        }
    }

    /// Repository by ID.
    pub fn repository(&self, repository_id: &str) -> Result<RepositoryRecord> {
        let mut storage = self.lock()?;
        Ok(RepositoryStore::new(&mut storage).require(repository_id)?)
    }

    /// All repositories, newest first.
    pub fn repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let mut storage = self.lock()?;
        Ok(RepositoryStore::new(&mut storage).list()?)
    }

    /// Copy a ready repository into a new project.
    pub async fn import_repository(&self, repository_id: &str) -> Result<ProjectRecord> {
        let repository = self.repository(repository_id)?;
        if repository.status != RepositoryStatus::Ready {
            return Err(PipelineError::RepositoryNotReady(repository.status));
        }

        let name = repository.full_name();
        let description = format!("Imported from GitHub repository {name}");
        let project = ProjectRecord::new(&name, Some(&description), ProjectStatus::Importing);
        {
            let mut storage = self.lock()?;
            ProjectStore::new(&mut storage).insert(&project)?;
        }
        info!("Importing repository {} into project {}", name, project.id);

        let src = self.workspace.clone_dir(repository_id);
        let dst = self.workspace.project_dir(&project.id);
        let outcome = tokio::task::spawn_blocking(move || {
            Workspace::copy_tree(&src, &dst)?;
            Workspace::scan_directory(&dst)
        })
        .await;

        self.finish_ingest(&project.id, outcome)
    }

    /// Create an empty project waiting for uploaded files.
    pub fn create_upload_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<ProjectRecord> {
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "project_name must not be empty".to_string(),
            ));
        }
        let project = ProjectRecord::new(name.trim(), description, ProjectStatus::Pending);
        let mut storage = self.lock()?;
        ProjectStore::new(&mut storage).insert(&project)?;
        Ok(project)
    }

    /// Write uploaded files into a project and scan them.
    ///
    /// Archives are stored as ordinary files.
    pub async fn ingest_upload(
        &self,
        project_id: &str,
        files: Vec<UploadedFile>,
    ) -> Result<ProjectRecord> {
        {
            let mut storage = self.lock()?;
            ProjectStore::new(&mut storage).update_status(project_id, ProjectStatus::Processing)?;
        }
        info!("Processing {} uploaded files for project {}", files.len(), project_id);

        let workspace = self.workspace.clone();
        let id = project_id.to_string();
        let outcome = tokio::task::spawn_blocking(move || {
            for file in &files {
                workspace.write_file(&id, &file.filename, &file.contents)?;
            }
            Workspace::scan_directory(&workspace.project_dir(&id))
        })
        .await;

        self.finish_ingest(project_id, outcome)
    }

    fn finish_ingest(
        &self,
        project_id: &str,
        outcome: std::result::Result<lensstore::Result<DirectoryScan>, tokio::task::JoinError>,
    ) -> Result<ProjectRecord> {
        let outcome = outcome
            .map_err(PipelineError::from)
            .and_then(|r| r.map_err(PipelineError::from));

        let mut storage = self.lock()?;
        let mut store = ProjectStore::new(&mut storage);
        match outcome {
            Ok(scan) => {
                store.mark_ready(project_id, &scan)?;
                info!(
                    "Project {} ready with {} files",
                    project_id,
                    scan.file_count()
                );
                Ok(store.require(project_id)?)
            }
            Err(e) => {
                error!("Failed to ingest files for project {}: {}", project_id, e);
                if let Err(status_err) = store.update_status(project_id, ProjectStatus::Failed) {
                    warn!("Could not mark project {} failed: {}", project_id, status_err);
                }
                if let Err(rm_err) = self.workspace.remove_project_dir(project_id) {
                    warn!("Could not remove files of {}: {}", project_id, rm_err);
                }
                Err(e)
            }
        }
    }

    /// Project by ID.
    pub fn project(&self, project_id: &str) -> Result<ProjectRecord> {
        let mut storage = self.lock()?;
        Ok(ProjectStore::new(&mut storage).require(project_id)?)
    }

    /// All projects, newest first.
    pub fn projects(&self) -> Result<Vec<ProjectRecord>> {
        let mut storage = self.lock()?;
        Ok(ProjectStore::new(&mut storage).list()?)
    }

    /// Files of an existing project in scan order.
    pub fn project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        let mut storage = self.lock()?;
        let store = ProjectStore::new(&mut storage);
        store.require(project_id)?;
        Ok(store.files(project_id)?)
    }

    /// Text of one project file.
    pub fn file_content(&self, project_id: &str, path: &str) -> Result<String> {
        self.project(project_id)?;
        Ok(self.workspace.read_file(project_id, path)?)
    }

    /// Remove a project and its files. Returns false when absent.
    pub fn delete_project(&self, project_id: &str) -> Result<bool> {
        let mut storage = self.lock()?;
        let mut store = ProjectStore::new(&mut storage);
        if store.get(project_id)?.is_none() {
            return Ok(false);
        }
        self.workspace.remove_project_dir(project_id)?;
        let deleted = store.delete(project_id)?;
        info!("Deleted project {}", project_id);
        Ok(deleted)
    }

    /// Clone directory of a repository.
    pub fn clone_dir(&self, repository_id: &str) -> PathBuf {
        self.workspace.clone_dir(repository_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://github.com/acme/shop", "acme", "shop")]
    #[case("https://github.com/acme/shop.git", "acme", "shop")]
    #[case("https://github.com/acme/shop/tree/main/src", "acme", "shop")]
    #[case("http://gitlab.example.com/group/tool/", "group", "tool")]
    #[case("github.com/acme/shop?tab=readme", "acme", "shop")]
    fn owner_and_repo(#[case] url: &str, #[case] owner: &str, #[case] repo: &str) {
        let (o, r) = extract_owner_repo(url).expect("parse");
        assert_eq!((o.as_str(), r.as_str()), (owner, repo));
    }

    #[rstest]
    #[case("https://github.com/acme")]
    #[case("https://github.com/")]
    #[case("not a url")]
    #[case("https://github.com/acme/.git")]
    fn urls_without_two_segments_are_rejected(#[case] url: &str) {
        assert!(matches!(
            extract_owner_repo(url),
            Err(PipelineError::InvalidUrl(_))
        ));
    }

    #[test]
    fn token_is_injected_for_github_only() {
        assert_eq!(
            authenticated_url("https://github.com/acme/shop", "tok"),
            "https://tok@github.com/acme/shop"
        );
        assert_eq!(
            authenticated_url("https://gitlab.com/acme/shop", "tok"),
            "https://gitlab.com/acme/shop"
        );
        assert_eq!(
            authenticated_url("https://github.com/acme/shop", ""),
            "https://github.com/acme/shop"
        );
    }

    #[test]
    fn upload_names_stay_inside_the_project() {
        assert!(validate_upload_name("src/app.py").is_ok());
        assert!(validate_upload_name("../../etc/passwd").is_err());
        assert!(validate_upload_name("/abs/path").is_err());
    }
}
