// Integration tests for records surviving a storage reopen
//
// These tests drive the stores the way the pipeline does and then read
// everything back through a fresh connection.

#[cfg(test)]
mod tests {
    use lenscore::{
        AnalysisJob, AnalysisKind, AnalysisStatus, CodeAnalysis, ProjectFile, ProjectRecord,
        ProjectStatus, RepositoryRecord, RepositoryStatus, StageOutcome, StageResult,
    };
    use lensstore::{AnalysisStore, DirectoryScan, ProjectStore, RepositoryStore, Storage};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn scan() -> DirectoryScan {
        DirectoryScan {
            files: vec![
                ProjectFile {
                    path: "src/main.rs".to_string(),
                    size_bytes: 2048,
                    language: Some("Rust".to_string()),
                },
                ProjectFile {
                    path: "LICENSE".to_string(),
                    size_bytes: 1024,
                    language: None,
                },
            ],
            size_bytes: 3072,
            languages: vec!["Rust".to_string()],
        }
    }

    fn code_result() -> StageOutcome {
        let mut distribution = BTreeMap::new();
        distribution.insert("Rust".to_string(), 1);
        StageOutcome::Completed(StageResult::Code(CodeAnalysis {
            file_count: 1,
            language_distribution: distribution,
            ..Default::default()
        }))
    }

    #[test]
    fn completed_job_survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let db = dir.path().join("codelens.db");

        let (project_id, job_id) = {
            let mut storage = Storage::open(&db).expect("open");

            let project = ProjectRecord::new("shop", Some("storefront"), ProjectStatus::Pending);
            let mut projects = ProjectStore::new(&mut storage);
            projects.insert(&project).expect("insert project");
            projects.mark_ready(&project.id, &scan()).expect("ready");
            let project = projects.require(&project.id).expect("project");

            let mut job = AnalysisJob::new(&project, vec![AnalysisKind::Code]);
            let mut analyses = AnalysisStore::new(&mut storage);
            analyses.insert(&job).expect("insert job");
            job.advance(AnalysisStatus::Running).expect("running");
            job.advance(AnalysisStatus::AnalyzingCode).expect("code");
            analyses.update(&job).expect("update");
            analyses
                .save_result(&job.id, AnalysisKind::Code, &code_result())
                .expect("save");
            job.advance(AnalysisStatus::Completed).expect("completed");
            analyses.update(&job).expect("complete");

            (project.id, job.id)
        };

        let mut storage = Storage::open(&db).expect("reopen");

        let projects = ProjectStore::new(&mut storage);
        let project = projects.require(&project_id).expect("project");
        assert_eq!(project.status, ProjectStatus::Ready);
        assert_eq!(project.file_count, 2);
        assert_eq!(project.size_kb, 3);
        assert_eq!(project.languages, vec!["Rust".to_string()]);
        let files = projects.files(&project_id).expect("files");
        assert_eq!(files[0].path, "src/main.rs");
        assert_eq!(files[1].language, None);

        let analyses = AnalysisStore::new(&mut storage);
        let job = analyses.require(&job_id).expect("job");
        assert_eq!(job.status, AnalysisStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.completed_at.is_some());
        assert_eq!(job.project_name, "shop");

        let results = analyses.results(&job_id).expect("results");
        assert_eq!(results.code().map(|c| c.file_count), Some(1));
        assert_eq!(
            analyses
                .latest_completed(&project_id, Some(AnalysisKind::Code))
                .expect("latest")
                .map(|j| j.id),
            Some(job_id.clone())
        );
        assert!(analyses
            .latest_completed(&project_id, Some(AnalysisKind::Business))
            .expect("latest")
            .is_none());
    }

    #[test]
    fn terminal_job_is_not_rewritten() {
        let dir = TempDir::new().expect("temp dir");
        let mut storage = Storage::open(dir.path().join("codelens.db")).expect("open");

        let project = ProjectRecord::new("shop", None, ProjectStatus::Pending);
        ProjectStore::new(&mut storage)
            .insert(&project)
            .expect("insert project");

        let mut job = AnalysisJob::new(&project, vec![AnalysisKind::Code]);
        let mut analyses = AnalysisStore::new(&mut storage);
        analyses.insert(&job).expect("insert");
        job.fail("boom").expect("fail");
        analyses.update(&job).expect("update");

        let mut stale = job.clone();
        stale.status = AnalysisStatus::Running;
        assert!(analyses.update(&stale).is_err());
        assert_eq!(
            analyses.require(&job.id).expect("job").error.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn repository_metadata_is_recorded_on_ready() {
        let dir = TempDir::new().expect("temp dir");
        let mut storage = Storage::open(dir.path().join("codelens.db")).expect("open");

        let record =
            RepositoryRecord::new("acme", "shop", "https://github.com/acme/shop", "main");
        let mut repos = RepositoryStore::new(&mut storage);
        repos.insert(&record).expect("insert");
        assert!(repos.mark_ready(&record.id, 3, &[], 1).is_err());

        repos
            .update_status(&record.id, RepositoryStatus::Cloning)
            .expect("cloning");
        repos
            .mark_ready(&record.id, 3, &["Python".to_string()], 12)
            .expect("ready");

        let stored = repos.require(&record.id).expect("repository");
        assert_eq!(stored.status, RepositoryStatus::Ready);
        assert_eq!(stored.file_count, Some(3));
        assert_eq!(stored.languages, vec!["Python".to_string()]);
        assert_eq!(stored.full_name(), "acme/shop");
        assert_eq!(repos.list().expect("list").len(), 1);
    }
}
