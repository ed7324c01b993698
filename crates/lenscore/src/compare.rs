//! Comparison and aggregation over analysis results
//!
//! Everything here is pure: two result documents in, dashboard metrics out.
//! Percentages are rounded to two decimals; orderings are total so output is
//! stable across runs.

use crate::error::{CoreError, Result};
use crate::model::{AnalysisJob, AnalysisResults, StageResult};
use crate::status::{AnalysisKind, AnalysisStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part` as a percentage of `total`, 0 when `total` is 0.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

/// One entry of a percentage distribution
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Share {
    /// Entry name (language, file type, ...)
    pub name: String,
    /// Absolute count
    pub count: u64,
    /// Share of the total in percent
    pub percent: f64,
}

/// Shares of every entry, largest first, ties by name.
pub fn percentage_distribution(counts: &BTreeMap<String, u64>) -> Vec<Share> {
    let total: u64 = counts.values().sum();
    let mut shares: Vec<Share> = counts
        .iter()
        .map(|(name, count)| Share {
            name: name.clone(),
            count: *count,
            percent: percentage(*count, total),
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    shares
}

/// Change of one entry between two distributions
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistributionDelta {
    /// Entry name
    pub name: String,
    /// Count in the base distribution
    pub base: u64,
    /// Count in the head distribution
    pub head: u64,
    /// `head - base`
    pub delta: i64,
    /// Share of the base total
    pub base_percent: f64,
    /// Share of the head total
    pub head_percent: f64,
    /// `head_percent - base_percent`
    pub percent_delta: f64,
}

fn signed_delta(base: u64, head: u64) -> i64 {
    head as i64 - base as i64
}

/// Entry-wise comparison, largest absolute change first, ties by name.
///
/// Entries missing on one side count as zero there.
pub fn compare_distributions(
    base: &BTreeMap<String, u64>,
    head: &BTreeMap<String, u64>,
) -> Vec<DistributionDelta> {
    let base_total: u64 = base.values().sum();
    let head_total: u64 = head.values().sum();
    let names: BTreeSet<&String> = base.keys().chain(head.keys()).collect();

    let mut deltas: Vec<DistributionDelta> = names
        .into_iter()
        .map(|name| {
            let b = base.get(name).copied().unwrap_or(0);
            let h = head.get(name).copied().unwrap_or(0);
            let base_percent = percentage(b, base_total);
            let head_percent = percentage(h, head_total);
            DistributionDelta {
                name: name.clone(),
                base: b,
                head: h,
                delta: signed_delta(b, h),
                base_percent,
                head_percent,
                percent_delta: round2(head_percent - base_percent),
            }
        })
        .collect();

    deltas.sort_by(|a, b| by_abs_delta_desc(a.delta, b.delta).then_with(|| a.name.cmp(&b.name)));
    deltas
}

/// Set difference between two file lists
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FileSetDiff {
    /// Only in head
    pub added: Vec<String>,
    /// Only in base
    pub removed: Vec<String>,
    /// In both
    pub unchanged: Vec<String>,
}

impl FileSetDiff {
    /// No file was added or removed.
    pub fn is_same(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Added, removed, and common paths; each list sorted and de-duplicated.
pub fn diff_file_sets<S: AsRef<str>>(base: &[S], head: &[S]) -> FileSetDiff {
    let base: BTreeSet<&str> = base.iter().map(AsRef::as_ref).collect();
    let head: BTreeSet<&str> = head.iter().map(AsRef::as_ref).collect();

    FileSetDiff {
        added: head.difference(&base).map(|s| s.to_string()).collect(),
        removed: base.difference(&head).map(|s| s.to_string()).collect(),
        unchanged: base.intersection(&head).map(|s| s.to_string()).collect(),
    }
}

/// Change of a single count
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountDelta {
    /// Base value
    pub base: u64,
    /// Head value
    pub head: u64,
    /// `head - base`
    pub delta: i64,
    /// Relative change in percent; absent when base is 0
    pub percent_change: Option<f64>,
}

impl CountDelta {
    /// Compare two counts.
    pub fn new(base: u64, head: u64) -> Self {
        let delta = signed_delta(base, head);
        let percent_change = if base == 0 {
            None
        } else {
            Some(round2(delta as f64 / base as f64 * 100.0))
        };
        Self {
            base,
            head,
            delta,
            percent_change,
        }
    }
}

/// Primary language on each side
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrimaryLanguage {
    /// Base primary language
    pub base: Option<String>,
    /// Head primary language
    pub head: Option<String>,
    /// The two differ
    pub changed: bool,
}

/// Metrics derived from two result documents
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalysisComparison {
    /// Code file count change
    pub file_count: CountDelta,
    /// Language distribution change
    pub languages: Vec<DistributionDelta>,
    /// Language shares of the head document
    pub head_language_shares: Vec<Share>,
    /// Primary language on each side
    pub primary_language: PrimaryLanguage,
    /// Analyzed-file changes per stage
    pub files: BTreeMap<AnalysisKind, FileSetDiff>,
    /// Stages only present in head
    pub stages_added: Vec<AnalysisKind>,
    /// Stages only present in base
    pub stages_removed: Vec<AnalysisKind>,
    /// Stages holding an error on either side
    pub stages_failed: Vec<AnalysisKind>,
}

fn stage_files(results: &AnalysisResults, kind: AnalysisKind) -> Option<Vec<String>> {
    results.result(kind).map(StageResult::analyzed_files)
}

/// Compare two result documents.
pub fn compare_results(base: &AnalysisResults, head: &AnalysisResults) -> AnalysisComparison {
    let empty = BTreeMap::new();
    let base_code = base.code();
    let head_code = head.code();
    let base_dist = base_code.map(|c| &c.language_distribution).unwrap_or(&empty);
    let head_dist = head_code.map(|c| &c.language_distribution).unwrap_or(&empty);

    let base_primary = base_code.and_then(|c| c.primary_language()).map(str::to_string);
    let head_primary = head_code.and_then(|c| c.primary_language()).map(str::to_string);

    let mut files = BTreeMap::new();
    for kind in AnalysisKind::ALL {
        let base_files = stage_files(base, kind);
        let head_files = stage_files(head, kind);
        if base_files.is_none() && head_files.is_none() {
            continue;
        }
        let diff = diff_file_sets(
            &base_files.unwrap_or_default(),
            &head_files.unwrap_or_default(),
        );
        files.insert(kind, diff);
    }

    let base_kinds: BTreeSet<AnalysisKind> = base.kinds().into_iter().collect();
    let head_kinds: BTreeSet<AnalysisKind> = head.kinds().into_iter().collect();
    let failed: BTreeSet<AnalysisKind> = base
        .failed_kinds()
        .into_iter()
        .chain(head.failed_kinds())
        .collect();

    AnalysisComparison {
        file_count: CountDelta::new(
            base_code.map(|c| c.file_count).unwrap_or(0),
            head_code.map(|c| c.file_count).unwrap_or(0),
        ),
        languages: compare_distributions(base_dist, head_dist),
        head_language_shares: percentage_distribution(head_dist),
        primary_language: PrimaryLanguage {
            changed: base_primary != head_primary,
            base: base_primary,
            head: head_primary,
        },
        files,
        stages_added: head_kinds.difference(&base_kinds).copied().collect(),
        stages_removed: base_kinds.difference(&head_kinds).copied().collect(),
        stages_failed: failed.into_iter().collect(),
    }
}

/// Identity of one side of a job comparison
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobSide {
    /// Analysis ID
    pub analysis_id: String,
    /// Project ID
    pub project_id: String,
    /// Project name at analysis time
    pub project_name: String,
    /// Status (always completed)
    pub status: AnalysisStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&AnalysisJob> for JobSide {
    fn from(job: &AnalysisJob) -> Self {
        Self {
            analysis_id: job.id.clone(),
            project_id: job.project_id.clone(),
            project_name: job.project_name.clone(),
            status: job.status,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Comparison of two completed analysis jobs
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobComparison {
    /// Base job
    pub base: JobSide,
    /// Head job
    pub head: JobSide,
    /// Both jobs analyzed the same project
    pub same_project: bool,
    /// Project file count change between the job snapshots
    pub project_file_count: CountDelta,
    /// Result metrics
    pub comparison: AnalysisComparison,
}

/// Compare two jobs and their results.
///
/// Both jobs must be completed. Jobs of different projects are rejected
/// unless `allow_cross_project` is set.
pub fn compare_jobs(
    base: (&AnalysisJob, &AnalysisResults),
    head: (&AnalysisJob, &AnalysisResults),
    allow_cross_project: bool,
) -> Result<JobComparison> {
    let (base_job, base_results) = base;
    let (head_job, head_results) = head;

    for job in [base_job, head_job] {
        if job.status != AnalysisStatus::Completed {
            return Err(CoreError::NotComparable(format!(
                "analysis {} is not completed (status: {})",
                job.id, job.status
            )));
        }
    }

    let same_project = base_job.project_id == head_job.project_id;
    if !same_project && !allow_cross_project {
        return Err(CoreError::NotComparable(format!(
            "analysis {} belongs to project {} but analysis {} belongs to project {}",
            base_job.id, base_job.project_id, head_job.id, head_job.project_id
        )));
    }

    Ok(JobComparison {
        base: JobSide::from(base_job),
        head: JobSide::from(head_job),
        same_project,
        project_file_count: CountDelta::new(base_job.file_count, head_job.file_count),
        comparison: compare_results(base_results, head_results),
    })
}

/// Orders signed deltas by magnitude, largest first.
pub fn by_abs_delta_desc(a: i64, b: i64) -> Ordering {
    b.unsigned_abs().cmp(&a.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeAnalysis, DependencyAnalysis, ProjectRecord};
    use crate::status::ProjectStatus;
    use rstest::rstest;

    fn dist(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn code(entries: &[(&str, u64)], summarized: &[&str]) -> StageResult {
        let language_distribution = dist(entries);
        StageResult::Code(CodeAnalysis {
            language_summaries: BTreeMap::new(),
            file_summaries: summarized
                .iter()
                .map(|p| (p.to_string(), format!("summary of {p}")))
                .collect(),
            file_count: language_distribution.values().sum(),
            language_distribution,
        })
    }

    fn deps(files: &[&str]) -> StageResult {
        StageResult::Dependencies(DependencyAnalysis {
            dependencies: "a -> b".to_string(),
            dependency_graph: "graph TD".to_string(),
            analyzed_files: files.iter().map(|f| f.to_string()).collect(),
        })
    }

    fn completed_job(project: &ProjectRecord) -> AnalysisJob {
        let mut job = AnalysisJob::new(project, AnalysisKind::defaults());
        job.advance(AnalysisStatus::Running).expect("running");
        job.advance(AnalysisStatus::Completed).expect("completed");
        job
    }

    #[rstest]
    #[case(1, 3, 33.33)]
    #[case(2, 3, 66.67)]
    #[case(5, 5, 100.0)]
    #[case(0, 7, 0.0)]
    #[case(3, 0, 0.0)]
    fn percentage_rounds_to_two_decimals(
        #[case] part: u64,
        #[case] total: u64,
        #[case] expected: f64,
    ) {
        assert_eq!(percentage(part, total), expected);
    }

    #[test]
    fn distribution_sorted_by_count_then_name() {
        let shares = percentage_distribution(&dist(&[("Go", 1), ("Rust", 2), ("C", 1)]));
        let names: Vec<&str> = shares.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "C", "Go"]);
        assert_eq!(shares[0].percent, 50.0);
        assert_eq!(shares[1].percent, 25.0);
        let total: f64 = shares.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 0.05);
    }

    #[test]
    fn empty_distribution_has_no_shares() {
        assert!(percentage_distribution(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn distribution_deltas_sorted_by_magnitude() {
        let base = dist(&[("Python", 10), ("JavaScript", 5), ("Go", 2)]);
        let head = dist(&[("Python", 4), ("JavaScript", 6), ("Rust", 6)]);
        let deltas = compare_distributions(&base, &head);

        let order: Vec<(&str, i64)> = deltas.iter().map(|d| (d.name.as_str(), d.delta)).collect();
        assert_eq!(
            order,
            vec![("Python", -6), ("Rust", 6), ("Go", -2), ("JavaScript", 1)]
        );

        let rust = &deltas[1];
        assert_eq!(rust.base, 0);
        assert_eq!(rust.base_percent, 0.0);
        assert_eq!(rust.head_percent, 37.5);
        assert_eq!(rust.percent_delta, 37.5);

        let python = &deltas[0];
        assert_eq!(python.base_percent, 58.82);
        assert_eq!(python.head_percent, 25.0);
        assert_eq!(python.percent_delta, -33.82);
    }

    #[test]
    fn file_sets_partition_paths() {
        let base = vec!["src/a.rs", "src/b.rs", "src/b.rs", "README.md"];
        let head = vec!["src/b.rs", "src/c.rs", "README.md"];
        let diff = diff_file_sets(&base, &head);
        assert_eq!(diff.added, vec!["src/c.rs"]);
        assert_eq!(diff.removed, vec!["src/a.rs"]);
        assert_eq!(diff.unchanged, vec!["README.md", "src/b.rs"]);
        assert!(!diff.is_same());

        let same = diff_file_sets(&head, &head);
        assert!(same.is_same());
    }

    #[test]
    fn count_delta_without_base_has_no_percentage() {
        assert_eq!(CountDelta::new(0, 5).percent_change, None);
        let grown = CountDelta::new(8, 10);
        assert_eq!(grown.delta, 2);
        assert_eq!(grown.percent_change, Some(25.0));
        assert_eq!(CountDelta::new(10, 4).delta, -6);
    }

    #[test]
    fn empty_documents_compare_to_nothing() {
        let cmp = compare_results(&AnalysisResults::new(), &AnalysisResults::new());
        assert_eq!(cmp.file_count.delta, 0);
        assert!(cmp.languages.is_empty());
        assert!(cmp.files.is_empty());
        assert!(cmp.stages_added.is_empty());
        assert!(cmp.stages_removed.is_empty());
        assert!(cmp.stages_failed.is_empty());
        assert!(!cmp.primary_language.changed);
    }

    #[test]
    fn results_comparison_tracks_stages_and_files() {
        let mut base = AnalysisResults::new();
        base.insert_result(code(&[("Python", 3)], &["app.py", "util.py"]));
        base.insert_result(deps(&["app.py", "util.py"]));
        base.insert_error(AnalysisKind::Business, "timeout");

        let mut head = AnalysisResults::new();
        head.insert_result(code(&[("Python", 2), ("Rust", 3)], &["app.py", "core.rs"]));
        head.insert_error(AnalysisKind::Dependencies, "rate limited");
        head.insert_result(StageResult::Architecture(Default::default()));

        let cmp = compare_results(&base, &head);

        assert_eq!(cmp.file_count, CountDelta::new(3, 5));
        assert_eq!(cmp.primary_language.base.as_deref(), Some("Python"));
        assert_eq!(cmp.primary_language.head.as_deref(), Some("Rust"));
        assert!(cmp.primary_language.changed);

        let code_files = &cmp.files[&AnalysisKind::Code];
        assert_eq!(code_files.added, vec!["core.rs"]);
        assert_eq!(code_files.removed, vec!["util.py"]);

        // failed on head: treated as absent, every base file counts as removed
        let dep_files = &cmp.files[&AnalysisKind::Dependencies];
        assert!(dep_files.added.is_empty());
        assert_eq!(dep_files.removed, vec!["app.py", "util.py"]);

        // failed on base, missing on head: nothing to diff
        assert!(!cmp.files.contains_key(&AnalysisKind::Business));

        assert_eq!(cmp.stages_added, vec![AnalysisKind::Architecture]);
        assert_eq!(cmp.stages_removed, vec![AnalysisKind::Business]);
        assert_eq!(
            cmp.stages_failed,
            vec![AnalysisKind::Dependencies, AnalysisKind::Business]
        );
        assert_eq!(cmp.head_language_shares[0].name, "Rust");
        assert_eq!(cmp.head_language_shares[0].percent, 60.0);
    }

    #[test]
    fn base_side_error_is_reported_as_failed() {
        let mut base = AnalysisResults::new();
        base.insert_error(AnalysisKind::Business, "timeout");

        let mut head = AnalysisResults::new();
        head.insert_result(StageResult::Business(Default::default()));

        let cmp = compare_results(&base, &head);
        assert_eq!(cmp.stages_failed, vec![AnalysisKind::Business]);
        assert!(cmp.stages_added.is_empty());
        assert!(cmp.stages_removed.is_empty());

        let mut both = AnalysisResults::new();
        both.insert_error(AnalysisKind::Business, "rate limited");
        let cmp = compare_results(&base, &both);
        assert_eq!(cmp.stages_failed, vec![AnalysisKind::Business]);
    }

    #[test]
    fn jobs_must_be_completed() {
        let project = ProjectRecord::new("demo", None, ProjectStatus::Ready);
        let done = completed_job(&project);
        let pending = AnalysisJob::new(&project, AnalysisKind::defaults());
        let results = AnalysisResults::new();

        let err = compare_jobs((&done, &results), (&pending, &results), false)
            .expect_err("pending head");
        assert!(matches!(err, CoreError::NotComparable(_)));
        assert!(err.to_string().contains("pending"));
    }

    #[test]
    fn cross_project_requires_opt_in() {
        let first = ProjectRecord::new("one", None, ProjectStatus::Ready);
        let mut second = ProjectRecord::new("two", None, ProjectStatus::Ready);
        second.file_count = 12;
        let a = completed_job(&first);
        let b = completed_job(&second);
        let results = AnalysisResults::new();

        assert!(compare_jobs((&a, &results), (&b, &results), false).is_err());

        let cmp = compare_jobs((&a, &results), (&b, &results), true).expect("allowed");
        assert!(!cmp.same_project);
        assert_eq!(cmp.project_file_count.head, 12);
        assert_eq!(cmp.head.project_name, "two");
    }

    #[test]
    fn abs_delta_ordering() {
        let mut values = vec![3, -7, 0, 5];
        values.sort_by(|a, b| by_abs_delta_desc(*a, *b));
        assert_eq!(values, vec![-7, 5, 3, 0]);
    }
}
