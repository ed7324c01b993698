//! Status enums and lifecycle transitions
//!
//! An analysis job moves `pending -> running -> analyzing_* -> completed`,
//! with `failed` reachable from every non-terminal status. Repositories and
//! projects carry smaller lifecycles of their own.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of analysis requested for a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Per-language and per-file code summaries
    Code,
    /// Inter-file dependency analysis and graph
    Dependencies,
    /// Business functionality and entities
    Business,
    /// Architecture analysis and diagram
    Architecture,
}

impl AnalysisKind {
    /// All kinds in their canonical execution order.
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Code,
        AnalysisKind::Dependencies,
        AnalysisKind::Business,
        AnalysisKind::Architecture,
    ];

    /// Return the wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Code => "code",
            AnalysisKind::Dependencies => "dependencies",
            AnalysisKind::Business => "business",
            AnalysisKind::Architecture => "architecture",
        }
    }

    /// Create a kind from its wire name.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "code" => Some(AnalysisKind::Code),
            "dependencies" => Some(AnalysisKind::Dependencies),
            "business" => Some(AnalysisKind::Business),
            "architecture" => Some(AnalysisKind::Architecture),
            _ => None,
        }
    }

    /// Parse a wire name, reporting unknown names as errors.
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str_name(s.trim()).ok_or_else(|| CoreError::UnknownAnalysisKind(s.to_string()))
    }

    /// Split a requested list into known kinds and rejected names.
    ///
    /// Known kinds keep their first-seen order with duplicates removed.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> (Vec<AnalysisKind>, Vec<String>) {
        let mut kinds = Vec::new();
        let mut rejected = Vec::new();
        for name in names {
            match Self::parse(name.as_ref()) {
                Ok(kind) => {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                Err(_) => rejected.push(name.as_ref().to_string()),
            }
        }
        (kinds, rejected)
    }

    /// Default selection when a request names no kinds.
    pub fn defaults() -> Vec<AnalysisKind> {
        Self::ALL.to_vec()
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an analysis job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Created, not yet picked up
    Pending,
    /// Picked up, no stage started yet
    Running,
    /// Code stage in progress
    AnalyzingCode,
    /// Dependency stage in progress
    AnalyzingDependencies,
    /// Business stage in progress
    AnalyzingBusiness,
    /// Architecture stage in progress
    AnalyzingArchitecture,
    /// All requested stages attempted
    Completed,
    /// Run aborted
    Failed,
}

impl AnalysisStatus {
    /// Return the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Running => "running",
            AnalysisStatus::AnalyzingCode => "analyzing_code",
            AnalysisStatus::AnalyzingDependencies => "analyzing_dependencies",
            AnalysisStatus::AnalyzingBusiness => "analyzing_business",
            AnalysisStatus::AnalyzingArchitecture => "analyzing_architecture",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Create a status from its wire name.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnalysisStatus::Pending),
            "running" => Some(AnalysisStatus::Running),
            "analyzing_code" => Some(AnalysisStatus::AnalyzingCode),
            "analyzing_dependencies" => Some(AnalysisStatus::AnalyzingDependencies),
            "analyzing_business" => Some(AnalysisStatus::AnalyzingBusiness),
            "analyzing_architecture" => Some(AnalysisStatus::AnalyzingArchitecture),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    /// Status reported while `kind` is running.
    pub fn for_stage(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::Code => AnalysisStatus::AnalyzingCode,
            AnalysisKind::Dependencies => AnalysisStatus::AnalyzingDependencies,
            AnalysisKind::Business => AnalysisStatus::AnalyzingBusiness,
            AnalysisKind::Architecture => AnalysisStatus::AnalyzingArchitecture,
        }
    }

    /// Stage this status reports, if any.
    pub fn stage(&self) -> Option<AnalysisKind> {
        match self {
            AnalysisStatus::AnalyzingCode => Some(AnalysisKind::Code),
            AnalysisStatus::AnalyzingDependencies => Some(AnalysisKind::Dependencies),
            AnalysisStatus::AnalyzingBusiness => Some(AnalysisKind::Business),
            AnalysisStatus::AnalyzingArchitecture => Some(AnalysisKind::Architecture),
            _ => None,
        }
    }

    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    /// Running or inside a stage.
    pub fn is_active(&self) -> bool {
        matches!(self, AnalysisStatus::Running) || self.stage().is_some()
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        match self {
            Pending => matches!(next, Running | Failed),
            Running => next.stage().is_some() || matches!(next, Completed | Failed),
            AnalyzingCode | AnalyzingDependencies | AnalyzingBusiness | AnalyzingArchitecture => {
                next.stage().is_some() || matches!(next, Completed | Failed)
            }
            Completed | Failed => false,
        }
    }

    /// Validate and perform a transition.
    pub fn transition(self, next: AnalysisStatus) -> Result<AnalysisStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::invalid_transition(self, next))
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a cloned repository
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryStatus {
    /// Registered, clone not started
    Pending,
    /// Clone in progress
    Cloning,
    /// Clone finished and scanned
    Ready,
    /// Clone failed
    Failed,
}

impl RepositoryStatus {
    /// Return the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryStatus::Pending => "pending",
            RepositoryStatus::Cloning => "cloning",
            RepositoryStatus::Ready => "ready",
            RepositoryStatus::Failed => "failed",
        }
    }

    /// Create a status from its wire name.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RepositoryStatus::Pending),
            "cloning" => Some(RepositoryStatus::Cloning),
            "ready" => Some(RepositoryStatus::Ready),
            "failed" => Some(RepositoryStatus::Failed),
            _ => None,
        }
    }

    /// Whether the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: RepositoryStatus) -> bool {
        use RepositoryStatus::*;
        matches!(
            (self, next),
            (Pending, Cloning) | (Pending, Failed) | (Cloning, Ready) | (Cloning, Failed)
        )
    }
}

impl fmt::Display for RepositoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Created, no files yet
    Pending,
    /// Uploaded files being written and scanned
    Processing,
    /// Files being copied from a repository
    Importing,
    /// Files available for analysis
    Ready,
    /// Ingestion failed
    Failed,
}

impl ProjectStatus {
    /// Return the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Importing => "importing",
            ProjectStatus::Ready => "ready",
            ProjectStatus::Failed => "failed",
        }
    }

    /// Create a status from its wire name.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProjectStatus::Pending),
            "processing" => Some(ProjectStatus::Processing),
            "importing" => Some(ProjectStatus::Importing),
            "ready" => Some(ProjectStatus::Ready),
            "failed" => Some(ProjectStatus::Failed),
            _ => None,
        }
    }

    /// Whether the lifecycle allows moving to `next`.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        match self {
            Pending => matches!(next, Processing | Importing | Ready | Failed),
            Importing => matches!(next, Processing | Ready | Failed),
            Processing => matches!(next, Ready | Failed),
            Ready | Failed => false,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer progress for `completed` of `total` stages, floored and capped at 100.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = completed.saturating_mul(100) / total;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn analysis_kind_wire_names_roundtrip() {
        for kind in AnalysisKind::ALL {
            assert_eq!(AnalysisKind::from_str_name(kind.as_str()), Some(kind));
        }
        assert_eq!(AnalysisKind::from_str_name("security"), None);
    }

    #[test]
    fn parse_list_splits_known_and_rejected() {
        let (kinds, rejected) =
            AnalysisKind::parse_list(&["business", "security", "code", "business"]);
        assert_eq!(kinds, vec![AnalysisKind::Business, AnalysisKind::Code]);
        assert_eq!(rejected, vec!["security".to_string()]);
    }

    #[test]
    fn parse_reports_unknown_kind() {
        let err = AnalysisKind::parse("perf").expect_err("unknown kind");
        assert_eq!(err, CoreError::UnknownAnalysisKind("perf".to_string()));
    }

    #[rstest]
    #[case(AnalysisStatus::Pending, AnalysisStatus::Running, true)]
    #[case(AnalysisStatus::Pending, AnalysisStatus::Failed, true)]
    #[case(AnalysisStatus::Pending, AnalysisStatus::AnalyzingCode, false)]
    #[case(AnalysisStatus::Pending, AnalysisStatus::Completed, false)]
    #[case(AnalysisStatus::Running, AnalysisStatus::AnalyzingBusiness, true)]
    #[case(AnalysisStatus::Running, AnalysisStatus::Completed, true)]
    #[case(AnalysisStatus::Running, AnalysisStatus::Pending, false)]
    #[case(AnalysisStatus::AnalyzingCode, AnalysisStatus::AnalyzingDependencies, true)]
    #[case(AnalysisStatus::AnalyzingArchitecture, AnalysisStatus::AnalyzingCode, true)]
    #[case(AnalysisStatus::AnalyzingCode, AnalysisStatus::AnalyzingCode, true)]
    #[case(AnalysisStatus::AnalyzingBusiness, AnalysisStatus::Failed, true)]
    #[case(AnalysisStatus::AnalyzingBusiness, AnalysisStatus::Running, false)]
    #[case(AnalysisStatus::Completed, AnalysisStatus::Running, false)]
    #[case(AnalysisStatus::Completed, AnalysisStatus::Failed, false)]
    #[case(AnalysisStatus::Failed, AnalysisStatus::Pending, false)]
    fn analysis_transitions(
        #[case] from: AnalysisStatus,
        #[case] to: AnalysisStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{from} -> {to}");
        assert_eq!(from.transition(to).is_ok(), allowed);
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for terminal in [AnalysisStatus::Completed, AnalysisStatus::Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.is_active());
            let err = terminal
                .transition(AnalysisStatus::Running)
                .expect_err("terminal");
            assert!(err.to_string().contains(terminal.as_str()));
        }
    }

    #[test]
    fn stage_statuses_map_back_to_kinds() {
        for kind in AnalysisKind::ALL {
            let status = AnalysisStatus::for_stage(kind);
            assert!(status.is_active());
            assert_eq!(status.stage(), Some(kind));
        }
        assert_eq!(AnalysisStatus::Running.stage(), None);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AnalysisStatus::AnalyzingDependencies).expect("json");
        assert_eq!(json, "\"analyzing_dependencies\"");
        let back: AnalysisStatus = serde_json::from_str("\"completed\"").expect("parse");
        assert_eq!(back, AnalysisStatus::Completed);
    }

    #[rstest]
    #[case(0, 4, 0)]
    #[case(1, 4, 25)]
    #[case(1, 3, 33)]
    #[case(2, 3, 66)]
    #[case(3, 3, 100)]
    #[case(5, 3, 100)]
    #[case(0, 0, 0)]
    fn progress_is_floored(#[case] done: usize, #[case] total: usize, #[case] expected: u8) {
        assert_eq!(progress_percent(done, total), expected);
    }

    #[test]
    fn repository_lifecycle() {
        assert!(RepositoryStatus::Pending.can_transition_to(RepositoryStatus::Cloning));
        assert!(RepositoryStatus::Cloning.can_transition_to(RepositoryStatus::Ready));
        assert!(RepositoryStatus::Cloning.can_transition_to(RepositoryStatus::Failed));
        assert!(!RepositoryStatus::Pending.can_transition_to(RepositoryStatus::Ready));
        assert!(!RepositoryStatus::Ready.can_transition_to(RepositoryStatus::Cloning));
    }

    #[test]
    fn project_lifecycle() {
        assert!(ProjectStatus::Pending.can_transition_to(ProjectStatus::Processing));
        assert!(ProjectStatus::Importing.can_transition_to(ProjectStatus::Ready));
        assert!(ProjectStatus::Processing.can_transition_to(ProjectStatus::Failed));
        assert!(!ProjectStatus::Ready.can_transition_to(ProjectStatus::Processing));
        assert!(!ProjectStatus::Processing.can_transition_to(ProjectStatus::Importing));
    }
}
