//! Batch coordinator for one pruning pass.
//!
//! A pass classifies the fetched runs, plans deletions per workflow group,
//! deletes orphan runs and then surplus active runs, and finally estimates the
//! API quota such a pass costs. There is no loop: each invocation prunes once.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};

use super::{
    classifier::{self, Classification},
    error::RetentionResult,
    orchestrator::{DeletionOrchestrator, DeletionReport},
    policy::{self, DeletionPlan, RetentionPolicy},
    quota,
    summary::BatchSummary,
};
use crate::{
    github::{ActionsApi, DeleteError},
    models::{RunId, WorkflowId, WorkflowRun},
};

/// Everything a batch decided and did, before the quota is fetched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub classification: Classification,
    pub plan: DeletionPlan,
    pub orphan: DeletionReport,
    pub active: DeletionReport,
    /// Estimated API calls for deleting every selected run.
    pub quota_estimate: u64,
}

impl BatchOutcome {
    /// Reports of both phases combined.
    pub fn total(&self) -> DeletionReport {
        let mut total = self.orphan;
        total.merge(self.active);
        total
    }
}

/// Plan and execute one batch over already-fetched runs.
///
/// Orphan runs are all deleted first; active runs follow, restricted to what
/// `policy` selects in each workflow-name group.
pub async fn run_batch<F, Fut>(
    all_runs: &[WorkflowRun],
    active_workflow_ids: &HashSet<WorkflowId>,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
    dry_run: bool,
    orchestrator: &DeletionOrchestrator,
    delete: F,
) -> BatchOutcome
where
    F: Fn(RunId) -> Fut,
    Fut: Future<Output = Result<(), DeleteError>>,
{
    let classification = classifier::classify(all_runs, active_workflow_ids);
    tracing::info!(
        total = classification.total(),
        active = classification.active.len(),
        orphan = classification.orphan.len(),
        orphan_workflows = classification.orphan_workflow_ids.len(),
        "Classified workflow runs"
    );

    let orphan_ids: Vec<RunId> = classification.orphan.iter().map(|r| r.run_id).collect();
    if !orphan_ids.is_empty() {
        tracing::info!(
            count = orphan_ids.len(),
            workflow_ids = ?classification.orphan_workflow_ids,
            "Found workflow runs without a workflow definition"
        );
    }

    let plan = policy::build_plan(&classification.active, policy, now);
    for (name, group) in &plan.groups {
        if group.run_ids.is_empty() {
            tracing::info!(
                workflow = %name,
                group_size = group.group_size,
                %policy,
                "No workflow runs to delete"
            );
        } else {
            tracing::info!(
                workflow = %name,
                group_size = group.group_size,
                delete = group.run_ids.len(),
                %policy,
                "Selected workflow runs for deletion"
            );
        }
    }

    let orphan = orchestrator
        .execute("orphan", &orphan_ids, dry_run, &delete)
        .await;
    let active = orchestrator
        .execute("active", &plan.run_ids(), dry_run, &delete)
        .await;

    let quota_estimate = quota::estimate(orphan_ids.len() as u64, plan.delete_count() as u64);

    BatchOutcome {
        classification,
        plan,
        orphan,
        active,
        quota_estimate,
    }
}

/// Run one complete pruning pass against `api`.
///
/// Listing or quota errors abort the pass; individual deletion failures are
/// only counted.
pub async fn prune<A>(
    api: &A,
    policy: RetentionPolicy,
    dry_run: bool,
    now: DateTime<Utc>,
    orchestrator: &DeletionOrchestrator,
) -> RetentionResult<BatchSummary>
where
    A: ActionsApi + ?Sized,
{
    let dry_run_msg = if dry_run { " (DRY RUN)" } else { "" };
    tracing::info!(%policy, dry_run, "Starting pruning pass{}", dry_run_msg);

    let workflows = api.list_workflows().await?;
    tracing::info!(count = workflows.len(), "Fetched workflow definitions");

    let runs = api.list_runs().await?;
    tracing::info!(count = runs.len(), "Fetched workflow runs");

    let active_ids: HashSet<WorkflowId> = workflows.iter().map(|w| w.id).collect();
    let outcome = run_batch(
        &runs,
        &active_ids,
        policy,
        now,
        dry_run,
        orchestrator,
        |run_id| api.delete_run(run_id),
    )
    .await;

    let quota = api.rate_limit().await?;
    let summary = BatchSummary::new(policy, dry_run, &outcome, quota);

    if outcome.total().has_failures() {
        tracing::warn!(
            failed = summary.failed_count,
            "Some workflow runs could not be deleted; they will be selected again next run"
        );
    }

    tracing::info!(
        orphan = summary.orphan_deleted_count,
        active = summary.active_deleted_count,
        failed = summary.failed_count,
        quota_remaining = summary.quota_remaining,
        quota_estimate = summary.quota_estimate,
        "Pruning pass complete{}",
        dry_run_msg
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::{
        github::{GitHubError, GitHubResult},
        models::WorkflowDefinition,
        retention::QuotaStatus,
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn run(id: u64, workflow_id: u64, name: &str, days_ago: i64) -> WorkflowRun {
        WorkflowRun::new(id, workflow_id, now() - chrono::Duration::days(days_ago), name)
    }

    fn unpaced() -> DeletionOrchestrator {
        DeletionOrchestrator::new().with_pacing(usize::MAX, Duration::ZERO)
    }

    /// In-memory platform recording every deletion.
    #[derive(Default)]
    struct FakeActions {
        workflows: Vec<WorkflowDefinition>,
        runs: Vec<WorkflowRun>,
        missing: HashSet<RunId>,
        fail_listing: bool,
        deleted: Mutex<Vec<RunId>>,
    }

    impl FakeActions {
        fn new(workflow_ids: &[u64], runs: Vec<WorkflowRun>) -> Self {
            let workflows = workflow_ids
                .iter()
                .map(|&id| WorkflowDefinition {
                    id: WorkflowId(id),
                    name: format!("workflow-{id}"),
                    path: format!(".github/workflows/workflow-{id}.yml"),
                })
                .collect();
            Self {
                workflows,
                runs,
                ..Default::default()
            }
        }

        fn deleted(&self) -> Vec<RunId> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActionsApi for FakeActions {
        async fn list_workflows(&self) -> GitHubResult<Vec<WorkflowDefinition>> {
            Ok(self.workflows.clone())
        }

        async fn list_runs(&self) -> GitHubResult<Vec<WorkflowRun>> {
            if self.fail_listing {
                return Err(GitHubError::Authentication("Bad credentials".into()));
            }
            Ok(self.runs.clone())
        }

        async fn delete_run(&self, run_id: RunId) -> Result<(), DeleteError> {
            if self.missing.contains(&run_id) {
                return Err(DeleteError::NotFound(run_id));
            }
            self.deleted.lock().unwrap().push(run_id);
            Ok(())
        }

        async fn rate_limit(&self) -> GitHubResult<QuotaStatus> {
            Ok(QuotaStatus {
                limit: 5000,
                remaining: 4500,
                reset_at: now(),
            })
        }
    }

    fn ids(values: &[u64]) -> Vec<RunId> {
        values.iter().copied().map(RunId).collect()
    }

    #[tokio::test]
    async fn test_keep_latest_deletes_oldest_runs() {
        let runs = (1..=5).map(|id| run(id, 10, "ci", 6 - id as i64)).collect();
        let api = FakeActions::new(&[10], runs);

        let summary = prune(&api, RetentionPolicy::KeepLatest(1), false, now(), &unpaced())
            .await
            .unwrap();

        let mut deleted = api.deleted();
        deleted.sort();
        assert_eq!(deleted, ids(&[1, 2, 3, 4]));
        assert_eq!(summary.active_deleted_count, 4);
        assert_eq!(summary.orphan_deleted_count, 0);
        assert_eq!(summary.quota_estimate, quota::estimate(0, 4));
    }

    #[tokio::test]
    async fn test_keep_newer_than_spares_recent_runs() {
        let runs = vec![
            run(1, 10, "ci", 2000),
            run(2, 10, "ci", 2000),
            run(3, 10, "ci", 10),
            run(4, 11, "release", 10),
        ];
        let api = FakeActions::new(&[10, 11], runs);

        let summary = prune(&api, RetentionPolicy::KeepNewerThan(2000), false, now(), &unpaced())
            .await
            .unwrap();

        assert!(api.deleted().is_empty());
        assert_eq!(summary.total_deleted(), 0);
    }

    #[tokio::test]
    async fn test_orphans_are_deleted_before_active_runs() {
        let runs = vec![
            run(1, 10, "ci", 30),
            run(2, 10, "ci", 20),
            run(3, 10, "ci", 10),
            run(4, 99, "removed", 50),
            run(5, 99, "removed", 40),
        ];
        let api = FakeActions::new(&[10], runs);
        let orchestrator = unpaced().with_concurrency(1);

        let summary = prune(&api, RetentionPolicy::KeepLatest(1), false, now(), &orchestrator)
            .await
            .unwrap();

        assert_eq!(api.deleted(), ids(&[4, 5, 1, 2]));
        assert_eq!(summary.orphan_deleted_count, 2);
        assert_eq!(summary.active_deleted_count, 2);
    }

    #[tokio::test]
    async fn test_orphans_are_deleted_regardless_of_policy() {
        let runs = vec![run(1, 99, "removed", 0), run(2, 10, "ci", 0)];
        let api = FakeActions::new(&[10], runs);

        let summary = prune(&api, RetentionPolicy::KeepLatest(100), false, now(), &unpaced())
            .await
            .unwrap();

        assert_eq!(api.deleted(), ids(&[1]));
        assert_eq!(summary.orphan_deleted_count, 1);
        assert_eq!(summary.active_deleted_count, 0);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_deleting() {
        let mut runs: Vec<WorkflowRun> = (1..=60).map(|id| run(id, 10, "ci", 0)).collect();
        runs.extend((61..=110).map(|id| run(id, 99, "removed", 0)));
        let api = FakeActions::new(&[10], runs);

        let summary = prune(&api, RetentionPolicy::KeepLatest(10), true, now(), &unpaced())
            .await
            .unwrap();

        assert!(api.deleted().is_empty());
        assert!(summary.dry_run);
        assert_eq!(summary.orphan_deleted_count, 50);
        assert_eq!(summary.active_deleted_count, 50);
        assert_eq!(summary.quota_estimate, 205);
        assert_eq!(summary.quota_remaining, 4500);
        assert!(summary.has_quota_headroom());
    }

    #[tokio::test]
    async fn test_missing_runs_are_counted_not_fatal() {
        let runs = (1..=4).map(|id| run(id, 10, "ci", 0)).collect();
        let mut api = FakeActions::new(&[10], runs);
        api.missing.insert(RunId(2));

        let summary = prune(&api, RetentionPolicy::KeepLatest(0), false, now(), &unpaced())
            .await
            .unwrap();

        assert_eq!(summary.active_deleted_count, 4);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(api.deleted().len(), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_before_deleting() {
        let runs = vec![run(1, 99, "removed", 0)];
        let mut api = FakeActions::new(&[10], runs);
        api.fail_listing = true;

        let result = prune(&api, RetentionPolicy::KeepLatest(0), false, now(), &unpaced()).await;

        assert!(matches!(
            result,
            Err(crate::retention::RetentionError::Api(GitHubError::Authentication(_)))
        ));
        assert!(api.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_run_batch_groups_by_name() {
        // Two workflow ids sharing a name form one group.
        let runs = vec![
            run(1, 10, "ci", 3),
            run(2, 11, "ci", 2),
            run(3, 10, "ci", 1),
            run(4, 12, "lint", 1),
        ];
        let active: HashSet<WorkflowId> = [10, 11, 12].into_iter().map(WorkflowId).collect();

        let outcome = run_batch(
            &runs,
            &active,
            RetentionPolicy::KeepLatest(1),
            now(),
            true,
            &unpaced(),
            |_| async { Ok(()) },
        )
        .await;

        assert_eq!(outcome.plan.groups["ci"].group_size, 3);
        assert_eq!(outcome.plan.groups["ci"].run_ids, ids(&[1, 2]));
        assert!(outcome.plan.groups["lint"].run_ids.is_empty());
        assert_eq!(outcome.active.attempted, 2);
        assert_eq!(outcome.orphan, DeletionReport::default());
        assert_eq!(outcome.total().attempted, 2);
    }

    #[tokio::test]
    async fn test_run_batch_empty_input() {
        let outcome = run_batch(
            &[],
            &HashSet::new(),
            RetentionPolicy::KeepNewerThan(30),
            now(),
            false,
            &unpaced(),
            |_| async { Ok(()) },
        )
        .await;

        assert!(outcome.classification.is_empty());
        assert!(outcome.plan.is_empty());
        assert_eq!(outcome.total(), DeletionReport::default());
        assert_eq!(outcome.quota_estimate, 4);
    }
}
