//! Behavioural checks every `AssetStorage` backend must pass.
//!
//! Each case gets a fresh backend from the caller's factory. Cases are
//! grouped by category:
//!
//! - `init`: id assignment, version 0, audit columns
//! - `error`: missing assets and stale versions
//! - `snapshot`: staged writes stay private until commit
//! - `commit`: multi-record snapshots land together or not at all
//! - `version`: optimistic concurrency on `update_asset`
//! - `changes`: history is written with the mutation it describes
//! - `concurrent`: racing tasks against one backend
//!
//! ```ignore
//! #[tokio::test]
//! async fn sqlite_backend_conforms() {
//!     let report = run_conformance_suite(|| async { SqliteStorage::open_in_memory().await }).await;
//!     assert_eq!(report.failed, 0, "{report}");
//! }
//! ```

mod changes;
mod commit;
mod concurrent;
mod error;
mod init;
mod snapshot;
mod version;

use std::fmt;
use std::future::Future;

use crate::record::{ChangeKind, NewAsset, NewChange};
use crate::AssetStorage;

/// Outcome of one conformance case. `error` is `None` when it passed.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub category: &'static str,
    pub name: &'static str,
    pub error: Option<String>,
}

impl CaseOutcome {
    fn new(category: &'static str, name: &'static str, result: Result<(), String>) -> Self {
        Self {
            category,
            name,
            error: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<CaseOutcome>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} of {} storage cases passed", self.passed, self.total)?;
        for case in self.results.iter().filter(|c| !c.passed()) {
            if let Some(error) = &case.error {
                writeln!(f, "  {}::{} failed: {}", case.category, case.name, error)?;
            }
        }
        Ok(())
    }
}

/// Run every case, each against a new backend from `factory`.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: AssetStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(init::run_init_tests(&factory).await);
    results.extend(error::run_error_tests(&factory).await);
    results.extend(snapshot::run_snapshot_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(changes::run_change_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed()).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

fn make_asset(name: &str, catalog: i64, status: &str) -> NewAsset {
    NewAsset {
        name: name.to_string(),
        description: format!("{} description", name),
        catalog,
        status: status.to_string(),
        creator: "test-user".to_string(),
        created: "2025-01-01T00:00:00Z".to_string(),
    }
}

fn make_status_change(asset_id: i64, old: &str, new: &str) -> NewChange {
    NewChange {
        asset_id,
        kind: ChangeKind::Status,
        field: Some("Status".to_string()),
        old_value: Some(old.to_string()),
        new_value: Some(new.to_string()),
        creator: "test-user".to_string(),
        created: "2025-01-01T00:01:00Z".to_string(),
    }
}

fn make_create_change(asset_id: i64) -> NewChange {
    NewChange {
        asset_id,
        kind: ChangeKind::Create,
        field: None,
        old_value: None,
        new_value: None,
        creator: "test-user".to_string(),
        created: "2025-01-01T00:00:00Z".to_string(),
    }
}

/// Insert one asset at `status` and commit it. Returns its id.
async fn seed_asset<S: AssetStorage>(s: &S, name: &str, status: &str) -> Result<i64, String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let rec = s
        .insert_asset(&mut snap, make_asset(name, 1, status))
        .await
        .map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_create_change(rec.id))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(rec.id)
}

/// Move a committed asset to `status` in its own snapshot. Returns the new version.
async fn move_status<S: AssetStorage>(s: &S, asset_id: i64, status: &str) -> Result<i64, String> {
    let mut snap = s.begin_snapshot().await.map_err(|e| e.to_string())?;
    let mut rec = s
        .get_asset_for_update(&mut snap, asset_id)
        .await
        .map_err(|e| e.to_string())?;
    let old = std::mem::replace(&mut rec.status, status.to_string());
    let version = s
        .update_asset(&mut snap, &rec)
        .await
        .map_err(|e| e.to_string())?;
    s.insert_change(&mut snap, make_status_change(asset_id, &old, status))
        .await
        .map_err(|e| e.to_string())?;
    s.commit_snapshot(snap).await.map_err(|e| e.to_string())?;
    Ok(version)
}
